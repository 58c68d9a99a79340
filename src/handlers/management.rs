//! Management commands: setup family, init data, node lists, NVR, version.

use crate::handlers::{HandlerContext, Reply};
use crate::protocol::{Frame, SETUP_UNSUPPORTED, SetupCommand};
use crate::request::Payload;
use crate::stack::MfgToken;
use crate::types::device::init_flags;
use crate::types::radio::{TX_POWER_10_DBM, TX_POWER_14_DBM};
use crate::types::{
    LR_NODE_MASK_LENGTH, NODE_MASK_LENGTH, NodeIdWidth, RegionInfo, RfRegion, TxPower,
};

/// Serial API version reported by get-init-data.
pub const SERIAL_API_VERSION: u8 = 10;

/// Largest node list page answered by get-NLS-nodes.
pub const NLS_NODES_PAGE_LENGTH: usize = 128;

/// Highest page index accepted by get-LR-nodes.
pub const LR_NODES_MAX_OFFSET: u8 = 3;

/// NVR offset of the public key.
pub const NVR_PUK_OFFSET: u8 = 0x23;
/// NVR offset of the private key.
pub const NVR_PRK_OFFSET: u8 = 0x43;
/// NVR offset of the hardware version.
pub const NVR_HW_VERSION_OFFSET: u8 = 0x70;

/// Bytes of the supported-subcommand bitmask: one bit per value up to 128.
const SETUP_BITMASK_LENGTH: usize = SetupCommand::NodeIdBaseTypeSet as usize / 8 + 1;

/// Flag byte of the supported answer, one bit per legacy subcommand.
fn setup_supported_flags() -> u8 {
    [
        SetupCommand::Supported,
        SetupCommand::TxStatusReport,
        SetupCommand::TxPowerLevelSet,
        SetupCommand::TxPowerLevelGet,
        SetupCommand::MaxPayloadSize,
        SetupCommand::RfRegionGet,
        SetupCommand::RfRegionSet,
        SetupCommand::NodeIdBaseTypeSet,
    ]
    .into_iter()
    .fold(0, |flags, cmd| flags | cmd as u8)
}

/// Bitmask with bit `n - 1` set for every implemented subcommand `n`.
fn setup_supported_bitmask() -> [u8; SETUP_BITMASK_LENGTH] {
    let mut mask = [0u8; SETUP_BITMASK_LENGTH];
    for cmd in SetupCommand::IMPLEMENTED {
        let bit = cmd as usize - 1;
        mask[bit / 8] |= 1 << (bit % 8);
    }
    mask
}

fn tx_power_at(payload: &[u8], index: usize) -> Option<TxPower> {
    payload
        .get(index..index + 2)
        .map(|b| TxPower::from_be_bytes([b[0], b[1]]))
}

fn clamp_i8(value: TxPower) -> u8 {
    value.clamp(TxPower::from(i8::MIN), TxPower::from(i8::MAX)) as i8 as u8
}

/// `0x0B`: the setup command family.
///
/// The answer echoes the subcommand followed by its result. An empty request
/// answers `[0]`; an unknown subcommand answers `[0x00, subcommand]`.
pub fn serial_api_setup(frame: &Frame, ctx: &mut HandlerContext<'_>) -> Reply {
    let input = frame.payload();
    let Some(&sub) = input.first() else {
        tracing::debug!("empty setup request");
        return Reply::bytes(&[0]);
    };

    let Some(command) = SetupCommand::from_byte(sub) else {
        tracing::debug!("unsupported setup subcommand 0x{:02x}", sub);
        return Reply::bytes(&[SETUP_UNSUPPORTED, sub]);
    };
    tracing::debug!("setup subcommand {:?}", command);

    let device = &mut *ctx.device;
    let mut out = vec![sub];
    match command {
        SetupCommand::Supported => {
            out.push(setup_supported_flags());
            out.extend_from_slice(&setup_supported_bitmask());
        }
        SetupCommand::TxStatusReport => {
            let ok = if let Some(&enable) = input.get(1) {
                device.tx_status_report = enable != 0;
                true
            } else {
                false
            };
            out.push(u8::from(ok));
        }
        SetupCommand::RfRegionGet => {
            let region = device.settings.read_rf_region().unwrap_or_else(|e| {
                tracing::warn!("failed to read rf region: {}", e);
                RfRegion::Undefined
            });
            out.push(region as u8);
        }
        SetupCommand::RfRegionSet => {
            let ok = input
                .get(1)
                .and_then(|b| RfRegion::from_byte(*b))
                .filter(|region| region.is_valid())
                .is_some_and(|region| device.settings.save_rf_region(region).is_ok());
            out.push(u8::from(ok));
        }
        SetupCommand::SupportedRegions => {
            let regions: Vec<u8> = RfRegion::TWO_CHANNEL
                .into_iter()
                .chain(RfRegion::THREE_CHANNEL)
                .filter(|region| region.is_valid())
                .map(u8::from)
                .collect();
            out.push(regions.len() as u8);
            out.extend_from_slice(&regions);
        }
        SetupCommand::RegionInfo => {
            let info = input
                .get(1)
                .and_then(|b| RfRegion::from_byte(*b))
                .filter(|region| region.is_valid())
                .map_or_else(RegionInfo::unknown, RegionInfo::of);
            out.extend_from_slice(&info.to_bytes());
        }
        SetupCommand::TxPowerLevelSet => {
            // Limited to i8 values, the 16-bit variant covers the full range
            let ok = match (input.get(1), input.get(2)) {
                (Some(&level), Some(&adjust)) => device
                    .settings
                    .save_tx_power(TxPower::from(level as i8), TxPower::from(adjust as i8))
                    .is_ok(),
                _ => false,
            };
            out.push(u8::from(ok));
        }
        SetupCommand::TxPowerLevelGet => {
            let (level, adjust) = device.settings.read_tx_power().unwrap_or((0, 0));
            out.push(clamp_i8(level));
            out.push(clamp_i8(adjust));
        }
        SetupCommand::TxPowerLevelSet16 => {
            let ok = match (tx_power_at(input, 1), tx_power_at(input, 3)) {
                (Some(level), Some(adjust)) => {
                    let max = device
                        .stack
                        .max_supported_tx_power()
                        .unwrap_or(TX_POWER_14_DBM);
                    (-TX_POWER_10_DBM..=max).contains(&level)
                        && (-TX_POWER_10_DBM..=TX_POWER_10_DBM).contains(&adjust)
                        && device.settings.save_tx_power(level, adjust).is_ok()
                }
                _ => false,
            };
            out.push(u8::from(ok));
        }
        SetupCommand::TxPowerLevelGet16 => {
            let (level, adjust) = device.settings.read_tx_power().unwrap_or((0, 0));
            out.extend_from_slice(&level.to_be_bytes());
            out.extend_from_slice(&adjust.to_be_bytes());
        }
        SetupCommand::MaxLrTxPowerSet => {
            let ok = tx_power_at(input, 1).is_some_and(|power| {
                let max = device
                    .stack
                    .max_supported_tx_power()
                    .unwrap_or(TX_POWER_14_DBM);
                (-TX_POWER_10_DBM..=max).contains(&power)
                    && device.settings.save_max_lr_tx_power(power).is_ok()
            });
            out.push(u8::from(ok));
        }
        SetupCommand::MaxLrTxPowerGet => {
            let power = device.settings.read_max_lr_tx_power().unwrap_or(0);
            out.extend_from_slice(&power.to_be_bytes());
        }
        SetupCommand::MaxPayloadSize => out.push(device.stack.max_payload_size()),
        SetupCommand::MaxLrPayloadSize => out.push(device.stack.max_lr_payload_size()),
        SetupCommand::NodeIdBaseTypeSet => {
            device.node_id_width.set(NodeIdWidth::Bits8);
            device.config.node_id_width = NodeIdWidth::Bits8;
            let width = input.get(1).and_then(|b| NodeIdWidth::from_base_type(*b));
            if let Some(width) = width {
                tracing::info!("node id width set to {:?}", width);
                device.node_id_width.set(width);
                device.config.node_id_width = width;
                if let Err(e) = device.settings.save_node_id_width(width) {
                    tracing::warn!("failed to save node id base type: {}", e);
                }
            }
            out.push(u8::from(width.is_some()));
        }
    }
    Reply::Response(Payload::from(out))
}

/// `0x02`: API version, controller flags and included node bitmask.
pub fn get_init_data(_frame: &Frame, ctx: &mut HandlerContext<'_>) -> Reply {
    let stack = &ctx.device.stack;
    let mut flags = 0;
    if !stack.is_primary_controller() {
        flags |= init_flags::SECONDARY_CTRL;
    }
    if stack.is_suc() {
        flags |= init_flags::IS_SUC;
    }

    let mut out = Vec::with_capacity(5 + NODE_MASK_LENGTH);
    out.push(SERIAL_API_VERSION);
    out.push(flags);
    out.push(NODE_MASK_LENGTH as u8);
    out.extend_from_slice(&stack.included_nodes());
    out.push(stack.chip_type());
    out.push(stack.chip_revision());
    Reply::Response(Payload::from(out))
}

/// `0xC0`: one page of the network-layer-security node bitmask.
///
/// `more | page | length | mask`
pub fn get_nls_nodes(frame: &Frame, ctx: &mut HandlerContext<'_>) -> Reply {
    let max_page =
        (NODE_MASK_LENGTH + LR_NODE_MASK_LENGTH).div_ceil(NLS_NODES_PAGE_LENGTH) as u8 - 1;
    let page = frame.payload().first().copied().unwrap_or(0).min(max_page);

    let answer = ctx.device.stack.included_nls_nodes(page);
    let mask = &answer.mask[..answer.mask.len().min(NLS_NODES_PAGE_LENGTH)];

    let mut out = Vec::with_capacity(3 + mask.len());
    out.push(u8::from(answer.more));
    out.push(page);
    out.push(mask.len() as u8);
    out.extend_from_slice(mask);
    Reply::Response(Payload::from(out))
}

/// `0xDA`: the Long Range node bitmask.
///
/// Only page 0 carries nodes; higher pages answer zeros.
pub fn get_lr_nodes(frame: &Frame, ctx: &mut HandlerContext<'_>) -> Reply {
    let page = frame
        .payload()
        .first()
        .copied()
        .unwrap_or(0)
        .min(LR_NODES_MAX_OFFSET);

    let mut out = Vec::with_capacity(3 + LR_NODE_MASK_LENGTH);
    out.push(0);
    out.push(page);
    out.push(LR_NODE_MASK_LENGTH as u8);
    if page == 0 {
        out.extend_from_slice(&ctx.device.stack.included_lr_nodes());
    } else {
        out.extend_from_slice(&[0; LR_NODE_MASK_LENGTH]);
    }
    Reply::Response(Payload::from(out))
}

/// `0x28`: read manufacturing data at `offset | length`.
///
/// Unknown offsets and short requests answer an empty payload.
pub fn get_nvr(frame: &Frame, ctx: &mut HandlerContext<'_>) -> Reply {
    let (offset, length) = match frame.payload() {
        [offset, length, ..] => (*offset, usize::from(*length)),
        _ => {
            tracing::debug!("short NVR request");
            return Reply::bytes(&[]);
        }
    };

    let stack = &ctx.device.stack;
    let data = match offset {
        NVR_PUK_OFFSET => stack.read_mfg_token(MfgToken::PublicKey, length.min(MfgToken::SIZE)),
        NVR_PRK_OFFSET => stack.read_mfg_token(MfgToken::PrivateKey, length.min(MfgToken::SIZE)),
        NVR_HW_VERSION_OFFSET => vec![0xFF; length.min(1)],
        other => {
            tracing::debug!("unknown NVR offset 0x{:02x}", other);
            Vec::new()
        }
    };
    Reply::Response(Payload::from(data))
}

/// `0x09`: protocol type, version, build number and source hash.
pub fn get_protocol_version(_frame: &Frame, ctx: &mut HandlerContext<'_>) -> Reply {
    let info = ctx.device.stack.protocol_info();
    let mut out = Vec::with_capacity(6 + info.git_hash.len());
    out.extend_from_slice(&[info.protocol_type, info.major, info.minor, info.revision]);
    out.extend_from_slice(&info.build.to_be_bytes());
    out.extend_from_slice(&info.git_hash);
    Reply::Response(Payload::from(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use crate::types::radio::TX_POWER_20_DBM;

    fn call(
        handler: fn(&Frame, &mut HandlerContext<'_>) -> Reply,
        cmd: u8,
        payload: &[u8],
    ) -> Vec<u8> {
        let mut device = testing::device();
        call_on(&mut device, handler, cmd, payload)
    }

    fn call_on(
        device: &mut crate::device::Device,
        handler: fn(&Frame, &mut HandlerContext<'_>) -> Reply,
        cmd: u8,
        payload: &[u8],
    ) -> Vec<u8> {
        let mut callbacks = testing::callback_queue();
        let mut ctx = HandlerContext {
            device,
            callbacks: &mut callbacks,
        };
        let frame = Frame::request(cmd, payload).unwrap();
        match handler(&frame, &mut ctx) {
            Reply::Response(payload) => payload.to_vec(),
            Reply::None => panic!("expected a response"),
        }
    }

    fn setup(device: &mut crate::device::Device, payload: &[u8]) -> Vec<u8> {
        call_on(device, serial_api_setup, 0x0B, payload)
    }

    #[test]
    fn test_setup_supported() {
        let out = call(serial_api_setup, 0x0B, &[0x01]);
        assert_eq!(out.len(), 2 + 17);
        assert_eq!(&out[..2], &[0x01, 0xFF]);

        let mut expected = [0u8; 17];
        expected[0] = 0x9F;
        expected[1] = 0x80;
        expected[2] = 0x37;
        expected[3] = 0x80;
        expected[7] = 0x80;
        expected[15] = 0x80;
        assert_eq!(&out[2..], &expected);
    }

    #[test]
    fn test_setup_empty_and_unknown() {
        assert_eq!(call(serial_api_setup, 0x0B, &[]), vec![0x00]);
        assert_eq!(call(serial_api_setup, 0x0B, &[0x77, 1, 2]), vec![0x00, 0x77]);
        assert_eq!(call(serial_api_setup, 0x0B, &[SETUP_UNSUPPORTED]), vec![0x00, 0x00]);
    }

    #[test]
    fn test_setup_node_id_base_type() {
        let mut device = testing::device();
        assert_eq!(setup(&mut device, &[0x80, 0x02]), vec![0x80, 0x01]);
        assert_eq!(device.node_id_width.get(), NodeIdWidth::Bits16);
        assert_eq!(device.settings.read_node_id_width(), Ok(NodeIdWidth::Bits16));

        // Invalid value falls back to 8-bit
        assert_eq!(setup(&mut device, &[0x80, 0x03]), vec![0x80, 0x00]);
        assert_eq!(device.node_id_width.get(), NodeIdWidth::Bits8);

        assert_eq!(setup(&mut device, &[0x80]), vec![0x80, 0x00]);
    }

    #[test]
    fn test_setup_tx_power_16_bit_range() {
        let mut device = testing::device();
        // 14 dBm, adjust -1 dBm
        assert_eq!(setup(&mut device, &[0x12, 0x00, 0x8C, 0xFF, 0xF6]), vec![0x12, 0x01]);
        assert_eq!(device.settings.read_tx_power(), Ok((140, -10)));
        assert_eq!(
            setup(&mut device, &[0x13]),
            vec![0x13, 0x00, 0x8C, 0xFF, 0xF6]
        );

        // Above the 14 dBm hardware maximum
        assert_eq!(setup(&mut device, &[0x12, 0x00, 0xC8, 0x00, 0x00]), vec![0x12, 0x00]);
        // Adjust beyond 10 dBm
        assert_eq!(setup(&mut device, &[0x12, 0x00, 0x00, 0x00, 0x65]), vec![0x12, 0x00]);
        // Too short
        assert_eq!(setup(&mut device, &[0x12, 0x00, 0x00]), vec![0x12, 0x00]);
    }

    #[test]
    fn test_setup_tx_power_get_clamps() {
        let mut device = testing::device();
        device.settings.save_tx_power(TX_POWER_20_DBM, -200).unwrap();
        assert_eq!(setup(&mut device, &[0x08]), vec![0x08, 0x7F, 0x80]);
    }

    #[test]
    fn test_setup_rf_region() {
        let mut device = testing::device();
        assert_eq!(setup(&mut device, &[0x20]), vec![0x20, 0x00]);
        assert_eq!(setup(&mut device, &[0x40, 0x09]), vec![0x40, 0x01]);
        assert_eq!(setup(&mut device, &[0x20]), vec![0x20, 0x09]);
        // Deprecated region
        assert_eq!(setup(&mut device, &[0x40, 0x04]), vec![0x40, 0x00]);
        assert_eq!(setup(&mut device, &[0x40, 0xFE]), vec![0x40, 0x00]);
    }

    #[test]
    fn test_setup_rf_region_read_failure() {
        let mut device = testing::device_with_settings(crate::settings::MemorySettings::new());
        assert_eq!(setup(&mut device, &[0x20]), vec![0x20, 0xFE]);
    }

    #[test]
    fn test_setup_regions() {
        let out = call(serial_api_setup, 0x0B, &[0x15]);
        assert_eq!(
            out,
            vec![0x15, 12, 0x00, 0x01, 0x02, 0x03, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0B, 0x20, 0x21]
        );
        assert_eq!(call(serial_api_setup, 0x0B, &[0x16, 0x0B]), vec![0x16, 0x0B, 0x03, 0x00]);
        assert_eq!(call(serial_api_setup, 0x0B, &[0x16, 0x04]), vec![0x16, 0xFE, 0x00, 0x00]);
    }

    #[test]
    fn test_setup_max_lr_tx_power() {
        let mut device = testing::device();
        assert_eq!(setup(&mut device, &[0x03, 0x00, 0x64]), vec![0x03, 0x01]);
        assert_eq!(setup(&mut device, &[0x05]), vec![0x05, 0x00, 0x64]);
        assert_eq!(setup(&mut device, &[0x03, 0xFF, 0x00]), vec![0x03, 0x00]);
    }

    #[test]
    fn test_setup_tx_status_report() {
        let mut device = testing::device();
        assert_eq!(setup(&mut device, &[0x02, 0x01]), vec![0x02, 0x01]);
        assert!(device.tx_status_report);
        assert_eq!(setup(&mut device, &[0x02]), vec![0x02, 0x00]);
    }

    #[test]
    fn test_get_init_data() {
        let out = call(get_init_data, 0x02, &[]);
        assert_eq!(out.len(), 5 + NODE_MASK_LENGTH);
        assert_eq!(&out[..3], &[SERIAL_API_VERSION, 0x00, 29]);
        assert_eq!(out[3], 0x01);
        assert_eq!(&out[out.len() - 2..], &[testing::CHIP_TYPE, testing::CHIP_REVISION]);
    }

    #[test]
    fn test_get_lr_nodes_pages() {
        let first = call(get_lr_nodes, 0xDA, &[0]);
        assert_eq!(&first[..3], &[0, 0, 128]);
        assert_eq!(first[3], 0x03);

        let clamped = call(get_lr_nodes, 0xDA, &[9]);
        assert_eq!(&clamped[..3], &[0, 3, 128]);
        assert!(clamped[3..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_get_nls_nodes_clamps_page() {
        let out = call(get_nls_nodes, 0xC0, &[5]);
        assert_eq!(out[1], 1);
        assert_eq!(out[2] as usize, out.len() - 3);
    }

    #[test]
    fn test_get_nvr() {
        let puk = call(get_nvr, 0x28, &[NVR_PUK_OFFSET, 40]);
        assert_eq!(puk.len(), 32);
        assert_eq!(call(get_nvr, 0x28, &[NVR_HW_VERSION_OFFSET, 4]), vec![0xFF]);
        assert!(call(get_nvr, 0x28, &[0x10, 4]).is_empty());
        assert!(call(get_nvr, 0x28, &[NVR_PUK_OFFSET]).is_empty());
    }

    #[test]
    fn test_get_protocol_version() {
        let out = call(get_protocol_version, 0x09, &[]);
        assert_eq!(out.len(), 22);
        assert_eq!(&out[..6], &[0x00, 7, 23, 2, 0x01, 0x02]);
    }
}
