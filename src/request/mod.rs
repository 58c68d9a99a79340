//! Payload builders for frames the device originates.
//!
//! Each builder encodes node IDs in the width it was created with and writes
//! through a [`PayloadWriter`], so no payload can exceed `BUF_SIZE_TX`. When
//! space runs out the variable section (command bytes, node mask, node
//! information) is cut short; fixed fields are never dropped.

pub mod writer;

pub use writer::{Payload, PayloadWriter};

use crate::error::FrameError;
use crate::protocol::BUF_SIZE_TX;
use crate::types::{
    ApplicationSettings, EncryptionRequest, MultiReceive, NODE_MASK_LENGTH, NodeIdWidth,
    NodeUpdate, ResetReason, SingleReceive,
};

/// Longest node information frame relayed to the host.
pub const MAX_NODE_INFO_LENGTH: usize = 173;

/// Required length of the metadata attached to an encryption request.
pub const PROTOCOL_METADATA_LENGTH: usize = 15;

/// Startup capability flag: the configured region is a Long Range region.
pub const STARTED_CAPABILITY_LONG_RANGE: u8 = 0x01;

/// Device state reported in the startup notification.
#[derive(Debug, Clone, Copy)]
pub struct StartupInfo<'a> {
    /// Why the chip last reset.
    pub reset_reason: ResetReason,
    /// Watchdog is running.
    pub watchdog_started: bool,
    /// Application node information.
    pub settings: ApplicationSettings,
    /// Command classes advertised when not securely included.
    pub command_classes: &'a [u8],
    /// The configured region supports Long Range.
    pub long_range: bool,
    /// Retention register contents, `None` when the read failed.
    pub reset_info: Option<u32>,
}

/// Builds request payloads for one node-ID width.
#[derive(Debug, Clone, Copy)]
pub struct RequestBuilder {
    width: NodeIdWidth,
    limit: usize,
}

impl RequestBuilder {
    /// Creates a builder for the given node-ID width.
    #[must_use]
    pub const fn new(width: NodeIdWidth) -> Self {
        Self {
            width,
            limit: BUF_SIZE_TX,
        }
    }

    /// Restricts payloads to `limit` bytes.
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Node-ID width this builder encodes.
    #[must_use]
    pub const fn width(&self) -> NodeIdWidth {
        self.width
    }

    fn writer(&self) -> PayloadWriter {
        PayloadWriter::with_limit(self.limit)
    }

    /// Application command received from a single node.
    ///
    /// `rxStatus | source | cmdLength | cmd | rssi | securityKey | txPower | noiseFloor`
    pub fn application_command(&self, rx: &SingleReceive) -> Result<Payload, FrameError> {
        let options = &rx.options;
        let mut w = self.writer();
        w.put_u8(options.rx_status)?;
        w.put_node_id(options.source_node, self.width)?;
        w.put_counted(&rx.payload, 4)?;
        w.put_i8(options.rssi)?;
        w.put_u8(options.security_key)?;
        w.put_i8(options.source_tx_power)?;
        w.put_i8(options.source_noise_floor)?;
        Ok(w.finish())
    }

    /// Application command received as multicast or for a virtual node.
    ///
    /// `rxStatus | dest | source | cmdLength | cmd | maskLength | mask | rssi`,
    /// followed by `securityKey | txPower | noiseFloor` only in 16-bit mode.
    /// Non-multicast frames carry a mask length of 0 and no mask.
    pub fn bridge_command(&self, rx: &MultiReceive) -> Result<Payload, FrameError> {
        let options = &rx.options;
        let extended = self.width == NodeIdWidth::Bits16;
        let tail = if extended { 4 } else { 1 };

        let mut w = self.writer();
        w.put_u8(options.rx_status)?;
        w.put_node_id(options.dest_node, self.width)?;
        w.put_node_id(options.source_node, self.width)?;
        // Room for at least the mask length byte
        w.put_counted(&rx.payload, tail + 1)?;

        if options.is_multicast() {
            w.put_counted(&rx.node_mask[..NODE_MASK_LENGTH], tail)?;
        } else {
            w.put_u8(0)?;
        }

        w.put_i8(options.rssi)?;
        if extended {
            w.put_u8(options.security_key)?;
            w.put_i8(options.source_tx_power)?;
            w.put_i8(options.source_noise_floor)?;
        }
        Ok(w.finish())
    }

    /// Node information received from another node.
    ///
    /// `status | node | infoLength | info`
    pub fn node_update(&self, update: &NodeUpdate) -> Result<Payload, FrameError> {
        let mut w = self.writer();
        w.put_u8(update.status)?;
        w.put_node_id(update.node_id, self.width)?;
        let info = &update.info[..update.info.len().min(MAX_NODE_INFO_LENGTH)];
        w.put_counted(info, 0)?;
        Ok(w.finish())
    }

    /// Protocol command the stack wants the host to encrypt.
    ///
    /// `dest | cmdLength | cmd | metaLength | meta | useSupervision | session`
    ///
    /// Unlike the other builders this one never truncates: a command that
    /// does not fit or metadata of the wrong length is rejected.
    pub fn encryption_request(
        &self,
        request: &EncryptionRequest,
        session: u8,
    ) -> Result<Payload, FrameError> {
        if request.metadata.len() != PROTOCOL_METADATA_LENGTH {
            return Err(FrameError::InvalidPayload {
                reason: "protocol metadata has the wrong length",
            });
        }

        let mut w = self.writer();
        w.put_node_id(request.dest_node, self.width)?;
        let fixed = 4 + request.metadata.len();
        if request.payload.len() + fixed > w.remaining() {
            return Err(FrameError::InvalidPayload {
                reason: "protocol command does not fit",
            });
        }

        w.put_u8(request.payload.len() as u8)?;
        w.put_slice(&request.payload)?;
        w.put_u8(request.metadata.len() as u8)?;
        w.put_slice(&request.metadata)?;
        w.put_u8(u8::from(request.use_supervision))?;
        w.put_u8(session)?;
        Ok(w.finish())
    }

    /// Startup notification.
    ///
    /// `resetReason | watchdogStarted | deviceOptions | generic | specific |
    /// ccLength | cc | capabilities | resetInfo`, where the trailing four
    /// bytes of reset information are left out when it could not be read.
    pub fn startup(&self, info: &StartupInfo<'_>) -> Result<Payload, FrameError> {
        let reset_len = if info.reset_info.is_some() { 4 } else { 0 };

        let mut w = self.writer();
        w.put_u8(info.reset_reason as u8)?;
        w.put_u8(u8::from(info.watchdog_started))?;
        w.put_u8(info.settings.device_options)?;
        w.put_u8(info.settings.generic_type)?;
        w.put_u8(info.settings.specific_type)?;
        w.put_counted(info.command_classes, 1 + reset_len)?;

        let capabilities = if info.long_range {
            STARTED_CAPABILITY_LONG_RANGE
        } else {
            0
        };
        w.put_u8(capabilities)?;
        if let Some(reset_info) = info.reset_info {
            w.put_u32(reset_info)?;
        }
        Ok(w.finish())
    }
}
