//! Radio configuration types.

/// Transmit power in deci-dBm.
pub type TxPower = i16;

/// 10 dBm in deci-dBm, the bound for power adjustments.
pub const TX_POWER_10_DBM: TxPower = 100;

/// 14 dBm in deci-dBm, the fallback maximum.
pub const TX_POWER_14_DBM: TxPower = 140;

/// 20 dBm in deci-dBm, the maximum of high-power parts.
pub const TX_POWER_20_DBM: TxPower = 200;

/// RF region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RfRegion {
    /// Europe.
    Eu = 0x00,
    /// United States.
    Us = 0x01,
    /// Australia / New Zealand.
    Anz = 0x02,
    /// Hong Kong.
    Hk = 0x03,
    /// India.
    In = 0x05,
    /// Israel.
    Il = 0x06,
    /// Russia.
    Ru = 0x07,
    /// China.
    Cn = 0x08,
    /// United States with Long Range.
    UsLr = 0x09,
    /// Europe with Long Range.
    EuLr = 0x0B,
    /// Japan.
    Jp = 0x20,
    /// Korea.
    Kr = 0x21,
    /// No region configured.
    Undefined = 0xFE,
}

impl RfRegion {
    /// Regions using two channels, in wire order.
    pub const TWO_CHANNEL: [Self; 10] = [
        Self::Eu,
        Self::Us,
        Self::Anz,
        Self::Hk,
        Self::In,
        Self::Il,
        Self::Ru,
        Self::Cn,
        Self::UsLr,
        Self::EuLr,
    ];

    /// Regions using three channels, in wire order.
    pub const THREE_CHANNEL: [Self; 2] = [Self::Jp, Self::Kr];

    /// Parses a region byte. Deprecated and unknown values yield `None`.
    #[must_use]
    pub fn from_byte(byte: u8) -> Option<Self> {
        Self::TWO_CHANNEL
            .into_iter()
            .chain(Self::THREE_CHANNEL)
            .chain([Self::Undefined])
            .find(|region| *region as u8 == byte)
    }

    /// True for regions a device may be configured to.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        !matches!(self, Self::Undefined)
    }

    /// True for regions supporting Long Range.
    #[must_use]
    pub const fn is_long_range(self) -> bool {
        matches!(self, Self::UsLr | Self::EuLr)
    }

    /// The classic region a Long Range region includes.
    #[must_use]
    pub const fn included_region(self) -> Option<Self> {
        match self {
            Self::UsLr => Some(Self::Us),
            Self::EuLr => Some(Self::Eu),
            _ => None,
        }
    }
}

impl From<RfRegion> for u8 {
    fn from(region: RfRegion) -> Self {
        region as Self
    }
}

/// Answer to a region-info query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionInfo {
    /// Region described.
    pub region: RfRegion,
    /// Classic radio supported.
    pub classic: bool,
    /// Long Range supported.
    pub long_range: bool,
    /// Classic region included by a Long Range region.
    pub included_region: Option<RfRegion>,
}

impl RegionInfo {
    /// Encoded size.
    pub const SIZE: usize = 3;

    /// Describes a known region.
    #[must_use]
    pub const fn of(region: RfRegion) -> Self {
        Self {
            region,
            classic: region.is_valid(),
            long_range: region.is_long_range(),
            included_region: region.included_region(),
        }
    }

    /// Answer for regions that are not in the table.
    #[must_use]
    pub const fn unknown() -> Self {
        Self {
            region: RfRegion::Undefined,
            classic: false,
            long_range: false,
            included_region: None,
        }
    }

    /// `region | flags (bit0 classic, bit1 long range) | included region`.
    #[must_use]
    pub const fn to_bytes(self) -> [u8; Self::SIZE] {
        let flags = (self.classic as u8) | ((self.long_range as u8) << 1);
        let included = match self.included_region {
            Some(region) => region as u8,
            // Unknown regions answer 0, known ones without an included region answer undefined
            None if self.classic => RfRegion::Undefined as u8,
            None => 0,
        };
        [self.region as u8, flags, included]
    }
}

/// Radio configuration, persisted across reboots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadioConfig {
    /// Configured region.
    pub region: RfRegion,
    /// Normal tx power level.
    pub tx_power_max: TxPower,
    /// Measured output at 0 dBm setting.
    pub tx_power_adjust: TxPower,
    /// Maximum Long Range tx power.
    pub tx_power_max_lr: TxPower,
    /// Packet trace interface enabled.
    pub pti_enabled: bool,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            region: RfRegion::Eu,
            tx_power_max: 0,
            tx_power_adjust: 0,
            tx_power_max_lr: TX_POWER_14_DBM,
            pti_enabled: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_from_byte() {
        assert_eq!(RfRegion::from_byte(0x09), Some(RfRegion::UsLr));
        assert_eq!(RfRegion::from_byte(0x21), Some(RfRegion::Kr));
        // Deprecated slots
        assert_eq!(RfRegion::from_byte(0x04), None);
        assert_eq!(RfRegion::from_byte(0x0A), None);
        assert!(!RfRegion::Undefined.is_valid());
    }

    #[test]
    fn test_region_info_bytes() {
        assert_eq!(RegionInfo::of(RfRegion::Eu).to_bytes(), [0x00, 0x01, 0xFE]);
        assert_eq!(RegionInfo::of(RfRegion::UsLr).to_bytes(), [0x09, 0x03, 0x01]);
        assert_eq!(RegionInfo::unknown().to_bytes(), [0xFE, 0x00, 0x00]);
    }
}
