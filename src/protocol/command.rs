//! Command codes for the Serial API.
//!
//! Every data frame carries a one-byte function identifier. Requests from the
//! host are dispatched on it, and frames sent to the host reuse the same
//! numbering for callbacks and unsolicited notifications.

/// Function identifiers exchanged with the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FunctionId {
    /// Controller capabilities and included node bitmask.
    GetInitData = 0x02,
    /// Application command received from a single node.
    ApplicationCommandHandler = 0x04,
    /// Protocol type, version and build hash.
    GetProtocolVersion = 0x09,
    /// Startup notification sent once after boot.
    SerialApiStarted = 0x0A,
    /// Setup command family (see [`SetupCommand`]).
    SerialApiSetup = 0x0B,
    /// Read manufacturing tokens.
    NvrGetValue = 0x28,
    /// Node information or inclusion update.
    ApplicationUpdate = 0x49,
    /// Request for the host to encrypt a protocol command class.
    RequestProtocolCcEncryption = 0x6C,
    /// Application command received through a bridge or multicast.
    ApplicationCommandHandlerBridge = 0xA8,
    /// Network-layer-security node bitmask.
    GetNlsNodes = 0xC0,
    /// Acquire a power lock for a while.
    PmStayAwake = 0xD7,
    /// Release a power lock.
    PmCancel = 0xD8,
    /// Long Range node bitmask.
    GetLrNodes = 0xDA,
}

impl From<FunctionId> for u8 {
    fn from(id: FunctionId) -> Self {
        id as Self
    }
}

impl TryFrom<u8> for FunctionId {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0x02 => Self::GetInitData,
            0x04 => Self::ApplicationCommandHandler,
            0x09 => Self::GetProtocolVersion,
            0x0A => Self::SerialApiStarted,
            0x0B => Self::SerialApiSetup,
            0x28 => Self::NvrGetValue,
            0x49 => Self::ApplicationUpdate,
            0x6C => Self::RequestProtocolCcEncryption,
            0xA8 => Self::ApplicationCommandHandlerBridge,
            0xC0 => Self::GetNlsNodes,
            0xD7 => Self::PmStayAwake,
            0xD8 => Self::PmCancel,
            0xDA => Self::GetLrNodes,
            other => return Err(other),
        })
    }
}

/// Echoed in place of a setup subcommand this device does not answer.
pub const SETUP_UNSUPPORTED: u8 = 0x00;

/// Subcommands of [`FunctionId::SerialApiSetup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SetupCommand {
    /// List supported subcommands.
    Supported = 0x01,
    /// Enable or disable tx status reports.
    TxStatusReport = 0x02,
    /// Set maximum Long Range tx power.
    MaxLrTxPowerSet = 0x03,
    /// Set tx power level (8-bit values).
    TxPowerLevelSet = 0x04,
    /// Get maximum Long Range tx power.
    MaxLrTxPowerGet = 0x05,
    /// Get tx power level (8-bit values).
    TxPowerLevelGet = 0x08,
    /// Get maximum payload size.
    MaxPayloadSize = 0x10,
    /// Get maximum Long Range payload size.
    MaxLrPayloadSize = 0x11,
    /// Set tx power level (16-bit values).
    TxPowerLevelSet16 = 0x12,
    /// Get tx power level (16-bit values).
    TxPowerLevelGet16 = 0x13,
    /// List supported RF regions.
    SupportedRegions = 0x15,
    /// Describe one RF region.
    RegionInfo = 0x16,
    /// Get the stored RF region.
    RfRegionGet = 0x20,
    /// Store a new RF region.
    RfRegionSet = 0x40,
    /// Select 8-bit or 16-bit node IDs.
    NodeIdBaseTypeSet = 0x80,
}

impl SetupCommand {
    /// All subcommands this device answers.
    pub const IMPLEMENTED: [Self; 15] = [
        Self::Supported,
        Self::TxStatusReport,
        Self::TxPowerLevelSet,
        Self::TxPowerLevelGet,
        Self::MaxPayloadSize,
        Self::RfRegionGet,
        Self::RfRegionSet,
        Self::NodeIdBaseTypeSet,
        Self::MaxLrTxPowerSet,
        Self::MaxLrTxPowerGet,
        Self::MaxLrPayloadSize,
        Self::TxPowerLevelSet16,
        Self::TxPowerLevelGet16,
        Self::SupportedRegions,
        Self::RegionInfo,
    ];

    /// Parses a subcommand byte.
    #[must_use]
    pub fn from_byte(byte: u8) -> Option<Self> {
        Self::IMPLEMENTED.into_iter().find(|cmd| *cmd as u8 == byte)
    }
}

impl From<SetupCommand> for u8 {
    fn from(cmd: SetupCommand) -> Self {
        cmd as Self
    }
}
