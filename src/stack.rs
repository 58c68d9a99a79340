//! The radio protocol stack as seen from the bridge.
//!
//! Everything the command handlers and the startup sequence need from the
//! controller firmware goes through [`ControllerStack`]. The stack's own
//! events (received frames, node updates) do not come through here; they are
//! pushed into the bridge with an [`crate::event::Notifier`].

use crate::error::StackError;
use crate::types::{
    LR_NODE_MASK_LENGTH, NODE_MASK_LENGTH, ProtocolInfo, RfRegion, TxPower,
};

/// Power lock held on behalf of the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerLock {
    /// Keep the radio powered.
    Radio,
    /// Prevent deep sleep.
    DeepSleep,
}

impl PowerLock {
    /// Parses the lock type byte of a power-management request.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Radio),
            1 => Some(Self::DeepSleep),
            _ => None,
        }
    }
}

/// Manufacturing token readable through the NVR command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MfgToken {
    /// Public key.
    PublicKey,
    /// Private key.
    PrivateKey,
}

impl MfgToken {
    /// Size of the token in bytes.
    pub const SIZE: usize = 32;
}

/// One page of the node list, as answered by the stack.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeListPage {
    /// More pages follow.
    pub more: bool,
    /// Bitmask bytes of this page.
    pub mask: Vec<u8>,
}

/// Controller firmware operations used by the bridge.
pub trait ControllerStack: Send {
    /// Turns the receiver on or off.
    fn set_rf_receive_mode(&mut self, enabled: bool) -> Result<(), StackError>;

    /// Reads the reset-information retention register.
    fn read_reset_info(&mut self) -> Result<u32, StackError>;

    /// True when this is the primary controller of its network.
    fn is_primary_controller(&self) -> bool;

    /// True when this controller is the static update controller.
    fn is_suc(&self) -> bool;

    /// Bitmask of included classic nodes.
    fn included_nodes(&self) -> [u8; NODE_MASK_LENGTH];

    /// Bitmask of included Long Range nodes.
    fn included_lr_nodes(&self) -> [u8; LR_NODE_MASK_LENGTH];

    /// One page of the bitmask of nodes supporting network-layer security.
    fn included_nls_nodes(&self, page: u8) -> NodeListPage;

    /// Chip type.
    fn chip_type(&self) -> u8;

    /// Chip revision.
    fn chip_revision(&self) -> u8;

    /// Highest tx power the hardware supports.
    fn max_supported_tx_power(&mut self) -> Result<TxPower, StackError>;

    /// Largest application payload for classic frames.
    fn max_payload_size(&self) -> u8;

    /// Largest application payload for Long Range frames.
    fn max_lr_payload_size(&self) -> u8;

    /// Protocol identification.
    fn protocol_info(&self) -> ProtocolInfo;

    /// Region written at manufacturing, if any.
    fn manufacturing_region(&self) -> Option<RfRegion>;

    /// Reads up to `len` bytes of a manufacturing token.
    fn read_mfg_token(&self, token: MfgToken, len: usize) -> Vec<u8>;

    /// Acquires or refreshes a power lock for `timeout_ms`.
    fn power_lock(&mut self, lock: PowerLock, timeout_ms: u32);

    /// Releases a power lock.
    fn power_cancel(&mut self, lock: PowerLock);

    /// Arms the wake-up timer.
    fn start_wakeup_timer(&mut self, timeout_ms: u32);
}
