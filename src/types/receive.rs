//! Data delivered by the radio stack with received frames.

use crate::types::node::{NODE_MASK_LENGTH, NodeId};

/// Frame was routed and the route is busy.
pub const RECEIVE_STATUS_ROUTED_BUSY: u8 = 0x01;
/// Frame was sent at low power.
pub const RECEIVE_STATUS_LOW_POWER: u8 = 0x02;
/// Frame was a broadcast.
pub const RECEIVE_STATUS_TYPE_BROAD: u8 = 0x04;
/// Frame was a multicast.
pub const RECEIVE_STATUS_TYPE_MULTI: u8 = 0x08;
/// Frame was received in promiscuous mode.
pub const RECEIVE_STATUS_FOREIGN_FRAME: u8 = 0x40;

/// Receive options attached to an application frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiveOptions {
    /// `RECEIVE_STATUS_*` flags.
    pub rx_status: u8,
    /// Sending node.
    pub source_node: NodeId,
    /// Addressed node (bridge and virtual nodes).
    pub dest_node: NodeId,
    /// Received signal strength.
    pub rssi: i8,
    /// Security key the frame was decrypted with.
    pub security_key: u8,
    /// Tx power reported by the sender.
    pub source_tx_power: i8,
    /// Noise floor reported by the sender.
    pub source_noise_floor: i8,
}

impl ReceiveOptions {
    /// True when the multicast bit is set, whatever the broadcast bit says.
    #[must_use]
    pub const fn is_multicast(&self) -> bool {
        self.rx_status & RECEIVE_STATUS_TYPE_MULTI != 0
    }
}

/// Application frame addressed to this node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleReceive {
    /// Receive options.
    pub options: ReceiveOptions,
    /// Application command bytes.
    pub payload: Vec<u8>,
}

/// Application frame received through a bridge or as multicast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiReceive {
    /// Receive options.
    pub options: ReceiveOptions,
    /// Application command bytes.
    pub payload: Vec<u8>,
    /// Multicast destinations.
    pub node_mask: [u8; NODE_MASK_LENGTH],
}

/// Node information received from another node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeUpdate {
    /// Update status.
    pub status: u8,
    /// Node the information describes.
    pub node_id: NodeId,
    /// Node information frame.
    pub info: Vec<u8>,
}

/// Request from the stack to have a protocol command class encrypted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionRequest {
    /// Destination of the protocol frame.
    pub dest_node: NodeId,
    /// Protocol command bytes.
    pub payload: Vec<u8>,
    /// Opaque metadata to hand back with the encrypted frame.
    pub metadata: Vec<u8>,
    /// Wrap in supervision.
    pub use_supervision: bool,
}
