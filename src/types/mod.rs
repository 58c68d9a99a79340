//! Data types shared across the bridge.
//!
//! This module contains the data structures handed between the radio stack,
//! the request builders and the command handlers:
//! - Node IDs and the node-ID wire width
//! - Radio configuration and regions
//! - Receive options and received frames
//! - Device and protocol information

pub mod device;
pub mod node;
pub mod radio;
pub mod receive;

pub use device::{ApplicationSettings, CommandClassLists, ProtocolInfo, ResetReason};
pub use node::{LR_NODE_MASK_LENGTH, NODE_MASK_LENGTH, NodeId, NodeIdWidth, SharedNodeIdWidth};
pub use radio::{RadioConfig, RegionInfo, RfRegion, TxPower};
pub use receive::{EncryptionRequest, MultiReceive, NodeUpdate, ReceiveOptions, SingleReceive};
