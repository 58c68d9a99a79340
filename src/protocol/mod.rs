//! Protocol definitions for Serial API communication.
//!
//! This module contains the low-level protocol types including:
//! - Frame encoding/decoding
//! - Function identifiers and setup subcommands
//! - The acknowledging link the state machine transmits through

pub mod command;
pub mod frame;
pub mod link;

pub use command::{FunctionId, SETUP_UNSUPPORTED, SetupCommand};
pub use frame::{
    ACK, BUF_SIZE_RX, BUF_SIZE_TX, CAN, Frame, FrameDecoder, FrameKind, NAK, SOF, Token, checksum,
};
pub use link::{AckStatus, DEFAULT_ACK_TIMEOUT, FrameLink, SerialLink};
