//! Error types for the Serial API bridge.

use thiserror::Error;

/// The main error type for bridge operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Serial port error.
    #[error("serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Frame encoding/decoding error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Settings store error.
    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),

    /// Protocol stack collaborator error.
    #[error("stack error: {0}")]
    Stack(#[from] StackError),

    /// The host side of the port went away.
    #[error("port closed")]
    PortClosed,
}

/// Frame-specific errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Frame too short to contain type, command and checksum.
    #[error("frame too short: length field {0} is below the minimum of 3")]
    TooShort(usize),

    /// Frame payload exceeds maximum size.
    #[error("frame too large: {size} bytes exceeds maximum {max}")]
    TooLarge { size: usize, max: usize },

    /// Unknown frame type byte.
    #[error("unknown frame type 0x{0:02x}")]
    UnknownType(u8),

    /// Checksum mismatch.
    #[error("checksum mismatch: expected 0x{expected:02x}, got 0x{got:02x}")]
    Checksum { expected: u8, got: u8 },

    /// A fixed field did not fit in the remaining payload space.
    #[error("payload overflow: need {needed} bytes, {remaining} remaining")]
    Overflow { needed: usize, remaining: usize },

    /// A request payload could not be relayed as given.
    #[error("invalid payload: {reason}")]
    InvalidPayload { reason: &'static str },
}

/// Errors reported by a settings store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    /// The key has never been written.
    #[error("setting not found: {0}")]
    NotFound(&'static str),

    /// The stored value could not be interpreted.
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },

    /// The underlying storage failed.
    #[error("storage failure: {0}")]
    Storage(String),
}

/// Errors reported by the radio protocol stack.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StackError {
    /// A retention register could not be read.
    #[error("retention register read failed")]
    RetentionRead,

    /// The stack rejected or did not answer a command.
    #[error("stack command failed: {0}")]
    Command(String),
}

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, Error>;
