//! Transport layer between the bridge and the host.
//!
//! The bridge runs over any `AsyncRead + AsyncWrite` byte stream; this
//! module configures and opens the serial port used in production.

pub mod serial;

pub use serial::{DEFAULT_BAUD_RATE, SerialConfig, list_ports, open};
