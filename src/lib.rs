//! # ncp-serialapi
//!
//! Serial API frame protocol engine for a radio network controller.
//!
//! The controller talks to its host over a single serial link. This crate
//! turns that byte stream into a reliable command, response and
//! notification channel: frames are checksummed and acknowledged, lost
//! frames are retransmitted a bounded number of times, and outbound traffic
//! waits in two bounded queues so command completions always go out before
//! protocol events.
//!
//! ## Features
//!
//! - Async/await scheduler using Tokio over any `AsyncRead + AsyncWrite` port
//! - Non-blocking state machine with a bounded retry budget
//! - Byte-exact request builders honouring the 8/16-bit node-ID width
//! - Pluggable command handlers with built-in setup and power commands
//!
//! ## Quick Start
//!
//! ```no_run
//! # use ncp_serialapi::{ControllerStack, DeviceConfig, SettingsStore};
//! # fn radio() -> Box<dyn ControllerStack> { unimplemented!() }
//! # fn storage() -> Box<dyn SettingsStore> { unimplemented!() }
//! use ncp_serialapi::{Bridge, Device, HandlerRegistry, SerialConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ncp_serialapi::Error> {
//!     let device = Device::boot(radio(), storage(), DeviceConfig::default());
//!     let config = SerialConfig::new("/dev/ttyS0");
//!
//!     let mut bridge = Bridge::open(&config, device, HandlerRegistry::with_defaults()).await?;
//!
//!     // Hand this to the radio stack's receive callbacks
//!     let _notifier = bridge.notifier();
//!
//!     bridge.run().await
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`protocol`] - Wire codec, function identifiers and the acknowledging link
//! - [`queue`] - Bounded callback and unsolicited queues
//! - [`request`] - Payload writer and request builders
//! - [`engine`] - The protocol state machine
//! - [`handlers`] - Handler registry and built-in command handlers
//! - [`event`] - Radio stack events fed into the unsolicited queue
//! - [`settings`] - Settings store interface and boot configuration
//! - [`stack`] - Radio stack interface
//! - [`transport`] - Serial port configuration
//! - [`bridge`] - The async task driving the engine

pub mod bridge;
pub mod device;
pub mod engine;
pub mod error;
pub mod event;
pub mod handlers;
pub mod protocol;
pub mod queue;
pub mod request;
pub mod settings;
pub mod stack;
pub mod transport;
pub mod types;

#[cfg(test)]
mod testing;

// Re-exports for convenience
pub use bridge::Bridge;
pub use device::Device;
pub use engine::{Engine, MAX_SERIAL_RETRY, ProtocolState};
pub use error::{Error, FrameError, Result, SettingsError, StackError};
pub use event::{Notifier, StackEvent};
pub use handlers::{Handler, HandlerContext, HandlerRegistry, Reply};
pub use protocol::{Frame, FrameKind, FunctionId};
pub use settings::{DeviceConfig, MemorySettings, SettingsStore};
pub use stack::ControllerStack;
pub use transport::SerialConfig;
