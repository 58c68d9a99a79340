//! Serial port transport.
//!
//! Opens the UART the host is attached to and carries the link timing the
//! engine runs with.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_serial::{SerialPortBuilderExt, SerialStream};

use crate::engine::MAX_SERIAL_RETRY;
use crate::error::{Error, Result};
use crate::protocol::{DEFAULT_ACK_TIMEOUT, SerialLink};

/// Default baud rate of the Serial API.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default time spent discarding stale input after opening the port.
pub const DEFAULT_DRAIN_WINDOW: Duration = Duration::from_millis(100);

/// Configuration for the serial transport.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Serial port path (e.g., "/dev/ttyS0" or "COM3").
    pub port: String,
    /// Baud rate.
    pub baud_rate: u32,
    /// Time to wait for the host to acknowledge a frame.
    pub ack_timeout: Duration,
    /// Retransmissions before a frame is dropped.
    pub max_retry: u8,
    /// Time spent discarding stale input after opening the port.
    pub drain_window: Duration,
}

impl SerialConfig {
    /// Creates a new serial configuration with default settings.
    #[must_use]
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            ack_timeout: DEFAULT_ACK_TIMEOUT,
            max_retry: MAX_SERIAL_RETRY,
            drain_window: DEFAULT_DRAIN_WINDOW,
        }
    }

    /// Sets the baud rate.
    #[must_use]
    pub const fn baud_rate(mut self, rate: u32) -> Self {
        self.baud_rate = rate;
        self
    }

    /// Sets the acknowledgement timeout.
    #[must_use]
    pub const fn ack_timeout(mut self, timeout: Duration) -> Self {
        self.ack_timeout = timeout;
        self
    }

    /// Sets the retransmission budget.
    #[must_use]
    pub const fn max_retry(mut self, retries: u8) -> Self {
        self.max_retry = retries;
        self
    }

    /// Sets the drain window. Zero disables draining.
    #[must_use]
    pub const fn drain_window(mut self, window: Duration) -> Self {
        self.drain_window = window;
        self
    }

    /// A link using this configuration's acknowledgement timeout.
    #[must_use]
    pub fn link(&self) -> SerialLink {
        SerialLink::new(self.ack_timeout)
    }
}

/// Opens the serial port and discards whatever the host sent before.
///
/// # Errors
///
/// Returns an error if the port cannot be opened.
pub async fn open(config: &SerialConfig) -> Result<SerialStream> {
    tracing::info!(
        "opening serial port {} at {} baud",
        config.port,
        config.baud_rate
    );

    let mut stream = tokio_serial::new(&config.port, config.baud_rate)
        .open_native_async()
        .map_err(Error::Serial)?;

    let drained = drain(&mut stream, config.drain_window).await;
    if drained > 0 {
        tracing::debug!("drained {} stale bytes from buffer", drained);
    }

    tracing::info!("serial port open");
    Ok(stream)
}

/// Reads and discards input until `window` has elapsed.
///
/// Returns the number of bytes discarded. Read errors end the drain early.
pub async fn drain<R: AsyncRead + Unpin>(reader: &mut R, window: Duration) -> usize {
    let mut buf = [0u8; 256];
    let mut total = 0usize;

    let deadline = tokio::time::Instant::now() + window;
    loop {
        match tokio::time::timeout_at(deadline, reader.read(&mut buf)).await {
            Ok(Ok(n)) if n > 0 => total += n,
            Ok(Ok(_)) | Err(_) => break,
            Ok(Err(e)) => {
                tracing::debug!("drain stopped: {}", e);
                break;
            }
        }
    }
    total
}

/// Lists available serial ports.
///
/// # Errors
///
/// Returns an error if the port list cannot be retrieved.
pub fn list_ports() -> Result<Vec<String>> {
    let ports = tokio_serial::available_ports().map_err(Error::Serial)?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncWriteExt;

    use super::*;

    #[test]
    fn test_serial_config_defaults() {
        let config = SerialConfig::new("/dev/ttyS0");
        assert_eq!(config.port, "/dev/ttyS0");
        assert_eq!(config.baud_rate, DEFAULT_BAUD_RATE);
        assert_eq!(config.ack_timeout, Duration::from_millis(1600));
        assert_eq!(config.max_retry, 3);
    }

    #[test]
    fn test_serial_config_builder() {
        let config = SerialConfig::new("/dev/ttyS0")
            .baud_rate(9600)
            .ack_timeout(Duration::from_millis(500))
            .max_retry(1)
            .drain_window(Duration::ZERO);
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.ack_timeout, Duration::from_millis(500));
        assert_eq!(config.max_retry, 1);
        assert_eq!(config.drain_window, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_discards_stale_input() {
        let (mut host, mut port) = tokio::io::duplex(64);
        host.write_all(&[0xAA; 10]).await.unwrap();

        let drained = drain(&mut port, Duration::from_millis(100)).await;
        assert_eq!(drained, 10);

        // Data written after the window is left alone
        host.write_all(&[0x01]).await.unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(port.read(&mut buf).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_drain_stops_at_eof() {
        let (host, mut port) = tokio::io::duplex(64);
        drop(host);
        assert_eq!(drain(&mut port, Duration::from_secs(60)).await, 0);
    }

    #[test]
    #[ignore = "Requires /sys/class/tty - not available in sandboxed builds"]
    fn test_list_ports() {
        // Just verify it doesn't panic
        let _ = list_ports();
    }
}
