//! Async scheduler driving the engine over a byte stream.
//!
//! One task owns the port and the engine. It sleeps until bytes arrive, the
//! acknowledgement deadline passes or a queue receives an entry, then steps
//! the engine until its state settles and flushes what it produced.

use futures::future::OptionFuture;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;
use tokio_serial::SerialStream;

use crate::device::Device;
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::event::Notifier;
use crate::handlers::HandlerRegistry;
use crate::protocol::SerialLink;
use crate::transport::{self, SerialConfig};

const READ_BUFFER_SIZE: usize = 256;

/// The engine bound to a port.
#[derive(Debug)]
pub struct Bridge<S> {
    port: S,
    engine: Engine<SerialLink>,
}

impl Bridge<SerialStream> {
    /// Opens the configured serial port and binds a new engine to it.
    ///
    /// # Errors
    ///
    /// Returns an error if the port cannot be opened.
    pub async fn open(
        config: &SerialConfig,
        device: Device,
        registry: HandlerRegistry,
    ) -> Result<Self> {
        let port = transport::open(config).await?;
        Ok(Self::new(port, config, device, registry))
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> Bridge<S> {
    /// Binds a new engine to `port`.
    #[must_use]
    pub fn new(
        port: S,
        config: &SerialConfig,
        device: Device,
        registry: HandlerRegistry,
    ) -> Self {
        let engine =
            Engine::new(config.link(), device, registry).with_max_retry(config.max_retry);
        Self { port, engine }
    }

    /// The engine.
    #[must_use]
    pub const fn engine(&self) -> &Engine<SerialLink> {
        &self.engine
    }

    /// Mutable access to the engine.
    pub fn engine_mut(&mut self) -> &mut Engine<SerialLink> {
        &mut self.engine
    }

    /// A notifier for the radio stack to report events through.
    #[must_use]
    pub fn notifier(&self) -> Notifier {
        self.engine.notifier()
    }

    /// Runs the bridge until the port closes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PortClosed`] when the port reaches end of file, or
    /// an I/O error if reading or writing fails.
    pub async fn run(&mut self) -> Result<()> {
        let wake = self.engine.wake_handle();
        let mut buf = [0u8; READ_BUFFER_SIZE];

        loop {
            self.engine.poll();
            self.flush().await?;

            let deadline = self.engine.link().deadline();
            let timeout: OptionFuture<_> = deadline.map(tokio::time::sleep_until).into();

            tokio::select! {
                read = self.port.read(&mut buf) => match read {
                    Ok(0) => {
                        tracing::info!("serial port closed");
                        return Err(Error::PortClosed);
                    }
                    Ok(n) => {
                        tracing::trace!("received {} bytes: {}", n, hex::encode(&buf[..n]));
                        self.engine.link_mut().feed(&buf[..n]);
                    }
                    Err(e) => {
                        tracing::error!("serial read error: {}", e);
                        return Err(Error::Io(e));
                    }
                },
                () = wake.notified() => {}
                Some(()) = timeout => {
                    self.engine.link_mut().expire(Instant::now());
                }
            }
        }
    }

    async fn flush(&mut self) -> Result<()> {
        let outgoing = self.engine.link_mut().take_outgoing();
        if outgoing.is_empty() {
            return Ok(());
        }
        tracing::trace!("sending {} bytes", outgoing.len());
        self.port.write_all(&outgoing).await?;
        self.port.flush().await?;
        Ok(())
    }
}
