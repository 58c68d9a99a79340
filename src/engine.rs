//! Serial API protocol state machine.
//!
//! The [`Engine`] decides on every wake-up whether to transmit queued
//! traffic, dispatch an inbound frame or progress the acknowledgement cycle
//! of the frame in flight. It never blocks: each [`Engine::step`] does a
//! bounded amount of work and returns.
//!
//! ```text
//!  Startup ──► Idle ──┬─ callback queued ──► TxCallback ─┐
//!               ▲     ├─ unsolicited queued ► TxCommand ─┤ ack or
//!               │     └─ frame received ──► FrameParse   │ retries
//!               │                              │         │ exhausted
//!               │                     response ▼         │
//!               ├──────────────────────── TxResponse     │
//!               └────────────────────────────────────────┘
//! ```

use std::mem;
use std::sync::Arc;

use tokio::sync::Notify;

use crate::device::Device;
use crate::event::Notifier;
use crate::handlers::{HandlerContext, HandlerRegistry, Reply};
use crate::protocol::{AckStatus, Frame, FrameKind, FrameLink, FunctionId};
use crate::queue::{CallbackQueue, QueueEntry, UnsolicitedQueue};
use crate::request::{RequestBuilder, StartupInfo};

/// Retransmissions after the first attempt before a frame is dropped.
pub const MAX_SERIAL_RETRY: u8 = 3;

/// State of the protocol engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolState {
    /// Post-boot initialisation pending.
    Startup,
    /// Nothing in flight.
    Idle,
    /// A complete inbound frame waits for dispatch.
    FrameParse(Frame),
    /// Waiting for the host to acknowledge a response.
    TxResponse,
    /// Waiting for the host to acknowledge the front callback entry.
    TxCallback,
    /// Waiting for the host to acknowledge the front unsolicited entry.
    TxCommand,
}

/// Where the frame in flight came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Response,
    Callback,
    Command,
}

impl Source {
    const fn waiting(self) -> ProtocolState {
        match self {
            Self::Response => ProtocolState::TxResponse,
            Self::Callback => ProtocolState::TxCallback,
            Self::Command => ProtocolState::TxCommand,
        }
    }
}

/// The protocol state machine.
///
/// Owns the link, both outbound queues, the handler registry and the
/// device. The retry counter is shared by the three transmit states since
/// only one of them is active at a time.
pub struct Engine<L> {
    link: L,
    state: ProtocolState,
    retry: u8,
    max_retry: u8,
    in_flight: Option<Frame>,
    callbacks: CallbackQueue,
    unsolicited: UnsolicitedQueue,
    registry: HandlerRegistry,
    device: Device,
    notifier: Notifier,
    wake: Arc<Notify>,
}

impl<L: FrameLink> Engine<L> {
    /// Creates an engine in the [`ProtocolState::Startup`] state.
    #[must_use]
    pub fn new(link: L, device: Device, registry: HandlerRegistry) -> Self {
        let wake = Arc::new(Notify::new());
        let unsolicited = UnsolicitedQueue::new(Arc::clone(&wake));
        let notifier = Notifier::new(unsolicited.clone(), device.node_id_width.clone());
        Self {
            link,
            state: ProtocolState::Startup,
            retry: 0,
            max_retry: MAX_SERIAL_RETRY,
            in_flight: None,
            callbacks: CallbackQueue::new(Arc::clone(&wake)),
            unsolicited,
            registry,
            device,
            notifier,
            wake,
        }
    }

    /// Sets the retransmission budget.
    #[must_use]
    pub const fn with_max_retry(mut self, max_retry: u8) -> Self {
        self.max_retry = max_retry;
        self
    }

    /// Runs one state handler.
    ///
    /// Returns `true` when the state changed, meaning another step may
    /// have more work to do.
    pub fn step(&mut self) -> bool {
        let before = mem::discriminant(&self.state);
        let next = match mem::replace(&mut self.state, ProtocolState::Idle) {
            ProtocolState::Startup => self.startup(),
            ProtocolState::Idle => self.idle(),
            ProtocolState::FrameParse(frame) => self.dispatch(&frame),
            ProtocolState::TxResponse => self.await_ack(Source::Response),
            ProtocolState::TxCallback => self.await_ack(Source::Callback),
            ProtocolState::TxCommand => self.await_ack(Source::Command),
        };
        self.state = next;

        let changed = before != mem::discriminant(&self.state);
        if changed {
            tracing::debug!("state -> {:?}", self.state);
        }
        changed
    }

    /// Steps until the state settles.
    pub fn poll(&mut self) {
        while self.step() {}
    }

    fn startup(&mut self) -> ProtocolState {
        let stack = &mut self.device.stack;
        if let Err(e) = stack.set_rf_receive_mode(true) {
            tracing::warn!("failed to enable receive mode: {}", e);
        }
        let reset_info = match stack.read_reset_info() {
            Ok(info) => Some(info),
            Err(e) => {
                tracing::warn!("reset info unavailable: {}", e);
                None
            }
        };

        let device = &self.device;
        let info = StartupInfo {
            reset_reason: device.reset_reason,
            watchdog_started: device.watchdog_started,
            settings: device.config.application,
            command_classes: &device.config.command_classes.unsecure_included,
            long_range: device.config.radio.region.is_long_range(),
            reset_info,
        };
        match RequestBuilder::new(device.node_id_width.get()).startup(&info) {
            Ok(payload) => {
                self.callbacks
                    .enqueue(FunctionId::SerialApiStarted.into(), &payload);
            }
            Err(e) => tracing::warn!("failed to build startup notification: {}", e),
        }
        ProtocolState::Idle
    }

    fn idle(&mut self) -> ProtocolState {
        if let Some(entry) = self.callbacks.peek_front().copied() {
            return self.transmit_entry(&entry, Source::Callback);
        }
        if let Some(entry) = self.unsolicited.peek_front() {
            return self.transmit_entry(&entry, Source::Command);
        }
        match self.link.recv_frame() {
            Some(frame) => ProtocolState::FrameParse(frame),
            None => ProtocolState::Idle,
        }
    }

    fn dispatch(&mut self, frame: &Frame) -> ProtocolState {
        let command = frame.command();
        let Some(handler) = self.registry.lookup_handler(command) else {
            tracing::debug!("no handler for cmd=0x{:02x}, dropping frame", command);
            return ProtocolState::Idle;
        };

        let mut ctx = HandlerContext {
            device: &mut self.device,
            callbacks: &mut self.callbacks,
        };
        match handler.handle(frame, &mut ctx) {
            Reply::None => ProtocolState::Idle,
            Reply::Response(payload) => {
                match Frame::new(FrameKind::Response, command, payload) {
                    Ok(response) => {
                        self.transmit(response);
                        ProtocolState::TxResponse
                    }
                    Err(e) => {
                        tracing::warn!("dropping response to cmd=0x{:02x}: {}", command, e);
                        ProtocolState::Idle
                    }
                }
            }
        }
    }

    fn transmit_entry(&mut self, entry: &QueueEntry, source: Source) -> ProtocolState {
        match entry.to_frame() {
            Ok(frame) => {
                self.transmit(frame);
                source.waiting()
            }
            Err(e) => {
                tracing::warn!("dropping queued cmd=0x{:02x}: {}", entry.command(), e);
                self.release(source);
                self.wake.notify_one();
                ProtocolState::Idle
            }
        }
    }

    fn transmit(&mut self, frame: Frame) {
        self.retry = 0;
        self.link.send_frame(&frame);
        self.in_flight = Some(frame);
    }

    fn await_ack(&mut self, source: Source) -> ProtocolState {
        match self.link.poll_ack() {
            AckStatus::Pending => source.waiting(),
            AckStatus::Acked => {
                self.retry = 0;
                self.release(source);
                ProtocolState::Idle
            }
            AckStatus::Failed if self.retry < self.max_retry => {
                self.retry += 1;
                if let Some(frame) = &self.in_flight {
                    tracing::debug!(
                        "retransmitting cmd=0x{:02x} (retry {}/{})",
                        frame.command(),
                        self.retry,
                        self.max_retry
                    );
                    self.link.send_frame(frame);
                }
                source.waiting()
            }
            AckStatus::Failed => {
                if let Some(frame) = &self.in_flight {
                    tracing::warn!(
                        "dropping cmd=0x{:02x} after {} attempts",
                        frame.command(),
                        u16::from(self.retry) + 1
                    );
                }
                self.retry = 0;
                self.release(source);
                ProtocolState::Idle
            }
        }
    }

    /// Forgets the frame in flight and pops the queue it came from.
    fn release(&mut self, source: Source) {
        self.in_flight = None;
        match source {
            Source::Response => {}
            Source::Callback => self.callbacks.dequeue_front(),
            Source::Command => self.unsolicited.dequeue_front(),
        }
    }

    /// Queues a callback frame completing an asynchronous host command.
    ///
    /// Returns `false` when the callback queue is full.
    pub fn enqueue_callback(&mut self, command: impl Into<u8>, payload: &[u8]) -> bool {
        self.callbacks.enqueue(command.into(), payload)
    }

    /// Drops every queued callback frame.
    ///
    /// A frame already in flight is still retried, then popped from the
    /// emptied queue as a no-op.
    pub fn purge_callbacks(&mut self) {
        self.callbacks.purge();
    }

    /// Drops every queued unsolicited frame.
    pub fn purge_unsolicited(&self) {
        self.unsolicited.purge();
    }

    /// The unsolicited queue, shareable with the radio stack's context.
    #[must_use]
    pub const fn unsolicited(&self) -> &UnsolicitedQueue {
        &self.unsolicited
    }

    /// A notifier feeding stack events into the unsolicited queue.
    #[must_use]
    pub fn notifier(&self) -> Notifier {
        self.notifier.clone()
    }

    /// Notified whenever either queue receives an entry.
    #[must_use]
    pub fn wake_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.wake)
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &ProtocolState {
        &self.state
    }

    /// Retransmissions of the frame in flight so far.
    #[must_use]
    pub const fn retry(&self) -> u8 {
        self.retry
    }

    /// Number of queued callback frames.
    #[must_use]
    pub const fn pending_callbacks(&self) -> usize {
        self.callbacks.len()
    }

    /// The link.
    #[must_use]
    pub const fn link(&self) -> &L {
        &self.link
    }

    /// Mutable access to the link.
    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// The device.
    #[must_use]
    pub const fn device(&self) -> &Device {
        &self.device
    }

    /// Mutable access to the device.
    pub fn device_mut(&mut self) -> &mut Device {
        &mut self.device
    }

    /// Mutable access to the handler registry.
    pub fn registry_mut(&mut self) -> &mut HandlerRegistry {
        &mut self.registry
    }
}

impl<L: std::fmt::Debug> std::fmt::Debug for Engine<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("state", &self.state)
            .field("retry", &self.retry)
            .field("max_retry", &self.max_retry)
            .field("callbacks", &self.callbacks.len())
            .field("unsolicited", &self.unsolicited.len())
            .field("link", &self.link)
            .finish_non_exhaustive()
    }
}
