//! Protocol stack events.
//!
//! The radio stack reports received frames and node updates from its own
//! context. A [`Notifier`] turns each [`StackEvent`] into a request payload
//! and queues it as unsolicited traffic for the engine to deliver.

use std::sync::{Arc, Mutex, PoisonError};

use crate::error::FrameError;
use crate::protocol::FunctionId;
use crate::queue::UnsolicitedQueue;
use crate::request::{Payload, RequestBuilder};
use crate::types::{EncryptionRequest, MultiReceive, NodeUpdate, SharedNodeIdWidth, SingleReceive};

/// Event raised by the radio stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackEvent {
    /// Application frame addressed to this node.
    Received(SingleReceive),
    /// Application frame received as multicast or for a virtual node.
    ReceivedMulti(MultiReceive),
    /// Node information received.
    NodeUpdate(NodeUpdate),
    /// Protocol command to be encrypted by the host.
    EncryptionRequest(EncryptionRequest),
}

impl StackEvent {
    /// Function identifier the event is delivered with.
    #[must_use]
    pub const fn function_id(&self) -> FunctionId {
        match self {
            Self::Received(_) => FunctionId::ApplicationCommandHandler,
            Self::ReceivedMulti(_) => FunctionId::ApplicationCommandHandlerBridge,
            Self::NodeUpdate(_) => FunctionId::ApplicationUpdate,
            Self::EncryptionRequest(_) => FunctionId::RequestProtocolCcEncryption,
        }
    }
}

/// Queues stack events for the host.
///
/// Cheap to clone and safe to use from any thread.
#[derive(Debug, Clone)]
pub struct Notifier {
    queue: UnsolicitedQueue,
    width: SharedNodeIdWidth,
    session: Arc<Mutex<u8>>,
}

impl Notifier {
    /// Creates a notifier feeding `queue`, encoding node IDs in the width
    /// held by `width` at the time each event is built.
    #[must_use]
    pub fn new(queue: UnsolicitedQueue, width: SharedNodeIdWidth) -> Self {
        Self {
            queue,
            width,
            session: Arc::new(Mutex::new(0)),
        }
    }

    fn builder(&self) -> RequestBuilder {
        RequestBuilder::new(self.width.get())
    }

    fn build(&self, event: &StackEvent) -> Result<Payload, FrameError> {
        let builder = self.builder();
        match event {
            StackEvent::Received(rx) => builder.application_command(rx),
            StackEvent::ReceivedMulti(rx) => builder.bridge_command(rx),
            StackEvent::NodeUpdate(update) => builder.node_update(update),
            StackEvent::EncryptionRequest(request) => {
                let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
                let payload = builder.encryption_request(request, *session)?;
                *session = *session % 255 + 1;
                Ok(payload)
            }
        }
    }

    /// Builds and queues an event.
    ///
    /// Returns `false` when the event could not be encoded or the queue is
    /// full. For encryption requests the caller reports this back to the
    /// stack as a failure.
    pub fn notify(&self, event: &StackEvent) -> bool {
        let command = event.function_id();
        match self.build(event) {
            Ok(payload) => self.queue.enqueue(command.into(), &payload),
            Err(e) => {
                tracing::warn!("dropping {:?} event: {}", command, e);
                false
            }
        }
    }

    /// Queues an application frame received from a single node.
    pub fn application_command(&self, rx: SingleReceive) -> bool {
        self.notify(&StackEvent::Received(rx))
    }

    /// Queues an application frame received through a bridge or multicast.
    pub fn bridge_command(&self, rx: MultiReceive) -> bool {
        self.notify(&StackEvent::ReceivedMulti(rx))
    }

    /// Queues a node information update.
    pub fn node_update(&self, update: NodeUpdate) -> bool {
        self.notify(&StackEvent::NodeUpdate(update))
    }

    /// Queues a protocol encryption request.
    pub fn encryption_request(&self, request: EncryptionRequest) -> bool {
        self.notify(&StackEvent::EncryptionRequest(request))
    }
}
