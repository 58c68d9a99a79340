//! Command handler registry.
//!
//! Inbound frames are dispatched by function identifier. A handler runs
//! synchronously on the engine task and either answers with a response
//! payload or stays silent. Handlers for asynchronous operations queue their
//! later completion through [`HandlerContext::callbacks`].

pub mod management;
pub mod power;

use std::collections::HashMap;

use crate::device::Device;
use crate::protocol::{Frame, FunctionId};
use crate::queue::CallbackQueue;
use crate::request::Payload;

/// What a handler wants sent back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// No response frame.
    None,
    /// Send a response frame with this payload.
    Response(Payload),
}

impl Reply {
    /// Response carrying a copy of `bytes`.
    #[must_use]
    pub fn bytes(bytes: &[u8]) -> Self {
        Self::Response(Payload::copy_from_slice(bytes))
    }
}

/// State a handler may read or change.
pub struct HandlerContext<'a> {
    /// The device behind the link.
    pub device: &'a mut Device,
    /// Queue for callback frames completing asynchronous operations.
    pub callbacks: &'a mut CallbackQueue,
}

/// Handles one function identifier.
pub trait Handler: Send {
    /// Handles an inbound frame.
    fn handle(&mut self, frame: &Frame, ctx: &mut HandlerContext<'_>) -> Reply;
}

impl<F> Handler for F
where
    F: FnMut(&Frame, &mut HandlerContext<'_>) -> Reply + Send,
{
    fn handle(&mut self, frame: &Frame, ctx: &mut HandlerContext<'_>) -> Reply {
        self(frame, ctx)
    }
}

/// Maps function identifiers to handlers.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<u8, Box<dyn Handler>>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the built-in management and power handlers.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(FunctionId::SerialApiSetup, management::serial_api_setup);
        registry.register(FunctionId::GetInitData, management::get_init_data);
        registry.register(FunctionId::GetNlsNodes, management::get_nls_nodes);
        registry.register(FunctionId::GetLrNodes, management::get_lr_nodes);
        registry.register(FunctionId::NvrGetValue, management::get_nvr);
        registry.register(FunctionId::GetProtocolVersion, management::get_protocol_version);
        registry.register(FunctionId::PmStayAwake, power::stay_awake);
        registry.register(FunctionId::PmCancel, power::cancel);
        registry
    }

    /// Registers `handler` for `command`, returning the handler it replaces.
    pub fn register(
        &mut self,
        command: impl Into<u8>,
        handler: impl Handler + 'static,
    ) -> Option<Box<dyn Handler>> {
        self.handlers.insert(command.into(), Box::new(handler))
    }

    /// Removes the handler for `command`.
    pub fn unregister(&mut self, command: impl Into<u8>) -> Option<Box<dyn Handler>> {
        self.handlers.remove(&command.into())
    }

    /// The handler for `command`, if one is registered.
    pub fn lookup_handler(&mut self, command: u8) -> Option<&mut (dyn Handler + 'static)> {
        self.handlers.get_mut(&command).map(|handler| &mut **handler)
    }

    /// True when a handler is registered for `command`.
    #[must_use]
    pub fn contains(&self, command: impl Into<u8>) -> bool {
        self.handlers.contains_key(&command.into())
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// True when no handler is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut commands: Vec<_> = self.handlers.keys().copied().collect();
        commands.sort_unstable();
        f.debug_struct("HandlerRegistry")
            .field("commands", &commands)
            .finish()
    }
}
