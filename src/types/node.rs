//! Node identifiers and their wire width.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// Node identifier as used by the radio stack.
pub type NodeId = u16;

/// Bytes of a classic node bitmask (232 nodes).
pub const NODE_MASK_LENGTH: usize = 29;

/// Bytes of a Long Range node bitmask (1024 nodes).
pub const LR_NODE_MASK_LENGTH: usize = 128;

/// Width used to encode node IDs on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NodeIdWidth {
    /// One byte per node ID (legacy).
    #[default]
    Bits8 = 1,
    /// Two bytes per node ID, big-endian.
    Bits16 = 2,
}

impl NodeIdWidth {
    /// Parses the persisted base-type value.
    #[must_use]
    pub const fn from_base_type(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Bits8),
            2 => Some(Self::Bits16),
            _ => None,
        }
    }

    /// The persisted base-type value.
    #[must_use]
    pub const fn base_type(self) -> u8 {
        self as u8
    }

    /// Bytes taken by one node ID.
    #[must_use]
    pub const fn bytes(self) -> usize {
        self as usize
    }
}

/// Node-ID width shared between the setup handler and the request builders.
///
/// Builders read it once per frame, so a change only affects frames built
/// after it.
#[derive(Debug, Clone, Default)]
pub struct SharedNodeIdWidth {
    inner: Arc<AtomicU8>,
}

impl SharedNodeIdWidth {
    /// Creates a handle holding `width`.
    #[must_use]
    pub fn new(width: NodeIdWidth) -> Self {
        Self {
            inner: Arc::new(AtomicU8::new(width.base_type())),
        }
    }

    /// Current width.
    #[must_use]
    pub fn get(&self) -> NodeIdWidth {
        NodeIdWidth::from_base_type(self.inner.load(Ordering::Acquire)).unwrap_or_default()
    }

    /// Replaces the width.
    pub fn set(&self, width: NodeIdWidth) {
        self.inner.store(width.base_type(), Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_type_values() {
        assert_eq!(NodeIdWidth::from_base_type(1), Some(NodeIdWidth::Bits8));
        assert_eq!(NodeIdWidth::from_base_type(2), Some(NodeIdWidth::Bits16));
        assert_eq!(NodeIdWidth::from_base_type(0), None);
        assert_eq!(NodeIdWidth::from_base_type(3), None);
        assert_eq!(NodeIdWidth::Bits16.bytes(), 2);
    }

    #[test]
    fn test_shared_width_is_shared() {
        let width = SharedNodeIdWidth::new(NodeIdWidth::Bits8);
        let other = width.clone();
        other.set(NodeIdWidth::Bits16);
        assert_eq!(width.get(), NodeIdWidth::Bits16);
    }
}
