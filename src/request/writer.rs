//! Bounded payload cursor.
//!
//! Every builder writes through [`PayloadWriter`], which owns the
//! `BUF_SIZE_TX` bound: fixed fields that do not fit are an error, variable
//! sections are cut to whatever space is left after reserving the fields
//! that still have to follow them.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::FrameError;
use crate::protocol::BUF_SIZE_TX;
use crate::types::{NodeId, NodeIdWidth};

/// Encoded frame payload.
pub type Payload = Bytes;

/// Cursor over a payload buffer with a hard length limit.
#[derive(Debug, Clone)]
pub struct PayloadWriter {
    buf: BytesMut,
    limit: usize,
}

impl Default for PayloadWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl PayloadWriter {
    /// Creates a writer limited to [`BUF_SIZE_TX`] bytes.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limit(BUF_SIZE_TX)
    }

    /// Creates a writer with a smaller limit. Limits above [`BUF_SIZE_TX`]
    /// are clamped.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        let limit = limit.min(BUF_SIZE_TX);
        Self {
            buf: BytesMut::with_capacity(limit),
            limit,
        }
    }

    /// Bytes written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True when nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Bytes that can still be written.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.limit - self.buf.len()
    }

    fn reserve(&self, needed: usize) -> Result<(), FrameError> {
        if needed > self.remaining() {
            return Err(FrameError::Overflow {
                needed,
                remaining: self.remaining(),
            });
        }
        Ok(())
    }

    /// Writes a fixed byte.
    pub fn put_u8(&mut self, value: u8) -> Result<(), FrameError> {
        self.reserve(1)?;
        self.buf.put_u8(value);
        Ok(())
    }

    /// Writes a fixed signed byte.
    pub fn put_i8(&mut self, value: i8) -> Result<(), FrameError> {
        self.reserve(1)?;
        self.buf.put_i8(value);
        Ok(())
    }

    /// Writes a fixed big-endian u16.
    pub fn put_u16(&mut self, value: u16) -> Result<(), FrameError> {
        self.reserve(2)?;
        self.buf.put_u16(value);
        Ok(())
    }

    /// Writes a fixed big-endian u32.
    pub fn put_u32(&mut self, value: u32) -> Result<(), FrameError> {
        self.reserve(4)?;
        self.buf.put_u32(value);
        Ok(())
    }

    /// Writes a node ID in the given width.
    ///
    /// In 8-bit mode only the low byte is sent.
    pub fn put_node_id(&mut self, node: NodeId, width: NodeIdWidth) -> Result<(), FrameError> {
        match width {
            NodeIdWidth::Bits8 => self.put_u8((node & 0xFF) as u8),
            NodeIdWidth::Bits16 => self.put_u16(node),
        }
    }

    /// Writes a fixed section that must fit entirely.
    pub fn put_slice(&mut self, data: &[u8]) -> Result<(), FrameError> {
        self.reserve(data.len())?;
        self.buf.put_slice(data);
        Ok(())
    }

    /// How many of `wanted` bytes fit while keeping `trailer` bytes free.
    #[must_use]
    pub fn fit(&self, wanted: usize, trailer: usize) -> usize {
        wanted.min(self.remaining().saturating_sub(trailer))
    }

    /// Writes `length | data`, truncating `data` so that `trailer` bytes
    /// remain available afterwards. Returns the number of data bytes written.
    pub fn put_counted(&mut self, data: &[u8], trailer: usize) -> Result<usize, FrameError> {
        self.reserve(1)?;
        let count = self.fit(data.len(), trailer + 1).min(usize::from(u8::MAX));
        if count < data.len() {
            tracing::debug!(
                "truncating variable section from {} to {} bytes",
                data.len(),
                count
            );
        }
        self.buf.put_u8(count as u8);
        self.buf.put_slice(&data[..count]);
        Ok(count)
    }

    /// Finishes the payload.
    #[must_use]
    pub fn finish(self) -> Payload {
        self.buf.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_field_overflow_is_rejected() {
        let mut writer = PayloadWriter::with_limit(2);
        writer.put_u8(1).unwrap();
        assert_eq!(
            writer.put_u16(0x0102),
            Err(FrameError::Overflow {
                needed: 2,
                remaining: 1
            })
        );
        assert_eq!(writer.len(), 1);
    }

    #[test]
    fn test_counted_section_keeps_trailer_space() {
        let mut writer = PayloadWriter::with_limit(10);
        writer.put_u8(0xAA).unwrap();
        // 9 left: 1 length byte, 2 reserved, 6 for data
        let written = writer.put_counted(&[7; 20], 2).unwrap();
        assert_eq!(written, 6);
        assert_eq!(writer.remaining(), 2);

        let payload = writer.finish();
        assert_eq!(payload[1], 6);
        assert_eq!(&payload[2..], &[7; 6]);
    }

    #[test]
    fn test_node_id_width() {
        let mut writer = PayloadWriter::new();
        writer.put_node_id(0x0123, NodeIdWidth::Bits8).unwrap();
        writer.put_node_id(0x0123, NodeIdWidth::Bits16).unwrap();
        assert_eq!(&writer.finish()[..], &[0x23, 0x01, 0x23]);
    }

    #[test]
    fn test_limit_is_clamped() {
        let writer = PayloadWriter::with_limit(1000);
        assert_eq!(writer.remaining(), BUF_SIZE_TX);
    }
}
