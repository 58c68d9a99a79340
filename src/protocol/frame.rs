//! Frame encoding and decoding for the Serial API.
//!
//! The wire format uses single-byte control symbols and checksummed data frames:
//! ```text
//! ┌──────┬──────┬──────┬──────┬───────────────┬──────────┐
//! │ SOF  │ LEN  │ TYPE │ CMD  │   payload     │ CHECKSUM │
//! │ 0x01 │  1   │  1   │  1   │  LEN - 3      │    1     │
//! └──────┴──────┴──────┴──────┴───────────────┴──────────┘
//! ```
//! `LEN` counts `TYPE`, `CMD`, the payload and the checksum. The checksum is
//! `0xFF` XOR-ed with every byte from `LEN` through the last payload byte.
//! `ACK` (0x06), `NAK` (0x15) and `CAN` (0x18) travel as lone bytes.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::FrameError;

/// Start of frame.
pub const SOF: u8 = 0x01;
/// Positive acknowledgement.
pub const ACK: u8 = 0x06;
/// Negative acknowledgement.
pub const NAK: u8 = 0x15;
/// Cancel, sent when a frame collides with an outstanding transmission.
pub const CAN: u8 = 0x18;

/// Maximum payload of a frame sent to the host.
pub const BUF_SIZE_TX: usize = 180;

/// Maximum payload accepted from the host.
pub const BUF_SIZE_RX: usize = 180;

/// Bytes of a data frame beyond its payload (`SOF LEN TYPE CMD CHK`).
pub const FRAME_OVERHEAD: usize = 5;

/// Smallest valid value of the length field.
const MIN_LENGTH_FIELD: usize = 3;

/// Direction of a data frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameKind {
    /// Request, either from the host or unsolicited from the device.
    Request = 0x00,
    /// Immediate response to a host request.
    Response = 0x01,
}

impl TryFrom<u8> for FrameKind {
    type Error = FrameError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Self::Request),
            0x01 => Ok(Self::Response),
            other => Err(FrameError::UnknownType(other)),
        }
    }
}

/// One unit of protocol exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    kind: FrameKind,
    command: u8,
    payload: Bytes,
}

impl Frame {
    /// Creates a frame, rejecting payloads longer than [`BUF_SIZE_TX`].
    pub fn new(
        kind: FrameKind,
        command: u8,
        payload: impl Into<Bytes>,
    ) -> Result<Self, FrameError> {
        let payload = payload.into();
        if payload.len() > BUF_SIZE_TX {
            return Err(FrameError::TooLarge {
                size: payload.len(),
                max: BUF_SIZE_TX,
            });
        }
        Ok(Self {
            kind,
            command,
            payload,
        })
    }

    /// Creates a request frame.
    pub fn request(command: u8, payload: &[u8]) -> Result<Self, FrameError> {
        Self::new(FrameKind::Request, command, Bytes::copy_from_slice(payload))
    }

    /// Creates a response frame.
    pub fn response(command: u8, payload: &[u8]) -> Result<Self, FrameError> {
        Self::new(FrameKind::Response, command, Bytes::copy_from_slice(payload))
    }

    /// Frame direction.
    #[must_use]
    pub const fn kind(&self) -> FrameKind {
        self.kind
    }

    /// Function identifier.
    #[must_use]
    pub const fn command(&self) -> u8 {
        self.command
    }

    /// Frame payload.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Encodes the frame for the wire.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(FRAME_OVERHEAD + self.payload.len());
        buf.put_u8(SOF);
        // payload is bounded by BUF_SIZE_TX so the length always fits in a byte
        buf.put_u8((self.payload.len() + MIN_LENGTH_FIELD) as u8);
        buf.put_u8(self.kind as u8);
        buf.put_u8(self.command);
        buf.put_slice(&self.payload);
        let chk = checksum(&buf[1..]);
        buf.put_u8(chk);
        buf.freeze()
    }
}

/// Computes the frame checksum over `LEN` through the last payload byte.
#[must_use]
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0xFF, |acc, b| acc ^ b)
}

/// A decoded unit from the inbound byte stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Host acknowledged our last frame.
    Ack,
    /// Host rejected our last frame.
    Nak,
    /// Host cancelled our last frame.
    Can,
    /// A complete, checksum-verified data frame.
    Frame(Frame),
}

/// Frame decoder that handles partial data.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: BytesMut,
}

impl FrameDecoder {
    /// Creates a new frame decoder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::new(),
        }
    }

    /// Feeds data into the decoder.
    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Attempts to decode the next token.
    ///
    /// Returns `Ok(Some(token))` when a control byte or a complete frame was
    /// decoded, `Ok(None)` if more data is needed, or an error for a frame
    /// that must be NAK-ed. Bytes that cannot start a token are skipped.
    pub fn decode(&mut self) -> Result<Option<Token>, FrameError> {
        loop {
            let Some(&first) = self.buffer.first() else {
                return Ok(None);
            };

            match first {
                ACK => {
                    self.buffer.advance(1);
                    return Ok(Some(Token::Ack));
                }
                NAK => {
                    self.buffer.advance(1);
                    return Ok(Some(Token::Nak));
                }
                CAN => {
                    self.buffer.advance(1);
                    return Ok(Some(Token::Can));
                }
                SOF => return self.decode_frame(),
                other => {
                    tracing::trace!("skipping stray byte 0x{:02x}", other);
                    self.buffer.advance(1);
                }
            }
        }
    }

    fn decode_frame(&mut self) -> Result<Option<Token>, FrameError> {
        if self.buffer.len() < 2 {
            return Ok(None);
        }

        let length = self.buffer[1] as usize;
        if length < MIN_LENGTH_FIELD {
            self.buffer.advance(1);
            return Err(FrameError::TooShort(length));
        }
        if length - MIN_LENGTH_FIELD > BUF_SIZE_RX {
            self.buffer.advance(1);
            return Err(FrameError::TooLarge {
                size: length - MIN_LENGTH_FIELD,
                max: BUF_SIZE_RX,
            });
        }

        // SOF + LEN field + LEN bytes
        let total = length + 2;
        if self.buffer.len() < total {
            return Ok(None);
        }

        let raw = self.buffer.split_to(total).freeze();
        let expected = checksum(&raw[1..total - 1]);
        let got = raw[total - 1];
        if expected != got {
            return Err(FrameError::Checksum { expected, got });
        }

        let kind = FrameKind::try_from(raw[2])?;
        let frame = Frame {
            kind,
            command: raw[3],
            payload: raw.slice(4..total - 1),
        };
        Ok(Some(Token::Frame(frame)))
    }

    /// Returns the number of bytes currently buffered.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Clears the internal buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_known_frame() {
        // Well-known "get version" request: 01 03 00 15 E9
        let frame = Frame::request(0x15, &[]).unwrap();
        assert_eq!(&frame.encode()[..], &[0x01, 0x03, 0x00, 0x15, 0xE9]);
    }

    #[test]
    fn test_encode_with_payload() {
        let frame = Frame::response(0x0B, &[0x80, 0x01]).unwrap();
        let wire = frame.encode();
        assert_eq!(wire[0], SOF);
        assert_eq!(wire[1], 5);
        assert_eq!(wire[2], FrameKind::Response as u8);
        assert_eq!(wire[3], 0x0B);
        assert_eq!(&wire[4..6], &[0x80, 0x01]);
        assert_eq!(wire[6], checksum(&wire[1..6]));
    }

    #[test]
    fn test_new_rejects_oversized_payload() {
        let err = Frame::request(0x04, &[0u8; BUF_SIZE_TX + 1]).unwrap_err();
        assert_eq!(
            err,
            FrameError::TooLarge {
                size: BUF_SIZE_TX + 1,
                max: BUF_SIZE_TX
            }
        );
        assert!(Frame::request(0x04, &[0u8; BUF_SIZE_TX]).is_ok());
    }

    #[test]
    fn test_decode_control_bytes() {
        let mut decoder = FrameDecoder::new();
        decoder.feed(&[ACK, NAK, CAN]);
        assert_eq!(decoder.decode().unwrap(), Some(Token::Ack));
        assert_eq!(decoder.decode().unwrap(), Some(Token::Nak));
        assert_eq!(decoder.decode().unwrap(), Some(Token::Can));
        assert_eq!(decoder.decode().unwrap(), None);
    }

    #[test]
    fn test_decode_partial_frame() {
        let wire = Frame::request(0x0B, &[0x01]).unwrap().encode();
        let mut decoder = FrameDecoder::new();

        decoder.feed(&wire[..3]);
        assert_eq!(decoder.decode().unwrap(), None);

        decoder.feed(&wire[3..]);
        let Some(Token::Frame(frame)) = decoder.decode().unwrap() else {
            panic!("expected a frame");
        };
        assert_eq!(frame.kind(), FrameKind::Request);
        assert_eq!(frame.command(), 0x0B);
        assert_eq!(frame.payload(), &[0x01]);
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_decode_skips_garbage() {
        let wire = Frame::request(0x02, &[]).unwrap().encode();
        let mut decoder = FrameDecoder::new();
        decoder.feed(&[0xAA, 0x55]);
        decoder.feed(&wire);
        assert!(matches!(decoder.decode().unwrap(), Some(Token::Frame(_))));
    }

    #[test]
    fn test_decode_bad_checksum() {
        let mut wire = Frame::request(0x02, &[0x10]).unwrap().encode().to_vec();
        let last = wire.len() - 1;
        wire[last] ^= 0xFF;

        let mut decoder = FrameDecoder::new();
        decoder.feed(&wire);
        decoder.feed(&[ACK]);
        assert!(matches!(decoder.decode(), Err(FrameError::Checksum { .. })));
        // The broken frame is consumed, the stream continues after it
        assert_eq!(decoder.decode().unwrap(), Some(Token::Ack));
    }

    #[test]
    fn test_decode_rejects_short_length() {
        let mut decoder = FrameDecoder::new();
        decoder.feed(&[SOF, 0x02, ACK]);
        assert_eq!(decoder.decode(), Err(FrameError::TooShort(2)));
        // 0x02 is skipped as a stray byte
        assert_eq!(decoder.decode().unwrap(), Some(Token::Ack));
    }

    #[test]
    fn test_decode_multiple_frames() {
        let mut decoder = FrameDecoder::new();
        decoder.feed(&Frame::request(0x02, &[]).unwrap().encode());
        decoder.feed(&Frame::request(0x09, &[]).unwrap().encode());

        let Some(Token::Frame(first)) = decoder.decode().unwrap() else {
            panic!("expected a frame");
        };
        let Some(Token::Frame(second)) = decoder.decode().unwrap() else {
            panic!("expected a frame");
        };
        assert_eq!(first.command(), 0x02);
        assert_eq!(second.command(), 0x09);
    }
}
