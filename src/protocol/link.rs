//! Link layer between the state machine and the byte stream.
//!
//! The engine sees the serial port only through [`FrameLink`]: it sends one
//! frame at a time, asks whether that frame has been acknowledged, and pulls
//! complete inbound frames. [`SerialLink`] implements this on top of
//! [`FrameDecoder`], collecting outbound bytes for the I/O task to flush.

use std::collections::VecDeque;
use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use tokio::time::Instant;

use crate::protocol::frame::{ACK, Frame, FrameDecoder, NAK, Token};

/// Default time to wait for the host to acknowledge a frame.
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_millis(1600);

/// Inbound frames held while the engine is busy transmitting.
pub const INBOX_CAPACITY: usize = 4;

/// Outcome of the outstanding transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckStatus {
    /// Still waiting for ACK, NAK or the deadline.
    Pending,
    /// The host acknowledged the frame.
    Acked,
    /// The host rejected the frame or the deadline passed.
    Failed,
}

/// Frame-level contract the state machine drives.
pub trait FrameLink {
    /// Transmits a frame and starts waiting for its acknowledgement.
    fn send_frame(&mut self, frame: &Frame);

    /// Takes the next complete inbound frame, if any.
    fn recv_frame(&mut self) -> Option<Frame>;

    /// Reports and consumes the result of the outstanding transmission.
    fn poll_ack(&mut self) -> AckStatus;
}

/// Serial link state: decoder, inbox, outbox and the ack timer.
#[derive(Debug)]
pub struct SerialLink {
    decoder: FrameDecoder,
    inbox: VecDeque<Frame>,
    outbox: BytesMut,
    ack_timeout: Duration,
    deadline: Option<Instant>,
    result: Option<AckStatus>,
}

impl Default for SerialLink {
    fn default() -> Self {
        Self::new(DEFAULT_ACK_TIMEOUT)
    }
}

impl SerialLink {
    /// Creates a link with the given acknowledgement timeout.
    #[must_use]
    pub fn new(ack_timeout: Duration) -> Self {
        Self {
            decoder: FrameDecoder::new(),
            inbox: VecDeque::with_capacity(INBOX_CAPACITY),
            outbox: BytesMut::new(),
            ack_timeout,
            deadline: None,
            result: None,
        }
    }

    /// Feeds bytes read from the port.
    ///
    /// Valid data frames are acknowledged and queued, corrupt ones are NAK-ed.
    pub fn feed(&mut self, data: &[u8]) {
        self.decoder.feed(data);

        loop {
            match self.decoder.decode() {
                Ok(Some(Token::Frame(frame))) => {
                    tracing::trace!(
                        "rx frame cmd=0x{:02x} payload={}",
                        frame.command(),
                        hex::encode(frame.payload())
                    );
                    self.outbox.put_u8(ACK);
                    if self.inbox.len() == INBOX_CAPACITY {
                        if let Some(dropped) = self.inbox.pop_front() {
                            tracing::warn!(
                                "inbox full, dropping frame cmd=0x{:02x}",
                                dropped.command()
                            );
                        }
                    }
                    self.inbox.push_back(frame);
                }
                Ok(Some(Token::Ack)) => self.settle(AckStatus::Acked, "ACK"),
                Ok(Some(Token::Nak)) => self.settle(AckStatus::Failed, "NAK"),
                Ok(Some(Token::Can)) => self.settle(AckStatus::Failed, "CAN"),
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("frame decode error: {}", e);
                    self.outbox.put_u8(NAK);
                }
            }
        }
    }

    fn settle(&mut self, status: AckStatus, symbol: &str) {
        if self.deadline.take().is_some() {
            tracing::trace!("received {} for outstanding frame", symbol);
            self.result = Some(status);
        } else {
            tracing::debug!("ignoring {} with no outstanding frame", symbol);
        }
    }

    /// Marks the outstanding frame as failed if its deadline has passed.
    pub fn expire(&mut self, now: Instant) {
        if self.deadline.is_some_and(|deadline| now >= deadline) {
            tracing::debug!("ack timeout");
            self.deadline = None;
            self.result = Some(AckStatus::Failed);
        }
    }

    /// When the outstanding frame times out, if one is outstanding.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Takes the bytes waiting to be written to the port.
    pub fn take_outgoing(&mut self) -> Bytes {
        self.outbox.split().freeze()
    }

    /// Number of inbound frames waiting for the engine.
    #[must_use]
    pub fn pending_frames(&self) -> usize {
        self.inbox.len()
    }
}

impl FrameLink for SerialLink {
    fn send_frame(&mut self, frame: &Frame) {
        tracing::trace!(
            "tx frame cmd=0x{:02x} payload={}",
            frame.command(),
            hex::encode(frame.payload())
        );
        self.outbox.put_slice(&frame.encode());
        self.result = None;
        self.deadline = Some(Instant::now() + self.ack_timeout);
    }

    fn recv_frame(&mut self) -> Option<Frame> {
        self.inbox.pop_front()
    }

    fn poll_ack(&mut self) -> AckStatus {
        self.result.take().unwrap_or(AckStatus::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::frame::{CAN, FrameKind};

    fn request(cmd: u8) -> Frame {
        Frame::request(cmd, &[0x01, 0x02]).unwrap()
    }

    #[test]
    fn test_inbound_frame_is_acked_and_queued() {
        let mut link = SerialLink::default();
        link.feed(&request(0x0B).encode());

        assert_eq!(&link.take_outgoing()[..], &[ACK]);
        let frame = link.recv_frame().unwrap();
        assert_eq!(frame.command(), 0x0B);
        assert!(link.recv_frame().is_none());
    }

    #[test]
    fn test_corrupt_frame_is_nakked() {
        let mut link = SerialLink::default();
        let mut wire = request(0x0B).encode().to_vec();
        wire[4] ^= 0x40;
        link.feed(&wire);

        assert_eq!(&link.take_outgoing()[..], &[NAK]);
        assert!(link.recv_frame().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_then_ack() {
        let mut link = SerialLink::default();
        let frame = Frame::new(FrameKind::Request, 0x04, vec![0xAA]).unwrap();
        link.send_frame(&frame);

        assert_eq!(link.take_outgoing(), frame.encode());
        assert!(link.deadline().is_some());
        assert_eq!(link.poll_ack(), AckStatus::Pending);

        link.feed(&[ACK]);
        assert_eq!(link.poll_ack(), AckStatus::Acked);
        assert_eq!(link.poll_ack(), AckStatus::Pending);
        assert!(link.deadline().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_nak_and_can_fail_the_frame() {
        let mut link = SerialLink::default();
        link.send_frame(&request(0x04));
        link.feed(&[NAK]);
        assert_eq!(link.poll_ack(), AckStatus::Failed);

        link.send_frame(&request(0x04));
        link.feed(&[CAN]);
        assert_eq!(link.poll_ack(), AckStatus::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_expiry() {
        let mut link = SerialLink::new(Duration::from_millis(100));
        link.send_frame(&request(0x04));

        link.expire(Instant::now() + Duration::from_millis(50));
        assert_eq!(link.poll_ack(), AckStatus::Pending);

        link.expire(Instant::now() + Duration::from_millis(100));
        assert_eq!(link.poll_ack(), AckStatus::Failed);
        assert!(link.deadline().is_none());
    }

    #[test]
    fn test_stray_ack_is_ignored() {
        let mut link = SerialLink::default();
        link.feed(&[ACK]);
        assert_eq!(link.poll_ack(), AckStatus::Pending);
    }

    #[test]
    fn test_inbox_drops_oldest_when_full() {
        let mut link = SerialLink::default();
        for cmd in 0..=INBOX_CAPACITY as u8 {
            link.feed(&request(cmd + 0x10).encode());
        }
        assert_eq!(link.pending_frames(), INBOX_CAPACITY);
        assert_eq!(link.recv_frame().unwrap().command(), 0x11);
    }
}
