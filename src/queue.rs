//! Bounded queues of frames waiting to be sent to the host.
//!
//! Two queues feed the state machine: the callback queue carries completions
//! of host-issued asynchronous commands and is touched only from the engine
//! task; the unsolicited queue carries protocol events and is filled from the
//! radio stack's context, so every mutation goes through a mutex.
//!
//! Entries are copied in at enqueue time. A successful enqueue wakes the
//! engine task.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use crate::error::FrameError;
use crate::protocol::{BUF_SIZE_TX, Frame};

/// Capacity of the callback queue.
pub const CALLBACK_QUEUE_CAPACITY: usize = 8;

/// Capacity of the unsolicited queue.
pub const UNSOLICITED_QUEUE_CAPACITY: usize = 8;

/// One frame waiting to be sent as a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueEntry {
    command: u8,
    length: u8,
    payload: [u8; BUF_SIZE_TX],
}

impl QueueEntry {
    const EMPTY: Self = Self {
        command: 0,
        length: 0,
        payload: [0; BUF_SIZE_TX],
    };

    /// Function identifier of the frame.
    #[must_use]
    pub const fn command(&self) -> u8 {
        self.command
    }

    /// Payload bytes.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload[..self.length as usize]
    }

    /// Builds the request frame for this entry.
    pub fn to_frame(&self) -> Result<Frame, FrameError> {
        Frame::request(self.command, self.payload())
    }
}

/// Fixed-capacity ring of [`QueueEntry`].
#[derive(Debug, Clone)]
pub struct BoundedQueue<const N: usize> {
    entries: [QueueEntry; N],
    head: usize,
    tail: usize,
    count: usize,
}

impl<const N: usize> Default for BoundedQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> BoundedQueue<N> {
    /// Creates an empty queue.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: [QueueEntry::EMPTY; N],
            head: 0,
            tail: 0,
            count: 0,
        }
    }

    /// Copies a frame into the queue.
    ///
    /// Payloads longer than [`BUF_SIZE_TX`] are truncated. Returns `false`
    /// without touching the queue when it is full.
    pub fn enqueue(&mut self, command: u8, payload: &[u8]) -> bool {
        if self.count >= N {
            return false;
        }

        let length = if payload.len() > BUF_SIZE_TX {
            tracing::warn!(
                "truncating queued payload for cmd=0x{:02x} from {} to {} bytes",
                command,
                payload.len(),
                BUF_SIZE_TX
            );
            BUF_SIZE_TX
        } else {
            payload.len()
        };

        let entry = &mut self.entries[self.tail];
        entry.command = command;
        entry.length = length as u8;
        entry.payload[..length].copy_from_slice(&payload[..length]);

        self.tail = (self.tail + 1) % N;
        self.count += 1;
        true
    }

    /// Removes the front entry.
    ///
    /// On an empty queue the read position is resynchronised with the write
    /// position and nothing else happens.
    pub fn dequeue_front(&mut self) {
        if self.count == 0 {
            self.head = self.tail;
            return;
        }
        self.count -= 1;
        self.head = (self.head + 1) % N;
    }

    /// The entry that would be sent next.
    #[must_use]
    pub fn peek_front(&self) -> Option<&QueueEntry> {
        (self.count > 0).then(|| &self.entries[self.head])
    }

    /// Drops every entry.
    pub fn purge(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.count = 0;
    }

    /// Number of queued entries.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.count
    }

    /// True when nothing is queued.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Maximum number of entries.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        N
    }
}

/// Queue of callback frames, owned by the engine task.
#[derive(Debug)]
pub struct CallbackQueue {
    queue: BoundedQueue<CALLBACK_QUEUE_CAPACITY>,
    wake: Arc<Notify>,
}

impl CallbackQueue {
    /// Creates an empty queue waking `wake` on enqueue.
    #[must_use]
    pub fn new(wake: Arc<Notify>) -> Self {
        Self {
            queue: BoundedQueue::new(),
            wake,
        }
    }

    /// Queues a callback frame. Returns `false` when the queue is full.
    pub fn enqueue(&mut self, command: u8, payload: &[u8]) -> bool {
        let queued = self.queue.enqueue(command, payload);
        if queued {
            self.wake.notify_one();
        } else {
            tracing::warn!("callback queue full, rejecting cmd=0x{:02x}", command);
        }
        queued
    }

    /// Removes the front entry.
    pub fn dequeue_front(&mut self) {
        self.queue.dequeue_front();
    }

    /// The entry that would be sent next.
    #[must_use]
    pub fn peek_front(&self) -> Option<&QueueEntry> {
        self.queue.peek_front()
    }

    /// Drops every entry.
    pub fn purge(&mut self) {
        self.queue.purge();
    }

    /// Number of queued entries.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.queue.len()
    }

    /// True when nothing is queued.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// Queue of unsolicited frames, shared with the radio stack's context.
#[derive(Debug, Clone)]
pub struct UnsolicitedQueue {
    inner: Arc<Mutex<BoundedQueue<UNSOLICITED_QUEUE_CAPACITY>>>,
    wake: Arc<Notify>,
}

impl UnsolicitedQueue {
    /// Creates an empty queue waking `wake` on enqueue.
    #[must_use]
    pub fn new(wake: Arc<Notify>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(BoundedQueue::new())),
            wake,
        }
    }

    fn lock(&self) -> MutexGuard<'_, BoundedQueue<UNSOLICITED_QUEUE_CAPACITY>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues an unsolicited frame. Returns `false` when the queue is full.
    pub fn enqueue(&self, command: u8, payload: &[u8]) -> bool {
        // Release the lock before waking the engine
        let queued = self.lock().enqueue(command, payload);
        if queued {
            self.wake.notify_one();
        } else {
            tracing::warn!("unsolicited queue full, rejecting cmd=0x{:02x}", command);
        }
        queued
    }

    /// Removes the front entry.
    pub fn dequeue_front(&self) {
        self.lock().dequeue_front();
    }

    /// A copy of the entry that would be sent next.
    #[must_use]
    pub fn peek_front(&self) -> Option<QueueEntry> {
        self.lock().peek_front().copied()
    }

    /// Drops every entry.
    pub fn purge(&self) {
        self.lock().purge();
    }

    /// Number of queued entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True when nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
