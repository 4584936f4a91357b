//! Inbound frame mailbox
//!
//! The reader task pushes validated frames in; the coordinator drains
//! them in FIFO order. The scanner uses the out-of-band `wait_for` to
//! pull a specific reply out of the middle of the buffer while leaving
//! everything else queued for normal dispatch.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::Notify;
use tracing::{debug, error};

use crate::proto::{Frame, MessageKind};

/// Buffer capacity; the oldest frame is dropped on overflow.
const CAPACITY: usize = 1000;

/// A received frame with its arrival times. The monotonic instant drives
/// staleness checks, the wall clock becomes entity `updated_at` values.
#[derive(Debug, Clone)]
pub struct Inbound {
    pub frame: Frame,
    pub received: Instant,
    pub at: DateTime<Utc>,
}

impl Inbound {
    pub fn new(frame: Frame) -> Self {
        Self { frame, received: Instant::now(), at: Utc::now() }
    }

    /// Time since the frame arrived.
    pub fn age(&self) -> Duration {
        self.received.elapsed()
    }
}

/// Bounded FIFO of inbound frames with a wakeup for the consumer.
pub struct Mailbox {
    inner: Mutex<VecDeque<Inbound>>,
    notify: Notify,
    dropped: AtomicU64,
}

impl Mailbox {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(CAPACITY)),
            notify: Notify::new(),
            dropped: AtomicU64::new(0),
        }
    }

    /// Enqueue a frame, dropping the oldest entry on overflow.
    pub fn push(&self, frame: Frame) {
        let mut queue = self.inner.lock().expect("mailbox lock");
        if queue.len() >= CAPACITY {
            queue.pop_front();
            let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            error!(dropped, "inbound buffer overflow, dropping oldest frame");
        }
        queue.push_back(Inbound::new(frame));
        drop(queue);
        self.notify.notify_one();
    }

    /// Frames dropped to overflow so far.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Remove and return the first frame not rejected by `skip`. Skipped
    /// frames keep their position for a later consumer.
    pub fn take_next(&self, skip: impl Fn(&Frame) -> bool) -> Option<Inbound> {
        let mut queue = self.inner.lock().expect("mailbox lock");
        let position = queue.iter().position(|inbound| !skip(&inbound.frame))?;
        queue.remove(position)
    }

    /// Wait until a frame of `kind` (optionally with a payload prefix)
    /// arrives, removing it from the buffer. Returns `None` on timeout.
    pub async fn wait_for(
        &self,
        kind: MessageKind,
        prefix: Option<&str>,
        timeout: Duration,
    ) -> Option<Inbound> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(found) = self.take_match(kind, prefix) {
                return Some(found);
            }
            if tokio::time::timeout_at(deadline, self.notify.notified()).await.is_err() {
                debug!(?kind, prefix, "timed out waiting for reply");
                return None;
            }
        }
    }

    fn take_match(&self, kind: MessageKind, prefix: Option<&str>) -> Option<Inbound> {
        let mut queue = self.inner.lock().expect("mailbox lock");
        let position = queue.iter().position(|inbound| {
            inbound.frame.kind == kind
                && prefix.map_or(true, |p| inbound.frame.data.starts_with(p))
        })?;
        queue.remove(position)
    }

    /// Wait for any frame to arrive.
    pub async fn notified(&self) {
        self.notify.notified().await;
    }

    /// Whether any frames are queued.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().expect("mailbox lock").is_empty()
    }
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}
