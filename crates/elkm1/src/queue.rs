//! Outbound command queue and the writer loop
//!
//! Commands wait here until their earliest send time, go out under a
//! global rate limit, and optionally reinsert themselves for a retry
//! unless the dispatcher sees the expected reply first. While the panel
//! has a remote-programming session attached, due commands are discarded
//! instead of sent (the panel would refuse them anyway).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tokio::sync::{watch, Notify};
use tracing::{debug, error, warn};

use crate::proto::Frame;
use crate::transport::BoxSink;

/// Pending entries beyond this are dropped oldest-first.
const CAPACITY: usize = 1000;

/// One queued command.
#[derive(Debug, Clone)]
pub struct Pending {
    pub frame: Frame,
    /// Earliest time this entry may be transmitted
    pub earliest: Instant,
    /// Remaining retry budget
    pub retries: u8,
    /// Delay before a retry becomes due
    pub retry_delay: Duration,
    /// Reply prefix (tag plus payload) that cancels the retry
    pub expect: String,
}

impl Pending {
    /// Send as soon as possible, no retry.
    pub fn new(frame: Frame) -> Self {
        Self {
            frame,
            earliest: Instant::now(),
            retries: 0,
            retry_delay: Duration::from_secs(1),
            expect: String::new(),
        }
    }

    /// Retry until `expect` is seen or the budget runs out.
    pub fn with_retries(mut self, retries: u8, retry_delay: Duration, expect: impl Into<String>) -> Self {
        self.retries = retries;
        self.retry_delay = retry_delay;
        self.expect = expect.into();
        self
    }

    /// Delay the first transmission.
    pub fn after(mut self, delay: Duration) -> Self {
        self.earliest = Instant::now() + delay;
        self
    }
}

/// Outcome of asking the queue for work.
enum Next {
    Ready(Pending),
    NotYet(Instant),
    Empty,
}

/// The shared outbound queue.
pub struct SendQueue {
    inner: Mutex<VecDeque<Pending>>,
    notify: Notify,
    paused: AtomicBool,
}

impl SendQueue {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            paused: AtomicBool::new(false),
        }
    }

    /// Enqueue a command in arrival order.
    pub fn push(&self, pending: Pending) {
        let mut queue = self.inner.lock().expect("queue lock");
        if queue.len() >= CAPACITY {
            queue.pop_front();
            error!("outbound queue overflow, dropping oldest command");
        }
        queue.push_back(pending);
        drop(queue);
        self.notify.notify_one();
    }

    /// Remote-programming pause. While set, due entries are discarded.
    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
        if !paused {
            self.notify.notify_one();
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Drop everything, returning how many entries were discarded.
    pub fn flush(&self) -> usize {
        let mut queue = self.inner.lock().expect("queue lock");
        let count = queue.len();
        queue.clear();
        count
    }

    /// Remove every entry whose expected-reply prefix matches an inbound
    /// frame, cancelling their retries. `inbound_key` is the frame's tag
    /// and payload concatenated.
    pub fn cancel_expected(&self, inbound_key: &str) -> usize {
        let mut queue = self.inner.lock().expect("queue lock");
        let before = queue.len();
        queue.retain(|pending| pending.expect.is_empty() || !inbound_key.starts_with(&pending.expect));
        let removed = before - queue.len();
        if removed > 0 {
            debug!(inbound_key, removed, "expected reply arrived, retries cancelled");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("queue lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pop the first due entry, or report when the next one matures.
    fn pop_due(&self, now: Instant) -> Next {
        let mut queue = self.inner.lock().expect("queue lock");
        if let Some(position) = queue.iter().position(|p| p.earliest <= now) {
            return Next::Ready(queue.remove(position).expect("position is valid"));
        }
        match queue.iter().map(|p| p.earliest).min() {
            Some(earliest) => Next::NotYet(earliest),
            None => Next::Empty,
        }
    }
}

impl Default for SendQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Writer task: drain the queue to the transport under the rate limit.
///
/// On shutdown the queue is flushed without sending, and a retry in
/// flight never re-enters the queue.
pub async fn run_writer(
    queue: std::sync::Arc<SendQueue>,
    mut sink: BoxSink,
    rate_limit: u32,
    mut shutdown: watch::Receiver<bool>,
) {
    let interval = Duration::from_secs_f64(1.0 / f64::from(rate_limit.max(1)));
    loop {
        if *shutdown.borrow() {
            break;
        }
        match queue.pop_due(Instant::now()) {
            Next::Ready(pending) => {
                if queue.is_paused() {
                    warn!(
                        frame = %pending.frame.to_wire(),
                        "panel is in remote programming, discarding command"
                    );
                    continue;
                }
                let wire = pending.frame.to_wire();
                debug!(%wire, "send");
                if let Err(e) = sink.send_line(&wire).await {
                    error!(error = %e, "transport write failed, writer stopping");
                    break;
                }
                // Reinsert before the rate-limit sleep so an inbound match
                // can cancel the retry while we wait.
                if pending.retries > 0 && !pending.expect.is_empty() && !*shutdown.borrow() {
                    let retry_delay = pending.retry_delay;
                    queue.push(Pending {
                        earliest: Instant::now() + retry_delay,
                        retries: pending.retries - 1,
                        ..pending
                    });
                }
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = shutdown.changed() => {}
                }
            }
            Next::NotYet(earliest) => {
                tokio::select! {
                    _ = tokio::time::sleep_until(earliest.into()) => {}
                    _ = queue.notify.notified() => {}
                    _ = shutdown.changed() => {}
                }
            }
            Next::Empty => {
                tokio::select! {
                    _ = queue.notify.notified() => {}
                    _ = shutdown.changed() => {}
                }
            }
        }
    }
    let flushed = queue.flush();
    if flushed > 0 {
        debug!(flushed, "flushed outbound queue on shutdown");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::message::requests;

    #[test]
    fn cancel_expected_matches_prefix() {
        let queue = SendQueue::new();
        queue.push(
            Pending::new(requests::arming_status()).with_retries(
                3,
                Duration::from_secs(1),
                "AS",
            ),
        );
        queue.push(Pending::new(requests::version()));
        assert_eq!(queue.cancel_expected("AS00000000111111110000000000"), 1);
        // The entry with no expectation is untouched.
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.cancel_expected("AS00000000111111110000000000"), 0);
    }

    #[test]
    fn pop_due_respects_earliest_time() {
        let queue = SendQueue::new();
        queue.push(Pending::new(requests::version()).after(Duration::from_secs(60)));
        assert!(matches!(queue.pop_due(Instant::now()), Next::NotYet(_)));
        queue.push(Pending::new(requests::arming_status()));
        match queue.pop_due(Instant::now()) {
            Next::Ready(pending) => assert_eq!(pending.frame, requests::arming_status()),
            _ => panic!("due entry expected"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn writer_discards_while_paused() {
        let (client, server) = tokio::io::duplex(1024);
        let (_server_read, server_write) = tokio::io::split(server);
        let (client_read, _client_write) = tokio::io::split(client);
        let sink = Box::new(crate::transport::IoSink::new(server_write)) as BoxSink;
        let mut peer_read = crate::transport::IoSource::new(client_read);
        let queue = std::sync::Arc::new(SendQueue::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let writer = tokio::spawn(run_writer(std::sync::Arc::clone(&queue), sink, 10, shutdown_rx));

        queue.set_paused(true);
        queue.push(Pending::new(requests::output_status()));
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(queue.is_empty());

        queue.set_paused(false);
        queue.push(Pending::new(requests::version()));
        tokio::time::sleep(Duration::from_millis(500)).await;

        shutdown_tx.send(true).unwrap();
        writer.await.unwrap();

        use crate::transport::LineSource;
        let line = peer_read.next_line().await.unwrap().unwrap();
        assert_eq!(line, requests::version().to_wire());
    }

    #[tokio::test(start_paused = true)]
    async fn retry_reinserts_with_decremented_budget() {
        let (client, server) = tokio::io::duplex(1024);
        let (_read, write) = tokio::io::split(server);
        let sink = Box::new(crate::transport::IoSink::new(write)) as BoxSink;
        let queue = std::sync::Arc::new(SendQueue::new());
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let _writer = tokio::spawn(run_writer(std::sync::Arc::clone(&queue), sink, 10, shutdown_rx));

        queue.push(Pending::new(requests::arming_status()).with_retries(
            2,
            Duration::from_secs(1),
            "AS",
        ));
        // Give the writer a chance to transmit and reinsert.
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(queue.len(), 1);
        let reinserted = {
            let inner = queue.inner.lock().unwrap();
            inner.front().unwrap().clone()
        };
        assert_eq!(reinserted.retries, 1);
        drop(client);
    }
}
