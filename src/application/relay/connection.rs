//! Connection handle.
//!
//! The relay's view of one socket. Sends go through an unbounded queue
//! drained by the connection's writer task, so any task may send to any
//! connection without touching the socket itself.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Frames queued for the writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Pre-serialized JSON text frame.
    Text(Arc<str>),
    /// Transport-level heartbeat probe.
    Ping,
    /// Close the socket; nothing queued after it is written.
    Close,
}

/// Sending half of one connection plus its liveness state.
#[derive(Debug)]
pub struct ConnectionHandle {
    id: u64,
    tx: mpsc::UnboundedSender<Outbound>,
    alive: AtomicBool,
    last_seen: Mutex<Instant>,
    cancel: CancellationToken,
}

impl ConnectionHandle {
    pub fn new(tx: mpsc::UnboundedSender<Outbound>) -> Self {
        Self {
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            tx,
            alive: AtomicBool::new(true),
            last_seen: Mutex::new(Instant::now()),
            cancel: CancellationToken::new(),
        }
    }

    /// Create a handle together with the receiver its writer drains.
    pub fn channel() -> (Arc<Self>, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self::new(tx)), rx)
    }

    /// Process-unique connection id; distinguishes a replaced connection
    /// from its successor under the same session id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Queue a text frame. Returns `false` if the connection is closed.
    pub fn send_text(&self, text: Arc<str>) -> bool {
        !self.is_closed() && self.tx.send(Outbound::Text(text)).is_ok()
    }

    /// Queue a heartbeat probe.
    pub fn ping(&self) -> bool {
        !self.is_closed() && self.tx.send(Outbound::Ping).is_ok()
    }

    /// Close the connection. Idempotent.
    pub fn close(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        let _ = self.tx.send(Outbound::Close);
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled() || self.tx.is_closed()
    }

    /// Resolves once [`close`](Self::close) has been called.
    pub fn closed(&self) -> WaitForCancellationFuture<'_> {
        self.cancel.cancelled()
    }

    /// Record a heartbeat acknowledgement.
    pub fn mark_alive(&self) {
        self.alive.store(true, Ordering::Relaxed);
        *self.last_seen.lock() = Instant::now();
    }

    /// Read and clear the liveness flag.
    ///
    /// Returns whether the connection acknowledged since the last check.
    pub fn check_alive(&self) -> bool {
        self.alive.swap(false, Ordering::Relaxed)
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Relaxed)
    }

    /// Time since the last liveness confirmation.
    pub fn last_seen_elapsed(&self) -> Duration {
        self.last_seen.lock().elapsed()
    }
}
