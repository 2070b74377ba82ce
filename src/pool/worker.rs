//! Worker connection handle.
//!
//! # Responsibilities
//! - Give every upgraded worker socket a unique identity
//! - Carry outbound frames to the task that owns the socket
//! - Hold the single reply slot for the call leased on this worker
//! - Track open/closed state and signal forced closes to the socket owner
//!
//! # Design Decisions
//! - The socket is owned by its ingestion task; other tasks only see this handle
//! - Writes are confirmed by the socket owner so callers can tell a failed
//!   write apart from a failed read
//! - Closed is sticky; a closed handle is never reused

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::body::Bytes;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};

/// Relaxed ordering is enough, only uniqueness matters.
static WORKER_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a worker connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(u64);

impl WorkerId {
    /// Generate a new unique worker ID.
    pub fn new() -> Self {
        Self(WORKER_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for WorkerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for WorkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "worker-{}", self.0)
    }
}

/// Failure of a single write through a worker handle.
#[derive(Debug, Error)]
pub enum WorkerIoError {
    /// The socket owner is gone or the handle was closed.
    #[error("worker connection is closed")]
    Closed,
    /// The socket owner tried the write and it failed.
    #[error("write to worker failed: {0}")]
    Write(String),
}

/// A text frame queued for the socket owner.
#[derive(Debug)]
pub struct OutboundFrame {
    pub payload: String,
    written: oneshot::Sender<Result<(), String>>,
}

impl OutboundFrame {
    /// Move the payload out, leaving the frame ready for [`OutboundFrame::complete`].
    pub fn take_payload(&mut self) -> String {
        std::mem::take(&mut self.payload)
    }

    /// Report the outcome of writing this frame back to the sender.
    pub fn complete(self, result: Result<(), String>) {
        let _ = self.written.send(result);
    }
}

/// The socket-owner side of a worker connection.
///
/// Held by the ingestion task; everything else goes through [`WorkerConnection`].
#[derive(Debug)]
pub struct WorkerLink {
    /// Frames dispatchers want written to the socket.
    pub outbound: mpsc::Receiver<OutboundFrame>,
    /// Flips to `true` when the handle is closed from outside the session.
    pub closed: watch::Receiver<bool>,
}

/// Handle to one live worker connection.
#[derive(Debug)]
pub struct WorkerConnection {
    id: WorkerId,
    outbound: mpsc::Sender<OutboundFrame>,
    reply_slot: Mutex<Option<oneshot::Sender<Bytes>>>,
    closed: watch::Sender<bool>,
}

impl WorkerConnection {
    /// Create a handle and the link its socket owner drives.
    ///
    /// `buffer` bounds the number of frames queued for the socket.
    pub fn open(buffer: usize) -> (Arc<Self>, WorkerLink) {
        let (outbound_tx, outbound_rx) = mpsc::channel(buffer.max(1));
        let (closed_tx, closed_rx) = watch::channel(false);

        let conn = Arc::new(Self {
            id: WorkerId::new(),
            outbound: outbound_tx,
            reply_slot: Mutex::new(None),
            closed: closed_tx,
        });

        let link = WorkerLink {
            outbound: outbound_rx,
            closed: closed_rx,
        };

        (conn, link)
    }

    /// This worker's identity.
    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// Whether the handle has been closed.
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Write one text frame and wait for the socket owner to confirm it.
    pub async fn send(&self, payload: String) -> Result<(), WorkerIoError> {
        if self.is_closed() {
            return Err(WorkerIoError::Closed);
        }

        let (written, confirmed) = oneshot::channel();
        self.outbound
            .send(OutboundFrame { payload, written })
            .await
            .map_err(|_| WorkerIoError::Closed)?;

        match confirmed.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(reason)) => Err(WorkerIoError::Write(reason)),
            Err(_) => Err(WorkerIoError::Closed),
        }
    }

    /// Install the reply slot for the next inbound frame.
    ///
    /// Must happen before the request is sent so a fast reply is not lost.
    /// The receiver fails if the connection closes before a frame arrives.
    pub fn expect_reply(&self) -> oneshot::Receiver<Bytes> {
        let (tx, rx) = oneshot::channel();
        if !self.is_closed() {
            *self.reply_slot.lock() = Some(tx);
        }
        rx
    }

    /// Hand an inbound frame to the waiting caller.
    ///
    /// Returns the frame back when nobody is waiting for it.
    pub fn deliver(&self, frame: Bytes) -> Option<Bytes> {
        let waiting = self.reply_slot.lock().take();
        match waiting {
            Some(tx) => tx.send(frame).err(),
            None => Some(frame),
        }
    }

    /// Close the handle. Returns `true` on the first call only.
    ///
    /// Any caller waiting on a reply is failed immediately.
    pub fn close(&self) -> bool {
        let was_closed = self.closed.send_replace(true);
        self.reply_slot.lock().take();
        !was_closed
    }
}
