//! Worker connection registry.
//!
//! # Responsibilities
//! - Track which worker connections are live
//! - Rotate through workers so calls spread across the pool
//! - Lease a worker exclusively to one call at a time
//! - Tear a worker down exactly once when its session ends
//!
//! # Design Decisions
//! - One mutex guards presence and rotation; it is never held across an await
//! - A lease is an RAII guard; dropping it puts the worker back in rotation
//! - Waiters for a busy pool are woken through a `Notify` on every change

use std::collections::{HashMap, VecDeque};
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::pool::worker::{WorkerConnection, WorkerId};

#[derive(Debug)]
struct Entry {
    conn: Arc<WorkerConnection>,
    leased: bool,
}

#[derive(Debug, Default)]
struct Inner {
    /// Presence map for lookup by identity.
    entries: HashMap<WorkerId, Entry>,
    /// Rotation order; the head is offered first.
    rotation: VecDeque<WorkerId>,
}

/// Outcome of a non-blocking acquisition.
#[derive(Debug)]
pub enum Acquire {
    /// A free worker, now exclusively leased to the caller.
    Leased(WorkerLease),
    /// Workers are registered but all of them are leased.
    Busy,
    /// No workers are registered.
    Empty,
}

/// Thread-safe pool of worker connections.
#[derive(Debug, Default)]
pub struct Registry {
    inner: Mutex<Inner>,
    changed: Notify,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a worker at the tail of the rotation.
    ///
    /// Adding a worker that is already present is ignored.
    pub fn add(&self, conn: Arc<WorkerConnection>) {
        let id = conn.id();
        {
            let mut inner = self.inner.lock();
            if inner.entries.contains_key(&id) {
                return;
            }
            inner.entries.insert(id, Entry { conn, leased: false });
            inner.rotation.push_back(id);
        }
        self.changed.notify_waiters();
    }

    /// Remove a worker. Removing an absent worker is a no-op.
    pub fn remove(&self, id: WorkerId) -> Option<Arc<WorkerConnection>> {
        let removed = {
            let mut inner = self.inner.lock();
            let entry = inner.entries.remove(&id)?;
            // Linear in the number of worker sockets.
            if let Some(pos) = inner.rotation.iter().position(|w| *w == id) {
                inner.rotation.remove(pos);
            }
            entry.conn
        };
        self.changed.notify_waiters();
        Some(removed)
    }

    /// Add a worker and return a guard that tears it down on drop.
    pub fn register(self: &Arc<Self>, conn: Arc<WorkerConnection>) -> WorkerRegistration {
        self.add(Arc::clone(&conn));
        WorkerRegistration {
            registry: Arc::clone(self),
            conn,
        }
    }

    /// Lease the next free worker in rotation order without waiting.
    pub fn try_acquire(self: &Arc<Self>) -> Acquire {
        let mut inner = self.inner.lock();
        if inner.entries.is_empty() {
            return Acquire::Empty;
        }

        let Inner { entries, rotation } = &mut *inner;
        let free = rotation
            .iter()
            .position(|id| entries.get(id).is_some_and(|entry| !entry.leased));
        let Some(id) = free.and_then(|pos| rotation.remove(pos)) else {
            return Acquire::Busy;
        };
        rotation.push_back(id);

        match entries.get_mut(&id) {
            Some(entry) => {
                entry.leased = true;
                Acquire::Leased(WorkerLease {
                    registry: Arc::clone(self),
                    conn: Arc::clone(&entry.conn),
                })
            }
            None => Acquire::Busy,
        }
    }

    /// Lease the next free worker, waiting up to `wait` while all are busy.
    ///
    /// Returns `None` right away when no workers are registered.
    pub async fn acquire(self: &Arc<Self>, wait: Duration) -> Option<WorkerLease> {
        let deadline = Instant::now() + wait;
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            match self.try_acquire() {
                Acquire::Leased(lease) => return Some(lease),
                Acquire::Empty => return None,
                Acquire::Busy => {
                    if tokio::time::timeout_at(deadline, notified).await.is_err() {
                        return None;
                    }
                }
            }
        }
    }

    /// Close and remove every worker. Returns how many were closed.
    pub fn close_all(&self) -> usize {
        let drained: Vec<_> = {
            let mut inner = self.inner.lock();
            inner.rotation.clear();
            inner.entries.drain().map(|(_, entry)| entry.conn).collect()
        };
        for conn in &drained {
            conn.close();
        }
        self.changed.notify_waiters();
        drained.len()
    }

    /// Number of registered workers.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: WorkerId) -> bool {
        self.inner.lock().entries.contains_key(&id)
    }

    /// Number of workers currently leased to a call.
    pub fn leased_count(&self) -> usize {
        self.inner
            .lock()
            .entries
            .values()
            .filter(|entry| entry.leased)
            .count()
    }

    /// Worker IDs in rotation order.
    pub fn ids(&self) -> Vec<WorkerId> {
        self.inner.lock().rotation.iter().copied().collect()
    }

    fn release(&self, id: WorkerId) {
        if let Some(entry) = self.inner.lock().entries.get_mut(&id) {
            entry.leased = false;
        }
        self.changed.notify_waiters();
    }
}

/// Exclusive use of one worker for one exchange.
///
/// Dropping the lease makes the worker available again.
#[derive(Debug)]
pub struct WorkerLease {
    registry: Arc<Registry>,
    conn: Arc<WorkerConnection>,
}

impl WorkerLease {
    /// Remove the worker from the registry and force its connection closed.
    ///
    /// Returns `true` if this call removed it.
    pub fn evict(&self) -> bool {
        let removed = self.registry.remove(self.conn.id()).is_some();
        self.conn.close();
        removed
    }
}

impl Deref for WorkerLease {
    type Target = WorkerConnection;
    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl Drop for WorkerLease {
    fn drop(&mut self) {
        self.registry.release(self.conn.id());
    }
}

/// Scoped registration of a worker session.
///
/// Removes and closes the worker on drop, whatever ended the session.
#[derive(Debug)]
pub struct WorkerRegistration {
    registry: Arc<Registry>,
    conn: Arc<WorkerConnection>,
}

impl WorkerRegistration {
    pub fn worker(&self) -> &Arc<WorkerConnection> {
        &self.conn
    }
}

impl Drop for WorkerRegistration {
    fn drop(&mut self) {
        self.registry.remove(self.conn.id());
        self.conn.close();
    }
}
