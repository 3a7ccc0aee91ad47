//! Bounded pending-event store shared by the capture and delivery tasks.
//!
//! The store is a fixed-capacity FIFO guarded by a tokio mutex. Every lock
//! acquisition is bounded: a wait exceeding the configured timeout fails the
//! operation with [`StoreError::LockTimeout`] and changes nothing. Capture
//! must never stall behind a slow delivery cycle for longer than that bound.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::event::FaceEvent;

/// Errors that can occur during store operations.
#[derive(Debug)]
pub enum StoreError {
    /// The store lock could not be acquired within its bounded wait
    LockTimeout,
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::LockTimeout => write!(f, "Timed out waiting for the store lock"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Counters describing store activity since startup.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreStats {
    /// Total events accepted by `append`
    pub appended: u64,

    /// Total events evicted to make room for newer ones
    pub evicted: u64,

    /// Total events released after delivery (or offline fallback)
    pub released: u64,

    /// Events currently held
    pub pending: usize,
}

/// Fixed-capacity FIFO of captured events awaiting delivery.
///
/// Insertion order is capture order. When full, `append` evicts the oldest
/// entry first; the delivery side reads with [`LogStore::snapshot`] and
/// confirms with [`LogStore::release_front`], so a batch stays in the store
/// until its upload outcome is known.
pub struct LogStore {
    entries: Mutex<Vec<FaceEvent>>,
    capacity: usize,
    lock_timeout: Duration,

    // Mirror of entries.len() for lock-free reads; updated inside the lock.
    pending: AtomicUsize,
    appended: AtomicU64,
    evicted: AtomicU64,
    released: AtomicU64,
}

impl LogStore {
    pub fn new(capacity: usize, lock_timeout: Duration) -> Self {
        Self {
            entries: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
            lock_timeout,
            pending: AtomicUsize::new(0),
            appended: AtomicU64::new(0),
            evicted: AtomicU64::new(0),
            released: AtomicU64::new(0),
        }
    }

    async fn lock(&self) -> Result<MutexGuard<'_, Vec<FaceEvent>>, StoreError> {
        tokio::time::timeout(self.lock_timeout, self.entries.lock())
            .await
            .map_err(|_| StoreError::LockTimeout)
    }

    /// Append a captured event, evicting the oldest entry if the store is
    /// full. Never waits on network state; the only failure is a lock wait
    /// exceeding its bound, which leaves the store unchanged.
    pub async fn append(&self, event: FaceEvent) -> Result<(), StoreError> {
        let mut entries = self.lock().await?;

        if entries.len() >= self.capacity && !entries.is_empty() {
            // Dropping the evicted event frees its image buffer.
            let evicted = entries.remove(0);
            self.evicted.fetch_add(1, Ordering::Relaxed);
            warn!(
                capacity = self.capacity,
                evicted_subject = evicted.subject_id,
                "store full, evicting oldest event"
            );
        }

        entries.push(event);
        self.pending.store(entries.len(), Ordering::Relaxed);
        self.appended.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Number of events currently held. Lock-free; may trail a concurrent
    /// mutation by one update, which callers treat as a hint.
    pub fn pending_count(&self) -> usize {
        self.pending.load(Ordering::Relaxed)
    }

    /// Image-free copies of up to `max` oldest events, in capture order.
    /// The events themselves stay in the store until released.
    pub async fn snapshot(&self, max: usize) -> Result<Vec<FaceEvent>, StoreError> {
        let entries = self.lock().await?;
        Ok(entries.iter().take(max).map(FaceEvent::upload_copy).collect())
    }

    /// Drop the `n` oldest events (their image buffers with them) and
    /// compact. `n` past the current count clears the store. Returns how
    /// many were actually removed.
    pub async fn release_front(&self, n: usize) -> Result<usize, StoreError> {
        let mut entries = self.lock().await?;
        let removed = n.min(entries.len());
        entries.drain(0..removed);
        self.pending.store(entries.len(), Ordering::Relaxed);
        self.released.fetch_add(removed as u64, Ordering::Relaxed);
        debug!(released = removed, pending = entries.len(), "released events");
        Ok(removed)
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            appended: self.appended.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            released: self.released.load(Ordering::Relaxed),
            pending: self.pending.load(Ordering::Relaxed),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
impl LogStore {
    /// Test hook: hold the entry lock so bounded-wait paths can be driven
    /// from other modules' tests.
    pub(crate) async fn hold_lock_for_tests(&self) -> MutexGuard<'_, Vec<FaceEvent>> {
        self.entries.lock().await
    }
}
