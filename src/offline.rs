//! Offline buffer for batches that exhausted their delivery retries.
//!
//! A second bounded store, sitting behind the pending store: when a batch
//! cannot be delivered, its events are admitted here and retried on later
//! cycles. Admission is drop-newest (existing contents are never displaced),
//! and a flush clears the buffer only when the entire contents upload in one
//! request.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::client::DeliveryError;
use crate::clock::ClockSample;
use crate::event::FaceEvent;
use crate::wire::{self, UploadRequest};

/// Errors that can occur during offline buffer operations.
#[derive(Debug)]
pub enum OfflineError {
    /// Offline buffering is disabled by configuration
    Disabled,

    /// The buffer lock could not be acquired within its bounded wait
    LockTimeout,

    /// A flush attempt reached the transport and failed; contents were kept
    Flush(DeliveryError),
}

impl std::fmt::Display for OfflineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OfflineError::Disabled => write!(f, "Offline buffering is disabled"),
            OfflineError::LockTimeout => {
                write!(f, "Timed out waiting for the offline buffer lock")
            }
            OfflineError::Flush(err) => write!(f, "Offline flush failed: {}", err),
        }
    }
}

impl std::error::Error for OfflineError {}

/// Bounded holding area for events that survived exhausted retries.
///
/// Occupancy only ever decreases by a fully successful flush; a failed
/// flush leaves the contents byte-for-byte untouched.
pub struct OfflineBuffer {
    entries: Mutex<Vec<FaceEvent>>,
    capacity: usize,
    enabled: bool,
    lock_timeout: Duration,

    // Mirror of entries.len() for lock-free reads; updated inside the lock.
    occupancy: AtomicUsize,
}

impl OfflineBuffer {
    pub fn new(capacity: usize, enabled: bool, lock_timeout: Duration) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            capacity,
            enabled,
            lock_timeout,
            occupancy: AtomicUsize::new(0),
        }
    }

    async fn lock(&self) -> Result<MutexGuard<'_, Vec<FaceEvent>>, OfflineError> {
        tokio::time::timeout(self.lock_timeout, self.entries.lock())
            .await
            .map_err(|_| OfflineError::LockTimeout)
    }

    /// Admit events in order until the buffer is full; the excess newest
    /// events are dropped and warn-logged. Returns how many were admitted.
    ///
    /// Returns [`OfflineError::Disabled`] without admitting anything when
    /// buffering is turned off.
    pub async fn admit(&self, events: Vec<FaceEvent>) -> Result<usize, OfflineError> {
        if !self.enabled {
            return Err(OfflineError::Disabled);
        }
        if events.is_empty() {
            return Ok(0);
        }

        let mut entries = self.lock().await?;
        let space = self.capacity.saturating_sub(entries.len());
        let admitted = events.len().min(space);
        let dropped = events.len() - admitted;

        if dropped > 0 {
            warn!(
                admitted,
                dropped,
                capacity = self.capacity,
                "offline buffer overflow, dropping newest events"
            );
        }

        entries.extend(events.into_iter().take(admitted));
        self.occupancy.store(entries.len(), Ordering::Relaxed);

        if admitted > 0 {
            debug!(
                admitted,
                occupancy = entries.len(),
                "events admitted to offline buffer"
            );
        }
        Ok(admitted)
    }

    /// Try to deliver the entire buffer contents as one batch.
    ///
    /// `send` is invoked at most once, with a request built from every held
    /// event (timestamps repaired against a fresh clock sample). Success
    /// clears the buffer and returns the flushed count; failure keeps the
    /// contents for a later cycle. An empty or disabled buffer flushes
    /// trivially as `Ok(0)` without touching the transport.
    pub async fn flush_attempt<F, Fut>(&self, send: F) -> Result<usize, OfflineError>
    where
        F: FnOnce(UploadRequest) -> Fut,
        Fut: Future<Output = Result<(), DeliveryError>>,
    {
        if !self.enabled {
            return Ok(0);
        }

        let mut entries = self.lock().await?;
        let request = match wire::build_request(&entries, &ClockSample::now()) {
            Some(request) => request,
            None => return Ok(0),
        };
        let count = entries.len();

        debug!(count, "attempting offline buffer flush");
        match send(request).await {
            Ok(()) => {
                entries.clear();
                self.occupancy.store(0, Ordering::Relaxed);
                info!(flushed = count, "offline buffer flushed");
                Ok(count)
            }
            Err(err) => {
                debug!(error = %err, count, "offline flush failed, keeping contents");
                Err(OfflineError::Flush(err))
            }
        }
    }

    /// Number of events currently held. Lock-free hint, like
    /// [`LogStore::pending_count`](crate::store::LogStore::pending_count).
    pub fn count(&self) -> usize {
        self.occupancy.load(Ordering::Relaxed)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ClockSample;
    use crate::event::{FleetIdentity, GpsFix};
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Mutex as StdMutex};

    fn test_identity() -> FleetIdentity {
        FleetIdentity {
            device_id: "BUS-CAM-001".to_string(),
            bus_id: "34-AB-123".to_string(),
            route_name: "M4-DOWNTOWN".to_string(),
            location_type: "ENTRY".to_string(),
        }
    }

    fn test_event(subject_id: i32) -> FaceEvent {
        FaceEvent::capture(
            &test_identity(),
            subject_id,
            vec![0.25; 4],
            &GpsFix::default(),
            None,
            &ClockSample::now(),
        )
    }

    fn test_events(ids: std::ops::RangeInclusive<i32>) -> Vec<FaceEvent> {
        ids.map(test_event).collect()
    }

    fn enabled_buffer(capacity: usize) -> OfflineBuffer {
        OfflineBuffer::new(capacity, true, Duration::from_millis(1000))
    }

    #[tokio::test]
    async fn test_admit_within_capacity() {
        let buffer = enabled_buffer(5);
        let admitted = buffer.admit(test_events(1..=3)).await.expect("admit");
        assert_eq!(admitted, 3);
        assert_eq!(buffer.count(), 3);
    }

    #[tokio::test]
    async fn test_admit_drops_newest_on_overflow() {
        let buffer = enabled_buffer(3);
        buffer.admit(test_events(1..=2)).await.expect("admit");

        // Space for one; events 4 and 5 are the dropped excess.
        let admitted = buffer.admit(test_events(3..=5)).await.expect("admit");
        assert_eq!(admitted, 1);
        assert_eq!(buffer.count(), 3);

        let seen = Arc::new(StdMutex::new(None));
        let seen_clone = Arc::clone(&seen);
        buffer
            .flush_attempt(|request| async move {
                *seen_clone.lock().expect("poisoned") = Some(request);
                Ok(())
            })
            .await
            .expect("flush");

        let request = seen.lock().expect("poisoned").take().expect("request sent");
        let ids: Vec<i32> = request.logs.iter().map(|log| log.face_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_admit_when_disabled() {
        let buffer = OfflineBuffer::new(5, false, Duration::from_millis(1000));
        let result = buffer.admit(test_events(1..=2)).await;
        assert!(matches!(result, Err(OfflineError::Disabled)));
        assert_eq!(buffer.count(), 0);
    }

    #[tokio::test]
    async fn test_admit_empty_slice() {
        let buffer = enabled_buffer(5);
        let admitted = buffer.admit(Vec::new()).await.expect("admit");
        assert_eq!(admitted, 0);
    }

    #[tokio::test]
    async fn test_flush_empty_buffer_skips_transport() {
        let buffer = enabled_buffer(5);
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);

        let flushed = buffer
            .flush_attempt(|_request| async move {
                calls_clone.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await
            .expect("flush");

        assert_eq!(flushed, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_flush_disabled_buffer_skips_transport() {
        let buffer = OfflineBuffer::new(5, false, Duration::from_millis(1000));
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);

        let flushed = buffer
            .flush_attempt(|_request| async move {
                calls_clone.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await
            .expect("flush");

        assert_eq!(flushed, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_flush_success_clears_buffer() {
        let buffer = enabled_buffer(5);
        buffer.admit(test_events(1..=2)).await.expect("admit");

        let flushed = buffer
            .flush_attempt(|_request| async move { Ok(()) })
            .await
            .expect("flush");
        assert_eq!(flushed, 2);
        assert_eq!(buffer.count(), 0);

        // Nothing left: the next flush never reaches the transport.
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        let flushed = buffer
            .flush_attempt(|_request| async move {
                calls_clone.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await
            .expect("flush");
        assert_eq!(flushed, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_flush_failure_keeps_contents() {
        let buffer = enabled_buffer(5);
        buffer.admit(test_events(1..=2)).await.expect("admit");

        let result = buffer
            .flush_attempt(|_request| async move {
                Err(DeliveryError::Server { status: 500 })
            })
            .await;
        assert!(matches!(result, Err(OfflineError::Flush(_))));
        assert_eq!(buffer.count(), 2);

        // A later successful flush delivers the same two events.
        let flushed = buffer
            .flush_attempt(|_request| async move { Ok(()) })
            .await
            .expect("flush");
        assert_eq!(flushed, 2);
        assert_eq!(buffer.count(), 0);
    }

    #[tokio::test]
    async fn test_offline_error_display() {
        assert_eq!(
            format!("{}", OfflineError::Disabled),
            "Offline buffering is disabled"
        );
        assert_eq!(
            format!("{}", OfflineError::LockTimeout),
            "Timed out waiting for the offline buffer lock"
        );
    }
}
