//! Background delivery loop: trigger handling, batching, retries, backoff
//! and the offline-buffer fallback.
//!
//! One instance of this loop runs per process. Each cycle snapshots the
//! oldest pending events, tries to flush the offline buffer, then delivers
//! the snapshot with up to `max_retries` attempts and exponential backoff.
//! A batch that exhausts its retries moves to the offline buffer (when
//! enabled) and is always released from the pending store, so it is never
//! buffered twice.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::client::{DeliveryError, UplinkClient};
use crate::clock::ClockSample;
use crate::config::Config;
use crate::event::FaceEvent;
use crate::offline::{OfflineBuffer, OfflineError};
use crate::status::StatusRegister;
use crate::store::LogStore;
use crate::wire::{self, UploadRequest};

/// Wakes the delivery loop ahead of its interval.
///
/// Built on [`Notify`]: firing while no cycle is waiting leaves a single
/// permit, so any number of triggers between cycles collapse into one
/// wake-up. Firing is non-blocking and safe from any task.
pub struct UploadTrigger {
    notify: Notify,
}

impl UploadTrigger {
    pub fn new() -> Self {
        Self {
            notify: Notify::new(),
        }
    }

    /// Request a delivery cycle now. Idempotent while one is pending.
    pub fn fire(&self) {
        self.notify.notify_one();
    }

    /// Wait for a trigger or until `interval` elapses, whichever comes
    /// first. Returns true when woken by a trigger; the loop proceeds
    /// identically either way.
    pub async fn wait(&self, interval: Duration) -> bool {
        tokio::time::timeout(interval, self.notify.notified())
            .await
            .is_ok()
    }
}

impl Default for UploadTrigger {
    fn default() -> Self {
        Self::new()
    }
}

/// Delay before the retry that follows failed attempt `attempt` (0-based):
/// `min(base * 2^attempt, cap)`. Deterministic, so operators can predict
/// the worst-case length of a delivery cycle from the config alone.
pub fn backoff_delay(attempt: u32, base: Duration, cap: Duration) -> Duration {
    let base_ms = base.as_millis() as u64;
    let cap_ms = cap.as_millis() as u64;
    let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    let exponential = base_ms.saturating_mul(factor);
    Duration::from_millis(exponential.min(cap_ms))
}

/// Outcome of one delivery cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing was pending
    Idle,

    /// The store lock wait exceeded its bound; nothing was attempted
    StoreBusy,

    /// The batch was delivered and released
    Delivered { count: usize, attempts: u32 },

    /// Every attempt failed; the batch went to the offline buffer (when
    /// enabled) and was released from the pending store
    Exhausted { count: usize, attempts: u32 },
}

/// The delivery state machine and its collaborators.
///
/// The transport is injected as an async closure taking the built
/// [`UploadRequest`], which keeps the retry/fallback logic independent of
/// the HTTP stack; production wires in [`UplinkClient::send`]
/// (see [`run_uploader`]).
///
/// [`UplinkClient::send`]: crate::client::UplinkClient::send
pub struct Uploader {
    store: Arc<LogStore>,
    offline: Arc<OfflineBuffer>,
    status: Arc<StatusRegister>,
    trigger: Arc<UploadTrigger>,
    stop: Arc<AtomicBool>,
    max_batch_size: usize,
    max_retries: u32,
    backoff_base: Duration,
    backoff_cap: Duration,
    upload_interval: Duration,
}

impl Uploader {
    pub fn new(
        config: &Config,
        store: Arc<LogStore>,
        offline: Arc<OfflineBuffer>,
        status: Arc<StatusRegister>,
        trigger: Arc<UploadTrigger>,
        stop: Arc<AtomicBool>,
    ) -> Self {
        Self {
            store,
            offline,
            status,
            trigger,
            stop,
            max_batch_size: config.max_batch_size,
            max_retries: config.max_retries,
            backoff_base: config.retry_backoff_base,
            backoff_cap: config.max_retry_delay,
            upload_interval: config.upload_interval,
        }
    }

    /// Run delivery cycles until the stop flag is set.
    ///
    /// The flag is checked at the top of every cycle and before each
    /// backoff sleep; a sleep already in progress is never interrupted.
    /// Exits without draining either buffer.
    pub async fn run<F, Fut>(&self, transport: F)
    where
        F: Fn(UploadRequest) -> Fut,
        Fut: Future<Output = Result<(), DeliveryError>>,
    {
        info!(
            interval_secs = self.upload_interval.as_secs(),
            max_retries = self.max_retries,
            "delivery loop started"
        );

        while !self.stop.load(Ordering::SeqCst) {
            let triggered = self.trigger.wait(self.upload_interval).await;
            if self.stop.load(Ordering::SeqCst) {
                break;
            }

            debug!(triggered, "delivery cycle wake");
            match self.run_cycle(&transport).await {
                CycleOutcome::Idle => {}
                CycleOutcome::StoreBusy => {
                    warn!("delivery cycle skipped, pending store busy")
                }
                CycleOutcome::Delivered { count, attempts } => {
                    debug!(count, attempts, "delivery cycle complete")
                }
                CycleOutcome::Exhausted { count, attempts } => {
                    debug!(count, attempts, "delivery cycle exhausted retries")
                }
            }
        }

        info!("delivery loop stopped");
    }

    /// Execute one delivery cycle against the given transport.
    ///
    /// Steps: check for pending events, snapshot up to `max_batch_size`
    /// of them (they stay in the store), give the offline buffer its
    /// flush attempt, then deliver. Each attempt rebuilds the request so
    /// timestamp repair sees a fresh clock. On success the batch is
    /// released and recorded; between failed attempts the failure is
    /// recorded and the loop backs off; after the final failure the batch
    /// moves toward the offline buffer and is released regardless, with a
    /// summary failure recorded last.
    pub async fn run_cycle<F, Fut>(&self, transport: &F) -> CycleOutcome
    where
        F: Fn(UploadRequest) -> Fut,
        Fut: Future<Output = Result<(), DeliveryError>>,
    {
        if self.store.pending_count() == 0 {
            return CycleOutcome::Idle;
        }

        let events = match self.store.snapshot(self.max_batch_size).await {
            Ok(events) => events,
            Err(err) => {
                warn!(error = %err, "could not snapshot pending events");
                return CycleOutcome::StoreBusy;
            }
        };
        if events.is_empty() {
            return CycleOutcome::Idle;
        }
        let count = events.len();
        let batch_id = Uuid::new_v4();

        // Older stranded events go first while the link looks usable.
        self.flush_offline(transport).await;

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;

            let request = match wire::build_request(&events, &ClockSample::now()) {
                Some(request) => request,
                None => return CycleOutcome::Idle,
            };

            match transport(request).await {
                Ok(()) => {
                    match self.store.release_front(count).await {
                        Ok(removed) => {
                            debug!(batch_id = %batch_id, removed, "delivered batch released")
                        }
                        Err(err) => warn!(
                            batch_id = %batch_id,
                            error = %err,
                            "delivered batch not released, next cycle may resend it"
                        ),
                    }
                    self.status.record_success(count as u64).await;
                    info!(batch_id = %batch_id, count, attempts = attempt, "batch delivered");
                    return CycleOutcome::Delivered { count, attempts: attempt };
                }
                Err(err) => {
                    if attempt >= self.max_retries || self.stop.load(Ordering::SeqCst) {
                        let summary =
                            format!("upload failed after {} attempts: {}", attempt, err);
                        error!(
                            batch_id = %batch_id,
                            attempts = attempt,
                            error = %err,
                            "delivery failed, batch falls back to offline buffer"
                        );
                        self.fall_back(events, &summary, count).await;
                        return CycleOutcome::Exhausted { count, attempts: attempt };
                    }

                    self.status.record_failure(&err.to_string()).await;
                    let delay = backoff_delay(attempt - 1, self.backoff_base, self.backoff_cap);
                    warn!(
                        batch_id = %batch_id,
                        attempt,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "upload attempt failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Best-effort flush of the offline buffer. Failures are routine while
    /// the collector is down and never abort the cycle.
    async fn flush_offline<F, Fut>(&self, transport: &F)
    where
        F: Fn(UploadRequest) -> Fut,
        Fut: Future<Output = Result<(), DeliveryError>>,
    {
        match self.offline.flush_attempt(|request| transport(request)).await {
            Ok(0) => {}
            Ok(flushed) => {
                self.status.record_success(flushed as u64).await;
                self.status.set_offline_count(self.offline.count()).await;
            }
            Err(OfflineError::Flush(err)) => {
                debug!(error = %err, "offline flush attempt failed")
            }
            Err(err) => warn!(error = %err, "offline flush attempt aborted"),
        }
    }

    /// Exhausted-retries fallback: admit the snapshot to the offline
    /// buffer, release the originals either way, record the summary
    /// failure. Releasing regardless keeps a batch from being buffered
    /// twice; whatever admission had to drop is gone.
    async fn fall_back(&self, events: Vec<FaceEvent>, summary: &str, count: usize) {
        match self.offline.admit(events).await {
            Ok(admitted) => {
                debug!(admitted, count, "failed batch admitted to offline buffer");
                self.status.set_offline_count(self.offline.count()).await;
            }
            Err(OfflineError::Disabled) => {
                warn!(count, "offline buffering disabled, dropping failed batch")
            }
            Err(err) => {
                warn!(error = %err, count, "failed batch not admitted to offline buffer")
            }
        }

        if let Err(err) = self.store.release_front(count).await {
            warn!(error = %err, "failed batch not released from pending store");
        }
        self.status.record_failure(summary).await;
    }
}

/// Wire the delivery loop to the real HTTP client and run it.
///
/// This is what `main` spawns; tests drive [`Uploader::run_cycle`] with
/// closure transports instead.
pub async fn run_uploader(uploader: Arc<Uploader>, client: Arc<UplinkClient>) {
    let transport = move |request: UploadRequest| {
        let client = Arc::clone(&client);
        async move { client.send(&request).await }
    };
    uploader.run(transport).await;
}
