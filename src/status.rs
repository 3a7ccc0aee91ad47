//! Upload status register: connectivity flag, counters and last-error text.
//!
//! One instance per process, shared by the delivery task (writes) and the
//! reporting task (reads). Updates are best-effort: a lock wait past its
//! bound drops the update with a warning rather than stalling delivery.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::warn;

/// Longest `last_error` kept, in bytes. Longer messages are cut at the
/// nearest character boundary below this.
const MAX_LAST_ERROR_BYTES: usize = 128;

/// Point-in-time copy of the register, serializable for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub online: bool,
    pub successful_uploads: u64,
    pub failed_uploads: u64,
    pub consecutive_failures: u64,
    pub last_error: String,
    pub last_success_time: Option<DateTime<Utc>>,
    pub offline_buffer_count: usize,
}

#[derive(Debug, Default)]
struct StatusInner {
    online: bool,
    successful_uploads: u64,
    failed_uploads: u64,
    consecutive_failures: u64,
    last_error: String,
    last_success_time: Option<DateTime<Utc>>,
    offline_buffer_count: usize,
}

/// Process-wide upload health, updated by the delivery task.
///
/// `successful_uploads` counts delivered events; `failed_uploads` and
/// `consecutive_failures` count failed attempts. A success flips the node
/// online, zeroes the consecutive counter and clears the last error.
pub struct StatusRegister {
    inner: Mutex<StatusInner>,
    lock_timeout: Duration,
}

impl StatusRegister {
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            inner: Mutex::new(StatusInner::default()),
            lock_timeout,
        }
    }

    /// Record `count` events delivered in one successful upload.
    pub async fn record_success(&self, count: u64) {
        match tokio::time::timeout(self.lock_timeout, self.inner.lock()).await {
            Ok(mut inner) => {
                inner.online = true;
                inner.successful_uploads += count;
                inner.consecutive_failures = 0;
                inner.last_error.clear();
                inner.last_success_time = Some(Utc::now());
            }
            Err(_) => warn!("status lock wait exceeded, success update dropped"),
        }
    }

    /// Record one failed upload attempt.
    pub async fn record_failure(&self, message: &str) {
        match tokio::time::timeout(self.lock_timeout, self.inner.lock()).await {
            Ok(mut inner) => {
                inner.online = false;
                inner.failed_uploads += 1;
                inner.consecutive_failures += 1;
                inner.last_error = truncate_error(message);
            }
            Err(_) => warn!("status lock wait exceeded, failure update dropped"),
        }
    }

    /// Mirror the offline buffer occupancy for reporting.
    pub async fn set_offline_count(&self, count: usize) {
        match tokio::time::timeout(self.lock_timeout, self.inner.lock()).await {
            Ok(mut inner) => inner.offline_buffer_count = count,
            Err(_) => warn!("status lock wait exceeded, offline count update dropped"),
        }
    }

    /// Copy of the current register state, or `None` when the lock wait
    /// exceeds its bound.
    pub async fn snapshot(&self) -> Option<StatusSnapshot> {
        match tokio::time::timeout(self.lock_timeout, self.inner.lock()).await {
            Ok(inner) => Some(StatusSnapshot {
                online: inner.online,
                successful_uploads: inner.successful_uploads,
                failed_uploads: inner.failed_uploads,
                consecutive_failures: inner.consecutive_failures,
                last_error: inner.last_error.clone(),
                last_success_time: inner.last_success_time,
                offline_buffer_count: inner.offline_buffer_count,
            }),
            Err(_) => {
                warn!("status lock wait exceeded, snapshot skipped");
                None
            }
        }
    }
}

fn truncate_error(message: &str) -> String {
    if message.len() <= MAX_LAST_ERROR_BYTES {
        return message.to_string();
    }
    let mut end = MAX_LAST_ERROR_BYTES;
    while !message.is_char_boundary(end) {
        end -= 1;
    }
    message[..end].to_string()
}
