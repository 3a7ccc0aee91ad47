//! Clock sampling and timestamp repair.
//!
//! Edge nodes boot with an unsynchronized wall clock and may capture events
//! before NTP sync completes. Capture-side code stamps such events with a
//! placeholder timestamp plus a monotonic reading; at serialization time the
//! placeholder is repaired by subtracting the monotonic age of the event from
//! the (by then synchronized) wall clock. Stored records are never mutated.

use std::sync::OnceLock;
use std::time::Instant;

use chrono::{DateTime, Utc};

/// Earliest wall-clock second treated as a synchronized clock
/// (2024-01-01T00:00:00Z). Anything before this is a pre-sync reading.
pub const CLOCK_SYNC_EPOCH: i64 = 1_704_067_200;

/// Timestamp written at capture time when the wall clock is not yet synced.
pub const UNSYNCED_PLACEHOLDER: &str = "1970-01-01T00:00:00Z";

/// Prefixes identifying a capture timestamp taken from an unsynchronized
/// clock: the epoch default and the 2025-12-01 value some RTC batches
/// boot preset to.
const UNSYNCED_PREFIXES: [&str; 2] = ["1970", "2025-12-01"];

/// Wire timestamp format, second precision, always UTC.
const WIRE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

static PROCESS_START: OnceLock<Instant> = OnceLock::new();

/// Microseconds elapsed since the first clock sample of this process.
fn monotonic_now_us() -> u64 {
    let start = PROCESS_START.get_or_init(Instant::now);
    start.elapsed().as_micros() as u64
}

/// A paired wall-clock and monotonic reading taken at the same instant.
///
/// The monotonic half survives wall-clock jumps (NTP sync), which is what
/// makes the repair in [`effective_timestamp`] possible.
#[derive(Debug, Clone, Copy)]
pub struct ClockSample {
    /// Wall-clock time, possibly pre-sync garbage
    pub wall: DateTime<Utc>,
    /// Microseconds since process start, unaffected by wall-clock jumps
    pub monotonic_us: u64,
}

impl ClockSample {
    /// Sample both clocks now.
    pub fn now() -> Self {
        Self {
            wall: Utc::now(),
            monotonic_us: monotonic_now_us(),
        }
    }
}

/// Whether a wall-clock reading is past the sync sanity epoch.
pub fn is_synced(wall: &DateTime<Utc>) -> bool {
    wall.timestamp() >= CLOCK_SYNC_EPOCH
}

/// Whether a capture timestamp string came from an unsynchronized clock.
pub fn is_unsynced_placeholder(timestamp: &str) -> bool {
    UNSYNCED_PREFIXES
        .iter()
        .any(|prefix| timestamp.starts_with(prefix))
}

/// Timestamp string to store at capture time: the formatted wall clock when
/// synced, otherwise the placeholder constant.
pub fn capture_timestamp(now: &ClockSample) -> String {
    if is_synced(&now.wall) {
        format_wire(&now.wall)
    } else {
        UNSYNCED_PLACEHOLDER.to_string()
    }
}

/// The timestamp to transmit for an event.
///
/// When the clock has synced since capture and the stored string is a
/// placeholder, the event's real capture time is reconstructed as
/// `now - (monotonic age of the event)`, truncated to whole seconds.
/// In every other case the stored string passes through unchanged; the
/// collector applies its own fallback heuristics to placeholders it
/// still receives.
pub fn effective_timestamp(captured_at: &str, captured_monotonic_us: u64, now: &ClockSample) -> String {
    if is_synced(&now.wall) && is_unsynced_placeholder(captured_at) {
        let elapsed_s = now.monotonic_us.saturating_sub(captured_monotonic_us) / 1_000_000;
        let repaired = now.wall - chrono::Duration::seconds(elapsed_s as i64);
        format_wire(&repaired)
    } else {
        captured_at.to_string()
    }
}

fn format_wire(wall: &DateTime<Utc>) -> String {
    wall.format(WIRE_TIME_FORMAT).to_string()
}
