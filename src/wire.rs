//! Wire types for the collector's face-log ingestion endpoint.
//!
//! One [`UploadRequest`] per batch. The schema is fixed by the collector:
//! batch-level identity comes from the first record (a batch never mixes
//! devices), every record repairs its timestamp against the same clock
//! sample, and `image_data` is always the JSON literal `null` while the
//! fleet runs in embedding-only mode.

use serde::{Deserialize, Serialize};

use crate::clock::{self, ClockSample};
use crate::event::FaceEvent;

/// One face-detection record as the collector ingests it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireLog {
    /// Capture time, repaired when the event predates clock sync
    pub timestamp: String,

    /// Recognized subject id, negative for unenrolled faces
    pub face_id: i32,

    /// Embedding values, exactly `embedding_size` of them; never padded
    pub face_embedding: Vec<f32>,

    /// Length of `face_embedding`
    pub embedding_size: usize,

    /// Always `null`: images stay on the device in embedding-only mode
    pub image_data: Option<String>,

    pub location_type: String,
    pub latitude: f64,
    pub longitude: f64,
    pub device_id: String,
    pub bus_id: String,
    pub route_name: String,

    /// Trip context, resolved by the collector; empty as captured
    pub trip_id: String,
    pub trip_date: String,
    pub trip_active: bool,
}

/// A batch of face logs for `POST {server_url}{endpoint}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadRequest {
    /// Device that captured every record in this batch
    pub device_id: String,

    /// Bus that device is mounted on
    pub bus_id: String,

    /// Records in capture order
    pub logs: Vec<WireLog>,
}

impl UploadRequest {
    /// Number of records in the batch.
    pub fn len(&self) -> usize {
        self.logs.len()
    }

    /// Whether the batch carries no records.
    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
    }
}

/// Build the upload request for a batch of events.
///
/// Returns `None` for an empty slice; there is nothing to send and the
/// collector rejects empty batches. Batch identity is taken from the first
/// record, and each record's timestamp is repaired against `now` (see
/// [`clock::effective_timestamp`]).
pub fn build_request(events: &[FaceEvent], now: &ClockSample) -> Option<UploadRequest> {
    let first = events.first()?;

    let logs = events
        .iter()
        .map(|event| WireLog {
            timestamp: clock::effective_timestamp(
                &event.captured_at,
                event.captured_at_monotonic_us,
                now,
            ),
            face_id: event.subject_id,
            face_embedding: event.embedding.clone(),
            embedding_size: event.embedding.len(),
            image_data: None,
            location_type: event.location_type.clone(),
            latitude: event.latitude,
            longitude: event.longitude,
            device_id: event.device_id.clone(),
            bus_id: event.bus_id.clone(),
            route_name: event.route_name.clone(),
            trip_id: event.trip_id.clone(),
            trip_date: event.trip_date.clone(),
            trip_active: event.trip_active,
        })
        .collect();

    Some(UploadRequest {
        device_id: first.device_id.clone(),
        bus_id: first.bus_id.clone(),
        logs,
    })
}
