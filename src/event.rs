//! Face-detection event model and the producer-facing logging facade.
//!
//! A [`FaceEvent`] is captured once by the recognition pipeline and then
//! flows through the pending store, the serializer and (on bad days) the
//! offline buffer. The attached JPEG, when present, has exactly one owner
//! at all times: [`ImageData`] is deliberately not `Clone`, and the only
//! way to duplicate an event is [`FaceEvent::upload_copy`], which leaves
//! the image behind in the store slot.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::clock::{self, ClockSample};
use crate::config::Config;
use crate::store::{LogStore, StoreError};
use crate::uploader::UploadTrigger;

/// Largest embedding the recognition model produces. Longer inputs are a
/// pipeline bug and are stored as empty rather than truncated.
pub const MAX_EMBEDDING_LEN: usize = 128;

/// An owned JPEG byte buffer with single-owner semantics.
///
/// Not `Clone`: a buffer lives in exactly one event slot and is dropped
/// exactly once, on upload release, eviction or store teardown.
pub struct ImageData(Vec<u8>);

impl ImageData {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for ImageData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImageData({} bytes)", self.0.len())
    }
}

/// A GPS reading handed in by the positioning subsystem.
///
/// `valid` is false while the receiver has no fix; consumers must not
/// interpret the numeric fields in that case.
#[derive(Debug, Clone, Copy, Default)]
pub struct GpsFix {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub satellites: u32,
    pub valid: bool,
}

/// Fleet identity copied into every captured event.
///
/// Copied at capture time and never re-resolved, so events keep the
/// identity that was current when they happened.
#[derive(Debug, Clone)]
pub struct FleetIdentity {
    pub device_id: String,
    pub bus_id: String,
    pub route_name: String,
    pub location_type: String,
}

impl FleetIdentity {
    pub fn from_config(config: &Config) -> Self {
        Self {
            device_id: config.device_id.clone(),
            bus_id: config.bus_id.clone(),
            route_name: config.route_name.clone(),
            location_type: config.location_type.clone(),
        }
    }
}

/// One face-detection event, as captured on the device.
///
/// Not `Clone`; see [`ImageData`]. Use [`FaceEvent::upload_copy`] for the
/// image-free duplicate the delivery path works with.
#[derive(Debug)]
pub struct FaceEvent {
    /// Capture wall-clock time, or an unsynced placeholder (see `clock`)
    pub captured_at: String,
    /// Monotonic reading paired with `captured_at`, for timestamp repair;
    /// never transmitted
    pub captured_at_monotonic_us: u64,
    /// Recognized subject id, negative for unenrolled faces
    pub subject_id: i32,
    /// Face embedding, 0..=128 values; empty when recognition produced none
    pub embedding: Vec<f32>,
    pub location_type: String,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub satellites: u32,
    pub gps_valid: bool,
    pub device_id: String,
    pub bus_id: String,
    pub route_name: String,
    /// Trip context is resolved by the collector; captured empty
    pub trip_id: String,
    pub trip_date: String,
    pub trip_active: bool,
    /// Captured JPEG, if the camera pipeline produced one
    pub image: Option<ImageData>,
}

impl FaceEvent {
    /// Build an event at capture time, normalizing raw pipeline inputs.
    ///
    /// An embedding longer than [`MAX_EMBEDDING_LEN`] is stored empty, and
    /// the numeric GPS fields are zeroed when the fix is invalid. Trip
    /// context is left empty for the collector to resolve.
    pub fn capture(
        identity: &FleetIdentity,
        subject_id: i32,
        embedding: Vec<f32>,
        gps: &GpsFix,
        image: Option<ImageData>,
        now: &ClockSample,
    ) -> Self {
        let embedding = if embedding.len() > MAX_EMBEDDING_LEN {
            warn!(
                subject_id,
                embedding_len = embedding.len(),
                "embedding exceeds maximum length, storing empty"
            );
            Vec::new()
        } else {
            embedding
        };

        let (latitude, longitude, altitude, satellites) = if gps.valid {
            (gps.latitude, gps.longitude, gps.altitude, gps.satellites)
        } else {
            (0.0, 0.0, 0.0, 0)
        };

        Self {
            captured_at: clock::capture_timestamp(now),
            captured_at_monotonic_us: now.monotonic_us,
            subject_id,
            embedding,
            location_type: identity.location_type.clone(),
            latitude,
            longitude,
            altitude,
            satellites,
            gps_valid: gps.valid,
            device_id: identity.device_id.clone(),
            bus_id: identity.bus_id.clone(),
            route_name: identity.route_name.clone(),
            trip_id: String::new(),
            trip_date: String::new(),
            trip_active: false,
            image,
        }
    }

    /// Duplicate every field except the image, which stays with `self`.
    ///
    /// This is the only duplication path for events; the delivery side
    /// works exclusively on these image-free copies.
    pub fn upload_copy(&self) -> Self {
        Self {
            captured_at: self.captured_at.clone(),
            captured_at_monotonic_us: self.captured_at_monotonic_us,
            subject_id: self.subject_id,
            embedding: self.embedding.clone(),
            location_type: self.location_type.clone(),
            latitude: self.latitude,
            longitude: self.longitude,
            altitude: self.altitude,
            satellites: self.satellites,
            gps_valid: self.gps_valid,
            device_id: self.device_id.clone(),
            bus_id: self.bus_id.clone(),
            route_name: self.route_name.clone(),
            trip_id: self.trip_id.clone(),
            trip_date: self.trip_date.clone(),
            trip_active: self.trip_active,
            image: None,
        }
    }

    pub fn embedding_len(&self) -> usize {
        self.embedding.len()
    }
}

/// Producer-facing facade: captures events into the store and nudges the
/// delivery task.
///
/// Failures stay on this side of the camera pipeline: a caller that cannot
/// store an event logs and moves on, it never retries into the hot path.
pub struct EventLogger {
    identity: FleetIdentity,
    store: Arc<LogStore>,
    trigger: Arc<UploadTrigger>,
}

impl EventLogger {
    pub fn new(identity: FleetIdentity, store: Arc<LogStore>, trigger: Arc<UploadTrigger>) -> Self {
        Self {
            identity,
            store,
            trigger,
        }
    }

    /// Capture a detection and signal the delivery task.
    ///
    /// Appending never waits on network state; the only failure mode is a
    /// lock wait exceeding its bound, reported as
    /// [`StoreError::LockTimeout`]. The trigger fires only after the event
    /// is actually stored.
    pub async fn log_detection(
        &self,
        subject_id: i32,
        embedding: Vec<f32>,
        gps: &GpsFix,
        image: Option<ImageData>,
    ) -> Result<(), StoreError> {
        let now = ClockSample::now();
        let has_image = image.is_some();
        let event = FaceEvent::capture(&self.identity, subject_id, embedding, gps, image, &now);
        self.store.append(event).await?;
        self.trigger.fire();
        debug!(
            subject_id,
            has_image,
            pending = self.store.pending_count(),
            "detection logged"
        );
        Ok(())
    }

    /// Ask the delivery task to run a cycle now. Non-blocking; firing
    /// while a request is already pending is a no-op.
    pub fn trigger_delivery_now(&self) {
        self.trigger.fire();
    }
}
