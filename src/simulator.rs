//! Synthetic detection source for development and soak runs.
//!
//! Stands in for the camera and recognizer so the capture-to-upload path
//! can run on a workstation with no fleet hardware attached. Produces
//! plausible subject ids, unit-norm embeddings, GPS fixes jittered around
//! a route anchor and the occasional fake JPEG.

use std::time::Duration;

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use crate::event::{GpsFix, ImageData, MAX_EMBEDDING_LEN};

/// Subject id the recognizer reports for a face it has no enrollment for.
pub const UNKNOWN_SUBJECT_ID: i32 = -1;

// Route anchor near the Istanbul waterfront; fixes jitter around it.
const ROUTE_ANCHOR_LAT: f64 = 41.0082;
const ROUTE_ANCHOR_LON: f64 = 28.9784;
const ROUTE_JITTER_DEG: f64 = 0.02;

// The first few enrolled subjects are daily commuters and show up far
// more often than the rest of the pool.
const REGULAR_RIDERS: usize = 5;
const REGULAR_WEIGHT: u32 = 8;

/// Configuration for the detection simulator.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Mean gap between detections in milliseconds
    pub base_interval_ms: u64,

    /// Fraction (0.0 - 1.0) of detections matching an enrolled subject
    pub known_subject_rate: f64,

    /// Fraction (0.0 - 1.0) of detections with no GPS fix
    pub gps_dropout_rate: f64,

    /// Fraction (0.0 - 1.0) of detections carrying a captured image
    pub image_rate: f64,

    /// Number of enrolled subjects to draw known ids from
    pub subject_pool: usize,

    /// Length of generated embeddings
    pub embedding_len: usize,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            base_interval_ms: 1500,
            known_subject_rate: 0.8,
            gps_dropout_rate: 0.1, // tunnels and urban canyons
            image_rate: 0.25,
            subject_pool: 40,
            embedding_len: MAX_EMBEDDING_LEN,
        }
    }
}

/// One simulated recognizer output, ready for
/// [`EventLogger::log_detection`].
///
/// [`EventLogger::log_detection`]: crate::event::EventLogger::log_detection
#[derive(Debug)]
pub struct SimulatedDetection {
    pub subject_id: i32,
    pub embedding: Vec<f32>,
    pub gps: GpsFix,
    pub image: Option<ImageData>,
}

/// Detection generator with weighted subject selection.
///
/// Known subjects are drawn from a weighted pool so a handful of regular
/// riders dominate, the way a real commuter route looks.
pub struct DetectionSimulator {
    config: SimulatorConfig,
    subject_weights: WeightedIndex<u32>,
}

impl DetectionSimulator {
    /// Create a simulator with the given configuration. Rates are clamped
    /// into 0.0..=1.0 and the subject pool is at least one.
    pub fn new(config: SimulatorConfig) -> Self {
        let config = SimulatorConfig {
            known_subject_rate: config.known_subject_rate.clamp(0.0, 1.0),
            gps_dropout_rate: config.gps_dropout_rate.clamp(0.0, 1.0),
            image_rate: config.image_rate.clamp(0.0, 1.0),
            subject_pool: config.subject_pool.max(1),
            ..config
        };

        let weights: Vec<u32> = (0..config.subject_pool)
            .map(|i| if i < REGULAR_RIDERS { REGULAR_WEIGHT } else { 1 })
            .collect();
        let subject_weights = WeightedIndex::new(&weights).expect("Invalid weights");

        Self {
            config,
            subject_weights,
        }
    }

    /// Create a simulator with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(SimulatorConfig::default())
    }

    /// Generate a single detection.
    pub fn next_detection(&self) -> SimulatedDetection {
        let mut rng = rand::thread_rng();

        let subject_id = if rng.gen_bool(self.config.known_subject_rate) {
            (self.subject_weights.sample(&mut rng) + 1) as i32
        } else {
            UNKNOWN_SUBJECT_ID
        };

        let embedding = self.random_embedding(&mut rng);
        let gps = self.random_fix(&mut rng);
        let image = if rng.gen_bool(self.config.image_rate) {
            Some(self.random_image(&mut rng))
        } else {
            None
        };

        SimulatedDetection {
            subject_id,
            embedding,
            gps,
            image,
        }
    }

    /// Gap to sleep before the next detection: the base interval with
    /// plus/minus fifty percent jitter.
    pub fn next_interval(&self) -> Duration {
        let base = self.config.base_interval_ms.max(1);
        let jittered = rand::thread_rng().gen_range(base / 2..=base + base / 2);
        Duration::from_millis(jittered)
    }

    /// Random unit-norm embedding, the shape recognizer output has.
    fn random_embedding(&self, rng: &mut impl Rng) -> Vec<f32> {
        let mut embedding: Vec<f32> = (0..self.config.embedding_len)
            .map(|_| rng.gen_range(-1.0f32..1.0f32))
            .collect();

        let norm = embedding.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for value in &mut embedding {
                *value /= norm;
            }
        }
        embedding
    }

    fn random_fix(&self, rng: &mut impl Rng) -> GpsFix {
        if rng.gen_bool(self.config.gps_dropout_rate) {
            // No fix; the capture path zeroes the numeric fields.
            return GpsFix::default();
        }

        GpsFix {
            latitude: ROUTE_ANCHOR_LAT + rng.gen_range(-ROUTE_JITTER_DEG..ROUTE_JITTER_DEG),
            longitude: ROUTE_ANCHOR_LON + rng.gen_range(-ROUTE_JITTER_DEG..ROUTE_JITTER_DEG),
            altitude: rng.gen_range(30.0..120.0),
            satellites: rng.gen_range(4..=12),
            valid: true,
        }
    }

    /// Fake JPEG: valid SOI/EOI markers around random payload bytes.
    fn random_image(&self, rng: &mut impl Rng) -> ImageData {
        let body_len = rng.gen_range(512..2048);
        let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
        bytes.extend((0..body_len).map(|_| rng.gen::<u8>()));
        bytes.extend([0xFF, 0xD9]);
        ImageData::new(bytes)
    }
}

impl Default for DetectionSimulator {
    fn default() -> Self {
        Self::with_defaults()
    }
}
