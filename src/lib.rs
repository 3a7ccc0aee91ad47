//! Fleet Uplink Library
//!
//! This library provides the on-device reliability layer between face
//! recognition and the fleet collector:
//!
//! - **config**: Environment-based configuration for the uplink service
//! - **clock**: Capture timestamps and repair of unsynced wall clocks
//! - **event**: Detection event model and the producer-facing logger
//! - **store**: Bounded pending-event store with oldest-first eviction
//! - **offline**: Holding buffer for batches that exhausted their retries
//! - **wire**: Upload payload schema and serialization
//! - **client**: HTTP client with connection pooling and a strict success check
//! - **uploader**: Delivery loop with retries, backoff and offline fallback
//! - **status**: Upload health counters for operators
//! - **simulator**: Synthetic detection source for development
//!
//! # Example
//!
//! ```no_run
//! use std::sync::atomic::AtomicBool;
//! use std::sync::Arc;
//!
//! use fleet_uplink::client::UplinkClient;
//! use fleet_uplink::config::Config;
//! use fleet_uplink::event::{EventLogger, FleetIdentity, GpsFix};
//! use fleet_uplink::offline::OfflineBuffer;
//! use fleet_uplink::status::StatusRegister;
//! use fleet_uplink::store::LogStore;
//! use fleet_uplink::uploader::{run_uploader, UploadTrigger, Uploader};
//!
//! #[tokio::main]
//! async fn main() {
//!     // Load configuration from environment
//!     let config = Config::from_env().expect("Failed to load config");
//!
//!     // Shared state between the capture and delivery sides
//!     let store = Arc::new(LogStore::new(config.log_store_capacity, config.lock_timeout));
//!     let offline = Arc::new(OfflineBuffer::new(
//!         config.offline_buffer_size,
//!         config.enable_offline_buffering,
//!         config.lock_timeout,
//!     ));
//!     let status = Arc::new(StatusRegister::new(config.lock_timeout));
//!     let trigger = Arc::new(UploadTrigger::new());
//!     let stop = Arc::new(AtomicBool::new(false));
//!
//!     // Background delivery loop
//!     let client = Arc::new(UplinkClient::new(&config).expect("Failed to create client"));
//!     let uploader = Arc::new(Uploader::new(
//!         &config,
//!         Arc::clone(&store),
//!         offline,
//!         status,
//!         Arc::clone(&trigger),
//!         stop,
//!     ));
//!     tokio::spawn(run_uploader(uploader, client));
//!
//!     // Capture side: never blocks on the network
//!     let logger = EventLogger::new(FleetIdentity::from_config(&config), store, trigger);
//!     logger
//!         .log_detection(42, vec![0.1; 128], &GpsFix::default(), None)
//!         .await
//!         .ok();
//! }
//! ```

// Module declarations
pub mod client;
pub mod clock;
pub mod config;
pub mod event;
pub mod offline;
pub mod simulator;
pub mod status;
pub mod store;
pub mod uploader;
pub mod wire;

// Re-export commonly used types at crate root for convenience
pub use client::{DeliveryError, UplinkClient};
pub use config::{Config, ConfigError};
pub use event::{EventLogger, FaceEvent, FleetIdentity, GpsFix, ImageData};
pub use offline::{OfflineBuffer, OfflineError};
pub use simulator::{DetectionSimulator, SimulatedDetection, SimulatorConfig};
pub use status::{StatusRegister, StatusSnapshot};
pub use store::{LogStore, StoreError, StoreStats};
pub use uploader::{backoff_delay, run_uploader, CycleOutcome, UploadTrigger, Uploader};
pub use wire::{UploadRequest, WireLog};
