//! Fleet Uplink - telemetry reliability service for bus-mounted edge nodes
//!
//! This service takes face-detection events from the recognition pipeline,
//! holds them in a bounded on-device store and batch-uploads them to the
//! fleet collector, riding out the connectivity loss that comes with a
//! vehicle-mounted deployment.
//!
//! ## Features
//!
//! - Capture path that never blocks on network state
//! - Batched HTTP upload with retries and exponential backoff
//! - Offline buffering for batches that exhaust their retries
//! - Timestamp repair for events captured before clock sync
//! - Graceful shutdown on SIGINT
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables:
//!
//! - `FLEET_UPLINK_SERVER_URL`: Collector base URL (required)
//! - `FLEET_UPLINK_DEVICE_ID`: Device identifier (required)
//! - `FLEET_UPLINK_UPLOAD_INTERVAL_SECS`: Seconds between cycles (default: 5)
//! - `FLEET_UPLINK_MAX_BATCH_SIZE`: Events per upload (default: 50)
//! - `FLEET_UPLINK_MAX_RETRIES`: Attempts per batch (default: 5)
//! - `FLEET_UPLINK_LOG_STORE_CAPACITY`: Pending store size (default: 5)
//! - `FLEET_UPLINK_OFFLINE_BUFFER_SIZE`: Offline buffer size (default: 50)
//! - `RUST_LOG`: Logging level filter (default: info)
//!
//! The `config` module documents the full list.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use fleet_uplink::client::UplinkClient;
use fleet_uplink::config::Config;
use fleet_uplink::event::{EventLogger, FleetIdentity};
use fleet_uplink::offline::OfflineBuffer;
use fleet_uplink::simulator::DetectionSimulator;
use fleet_uplink::status::StatusRegister;
use fleet_uplink::store::LogStore;
use fleet_uplink::uploader::{run_uploader, UploadTrigger, Uploader};

/// How often the simulator and status tasks report progress
const STATUS_REPORT_INTERVAL: Duration = Duration::from_secs(30);

/// How long shutdown waits for the delivery loop to finish
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() {
    // Initialize tracing subscriber with environment filter
    init_tracing();

    info!("Starting fleet uplink service...");

    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(config) => {
            info!(
                server_url = %config.server_url,
                device_id = %config.device_id,
                upload_interval_secs = config.upload_interval.as_secs(),
                max_batch_size = config.max_batch_size,
                max_retries = config.max_retries,
                "Configuration loaded"
            );
            config
        }
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            std::process::exit(1);
        }
    };

    // Create HTTP client with connection pooling
    let client = match UplinkClient::new(&config) {
        Ok(client) => {
            info!(upload_url = %client.upload_url(), "HTTP client initialized");
            Arc::new(client)
        }
        Err(e) => {
            error!(error = %e, "Failed to create HTTP client");
            std::process::exit(1);
        }
    };

    // Shared state between the capture and delivery sides
    let store = Arc::new(LogStore::new(config.log_store_capacity, config.lock_timeout));
    let offline = Arc::new(OfflineBuffer::new(
        config.offline_buffer_size,
        config.enable_offline_buffering,
        config.lock_timeout,
    ));
    let status = Arc::new(StatusRegister::new(config.lock_timeout));
    let trigger = Arc::new(UploadTrigger::new());
    let stop = Arc::new(AtomicBool::new(false));

    let uploader = Arc::new(Uploader::new(
        &config,
        Arc::clone(&store),
        Arc::clone(&offline),
        Arc::clone(&status),
        Arc::clone(&trigger),
        Arc::clone(&stop),
    ));

    // Spawn delivery task - batches, retries and offline fallback
    let uploader_handle = {
        let uploader = Arc::clone(&uploader);
        let client = Arc::clone(&client);
        tokio::spawn(async move {
            info!("Delivery task started");
            run_uploader(uploader, client).await;
            info!("Delivery task completed");
        })
    };

    // Spawn simulator task - stands in for the recognition pipeline
    let logger = EventLogger::new(
        FleetIdentity::from_config(&config),
        Arc::clone(&store),
        Arc::clone(&trigger),
    );
    let simulator_handle = {
        let stop = Arc::clone(&stop);
        tokio::spawn(async move {
            info!("Simulator task started");
            run_simulator(DetectionSimulator::with_defaults(), logger, stop).await;
            info!("Simulator task completed");
        })
    };

    // Spawn status task - periodic health report for operators
    let reporter_handle = {
        let status = Arc::clone(&status);
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            run_status_reporter(status, store).await;
        })
    };

    // Wait for shutdown signal
    info!("Fleet uplink running. Press Ctrl+C to stop.");
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received, stopping...");
        }
        Err(e) => {
            error!(error = %e, "Failed to listen for shutdown signal");
        }
    }

    // Graceful shutdown: flag the loops down, wake the delivery task, and
    // give it time to finish the cycle in flight. Buffers are not drained.
    info!("Initiating graceful shutdown...");
    stop.store(true, Ordering::SeqCst);
    trigger.fire();
    simulator_handle.abort();
    reporter_handle.abort();

    match tokio::time::timeout(SHUTDOWN_TIMEOUT, uploader_handle).await {
        Ok(Ok(())) => {
            info!("Delivery task shut down gracefully");
        }
        Ok(Err(e)) => {
            warn!(error = %e, "Delivery task panicked during shutdown");
        }
        Err(_) => {
            warn!("Delivery task shutdown timed out after {:?}", SHUTDOWN_TIMEOUT);
        }
    }

    info!("Fleet uplink stopped");
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

/// Run the detection simulator, feeding the event logger at jittered
/// intervals until the stop flag is set.
async fn run_simulator(simulator: DetectionSimulator, logger: EventLogger, stop: Arc<AtomicBool>) {
    let mut detections_logged: u64 = 0;
    let mut last_report_time = std::time::Instant::now();

    while !stop.load(Ordering::SeqCst) {
        tokio::time::sleep(simulator.next_interval()).await;
        if stop.load(Ordering::SeqCst) {
            break;
        }

        let detection = simulator.next_detection();
        match logger
            .log_detection(
                detection.subject_id,
                detection.embedding,
                &detection.gps,
                detection.image,
            )
            .await
        {
            Ok(()) => {
                detections_logged += 1;

                // Periodic progress report
                if last_report_time.elapsed() >= STATUS_REPORT_INTERVAL {
                    info!(
                        detections_logged,
                        rate = format!(
                            "{:.1}/s",
                            detections_logged as f64 / last_report_time.elapsed().as_secs_f64()
                        ),
                        "Simulator progress"
                    );
                    detections_logged = 0;
                    last_report_time = std::time::Instant::now();
                }
            }
            Err(e) => {
                warn!(error = %e, "Detection dropped, store busy");
            }
        }
    }
}

/// Emit a JSON status line and store counters at a fixed interval, for
/// operators tailing the service log.
async fn run_status_reporter(status: Arc<StatusRegister>, store: Arc<LogStore>) {
    let mut ticker = tokio::time::interval(STATUS_REPORT_INTERVAL);

    loop {
        ticker.tick().await;

        let stats = store.stats();
        match status.snapshot().await {
            Some(snapshot) => match serde_json::to_string(&snapshot) {
                Ok(json) => {
                    info!(
                        status = %json,
                        pending = stats.pending,
                        appended = stats.appended,
                        evicted = stats.evicted,
                        "Status report"
                    );
                }
                Err(e) => {
                    warn!(error = %e, "Could not serialize status snapshot");
                }
            },
            None => {
                warn!("Status register busy, report skipped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_interval_is_sane() {
        assert!(STATUS_REPORT_INTERVAL >= Duration::from_secs(5));
        assert!(STATUS_REPORT_INTERVAL <= Duration::from_secs(300));
    }

    #[test]
    fn test_shutdown_timeout_is_sane() {
        assert!(SHUTDOWN_TIMEOUT >= Duration::from_secs(1));
        assert!(SHUTDOWN_TIMEOUT <= Duration::from_secs(60));
    }
}
