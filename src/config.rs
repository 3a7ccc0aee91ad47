//! Configuration module for the fleet uplink service.
//!
//! This module provides environment-based configuration for the uplink,
//! including collector URL, device identity, batching, retry and buffer
//! capacity settings.

use std::env;
use std::time::Duration;

/// Default ingestion endpoint path on the collector
const DEFAULT_ENDPOINT: &str = "/api/face-logs";

/// Default location type reported for detections
const DEFAULT_LOCATION_TYPE: &str = "ENTRY";

/// Default bus identifier when provisioning has not assigned one
const DEFAULT_BUS_ID: &str = "UNKNOWN";

/// Default route name when provisioning has not assigned one
const DEFAULT_ROUTE_NAME: &str = "UNKNOWN";

/// Default seconds between delivery cycles when no trigger fires
const DEFAULT_UPLOAD_INTERVAL_SECS: u64 = 5;

/// Default number of events per upload batch
const DEFAULT_MAX_BATCH_SIZE: u64 = 50;

/// Default delivery attempts per cycle before falling back to the offline buffer
const DEFAULT_MAX_RETRIES: u64 = 5;

/// Default exponential backoff base in milliseconds
const DEFAULT_RETRY_BACKOFF_BASE_MS: u64 = 1000;

/// Default backoff ceiling in milliseconds
const DEFAULT_MAX_RETRY_DELAY_MS: u64 = 30_000;

/// Default pending log store capacity (entries)
const DEFAULT_LOG_STORE_CAPACITY: u64 = 5;

/// Default offline buffer capacity (entries)
const DEFAULT_OFFLINE_BUFFER_SIZE: u64 = 50;

/// Default bounded wait for any internal lock, in milliseconds
const DEFAULT_LOCK_TIMEOUT_MS: u64 = 1000;

/// Default HTTP request timeout in seconds
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 20;

/// Configuration for the fleet uplink service.
///
/// All settings can be configured via environment variables:
/// - `FLEET_UPLINK_SERVER_URL`: collector base URL (required)
/// - `FLEET_UPLINK_ENDPOINT`: ingestion path (default: /api/face-logs)
/// - `FLEET_UPLINK_DEVICE_ID`: device identifier (required)
/// - `FLEET_UPLINK_LOCATION_TYPE`: camera placement label (default: ENTRY)
/// - `FLEET_UPLINK_BUS_ID`, `FLEET_UPLINK_ROUTE_NAME`: fleet metadata
/// - `FLEET_UPLINK_UPLOAD_INTERVAL_SECS`: seconds between cycles (default: 5)
/// - `FLEET_UPLINK_MAX_BATCH_SIZE`: events per batch (default: 50)
/// - `FLEET_UPLINK_MAX_RETRIES`: attempts per cycle (default: 5)
/// - `FLEET_UPLINK_RETRY_BACKOFF_BASE_MS` / `FLEET_UPLINK_MAX_RETRY_DELAY_MS`:
///   exponential backoff base and ceiling (defaults: 1000 / 30000)
/// - `FLEET_UPLINK_LOG_STORE_CAPACITY`: pending store slots (default: 5)
/// - `FLEET_UPLINK_OFFLINE_BUFFER_SIZE`: offline buffer slots (default: 50)
/// - `FLEET_UPLINK_ENABLE_OFFLINE_BUFFERING`: keep failed batches (default: true)
/// - `FLEET_UPLINK_LOCK_TIMEOUT_MS`: bounded lock wait (default: 1000)
/// - `FLEET_UPLINK_REQUEST_TIMEOUT_SECS`: HTTP timeout (default: 20)
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the collector, trailing slash trimmed
    pub server_url: String,

    /// Full URL for the face-log ingestion endpoint
    pub upload_url: String,

    /// Identifier of this edge device, copied into every event
    pub device_id: String,

    /// Camera placement label (e.g. ENTRY, EXIT)
    pub location_type: String,

    /// Bus this device is mounted on
    pub bus_id: String,

    /// Route the bus serves
    pub route_name: String,

    /// Duration between delivery cycles when no trigger fires
    pub upload_interval: Duration,

    /// Maximum number of events per upload batch
    pub max_batch_size: usize,

    /// Delivery attempts per cycle before offline fallback
    pub max_retries: u32,

    /// Exponential backoff base delay
    pub retry_backoff_base: Duration,

    /// Ceiling on any single backoff delay
    pub max_retry_delay: Duration,

    /// Capacity of the pending log store
    pub log_store_capacity: usize,

    /// Capacity of the offline buffer
    pub offline_buffer_size: usize,

    /// Whether batches that exhaust their retries are kept offline
    pub enable_offline_buffering: bool,

    /// Bounded wait when acquiring any internal lock
    pub lock_timeout: Duration,

    /// HTTP request timeout
    pub request_timeout: Duration,
}

/// Error type for configuration loading failures
#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
    pub env_var: Option<String>,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.env_var {
            Some(var) => write!(f, "Configuration error for {}: {}", var, self.message),
            None => write!(f, "Configuration error: {}", self.message),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Returns a new `Config` instance with values from environment variables,
    /// falling back to defaults where a variable is optional.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - `FLEET_UPLINK_SERVER_URL` or `FLEET_UPLINK_DEVICE_ID` is missing or empty
    /// - any numeric variable is not a valid number or falls outside its bounds
    /// - `FLEET_UPLINK_MAX_RETRY_DELAY_MS` is below the backoff base
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use fleet_uplink::config::Config;
    ///
    /// let config = Config::from_env().expect("Failed to load config");
    /// println!("Uploading to: {}", config.upload_url);
    /// ```
    pub fn from_env() -> Result<Self, ConfigError> {
        let server_url = Self::require_string("FLEET_UPLINK_SERVER_URL")?;
        let server_url = server_url.trim_end_matches('/').to_string();

        let endpoint = Self::optional_string("FLEET_UPLINK_ENDPOINT", DEFAULT_ENDPOINT)?;
        if !endpoint.starts_with('/') {
            return Err(ConfigError {
                message: format!("endpoint '{}' must start with '/'", endpoint),
                env_var: Some("FLEET_UPLINK_ENDPOINT".to_string()),
            });
        }
        let upload_url = format!("{}{}", server_url, endpoint);

        let device_id = Self::require_string("FLEET_UPLINK_DEVICE_ID")?;
        let location_type =
            Self::optional_string("FLEET_UPLINK_LOCATION_TYPE", DEFAULT_LOCATION_TYPE)?;
        let bus_id = env::var("FLEET_UPLINK_BUS_ID").unwrap_or_else(|_| DEFAULT_BUS_ID.to_string());
        let route_name =
            env::var("FLEET_UPLINK_ROUTE_NAME").unwrap_or_else(|_| DEFAULT_ROUTE_NAME.to_string());

        let upload_interval_secs = Self::parse_bounded(
            "FLEET_UPLINK_UPLOAD_INTERVAL_SECS",
            DEFAULT_UPLOAD_INTERVAL_SECS,
            1,
            3600,
        )?;
        let max_batch_size =
            Self::parse_bounded("FLEET_UPLINK_MAX_BATCH_SIZE", DEFAULT_MAX_BATCH_SIZE, 1, 500)?;
        let max_retries =
            Self::parse_bounded("FLEET_UPLINK_MAX_RETRIES", DEFAULT_MAX_RETRIES, 1, 20)?;
        let retry_backoff_base_ms = Self::parse_bounded(
            "FLEET_UPLINK_RETRY_BACKOFF_BASE_MS",
            DEFAULT_RETRY_BACKOFF_BASE_MS,
            1,
            60_000,
        )?;
        let max_retry_delay_ms = Self::parse_bounded(
            "FLEET_UPLINK_MAX_RETRY_DELAY_MS",
            DEFAULT_MAX_RETRY_DELAY_MS,
            1,
            600_000,
        )?;

        if max_retry_delay_ms < retry_backoff_base_ms {
            return Err(ConfigError {
                message: format!(
                    "max retry delay {}ms is below the backoff base ({}ms)",
                    max_retry_delay_ms, retry_backoff_base_ms
                ),
                env_var: Some("FLEET_UPLINK_MAX_RETRY_DELAY_MS".to_string()),
            });
        }

        let log_store_capacity = Self::parse_bounded(
            "FLEET_UPLINK_LOG_STORE_CAPACITY",
            DEFAULT_LOG_STORE_CAPACITY,
            1,
            64,
        )?;
        let offline_buffer_size = Self::parse_bounded(
            "FLEET_UPLINK_OFFLINE_BUFFER_SIZE",
            DEFAULT_OFFLINE_BUFFER_SIZE,
            1,
            1000,
        )?;
        let enable_offline_buffering =
            Self::parse_bool("FLEET_UPLINK_ENABLE_OFFLINE_BUFFERING", true)?;
        let lock_timeout_ms = Self::parse_bounded(
            "FLEET_UPLINK_LOCK_TIMEOUT_MS",
            DEFAULT_LOCK_TIMEOUT_MS,
            10,
            10_000,
        )?;
        let request_timeout_secs = Self::parse_bounded(
            "FLEET_UPLINK_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
            1,
            300,
        )?;

        Ok(Self {
            server_url,
            upload_url,
            device_id,
            location_type,
            bus_id,
            route_name,
            upload_interval: Duration::from_secs(upload_interval_secs),
            max_batch_size: max_batch_size as usize,
            max_retries: max_retries as u32,
            retry_backoff_base: Duration::from_millis(retry_backoff_base_ms),
            max_retry_delay: Duration::from_millis(max_retry_delay_ms),
            log_store_capacity: log_store_capacity as usize,
            offline_buffer_size: offline_buffer_size as usize,
            enable_offline_buffering,
            lock_timeout: Duration::from_millis(lock_timeout_ms),
            request_timeout: Duration::from_secs(request_timeout_secs),
        })
    }

    /// Read a required, non-empty string variable.
    fn require_string(env_var: &str) -> Result<String, ConfigError> {
        match env::var(env_var) {
            Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
            Ok(_) => Err(ConfigError {
                message: "value must not be empty".to_string(),
                env_var: Some(env_var.to_string()),
            }),
            Err(_) => Err(ConfigError {
                message: "required variable is not set".to_string(),
                env_var: Some(env_var.to_string()),
            }),
        }
    }

    /// Read an optional string variable that must be non-empty when present.
    fn optional_string(env_var: &str, default: &str) -> Result<String, ConfigError> {
        match env::var(env_var) {
            Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
            Ok(_) => Err(ConfigError {
                message: "value must not be empty".to_string(),
                env_var: Some(env_var.to_string()),
            }),
            Err(_) => Ok(default.to_string()),
        }
    }

    /// Parse a numeric variable with inclusive bounds validation.
    fn parse_bounded(env_var: &str, default: u64, min: u64, max: u64) -> Result<u64, ConfigError> {
        match env::var(env_var) {
            Ok(value) => {
                let parsed: u64 = value.parse().map_err(|_| ConfigError {
                    message: format!("'{}' is not a valid number", value),
                    env_var: Some(env_var.to_string()),
                })?;

                if parsed < min {
                    return Err(ConfigError {
                        message: format!("value {} is below minimum ({})", parsed, min),
                        env_var: Some(env_var.to_string()),
                    });
                }

                if parsed > max {
                    return Err(ConfigError {
                        message: format!("value {} exceeds maximum ({})", parsed, max),
                        env_var: Some(env_var.to_string()),
                    });
                }

                Ok(parsed)
            }
            Err(_) => Ok(default),
        }
    }

    /// Parse a boolean variable accepting true/false/1/0 in any case.
    fn parse_bool(env_var: &str, default: bool) -> Result<bool, ConfigError> {
        match env::var(env_var) {
            Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(true),
                "false" | "0" => Ok(false),
                _ => Err(ConfigError {
                    message: format!("'{}' is not a valid boolean (expected true/false/1/0)", value),
                    env_var: Some(env_var.to_string()),
                }),
            },
            Err(_) => Ok(default),
        }
    }
}

impl Default for Config {
    /// Create a development configuration using default values.
    ///
    /// Real deployments load `from_env`; this is for tests and local runs
    /// against a collector on localhost.
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8000".to_string(),
            upload_url: format!("http://localhost:8000{}", DEFAULT_ENDPOINT),
            device_id: "DEV-NODE-01".to_string(),
            location_type: DEFAULT_LOCATION_TYPE.to_string(),
            bus_id: DEFAULT_BUS_ID.to_string(),
            route_name: DEFAULT_ROUTE_NAME.to_string(),
            upload_interval: Duration::from_secs(DEFAULT_UPLOAD_INTERVAL_SECS),
            max_batch_size: DEFAULT_MAX_BATCH_SIZE as usize,
            max_retries: DEFAULT_MAX_RETRIES as u32,
            retry_backoff_base: Duration::from_millis(DEFAULT_RETRY_BACKOFF_BASE_MS),
            max_retry_delay: Duration::from_millis(DEFAULT_MAX_RETRY_DELAY_MS),
            log_store_capacity: DEFAULT_LOG_STORE_CAPACITY as usize,
            offline_buffer_size: DEFAULT_OFFLINE_BUFFER_SIZE as usize,
            enable_offline_buffering: true,
            lock_timeout: Duration::from_millis(DEFAULT_LOCK_TIMEOUT_MS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Environment mutation is process-global; serialize these tests.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const ALL_VARS: &[&str] = &[
        "FLEET_UPLINK_SERVER_URL",
        "FLEET_UPLINK_ENDPOINT",
        "FLEET_UPLINK_DEVICE_ID",
        "FLEET_UPLINK_LOCATION_TYPE",
        "FLEET_UPLINK_BUS_ID",
        "FLEET_UPLINK_ROUTE_NAME",
        "FLEET_UPLINK_UPLOAD_INTERVAL_SECS",
        "FLEET_UPLINK_MAX_BATCH_SIZE",
        "FLEET_UPLINK_MAX_RETRIES",
        "FLEET_UPLINK_RETRY_BACKOFF_BASE_MS",
        "FLEET_UPLINK_MAX_RETRY_DELAY_MS",
        "FLEET_UPLINK_LOG_STORE_CAPACITY",
        "FLEET_UPLINK_OFFLINE_BUFFER_SIZE",
        "FLEET_UPLINK_ENABLE_OFFLINE_BUFFERING",
        "FLEET_UPLINK_LOCK_TIMEOUT_MS",
        "FLEET_UPLINK_REQUEST_TIMEOUT_SECS",
    ];

    // Helper to temporarily set environment variables for testing
    struct EnvGuard {
        key: String,
        original: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &str, value: &str) -> Self {
            let original = env::var(key).ok();
            env::set_var(key, value);
            Self {
                key: key.to_string(),
                original,
            }
        }

        fn remove(key: &str) -> Self {
            let original = env::var(key).ok();
            env::remove_var(key);
            Self {
                key: key.to_string(),
                original,
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.original {
                Some(val) => env::set_var(&self.key, val),
                None => env::remove_var(&self.key),
            }
        }
    }

    fn clear_all() -> Vec<EnvGuard> {
        ALL_VARS.iter().map(|var| EnvGuard::remove(var)).collect()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.upload_url, "http://localhost:8000/api/face-logs");
        assert_eq!(config.max_batch_size, 50);
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.retry_backoff_base, Duration::from_millis(1000));
        assert_eq!(config.max_retry_delay, Duration::from_millis(30_000));
        assert_eq!(config.log_store_capacity, 5);
        assert_eq!(config.offline_buffer_size, 50);
        assert!(config.enable_offline_buffering);
        assert_eq!(config.lock_timeout, Duration::from_millis(1000));
        assert_eq!(config.request_timeout, Duration::from_secs(20));
    }

    #[test]
    fn test_config_from_env_with_defaults() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _cleared = clear_all();
        let _g1 = EnvGuard::set("FLEET_UPLINK_SERVER_URL", "http://collector:8000");
        let _g2 = EnvGuard::set("FLEET_UPLINK_DEVICE_ID", "BUS-CAM-042");

        let config = Config::from_env().expect("Should load with defaults");
        assert_eq!(config.server_url, "http://collector:8000");
        assert_eq!(config.upload_url, "http://collector:8000/api/face-logs");
        assert_eq!(config.device_id, "BUS-CAM-042");
        assert_eq!(config.location_type, "ENTRY");
        assert_eq!(config.bus_id, "UNKNOWN");
        assert_eq!(config.route_name, "UNKNOWN");
        assert_eq!(config.upload_interval, Duration::from_secs(5));
        assert_eq!(config.max_batch_size, 50);
        assert_eq!(config.max_retries, 5);
        assert!(config.enable_offline_buffering);
    }

    #[test]
    fn test_config_from_env_custom_values() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _cleared = clear_all();
        let _g1 = EnvGuard::set("FLEET_UPLINK_SERVER_URL", "http://collector:9000/");
        let _g2 = EnvGuard::set("FLEET_UPLINK_DEVICE_ID", "BUS-CAM-007");
        let _g3 = EnvGuard::set("FLEET_UPLINK_ENDPOINT", "/v2/face-logs");
        let _g4 = EnvGuard::set("FLEET_UPLINK_BUS_ID", "34-AB-123");
        let _g5 = EnvGuard::set("FLEET_UPLINK_UPLOAD_INTERVAL_SECS", "30");
        let _g6 = EnvGuard::set("FLEET_UPLINK_MAX_BATCH_SIZE", "100");
        let _g7 = EnvGuard::set("FLEET_UPLINK_ENABLE_OFFLINE_BUFFERING", "false");
        let _g8 = EnvGuard::set("FLEET_UPLINK_LOG_STORE_CAPACITY", "8");

        let config = Config::from_env().expect("Should load custom values");
        assert_eq!(config.server_url, "http://collector:9000"); // Trailing slash removed
        assert_eq!(config.upload_url, "http://collector:9000/v2/face-logs");
        assert_eq!(config.bus_id, "34-AB-123");
        assert_eq!(config.upload_interval, Duration::from_secs(30));
        assert_eq!(config.max_batch_size, 100);
        assert!(!config.enable_offline_buffering);
        assert_eq!(config.log_store_capacity, 8);
    }

    #[test]
    fn test_missing_server_url() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _cleared = clear_all();
        let _g = EnvGuard::set("FLEET_UPLINK_DEVICE_ID", "BUS-CAM-001");

        let result = Config::from_env();
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.env_var.as_deref(), Some("FLEET_UPLINK_SERVER_URL"));
        assert!(err.message.contains("not set"));
    }

    #[test]
    fn test_missing_device_id() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _cleared = clear_all();
        let _g = EnvGuard::set("FLEET_UPLINK_SERVER_URL", "http://collector:8000");

        let result = Config::from_env();
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().env_var.as_deref(),
            Some("FLEET_UPLINK_DEVICE_ID")
        );
    }

    #[test]
    fn test_endpoint_requires_leading_slash() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _cleared = clear_all();
        let _g1 = EnvGuard::set("FLEET_UPLINK_SERVER_URL", "http://collector:8000");
        let _g2 = EnvGuard::set("FLEET_UPLINK_DEVICE_ID", "BUS-CAM-001");
        let _g3 = EnvGuard::set("FLEET_UPLINK_ENDPOINT", "api/face-logs");

        let result = Config::from_env();
        assert!(result.is_err());
        assert!(result.unwrap_err().message.contains("must start with '/'"));
    }

    #[test]
    fn test_invalid_upload_interval() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _cleared = clear_all();
        let _g1 = EnvGuard::set("FLEET_UPLINK_SERVER_URL", "http://collector:8000");
        let _g2 = EnvGuard::set("FLEET_UPLINK_DEVICE_ID", "BUS-CAM-001");
        let _g3 = EnvGuard::set("FLEET_UPLINK_UPLOAD_INTERVAL_SECS", "not_a_number");

        let result = Config::from_env();
        assert!(result.is_err());
        assert!(result.unwrap_err().message.contains("not a valid number"));
    }

    #[test]
    fn test_upload_interval_below_min() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _cleared = clear_all();
        let _g1 = EnvGuard::set("FLEET_UPLINK_SERVER_URL", "http://collector:8000");
        let _g2 = EnvGuard::set("FLEET_UPLINK_DEVICE_ID", "BUS-CAM-001");
        let _g3 = EnvGuard::set("FLEET_UPLINK_UPLOAD_INTERVAL_SECS", "0");

        let result = Config::from_env();
        assert!(result.is_err());
        assert!(result.unwrap_err().message.contains("below minimum"));
    }

    #[test]
    fn test_batch_size_exceeds_max() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _cleared = clear_all();
        let _g1 = EnvGuard::set("FLEET_UPLINK_SERVER_URL", "http://collector:8000");
        let _g2 = EnvGuard::set("FLEET_UPLINK_DEVICE_ID", "BUS-CAM-001");
        let _g3 = EnvGuard::set("FLEET_UPLINK_MAX_BATCH_SIZE", "501");

        let result = Config::from_env();
        assert!(result.is_err());
        assert!(result.unwrap_err().message.contains("exceeds maximum"));
    }

    #[test]
    fn test_invalid_offline_buffering_flag() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _cleared = clear_all();
        let _g1 = EnvGuard::set("FLEET_UPLINK_SERVER_URL", "http://collector:8000");
        let _g2 = EnvGuard::set("FLEET_UPLINK_DEVICE_ID", "BUS-CAM-001");
        let _g3 = EnvGuard::set("FLEET_UPLINK_ENABLE_OFFLINE_BUFFERING", "maybe");

        let result = Config::from_env();
        assert!(result.is_err());
        assert!(result.unwrap_err().message.contains("not a valid boolean"));
    }

    #[test]
    fn test_retry_delay_below_backoff_base() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _cleared = clear_all();
        let _g1 = EnvGuard::set("FLEET_UPLINK_SERVER_URL", "http://collector:8000");
        let _g2 = EnvGuard::set("FLEET_UPLINK_DEVICE_ID", "BUS-CAM-001");
        let _g3 = EnvGuard::set("FLEET_UPLINK_RETRY_BACKOFF_BASE_MS", "5000");
        let _g4 = EnvGuard::set("FLEET_UPLINK_MAX_RETRY_DELAY_MS", "2000");

        let result = Config::from_env();
        assert!(result.is_err());
        assert!(result.unwrap_err().message.contains("below the backoff base"));
    }

    #[test]
    fn test_config_error_display() {
        let error = ConfigError {
            message: "test error".to_string(),
            env_var: Some("TEST_VAR".to_string()),
        };
        assert_eq!(
            format!("{}", error),
            "Configuration error for TEST_VAR: test error"
        );

        let error_no_var = ConfigError {
            message: "general error".to_string(),
            env_var: None,
        };
        assert_eq!(
            format!("{}", error_no_var),
            "Configuration error: general error"
        );
    }
}
