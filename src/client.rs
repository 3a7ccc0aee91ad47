//! HTTP client for delivering face-log batches to the collector.
//!
//! This module provides an async HTTP client with connection pooling and
//! error classification. It performs exactly one attempt per call; the
//! retry/backoff state machine around it lives in the delivery loop.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::config::Config;
use crate::wire::UploadRequest;

/// User-Agent sent with every upload request.
const USER_AGENT: &str = concat!("fleet-uplink/", env!("CARGO_PKG_VERSION"));

/// Errors that can occur while delivering a batch.
///
/// Every variant is retryable from the delivery loop's point of view; the
/// distinction exists for status reporting and logs.
#[derive(Debug)]
pub enum DeliveryError {
    /// Could not reach the collector at all (no route, connection refused)
    NotConnected,

    /// The request ran past its timeout
    Timeout,

    /// Transport failed for another reason (TLS, protocol, body transfer)
    Transport(reqwest::Error),

    /// The collector answered with a status other than 200
    Server { status: u16 },
}

impl std::fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryError::NotConnected => write!(f, "Collector is unreachable"),
            DeliveryError::Timeout => write!(f, "Request timed out"),
            DeliveryError::Transport(e) => write!(f, "HTTP transport failed: {}", e),
            DeliveryError::Server { status } => {
                write!(f, "Collector returned HTTP {}", status)
            }
        }
    }
}

impl std::error::Error for DeliveryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DeliveryError::Transport(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for DeliveryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            DeliveryError::NotConnected
        } else if err.is_timeout() {
            DeliveryError::Timeout
        } else {
            DeliveryError::Transport(err)
        }
    }
}

/// HTTP client for the collector's face-log endpoint.
///
/// The client reuses connections via reqwest's internal pool and applies
/// the configured request timeout to every call. Success is strictly
/// HTTP 200: the collector's contract, not the 2xx class.
pub struct UplinkClient {
    /// The underlying HTTP client (reused for connection pooling)
    client: Client,

    /// Full URL of the face-log ingestion endpoint
    upload_url: String,

    /// Per-request timeout
    request_timeout: Duration,
}

impl UplinkClient {
    /// Create a new client from the service configuration.
    pub fn new(config: &Config) -> Result<Self, DeliveryError> {
        Self::with_settings(config.upload_url.clone(), config.request_timeout)
    }

    /// Create a new client with explicit settings, for tests and tools.
    pub fn with_settings(
        upload_url: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            upload_url: upload_url.into(),
            request_timeout,
        })
    }

    /// Deliver one batch. Exactly one HTTP attempt, no retries here.
    ///
    /// The response body is never parsed; on a non-200 answer it is read
    /// only to be logged at debug level for diagnosis.
    pub async fn send(&self, request: &UploadRequest) -> Result<(), DeliveryError> {
        debug!(
            batch = request.len(),
            url = %self.upload_url,
            "posting face-log batch"
        );

        let response = self
            .client
            .post(&self.upload_url)
            .timeout(self.request_timeout)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::OK {
            debug!(batch = request.len(), "collector accepted batch");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            debug!(
                status = status.as_u16(),
                body = %body,
                "collector rejected batch"
            );
            Err(DeliveryError::Server {
                status: status.as_u16(),
            })
        }
    }

    /// Get the configured upload URL.
    pub fn upload_url(&self) -> &str {
        &self.upload_url
    }

    /// Get the request timeout duration.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const HTTP_200: &str = "HTTP/1.1 200 OK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n";
    const HTTP_201: &str =
        "HTTP/1.1 201 Created\r\ncontent-length: 0\r\nconnection: close\r\n\r\n";
    const HTTP_500: &str =
        "HTTP/1.1 500 Internal Server Error\r\ncontent-length: 0\r\nconnection: close\r\n\r\n";

    fn empty_request() -> UploadRequest {
        UploadRequest {
            device_id: "BUS-CAM-001".to_string(),
            bus_id: "34-AB-123".to_string(),
            logs: Vec::new(),
        }
    }

    fn find_header_end(buf: &[u8]) -> Option<usize> {
        buf.windows(4).position(|window| window == b"\r\n\r\n")
    }

    // Minimal one-shot HTTP server: read the full request, write a canned
    // response, close.
    async fn respond_once(listener: TcpListener, response: &'static str) {
        let (mut socket, _) = listener.accept().await.expect("accept");
        let mut buf = vec![0u8; 8192];
        let mut read_total = 0;

        loop {
            if read_total == buf.len() {
                buf.resize(buf.len() * 2, 0);
            }
            match socket.read(&mut buf[read_total..]).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    read_total += n;
                    if let Some(header_end) = find_header_end(&buf[..read_total]) {
                        let headers = String::from_utf8_lossy(&buf[..header_end]);
                        let content_length = headers
                            .lines()
                            .find_map(|line| {
                                let (name, value) = line.split_once(':')?;
                                if name.eq_ignore_ascii_case("content-length") {
                                    value.trim().parse::<usize>().ok()
                                } else {
                                    None
                                }
                            })
                            .unwrap_or(0);
                        if read_total >= header_end + 4 + content_length {
                            break;
                        }
                    }
                }
            }
        }

        socket.write_all(response.as_bytes()).await.expect("write");
        let _ = socket.shutdown().await;
    }

    async fn serve(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(respond_once(listener, response));
        format!("http://{}/api/face-logs", addr)
    }

    #[test]
    fn test_client_creation() {
        let config = Config::default();
        let client = UplinkClient::new(&config).expect("client");
        assert_eq!(client.upload_url(), "http://localhost:8000/api/face-logs");
        assert_eq!(client.request_timeout(), Duration::from_secs(20));
    }

    #[test]
    fn test_client_with_settings() {
        let client =
            UplinkClient::with_settings("http://collector:9000/v2/face-logs", Duration::from_secs(5))
                .expect("client");
        assert_eq!(client.upload_url(), "http://collector:9000/v2/face-logs");
        assert_eq!(client.request_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_delivery_error_display() {
        assert_eq!(
            format!("{}", DeliveryError::NotConnected),
            "Collector is unreachable"
        );
        assert_eq!(format!("{}", DeliveryError::Timeout), "Request timed out");
        assert_eq!(
            format!("{}", DeliveryError::Server { status: 503 }),
            "Collector returned HTTP 503"
        );
    }

    #[tokio::test]
    async fn test_send_accepts_http_200() {
        let url = serve(HTTP_200).await;
        let client = UplinkClient::with_settings(url, Duration::from_secs(5)).expect("client");
        client.send(&empty_request()).await.expect("200 is success");
    }

    #[tokio::test]
    async fn test_send_rejects_http_201() {
        // Strictly 200; even another 2xx is a contract violation.
        let url = serve(HTTP_201).await;
        let client = UplinkClient::with_settings(url, Duration::from_secs(5)).expect("client");
        let result = client.send(&empty_request()).await;
        assert!(matches!(result, Err(DeliveryError::Server { status: 201 })));
    }

    #[tokio::test]
    async fn test_send_rejects_http_500() {
        let url = serve(HTTP_500).await;
        let client = UplinkClient::with_settings(url, Duration::from_secs(5)).expect("client");
        let result = client.send(&empty_request()).await;
        assert!(matches!(result, Err(DeliveryError::Server { status: 500 })));
    }

    #[tokio::test]
    async fn test_connection_refused_is_not_connected() {
        // Bind to learn a free port, then close it before connecting.
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        drop(listener);

        let url = format!("http://{}/api/face-logs", addr);
        let client = UplinkClient::with_settings(url, Duration::from_secs(5)).expect("client");
        let result = client.send(&empty_request()).await;
        assert!(matches!(result, Err(DeliveryError::NotConnected)));
    }

    #[tokio::test]
    async fn test_unresponsive_server_is_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            // Accept and sit on the connection without answering.
            let (_socket, _) = listener.accept().await.expect("accept");
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let url = format!("http://{}/api/face-logs", addr);
        let client =
            UplinkClient::with_settings(url, Duration::from_millis(100)).expect("client");
        let result = client.send(&empty_request()).await;
        assert!(matches!(result, Err(DeliveryError::Timeout)));
    }
}
