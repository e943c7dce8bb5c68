//! REST transport to the search backend
//!
//! Thin wrapper over `reqwest` that resolves paths against the configured host
//! list, falls through to the next host on connection failures, and records
//! request metrics. Interpretation of status codes is left to the callers.

use crate::config::BackendConfig;
use crate::metrics::{BACKEND_REQUESTS_TOTAL, BACKEND_REQUEST_DURATION_SECONDS};
use crate::search::error::{SearchError, SearchResult};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Request body variants understood by the backend
#[derive(Debug, Clone)]
pub enum RequestBody {
    Json(serde_json::Value),
    /// Newline-delimited JSON, used by `_bulk`
    NdJson(String),
}

/// One backend call
#[derive(Debug, Clone)]
pub struct BackendRequest {
    operation: &'static str,
    method: Method,
    path: String,
    body: Option<RequestBody>,
    timeout: Option<Duration>,
}

impl BackendRequest {
    pub fn new(operation: &'static str, method: Method, path: impl Into<String>) -> Self {
        Self {
            operation,
            method,
            path: path.into(),
            body: None,
            timeout: None,
        }
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    pub fn ndjson(mut self, body: String) -> Self {
        self.body = Some(RequestBody::NdJson(body));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Raw backend response
#[derive(Debug, Clone)]
pub struct BackendResponse {
    pub status: StatusCode,
    pub body: String,
}

impl BackendResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Decode a successful body
    pub fn json<T: DeserializeOwned>(&self) -> SearchResult<T> {
        serde_json::from_str(&self.body).map_err(|e| {
            SearchError::BackendUnavailable(format!("Unexpected backend response: {}", e))
        })
    }

    /// Decode the backend's error envelope, if the body carries one
    pub fn error(&self) -> Option<BackendErrorBody> {
        serde_json::from_str::<BackendErrorEnvelope>(&self.body)
            .ok()
            .map(|envelope| envelope.error)
    }

    pub fn error_type(&self) -> Option<String> {
        self.error().map(|e| e.error_type)
    }

    /// Turn an unexpected status into `BackendUnavailable`
    pub fn unavailable(&self, operation: &str) -> SearchError {
        let reason = self
            .error()
            .map(|e| format!("{}: {}", e.error_type, e.reason))
            .unwrap_or_else(|| self.body.chars().take(200).collect());

        SearchError::BackendUnavailable(format!(
            "{} returned {}: {}",
            operation, self.status, reason
        ))
    }
}

#[derive(Debug, Deserialize)]
struct BackendErrorEnvelope {
    error: BackendErrorBody,
}

/// `error` object of a backend failure response
#[derive(Debug, Clone, Deserialize)]
pub struct BackendErrorBody {
    #[serde(rename = "type")]
    pub error_type: String,

    #[serde(default)]
    pub reason: String,
}

/// Shared, cloneable backend client
#[derive(Clone)]
pub struct BackendClient {
    http: Client,
    hosts: Arc<[String]>,
    health_timeout: Duration,
}

impl BackendClient {
    /// Create a new client from backend configuration
    pub fn new(config: &BackendConfig) -> SearchResult<Self> {
        if config.hosts.is_empty() {
            return Err(SearchError::InvalidConfiguration(
                "At least one backend host is required".to_string(),
            ));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| {
                SearchError::InvalidConfiguration(format!("Failed to create HTTP client: {}", e))
            })?;

        let hosts: Vec<String> = config
            .hosts
            .iter()
            .map(|host| host.trim_end_matches('/').to_string())
            .collect();

        Ok(Self {
            http,
            hosts: hosts.into(),
            health_timeout: Duration::from_secs(config.health_timeout_secs),
        })
    }

    /// Client for a single host with default timeouts
    pub fn for_host(host: impl Into<String>) -> SearchResult<Self> {
        Self::new(&BackendConfig {
            hosts: vec![host.into()],
            ..Default::default()
        })
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    pub fn health_timeout(&self) -> Duration {
        self.health_timeout
    }

    /// Send a request, trying hosts in order until one answers
    pub async fn send(&self, request: BackendRequest) -> SearchResult<BackendResponse> {
        let start = Instant::now();
        let mut last_error = None;

        for host in self.hosts.iter() {
            let url = format!("{}{}", host, request.path);
            let mut builder = self.http.request(request.method.clone(), &url);

            if let Some(timeout) = request.timeout {
                builder = builder.timeout(timeout);
            }

            builder = match &request.body {
                Some(RequestBody::Json(body)) => builder.json(body),
                Some(RequestBody::NdJson(body)) => builder
                    .header(CONTENT_TYPE, "application/x-ndjson")
                    .body(body.clone()),
                None => builder,
            };

            match builder.send().await {
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await?;

                    debug!(
                        operation = request.operation,
                        method = %request.method,
                        url = %url,
                        status = status.as_u16(),
                        "Backend request completed"
                    );
                    record(request.operation, status_outcome(status), start);

                    return Ok(BackendResponse { status, body });
                }
                Err(e) if e.is_connect() => {
                    warn!(
                        operation = request.operation,
                        host = %host,
                        error = %e,
                        "Backend host unreachable, trying next host"
                    );
                    last_error = Some(e);
                }
                Err(e) => {
                    record(request.operation, "transport_error", start);
                    return Err(e.into());
                }
            }
        }

        record(request.operation, "transport_error", start);
        Err(last_error
            .map(SearchError::from)
            .unwrap_or_else(|| SearchError::BackendUnavailable("no backend hosts".to_string())))
    }
}

fn status_outcome(status: StatusCode) -> &'static str {
    if status.is_success() {
        "success"
    } else if status.is_client_error() {
        "client_error"
    } else {
        "server_error"
    }
}

fn record(operation: &str, outcome: &str, start: Instant) {
    BACKEND_REQUESTS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
    BACKEND_REQUEST_DURATION_SECONDS
        .with_label_values(&[operation])
        .observe(start.elapsed().as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_requires_hosts() {
        let config = BackendConfig {
            hosts: vec![],
            ..Default::default()
        };
        assert!(matches!(
            BackendClient::new(&config),
            Err(SearchError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let client = BackendClient::for_host("http://localhost:9200/").unwrap();
        assert_eq!(client.hosts(), &["http://localhost:9200".to_string()]);
    }

    #[test]
    fn test_error_envelope_parsing() {
        let response = BackendResponse {
            status: StatusCode::NOT_FOUND,
            body: r#"{"error":{"type":"index_not_found_exception","reason":"no such index"},"status":404}"#
                .to_string(),
        };

        assert_eq!(
            response.error_type().as_deref(),
            Some("index_not_found_exception")
        );
        assert!(matches!(
            response.unavailable("search"),
            SearchError::BackendUnavailable(msg) if msg.contains("no such index")
        ));
    }

    #[tokio::test]
    async fn test_unreachable_hosts_fall_through() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("HEAD", "/idx0")
            .with_status(200)
            .create_async()
            .await;

        // Port 9 (discard) on localhost is expected to refuse connections.
        let client = BackendClient::new(&BackendConfig {
            hosts: vec!["http://127.0.0.1:9".to_string(), server.url()],
            ..Default::default()
        })
        .unwrap();

        let response = client
            .send(BackendRequest::new("index_exists", Method::HEAD, "/idx0"))
            .await
            .unwrap();

        assert!(response.is_success());
        mock.assert_async().await;
    }
}
