use crate::messaging::MessagingConfig;
use crate::search::SearchConfig;
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Search backend connection
    #[serde(default)]
    pub backend: BackendConfig,

    /// Indexing and similarity query tuning
    #[serde(default)]
    pub search: SearchConfig,

    /// Task queue configuration
    #[serde(default)]
    pub messaging: MessagingConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from the given file and environment
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(config_path).required(false))
            // Override with environment variables (prefix: ANALYZER__)
            .add_source(
                config::Environment::with_prefix("ANALYZER")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("backend.hosts")
                    .with_list_parse_key("messaging.nats.servers")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Deadline for one analysis request (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Backend base URLs, tried in order
    #[serde(default = "default_backend_hosts")]
    pub hosts: Vec<String>,

    /// Per-request timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Health check timeout (seconds)
    #[serde(default = "default_health_timeout")]
    pub health_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            hosts: default_backend_hosts(),
            request_timeout_secs: default_request_timeout(),
            health_timeout_secs: default_health_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,

    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub prometheus_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            prometheus_enabled: true,
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    5000
}

fn default_request_timeout() -> u64 {
    30
}

fn default_backend_hosts() -> Vec<String> {
    vec!["http://elasticsearch:9200".to_string()]
}

fn default_health_timeout() -> u64 {
    2
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        assert_eq!(default_http_port(), 5000);
        assert_eq!(default_health_timeout(), 2);
        assert_eq!(default_log_level(), "info");
        assert!(default_true());
    }

    #[test]
    fn test_embedded_defaults_load() {
        let config = Config::load_from("does/not/exist").unwrap();
        assert_eq!(config.backend.hosts, vec!["http://elasticsearch:9200".to_string()]);
        assert_eq!(config.search.min_should_match, "80%");
        assert_eq!(config.search.min_doc_freq, 7.0);
        assert_eq!(config.search.normalization_rules.len(), 1);
        assert_eq!(config.search.normalization_rules[0].pattern, r"\d+$");
        assert!(!config.messaging.enabled);
        assert!(config.search.check().is_ok());
    }
}
