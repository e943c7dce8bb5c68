//! Messaging configuration

use crate::messaging::events::TaskKind;
use serde::{Deserialize, Serialize};

/// NATS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NatsConfig {
    /// NATS server URLs
    #[serde(default = "default_nats_servers")]
    pub servers: Vec<String>,

    /// Connection name
    #[serde(default = "default_connection_name")]
    pub connection_name: String,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            servers: default_nats_servers(),
            connection_name: default_connection_name(),
        }
    }
}

/// Task queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagingConfig {
    /// Start the task bridge
    #[serde(default)]
    pub enabled: bool,

    /// NATS configuration
    #[serde(default)]
    pub nats: NatsConfig,

    /// Subject prefix; tasks arrive on `<prefix>.index`, `<prefix>.analyze`, `<prefix>.delete`
    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,

    /// Queue group shared by analyzer replicas
    #[serde(default = "default_subject_prefix")]
    pub queue_group: String,

    /// Tasks processed concurrently
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            nats: NatsConfig::default(),
            subject_prefix: default_subject_prefix(),
            queue_group: default_subject_prefix(),
            max_in_flight: default_max_in_flight(),
        }
    }
}

impl MessagingConfig {
    /// Subject carrying tasks of the given kind
    pub fn subject(&self, kind: TaskKind) -> String {
        format!("{}.{}", self.subject_prefix, kind.as_str())
    }

    /// Subject matching every task kind
    pub fn wildcard_subject(&self) -> String {
        format!("{}.*", self.subject_prefix)
    }
}

fn default_nats_servers() -> Vec<String> {
    vec!["nats://localhost:4222".to_string()]
}

fn default_connection_name() -> String {
    "log-analyzer".to_string()
}

fn default_subject_prefix() -> String {
    "analyzer".to_string()
}

fn default_max_in_flight() -> usize {
    8
}
