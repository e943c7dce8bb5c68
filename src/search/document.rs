//! Log document normalization
//!
//! Turns a log line, its test item and launch into the flat document stored in
//! the project index. Messages are rewritten by configurable regex rules so that
//! structurally identical failures differing only in volatile details (line
//! numbers, counters) still match each other.

use crate::models::{Launch, Log, TestItem};
use crate::search::config::{NormalizationRule, SearchConfig};
use crate::search::error::{SearchError, SearchResult};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Search document for one eligible log line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogDocument {
    /// Document id (the log id); carried in the bulk action, not the body
    #[serde(skip)]
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_type: Option<String>,

    pub launch_name: String,

    pub log_level: i32,

    /// Normalized message
    pub message: String,

    /// Owning test item id
    pub test_item: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_id: Option<String>,

    #[serde(default)]
    pub is_auto_analyzed: bool,
}

/// Ordered set of compiled message rewrites
#[derive(Debug, Clone)]
pub struct MessageNormalizer {
    rules: Vec<(Regex, String)>,
}

impl MessageNormalizer {
    /// Compile the rules; an invalid pattern is a configuration error
    pub fn new(rules: &[NormalizationRule]) -> SearchResult<Self> {
        let rules = rules
            .iter()
            .map(|rule| {
                Regex::new(&rule.pattern)
                    .map(|regex| (regex, rule.replacement.clone()))
                    .map_err(|e| {
                        SearchError::InvalidConfiguration(format!(
                            "Invalid normalization pattern '{}': {}",
                            rule.pattern, e
                        ))
                    })
            })
            .collect::<SearchResult<Vec<_>>>()?;

        Ok(Self { rules })
    }

    pub fn normalize(&self, message: &str) -> String {
        self.rules
            .iter()
            .fold(message.to_string(), |acc, (regex, replacement)| {
                regex.replace_all(&acc, replacement.as_str()).into_owned()
            })
    }
}

/// Converts launches into search documents
#[derive(Debug, Clone)]
pub struct DocumentNormalizer {
    threshold: i32,
    messages: MessageNormalizer,
}

impl DocumentNormalizer {
    pub fn new(config: &SearchConfig) -> SearchResult<Self> {
        Ok(Self {
            threshold: config.log_level_threshold,
            messages: MessageNormalizer::new(&config.normalization_rules)?,
        })
    }

    pub fn threshold(&self) -> i32 {
        self.threshold
    }

    pub fn is_eligible(&self, log: &Log) -> bool {
        log.level >= self.threshold
    }

    /// Normalize a log line, or `None` when it is below the severity threshold
    pub fn normalize(&self, log: &Log, item: &TestItem, launch: &Launch) -> Option<LogDocument> {
        if !self.is_eligible(log) {
            return None;
        }

        Some(LogDocument {
            id: log.id.clone(),
            issue_type: item.issue_type.clone(),
            launch_name: launch.name.clone(),
            log_level: log.level,
            message: self.messages.normalize(&log.message),
            test_item: item.id.clone(),
            unique_id: item.unique_id.clone(),
            is_auto_analyzed: item.is_auto_analyzed,
        })
    }

    /// All eligible documents of one test item, in log order
    pub fn normalize_item(&self, item: &TestItem, launch: &Launch) -> Vec<LogDocument> {
        item.logs
            .iter()
            .filter_map(|log| self.normalize(log, item, launch))
            .collect()
    }

    /// All eligible documents of a launch, in encounter order
    pub fn normalize_launch(&self, launch: &Launch) -> Vec<LogDocument> {
        launch
            .test_items
            .iter()
            .flat_map(|item| self.normalize_item(item, launch))
            .collect()
    }
}
