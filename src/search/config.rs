//! Search configuration

use crate::models::ERROR_LOG_LEVEL;
use crate::search::error::{SearchError, SearchResult};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Regex substitution applied to log messages before indexing and querying
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationRule {
    /// Regular expression to match
    pub pattern: String,

    /// Replacement text (supports `$1`-style group references)
    #[serde(default)]
    pub replacement: String,
}

impl NormalizationRule {
    pub fn new(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            replacement: replacement.into(),
        }
    }
}

/// Tuning knobs for indexing and similarity queries
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SearchConfig {
    /// Minimum log level eligible for indexing and matching
    #[serde(default = "default_log_level_threshold")]
    pub log_level_threshold: i32,

    /// Boost for candidates from a launch with the same name
    #[validate(range(min = 0.0))]
    #[serde(default = "default_boost")]
    pub boost_launch: f64,

    /// Boost for candidates sharing the test's unique id
    #[validate(range(min = 0.0))]
    #[serde(default = "default_boost")]
    pub boost_unique_id: f64,

    /// Boost for candidates classified by a previous automated analysis
    #[validate(range(min = 0.0))]
    #[serde(default = "default_boost")]
    pub boost_aa: f64,

    /// Terms must appear in at least this many documents to count
    #[validate(range(min = 0.0))]
    #[serde(default = "default_min_doc_freq")]
    pub min_doc_freq: f64,

    /// Terms must appear at least this often in the query message to count
    #[validate(range(min = 0.0))]
    #[serde(default = "default_min_term_freq")]
    pub min_term_freq: f64,

    /// Share of query terms a candidate must contain ("80%" or an absolute count)
    #[validate(length(min = 1))]
    #[serde(default = "default_min_should_match")]
    pub min_should_match: String,

    /// Top-ranked candidates fetched per log
    #[validate(range(min = 1, max = 1000))]
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,

    /// Test items classified concurrently within one launch
    #[validate(range(min = 1))]
    #[serde(default = "default_max_concurrent_items")]
    pub max_concurrent_items: usize,

    /// Extra attempts for a failed similarity query
    #[serde(default = "default_query_retries")]
    pub query_retries: u32,

    /// Message rewrites, applied in order
    #[serde(default = "default_normalization_rules")]
    pub normalization_rules: Vec<NormalizationRule>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            log_level_threshold: default_log_level_threshold(),
            boost_launch: default_boost(),
            boost_unique_id: default_boost(),
            boost_aa: default_boost(),
            min_doc_freq: default_min_doc_freq(),
            min_term_freq: default_min_term_freq(),
            min_should_match: default_min_should_match(),
            max_candidates: default_max_candidates(),
            max_concurrent_items: default_max_concurrent_items(),
            query_retries: default_query_retries(),
            normalization_rules: default_normalization_rules(),
        }
    }
}

impl SearchConfig {
    /// Validate field ranges and the `min_should_match` format
    pub fn check(&self) -> SearchResult<()> {
        self.validate()
            .map_err(|e| SearchError::InvalidConfiguration(e.to_string()))?;

        if !is_valid_min_should_match(&self.min_should_match) {
            return Err(SearchError::InvalidConfiguration(format!(
                "min_should_match must be a percentage or an integer, got '{}'",
                self.min_should_match
            )));
        }

        Ok(())
    }
}

fn is_valid_min_should_match(value: &str) -> bool {
    let value = value.trim();
    let number = value.strip_suffix('%').unwrap_or(value);
    !number.is_empty() && number.parse::<i64>().is_ok()
}

fn default_log_level_threshold() -> i32 {
    ERROR_LOG_LEVEL
}

fn default_boost() -> f64 {
    2.0
}

fn default_min_doc_freq() -> f64 {
    7.0
}

fn default_min_term_freq() -> f64 {
    1.0
}

fn default_min_should_match() -> String {
    "80%".to_string()
}

fn default_max_candidates() -> usize {
    10
}

fn default_max_concurrent_items() -> usize {
    4
}

fn default_query_retries() -> u32 {
    1
}

fn default_normalization_rules() -> Vec<NormalizationRule> {
    vec![NormalizationRule::new(r"\d+$", "")]
}

/// Builder for SearchConfig
pub struct SearchConfigBuilder {
    config: SearchConfig,
}

impl SearchConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SearchConfig::default(),
        }
    }

    pub fn log_level_threshold(mut self, level: i32) -> Self {
        self.config.log_level_threshold = level;
        self
    }

    pub fn boost_launch(mut self, boost: f64) -> Self {
        self.config.boost_launch = boost;
        self
    }

    pub fn boost_unique_id(mut self, boost: f64) -> Self {
        self.config.boost_unique_id = boost;
        self
    }

    pub fn boost_aa(mut self, boost: f64) -> Self {
        self.config.boost_aa = boost;
        self
    }

    pub fn min_doc_freq(mut self, freq: f64) -> Self {
        self.config.min_doc_freq = freq;
        self
    }

    pub fn min_term_freq(mut self, freq: f64) -> Self {
        self.config.min_term_freq = freq;
        self
    }

    pub fn min_should_match(mut self, value: impl Into<String>) -> Self {
        self.config.min_should_match = value.into();
        self
    }

    pub fn max_candidates(mut self, max: usize) -> Self {
        self.config.max_candidates = max;
        self
    }

    pub fn max_concurrent_items(mut self, max: usize) -> Self {
        self.config.max_concurrent_items = max;
        self
    }

    pub fn query_retries(mut self, retries: u32) -> Self {
        self.config.query_retries = retries;
        self
    }

    pub fn normalization_rule(mut self, rule: NormalizationRule) -> Self {
        self.config.normalization_rules.push(rule);
        self
    }

    pub fn normalization_rules(mut self, rules: Vec<NormalizationRule>) -> Self {
        self.config.normalization_rules = rules;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> SearchResult<SearchConfig> {
        self.config.check()?;
        Ok(self.config)
    }
}

impl Default for SearchConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
