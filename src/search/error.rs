//! Error types for search backend operations

use crate::error::AppError;

/// Result type for search operations
pub type SearchResult<T> = std::result::Result<T, SearchError>;

/// Errors that can occur while driving the search backend
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// Transport failure or a non-2xx response not classified otherwise
    #[error("Search backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Index creation hit an existing index
    #[error("Index already exists: {0}")]
    IndexAlreadyExists(String),

    /// Index not found
    #[error("Index not found: {0}")]
    IndexNotFound(String),

    /// Caller payload could not be parsed
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Some test items could not be classified
    #[error("Classification failed for {failed} of {total} test items")]
    ClassificationPartialFailure { failed: usize, total: usize },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Deadline expired or shutdown requested
    #[error("Operation cancelled")]
    Cancelled,
}

impl SearchError {
    /// Whether a retry of the same request could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, SearchError::BackendUnavailable(_))
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        SearchError::BackendUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for SearchError {
    fn from(err: serde_json::Error) -> Self {
        SearchError::MalformedPayload(err.to_string())
    }
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::IndexAlreadyExists(name) => {
                AppError::Conflict(format!("Index already exists: {}", name))
            }
            SearchError::IndexNotFound(name) => AppError::NotFound(format!("Index {}", name)),
            SearchError::MalformedPayload(msg) => AppError::Validation(msg),
            SearchError::InvalidConfiguration(msg) => AppError::Configuration(msg),
            SearchError::Cancelled => AppError::Timeout("analysis cancelled".to_string()),
            SearchError::BackendUnavailable(msg) => AppError::Network(msg),
            err @ SearchError::ClassificationPartialFailure { .. } => {
                AppError::Processing(err.to_string())
            }
        }
    }
}
