pub mod handlers;
pub mod routes;

pub use routes::*;

use crate::search::AnalyzerService;
use std::sync::Arc;
use std::time::Duration;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AnalyzerService>,
    /// Deadline applied to analysis requests
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(service: Arc<AnalyzerService>) -> Self {
        Self {
            service,
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Set the analysis deadline
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
