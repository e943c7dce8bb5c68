//! Prometheus metrics for the analyzer.
//!
//! All metrics live in a process-wide registry and are exported in text
//! exposition format by `GET /metrics`.
//!
//! # Example
//! ```no_run
//! use log_analyzer::metrics::BACKEND_REQUESTS_TOTAL;
//!
//! BACKEND_REQUESTS_TOTAL
//!     .with_label_values(&["bulk", "success"])
//!     .inc();
//! ```

use lazy_static::lazy_static;
use prometheus::{Counter, CounterVec, HistogramOpts, HistogramVec, Opts, Registry};

const NAMESPACE: &str = "log_analyzer";

lazy_static! {
    /// Global Prometheus registry for all metrics
    pub static ref PROMETHEUS_REGISTRY: Registry = Registry::new();

    // ============================================================================
    // Backend Metrics
    // ============================================================================

    /// Requests sent to the search backend
    ///
    /// Labels: operation, outcome
    pub static ref BACKEND_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("backend_requests_total", "Total number of search backend requests")
            .namespace(NAMESPACE),
        &["operation", "outcome"]
    ).expect("Failed to create BACKEND_REQUESTS_TOTAL metric");

    /// Backend request duration in seconds
    ///
    /// Labels: operation
    pub static ref BACKEND_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "backend_request_duration_seconds",
            "Search backend request duration in seconds"
        )
        .namespace(NAMESPACE)
        .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["operation"]
    ).expect("Failed to create BACKEND_REQUEST_DURATION_SECONDS metric");

    // ============================================================================
    // Pipeline Metrics
    // ============================================================================

    /// Log documents accepted by bulk writes
    pub static ref DOCUMENTS_INDEXED_TOTAL: Counter = Counter::with_opts(
        Opts::new("documents_indexed_total", "Total number of log documents indexed")
            .namespace(NAMESPACE)
    ).expect("Failed to create DOCUMENTS_INDEXED_TOTAL metric");

    /// Log documents rejected inside otherwise successful bulk writes
    pub static ref BULK_ITEM_FAILURES_TOTAL: Counter = Counter::with_opts(
        Opts::new("bulk_item_failures_total", "Total number of rejected bulk items")
            .namespace(NAMESPACE)
    ).expect("Failed to create BULK_ITEM_FAILURES_TOTAL metric");

    /// Test item classification outcomes
    ///
    /// Labels: outcome (classified, unmatched, failed)
    pub static ref CLASSIFICATIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("classifications_total", "Total number of test item classifications")
            .namespace(NAMESPACE),
        &["outcome"]
    ).expect("Failed to create CLASSIFICATIONS_TOTAL metric");

    /// Queue tasks handled by the task bridge
    ///
    /// Labels: kind, outcome
    pub static ref TASKS_PROCESSED_TOTAL: CounterVec = CounterVec::new(
        Opts::new("tasks_processed_total", "Total number of processed queue tasks")
            .namespace(NAMESPACE),
        &["kind", "outcome"]
    ).expect("Failed to create TASKS_PROCESSED_TOTAL metric");
}

/// Register all metrics with the global registry
pub fn init_metrics() -> Result<(), prometheus::Error> {
    PROMETHEUS_REGISTRY.register(Box::new(BACKEND_REQUESTS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(BACKEND_REQUEST_DURATION_SECONDS.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(DOCUMENTS_INDEXED_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(BULK_ITEM_FAILURES_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(CLASSIFICATIONS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(TASKS_PROCESSED_TOTAL.clone()))?;
    Ok(())
}

/// Gather all metrics in Prometheus text format
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = PROMETHEUS_REGISTRY.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Failed to convert metrics to string: {}", e);
        String::from("# Error converting metrics\n")
    })
}
