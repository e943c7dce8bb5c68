//! Log indexing and similarity-based failure classification
//!
//! This module drives an Elasticsearch-compatible backend over its REST API:
//!
//! - **Document normalization**: flattens launch / test item / log records into
//!   search documents and strips volatile message content
//! - **Index lifecycle**: per-project index creation, probing, deletion
//! - **Bulk indexing**: one `_bulk` request per launch with per-item results
//! - **Similarity classification**: weighted `more_like_this` queries and
//!   score-weighted voting over the returned candidates
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │              AnalyzerService                     │
//! │  index_launches() analyze_launches() delete_*() │
//! └─────────────────────────────────────────────────┘
//!          │                        │
//!          ▼                        ▼
//! ┌──────────────────┐    ┌──────────────────────┐
//! │   BulkIndexer    │    │ SimilarityClassifier │
//! └──────────────────┘    └──────────────────────┘
//!          │   DocumentNormalizer   │
//!          ▼                        ▼
//! ┌─────────────────────────────────────────────────┐
//! │      IndexManager  ──►  BackendClient (REST)    │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use log_analyzer::config::BackendConfig;
//! use log_analyzer::models::Launch;
//! use log_analyzer::search::{AnalyzerService, SearchConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = AnalyzerService::new(&BackendConfig::default(), SearchConfig::default())?;
//!     let launches: Vec<Launch> = serde_json::from_str("[]")?;
//!
//!     let report = service
//!         .analyze_launches("project-1", &launches, &CancellationToken::new())
//!         .await?;
//!     println!("Classified {} test items", report.results.len());
//!
//!     Ok(())
//! }
//! ```

mod bulk;
mod classifier;
mod client;
mod config;
mod document;
mod error;
mod index;
mod query;
mod service;

pub use bulk::{build_bulk_body, BulkIndexSummary, BulkIndexer, FailedDocument};
pub use classifier::SimilarityClassifier;
pub use client::{BackendClient, BackendRequest, BackendResponse};
pub use config::{NormalizationRule, SearchConfig, SearchConfigBuilder};
pub use document::{DocumentNormalizer, LogDocument, MessageNormalizer};
pub use error::{SearchError, SearchResult};
pub use index::{
    validate_index_name, CreateIndexResponse, DeleteIndexResponse, IndexDescriptor, IndexManager,
};
pub use query::{parse_candidates, Candidate, SimilarityQuery};
pub use service::{AnalyzerService, IndexDeletion};
