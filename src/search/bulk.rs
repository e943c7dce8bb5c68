//! Bulk log indexing

use crate::metrics::{BULK_ITEM_FAILURES_TOTAL, DOCUMENTS_INDEXED_TOTAL};
use crate::models::Launch;
use crate::search::client::{BackendErrorBody, BackendRequest};
use crate::search::document::{DocumentNormalizer, LogDocument};
use crate::search::error::SearchResult;
use crate::search::index::IndexManager;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Document the backend refused to index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedDocument {
    pub id: String,
    pub status: u16,
    pub reason: String,
}

/// Outcome of one or more bulk writes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkIndexSummary {
    /// Backend processing time, in milliseconds
    pub took: u64,

    /// Ids written successfully, in submission order
    pub indexed: Vec<String>,

    /// Ids the backend rejected
    pub failed: Vec<FailedDocument>,
}

impl BulkIndexSummary {
    pub fn is_empty(&self) -> bool {
        self.indexed.is_empty() && self.failed.is_empty()
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    pub fn merge(&mut self, other: BulkIndexSummary) {
        self.took += other.took;
        self.indexed.extend(other.indexed);
        self.failed.extend(other.failed);
    }
}

#[derive(Debug, Deserialize)]
struct BulkResponse {
    #[serde(default)]
    took: u64,

    #[serde(default)]
    errors: bool,

    #[serde(default)]
    items: Vec<HashMap<String, BulkItemResult>>,
}

#[derive(Debug, Deserialize)]
struct BulkItemResult {
    #[serde(rename = "_id", default)]
    id: Option<String>,

    #[serde(default)]
    status: u16,

    #[serde(default)]
    error: Option<BackendErrorBody>,
}

/// Build the newline-delimited `_bulk` body: one action line and one source
/// line per document, in the given order.
pub fn build_bulk_body(index: &str, documents: &[LogDocument]) -> SearchResult<String> {
    let mut body = String::new();

    for document in documents {
        let action = json!({ "index": { "_id": document.id, "_index": index } });
        body.push_str(&serde_json::to_string(&action)?);
        body.push('\n');
        body.push_str(&serde_json::to_string(document)?);
        body.push('\n');
    }

    Ok(body)
}

/// Writes normalized launch logs into a project index
#[derive(Clone)]
pub struct BulkIndexer {
    indices: IndexManager,
    normalizer: Arc<DocumentNormalizer>,
}

impl BulkIndexer {
    pub fn new(indices: IndexManager, normalizer: Arc<DocumentNormalizer>) -> Self {
        Self {
            indices,
            normalizer,
        }
    }

    /// Index every eligible log of the launch with a single bulk request.
    ///
    /// Launches without eligible logs return an empty summary without touching
    /// the backend.
    pub async fn index_logs(&self, index: &str, launch: &Launch) -> SearchResult<BulkIndexSummary> {
        let documents = self.normalizer.normalize_launch(launch);
        if documents.is_empty() {
            info!(
                index = %index,
                launch_id = %launch.id,
                "Launch has no eligible logs, nothing to index"
            );
            return Ok(BulkIndexSummary::default());
        }

        self.indices.ensure_index(index).await?;

        let body = build_bulk_body(index, &documents)?;
        let response = self
            .indices
            .client()
            .send(BackendRequest::new("bulk", Method::PUT, "/_bulk").ndjson(body))
            .await?;

        if !response.is_success() {
            return Err(response.unavailable("bulk"));
        }

        let bulk: BulkResponse = response.json()?;
        let summary = summarize(&documents, bulk);

        DOCUMENTS_INDEXED_TOTAL.inc_by(summary.indexed.len() as f64);
        if summary.has_failures() {
            BULK_ITEM_FAILURES_TOTAL.inc_by(summary.failed.len() as f64);
            warn!(
                index = %index,
                launch_id = %launch.id,
                indexed = summary.indexed.len(),
                failed = summary.failed.len(),
                "Bulk write partially failed"
            );
        } else {
            info!(
                index = %index,
                launch_id = %launch.id,
                documents = summary.indexed.len(),
                took_ms = summary.took,
                "Launch logs indexed"
            );
        }

        Ok(summary)
    }
}

/// Pair per-item results with the submitted documents
fn summarize(documents: &[LogDocument], response: BulkResponse) -> BulkIndexSummary {
    let mut summary = BulkIndexSummary {
        took: response.took,
        ..Default::default()
    };

    for (position, item) in response.items.into_iter().enumerate() {
        let Some(result) = item.into_values().next() else {
            continue;
        };

        let id = result
            .id
            .or_else(|| documents.get(position).map(|d| d.id.clone()))
            .unwrap_or_default();

        match result.error {
            Some(error) => summary.failed.push(FailedDocument {
                id,
                status: result.status,
                reason: format!("{}: {}", error.error_type, error.reason),
            }),
            None => summary.indexed.push(id),
        }
    }

    if !response.errors && summary.indexed.is_empty() && summary.failed.is_empty() {
        // Backend acknowledged without item details
        summary.indexed = documents.iter().map(|d| d.id.clone()).collect();
    }

    summary
}
