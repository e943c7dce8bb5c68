//! Analyzer service facade shared by the HTTP API and the task bridge

use crate::config::BackendConfig;
use crate::models::{AnalysisReport, Launch};
use crate::search::bulk::{BulkIndexSummary, BulkIndexer};
use crate::search::classifier::SimilarityClassifier;
use crate::search::client::BackendClient;
use crate::search::config::SearchConfig;
use crate::search::document::DocumentNormalizer;
use crate::search::error::SearchResult;
use crate::search::index::{validate_index_name, DeleteIndexResponse, IndexDescriptor, IndexManager};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Per-index outcome of a bulk index deletion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDeletion {
    pub index: String,

    #[serde(flatten)]
    pub result: DeleteIndexResponse,
}

/// Entry point to indexing and analysis
#[derive(Clone)]
pub struct AnalyzerService {
    indices: IndexManager,
    indexer: BulkIndexer,
    classifier: SimilarityClassifier,
}

impl AnalyzerService {
    /// Build the service; fails if the search configuration is invalid
    pub fn new(backend: &BackendConfig, config: SearchConfig) -> SearchResult<Self> {
        let client = BackendClient::new(backend)?;
        Self::with_client(client, config)
    }

    pub fn with_client(client: BackendClient, config: SearchConfig) -> SearchResult<Self> {
        config.check()?;

        let normalizer = Arc::new(DocumentNormalizer::new(&config)?);
        let indices = IndexManager::new(client);
        let indexer = BulkIndexer::new(indices.clone(), normalizer.clone());
        let classifier = SimilarityClassifier::new(indices.clone(), normalizer, Arc::new(config));

        Ok(Self {
            indices,
            indexer,
            classifier,
        })
    }

    pub fn indices(&self) -> &IndexManager {
        &self.indices
    }

    /// Index every launch into the project index, one bulk request per launch
    pub async fn index_launches(
        &self,
        project: &str,
        launches: &[Launch],
    ) -> SearchResult<BulkIndexSummary> {
        validate_index_name(project)?;

        let mut summary = BulkIndexSummary::default();
        for launch in launches {
            summary.merge(self.indexer.index_logs(project, launch).await?);
        }
        Ok(summary)
    }

    /// Analyze every launch against the project index
    pub async fn analyze_launches(
        &self,
        project: &str,
        launches: &[Launch],
        cancel: &CancellationToken,
    ) -> SearchResult<AnalysisReport> {
        validate_index_name(project)?;

        let mut report = AnalysisReport::default();
        for launch in launches {
            if report.cancelled {
                break;
            }
            report.merge(self.classifier.analyze_logs(project, launch, cancel).await?);
        }
        Ok(report)
    }

    pub async fn delete_index(&self, project: &str) -> SearchResult<DeleteIndexResponse> {
        self.indices.delete_index(project).await
    }

    /// Delete several indices; absent ones are reported through `status`
    pub async fn delete_indices(&self, names: &[String]) -> SearchResult<Vec<IndexDeletion>> {
        for name in names {
            validate_index_name(name)?;
        }

        let mut deletions = Vec::with_capacity(names.len());
        for name in names {
            let result = self.indices.delete_index(name).await?;
            deletions.push(IndexDeletion {
                index: name.clone(),
                result,
            });
        }

        info!(requested = names.len(), "Bulk index deletion finished");
        Ok(deletions)
    }

    pub async fn list_indices(&self) -> SearchResult<Vec<IndexDescriptor>> {
        self.indices.list_indices().await
    }

    pub async fn healthy(&self) -> bool {
        self.indices.healthy().await
    }
}
