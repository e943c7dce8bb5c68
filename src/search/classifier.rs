//! Similarity-based issue type classification
//!
//! For every unclassified test item of a launch, each eligible log is matched
//! against the project index. Every returned candidate votes for its own issue
//! type with its similarity score; the issue type with the highest cumulative
//! score wins, ties going to the type that was voted for first.

use crate::metrics::CLASSIFICATIONS_TOTAL;
use crate::models::{AnalysisReport, ClassificationResult, ItemFailure, Launch};
use crate::search::client::BackendRequest;
use crate::search::config::SearchConfig;
use crate::search::document::{DocumentNormalizer, LogDocument};
use crate::search::error::{SearchError, SearchResult};
use crate::search::index::{validate_index_name, IndexManager};
use crate::search::query::{parse_candidates, Candidate, SimilarityQuery};
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use reqwest::{Method, StatusCode};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Accumulated votes for one test item, kept in first-vote order
#[derive(Debug, Default)]
pub(crate) struct VoteTally {
    entries: Vec<Tally>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Tally {
    pub issue_type: String,
    pub score: f64,
    pub matches: usize,
}

impl VoteTally {
    pub fn add(&mut self, issue_type: &str, score: f64) {
        match self.entries.iter_mut().find(|t| t.issue_type == issue_type) {
            Some(tally) => {
                tally.score += score;
                tally.matches += 1;
            }
            None => self.entries.push(Tally {
                issue_type: issue_type.to_string(),
                score,
                matches: 1,
            }),
        }
    }

    pub fn add_candidates(&mut self, item_id: &str, candidates: &[Candidate]) {
        for candidate in candidates {
            if let Some(issue_type) = candidate.vote(item_id) {
                self.add(issue_type, candidate.score);
            }
        }
    }

    /// Highest cumulative score; the earliest entry wins ties
    pub fn winner(&self) -> Option<&Tally> {
        self.entries.iter().fold(None, |best: Option<&Tally>, tally| match best {
            Some(current) if current.score >= tally.score => Some(current),
            _ => Some(tally),
        })
    }
}

struct ItemOutcome {
    position: usize,
    item_id: String,
    outcome: SearchResult<Option<ClassificationResult>>,
}

/// Finished items keyed by launch position
#[derive(Default)]
struct Collected {
    results: Vec<(usize, ClassificationResult)>,
    failures: Vec<(usize, ItemFailure)>,
    cancelled: bool,
}

impl Collected {
    fn record(&mut self, index: &str, item: ItemOutcome) {
        match item.outcome {
            Ok(Some(result)) => {
                CLASSIFICATIONS_TOTAL.with_label_values(&["classified"]).inc();
                self.results.push((item.position, result));
            }
            Ok(None) => {
                CLASSIFICATIONS_TOTAL.with_label_values(&["unmatched"]).inc();
            }
            Err(SearchError::Cancelled) => self.cancelled = true,
            Err(e) => {
                CLASSIFICATIONS_TOTAL.with_label_values(&["failed"]).inc();
                warn!(
                    index = %index,
                    test_item_id = %item.item_id,
                    error = %e,
                    "Test item excluded from analysis"
                );
                self.failures.push((
                    item.position,
                    ItemFailure {
                        test_item_id: item.item_id,
                        reason: e.to_string(),
                    },
                ));
            }
        }
    }

    fn into_report(mut self) -> AnalysisReport {
        self.results.sort_by_key(|(position, _)| *position);
        self.failures.sort_by_key(|(position, _)| *position);

        AnalysisReport {
            results: self.results.into_iter().map(|(_, result)| result).collect(),
            failures: self.failures.into_iter().map(|(_, failure)| failure).collect(),
            cancelled: self.cancelled,
        }
    }
}

/// Predicts issue types of failing test items from similar historical logs
#[derive(Clone)]
pub struct SimilarityClassifier {
    indices: IndexManager,
    normalizer: Arc<DocumentNormalizer>,
    config: Arc<SearchConfig>,
}

impl SimilarityClassifier {
    pub fn new(
        indices: IndexManager,
        normalizer: Arc<DocumentNormalizer>,
        config: Arc<SearchConfig>,
    ) -> Self {
        Self {
            indices,
            normalizer,
            config,
        }
    }

    /// Classify every unclassified test item of the launch that has eligible logs.
    ///
    /// Items are processed concurrently up to `max_concurrent_items`. An item
    /// whose queries keep failing is reported in `failures` without affecting
    /// the others. Cancelling `cancel` stops outstanding work and returns the
    /// items finished so far with `cancelled` set. Results keep launch order.
    pub async fn analyze_logs(
        &self,
        index: &str,
        launch: &Launch,
        cancel: &CancellationToken,
    ) -> SearchResult<AnalysisReport> {
        validate_index_name(index)?;

        let targets: Vec<(String, Vec<LogDocument>)> = launch
            .test_items
            .iter()
            .filter(|item| item.needs_analysis())
            .map(|item| (item.id.clone(), self.normalizer.normalize_item(item, launch)))
            .filter(|(_, documents)| !documents.is_empty())
            .collect();

        if targets.is_empty() {
            debug!(launch_id = %launch.id, "No test items to analyze");
            return Ok(AnalysisReport::default());
        }

        let exists = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SearchError::Cancelled),
            exists = self.indices.index_exists(index) => exists?,
        };
        if !exists {
            return Err(SearchError::IndexNotFound(index.to_string()));
        }

        let total = targets.len();
        let outcomes = stream::iter(targets.into_iter().enumerate())
            .map(|(position, (item_id, documents))| async move {
                let outcome = self.classify_item(index, &item_id, &documents, cancel).await;
                ItemOutcome {
                    position,
                    item_id,
                    outcome,
                }
            })
            .buffer_unordered(self.config.max_concurrent_items.max(1));
        tokio::pin!(outcomes);

        let mut collected = Collected::default();
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    collected.cancelled = true;
                    break;
                }
                next = outcomes.next() => next,
            };

            match next {
                Some(item) => collected.record(index, item),
                None => break,
            }
            if collected.cancelled {
                break;
            }
        }

        if collected.cancelled {
            // items that completed before cancellation was observed are kept
            while let Some(Some(item)) = outcomes.next().now_or_never() {
                collected.record(index, item);
            }
        }

        let report = collected.into_report();

        if !report.failures.is_empty() {
            let partial = SearchError::ClassificationPartialFailure {
                failed: report.failures.len(),
                total,
            };
            warn!(index = %index, launch_id = %launch.id, error = %partial, "Partial analysis");
        }

        info!(
            index = %index,
            launch_id = %launch.id,
            items = total,
            classified = report.results.len(),
            failed = report.failures.len(),
            cancelled = report.cancelled,
            "Launch analyzed"
        );

        Ok(report)
    }

    async fn classify_item(
        &self,
        index: &str,
        item_id: &str,
        documents: &[LogDocument],
        cancel: &CancellationToken,
    ) -> SearchResult<Option<ClassificationResult>> {
        let mut tally = VoteTally::default();

        for document in documents {
            let candidates = self.query_with_retry(index, document, cancel).await?;
            tally.add_candidates(item_id, &candidates);
        }

        Ok(tally.winner().map(|winner| ClassificationResult {
            test_item_id: item_id.to_string(),
            predicted_issue_type: winner.issue_type.clone(),
            match_count: winner.matches,
            score: winner.score,
        }))
    }

    async fn query_with_retry(
        &self,
        index: &str,
        document: &LogDocument,
        cancel: &CancellationToken,
    ) -> SearchResult<Vec<Candidate>> {
        let attempts = self.config.query_retries + 1;
        let mut attempt = 1;

        loop {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(SearchError::Cancelled),
                result = self.find_similar(index, document) => result,
            };

            match result {
                Err(e) if e.is_retryable() && attempt < attempts => {
                    warn!(
                        index = %index,
                        log_id = %document.id,
                        attempt,
                        error = %e,
                        "Similarity query failed, retrying"
                    );
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn find_similar(&self, index: &str, document: &LogDocument) -> SearchResult<Vec<Candidate>> {
        let body = SimilarityQuery::new(document, &self.config).to_json();
        let response = self
            .indices
            .client()
            .send(
                BackendRequest::new("search", Method::POST, format!("/{}/_search", index))
                    .json(body),
            )
            .await?;

        if response.is_success() {
            return parse_candidates(&response.body);
        }

        if response.status == StatusCode::NOT_FOUND {
            return Err(SearchError::IndexNotFound(index.to_string()));
        }

        Err(response.unavailable("search"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highest_cumulative_score_wins() {
        let mut tally = VoteTally::default();
        tally.add("AB001", 3.0);
        tally.add("PB001", 2.0);
        tally.add("PB001", 2.0);

        let winner = tally.winner().unwrap();
        assert_eq!(winner.issue_type, "PB001");
        assert_eq!(winner.score, 4.0);
        assert_eq!(winner.matches, 2);
    }

    #[test]
    fn test_tie_goes_to_first_voted_type() {
        for _ in 0..10 {
            let mut tally = VoteTally::default();
            tally.add("SI001", 1.5);
            tally.add("AB001", 1.0);
            tally.add("AB001", 0.5);

            assert_eq!(tally.winner().unwrap().issue_type, "SI001");
        }
    }

    #[test]
    fn test_empty_tally_has_no_winner() {
        assert!(VoteTally::default().winner().is_none());
    }
}
