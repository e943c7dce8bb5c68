//! Similarity query construction and hit decoding
//!
//! Each eligible log of a test item is turned into a `more_like_this` query
//! over the `message` field. Candidates are restricted to classified logs of
//! other test items, and ranked higher when they come from a launch with the
//! same name, share the test's unique id, or were classified automatically.

use crate::models::is_to_investigate;
use crate::search::config::SearchConfig;
use crate::search::document::LogDocument;
use crate::search::error::SearchResult;
use serde::Deserialize;
use serde_json::{json, Value};

/// Query for documents similar to one log document
#[derive(Debug, Clone)]
pub struct SimilarityQuery<'a> {
    document: &'a LogDocument,
    config: &'a SearchConfig,
}

impl<'a> SimilarityQuery<'a> {
    pub fn new(document: &'a LogDocument, config: &'a SearchConfig) -> Self {
        Self { document, config }
    }

    /// Render the backend request body
    pub fn to_json(&self) -> Value {
        let config = self.config;
        let document = self.document;

        let mut should = vec![json!({
            "term": { "launch_name": { "value": document.launch_name, "boost": config.boost_launch } }
        })];
        if let Some(unique_id) = &document.unique_id {
            should.push(json!({
                "term": { "unique_id": { "value": unique_id, "boost": config.boost_unique_id } }
            }));
        }
        should.push(json!({
            "term": { "is_auto_analyzed": { "value": true, "boost": config.boost_aa } }
        }));

        json!({
            "size": config.max_candidates,
            "query": {
                "bool": {
                    "filter": [
                        { "range": { "log_level": { "gte": config.log_level_threshold } } },
                        { "exists": { "field": "issue_type" } }
                    ],
                    "must_not": [
                        { "term": { "test_item": document.test_item } },
                        { "prefix": { "issue_type": "TI" } },
                        { "prefix": { "issue_type": "ti" } }
                    ],
                    "must": [{
                        "more_like_this": {
                            "fields": ["message"],
                            "like": document.message,
                            "min_doc_freq": config.min_doc_freq.round() as u64,
                            "min_term_freq": config.min_term_freq.round() as u64,
                            "minimum_should_match": config.min_should_match
                        }
                    }],
                    "should": should
                }
            }
        })
    }
}

/// One ranked similar document
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub id: String,
    pub score: f64,
    pub document: LogDocument,
}

impl Candidate {
    /// Issue type this candidate votes for, if it may vote at all
    pub fn vote(&self, classified_item: &str) -> Option<&str> {
        if self.document.test_item == classified_item {
            return None;
        }

        match self.document.issue_type.as_deref().map(str::trim) {
            Some(issue_type) if !issue_type.is_empty() && !is_to_investigate(issue_type) => {
                Some(issue_type)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponseBody {
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_id")]
    id: String,

    #[serde(rename = "_score", default)]
    score: Option<f64>,

    #[serde(rename = "_source")]
    source: LogDocument,
}

/// Decode ranked candidates from a `_search` response body
pub fn parse_candidates(body: &str) -> SearchResult<Vec<Candidate>> {
    let response: SearchResponseBody = serde_json::from_str(body).map_err(|e| {
        crate::search::error::SearchError::BackendUnavailable(format!(
            "Unexpected search response: {}",
            e
        ))
    })?;

    Ok(response
        .hits
        .hits
        .into_iter()
        .map(|hit| {
            let mut document = hit.source;
            document.id = hit.id.clone();
            Candidate {
                id: hit.id,
                score: hit.score.unwrap_or(0.0),
                document,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(unique_id: Option<&str>) -> LogDocument {
        LogDocument {
            id: "log-1".to_string(),
            issue_type: None,
            launch_name: "nightly".to_string(),
            log_level: 40000,
            message: "Connection refused ".to_string(),
            test_item: "item-1".to_string(),
            unique_id: unique_id.map(str::to_string),
            is_auto_analyzed: false,
        }
    }

    #[test]
    fn test_query_applies_filters_and_boosts() {
        let config = SearchConfig::default();
        let doc = document(Some("auto:123"));
        let query = SimilarityQuery::new(&doc, &config).to_json();

        let bool_query = &query["query"]["bool"];
        let mlt = &bool_query["must"][0]["more_like_this"];
        assert_eq!(mlt["like"], "Connection refused ");
        assert_eq!(mlt["min_doc_freq"], 7);
        assert_eq!(mlt["min_term_freq"], 1);
        assert_eq!(mlt["minimum_should_match"], "80%");

        assert_eq!(bool_query["must_not"][0]["term"]["test_item"], "item-1");

        let should = bool_query["should"].as_array().unwrap();
        assert_eq!(should.len(), 3);
        assert_eq!(should[0]["term"]["launch_name"]["boost"], 2.0);
        assert_eq!(should[1]["term"]["unique_id"]["value"], "auto:123");
        assert_eq!(should[2]["term"]["is_auto_analyzed"]["boost"], 2.0);
        assert_eq!(query["size"], 10);
    }

    #[test]
    fn test_query_without_unique_id_skips_that_boost() {
        let config = SearchConfig::default();
        let doc = document(None);
        let query = SimilarityQuery::new(&doc, &config).to_json();

        let should = query["query"]["bool"]["should"].as_array().unwrap();
        assert_eq!(should.len(), 2);
        assert!(should.iter().all(|clause| clause["term"].get("unique_id").is_none()));
    }

    #[test]
    fn test_parse_candidates() {
        let body = r#"{
            "took": 3,
            "hits": {
                "total": {"value": 2, "relation": "eq"},
                "max_score": 4.2,
                "hits": [
                    {"_index": "p", "_id": "l1", "_score": 4.2, "_source": {
                        "issue_type": "PB001", "launch_name": "nightly", "log_level": 40000,
                        "message": "Connection refused ", "test_item": "item-9"}},
                    {"_index": "p", "_id": "l2", "_score": 1.5, "_source": {
                        "issue_type": "TI001", "launch_name": "nightly", "log_level": 40000,
                        "message": "Connection refused ", "test_item": "item-8",
                        "is_auto_analyzed": true}}
                ]
            }
        }"#;

        let candidates = parse_candidates(body).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].id, "l1");
        assert_eq!(candidates[0].document.id, "l1");
        assert_eq!(candidates[0].vote("item-1"), Some("PB001"));
        assert_eq!(candidates[1].vote("item-1"), None);
        assert_eq!(candidates[0].vote("item-9"), None);
    }
}
