use serde::{Deserialize, Serialize};

/// Predicted issue type for one test item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    /// Classified test item
    pub test_item_id: String,

    /// Winning issue type locator
    pub predicted_issue_type: String,

    /// Number of log/candidate pairs that voted for the winner
    pub match_count: usize,

    /// Cumulative similarity score of the winner
    pub score: f64,
}

/// Test item that could not be classified because the backend kept failing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemFailure {
    pub test_item_id: String,
    pub reason: String,
}

/// Outcome of analyzing one or more launches
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    /// One entry per classified test item, in launch order
    pub results: Vec<ClassificationResult>,

    /// Items excluded after persistent backend failures
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<ItemFailure>,

    /// Set when the deadline or shutdown cut the analysis short
    #[serde(default)]
    pub cancelled: bool,
}

impl AnalysisReport {
    /// Fold another report into this one
    pub fn merge(&mut self, other: AnalysisReport) {
        self.results.extend(other.results);
        self.failures.extend(other.failures);
        self.cancelled |= other.cancelled;
    }

    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty() || self.cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_merge() {
        let mut report = AnalysisReport::default();
        report.merge(AnalysisReport {
            results: vec![ClassificationResult {
                test_item_id: "1".to_string(),
                predicted_issue_type: "PB001".to_string(),
                match_count: 2,
                score: 3.5,
            }],
            failures: vec![ItemFailure {
                test_item_id: "2".to_string(),
                reason: "backend down".to_string(),
            }],
            cancelled: false,
        });

        assert_eq!(report.results.len(), 1);
        assert!(report.is_partial());
        assert!(!report.cancelled);
    }

    #[test]
    fn test_report_serialization_is_camel_case() {
        let report = AnalysisReport {
            results: vec![ClassificationResult {
                test_item_id: "1".to_string(),
                predicted_issue_type: "AB001".to_string(),
                match_count: 1,
                score: 1.0,
            }],
            ..Default::default()
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["results"][0]["testItemId"], "1");
        assert_eq!(json["results"][0]["predictedIssueType"], "AB001");
        assert!(json.get("failures").is_none());
    }
}
