use serde::{Deserialize, Serialize};

/// Severity reported by the test-reporting platform for ERROR log lines.
pub const ERROR_LOG_LEVEL: i32 = 40000;

/// One test-execution run as delivered by the reporting platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Launch {
    /// Launch identifier
    #[serde(rename = "launchId")]
    pub id: String,

    /// Launch name, shared by repeated runs of the same suite
    #[serde(rename = "launchName")]
    pub name: String,

    /// Executed test items, in reporting order
    #[serde(rename = "testItems", default)]
    pub test_items: Vec<TestItem>,
}

/// One executed test together with its log lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestItem {
    /// Test item identifier
    #[serde(rename = "testItemId")]
    pub id: String,

    /// Issue type locator, absent until somebody (or something) classifies the item
    #[serde(rename = "issueType", default, skip_serializing_if = "Option::is_none")]
    pub issue_type: Option<String>,

    /// Identifier stable across launches for the same test
    #[serde(rename = "uniqueId", default, skip_serializing_if = "Option::is_none")]
    pub unique_id: Option<String>,

    /// Whether the current issue type was set by a previous automated analysis
    #[serde(rename = "isAutoAnalyzed", default)]
    pub is_auto_analyzed: bool,

    /// Log lines emitted while the test ran
    #[serde(default)]
    pub logs: Vec<Log>,
}

impl TestItem {
    /// True when the item carries no confirmed issue type and should be analyzed.
    ///
    /// Items still marked "to investigate" (`TI...` locators) count as unclassified.
    pub fn needs_analysis(&self) -> bool {
        match self.issue_type.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(issue_type) => is_to_investigate(issue_type),
        }
    }
}

/// Returns true for "to investigate" issue type locators.
pub fn is_to_investigate(issue_type: &str) -> bool {
    issue_type
        .get(..2)
        .map(|prefix| prefix.eq_ignore_ascii_case("ti"))
        .unwrap_or(false)
}

/// A single log line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Log {
    /// Log identifier, reused as the search document id
    #[serde(rename = "logId")]
    pub id: String,

    /// Numeric severity (40000 = ERROR)
    #[serde(rename = "logLevel")]
    pub level: i32,

    /// Raw log message
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_deserialization() {
        let json = r#"{
            "launchId": "1234567892",
            "launchName": "Launch with test items with logs",
            "testItems": [
                {
                    "testItemId": "0002",
                    "issueType": "TI001",
                    "logs": [
                        { "logId": "0001", "logLevel": 40000, "message": "Message 1" }
                    ]
                }
            ]
        }"#;

        let launch: Launch = serde_json::from_str(json).unwrap();
        assert_eq!(launch.id, "1234567892");
        assert_eq!(launch.test_items.len(), 1);

        let item = &launch.test_items[0];
        assert_eq!(item.issue_type.as_deref(), Some("TI001"));
        assert!(item.unique_id.is_none());
        assert!(!item.is_auto_analyzed);
        assert_eq!(item.logs[0].level, ERROR_LOG_LEVEL);
    }

    #[test]
    fn test_launch_without_test_items() {
        let json = r#"{"launchId": "1", "launchName": "empty"}"#;
        let launch: Launch = serde_json::from_str(json).unwrap();
        assert!(launch.test_items.is_empty());
    }

    #[test]
    fn test_needs_analysis() {
        let mut item = TestItem {
            id: "1".to_string(),
            issue_type: None,
            unique_id: None,
            is_auto_analyzed: false,
            logs: vec![],
        };
        assert!(item.needs_analysis());

        item.issue_type = Some("ti001".to_string());
        assert!(item.needs_analysis());

        item.issue_type = Some("PB001".to_string());
        assert!(!item.needs_analysis());

        item.issue_type = Some("  ".to_string());
        assert!(item.needs_analysis());
    }
}
