//! Task and reply messages carried by the queue

use crate::models::Launch;
use crate::search::{validate_index_name, SearchError, SearchResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of work requested, taken from the last subject token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Index,
    Analyze,
    Delete,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Index => "index",
            TaskKind::Analyze => "analyze",
            TaskKind::Delete => "delete",
        }
    }

    /// Resolve `<prefix>.<kind>` into a task kind
    pub fn from_subject(subject: &str, prefix: &str) -> Option<Self> {
        let kind = subject.strip_prefix(prefix)?.strip_prefix('.')?;
        match kind {
            "index" => Some(TaskKind::Index),
            "analyze" => Some(TaskKind::Analyze),
            "delete" => Some(TaskKind::Delete),
            _ => None,
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct TaskPayload {
    project: String,
    #[serde(default)]
    launches: Vec<Launch>,
}

/// Decoded task
#[derive(Debug, Clone)]
pub enum AnalyzerTask {
    /// Index the logs of every launch
    Index { project: String, launches: Vec<Launch> },

    /// Classify the unclassified test items of every launch
    Analyze { project: String, launches: Vec<Launch> },

    /// Drop the project index
    Delete { project: String },
}

impl AnalyzerTask {
    /// Decode a task body; any malformed input surfaces as `MalformedPayload`
    pub fn decode(kind: TaskKind, body: &[u8]) -> SearchResult<Self> {
        let payload: TaskPayload = serde_json::from_slice(body)?;
        validate_index_name(&payload.project)?;

        let TaskPayload { project, launches } = payload;
        Ok(match kind {
            TaskKind::Index => AnalyzerTask::Index { project, launches },
            TaskKind::Analyze => AnalyzerTask::Analyze { project, launches },
            TaskKind::Delete => AnalyzerTask::Delete { project },
        })
    }

    pub fn kind(&self) -> TaskKind {
        match self {
            AnalyzerTask::Index { .. } => TaskKind::Index,
            AnalyzerTask::Analyze { .. } => TaskKind::Analyze,
            AnalyzerTask::Delete { .. } => TaskKind::Delete,
        }
    }

    pub fn project(&self) -> &str {
        match self {
            AnalyzerTask::Index { project, .. }
            | AnalyzerTask::Analyze { project, .. }
            | AnalyzerTask::Delete { project } => project,
        }
    }
}

/// Outcome of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyStatus {
    Ok,
    Error,
}

/// Reply sent back to the producer once a task settles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskReply {
    pub message_id: String,
    pub timestamp: DateTime<Utc>,
    pub status: ReplyStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<TaskKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskReply {
    fn new(status: ReplyStatus) -> Self {
        Self {
            message_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            status,
            kind: None,
            project: None,
            result: None,
            error: None,
        }
    }

    pub fn ok(task: &AnalyzerTask, result: serde_json::Value) -> Self {
        Self {
            kind: Some(task.kind()),
            project: Some(task.project().to_string()),
            result: Some(result),
            ..Self::new(ReplyStatus::Ok)
        }
    }

    pub fn error(kind: Option<TaskKind>, project: Option<&str>, error: &SearchError) -> Self {
        Self {
            kind,
            project: project.map(str::to_string),
            error: Some(error.to_string()),
            ..Self::new(ReplyStatus::Error)
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }
}
