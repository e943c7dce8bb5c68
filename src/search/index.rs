//! Per-project index lifecycle management

use crate::search::client::{BackendClient, BackendRequest};
use crate::search::error::{SearchError, SearchResult};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

const INDEX_ALREADY_EXISTS: [&str; 2] = [
    "index_already_exists_exception",
    "resource_already_exists_exception",
];
const INDEX_NOT_FOUND: &str = "index_not_found_exception";
const INDEX_NAME_FORBIDDEN: &[char] = &['\\', '/', '*', '?', '"', '<', '>', '|', ',', '#', ' ', ':'];
const INDEX_NAME_MAX_BYTES: usize = 255;

/// Check a project name against backend index naming rules.
///
/// Names become URL path segments verbatim; `_all`, wildcards and path
/// separators are refused as `MalformedPayload`.
pub fn validate_index_name(name: &str) -> SearchResult<()> {
    let reason = if name.is_empty() {
        Some("must not be empty")
    } else if name.len() > INDEX_NAME_MAX_BYTES {
        Some("must be at most 255 bytes")
    } else if name == "." || name == ".." {
        Some("must not be . or ..")
    } else if name.starts_with(&['_', '-', '+'][..]) {
        Some("must not start with _, - or +")
    } else if name.chars().any(char::is_uppercase) {
        Some("must be lowercase")
    } else if name.contains(INDEX_NAME_FORBIDDEN) || name.chars().any(char::is_control) {
        Some("contains a forbidden character")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(SearchError::MalformedPayload(format!(
            "invalid index name {:?}: {}",
            name, reason
        ))),
        None => Ok(()),
    }
}

/// Backend index metadata as reported by `_cat/indices`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    #[serde(default)]
    pub health: Option<String>,

    #[serde(default)]
    pub status: String,

    /// Index name
    pub index: String,

    #[serde(default)]
    pub uuid: String,

    #[serde(rename = "pri", default, deserialize_with = "lenient_u64")]
    pub primary_shards: Option<u64>,

    #[serde(rename = "rep", default, deserialize_with = "lenient_u64")]
    pub replica_shards: Option<u64>,

    #[serde(rename = "docs.count", default, deserialize_with = "lenient_u64")]
    pub doc_count: Option<u64>,

    #[serde(rename = "docs.deleted", default, deserialize_with = "lenient_u64")]
    pub deleted_doc_count: Option<u64>,

    #[serde(rename = "store.size", default)]
    pub store_size: Option<String>,

    #[serde(rename = "pri.store.size", default)]
    pub primary_store_size: Option<String>,
}

/// `_cat` reports counts as strings, or null for closed indices
fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Number(n)) => Some(n),
        Some(Raw::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}

/// Result of index creation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateIndexResponse {
    #[serde(default)]
    pub acknowledged: bool,

    #[serde(default)]
    pub shards_acknowledged: bool,
}

/// Result of index deletion
///
/// `status` is 0 when the index was deleted and carries the backend status
/// (404) when the index was already absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeleteIndexResponse {
    #[serde(default)]
    pub acknowledged: bool,

    #[serde(default)]
    pub status: u16,
}

impl DeleteIndexResponse {
    pub fn was_absent(&self) -> bool {
        self.status == StatusCode::NOT_FOUND.as_u16()
    }
}

#[derive(Debug, Deserialize)]
struct ClusterHealth {
    status: String,
}

/// Mappings sent on index creation
fn log_index_mappings() -> serde_json::Value {
    json!({
        "mappings": {
            "properties": {
                "issue_type": { "type": "keyword" },
                "launch_name": { "type": "keyword" },
                "log_level": { "type": "integer" },
                "message": { "type": "text" },
                "test_item": { "type": "keyword" },
                "unique_id": { "type": "keyword" },
                "is_auto_analyzed": { "type": "boolean" }
            }
        }
    })
}

/// Creates, checks and deletes project indices
#[derive(Clone)]
pub struct IndexManager {
    client: BackendClient,
}

impl IndexManager {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &BackendClient {
        &self.client
    }

    /// List all indices in backend order
    pub async fn list_indices(&self) -> SearchResult<Vec<IndexDescriptor>> {
        let response = self
            .client
            .send(BackendRequest::new(
                "list_indices",
                Method::GET,
                "/_cat/indices?format=json",
            ))
            .await?;

        if !response.is_success() {
            return Err(response.unavailable("list_indices"));
        }

        response.json()
    }

    /// Create an index; an existing index is reported as `IndexAlreadyExists`
    pub async fn create_index(&self, name: &str) -> SearchResult<CreateIndexResponse> {
        validate_index_name(name)?;

        let response = self
            .client
            .send(
                BackendRequest::new("create_index", Method::PUT, format!("/{}", name))
                    .json(log_index_mappings()),
            )
            .await?;

        if response.is_success() {
            info!(index = %name, "Index created");
            return response.json();
        }

        match response.error_type() {
            Some(kind) if INDEX_ALREADY_EXISTS.contains(&kind.as_str()) => {
                Err(SearchError::IndexAlreadyExists(name.to_string()))
            }
            _ => Err(response.unavailable("create_index")),
        }
    }

    /// Existence check; 404 means absent, not failure
    pub async fn index_exists(&self, name: &str) -> SearchResult<bool> {
        validate_index_name(name)?;

        let response = self
            .client
            .send(BackendRequest::new(
                "index_exists",
                Method::HEAD,
                format!("/{}", name),
            ))
            .await?;

        match response.status {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(response.unavailable("index_exists")),
        }
    }

    /// Delete an index; an absent index yields `status == 404` instead of an error
    pub async fn delete_index(&self, name: &str) -> SearchResult<DeleteIndexResponse> {
        validate_index_name(name)?;

        let response = self
            .client
            .send(BackendRequest::new(
                "delete_index",
                Method::DELETE,
                format!("/{}", name),
            ))
            .await?;

        if response.is_success() {
            let mut result: DeleteIndexResponse = response.json()?;
            result.status = 0;
            info!(index = %name, "Index deleted");
            return Ok(result);
        }

        if response.status == StatusCode::NOT_FOUND
            && response.error_type().map_or(true, |kind| kind == INDEX_NOT_FOUND)
        {
            debug!(index = %name, "Index to delete does not exist");
            return Ok(DeleteIndexResponse {
                acknowledged: false,
                status: response.status.as_u16(),
            });
        }

        Err(response.unavailable("delete_index"))
    }

    /// Delete then create, or leave an existing index alone when `preserve_if_exists`
    pub async fn recreate_index(&self, name: &str, preserve_if_exists: bool) -> SearchResult<()> {
        if preserve_if_exists && self.index_exists(name).await? {
            debug!(index = %name, "Index exists, preserving it");
            return Ok(());
        }

        let deleted = self.delete_index(name).await?;
        if deleted.was_absent() {
            debug!(index = %name, "Nothing to delete before recreate");
        }

        self.create_index(name).await?;
        Ok(())
    }

    /// Create the index unless it already exists
    pub async fn ensure_index(&self, name: &str) -> SearchResult<()> {
        if self.index_exists(name).await? {
            return Ok(());
        }

        match self.create_index(name).await {
            Ok(_) | Err(SearchError::IndexAlreadyExists(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Liveness check bounded by the health timeout; never fails
    pub async fn healthy(&self) -> bool {
        let timeout = self.client.health_timeout();
        let request = BackendRequest::new("cluster_health", Method::GET, "/_cluster/health")
            .timeout(timeout);

        let response = match tokio::time::timeout(timeout, self.client.send(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!(error = %e, "Backend health check failed");
                return false;
            }
            Err(_) => {
                warn!(timeout_ms = timeout.as_millis() as u64, "Backend health check timed out");
                return false;
            }
        };

        if !response.is_success() {
            warn!(status = response.status.as_u16(), "Backend reported unhealthy");
            return false;
        }

        match response.json::<ClusterHealth>() {
            Ok(health) => health.status != "red",
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_index_names() {
        for name in ["idx0", "project-1", "my_project", "p.1", "ünïcode"] {
            assert!(validate_index_name(name).is_ok(), "{} should be accepted", name);
        }
    }

    #[test]
    fn test_invalid_index_names() {
        let long = "a".repeat(256);
        for name in [
            "", "_all", "-idx", "+idx", "Idx", "*", "a/_doc", "a\\b", "a b", "a,b", "a#b", "a?b",
            "a|b", "a\"b", "a<b", "a>b", ".", "..", long.as_str(),
        ] {
            assert!(
                matches!(validate_index_name(name), Err(SearchError::MalformedPayload(_))),
                "{:?} should be rejected",
                name
            );
        }
    }

    #[test]
    fn test_descriptor_parses_cat_strings() {
        let json = r#"{
            "health": "yellow",
            "status": "open",
            "index": "idx0",
            "uuid": "sGD-VQy5StS1jIUbuo3R7A",
            "pri": "1",
            "rep": "1",
            "docs.count": "353400",
            "docs.deleted": "0",
            "store.size": "37.9mb",
            "pri.store.size": "37.9mb"
        }"#;

        let descriptor: IndexDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(descriptor.index, "idx0");
        assert_eq!(descriptor.primary_shards, Some(1));
        assert_eq!(descriptor.doc_count, Some(353400));
        assert_eq!(descriptor.store_size.as_deref(), Some("37.9mb"));
    }

    #[test]
    fn test_descriptor_tolerates_closed_index() {
        let json = r#"{"health": null, "status": "close", "index": "old", "uuid": "x",
            "pri": "1", "rep": "1", "docs.count": null, "docs.deleted": null,
            "store.size": null, "pri.store.size": null}"#;

        let descriptor: IndexDescriptor = serde_json::from_str(json).unwrap();
        assert!(descriptor.health.is_none());
        assert!(descriptor.doc_count.is_none());
        assert_eq!(descriptor.primary_shards, Some(1));
    }

    #[test]
    fn test_mappings_cover_document_fields() {
        let mappings = log_index_mappings();
        let properties = &mappings["mappings"]["properties"];
        for field in [
            "issue_type",
            "launch_name",
            "log_level",
            "message",
            "test_item",
            "unique_id",
            "is_auto_analyzed",
        ] {
            assert!(properties.get(field).is_some(), "missing mapping for {}", field);
        }
    }
}
