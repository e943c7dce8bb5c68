use crate::api::AppState;
use crate::error::Result;
use crate::models::{AnalysisReport, Launch};
use crate::search::{BulkIndexSummary, DeleteIndexResponse, IndexDeletion, IndexDescriptor};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use validator::Validate;

/// Health check endpoint, reflecting search backend reachability
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    if state.service.healthy().await {
        (
            StatusCode::OK,
            Json(HealthResponse {
                status: "UP".to_string(),
            }),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "DOWN".to_string(),
            }),
        )
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Prometheus text exposition
pub async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        crate::metrics::gather_metrics(),
    )
}

#[derive(Debug, Deserialize, Validate)]
pub struct LaunchesRequest {
    #[validate(length(min = 1))]
    pub project: String,
    #[serde(default)]
    pub launches: Vec<Launch>,
}

/// Index the logs of every launch into the project index
pub async fn index_launches(
    State(state): State<AppState>,
    Json(request): Json<LaunchesRequest>,
) -> Result<Json<BulkIndexSummary>> {
    request.validate()?;

    let summary = state
        .service
        .index_launches(&request.project, &request.launches)
        .await?;

    info!(
        project = %request.project,
        launches = request.launches.len(),
        indexed = summary.indexed.len(),
        failed = summary.failed.len(),
        "Indexed launches"
    );
    Ok(Json(summary))
}

/// Classify unclassified test items; partial results are returned once the deadline expires
pub async fn analyze_launches(
    State(state): State<AppState>,
    Json(request): Json<LaunchesRequest>,
) -> Result<Json<AnalysisReport>> {
    request.validate()?;

    let cancel = CancellationToken::new();
    let deadline = {
        let cancel = cancel.clone();
        let timeout = state.request_timeout;
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            cancel.cancel();
        })
    };

    let report = state
        .service
        .analyze_launches(&request.project, &request.launches, &cancel)
        .await;
    deadline.abort();
    let report = report?;

    if report.cancelled {
        warn!(
            project = %request.project,
            classified = report.results.len(),
            "Analysis deadline expired, returning partial results"
        );
    }
    Ok(Json(report))
}

/// Delete one index; a missing index is reported through `status`
pub async fn delete_index(
    State(state): State<AppState>,
    Path(index_id): Path<String>,
) -> Result<Json<DeleteIndexResponse>> {
    let result = state.service.delete_index(&index_id).await?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize, Validate)]
pub struct DeleteIndicesRequest {
    #[validate(length(min = 1))]
    pub ids: Vec<String>,
}

/// Delete several indices
pub async fn delete_indices(
    State(state): State<AppState>,
    Json(request): Json<DeleteIndicesRequest>,
) -> Result<Json<Vec<IndexDeletion>>> {
    request.validate()?;
    let deletions = state.service.delete_indices(&request.ids).await?;
    Ok(Json(deletions))
}

/// List indices known to the backend
pub async fn list_indices(State(state): State<AppState>) -> Result<Json<Vec<IndexDescriptor>>> {
    Ok(Json(state.service.list_indices().await?))
}
