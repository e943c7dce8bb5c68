use crate::api::{handlers, AppState};
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

/// Build the main API router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics))
        // Indexing and analysis
        .route("/_index", post(handlers::index_launches))
        .route("/_analyze", post(handlers::analyze_launches))
        // Index maintenance
        .route("/_index/delete", put(handlers::delete_indices))
        .route("/_index/:index_id", delete(handlers::delete_index))
        .route("/_indices", get(handlers::list_indices))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
}
