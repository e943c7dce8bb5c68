mod common;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use common::{hit, item, launch, log, search_body, service_at, service_for, spawn_backend};
use log_analyzer::search::{SearchConfig, SearchConfigBuilder, SearchError};
use mockito::Matcher;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

fn json_body(body: String) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/json")], body)
}

#[tokio::test]
async fn test_items_with_issue_types_are_not_analyzed() {
    let mut server = mockito::Server::new_async().await;
    let head = server.mock("HEAD", Matcher::Any).expect(0).create_async().await;
    let search = server.mock("POST", Matcher::Any).expect(0).create_async().await;

    let service = service_for(&server, SearchConfig::default());
    let launches = vec![
        launch("Launch without test items", vec![]),
        launch(
            "Launch with classified items",
            vec![item("0001", Some("PB001"), vec![log("0002", 40000, "Failure 1")])],
        ),
        launch(
            "Launch with small logs",
            vec![item("0003", None, vec![log("0004", 10000, "Debug 1")])],
        ),
    ];

    let report = service
        .analyze_launches("idx", &launches, &CancellationToken::new())
        .await
        .unwrap();

    assert!(report.results.is_empty());
    assert!(!report.cancelled);
    head.assert_async().await;
    search.assert_async().await;
}

#[tokio::test]
async fn test_similar_logs_vote_for_issue_type() {
    let mut server = mockito::Server::new_async().await;
    server.mock("HEAD", "/idx").with_status(200).create_async().await;
    let search = server
        .mock("POST", "/idx/_search")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#""size":10"#.to_string()),
            Matcher::Regex(r#"\{"term":\{"test_item":"0001"\}\}"#.to_string()),
        ]))
        .with_status(200)
        .with_body(search_body(vec![
            // the item's own earlier documents never vote
            hit("9001", 10.0, "0001", "PB001"),
            hit("9002", 5.0, "0100", "TI001"),
            hit("9003", 1.0, "0101", "AB001"),
        ]))
        .create_async()
        .await;

    let service = service_for(&server, SearchConfig::default());
    let launches = vec![launch(
        "nightly",
        vec![item("0001", None, vec![log("0002", 40000, "Connection refused 1")])],
    )];

    let report = service
        .analyze_launches("idx", &launches, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.results.len(), 1);
    let result = &report.results[0];
    assert_eq!(result.test_item_id, "0001");
    assert_eq!(result.predicted_issue_type, "AB001");
    assert_eq!(result.match_count, 1);
    assert_eq!(result.score, 1.0);
    search.assert_async().await;
}

#[tokio::test]
async fn test_votes_accumulate_across_logs() {
    let mut server = mockito::Server::new_async().await;
    server.mock("HEAD", "/idx").with_status(200).create_async().await;
    let search = server
        .mock("POST", "/idx/_search")
        .with_status(200)
        .with_body(search_body(vec![
            hit("9001", 1.5, "0100", "SI001"),
            hit("9002", 1.0, "0101", "AB001"),
            hit("9003", 0.5, "0102", "AB001"),
        ]))
        .expect(2)
        .create_async()
        .await;

    let service = service_for(&server, SearchConfig::default());
    let launches = vec![launch(
        "nightly",
        vec![item(
            "0001",
            Some("TI001"),
            vec![
                log("0002", 40000, "Connection refused 1"),
                log("0003", 40000, "Connection refused 2"),
            ],
        )],
    )];

    let report = service
        .analyze_launches("idx", &launches, &CancellationToken::new())
        .await
        .unwrap();

    // SI001 and AB001 tie at 3.0; the type voted for first wins
    let result = &report.results[0];
    assert_eq!(result.predicted_issue_type, "SI001");
    assert_eq!(result.score, 3.0);
    assert_eq!(result.match_count, 2);
    search.assert_async().await;
}

#[tokio::test]
async fn test_item_without_votes_is_left_unclassified() {
    let mut server = mockito::Server::new_async().await;
    server.mock("HEAD", "/idx").with_status(200).create_async().await;
    server
        .mock("POST", "/idx/_search")
        .with_status(200)
        .with_body(search_body(vec![]))
        .create_async()
        .await;

    let service = service_for(&server, SearchConfig::default());
    let launches = vec![launch(
        "nightly",
        vec![item("0001", None, vec![log("0002", 40000, "Unique failure")])],
    )];

    let report = service
        .analyze_launches("idx", &launches, &CancellationToken::new())
        .await
        .unwrap();

    assert!(report.results.is_empty());
    assert!(report.failures.is_empty());
}

#[tokio::test]
async fn test_failing_item_does_not_affect_others() {
    let mut server = mockito::Server::new_async().await;
    server.mock("HEAD", "/idx").with_status(200).create_async().await;
    let broken = server
        .mock("POST", "/idx/_search")
        .match_body(Matcher::Regex("Broken".to_string()))
        .with_status(503)
        .with_body(r#"{"error":{"type":"unavailable_shards_exception","reason":"no shards"},"status":503}"#)
        .expect(2)
        .create_async()
        .await;
    server
        .mock("POST", "/idx/_search")
        .match_body(Matcher::Regex("Healthy".to_string()))
        .with_status(200)
        .with_body(search_body(vec![hit("9001", 2.0, "0100", "PB001")]))
        .create_async()
        .await;

    let service = service_for(&server, SearchConfig::default());
    let launches = vec![launch(
        "nightly",
        vec![
            item("0001", None, vec![log("0002", 40000, "Broken pipe")]),
            item("0003", None, vec![log("0004", 40000, "Healthy timeout")]),
        ],
    )];

    let report = service
        .analyze_launches("idx", &launches, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].test_item_id, "0003");
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].test_item_id, "0001");
    assert!(report.is_partial());
    // one retry after the first failure
    broken.assert_async().await;
}

#[tokio::test]
async fn test_missing_index() {
    let mut server = mockito::Server::new_async().await;
    server.mock("HEAD", "/idx").with_status(404).create_async().await;
    let search = server.mock("POST", Matcher::Any).expect(0).create_async().await;

    let service = service_for(&server, SearchConfig::default());
    let launches = vec![launch(
        "nightly",
        vec![item("0001", None, vec![log("0002", 40000, "Failure")])],
    )];

    let err = service
        .analyze_launches("idx", &launches, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, SearchError::IndexNotFound(name) if name == "idx"));
    search.assert_async().await;
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let mut server = mockito::Server::new_async().await;
    let search = server.mock("POST", Matcher::Any).expect(0).create_async().await;

    let service = service_for(&server, SearchConfig::default());
    let launches = vec![launch(
        "nightly",
        vec![item("0001", None, vec![log("0002", 40000, "Failure")])],
    )];

    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = service
        .analyze_launches("idx", &launches, &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, SearchError::Cancelled));
    search.assert_async().await;
}

/// Queries for "Slow" logs hang far past the cancellation point
async fn stalling_search(body: String) -> impl IntoResponse {
    if body.contains("Slow") {
        tokio::time::sleep(Duration::from_secs(5)).await;
    }
    json_body(search_body(vec![hit("9001", 2.0, "0100", "PB001")]))
}

#[tokio::test]
async fn test_cancel_during_classification_keeps_finished_items() {
    let url = spawn_backend(
        Router::new()
            .route("/idx", get(|| async { StatusCode::OK }))
            .route("/idx/_search", post(stalling_search)),
    )
    .await;

    let config = SearchConfigBuilder::new()
        .max_concurrent_items(2)
        .query_retries(0)
        .build()
        .unwrap();
    let service = service_at(&url, config);
    let launches = vec![launch(
        "nightly",
        vec![
            item("0001", None, vec![log("0011", 40000, "Connection refused 1")]),
            item("0002", None, vec![log("0012", 40000, "Slow backend response 1")]),
        ],
    )];

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(1000)).await;
            cancel.cancel();
        }
    });

    let started = Instant::now();
    let report = service
        .analyze_launches("idx", &launches, &cancel)
        .await
        .unwrap();

    assert!(report.cancelled);
    assert!(started.elapsed() < Duration::from_secs(4));
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].test_item_id, "0001");
    assert_eq!(report.results[0].predicted_issue_type, "PB001");
    assert!(report.failures.is_empty());
}

#[derive(Clone, Default)]
struct InFlight {
    current: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    total: Arc<AtomicUsize>,
}

async fn counting_search(State(load): State<InFlight>) -> impl IntoResponse {
    let now = load.current.fetch_add(1, Ordering::SeqCst) + 1;
    load.peak.fetch_max(now, Ordering::SeqCst);
    load.total.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(100)).await;
    load.current.fetch_sub(1, Ordering::SeqCst);
    json_body(search_body(vec![hit("9001", 1.0, "0100", "AB001")]))
}

#[tokio::test]
async fn test_concurrent_searches_respect_item_limit() {
    let load = InFlight::default();
    let url = spawn_backend(
        Router::new()
            .route("/idx", get(|| async { StatusCode::OK }))
            .route("/idx/_search", post(counting_search))
            .with_state(load.clone()),
    )
    .await;

    let config = SearchConfigBuilder::new()
        .max_concurrent_items(2)
        .build()
        .unwrap();
    let service = service_at(&url, config);

    let ids: Vec<String> = (1..=6).map(|n| format!("000{}", n)).collect();
    let items = ids
        .iter()
        .map(|id| item(id, None, vec![log(&format!("1{}", id), 40000, "Timeout waiting for lock")]))
        .collect();
    let launches = vec![launch("nightly", items)];

    let report = service
        .analyze_launches("idx", &launches, &CancellationToken::new())
        .await
        .unwrap();

    assert!(!report.cancelled);
    assert_eq!(load.total.load(Ordering::SeqCst), 6);
    let peak = load.peak.load(Ordering::SeqCst);
    assert!((1..=2).contains(&peak), "peak in-flight searches was {}", peak);

    let classified: Vec<&str> = report
        .results
        .iter()
        .map(|r| r.test_item_id.as_str())
        .collect();
    assert_eq!(classified, ids.iter().map(String::as_str).collect::<Vec<_>>());
}
