//! Shared fixtures for integration tests
#![allow(dead_code)]

use log_analyzer::models::{Launch, Log, TestItem};
use log_analyzer::search::{AnalyzerService, BackendClient, SearchConfig};
use serde_json::{json, Value};

/// Analyzer service wired to a mock backend
pub fn service_for(server: &mockito::Server, config: SearchConfig) -> AnalyzerService {
    let client = BackendClient::for_host(server.url()).expect("client");
    AnalyzerService::with_client(client, config).expect("service")
}

pub fn log(id: &str, level: i32, message: &str) -> Log {
    Log {
        id: id.to_string(),
        level,
        message: message.to_string(),
    }
}

pub fn item(id: &str, issue_type: Option<&str>, logs: Vec<Log>) -> TestItem {
    TestItem {
        id: id.to_string(),
        issue_type: issue_type.map(str::to_string),
        unique_id: None,
        is_auto_analyzed: false,
        logs,
    }
}

pub fn launch(name: &str, test_items: Vec<TestItem>) -> Launch {
    Launch {
        id: "1".to_string(),
        name: name.to_string(),
        test_items,
    }
}

/// One `_search` hit: (log id, score, test item, issue type)
pub fn hit(id: &str, score: f64, test_item: &str, issue_type: &str) -> Value {
    json!({
        "_index": "idx",
        "_id": id,
        "_score": score,
        "_source": {
            "issue_type": issue_type,
            "launch_name": "nightly",
            "log_level": 40000,
            "message": "Connection refused ",
            "test_item": test_item,
            "is_auto_analyzed": false
        }
    })
}

pub fn search_body(hits: Vec<Value>) -> String {
    json!({
        "took": 2,
        "timed_out": false,
        "hits": { "total": { "value": hits.len() }, "hits": hits }
    })
    .to_string()
}

/// Serve `router` on an ephemeral local port; returns the base URL
pub async fn spawn_backend(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });
    format!("http://{}", addr)
}

/// Analyzer service wired to a backend at `url`
pub fn service_at(url: &str, config: SearchConfig) -> AnalyzerService {
    let client = BackendClient::for_host(url).expect("client");
    AnalyzerService::with_client(client, config).expect("service")
}
