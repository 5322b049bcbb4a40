//! Wire-contract tests for `HttpGateway` against an in-process mock backend.
//!
//! Each test starts an axum router on an ephemeral port that returns the
//! payload shapes the real backend produces.

use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use powbench_core::{BatchRequest, Error, HashAlgorithm};
use powbench_gateway::{Gateway, HttpGateway, ItemStatus};
use serde_json::{json, Value};

async fn spawn_backend(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn gateway(base: &str) -> HttpGateway {
    HttpGateway::new(base, Duration::from_secs(5)).unwrap()
}

fn batch(seeds: &[&str]) -> BatchRequest {
    BatchRequest::new(
        seeds.iter().map(|s| s.to_string()).collect(),
        2,
        HashAlgorithm::Sha512,
    )
    .unwrap()
}

#[tokio::test]
async fn test_sequential_round_trip() {
    let router = Router::new().route(
        "/api/sync",
        post(|Json(body): Json<Value>| async move {
            assert_eq!(body["difficulty"], 2);
            assert_eq!(body["algorithm"], "sha512");
            let results: Vec<Value> = body["seeds"]
                .as_array()
                .unwrap()
                .iter()
                .enumerate()
                .map(|(i, seed)| {
                    json!({
                        "cycle": i + 1,
                        "seed": seed,
                        "status": "done",
                        "latencyMs": 10.5,
                        "hash": "abcd",
                        "nonce": 100000,
                        "processingTimeMs": 10.5,
                        "wallTimeMs": 10.5,
                        "queueTimeMs": null,
                        "totalTimeMs": 10.5,
                        "enqueuedAtMs": 1000,
                        "startedAtMs": 1000,
                        "completedAtMs": 1011,
                    })
                })
                .collect();
            Json(json!({ "results": results }))
        }),
    );
    let base = spawn_backend(router).await;

    let response = gateway(&base)
        .process_sequential(&batch(&["a", "b"]))
        .await
        .unwrap();
    assert_eq!(response.results.len(), 2);
    assert_eq!(response.results[1].cycle, 2);
    assert_eq!(response.results[1].seed, "b");
    assert_eq!(response.results[0].status, ItemStatus::Done);
    assert_eq!(response.results[0].timing.queue_time_ms, None);
    assert_eq!(response.results[0].timing.completed_at_ms, Some(1011));
}

#[tokio::test]
async fn test_async_submit_and_status() {
    let router = Router::new()
        .route(
            "/api/async",
            post(|| async {
                Json(json!({
                    "acks": [
                        {"cycle": 2, "seed": "b", "requestId": "id-2", "ackTimeMs": 1.25},
                        {"cycle": 1, "seed": "a", "requestId": "id-1", "ackTimeMs": 0.75},
                    ]
                }))
            }),
        )
        .route(
            "/api/async/status",
            post(|Json(body): Json<Value>| async move {
                let ids = body["requestIds"].as_array().unwrap().clone();
                let results: Vec<Value> = ids
                    .iter()
                    .map(|id| json!({"requestId": id, "status": "running", "attempts": 1}))
                    .collect();
                Json(json!({ "results": results }))
            }),
        );
    let base = spawn_backend(router).await;
    let gw = gateway(&base);

    let acks = gw.submit_async(&batch(&["a", "b"])).await.unwrap().acks;
    assert_eq!(acks.len(), 2);
    assert_eq!(acks[0].request_id, "id-2");

    let ids = vec!["id-1".to_string(), "id-2".to_string()];
    let status = gw.poll_status(&ids).await.unwrap();
    assert_eq!(status.results.len(), 2);
    assert_eq!(status.results[0].request_id, "id-1");
    assert_eq!(status.results[0].status, Some(ItemStatus::Running));
}

#[tokio::test]
async fn test_non_success_is_gateway_error() {
    let router = Router::new().route(
        "/api/async",
        post(|| async { (StatusCode::BAD_REQUEST, "Seeds must be a list of strings.") }),
    );
    let base = spawn_backend(router).await;

    let err = gateway(&base).submit_async(&batch(&["a"])).await.unwrap_err();
    match err {
        Error::Gateway(msg) => assert!(msg.contains("Seeds must be a list of strings.")),
        other => panic!("expected gateway error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_payload_is_distinguishable() {
    let router = Router::new()
        .route("/api/sync", post(|| async { "<html>not json</html>" }))
        .route("/api/async", post(|| async { Json(json!({"unexpected": true})) }));
    let base = spawn_backend(router).await;
    let gw = gateway(&base);

    let err = gw.process_sequential(&batch(&["a"])).await.unwrap_err();
    assert!(matches!(err, Error::MalformedResponse(_)));

    // Well-formed JSON without the required field is malformed too, not empty.
    let err = gw.submit_async(&batch(&["a"])).await.unwrap_err();
    assert!(matches!(err, Error::MalformedResponse(_)));
}

#[tokio::test]
async fn test_liveness() {
    let router = Router::new().route(
        "/api/health",
        get(|| async { Json(json!({"status": "ok", "service": "pow-demo", "timestamp": 1})) }),
    );
    let base = spawn_backend(router).await;

    let health = gateway(&base).liveness().await.unwrap();
    assert_eq!(health.status, "ok");
    assert_eq!(health.service.as_deref(), Some("pow-demo"));
}

#[tokio::test]
async fn test_unreachable_backend_is_http_error() {
    // Bind then drop to get a port nothing listens on.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = gateway(&format!("http://{}", addr)).liveness().await.unwrap_err();
    assert!(matches!(err, Error::Http(_)));
}
