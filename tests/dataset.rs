use std::fs;
use std::net::SocketAddr;

use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use nobel::dataset::ensure_dataset;
use nobel::{JsonPrizeStore, NobelError, PrizeStore};
use serde_json::json;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// serves a tiny copy of the public dataset at `/v1/prize.json`, a failing `/broken`, and a
/// `/maintenance` page that answers 200 with something other than prizes
async fn spawn_dataset_server() -> SocketAddr {
    let app = Router::new()
        .route(
            "/v1/prize.json",
            get(|| async {
                Json(json!({"prizes": [
                    {"year": "2023", "category": "physics", "laureates": [
                        {"id": "1026", "firstname": "Pierre", "surname": "Agostini", "share": "3"}
                    ]},
                    {"year": "2023", "category": "peace", "laureates": [
                        {"id": "1033", "firstname": "Narges", "surname": "Mohammadi", "share": "1"}
                    ]}
                ]}))
            }),
        )
        .route("/broken", get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }))
        .route("/maintenance", get(|| async { Json(json!({"message": "maintenance"})) }));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await });
    addr
}

#[tokio::test]
async fn downloads_the_dataset_when_the_file_is_missing() {
    let addr = spawn_dataset_server().await;
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("datos").join("bd.json");

    let downloaded = ensure_dataset(&path, &format!("http://{}/v1/prize.json", addr))
        .await
        .unwrap();
    assert!(downloaded);

    let store = JsonPrizeStore::open(&path).unwrap();
    assert_eq!(store.by_year(2023).unwrap().len(), 2);
    assert_eq!(store.all().unwrap().max_laureate_id(), 1033);
}

#[tokio::test]
async fn an_existing_file_is_left_alone() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("bd.json");
    fs::write(&path, "{\"prizes\": []}\n").unwrap();

    // nothing listens here, a download attempt would fail
    let downloaded = ensure_dataset(&path, "http://127.0.0.1:9/prize.json").await.unwrap();
    assert!(!downloaded);
    assert_eq!(fs::read_to_string(&path).unwrap(), "{\"prizes\": []}\n");
}

#[tokio::test]
async fn a_failed_download_writes_no_file() {
    let addr = spawn_dataset_server().await;
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("bd.json");

    match ensure_dataset(&path, &format!("http://{}/broken", addr)).await {
        Err(NobelError::Upstream(msg)) => assert!(msg.contains("/broken")),
        other => panic!("expected an upstream error, got {:?}", other),
    }
    assert!(!path.exists());

    // a later attempt retries
    let downloaded = ensure_dataset(&path, &format!("http://{}/v1/prize.json", addr))
        .await
        .unwrap();
    assert!(downloaded);
}

#[tokio::test]
async fn a_body_without_prizes_is_not_saved() {
    let addr = spawn_dataset_server().await;
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("bd.json");

    match ensure_dataset(&path, &format!("http://{}/maintenance", addr)).await {
        Err(NobelError::Upstream(msg)) => assert!(msg.contains("not a prize collection")),
        other => panic!("expected an upstream error, got {:?}", other),
    }
    assert!(!path.exists());

    // the next start downloads again
    let downloaded = ensure_dataset(&path, &format!("http://{}/v1/prize.json", addr))
        .await
        .unwrap();
    assert!(downloaded);
    assert_eq!(JsonPrizeStore::open(&path).unwrap().all().unwrap().prizes.len(), 2);
}
