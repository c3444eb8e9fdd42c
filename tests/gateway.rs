use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::extract::connect_info::MockConnectInfo;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE};
use axum::http::{Request, StatusCode};
use axum::Router;
use nobel::auth::basic_header;
use nobel::{
    BackendServer, ErrorBody, GatewayConfig, GatewayServer, Laureate, LaureateUpdate, NobelClient,
    NobelError, Prize, PrizeUpdate, Prizes, RateLimitConfig,
};
use reqwest::Url;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tower::ServiceExt;

mod common;
use common::{backend_credentials, gateway_credentials, sample_store, ADMIN, READER};

/// starts a backend over the sample prizes on an ephemeral port
async fn spawn_backend(dir: &Path) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = BackendServer::new(sample_store(dir), backend_credentials());
    tokio::spawn(server.serve(listener, std::future::pending()));
    addr
}

fn config(backend: SocketAddr, rate_limit: RateLimitConfig) -> GatewayConfig {
    GatewayConfig {
        backend_url: Url::parse(&format!("http://{}", backend)).unwrap(),
        backend_timeout: Duration::from_secs(2),
        rate_limit,
        ..GatewayConfig::default()
    }
}

fn gateway(backend: SocketAddr) -> GatewayServer {
    GatewayServer::new(&config(backend, RateLimitConfig::default()), gateway_credentials()).unwrap()
}

/// the gateway's routes, as seen from the client at `ip`
fn from_client(server: &GatewayServer, ip: [u8; 4]) -> Router {
    server
        .router()
        .layer(MockConnectInfo(SocketAddr::from((ip, 40000))))
}

fn request(method: &str, uri: &str, auth: Option<(&str, &str)>, body: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((identity, secret)) = auth {
        builder = builder.header(AUTHORIZATION, basic_header(identity, secret));
    }
    let request = match body {
        Some(json) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    };
    request.unwrap()
}

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn sixth_request_in_a_second_is_rate_limited() {
    let temp_dir = TempDir::new().unwrap();
    let server = gateway(spawn_backend(temp_dir.path()).await);
    let app = from_client(&server, [10, 0, 0, 1]);

    for _ in 0..5 {
        let response = app
            .clone()
            .oneshot(request("GET", "/prizes/2023", Some(READER), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(request("GET", "/prizes/2023", Some(READER), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let error: ErrorBody = body_json(response).await;
    assert_eq!(error.code, 429);

    // the limit is checked before the credentials
    let response = app.oneshot(request("GET", "/", None, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    // another client has its own quota
    let other = from_client(&server, [10, 0, 0, 2]);
    let response = other
        .oneshot(request("GET", "/", Some(READER), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(server.limiter().tracked(), 2);
}

#[tokio::test]
async fn limited_clients_recover_after_the_window() {
    let temp_dir = TempDir::new().unwrap();
    let backend = spawn_backend(temp_dir.path()).await;
    let limit = RateLimitConfig::new(2, Duration::from_millis(200));
    let server = GatewayServer::new(&config(backend, limit), gateway_credentials()).unwrap();
    let app = from_client(&server, [10, 0, 0, 3]);

    let statuses = |n: usize| {
        let app = app.clone();
        async move {
            let mut statuses = Vec::new();
            for _ in 0..n {
                let response = app
                    .clone()
                    .oneshot(request("GET", "/", Some(READER), None))
                    .await
                    .unwrap();
                statuses.push(response.status());
            }
            statuses
        }
    };

    assert_eq!(
        statuses(3).await,
        vec![StatusCode::OK, StatusCode::OK, StatusCode::TOO_MANY_REQUESTS]
    );
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(statuses(1).await, vec![StatusCode::OK]);
}

#[tokio::test]
async fn requests_without_valid_credentials_are_401() {
    let temp_dir = TempDir::new().unwrap();
    let server = gateway(spawn_backend(temp_dir.path()).await);
    let app = from_client(&server, [10, 0, 0, 4]);

    let response = app.clone().oneshot(request("GET", "/", None, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()[WWW_AUTHENTICATE], "Basic");

    let response = app
        .clone()
        .oneshot(request("GET", "/", Some(("admin", "wrong")), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // the gateway's own backend account is not a gateway user
    let response = app
        .oneshot(request("GET", "/", Some(("gateway", "gateway-secret")), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn readers_read_and_only_admins_write() {
    let temp_dir = TempDir::new().unwrap();
    let server = gateway(spawn_backend(temp_dir.path()).await);
    let app = from_client(&server, [10, 0, 0, 5]);

    let response = app
        .clone()
        .oneshot(request("GET", "/prizes/2023/physics", Some(READER), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let prizes: Vec<Prize> = body_json(response).await;
    assert_eq!(prizes[0].laureates.len(), 2);

    let response = app
        .clone()
        .oneshot(request("DELETE", "/prizes/2023/physics", Some(READER), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .oneshot(request(
            "POST",
            "/prize",
            Some(ADMIN),
            Some(r#"{"year": 2024, "category": "peace", "laureates": [{"firstname": "Nihon", "surname": "Hidankyo"}]}"#),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: Prize = body_json(response).await;
    assert_eq!(created.laureates[0].id, 11);
}

#[tokio::test]
async fn backend_errors_are_passed_through() {
    let temp_dir = TempDir::new().unwrap();
    let server = gateway(spawn_backend(temp_dir.path()).await);
    let app = from_client(&server, [10, 0, 0, 6]);

    let response = app
        .clone()
        .oneshot(request("GET", "/prizes/1850/peace", Some(READER), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
    let error: ErrorBody = body_json(response).await;
    assert_eq!(error.code, 404);
    assert!(error.error.contains("1850"));

    let response = app
        .oneshot(request(
            "PUT",
            "/prizes/2023/physics",
            Some(ADMIN),
            Some(r#"{"laureates": [{"id": 99}]}"#),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unreachable_backend_is_502() {
    // bind and release a port so nothing listens on it
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let server = gateway(addr);
    let response = from_client(&server, [10, 0, 0, 7])
        .oneshot(request("GET", "/", Some(READER), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let error: ErrorBody = body_json(response).await;
    assert_eq!(error.code, 502);
}

// client -> gateway -> backend, over real sockets
#[tokio::test]
async fn client_round_trip_through_the_gateway() {
    let temp_dir = TempDir::new().unwrap();
    let backend = spawn_backend(temp_dir.path()).await;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let gateway_addr = listener.local_addr().unwrap();
    let limit = RateLimitConfig::new(100, Duration::from_secs(1));
    let server = GatewayServer::new(&config(backend, limit), gateway_credentials()).unwrap();
    tokio::spawn(server.serve(listener, std::future::pending()));

    let url = format!("http://{}", gateway_addr);
    let admin = NobelClient::connect(&url, ADMIN.0, ADMIN.1).unwrap();

    let all: Prizes = admin.all().await.unwrap();
    assert_eq!(all.prizes.len(), 3);

    let prize = Prize::new(
        2024,
        "economic sciences",
        vec![Laureate::new("Daron", "Acemoglu"), Laureate::new("Simon", "Johnson")],
    );
    let created = admin.create(&prize).await.unwrap();
    assert_eq!(created.laureates[1].id, 12);

    // categories with spaces survive the trip through both services
    let found = admin.by_year_and_category(2024, "Economic Sciences").await.unwrap();
    assert_eq!(found, vec![created.clone()]);

    let update = PrizeUpdate {
        overall_motivation: Some(Some("for studies of institutions".to_string())),
        laureates: Some(vec![LaureateUpdate {
            id: Some(11),
            share: Some(Some("3".to_string())),
            ..Default::default()
        }]),
    };
    let updated = admin.update(2024, "economic sciences", &update).await.unwrap();
    assert_eq!(updated.laureates[0].share.as_deref(), Some("3"));
    assert_eq!(updated.laureates[1], created.laureates[1]);

    let reader = NobelClient::connect(&url, READER.0, READER.1).unwrap();
    assert_eq!(reader.by_year(2024).await.unwrap().len(), 1);
    match reader.delete(2024, "economic sciences").await {
        Err(NobelError::Remote { status, .. }) => assert_eq!(status, 403),
        other => panic!("expected a 403, got {:?}", other),
    }

    let deleted = admin.delete(2024, "economic sciences").await.unwrap();
    assert_eq!(deleted.prize, updated);
    match admin.by_year(2024).await {
        Err(NobelError::Remote { status, body }) => {
            assert_eq!(status, 404);
            assert!(body.contains("2024"));
        }
        other => panic!("expected a 404, got {:?}", other),
    }
}
