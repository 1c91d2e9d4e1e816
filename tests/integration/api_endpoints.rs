//! Integration tests for API endpoints
//!
//! The full stack is started: fleet monitor, status store and HTTP server
//! on an ephemeral port. Requests go through a real client.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use fleet_monitor::Target;
use fleet_monitor::actors::fleet::FleetHandle;
use fleet_monitor::api::{ApiConfig, ApiState, spawn_api_server};
use fleet_monitor::monitors::probe::TcpProber;
use fleet_monitor::storage::{MemoryStore, StatusStore};
use serde_json::Value;

use crate::helpers::*;

async fn spawn_test_api(
    store: Arc<dyn StatusStore>,
    fleet: FleetHandle,
    enable_cors: bool,
) -> SocketAddr {
    let config = ApiConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        enable_cors,
    };

    spawn_api_server(config, ApiState::new(store, fleet))
        .await
        .unwrap()
}

fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

#[tokio::test]
async fn test_refresh_then_query() {
    let (open, _listener) = open_port().await;
    let closed = closed_port().await;

    let store: Arc<dyn StatusStore> = Arc::new(MemoryStore::new());
    let fleet = spawn_fleet(
        create_test_settings(
            vec![local_target(open), local_target(closed)],
            Duration::from_millis(500),
        ),
        Arc::new(TcpProber::new()),
        store.clone(),
    );
    let addr = spawn_test_api(store, fleet.clone(), true).await;
    let client = client();

    let response = client
        .post(format!("http://{addr}/api/v1/refresh"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let summary: Value = response.json().await.unwrap();
    assert_eq!(summary["targets"], 2);
    assert_eq!(summary["offline"], 1);
    assert_eq!(summary["online"], 1);

    let response = client
        .get(format!("http://{addr}/api/v1/targets"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["count"], 2);
    assert_eq!(body["targets"][0]["host"], "127.0.0.1");
    assert_eq!(body["targets"][0]["port"], open);
    assert_eq!(body["targets"][0]["status"], "online");
    assert_eq!(body["targets"][1]["status"], "offline");

    let response = client
        .get(format!("http://{addr}/api/v1/targets/127.0.0.1/{closed}"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "offline");
    assert_eq!(body["cpuPercent"], 20.0);

    let response = client
        .get(format!("http://{addr}/api/v1/status"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["cpuAverage"], 20.0);
    assert_eq!(body["ramAverage"], 256.0);
    assert!(body["uptimeSeconds"].is_u64());
    assert!(body["lastUpdated"].is_string());

    fleet.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_not_yet_available() {
    // Store the monitor never writes to, so no round is ever visible
    let store: Arc<dyn StatusStore> = Arc::new(MemoryStore::new());
    let fleet = spawn_fleet(
        create_test_settings(vec![Target::localhost(5000)], Duration::from_millis(100)),
        Arc::new(TcpProber::new()),
        Arc::new(MemoryStore::new()),
    );
    let addr = spawn_test_api(store, fleet.clone(), false).await;

    for path in ["/api/v1/targets", "/api/v1/status", "/api/v1/targets/localhost/5000"] {
        let response = client()
            .get(format!("http://{addr}{path}"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE, "{path}");
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"], "status not yet available");
    }

    fleet.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_health_endpoint() {
    let store: Arc<dyn StatusStore> = Arc::new(MemoryStore::new());
    let fleet = spawn_fleet(
        create_test_settings(vec![], Duration::from_millis(100)),
        Arc::new(TcpProber::new()),
        store.clone(),
    );
    let addr = spawn_test_api(store, fleet.clone(), false).await;

    let response = client()
        .get(format!("http://{addr}/api/v1/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["store"]["healthy"], true);

    fleet.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_invalid_port_rejected() {
    let store: Arc<dyn StatusStore> = Arc::new(MemoryStore::new());
    let fleet = spawn_fleet(
        create_test_settings(vec![], Duration::from_millis(100)),
        Arc::new(TcpProber::new()),
        store.clone(),
    );
    let addr = spawn_test_api(store, fleet.clone(), false).await;

    let response = client()
        .get(format!("http://{addr}/api/v1/targets/localhost/notaport"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    fleet.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_cors_header() {
    let store: Arc<dyn StatusStore> = Arc::new(MemoryStore::new());
    let fleet = spawn_fleet(
        create_test_settings(vec![], Duration::from_millis(100)),
        Arc::new(TcpProber::new()),
        store.clone(),
    );
    let with_cors = spawn_test_api(store.clone(), fleet.clone(), true).await;
    let without_cors = spawn_test_api(store, fleet.clone(), false).await;
    let client = client();

    let response = client
        .get(format!("http://{with_cors}/api/v1/health"))
        .header("Origin", "http://dashboard.local")
        .send()
        .await
        .unwrap();
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );

    let response = client
        .get(format!("http://{without_cors}/api/v1/health"))
        .header("Origin", "http://dashboard.local")
        .send()
        .await
        .unwrap();
    assert!(response.headers().get("access-control-allow-origin").is_none());

    fleet.shutdown().await.unwrap();
}
