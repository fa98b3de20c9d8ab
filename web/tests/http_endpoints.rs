//! HTTP tests for the non-upgrade endpoints and pre-upgrade rejections.

#![allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect

use axum::http::StatusCode;
use axum_test::TestServer;
use bankadmin_runtime::InMemoryNotificationService;
use bankadmin_testing::{init_tracing, test_clock};
use bankadmin_web::{router, AdminTokens, AppState, LifecycleConfig};
use serde_json::{json, Value};
use std::sync::Arc;

fn server() -> TestServer {
    init_tracing();
    let service = Arc::new(InMemoryNotificationService::new(Arc::new(test_clock())));
    let state = AppState::new(
        service,
        LifecycleConfig::default(),
        "wss://admin.bank.example/",
    );
    let tokens = Arc::new(AdminTokens::new([
        ("tok-alice".to_string(), "alice".to_string()),
        // Auth layer handing over a principal that is not a valid identity.
        ("tok-broken".to_string(), "\u{7}".to_string()),
    ]));

    TestServer::new(router(state, tokens)).expect("test server")
}

#[tokio::test]
async fn test_health() {
    let response = server().get("/health").await;
    response.assert_status_ok();
    response.assert_text("ok");
}

#[tokio::test]
async fn test_info_reports_connections() {
    let response = server()
        .get("/api/v1/admin/ws/info")
        .add_query_param("token", "tok-alice")
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(
        body,
        json!({
            "status": "active",
            "total_connections": 0,
            "websocket_url": "wss://admin.bank.example/api/v1/admin/ws",
            "supported_events": ["system", "alert", "user_activity", "transaction"],
        })
    );
}

#[tokio::test]
async fn test_info_requires_session() {
    let response = server().get("/api/v1/admin/ws/info").await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_upgrade_without_session_is_rejected_before_upgrade() {
    let response = server().get("/api/v1/admin/ws").await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_upgrade_with_malformed_identity_is_internal_error() {
    let response = server()
        .get("/api/v1/admin/ws")
        .add_query_param("token", "tok-broken")
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["code"], "INTERNAL_SERVER_ERROR");
}

#[tokio::test]
async fn test_metrics_without_recorder_is_unavailable() {
    let response = server().get("/metrics").await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
}
