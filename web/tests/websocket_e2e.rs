//! End-to-end WebSocket tests.
//!
//! Serves the real router on an ephemeral port and connects with
//! `tokio-tungstenite`, the way an admin console would.

#![allow(clippy::expect_used)] // Integration tests can use expect for setup
#![allow(clippy::unwrap_used, clippy::panic)] // Integration tests can use unwrap/panic for assertions

use bankadmin_core::{
    AdminId, CancellationToken, Notification, NotificationProducer, NotificationService,
    NotificationType, Severity,
};
use bankadmin_runtime::InMemoryNotificationService;
use bankadmin_testing::{init_tracing, test_clock};
use bankadmin_web::{router, AdminTokens, AppState, LifecycleConfig};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{self, Message},
    MaybeTlsStream, WebSocketStream,
};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);

/// Serve the router and return its address and the service behind it.
async fn serve() -> (SocketAddr, Arc<InMemoryNotificationService>) {
    init_tracing();
    let service = Arc::new(InMemoryNotificationService::new(Arc::new(test_clock())));
    let state = AppState::new(
        Arc::clone(&service),
        LifecycleConfig::default(),
        "ws://localhost:8080",
    );
    let tokens = Arc::new(AdminTokens::new(
        [("tok-alice", "alice"), ("tok-bob", "bob"), ("tok-carol", "carol")]
            .map(|(token, admin)| (token.to_string(), admin.to_string())),
    ));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Local address");

    tokio::spawn(async move {
        axum::serve(listener, router(state, tokens))
            .await
            .expect("Server failed");
    });

    (addr, service)
}

async fn connect(addr: SocketAddr, token: &str) -> Client {
    let (ws, _) = connect_async(format!("ws://{addr}/api/v1/admin/ws?token={token}"))
        .await
        .expect("Failed to connect to WebSocket");
    ws
}

/// Next text frame, skipping keepalive control frames.
async fn next_text(ws: &mut Client) -> String {
    tokio::time::timeout(WAIT, async {
        loop {
            match ws.next().await.expect("stream ended").expect("read failed") {
                Message::Text(text) => return text,
                Message::Ping(_) | Message::Pong(_) => {}
                other => panic!("unexpected frame: {other:?}"),
            }
        }
    })
    .await
    .expect("Timed out waiting for a text frame")
}

async fn next_json(ws: &mut Client) -> Value {
    serde_json::from_str(&next_text(ws).await).expect("notification JSON")
}

async fn wait_for_count(service: &InMemoryNotificationService, expected: usize) {
    tokio::time::timeout(WAIT, async {
        while service.connection_count().await != expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("connection count never settled");
}

#[tokio::test]
async fn test_alert_reaches_every_admin_and_close_is_observed() {
    let (addr, service) = serve().await;

    let mut clients = Vec::new();
    for token in ["tok-alice", "tok-bob", "tok-carol"] {
        let mut ws = connect(addr, token).await;
        let welcome = next_json(&mut ws).await;
        assert_eq!(welcome["type"], "system");
        assert_eq!(welcome["title"], "Connected");
        clients.push(ws);
    }
    wait_for_count(&service, 3).await;

    service
        .broadcast_system_alert(
            Severity::Critical,
            "System Error",
            "Database connection failed",
            "database",
        )
        .await
        .expect("broadcast");

    for ws in &mut clients {
        let alert = next_json(ws).await;
        assert_eq!(alert["type"], "alert");
        assert_eq!(alert["severity"], "critical");
        assert_eq!(alert["data"]["source"], "database");
    }

    let mut closing = clients.pop().expect("three clients");
    closing.close(None).await.expect("close handshake");

    wait_for_count(&service, 2).await;
}

#[tokio::test]
async fn test_ping_text_gets_pong_text() {
    let (addr, _service) = serve().await;
    let mut ws = connect(addr, "tok-alice").await;
    next_json(&mut ws).await;

    ws.send(Message::Text("ping".to_string()))
        .await
        .expect("send ping");

    assert_eq!(next_text(&mut ws).await, "pong");
}

#[tokio::test]
async fn test_send_to_admin_over_socket() {
    let (addr, service) = serve().await;
    let mut alice = connect(addr, "tok-alice").await;
    let mut bob = connect(addr, "tok-bob").await;
    next_json(&mut alice).await;
    next_json(&mut bob).await;

    let notification = Notification::new(
        &test_clock(),
        NotificationType::Transaction,
        "Review",
        "Transaction tx-9 needs review",
    );
    service
        .send_to_admin(
            &CancellationToken::new(),
            &AdminId::new("alice").unwrap(),
            &notification,
        )
        .await
        .unwrap();

    assert_eq!(next_json(&mut alice).await["title"], "Review");
    let nothing = tokio::time::timeout(Duration::from_millis(200), bob.next()).await;
    assert!(nothing.is_err(), "bob should receive nothing");
}

#[tokio::test]
async fn test_upgrade_without_session_is_unauthorized() {
    let (addr, service) = serve().await;

    let err = connect_async(format!("ws://{addr}/api/v1/admin/ws"))
        .await
        .expect_err("upgrade must be rejected");

    match err {
        tungstenite::Error::Http(response) => assert_eq!(response.status(), 401),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(service.connection_count().await, 0);
}
