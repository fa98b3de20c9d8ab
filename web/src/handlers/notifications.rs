//! Admin notification endpoints.
//!
//! # Endpoints
//!
//! ```text
//! GET /api/v1/admin/ws        upgrade to a notification stream
//! GET /api/v1/admin/ws/info   connection statistics
//! ```
//!
//! # Wire Protocol
//!
//! **Server → Client:** one JSON [`Notification`](bankadmin_core::Notification)
//! per text frame, starting with the welcome:
//! ```json
//! {
//!   "id": "2f6c…",
//!   "type": "system",
//!   "title": "Connected",
//!   "message": "Real-time notifications enabled",
//!   "severity": "info",
//!   "timestamp": "2025-01-01T00:00:00Z"
//! }
//! ```
//!
//! **Client → Server:** the bare text `ping`, answered with the bare text
//! `pong`. Anything else is ignored.

use crate::extractors::{AdminSession, CorrelationId};
use crate::state::AppState;
use crate::transport;
use axum::{
    extract::{ws::WebSocket, State, WebSocketUpgrade},
    response::Response,
    Json,
};
use bankadmin_core::{AdminId, NotificationService, NotificationType};
use serde::Serialize;
use tracing::{info, Instrument};

/// Path of the upgrade endpoint.
pub const WS_PATH: &str = "/api/v1/admin/ws";
/// Path of the info endpoint.
pub const WS_INFO_PATH: &str = "/api/v1/admin/ws/info";

/// Upgrade an authenticated admin request to a notification stream.
///
/// The session is checked before the upgrade is attempted, so unauthenticated
/// callers get a plain `401` and never reach the socket.
#[allow(clippy::unused_async)] // Axum handler signature requires async
pub async fn upgrade(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    AdminSession(admin_id): AdminSession,
    ws: WebSocketUpgrade,
) -> Response {
    info!(
        admin_id = %admin_id,
        correlation_id = %correlation_id.0,
        "WebSocket connection requested"
    );

    let span = tracing::info_span!("ws_upgrade", correlation_id = %correlation_id.0);
    ws.on_upgrade(move |socket| handle_socket(socket, state, admin_id).instrument(span))
}

async fn handle_socket(socket: WebSocket, state: AppState, admin_id: AdminId) {
    let (transport, inbound) = transport::split(socket);
    state.lifecycle.run(admin_id, transport, inbound).await;
}

/// Body of the info endpoint.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ConnectionInfo {
    /// Always `"active"`
    pub status: &'static str,
    /// Live connections across all admins
    pub total_connections: usize,
    /// Absolute URL of the upgrade endpoint
    pub websocket_url: String,
    /// Notification types clients may receive
    pub supported_events: Vec<&'static str>,
}

/// Report connection statistics.
pub async fn info(
    State(state): State<AppState>,
    AdminSession(_admin_id): AdminSession,
) -> Json<ConnectionInfo> {
    Json(ConnectionInfo {
        status: "active",
        total_connections: state.notifications.connection_count().await,
        websocket_url: format!("{}{WS_PATH}", state.public_ws_base),
        supported_events: NotificationType::SUPPORTED.to_vec(),
    })
}
