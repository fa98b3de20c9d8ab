//! Axum integration for bank admin notifications.
//!
//! This crate is the imperative shell around the notification service:
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │              Axum (this crate)           │  ← auth layer, extractors
//! │  - Upgrade + info endpoints              │  ← JSON errors, tracing
//! │  - ConnectionLifecycle per socket        │  ← keepalive, deadlines
//! ├──────────────────────────────────────────┤
//! │        InMemoryNotificationService       │
//! │  - Registry of live connections          │  ← snapshot, then write
//! │  - Broadcast / send-to-admin fan-out     │  ← per-connection isolation
//! └──────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use bankadmin_web::{router, AdminTokens, AppState, LifecycleConfig};
//!
//! let service = Arc::new(InMemoryNotificationService::default());
//! let state = AppState::new(Arc::clone(&service), LifecycleConfig::default(), "ws://localhost:8080");
//! let tokens = Arc::new(AdminTokens::new([("secret".into(), "alice".into())]));
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, router(state, tokens)).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod lifecycle;
pub mod state;
pub mod transport;

use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

// Re-export key types for convenience
pub use auth::{authenticate, AdminTokens};
pub use error::AppError;
pub use extractors::{AdminSession, AuthenticatedAdmin, CorrelationId, CORRELATION_ID_HEADER};
pub use lifecycle::{ConnectionLifecycle, LifecycleConfig, LifecycleOutcome};
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;

/// Build the notification router.
///
/// Admin routes sit behind the token layer; `/health` and `/metrics` do not.
pub fn router(state: AppState, tokens: Arc<AdminTokens>) -> Router {
    let admin = Router::new()
        .route(handlers::WS_PATH, get(handlers::upgrade))
        .route(handlers::WS_INFO_PATH, get(handlers::info))
        .layer(middleware::from_fn_with_state(tokens, authenticate));

    Router::new()
        .merge(admin)
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
