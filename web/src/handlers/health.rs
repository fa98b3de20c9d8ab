//! Health and metrics endpoints.
//!
//! Used by load balancers and the monitoring stack.

use crate::error::AppError;
use crate::state::AppState;
use crate::WebResult;
use axum::{extract::State, http::StatusCode};

/// Liveness check.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// Prometheus scrape endpoint.
///
/// # Endpoint
///
/// ```text
/// GET /metrics
/// ```
///
/// # Errors
///
/// `503 SERVICE_UNAVAILABLE` when no recorder was installed by this process.
#[allow(clippy::unused_async)]
pub async fn metrics(State(state): State<AppState>) -> WebResult<String> {
    state
        .metrics
        .render()
        .ok_or_else(|| AppError::unavailable("Metrics recorder not installed"))
}
