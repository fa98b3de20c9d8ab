//! Custom Axum extractors.
//!
//! - `AdminSession`: the validated identity attached by the auth layer
//! - `CorrelationId`: extract or generate a request correlation ID
//!
//! # Examples
//!
//! ```ignore
//! async fn handler(
//!     AdminSession(admin_id): AdminSession,
//!     correlation_id: CorrelationId,
//! ) -> Result<Json<Response>, AppError> {
//!     tracing::info!(admin_id = %admin_id, correlation_id = %correlation_id.0, "Processing request");
//!     Ok(Json(response))
//! }
//! ```

use crate::error::AppError;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use bankadmin_core::AdminId;
use uuid::Uuid;

/// Header carrying the caller's correlation ID.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// Raw principal inserted into request extensions by the auth layer.
///
/// The auth layer vouches that the caller is an authenticated admin. Whether
/// the principal is usable as an identity is checked by [`AdminSession`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedAdmin(pub String);

/// Validated admin identity of the current request.
///
/// # Rejections
///
/// - `401 UNAUTHORIZED` if no [`AuthenticatedAdmin`] is attached
/// - `500 INTERNAL_SERVER_ERROR` if the attached principal is malformed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSession(pub AdminId);

#[async_trait]
impl<S> FromRequestParts<S> for AdminSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let AuthenticatedAdmin(principal) = parts
            .extensions
            .get::<AuthenticatedAdmin>()
            .ok_or_else(|| AppError::unauthorized("Admin session required"))?;

        Ok(Self(AdminId::new(principal)?))
    }
}

/// Correlation ID for request tracing.
///
/// Extracts the correlation ID from the `X-Correlation-ID` header,
/// or generates a new UUID v4 if not present.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let correlation_id = parts
            .headers
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        Ok(Self(correlation_id))
    }
}
