//! Token authentication layer.
//!
//! Stands in for the back office's session authentication: a static
//! token → admin table. A request presenting a known token gets an
//! [`AuthenticatedAdmin`] extension; every other request passes through
//! untouched and is rejected later by the [`AdminSession`](crate::AdminSession)
//! extractor.
//!
//! Tokens are read from `Authorization: Bearer <token>` or, because browsers
//! cannot set headers on a WebSocket handshake, from a `token` query parameter.

use crate::extractors::AuthenticatedAdmin;
use axum::{
    extract::{Query, Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Known admin tokens.
#[derive(Debug, Clone, Default)]
pub struct AdminTokens {
    tokens: HashMap<String, String>,
}

impl AdminTokens {
    /// Build from `(token, principal)` pairs.
    #[must_use]
    pub fn new(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            tokens: pairs.into_iter().collect(),
        }
    }

    /// Principal for `token`, if any.
    #[must_use]
    pub fn lookup(&self, token: &str) -> Option<&str> {
        self.tokens.get(token).map(String::as_str)
    }

    /// Number of configured tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether no token is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Middleware attaching [`AuthenticatedAdmin`] for known tokens.
///
/// Install with `axum::middleware::from_fn_with_state(tokens, authenticate)`.
pub async fn authenticate(
    State(tokens): State<Arc<AdminTokens>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = bearer_token(request.headers()).or_else(|| query_token(&request));

    match token.as_deref().and_then(|token| tokens.lookup(token)) {
        Some(principal) => {
            let admin = AuthenticatedAdmin(principal.to_string());
            request.extensions_mut().insert(admin);
        }
        None if token.is_some() => debug!("Unknown admin token"),
        None => {}
    }

    next.run(request).await
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

fn query_token(request: &Request) -> Option<String> {
    Query::<HashMap<String, String>>::try_from_uri(request.uri())
        .ok()
        .and_then(|Query(mut params)| params.remove("token"))
        .filter(|token| !token.is_empty())
}
