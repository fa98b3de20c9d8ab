//! Application state for Axum handlers.

use crate::lifecycle::{ConnectionLifecycle, LifecycleConfig};
use bankadmin_runtime::{metrics::MetricsServer, InMemoryNotificationService};
use std::sync::Arc;

/// Shared state of the notification endpoints.
///
/// Cheap to clone: every field is reference counted or `Copy`.
#[derive(Clone)]
pub struct AppState {
    /// Connection registry and fan-out
    pub notifications: Arc<InMemoryNotificationService>,
    /// Lifecycle manager handed every upgraded socket
    pub lifecycle: ConnectionLifecycle,
    /// Externally visible `ws://` or `wss://` base, without trailing slash
    pub public_ws_base: Arc<str>,
    /// Prometheus recorder, if installed
    pub metrics: Arc<MetricsServer>,
}

impl AppState {
    /// Create state around `notifications`.
    ///
    /// Connections managed through this state end when the service shuts
    /// down.
    #[must_use]
    pub fn new(
        notifications: Arc<InMemoryNotificationService>,
        config: LifecycleConfig,
        public_ws_base: &str,
    ) -> Self {
        let lifecycle = ConnectionLifecycle::new(Arc::clone(&notifications) as _, config)
            .with_shutdown(notifications.shutdown_token());

        Self {
            notifications,
            lifecycle,
            public_ws_base: Arc::from(public_ws_base.trim_end_matches('/')),
            metrics: Arc::new(MetricsServer::new()),
        }
    }

    /// Serve `/metrics` from `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<MetricsServer>) -> Self {
        self.metrics = metrics;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let state = AppState::new(
            Arc::new(InMemoryNotificationService::default()),
            LifecycleConfig::default(),
            "wss://admin.example.com/",
        );
        assert_eq!(&*state.public_ws_base, "wss://admin.example.com");
    }
}
