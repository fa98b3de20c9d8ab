//! Prometheus metrics for the notification channel.
//!
//! This module provides metric collection for:
//! - Connection registration and teardown
//! - Notification fan-out (deliveries, failures, duration)
//!
//! # Example
//!
//! ```rust,no_run
//! use bankadmin_runtime::metrics::MetricsServer;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new();
//! server.start()?;
//!
//! // Later, from the `/metrics` handler:
//! let body = server.render().unwrap_or_default();
//! # Ok(())
//! # }
//! ```

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;
use thiserror::Error;

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus recorder handle.
///
/// Installs the global recorder; rendering is served by the HTTP layer.
#[derive(Default)]
pub struct MetricsServer {
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create an uninstalled metrics server.
    #[must_use]
    pub const fn new() -> Self {
        Self { handle: None }
    }

    /// Register metric descriptions and install the Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed.
    ///
    /// # Note
    ///
    /// If a recorder is already installed (e.g., in tests), this logs a warning
    /// and succeeds without a handle.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!("Metrics recorder installed");
                Ok(())
            }
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            }
        }
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if this instance did not install the recorder.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    describe_gauge!(
        "notifications_connections_active",
        "Admin connections currently registered"
    );
    describe_counter!(
        "notifications_connections_opened_total",
        "Total number of admin connections registered"
    );
    describe_counter!(
        "notifications_connections_closed_total",
        "Total number of admin connections removed"
    );
    describe_counter!(
        "notifications_delivered_total",
        "Total number of notification frames written to connections"
    );
    describe_counter!(
        "notifications_delivery_failures_total",
        "Total number of notification writes that failed"
    );
    describe_histogram!(
        "notifications_broadcast_duration_seconds",
        "Time spent fanning a notification out to its recipients"
    );
}

/// Connection registry metrics recorder.
pub struct ConnectionMetrics;

impl ConnectionMetrics {
    /// Record a registration and the resulting connection count.
    #[allow(clippy::cast_precision_loss)] // Connection counts are far below 2^52
    pub fn record_opened(active: usize) {
        counter!("notifications_connections_opened_total").increment(1);
        gauge!("notifications_connections_active").set(active as f64);
    }

    /// Record a removal and the resulting connection count.
    #[allow(clippy::cast_precision_loss)]
    pub fn record_closed(active: usize) {
        counter!("notifications_connections_closed_total").increment(1);
        gauge!("notifications_connections_active").set(active as f64);
    }

    /// Record a shutdown that removed `closed` connections at once.
    pub fn record_drained(closed: usize) {
        counter!("notifications_connections_closed_total").increment(closed as u64);
        gauge!("notifications_connections_active").set(0.0);
    }
}

/// Fan-out metrics recorder.
pub struct DeliveryMetrics;

impl DeliveryMetrics {
    /// Record the outcome of one fan-out.
    pub fn record_fanout(delivered: usize, failed: usize, duration: Duration) {
        counter!("notifications_delivered_total").increment(delivered as u64);
        counter!("notifications_delivery_failures_total").increment(failed as u64);
        histogram!("notifications_broadcast_duration_seconds").record(duration.as_secs_f64());
    }
}
