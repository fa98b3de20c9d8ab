//! Bank admin notification server.
//!
//! Serves the admin WebSocket notification endpoint, its info endpoint,
//! health and Prometheus metrics.

mod config;

use anyhow::Context;
use bankadmin_runtime::{metrics::MetricsServer, InMemoryNotificationService};
use bankadmin_web::{router, AppState};
use config::Config;
use std::future::IntoFuture;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the process environment still applies.
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bankadmin=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting bank admin notification server");

    let config = Config::from_env();
    info!(
        address = %config.server.bind_address(),
        public_ws_base = %config.server.public_ws_base,
        ping_interval = config.notifications.ping_interval,
        pong_wait = config.notifications.pong_wait,
        admin_tokens = config.auth.admin_tokens.len(),
        metrics = config.metrics.enabled,
        "Configuration loaded"
    );

    let mut metrics = MetricsServer::new();
    if config.metrics.enabled {
        metrics.start().context("Failed to start metrics")?;
    }

    let tokens = Arc::new(config.auth.tokens());
    if tokens.is_empty() {
        warn!("No ADMIN_TOKENS configured, every admin request will be rejected");
    }

    let service = Arc::new(InMemoryNotificationService::default());
    let state = AppState::new(
        Arc::clone(&service),
        config.notifications.lifecycle(),
        &config.server.public_ws_base,
    )
    .with_metrics(Arc::new(metrics));

    let app = router(state, tokens);

    let listener = tokio::net::TcpListener::bind(config.server.bind_address())
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_address()))?;
    info!(address = %listener.local_addr()?, "Server listening");

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown(Arc::clone(&service)))
        .into_future();
    let shutdown_timeout = config.server.shutdown_timeout();

    tokio::select! {
        result = server => result.context("Server error")?,
        () = async {
            service.shutdown_token().cancelled().await;
            tokio::time::sleep(shutdown_timeout).await;
        } => {
            warn!(timeout_secs = shutdown_timeout.as_secs(), "Graceful shutdown timed out");
        }
    }

    info!("Server stopped");
    Ok(())
}

/// Wait for a termination signal, then close every admin connection.
async fn shutdown(service: Arc<InMemoryNotificationService>) {
    shutdown_signal().await;
    let closed = service.shutdown().await;
    info!(connections = closed, "Admin connections closed");
}

/// Graceful shutdown signal handler.
///
/// Waits for:
/// - Ctrl+C (SIGINT)
/// - SIGTERM (in production environments)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
