//! Configuration management for the notification server.
//!
//! Loads configuration from environment variables with sensible defaults.

use bankadmin_web::{AdminTokens, LifecycleConfig};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::warn;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Connection keepalive configuration
    pub notifications: NotificationConfig,
    /// Admin token configuration
    pub auth: AuthConfig,
    /// Prometheus configuration
    pub metrics: MetricsConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Base URL clients use to reach the WebSocket endpoint
    pub public_ws_base: String,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout: u64,
}

/// Keepalive settings for admin connections, in seconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Interval between keepalive pings
    pub ping_interval: u64,
    /// Maximum peer silence; must exceed `ping_interval`
    pub pong_wait: u64,
    /// Deadline for every write
    pub write_timeout: u64,
}

/// Authentication configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// `(token, admin_id)` pairs accepted by the token layer
    pub admin_tokens: Vec<(String, String)>,
}

/// Metrics configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Install the Prometheus recorder and serve `/metrics`
    pub enabled: bool,
}

impl Config {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        fn parse_with<T: std::str::FromStr>(
            lookup: &impl Fn(&str) -> Option<String>,
            key: &str,
        ) -> Option<T> {
            lookup(key).and_then(|s| s.trim().parse().ok())
        }

        Self {
            server: ServerConfig {
                host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse_with(&lookup, "PORT").unwrap_or(8080),
                public_ws_base: lookup("PUBLIC_WS_BASE")
                    .unwrap_or_else(|| "ws://localhost:8080".to_string()),
                shutdown_timeout: parse_with(&lookup, "SHUTDOWN_TIMEOUT").unwrap_or(30),
            },
            notifications: NotificationConfig {
                ping_interval: parse_with(&lookup, "WS_PING_INTERVAL_SECS").unwrap_or(30),
                pong_wait: parse_with(&lookup, "WS_PONG_WAIT_SECS").unwrap_or(60),
                write_timeout: parse_with(&lookup, "WS_WRITE_TIMEOUT_SECS").unwrap_or(10),
            }
            .validated(),
            auth: AuthConfig {
                admin_tokens: lookup("ADMIN_TOKENS")
                    .map(|raw| parse_admin_tokens(&raw))
                    .unwrap_or_default(),
            },
            metrics: MetricsConfig {
                enabled: parse_with(&lookup, "METRICS_ENABLED").unwrap_or(true),
            },
        }
    }
}

impl ServerConfig {
    /// `host:port` to bind.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Graceful shutdown deadline.
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout)
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            ping_interval: 30,
            pong_wait: 60,
            write_timeout: 10,
        }
    }
}

impl NotificationConfig {
    /// Fall back to the defaults when the peer deadline would expire before
    /// the next keepalive, or any value is zero.
    #[must_use]
    pub fn validated(self) -> Self {
        let zero = self.ping_interval == 0 || self.pong_wait == 0 || self.write_timeout == 0;
        if zero || self.pong_wait <= self.ping_interval {
            warn!(
                ping_interval = self.ping_interval,
                pong_wait = self.pong_wait,
                write_timeout = self.write_timeout,
                "Invalid WebSocket keepalive settings, using defaults"
            );
            return Self::default();
        }
        self
    }

    /// Settings for the lifecycle manager.
    #[must_use]
    pub const fn lifecycle(&self) -> LifecycleConfig {
        LifecycleConfig {
            ping_interval: Duration::from_secs(self.ping_interval),
            pong_wait: Duration::from_secs(self.pong_wait),
            write_timeout: Duration::from_secs(self.write_timeout),
        }
    }
}

impl AuthConfig {
    /// Token table for the auth layer.
    #[must_use]
    pub fn tokens(&self) -> AdminTokens {
        AdminTokens::new(self.admin_tokens.iter().cloned())
    }
}

/// Parse `token:admin_id,token:admin_id`. Malformed entries are skipped.
fn parse_admin_tokens(raw: &str) -> Vec<(String, String)> {
    raw.split(',')
        .filter_map(|entry| {
            let Some((token, admin)) = entry.split_once(':') else {
                warn!("Skipping ADMIN_TOKENS entry without ':'");
                return None;
            };
            let (token, admin) = (token.trim(), admin.trim());
            if token.is_empty() || admin.is_empty() {
                warn!("Skipping empty ADMIN_TOKENS entry");
                return None;
            }
            Some((token.to_string(), admin.to_string()))
        })
        .collect()
}
