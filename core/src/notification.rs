//! Notification value type.
//!
//! A [`Notification`] describes one event to deliver to admin consoles. It is
//! built by a producer, serialized once per fan-out and then discarded; it is
//! never stored.
//!
//! # Wire Format
//!
//! ```json
//! {
//!   "id": "1f0c6d7e-...",
//!   "type": "alert",
//!   "title": "System Error",
//!   "message": "Database connection failed",
//!   "severity": "critical",
//!   "timestamp": "2025-01-01T00:00:00Z",
//!   "data": { "source": "database" }
//! }
//! ```

use crate::environment::Clock;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

/// Unique (advisory) identifier of a notification instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(String);

impl NotificationId {
    /// Generate a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Borrow the identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Routing tag used by admin consoles to pick a renderer.
///
/// Opaque to the delivery core. Unknown tags are preserved as [`Other`](Self::Other).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NotificationType {
    /// Connection and platform lifecycle messages
    System,
    /// Operational alerts
    Alert,
    /// Actions performed by platform users
    UserActivity,
    /// Transaction lifecycle events
    Transaction,
    /// Any other tag
    Other(String),
}

impl NotificationType {
    /// Every tag the platform currently emits.
    pub const SUPPORTED: [&'static str; 4] = ["system", "alert", "user_activity", "transaction"];

    /// Wire representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::System => "system",
            Self::Alert => "alert",
            Self::UserActivity => "user_activity",
            Self::Transaction => "transaction",
            Self::Other(tag) => tag,
        }
    }
}

impl From<String> for NotificationType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "system" => Self::System,
            "alert" => Self::Alert,
            "user_activity" => Self::UserActivity,
            "transaction" => Self::Transaction,
            _ => Self::Other(tag),
        }
    }
}

impl From<NotificationType> for String {
    fn from(kind: NotificationType) -> Self {
        match kind {
            NotificationType::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display severity. Opaque to the delivery core.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Severity {
    /// Informational
    Info,
    /// Needs attention
    Warning,
    /// Needs immediate attention
    Critical,
    /// Any other level
    Other(String),
}

impl Severity {
    /// Wire representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
            Self::Other(level) => level,
        }
    }
}

impl From<String> for Severity {
    fn from(level: String) -> Self {
        match level.as_str() {
            "info" => Self::Info,
            "warning" => Self::Warning,
            "critical" => Self::Critical,
            _ => Self::Other(level),
        }
    }
}

impl From<&str> for Severity {
    fn from(level: &str) -> Self {
        Self::from(level.to_string())
    }
}

impl From<Severity> for String {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Other(level) => level,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One event to deliver over the notification channel.
///
/// Immutable once built; the builder methods consume and return `self`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Identifier generated at creation time
    pub id: NotificationId,
    /// Routing tag
    #[serde(rename = "type")]
    pub kind: NotificationType,
    /// Display title
    pub title: String,
    /// Display body
    pub message: String,
    /// Display severity
    pub severity: Severity,
    /// Creation time, set by the producer
    pub timestamp: DateTime<Utc>,
    /// Open key/value payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
}

impl Notification {
    /// Create an `info` notification stamped with `clock`.
    #[must_use]
    pub fn new(
        clock: &dyn Clock,
        kind: NotificationType,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: NotificationId::generate(),
            kind,
            title: title.into(),
            message: message.into(),
            severity: Severity::Info,
            timestamp: clock.now(),
            data: None,
        }
    }

    /// Greeting sent to a connection right after it is registered.
    #[must_use]
    pub fn welcome(clock: &dyn Clock) -> Self {
        Self::new(
            clock,
            NotificationType::System,
            "Connected",
            "Real-time notifications enabled",
        )
    }

    /// Set the severity.
    #[must_use]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Replace the whole payload.
    #[must_use]
    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = Some(data);
        self
    }

    /// Add a single payload field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    /// Serialize to the JSON text frame sent to consoles.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if the payload cannot be encoded.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
