//! Notification service contract.
//!
//! [`NotificationService`] is the directory of live admin connections. It is
//! the only shared mutable state of the notification channel; every
//! registration change and every fan-out goes through it.
//!
//! [`NotificationProducer`] layers the convenience constructors used by other
//! back-office subsystems (alerting, user activity, transactions) on top.

use crate::admin::AdminId;
use crate::connection::Connection;
use crate::environment::Clock;
use crate::notification::{Notification, NotificationType, Severity};
use crate::transport::TransportError;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Call-level failures of the notification service.
///
/// Per-connection write failures during a fan-out are deliberately absent:
/// they are logged and contained, never returned.
#[derive(Error, Debug)]
pub enum NotificationError {
    /// The connection was registered but the welcome message could not be written.
    #[error("Welcome message could not be delivered: {0}")]
    Welcome(#[source] TransportError),

    /// The caller's cancellation token fired before delivery completed.
    #[error("Delivery cancelled")]
    Cancelled,

    /// The notification could not be encoded.
    #[error("Failed to serialize notification: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The service is shutting down and accepts no new connections.
    #[error("Notification service is shutting down")]
    ShuttingDown,

    /// The connection was opened for a different admin than the one it is
    /// being registered under.
    #[error("Connection belongs to admin {actual}, not {expected}")]
    AdminMismatch {
        /// Admin the caller registered under
        expected: AdminId,
        /// Admin the connection was opened for
        actual: AdminId,
    },
}

/// Registry and fan-out operations over live admin connections.
///
/// # Example
///
/// ```ignore
/// let connection = Arc::new(Connection::new(admin_id.clone(), transport, write_timeout));
/// service.subscribe(&admin_id, Arc::clone(&connection)).await?;
///
/// service.broadcast(&CancellationToken::new(), &notification).await?;
///
/// service.unsubscribe(&admin_id, &connection).await;
/// ```
#[async_trait]
pub trait NotificationService: Send + Sync {
    /// Register `connection` under `admin_id`, then write the welcome
    /// notification to it.
    ///
    /// The registration is visible to concurrent broadcasts as soon as this
    /// call returns, whether or not the welcome write succeeded.
    ///
    /// # Errors
    ///
    /// - [`NotificationError::Welcome`] if the welcome write failed (the
    ///   connection stays registered; the caller decides whether to abort)
    /// - [`NotificationError::ShuttingDown`] if the service no longer accepts
    ///   connections (the connection is not registered)
    /// - [`NotificationError::AdminMismatch`] if `admin_id` differs from
    ///   [`Connection::admin_id`] (the connection is not registered)
    async fn subscribe(
        &self,
        admin_id: &AdminId,
        connection: Arc<Connection>,
    ) -> Result<(), NotificationError>;

    /// Remove exactly this connection instance. Unknown connections are a no-op.
    async fn unsubscribe(&self, admin_id: &AdminId, connection: &Connection);

    /// Deliver `notification` to every registered connection.
    ///
    /// # Errors
    ///
    /// - [`NotificationError::Cancelled`] if `cancel` fired
    /// - [`NotificationError::Serialization`] if the notification cannot be encoded
    async fn broadcast(
        &self,
        cancel: &CancellationToken,
        notification: &Notification,
    ) -> Result<(), NotificationError>;

    /// Deliver `notification` to every connection of one admin.
    ///
    /// An admin without connections is not an error.
    ///
    /// # Errors
    ///
    /// Same as [`broadcast`](Self::broadcast).
    async fn send_to_admin(
        &self,
        cancel: &CancellationToken,
        admin_id: &AdminId,
        notification: &Notification,
    ) -> Result<(), NotificationError>;

    /// Total number of registered connections across all admins.
    async fn connection_count(&self) -> usize;
}

/// Convenience constructors for producers elsewhere in the back office.
///
/// Each method builds a [`Notification`] stamped with [`clock`](Self::clock)
/// and broadcasts it.
#[async_trait]
pub trait NotificationProducer: NotificationService {
    /// Clock used to stamp produced notifications.
    fn clock(&self) -> &dyn Clock;

    /// Broadcast an operational alert raised by `source`.
    ///
    /// # Errors
    ///
    /// See [`NotificationService::broadcast`].
    async fn broadcast_system_alert(
        &self,
        severity: Severity,
        title: &str,
        message: &str,
        source: &str,
    ) -> Result<(), NotificationError> {
        let notification = Notification::new(self.clock(), NotificationType::Alert, title, message)
            .with_severity(severity)
            .with_field("source", source);
        self.broadcast(&CancellationToken::new(), &notification).await
    }

    /// Broadcast an action performed by a platform user.
    ///
    /// # Errors
    ///
    /// See [`NotificationService::broadcast`].
    async fn broadcast_user_activity(
        &self,
        user_id: &str,
        action: &str,
        details: Value,
    ) -> Result<(), NotificationError> {
        let notification = Notification::new(
            self.clock(),
            NotificationType::UserActivity,
            "User Activity",
            format!("User {user_id} performed {action}"),
        )
        .with_field("user_id", user_id)
        .with_field("action", action)
        .with_field("details", details);
        self.broadcast(&CancellationToken::new(), &notification).await
    }

    /// Broadcast a transaction status change.
    ///
    /// Failed and flagged transactions are raised as warnings.
    ///
    /// # Errors
    ///
    /// See [`NotificationService::broadcast`].
    async fn broadcast_transaction_event(
        &self,
        transaction_id: &str,
        status: &str,
        amount: &str,
    ) -> Result<(), NotificationError> {
        let severity = match status {
            "failed" | "flagged" => Severity::Warning,
            _ => Severity::Info,
        };
        let notification = Notification::new(
            self.clock(),
            NotificationType::Transaction,
            "Transaction Update",
            format!("Transaction {transaction_id} is {status}"),
        )
        .with_severity(severity)
        .with_data(
            json!({
                "transaction_id": transaction_id,
                "status": status,
                "amount": amount,
            })
            .as_object()
            .cloned()
            .unwrap_or_default(),
        );
        self.broadcast(&CancellationToken::new(), &notification).await
    }
}
