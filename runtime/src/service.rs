//! In-memory notification service.
//!
//! Single-process implementation of [`NotificationService`] over a
//! [`ConnectionRegistry`].
//!
//! # Fan-out
//!
//! ```text
//! broadcast(n)
//!   ├─ serialize n once                     (systemic failure → Err)
//!   ├─ snapshot registry under read lock    (lock released immediately)
//!   └─ write to every snapshot entry        (concurrently, each bounded by
//!                                            the connection's write deadline;
//!                                            failures logged, never returned)
//! ```
//!
//! A connection whose write fails stays registered. Removal is left to the
//! lifecycle manager that owns it, which notices the dead peer on its next
//! read or keepalive write.

use crate::metrics::{ConnectionMetrics, DeliveryMetrics};
use crate::registry::ConnectionRegistry;
use async_trait::async_trait;
use bankadmin_core::{
    AdminId, CancellationToken, Clock, Connection, Frame, Notification, NotificationError,
    NotificationProducer, NotificationService, SystemClock,
};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Outcome of one fan-out, used for logging and metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOutReport {
    /// Connections the notification was written to
    pub delivered: usize,
    /// Connections whose write failed
    pub failed: usize,
}

/// Registry-backed notification service.
///
/// Construct one per process and share it (`Arc`) between the HTTP layer and
/// every producer.
pub struct InMemoryNotificationService {
    registry: ConnectionRegistry,
    clock: Arc<dyn Clock>,
    shutdown: CancellationToken,
}

impl Default for InMemoryNotificationService {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl InMemoryNotificationService {
    /// Create a service with an empty registry.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            clock,
            shutdown: CancellationToken::new(),
        }
    }

    /// Token cancelled when [`shutdown`](Self::shutdown) begins.
    ///
    /// Lifecycle managers derive their per-connection token from this one.
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Number of admins with at least one connection.
    pub async fn admin_count(&self) -> usize {
        self.registry.admin_count().await
    }

    /// Stop accepting connections and close every live transport.
    ///
    /// Lifecycle managers observe the closed transports (and the cancelled
    /// shutdown token) and run their normal teardown. Returns the number of
    /// connections that were closed.
    pub async fn shutdown(&self) -> usize {
        self.shutdown.cancel();

        let connections = self.registry.drain().await;
        let closed = connections.len();
        info!(connections = closed, "Closing all admin connections");

        join_all(connections.iter().map(|connection| async move {
            if let Err(e) = connection.close().await {
                debug!(connection_id = %connection.id(), error = %e, "Error closing transport during shutdown");
            }
        }))
        .await;

        ConnectionMetrics::record_drained(closed);
        closed
    }

    async fn fan_out(
        &self,
        cancel: &CancellationToken,
        targets: Vec<Arc<Connection>>,
        notification: &Notification,
    ) -> Result<FanOutReport, NotificationError> {
        if cancel.is_cancelled() {
            return Err(NotificationError::Cancelled);
        }

        let payload = notification.to_json()?;
        let started = Instant::now();

        let writes = targets.iter().map(|connection| {
            let payload = payload.clone();
            async move { (connection, connection.send_text(payload).await) }
        });

        let results = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(NotificationError::Cancelled),
            results = join_all(writes) => results,
        };

        let mut report = FanOutReport::default();
        for (connection, result) in results {
            match result {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(
                        admin_id = %connection.admin_id(),
                        connection_id = %connection.id(),
                        notification_id = %notification.id,
                        error = %e,
                        "Failed to deliver notification"
                    );
                }
            }
        }

        DeliveryMetrics::record_fanout(report.delivered, report.failed, started.elapsed());
        Ok(report)
    }
}

#[async_trait]
impl NotificationService for InMemoryNotificationService {
    async fn subscribe(
        &self,
        admin_id: &AdminId,
        connection: Arc<Connection>,
    ) -> Result<(), NotificationError> {
        // Teardown unsubscribes by the connection's own admin.
        if connection.admin_id() != admin_id {
            return Err(NotificationError::AdminMismatch {
                expected: admin_id.clone(),
                actual: connection.admin_id().clone(),
            });
        }

        if self.is_shutting_down() {
            let _ = connection.close().await;
            return Err(NotificationError::ShuttingDown);
        }

        // Hold the write path while registering so the welcome is the first
        // frame this connection sees, even if a broadcast snapshots it first.
        let mut writer = connection.writer().await;
        let total = self
            .registry
            .insert(admin_id.clone(), Arc::clone(&connection))
            .await;

        // shutdown() cancels before it drains; re-check to not leak a
        // connection inserted after the drain.
        if self.is_shutting_down() {
            drop(writer);
            self.registry.remove(admin_id, connection.id()).await;
            let _ = connection.close().await;
            return Err(NotificationError::ShuttingDown);
        }

        ConnectionMetrics::record_opened(total);
        info!(
            admin_id = %admin_id,
            connection_id = %connection.id(),
            total_connections = total,
            "Admin connection registered"
        );

        let welcome = Notification::welcome(self.clock.as_ref()).to_json()?;
        writer
            .send(Frame::Text(welcome))
            .await
            .map_err(NotificationError::Welcome)
    }

    async fn unsubscribe(&self, admin_id: &AdminId, connection: &Connection) {
        match self.registry.remove(admin_id, connection.id()).await {
            Some(total) => {
                ConnectionMetrics::record_closed(total);
                info!(
                    admin_id = %admin_id,
                    connection_id = %connection.id(),
                    total_connections = total,
                    "Admin connection removed"
                );
            }
            None => {
                debug!(
                    admin_id = %admin_id,
                    connection_id = %connection.id(),
                    "Connection already removed"
                );
            }
        }
    }

    async fn broadcast(
        &self,
        cancel: &CancellationToken,
        notification: &Notification,
    ) -> Result<(), NotificationError> {
        let targets = self.registry.snapshot_all().await;
        let report = self.fan_out(cancel, targets, notification).await?;
        debug!(
            notification_id = %notification.id,
            kind = %notification.kind,
            delivered = report.delivered,
            failed = report.failed,
            "Notification broadcast"
        );
        Ok(())
    }

    async fn send_to_admin(
        &self,
        cancel: &CancellationToken,
        admin_id: &AdminId,
        notification: &Notification,
    ) -> Result<(), NotificationError> {
        let targets = self.registry.snapshot_for(admin_id).await;
        if targets.is_empty() {
            debug!(admin_id = %admin_id, notification_id = %notification.id, "No connections for admin");
            return Ok(());
        }

        let report = self.fan_out(cancel, targets, notification).await?;
        debug!(
            admin_id = %admin_id,
            notification_id = %notification.id,
            delivered = report.delivered,
            failed = report.failed,
            "Notification sent to admin"
        );
        Ok(())
    }

    async fn connection_count(&self) -> usize {
        self.registry.len().await
    }
}

impl NotificationProducer for InMemoryNotificationService {
    fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }
}
