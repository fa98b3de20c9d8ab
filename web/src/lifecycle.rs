//! Per-connection lifecycle manager.
//!
//! Owns one admin connection from registration to teardown.
//!
//! # States
//!
//! ```text
//! subscribe ──ok──> Active ──read error / close / timeout / write failure──> Closed
//!     │               │
//!     │               ├─ keepalive task: Ping every `ping_interval`
//!     │               └─ read task:      "ping" → "pong", deadline reset on
//!     │                                  every frame, `pong_wait` without one
//!     │                                  ends the connection
//!     └─err─────────────────────────────────────────────────────────────> Closed
//! ```
//!
//! Both tasks share a child of the service shutdown token. Whichever ends
//! first cancels it; the other stops at its next suspension point. Teardown
//! (unsubscribe, then close) runs exactly once on every path, including when
//! the future driving [`ConnectionLifecycle::run`] is dropped.

use bankadmin_core::{
    AdminId, CancellationToken, Connection, Frame, NotificationError, NotificationService,
    Transport, TransportError,
};
use futures::{Stream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn, Instrument};

/// Application-level keepalive request sent by browser clients.
const CLIENT_PING: &str = "ping";
/// Reply to [`CLIENT_PING`].
const SERVER_PONG: &str = "pong";

/// Keepalive and deadline settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleConfig {
    /// Interval between keepalive pings
    pub ping_interval: Duration,
    /// Maximum silence from the peer before the connection is considered dead
    pub pong_wait: Duration,
    /// Deadline for every single write
    pub write_timeout: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(30),
            pong_wait: Duration::from_secs(60),
            write_timeout: Duration::from_secs(10),
        }
    }
}

/// Why a connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleOutcome {
    /// The peer sent a close frame.
    PeerClosed,
    /// The inbound stream failed or ended without a close frame.
    ReadError(TransportError),
    /// Nothing was received within `pong_wait`.
    ReadTimeout,
    /// A keepalive ping or a pong reply could not be written.
    WriteFailed(TransportError),
    /// The service is shutting down.
    Shutdown,
    /// The welcome notification could not be written.
    WelcomeFailed(TransportError),
}

impl LifecycleOutcome {
    /// Whether the connection ended the way connections normally end.
    #[must_use]
    pub const fn is_normal(&self) -> bool {
        matches!(self, Self::PeerClosed | Self::Shutdown)
    }
}

/// Drives admin connections through handshake, keepalive and teardown.
#[derive(Clone)]
pub struct ConnectionLifecycle {
    service: Arc<dyn NotificationService>,
    config: LifecycleConfig,
    shutdown: CancellationToken,
}

impl ConnectionLifecycle {
    /// Create a lifecycle manager registering connections with `service`.
    #[must_use]
    pub fn new(service: Arc<dyn NotificationService>, config: LifecycleConfig) -> Self {
        Self {
            service,
            config,
            shutdown: CancellationToken::new(),
        }
    }

    /// End every managed connection when `token` is cancelled.
    #[must_use]
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Settings this manager runs with.
    #[must_use]
    pub const fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Run one connection to completion.
    ///
    /// Registers the connection, runs keepalive and the read loop until
    /// either ends, then unregisters and closes it.
    pub async fn run<T, R>(&self, admin_id: AdminId, transport: T, inbound: R) -> LifecycleOutcome
    where
        T: Transport + 'static,
        R: Stream<Item = Result<Frame, TransportError>> + Send + Unpin + 'static,
    {
        let connection = Arc::new(Connection::new(
            admin_id.clone(),
            Box::new(transport),
            self.config.write_timeout,
        ));
        let span = tracing::info_span!(
            "admin_connection",
            admin_id = %admin_id,
            connection_id = %connection.id(),
        );

        async move {
            let teardown = Teardown::new(Arc::clone(&self.service), Arc::clone(&connection));

            let outcome = match self.service.subscribe(&admin_id, Arc::clone(&connection)).await {
                Ok(()) => self.supervise(&connection, inbound).await,
                Err(NotificationError::ShuttingDown) => LifecycleOutcome::Shutdown,
                Err(NotificationError::Welcome(e)) => LifecycleOutcome::WelcomeFailed(e),
                Err(e) => LifecycleOutcome::WelcomeFailed(TransportError::Io(e.to_string())),
            };

            teardown.run().await;
            log_outcome(&outcome);
            outcome
        }
        .instrument(span)
        .await
    }

    async fn supervise<R>(&self, connection: &Arc<Connection>, inbound: R) -> LifecycleOutcome
    where
        R: Stream<Item = Result<Frame, TransportError>> + Send + Unpin + 'static,
    {
        let cancel = self.shutdown.child_token();
        // Stops both tasks if this future is dropped mid-flight.
        let _stop_tasks = cancel.clone().drop_guard();

        let mut keepalive_task = tokio::spawn(
            keepalive(
                Arc::clone(connection),
                self.config.ping_interval,
                cancel.clone(),
            )
            .in_current_span(),
        );
        let mut read_task = tokio::spawn(
            read_loop(
                Arc::clone(connection),
                inbound,
                self.config.pong_wait,
                cancel.clone(),
            )
            .in_current_span(),
        );

        let joined = tokio::select! {
            result = &mut keepalive_task => {
                cancel.cancel();
                let _ = read_task.await;
                result
            }
            result = &mut read_task => {
                cancel.cancel();
                let _ = keepalive_task.await;
                result
            }
        };

        joined.unwrap_or_else(|e| {
            error!(error = %e, "Connection task failed");
            LifecycleOutcome::ReadError(TransportError::Io(e.to_string()))
        })
    }
}

/// Send a transport ping every `interval` until cancelled or a write fails.
async fn keepalive(
    connection: Arc<Connection>,
    interval: Duration,
    cancel: CancellationToken,
) -> LifecycleOutcome {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = cancel.cancelled() => return LifecycleOutcome::Shutdown,
            _ = ticker.tick() => {
                if let Err(e) = connection.send(Frame::Ping(Vec::new())).await {
                    return LifecycleOutcome::WriteFailed(e);
                }
                debug!("Keepalive ping sent");
            }
        }
    }
}

/// Consume inbound frames until the peer leaves, goes silent or a reply fails.
async fn read_loop<R>(
    connection: Arc<Connection>,
    mut inbound: R,
    pong_wait: Duration,
    cancel: CancellationToken,
) -> LifecycleOutcome
where
    R: Stream<Item = Result<Frame, TransportError>> + Send + Unpin,
{
    let deadline = tokio::time::sleep(pong_wait);
    tokio::pin!(deadline);

    loop {
        let next = tokio::select! {
            () = cancel.cancelled() => return LifecycleOutcome::Shutdown,
            () = &mut deadline => return LifecycleOutcome::ReadTimeout,
            next = inbound.next() => next,
        };

        let frame = match next {
            Some(Ok(frame)) => frame,
            Some(Err(e)) => return LifecycleOutcome::ReadError(e),
            None => return LifecycleOutcome::ReadError(TransportError::Closed),
        };

        deadline.as_mut().reset(Instant::now() + pong_wait);

        let reply = match frame {
            Frame::Close => return LifecycleOutcome::PeerClosed,
            Frame::Text(text) if text.trim() == CLIENT_PING => Some(Frame::text(SERVER_PONG)),
            Frame::Text(text) => {
                debug!(len = text.len(), "Ignoring client message");
                None
            }
            Frame::Binary(bytes) => {
                debug!(len = bytes.len(), "Ignoring binary message");
                None
            }
            Frame::Ping(payload) => Some(Frame::Pong(payload)),
            Frame::Pong(_) => None,
        };

        if let Some(reply) = reply {
            if let Err(e) = connection.send(reply).await {
                return LifecycleOutcome::WriteFailed(e);
            }
        }
    }
}

fn log_outcome(outcome: &LifecycleOutcome) {
    if outcome.is_normal() {
        info!(?outcome, "Admin connection closed");
        return;
    }
    match outcome {
        LifecycleOutcome::PeerClosed | LifecycleOutcome::Shutdown => {}
        LifecycleOutcome::ReadError(e) => {
            error!(error = %e, "Admin connection closed abnormally");
        }
        LifecycleOutcome::ReadTimeout => {
            warn!("Admin connection timed out");
        }
        LifecycleOutcome::WriteFailed(e) | LifecycleOutcome::WelcomeFailed(e) => {
            warn!(error = %e, ?outcome, "Admin connection write failed");
        }
    }
}

/// Unsubscribe-and-close, run exactly once.
///
/// [`run`](Self::run) consumes the guard. If it is dropped instead (the
/// owning future was cancelled), the same work is spawned onto the runtime.
struct Teardown {
    pending: Option<(Arc<dyn NotificationService>, Arc<Connection>)>,
}

impl Teardown {
    fn new(service: Arc<dyn NotificationService>, connection: Arc<Connection>) -> Self {
        Self {
            pending: Some((service, connection)),
        }
    }

    async fn run(mut self) {
        if let Some((service, connection)) = self.pending.take() {
            release(service, connection).await;
        }
    }
}

impl Drop for Teardown {
    fn drop(&mut self) {
        if let Some((service, connection)) = self.pending.take() {
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(release(service, connection));
            }
        }
    }
}

async fn release(service: Arc<dyn NotificationService>, connection: Arc<Connection>) {
    service.unsubscribe(connection.admin_id(), &connection).await;
    if let Err(e) = connection.close().await {
        debug!(error = %e, "Transport close failed");
    }
}
