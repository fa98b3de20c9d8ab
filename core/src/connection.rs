//! A single live admin connection.
//!
//! Two execution contexts write to the same transport: the connection's own
//! lifecycle manager (keepalive pings, `"pong"` replies) and producers fanning
//! out notifications. Every write therefore goes through [`Connection::send`],
//! which holds the per-connection mutex for the duration of one frame and
//! bounds it with the write deadline.

use crate::admin::AdminId;
use crate::transport::{Frame, Transport, TransportError};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Source of process-local connection identifiers.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-local identifier of one connection instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Allocate the next identifier.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw value, for logging.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A registered (or about to be registered) admin connection.
pub struct Connection {
    id: ConnectionId,
    admin_id: AdminId,
    transport: Mutex<Box<dyn Transport>>,
    write_timeout: Duration,
    closed: AtomicBool,
}

impl Connection {
    /// Wrap a transport owned by `admin_id`.
    #[must_use]
    pub fn new(admin_id: AdminId, transport: Box<dyn Transport>, write_timeout: Duration) -> Self {
        Self {
            id: ConnectionId::next(),
            admin_id,
            transport: Mutex::new(transport),
            write_timeout,
            closed: AtomicBool::new(false),
        }
    }

    /// Identifier of this connection instance.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Owning admin.
    #[must_use]
    pub const fn admin_id(&self) -> &AdminId {
        &self.admin_id
    }

    /// Whether [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Acquire exclusive write access.
    ///
    /// Every other writer waits until the returned guard is dropped, which
    /// lets a caller make a frame the first one a freshly registered
    /// connection sees.
    pub async fn writer(&self) -> ConnectionWriter<'_> {
        ConnectionWriter {
            connection: self,
            transport: self.transport.lock().await,
        }
    }

    /// Write one frame, serialized with every other writer of this connection.
    ///
    /// # Errors
    ///
    /// - [`TransportError::Closed`] if the connection was already closed
    /// - [`TransportError::Timeout`] if the write deadline expired
    /// - any error reported by the transport
    pub async fn send(&self, frame: Frame) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        self.writer().await.send(frame).await
    }

    /// Write a text frame.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub async fn send_text(&self, text: impl Into<String>) -> Result<(), TransportError> {
        self.send(Frame::Text(text.into())).await
    }

    /// Close the transport. Only the first call has any effect.
    ///
    /// # Errors
    ///
    /// Returns the transport's close error, or [`TransportError::Timeout`].
    pub async fn close(&self) -> Result<(), TransportError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        debug!(connection_id = %self.id, admin_id = %self.admin_id, "Closing transport");
        let mut transport = self.transport.lock().await;
        tokio::time::timeout(self.write_timeout, transport.close())
            .await
            .map_err(|_| TransportError::Timeout)?
    }
}

/// Exclusive write access to one connection, see [`Connection::writer`].
pub struct ConnectionWriter<'a> {
    connection: &'a Connection,
    transport: MutexGuard<'a, Box<dyn Transport>>,
}

impl ConnectionWriter<'_> {
    /// Write one frame under the connection's write deadline.
    ///
    /// # Errors
    ///
    /// See [`Connection::send`].
    pub async fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        // close() may have won the race for the lock.
        if self.connection.is_closed() {
            return Err(TransportError::Closed);
        }

        tokio::time::timeout(self.connection.write_timeout, self.transport.send(frame))
            .await
            .map_err(|_| TransportError::Timeout)?
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("admin_id", &self.admin_id)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
