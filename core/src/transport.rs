//! Message-framed transport abstraction.
//!
//! Any full-duplex, message-oriented connection can carry admin
//! notifications. The web crate adapts an Axum `WebSocket`; tests use an
//! in-memory mock.

use async_trait::async_trait;
use thiserror::Error;

/// One discrete transport message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 application message
    Text(String),
    /// Binary application message
    Binary(Vec<u8>),
    /// Keepalive probe
    Ping(Vec<u8>),
    /// Keepalive reply
    Pong(Vec<u8>),
    /// Close handshake
    Close,
}

impl Frame {
    /// Shorthand for a text frame.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }
}

/// Transport-level failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The peer or the local side already closed the connection.
    #[error("Connection closed")]
    Closed,

    /// The write or read deadline expired.
    #[error("Transport deadline exceeded")]
    Timeout,

    /// Any other I/O or protocol error.
    #[error("Transport error: {0}")]
    Io(String),
}

/// Outbound half of a live connection.
///
/// Implementations do not need internal locking: [`Connection`](crate::Connection)
/// serializes every write behind a single mutex.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Write one frame to the peer.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the frame could not be written.
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError>;

    /// Close the connection.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the close handshake could not be written.
    async fn close(&mut self) -> Result<(), TransportError>;
}
