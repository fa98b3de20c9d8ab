//! # Bank Admin Testing
//!
//! Test doubles for the admin notification channel.
//!
//! This crate provides:
//! - `FixedClock`: deterministic notification timestamps
//! - `MockTransport` + `TransportProbe`: an in-memory outbound transport that
//!   records frames and can be broken or stalled from the test
//! - `InboundFrames`: a hand-driven inbound frame stream for lifecycle tests
//!
//! ## Example
//!
//! ```ignore
//! use bankadmin_testing::{MockTransport, test_clock};
//!
//! #[tokio::test]
//! async fn test_welcome() {
//!     let service = InMemoryNotificationService::new(Arc::new(test_clock()));
//!     let (transport, mut probe) = MockTransport::new();
//!     let connection = Arc::new(Connection::new(admin, Box::new(transport), timeout));
//!
//!     service.subscribe(&admin, connection).await?;
//!
//!     let welcome = probe.next_notification(Duration::from_millis(100)).await;
//!     assert_eq!(welcome.unwrap().title, "Connected");
//! }
//! ```

use bankadmin_core::{Clock, DateTime, Utc};

/// Mock implementations of injected dependencies and transports.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use async_trait::async_trait;
    use bankadmin_core::{Frame, Notification, Transport, TransportError};
    use futures::channel::mpsc as stream_mpsc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use bankadmin_testing::mocks::FixedClock;
    /// use bankadmin_core::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    #[derive(Default)]
    struct Shared {
        broken: AtomicBool,
        stalled: AtomicBool,
        closed: AtomicBool,
        close_calls: AtomicUsize,
    }

    /// In-memory outbound transport.
    ///
    /// Every frame written is forwarded to the paired [`TransportProbe`].
    pub struct MockTransport {
        shared: Arc<Shared>,
        frames: mpsc::UnboundedSender<Frame>,
    }

    impl MockTransport {
        /// Create a transport and the probe observing it.
        #[must_use]
        #[allow(clippy::new_ret_no_self)]
        pub fn new() -> (Self, TransportProbe) {
            let shared = Arc::new(Shared::default());
            let (tx, rx) = mpsc::unbounded_channel();
            (
                Self {
                    shared: Arc::clone(&shared),
                    frames: tx,
                },
                TransportProbe { shared, frames: rx },
            )
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
            if self.shared.stalled.load(Ordering::SeqCst) {
                return std::future::pending().await;
            }
            if self.shared.broken.load(Ordering::SeqCst) {
                return Err(TransportError::Io("broken pipe".to_string()));
            }
            if self.shared.closed.load(Ordering::SeqCst) {
                return Err(TransportError::Closed);
            }
            self.frames.send(frame).map_err(|_| TransportError::Closed)
        }

        async fn close(&mut self) -> Result<(), TransportError> {
            self.shared.close_calls.fetch_add(1, Ordering::SeqCst);
            self.shared.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Test-side handle of a [`MockTransport`].
    pub struct TransportProbe {
        shared: Arc<Shared>,
        frames: mpsc::UnboundedReceiver<Frame>,
    }

    impl TransportProbe {
        /// Make every subsequent write fail with an I/O error.
        pub fn break_transport(&self) {
            self.shared.broken.store(true, Ordering::SeqCst);
        }

        /// Make every subsequent write hang until its deadline.
        pub fn stall(&self) {
            self.shared.stalled.store(true, Ordering::SeqCst);
        }

        /// Whether the transport has been closed.
        #[must_use]
        pub fn is_closed(&self) -> bool {
            self.shared.closed.load(Ordering::SeqCst)
        }

        /// How many times `close` was called on the transport.
        #[must_use]
        pub fn close_calls(&self) -> usize {
            self.shared.close_calls.load(Ordering::SeqCst)
        }

        /// Next written frame, waiting at most `wait`.
        pub async fn next_frame(&mut self, wait: Duration) -> Option<Frame> {
            tokio::time::timeout(wait, self.frames.recv())
                .await
                .ok()
                .flatten()
        }

        /// Next written frame if one is already buffered.
        pub fn try_next_frame(&mut self) -> Option<Frame> {
            self.frames.try_recv().ok()
        }

        /// Next written frame decoded as a [`Notification`].
        ///
        /// Returns `None` on timeout or if the next frame is not a
        /// notification.
        pub async fn next_notification(&mut self, wait: Duration) -> Option<Notification> {
            match self.next_frame(wait).await? {
                Frame::Text(text) => serde_json::from_str(&text).ok(),
                _ => None,
            }
        }

        /// Whether nothing is written within `wait`.
        pub async fn stays_silent(&mut self, wait: Duration) -> bool {
            self.next_frame(wait).await.is_none()
        }
    }

    /// Sender half of a hand-driven inbound frame stream.
    pub struct InboundFrames {
        tx: stream_mpsc::UnboundedSender<Result<Frame, TransportError>>,
    }

    /// Inbound stream type consumed by the lifecycle manager in tests.
    pub type InboundStream = stream_mpsc::UnboundedReceiver<Result<Frame, TransportError>>;

    impl InboundFrames {
        /// Create a sender and the stream it feeds.
        #[must_use]
        #[allow(clippy::new_ret_no_self)]
        pub fn new() -> (Self, InboundStream) {
            let (tx, rx) = stream_mpsc::unbounded();
            (Self { tx }, rx)
        }

        /// Deliver a frame from the "peer".
        pub fn push(&self, frame: Frame) {
            let _ = self.tx.unbounded_send(Ok(frame));
        }

        /// Deliver a text frame from the "peer".
        pub fn push_text(&self, text: &str) {
            self.push(Frame::text(text));
        }

        /// Deliver a read error.
        pub fn fail(&self, error: TransportError) {
            let _ = self.tx.unbounded_send(Err(error));
        }

        /// End the stream as if the peer vanished.
        pub fn hang_up(self) {
            drop(self);
        }
    }
}

/// Test helpers and utilities
pub mod helpers {
    /// Install a `tracing` subscriber for test output.
    ///
    /// Safe to call from every test; only the first call installs.
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "bankadmin=debug".into()),
            )
            .with_test_writer()
            .try_init();
    }
}

// Re-export commonly used items
pub use helpers::init_tracing;
pub use mocks::{
    test_clock, FixedClock, InboundFrames, InboundStream, MockTransport, TransportProbe,
};

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use bankadmin_core::{Frame, Transport, TransportError};
    use std::time::Duration;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
    }

    #[tokio::test]
    async fn test_mock_transport_records_frames() {
        let (mut transport, mut probe) = MockTransport::new();
        transport.send(Frame::text("one")).await.unwrap();
        transport.send(Frame::Ping(vec![1])).await.unwrap();

        assert_eq!(probe.try_next_frame(), Some(Frame::text("one")));
        assert_eq!(
            probe.next_frame(Duration::from_millis(10)).await,
            Some(Frame::Ping(vec![1]))
        );
        assert!(probe.stays_silent(Duration::from_millis(10)).await);
    }

    #[tokio::test]
    async fn test_broken_mock_transport_fails() {
        let (mut transport, probe) = MockTransport::new();
        probe.break_transport();
        assert!(matches!(
            transport.send(Frame::text("x")).await,
            Err(TransportError::Io(_))
        ));

        transport.close().await.unwrap();
        assert!(probe.is_closed());
        assert_eq!(probe.close_calls(), 1);
    }
}
