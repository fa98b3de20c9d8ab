//! # Bank Admin Core
//!
//! Core types and contracts for the real-time admin notification channel.
//!
//! This crate holds everything that is independent of a particular runtime or
//! web framework:
//!
//! - **Notification**: immutable event payload delivered to admin consoles
//! - **AdminId**: validated identity of an already-authenticated admin
//! - **Transport / Frame**: message-framed, full-duplex connection abstraction
//! - **Connection**: one live transport with a single serialized write path
//! - **NotificationService**: subscribe / unsubscribe / broadcast / send / count
//!
//! ## Delivery Model
//!
//! ```text
//! Producer ──broadcast()──> NotificationService ──snapshot──> [Connection]*
//!                                                     │
//!                                                     └─ write (per connection,
//!                                                        serialized, deadline)
//! ```
//!
//! Delivery is best-effort and at-most-once. A failed write on one connection
//! never affects any other connection and is never surfaced to the producer.
//!
//! ## Example
//!
//! ```ignore
//! use bankadmin_core::{NotificationProducer, Severity};
//!
//! async fn on_db_failure(service: &dyn NotificationService) {
//!     service
//!         .broadcast_system_alert(
//!             Severity::Critical,
//!             "System Error",
//!             "Database connection failed",
//!             "database",
//!         )
//!         .await
//!         .ok();
//! }
//! ```

pub mod admin;
pub mod connection;
pub mod environment;
pub mod notification;
pub mod service;
pub mod transport;

// Re-export commonly used types
pub use admin::{AdminId, IdentityError};
pub use chrono::{DateTime, Utc};
pub use connection::{Connection, ConnectionId, ConnectionWriter};
pub use environment::{Clock, SystemClock};
pub use notification::{Notification, NotificationId, NotificationType, Severity};
pub use service::{NotificationError, NotificationProducer, NotificationService};
pub use tokio_util::sync::CancellationToken;
pub use transport::{Frame, Transport, TransportError};
