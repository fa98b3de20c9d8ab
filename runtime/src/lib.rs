//! # Bank Admin Runtime
//!
//! In-process runtime for the admin notification channel.
//!
//! This crate provides:
//! - [`ConnectionRegistry`]: the admin → connections directory
//! - [`InMemoryNotificationService`]: subscribe, fan-out and shutdown on top of it
//! - [`metrics`]: Prometheus metrics for connections and deliveries
//!
//! ## Locking Discipline
//!
//! The registry is guarded by a single `RwLock`. Registration changes take
//! the write lock; fan-out and counting take the read lock only long enough
//! to copy out the affected connections. Network writes happen after the
//! lock is released, each serialized per connection and bounded by that
//! connection's write deadline, so a slow console cannot stall registrations
//! or deliveries to other consoles.
//!
//! ## Example
//!
//! ```ignore
//! use bankadmin_runtime::InMemoryNotificationService;
//! use bankadmin_core::{NotificationProducer, Severity};
//!
//! let service = Arc::new(InMemoryNotificationService::default());
//!
//! service
//!     .broadcast_system_alert(Severity::Critical, "System Error", "Database connection failed", "database")
//!     .await?;
//!
//! // On process shutdown
//! service.shutdown().await;
//! ```

pub mod metrics;
pub mod registry;
pub mod service;

pub use registry::ConnectionRegistry;
pub use service::{FanOutReport, InMemoryNotificationService};
