//! Environment module - injected dependencies.
//!
//! Time is abstracted behind [`Clock`] so notification timestamps can be
//! pinned in tests.

use chrono::{DateTime, Utc};

/// Clock trait - abstracts time operations for testability
///
/// # Examples
///
/// ```ignore
/// // Production - uses system clock
/// let clock = SystemClock;
/// let stamped = Notification::welcome(&clock);
///
/// // Test - fixed time for deterministic assertions
/// let clock = FixedClock::new(time);
/// assert_eq!(Notification::welcome(&clock).timestamp, time);
/// ```
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time from the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
