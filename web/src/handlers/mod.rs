//! HTTP request handlers.

pub mod health;
pub mod notifications;

pub use health::{health_check, metrics};
pub use notifications::{info, upgrade, ConnectionInfo, WS_INFO_PATH, WS_PATH};
