//! Admin identity.
//!
//! The identity is established by an external authentication collaborator.
//! This module only checks that what it was handed is well-formed before the
//! identity is used as a registry key.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised while turning a raw principal into an [`AdminId`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// The principal was present but is not a usable admin identifier.
    #[error("Malformed admin identity: {0}")]
    Malformed(String),
}

/// Identity of an authenticated admin session.
///
/// Opaque string key into the connection registry. Non-empty after trimming
/// and free of control characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AdminId(String);

impl AdminId {
    /// Validate and wrap a raw admin identifier.
    ///
    /// Surrounding whitespace is stripped.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Malformed`] if the identifier is blank or
    /// contains control characters.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, IdentityError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(IdentityError::Malformed("identifier is empty".to_string()));
        }
        if trimmed.chars().any(char::is_control) {
            return Err(IdentityError::Malformed(
                "identifier contains control characters".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Borrow the identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AdminId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for AdminId {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for AdminId {
    type Error = IdentityError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AdminId> for String {
    fn from(id: AdminId) -> Self {
        id.0
    }
}
