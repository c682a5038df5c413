//! Validation error model shared by every crate.

use thiserror::Error;

/// Result type for input validation.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Input failed validation before any work was attempted.
///
/// Keep this focused on deterministic, caller-caused problems. Upstream
/// outages and denials are modeled elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was absent or blank.
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// An identifier was invalid (e.g. blank).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl ValidationError {
    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    /// Require a non-blank string field.
    pub fn require(field: &'static str, value: &str) -> ValidationResult<()> {
        if value.trim().is_empty() {
            Err(Self::MissingField(field))
        } else {
            Ok(())
        }
    }
}
