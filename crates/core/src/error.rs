//! Errors raised by pure record code.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// A record or identifier that cannot be accepted as given.
///
/// Storage failures (missing rows, stale versions, constraint violations)
/// are reported by the infra crate, never here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A field failed validation, e.g. a required field left blank.
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was malformed or out of range.
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    /// A required text field was missing or blank.
    pub fn required(field: &str) -> Self {
        Self::Validation(format!("{field} is required"))
    }
}
