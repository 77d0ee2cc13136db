//! Domain error model.

use thiserror::Error;

/// Result type used by the request vocabulary.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Only deterministic input failures belong here. Store faults, generation
/// failures and scheduling problems have their own types in the infra layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A caller-supplied value failed validation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A tone name outside the supported set.
    #[error("unknown tone: {0}")]
    UnknownTone(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn unknown_tone(name: impl Into<String>) -> Self {
        Self::UnknownTone(name.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
