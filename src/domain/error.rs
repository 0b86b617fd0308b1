//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent violations of path and payload rules.
/// These are independent of storage concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("malformed path {path:?}: {reason}")]
    MalformedPath { path: String, reason: String },

    #[error("no free path segment below {parent}: ordinals are exhausted at {max_ordinal}")]
    PathOverflow { parent: String, max_ordinal: u64 },

    #[error("invalid path codec: {0}")]
    InvalidCodec(String),

    #[error("invalid menu entry {field}: {reason}")]
    InvalidEntry { field: &'static str, reason: String },

    #[error("invalid menu identifier: {0:?}")]
    InvalidIdentifier(String),
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
