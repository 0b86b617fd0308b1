//! Storage-level errors

use std::path::PathBuf;

use thiserror::Error;

/// Failures of the backing store. Propagated unchanged by the tree engine.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("a transaction is already open")]
    TransactionActive,

    #[error("no transaction is open")]
    NoTransaction,

    #[error("unique constraint violated in {partition}: {key}")]
    UniqueViolation { partition: String, key: String },

    #[error("foreign key violated: {0}")]
    ForeignKeyViolation(String),

    #[error("row not found: {0}")]
    RowNotFound(String),

    #[error("I/O error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid snapshot {}: {}", .path.display(), .message)]
    Format { path: PathBuf, message: String },
}

impl StorageError {
    /// Create an I/O error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
