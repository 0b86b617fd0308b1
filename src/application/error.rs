//! Application-level errors (wraps domain and storage errors)

use thiserror::Error;

use crate::domain::{DomainError, NodeId, PartitionId};
use crate::infrastructure::StorageError;

/// Errors of tree operations. Any of them aborts the operation and rolls
/// back its writes.
#[derive(Error, Debug)]
pub enum TreeError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),

    #[error("node not found: {0}")]
    TargetNotFound(NodeId),

    #[error("cannot move {node} from {from} into {to}: nodes never cross partitions")]
    CrossPartitionMove {
        node: NodeId,
        from: PartitionId,
        to: PartitionId,
    },

    #[error("{node} belongs to {actual}, expected {expected}")]
    PartitionMismatch {
        node: NodeId,
        expected: PartitionId,
        actual: PartitionId,
    },

    #[error("cannot move {node} below its own descendant {target}")]
    InvalidMoveToDescendant { node: NodeId, target: NodeId },

    #[error("child count of {node} at {path} is already 0; run fix to repair the menu")]
    ChildCountUnderflow { node: NodeId, path: String },

    #[error("menu not found: {0}")]
    PartitionNotFound(String),

    #[error("menu already exists: {0}")]
    DuplicatePartition(String),

    #[error("config error: {message}")]
    Config { message: String },
}

impl TreeError {
    /// True for errors caused by a path that does not decode.
    pub fn is_malformed_path(&self) -> bool {
        matches!(self, TreeError::Domain(DomainError::MalformedPath { .. }))
    }
}

/// Result type for tree operations.
pub type TreeResult<T> = Result<T, TreeError>;
