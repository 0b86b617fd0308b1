//! CLI-level errors (wraps tree and storage errors)

use thiserror::Error;

use crate::application::TreeError;
use crate::domain::DomainError;
use crate::infrastructure::StorageError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Tree(#[from] TreeError),

    #[error("{0}")]
    Storage(#[from] StorageError),

    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("{0} consistency problems found")]
    Inconsistent(usize),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

fn storage_exit_code(e: &StorageError) -> i32 {
    match e {
        StorageError::Io { .. } => crate::exitcode::IOERR,
        StorageError::Format { .. } => crate::exitcode::DATAERR,
        StorageError::RowNotFound(_) => crate::exitcode::NOINPUT,
        _ => crate::exitcode::SOFTWARE,
    }
}

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgs(_) => crate::exitcode::USAGE,
            CliError::Storage(e) => storage_exit_code(e),
            CliError::Domain(_) | CliError::Inconsistent(_) => crate::exitcode::DATAERR,
            CliError::Tree(e) => match e {
                TreeError::Storage(e) => storage_exit_code(e),
                TreeError::Config { .. } => crate::exitcode::CONFIG,
                TreeError::Domain(_) => crate::exitcode::DATAERR,
                TreeError::PartitionNotFound(_) | TreeError::TargetNotFound(_) => {
                    crate::exitcode::NOINPUT
                }
                TreeError::DuplicatePartition(_)
                | TreeError::CrossPartitionMove { .. }
                | TreeError::PartitionMismatch { .. }
                | TreeError::InvalidMoveToDescendant { .. }
                | TreeError::ChildCountUnderflow { .. } => crate::exitcode::DATAERR,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            CliError::InvalidArgs("x".into()).exit_code(),
            crate::exitcode::USAGE
        );
        assert_eq!(
            CliError::from(TreeError::PartitionNotFound("main".into())).exit_code(),
            crate::exitcode::NOINPUT
        );
        assert_eq!(
            CliError::from(TreeError::Domain(DomainError::InvalidIdentifier("".into()))).exit_code(),
            crate::exitcode::DATAERR
        );
        assert_eq!(
            CliError::from(TreeError::Config { message: "bad".into() }).exit_code(),
            crate::exitcode::CONFIG
        );
        assert_eq!(
            CliError::from(StorageError::RowNotFound("0001".into())).exit_code(),
            crate::exitcode::NOINPUT
        );
    }
}
