//! Errors for board operations.

use taskboard_storage::StorageError;

/// Result type for board operations.
pub type Result<T> = std::result::Result<T, WorkError>;

/// Errors that can occur while editing boards.
#[derive(Debug, thiserror::Error)]
pub enum WorkError {
    /// Referenced entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Input rejected
    #[error("Invalid input: {0}")]
    Invalid(String),

    /// Storage failure
    #[error(transparent)]
    Storage(#[from] StorageError),
}
