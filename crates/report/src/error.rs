//! Errors surfaced by report operations.

use taskboard_storage::StorageError;

/// Result type for report operations.
pub type Result<T> = std::result::Result<T, ReportError>;

/// Errors returned to callers of [`crate::ReportService`].
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// No acting user
    #[error("Sign in to work with weekly reports")]
    NotAuthenticated,

    /// Report or board does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A report already exists for the board, user and week
    #[error("{0}")]
    Conflict(String),

    /// Acting user may not perform the operation
    #[error("Not allowed: {0}")]
    Forbidden(String),

    /// Storage failure
    #[error("Storage failure: {0}")]
    Upstream(#[from] StorageError),
}
