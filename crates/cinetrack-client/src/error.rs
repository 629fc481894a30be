//! Client-level errors.

use cinetrack_core::ApiError;
use cinetrack_core::ports::{AuthError, StorageError};

/// Errors raised while replaying queued operations.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The stored payload does not match its operation type.
    #[error("Malformed {op_type} payload: {reason}")]
    MalformedPayload { op_type: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Errors surfaced by the composition root.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),
}
