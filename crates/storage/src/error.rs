//! Storage error types.

use thiserror::Error;

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("object already exists: {0}")]
    AlreadyExists(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("unsupported operation: {0}")]
    Unsupported(String),

    #[error("invalid checksum listing: {0}")]
    InvalidListing(String),

    #[error("unknown replica: {0}")]
    UnknownReplica(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<bitpres_core::Error> for StorageError {
    fn from(e: bitpres_core::Error) -> Self {
        match e {
            bitpres_core::Error::UnknownReplica(id) => Self::UnknownReplica(id),
            bitpres_core::Error::InvalidFilename(msg) => Self::InvalidKey(msg),
            other => Self::Config(other.to_string()),
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;
