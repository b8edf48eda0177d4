//! Engine error types.

use bitpres_metadata::MetadataError;
use bitpres_storage::StorageError;
use thiserror::Error;

/// Errors that abort a single engine call.
///
/// Per-file problems inside multi-file repairs are not errors; they are
/// reported as outcomes in a `RepairReport`.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown replica: {0}")]
    UnknownReplica(String),

    #[error("no reference replica available for {0}")]
    NoReferenceReplica(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("admin data error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("storage error: {0}")]
    Storage(StorageError),
}

impl From<StorageError> for EngineError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::PermissionDenied(msg) => Self::PermissionDenied(msg),
            StorageError::UnknownReplica(id) => Self::UnknownReplica(id),
            other => Self::Storage(other),
        }
    }
}

impl From<bitpres_core::Error> for EngineError {
    fn from(e: bitpres_core::Error) -> Self {
        use bitpres_core::Error;
        match e {
            Error::UnknownReplica(id) => Self::UnknownReplica(id),
            Error::InvalidRegistry(msg) => Self::Configuration(msg),
            other => Self::InvalidArgument(other.to_string()),
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;
