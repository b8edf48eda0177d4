//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid replica id: {0}")]
    InvalidReplicaId(String),

    #[error("unknown replica: {0}")]
    UnknownReplica(String),

    #[error("invalid replica registry: {0}")]
    InvalidRegistry(String),

    #[error("invalid filename: {0}")]
    InvalidFilename(String),

    #[error("invalid checksum: {0}")]
    InvalidChecksum(String),

    #[error("invalid {kind} ordinal: {value}")]
    InvalidOrdinal { kind: &'static str, value: i64 },

    #[error("invalid {kind}: {value}")]
    InvalidState { kind: &'static str, value: String },

    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
