//! Metadata store error types.

use thiserror::Error;

/// Metadata store operation errors.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt admin record for {filename}: {reason}")]
    CorruptRecord { filename: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for metadata operations.
pub type MetadataResult<T> = std::result::Result<T, MetadataError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corrupt_record_message_names_file() {
        let err = MetadataError::CorruptRecord {
            filename: "a.arc".to_string(),
            reason: "invalid checksum".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "corrupt admin record for a.arc: invalid checksum"
        );
    }
}
