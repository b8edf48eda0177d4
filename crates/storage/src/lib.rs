//! Replica storage for the bit-preservation engine.
//!
//! This crate provides:
//! - The `ArchiveStore` object-store abstraction and a local filesystem backend
//! - The checksum listing kept by checksum-archive replicas
//! - Per-replica storage handles and the byte transfer used by repairs

pub mod backends;
pub mod checksum_list;
pub mod error;
pub mod replica_set;
pub mod traits;

pub use backends::filesystem::FilesystemBackend;
pub use checksum_list::{CHECKSUM_LIST_KEY, ChecksumListing, RejectedLine, ScannedListing};
pub use error::{StorageError, StorageResult};
pub use replica_set::{ReplicaBackend, ReplicaSet, ReplicaTransfer};
pub use traits::{ArchiveStore, ByteStream, KeyStream};

use bitpres_core::config::StorageConfig;
use std::sync::Arc;

/// Create an archive store from configuration.
pub async fn from_config(config: &StorageConfig) -> StorageResult<Arc<dyn ArchiveStore>> {
    config.validate().map_err(StorageError::Config)?;

    match config {
        StorageConfig::Filesystem { path } => {
            let backend = FilesystemBackend::new(path).await?;
            Ok(Arc::new(backend))
        }
    }
}
