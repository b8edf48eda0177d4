//! Admin data store for the bit-preservation engine.
//!
//! Admin data is the authoritative record of what should exist: one record
//! per file with its expected checksum, upload date and per-replica
//! acknowledgment state.

pub mod admin_data;
pub mod error;
pub mod models;
pub mod repos;
pub mod store;

pub use admin_data::AdminDataStore;
pub use error::{MetadataError, MetadataResult};
pub use store::{MetadataStore, SqliteStore};

use bitpres_core::config::MetadataConfig;
use std::sync::Arc;

/// Create a metadata store from configuration.
pub async fn from_config(config: &MetadataConfig) -> MetadataResult<Arc<dyn MetadataStore>> {
    match config {
        MetadataConfig::Sqlite {
            path,
            query_timeout_secs,
        } => {
            let store = SqliteStore::new(path, *query_timeout_secs).await?;
            Ok(Arc::new(store) as Arc<dyn MetadataStore>)
        }
    }
}
