//! Metadata store test utilities.

use bitpres_core::{AdminRecord, Checksum, ReplicaId, ReplicaStoreState};
use bitpres_metadata::{MetadataResult, MetadataStore, SqliteStore};
use sqlx::{Pool, Sqlite};
use std::sync::Arc;
use tempfile::TempDir;
use time::OffsetDateTime;

/// A test metadata store wrapper that cleans up on drop.
#[allow(dead_code)]
pub struct TestMetadata {
    pub store: Arc<dyn MetadataStore>,
    sqlite_store: Arc<SqliteStore>,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestMetadata {
    /// Create a new test metadata store in a temp directory.
    pub async fn new() -> MetadataResult<Self> {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("admin.db");
        let store = Arc::new(SqliteStore::new(&db_path, None).await?);

        Ok(Self {
            store: store.clone(),
            sqlite_store: store,
            _temp_dir: temp_dir,
        })
    }

    pub fn store(&self) -> Arc<dyn MetadataStore> {
        self.store.clone()
    }

    /// Get the SQLite connection pool for raw queries.
    pub fn pool(&self) -> &Pool<Sqlite> {
        self.sqlite_store.pool()
    }
}

/// Admin record for `filename` whose checksum is the digest of `content`.
#[allow(dead_code)]
pub fn record(filename: &str, content: &[u8], states: &[(&str, ReplicaStoreState)]) -> AdminRecord {
    let mut record = AdminRecord::new(
        filename,
        Checksum::compute(content),
        OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap(),
    )
    .unwrap();
    for (replica, state) in states {
        record = record.with_state(ReplicaId::parse(replica).unwrap(), *state);
    }
    record
}
