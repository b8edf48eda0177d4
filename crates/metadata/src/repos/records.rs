//! Admin record repository.

use crate::error::MetadataResult;
use crate::models::{AdminRecordRow, ReplicaStateRow};
use async_trait::async_trait;

/// Repository for admin records keyed by filename.
#[async_trait]
pub trait AdminRecordRepo: Send + Sync {
    /// Get a record by filename.
    async fn get_record(&self, filename: &str) -> MetadataResult<Option<AdminRecordRow>>;

    /// Insert or replace a record together with its complete set of replica states.
    async fn upsert_record(
        &self,
        record: &AdminRecordRow,
        states: &[ReplicaStateRow],
    ) -> MetadataResult<()>;

    /// Insert a record only if no record exists for the filename.
    /// Returns false if one already existed.
    async fn insert_record(
        &self,
        record: &AdminRecordRow,
        states: &[ReplicaStateRow],
    ) -> MetadataResult<bool>;

    /// All records without their replica states, sorted by filename.
    async fn list_records(&self) -> MetadataResult<Vec<AdminRecordRow>>;

    /// All filenames, sorted.
    async fn list_filenames(&self) -> MetadataResult<Vec<String>>;

    /// Number of records.
    async fn count_records(&self) -> MetadataResult<u64>;
}
