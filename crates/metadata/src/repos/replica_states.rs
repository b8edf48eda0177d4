//! Per-replica acknowledgment state repository.

use crate::error::MetadataResult;
use crate::models::ReplicaStateRow;
use async_trait::async_trait;
use time::OffsetDateTime;

/// Repository for per-replica upload states.
#[async_trait]
pub trait ReplicaStateRepo: Send + Sync {
    /// All replica states recorded for a file.
    async fn get_replica_states(&self, filename: &str) -> MetadataResult<Vec<ReplicaStateRow>>;

    /// Set one replica's state for a file.
    ///
    /// Fails with `NotFound` if admin data has no record for the file.
    async fn update_replica_state(
        &self,
        filename: &str,
        replica_id: &str,
        state: &str,
        updated_at: OffsetDateTime,
    ) -> MetadataResult<()>;
}
