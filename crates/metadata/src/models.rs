//! Database models mapping to the admin data schema.

use sqlx::FromRow;
use time::OffsetDateTime;

/// One file's admin record, without its replica states.
#[derive(Debug, Clone, FromRow)]
pub struct AdminRecordRow {
    pub filename: String,
    /// Lowercase hex digest.
    pub checksum: String,
    pub uploaded_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// A replica's acknowledged upload state for one file.
#[derive(Debug, Clone, FromRow)]
pub struct ReplicaStateRow {
    pub filename: String,
    pub replica_id: String,
    /// `ReplicaStoreState` name, e.g. `UPLOAD_COMPLETED`.
    pub state: String,
    pub updated_at: OffsetDateTime,
}
