//! Metadata store trait and the SQLite implementation.

use crate::error::{MetadataError, MetadataResult};
use crate::repos::{AdminRecordRepo, ReplicaStateRepo};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Combined metadata store trait.
#[async_trait]
pub trait MetadataStore: AdminRecordRepo + ReplicaStateRepo + Send + Sync {
    /// Run database migrations.
    async fn migrate(&self) -> MetadataResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> MetadataResult<()>;
}

/// SQLite-based metadata store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Create a new SQLite store.
    pub async fn new(
        path: impl AsRef<Path>,
        query_timeout_secs: Option<u64>,
    ) -> MetadataResult<Self> {
        let path = path.as_ref();
        let query_timeout_secs = query_timeout_secs.unwrap_or(600);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            // Prevent transient "database is locked" errors under concurrent access.
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            // SQLite permits limited write concurrency; a single connection avoids
            // persistent "database is locked" failures under concurrent repairs.
            .max_connections(1)
            // Callers queue behind the single connection for at most this long.
            .acquire_timeout(Duration::from_secs(query_timeout_secs))
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;

        tracing::debug!(path = %path.display(), query_timeout_secs, "Opened admin data");

        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn migrate(&self) -> MetadataResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

mod sqlite_impl {
    use super::*;
    use crate::models::*;
    use sqlx::Transaction;
    use time::OffsetDateTime;

    async fn insert_states(
        tx: &mut Transaction<'_, Sqlite>,
        states: &[ReplicaStateRow],
    ) -> MetadataResult<()> {
        for state in states {
            sqlx::query(
                "INSERT INTO replica_states (filename, replica_id, state, updated_at) VALUES (?, ?, ?, ?)",
            )
            .bind(&state.filename)
            .bind(&state.replica_id)
            .bind(&state.state)
            .bind(state.updated_at)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    #[async_trait]
    impl AdminRecordRepo for SqliteStore {
        async fn get_record(&self, filename: &str) -> MetadataResult<Option<AdminRecordRow>> {
            let row = sqlx::query_as::<_, AdminRecordRow>(
                "SELECT * FROM admin_records WHERE filename = ?",
            )
            .bind(filename)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        }

        async fn upsert_record(
            &self,
            record: &AdminRecordRow,
            states: &[ReplicaStateRow],
        ) -> MetadataResult<()> {
            let mut tx = self.pool.begin().await?;

            sqlx::query(
                "INSERT INTO admin_records (filename, checksum, uploaded_at, updated_at) VALUES (?, ?, ?, ?)
                 ON CONFLICT(filename) DO UPDATE SET checksum = excluded.checksum,
                 uploaded_at = excluded.uploaded_at, updated_at = excluded.updated_at",
            )
            .bind(&record.filename)
            .bind(&record.checksum)
            .bind(record.uploaded_at)
            .bind(record.updated_at)
            .execute(&mut *tx)
            .await?;

            // The state set is replaced wholesale so replicas dropped from the
            // record do not linger.
            sqlx::query("DELETE FROM replica_states WHERE filename = ?")
                .bind(&record.filename)
                .execute(&mut *tx)
                .await?;
            insert_states(&mut tx, states).await?;

            tx.commit().await?;
            Ok(())
        }

        async fn insert_record(
            &self,
            record: &AdminRecordRow,
            states: &[ReplicaStateRow],
        ) -> MetadataResult<bool> {
            let mut tx = self.pool.begin().await?;

            let result = sqlx::query(
                "INSERT OR IGNORE INTO admin_records (filename, checksum, uploaded_at, updated_at) VALUES (?, ?, ?, ?)",
            )
            .bind(&record.filename)
            .bind(&record.checksum)
            .bind(record.uploaded_at)
            .bind(record.updated_at)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                tx.rollback().await?;
                return Ok(false);
            }
            insert_states(&mut tx, states).await?;

            tx.commit().await?;
            Ok(true)
        }

        async fn list_records(&self) -> MetadataResult<Vec<AdminRecordRow>> {
            let rows = sqlx::query_as::<_, AdminRecordRow>(
                "SELECT * FROM admin_records ORDER BY filename",
            )
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }

        async fn list_filenames(&self) -> MetadataResult<Vec<String>> {
            let rows: Vec<(String,)> =
                sqlx::query_as("SELECT filename FROM admin_records ORDER BY filename")
                    .fetch_all(&self.pool)
                    .await?;
            Ok(rows.into_iter().map(|(f,)| f).collect())
        }

        async fn count_records(&self) -> MetadataResult<u64> {
            let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM admin_records")
                .fetch_one(&self.pool)
                .await?;
            Ok(count as u64)
        }
    }

    #[async_trait]
    impl ReplicaStateRepo for SqliteStore {
        async fn get_replica_states(
            &self,
            filename: &str,
        ) -> MetadataResult<Vec<ReplicaStateRow>> {
            let rows = sqlx::query_as::<_, ReplicaStateRow>(
                "SELECT * FROM replica_states WHERE filename = ? ORDER BY replica_id",
            )
            .bind(filename)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }

        async fn update_replica_state(
            &self,
            filename: &str,
            replica_id: &str,
            state: &str,
            updated_at: OffsetDateTime,
        ) -> MetadataResult<()> {
            let mut tx = self.pool.begin().await?;

            let result = sqlx::query(
                "UPDATE admin_records SET updated_at = ? WHERE filename = ?",
            )
            .bind(updated_at)
            .bind(filename)
            .execute(&mut *tx)
            .await?;
            if result.rows_affected() == 0 {
                tx.rollback().await?;
                return Err(MetadataError::NotFound(format!(
                    "admin record {filename}"
                )));
            }

            sqlx::query(
                "INSERT INTO replica_states (filename, replica_id, state, updated_at) VALUES (?, ?, ?, ?)
                 ON CONFLICT(filename, replica_id) DO UPDATE SET state = excluded.state,
                 updated_at = excluded.updated_at",
            )
            .bind(filename)
            .bind(replica_id)
            .bind(state)
            .bind(updated_at)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok(())
        }
    }
}

const SCHEMA_SQL: &str = r#"
-- Admin records: one row per archived file
CREATE TABLE IF NOT EXISTS admin_records (
    filename TEXT PRIMARY KEY,
    checksum TEXT NOT NULL,
    uploaded_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Per-replica acknowledgment state
CREATE TABLE IF NOT EXISTS replica_states (
    filename TEXT NOT NULL REFERENCES admin_records(filename) ON DELETE CASCADE,
    replica_id TEXT NOT NULL,
    state TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (filename, replica_id)
);
CREATE INDEX IF NOT EXISTS idx_replica_states_replica ON replica_states(replica_id);
"#;
