//! Domain-level access to admin data.
//!
//! Every `MetadataStore` is an `AdminDataStore`: the methods here convert
//! between database rows and `bitpres_core::AdminRecord`.

use crate::error::{MetadataError, MetadataResult};
use crate::models::{AdminRecordRow, ReplicaStateRow};
use crate::store::MetadataStore;
use async_trait::async_trait;
use bitpres_core::{AdminRecord, Checksum, ReplicaId, ReplicaStoreState};
use std::collections::BTreeMap;
use time::OffsetDateTime;

/// The admin data boundary: records keyed by filename.
#[async_trait]
pub trait AdminDataStore: Send + Sync {
    /// Get a file's record, or `None` if admin data does not know the file.
    async fn get_admin_record(&self, filename: &str) -> MetadataResult<Option<AdminRecord>>;

    /// Insert or replace a record.
    async fn put_admin_record(&self, record: &AdminRecord) -> MetadataResult<()>;

    /// Insert a record only if the file is unknown. Returns false if it was known.
    async fn add_admin_record(&self, record: &AdminRecord) -> MetadataResult<bool>;

    /// Every filename in admin data, sorted.
    async fn list_admin_filenames(&self) -> MetadataResult<Vec<String>>;

    /// Expected checksum of every file in admin data.
    async fn list_admin_checksums(&self) -> MetadataResult<BTreeMap<String, Checksum>>;

    /// Set one replica's acknowledged state for a known file.
    async fn set_replica_state(
        &self,
        filename: &str,
        replica: &ReplicaId,
        state: ReplicaStoreState,
    ) -> MetadataResult<()>;
}

#[async_trait]
impl<T: MetadataStore + ?Sized> AdminDataStore for T {
    async fn get_admin_record(&self, filename: &str) -> MetadataResult<Option<AdminRecord>> {
        let Some(row) = self.get_record(filename).await? else {
            return Ok(None);
        };
        let states = self.get_replica_states(filename).await?;
        record_from_rows(row, states).map(Some)
    }

    async fn put_admin_record(&self, record: &AdminRecord) -> MetadataResult<()> {
        let (row, states) = rows_from_record(record, OffsetDateTime::now_utc());
        self.upsert_record(&row, &states).await
    }

    async fn add_admin_record(&self, record: &AdminRecord) -> MetadataResult<bool> {
        let (row, states) = rows_from_record(record, OffsetDateTime::now_utc());
        self.insert_record(&row, &states).await
    }

    async fn list_admin_filenames(&self) -> MetadataResult<Vec<String>> {
        self.list_filenames().await
    }

    async fn list_admin_checksums(&self) -> MetadataResult<BTreeMap<String, Checksum>> {
        self.list_records()
            .await?
            .into_iter()
            .map(|row| {
                let checksum =
                    Checksum::parse(&row.checksum).map_err(|e| corrupt(&row.filename, e))?;
                Ok((row.filename, checksum))
            })
            .collect()
    }

    async fn set_replica_state(
        &self,
        filename: &str,
        replica: &ReplicaId,
        state: ReplicaStoreState,
    ) -> MetadataResult<()> {
        self.update_replica_state(
            filename,
            replica.as_str(),
            state.as_str(),
            OffsetDateTime::now_utc(),
        )
        .await
    }
}

fn corrupt(filename: &str, reason: impl std::fmt::Display) -> MetadataError {
    MetadataError::CorruptRecord {
        filename: filename.to_string(),
        reason: reason.to_string(),
    }
}

fn record_from_rows(
    row: AdminRecordRow,
    states: Vec<ReplicaStateRow>,
) -> MetadataResult<AdminRecord> {
    let checksum = Checksum::parse(&row.checksum).map_err(|e| corrupt(&row.filename, e))?;
    let mut replica_states = BTreeMap::new();
    for state in states {
        let replica = ReplicaId::parse(&state.replica_id).map_err(|e| corrupt(&row.filename, e))?;
        let value = ReplicaStoreState::parse(&state.state).map_err(|e| corrupt(&row.filename, e))?;
        replica_states.insert(replica, value);
    }
    let mut record = AdminRecord::new(row.filename.clone(), checksum, row.uploaded_at)
        .map_err(|e| corrupt(&row.filename, e))?;
    record.replica_states = replica_states;
    Ok(record)
}

fn rows_from_record(
    record: &AdminRecord,
    now: OffsetDateTime,
) -> (AdminRecordRow, Vec<ReplicaStateRow>) {
    let row = AdminRecordRow {
        filename: record.filename.clone(),
        checksum: record.checksum.as_str().to_string(),
        uploaded_at: record.uploaded_at,
        updated_at: now,
    };
    let states = record
        .replica_states
        .iter()
        .map(|(replica, state)| ReplicaStateRow {
            filename: record.filename.clone(),
            replica_id: replica.as_str().to_string(),
            state: state.as_str().to_string(),
            updated_at: now,
        })
        .collect();
    (row, states)
}
