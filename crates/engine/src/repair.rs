//! Repairs of replicas from a reference replica.
//!
//! Every repair re-checks its precondition against the replica state cache
//! at call time. The cache is not refreshed first, so a repair acts on
//! whatever the last completed scan saw.

use crate::engine::ActiveBitPreservation;
use crate::error::{EngineError, EngineResult};
use crate::metrics;
use bitpres_core::{
    AdminRecord, Checksum, Credentials, ReplicaId, ReplicaStoreState, validate_filename,
};
use bitpres_metadata::AdminDataStore;
use bitpres_storage::StorageError;
use bytes::Bytes;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{info, warn};

/// Why a file was left untouched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    InvalidFilename,
    /// Admin data has no record of the file.
    UnknownFile,
    /// The cache does not classify the file as missing on the target.
    NotMissing,
    /// The supplied checksum is the admin checksum, so the copy is not corrupt.
    NotCorrupt,
    /// The cached checksum on the target differs from the supplied one.
    ChecksumMismatch { cached: Option<Checksum> },
    /// No reference replica holds a known-good copy.
    NoReferenceCopy,
    AlreadyInAdminData,
    NotOnAnyReplica,
    /// Replicas report different checksums for the file.
    ConflictingChecksums,
    /// No replica has reported a checksum for the file.
    NoChecksum,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFilename => f.write_str("invalid filename"),
            Self::UnknownFile => f.write_str("unknown to admin data"),
            Self::NotMissing => f.write_str("not missing on replica"),
            Self::NotCorrupt => f.write_str("checksum matches admin data"),
            Self::ChecksumMismatch { cached: Some(c) } => {
                write!(f, "cached checksum is {c}")
            }
            Self::ChecksumMismatch { cached: None } => f.write_str("no cached checksum"),
            Self::NoReferenceCopy => f.write_str("no reference replica holds a good copy"),
            Self::AlreadyInAdminData => f.write_str("already in admin data"),
            Self::NotOnAnyReplica => f.write_str("not listed on any replica"),
            Self::ConflictingChecksums => f.write_str("replicas disagree on checksum"),
            Self::NoChecksum => f.write_str("no replica reported a checksum"),
        }
    }
}

/// Outcome of one file in a repair call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RepairOutcome {
    Repaired,
    Skipped { reason: SkipReason },
    Failed { reason: String },
}

impl RepairOutcome {
    fn skipped(reason: SkipReason) -> Self {
        Self::Skipped { reason }
    }

    fn failed(reason: impl fmt::Display) -> Self {
        Self::Failed {
            reason: reason.to_string(),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Repaired => "repaired",
            Self::Skipped { .. } => "skipped",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Per-file outcomes of a repair call.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RepairReport {
    /// Target replica; `None` for admin-data repairs.
    pub replica: Option<ReplicaId>,
    pub outcomes: BTreeMap<String, RepairOutcome>,
}

impl RepairReport {
    pub fn for_replica(replica: ReplicaId) -> Self {
        Self {
            replica: Some(replica),
            outcomes: BTreeMap::new(),
        }
    }

    pub fn outcome(&self, filename: &str) -> Option<&RepairOutcome> {
        self.outcomes.get(filename)
    }

    pub fn repaired_count(&self) -> usize {
        self.count(|o| matches!(o, RepairOutcome::Repaired))
    }

    pub fn skipped_count(&self) -> usize {
        self.count(|o| matches!(o, RepairOutcome::Skipped { .. }))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|o| matches!(o, RepairOutcome::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&RepairOutcome) -> bool) -> usize {
        self.outcomes.values().filter(|o| pred(o)).count()
    }

    pub(crate) fn insert(&mut self, kind: &str, filename: &str, outcome: RepairOutcome) {
        metrics::record_repair(kind, outcome.label());
        match &outcome {
            RepairOutcome::Repaired => {
                info!(kind, replica = ?self.replica, filename, "repair completed")
            }
            RepairOutcome::Skipped { reason } => {
                info!(kind, replica = ?self.replica, filename, reason = %reason, "repair skipped")
            }
            RepairOutcome::Failed { reason } => {
                warn!(kind, replica = ?self.replica, filename, reason = %reason, "repair failed")
            }
        }
        self.outcomes.insert(filename.to_string(), outcome);
    }
}

impl ActiveBitPreservation {
    /// Copy files the target replica is missing from a reference replica.
    ///
    /// A file is only copied when the cache lists it as missing on the target
    /// and some reference replica holds a good copy. One attempt per file;
    /// problems with one file never stop the others.
    pub async fn upload_missing_files<S: AsRef<str>>(
        &self,
        replica: &ReplicaId,
        filenames: &[S],
    ) -> EngineResult<RepairReport> {
        let candidates = self.reference_candidates(replica)?;
        let target = self.cache.snapshot(replica);

        let mut report = RepairReport::for_replica(replica.clone());
        for filename in filenames {
            let filename = filename.as_ref();
            if report.outcomes.contains_key(filename) {
                continue;
            }
            let outcome = if validate_filename(filename).is_err() {
                RepairOutcome::skipped(SkipReason::InvalidFilename)
            } else if !target.missing_files.contains(filename) {
                RepairOutcome::skipped(SkipReason::NotMissing)
            } else {
                self.upload_one(replica, &candidates, filename).await
            };
            report.insert("upload", filename, outcome);
        }
        Ok(report)
    }

    async fn upload_one(
        &self,
        replica: &ReplicaId,
        candidates: &[ReplicaId],
        filename: &str,
    ) -> RepairOutcome {
        let record = match self.admin.get_admin_record(filename).await {
            Ok(Some(record)) => record,
            Ok(None) => return RepairOutcome::skipped(SkipReason::UnknownFile),
            Err(e) => return RepairOutcome::failed(e),
        };
        let data = match self.fetch_good_copy(candidates, &record).await {
            Ok(data) => data,
            Err(outcome) => return outcome,
        };

        match self.transfer.store(replica, filename, data).await {
            Ok(()) => self.acknowledge(&record, replica, ReplicaStoreState::UploadCompleted).await,
            Err(StorageError::AlreadyExists(_)) => RepairOutcome::skipped(SkipReason::NotMissing),
            Err(e) => self.upload_failed(&record, replica, e).await,
        }
    }

    /// Replace a corrupt copy on a replica with a good one.
    ///
    /// `checksum` is the corrupt checksum the caller saw. Nothing is changed
    /// unless the cache still shows that checksum on the replica and it
    /// differs from admin data. Rejected credentials abort the call.
    pub async fn replace_changed_file(
        &self,
        replica: &ReplicaId,
        filename: &str,
        credentials: &Credentials,
        checksum: &str,
    ) -> EngineResult<RepairReport> {
        let candidates = self.reference_candidates(replica)?;
        validate_filename(filename)?;
        let claimed = Checksum::parse(checksum)?;

        let mut report = RepairReport::for_replica(replica.clone());
        let outcome = match self.admin.get_admin_record(filename).await? {
            None => RepairOutcome::skipped(SkipReason::UnknownFile),
            Some(record) => {
                let cached = self.cache.snapshot(replica).checksum(filename).cloned();
                if cached.as_ref() != Some(&claimed) {
                    RepairOutcome::skipped(SkipReason::ChecksumMismatch { cached })
                } else if claimed == record.checksum {
                    RepairOutcome::skipped(SkipReason::NotCorrupt)
                } else {
                    self.replace_one(replica, &candidates, &record, credentials)
                        .await?
                }
            }
        };
        report.insert("replace", filename, outcome);
        Ok(report)
    }

    async fn replace_one(
        &self,
        replica: &ReplicaId,
        candidates: &[ReplicaId],
        record: &AdminRecord,
        credentials: &Credentials,
    ) -> EngineResult<RepairOutcome> {
        let filename = record.filename.as_str();
        let data = match self.fetch_good_copy(candidates, record).await {
            Ok(data) => data,
            Err(outcome) => return Ok(outcome),
        };

        match self.transfer.remove(replica, filename, credentials).await {
            Ok(()) | Err(StorageError::NotFound(_)) => {}
            Err(e @ StorageError::PermissionDenied(_)) => return Err(e.into()),
            Err(e) => return Ok(RepairOutcome::failed(format!("remove failed: {e}"))),
        }

        Ok(match self.transfer.store(replica, filename, data).await {
            Ok(()) => self.acknowledge(record, replica, ReplicaStoreState::UploadCompleted).await,
            Err(e) => self.upload_failed(record, replica, e).await,
        })
    }

    /// Bit-archive replicas other than `replica`, in priority order.
    fn reference_candidates(&self, replica: &ReplicaId) -> EngineResult<Vec<ReplicaId>> {
        self.replica(replica)?;
        let candidates: Vec<ReplicaId> = self
            .registry
            .reference_candidates(replica)
            .map(|r| r.id.clone())
            .collect();
        if candidates.is_empty() {
            return Err(EngineError::NoReferenceReplica(replica.to_string()));
        }
        Ok(candidates)
    }

    /// Fetch the file from the first candidate the cache shows with a good
    /// copy, and check the bytes against admin data.
    async fn fetch_good_copy(
        &self,
        candidates: &[ReplicaId],
        record: &AdminRecord,
    ) -> Result<Bytes, RepairOutcome> {
        let source = candidates
            .iter()
            .find(|id| {
                self.cache
                    .snapshot(id)
                    .holds_good_copy(&record.filename, &record.checksum)
            })
            .ok_or(RepairOutcome::skipped(SkipReason::NoReferenceCopy))?;

        let data = self
            .transfer
            .fetch(source, &record.filename)
            .await
            .map_err(|e| RepairOutcome::failed(format!("fetch from {source} failed: {e}")))?;

        let actual = Checksum::compute(&data);
        if actual != record.checksum {
            return Err(RepairOutcome::failed(format!(
                "copy on {source} has checksum {actual}, expected {}",
                record.checksum
            )));
        }
        Ok(data)
    }

    async fn acknowledge(
        &self,
        record: &AdminRecord,
        replica: &ReplicaId,
        state: ReplicaStoreState,
    ) -> RepairOutcome {
        match self
            .admin
            .set_replica_state(&record.filename, replica, state)
            .await
        {
            Ok(()) => RepairOutcome::Repaired,
            Err(e) => RepairOutcome::failed(format!("stored, but admin data update failed: {e}")),
        }
    }

    async fn upload_failed(
        &self,
        record: &AdminRecord,
        replica: &ReplicaId,
        error: StorageError,
    ) -> RepairOutcome {
        if let Err(e) = self
            .admin
            .set_replica_state(&record.filename, replica, ReplicaStoreState::UploadFailed)
            .await
        {
            warn!(
                replica = %replica,
                filename = %record.filename,
                error = %e,
                "failed to record upload failure"
            );
        }
        RepairOutcome::failed(format!("store failed: {error}"))
    }
}
