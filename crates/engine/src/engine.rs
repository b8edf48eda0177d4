//! The reconciliation engine.
//!
//! Reads are answered from admin data and the replica state cache and never
//! touch a replica. Only `find_missing_files` and `find_changed_files`
//! dispatch batch jobs, and only a completed job changes the cache.

use crate::cache::{ReplicaFileCache, ReplicaStateCache};
use crate::error::{EngineError, EngineResult};
use crate::metrics;
use crate::preservation::PreservationState;
use bitpres_batch::{BatchClient, BatchJob, FilenameFilter};
use bitpres_core::config::BatchConfig;
use bitpres_core::{Replica, ReplicaId, ReplicaRegistry, validate_filename};
use bitpres_metadata::{AdminDataStore, MetadataError, MetadataStore};
use bitpres_storage::ReplicaTransfer;
use dashmap::DashMap;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// The two kinds of replica scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanKind {
    Missing,
    Changed,
}

impl ScanKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::Changed => "changed",
        }
    }
}

impl fmt::Display for ScanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of an explicit rescan.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScanOutcome {
    /// The cache now holds this scan's results.
    Completed {
        processed: u64,
        failed: u64,
        /// Missing or changed files found.
        found: u64,
    },
    /// The scan produced nothing usable; the cache is unchanged.
    Degraded { reason: String },
}

/// Batch job timeouts per scan kind.
#[derive(Clone, Copy, Debug)]
pub struct ScanTimeouts {
    pub list_files: Duration,
    pub checksum: Duration,
}

impl From<&BatchConfig> for ScanTimeouts {
    fn from(config: &BatchConfig) -> Self {
        Self {
            list_files: config.list_files_timeout(),
            checksum: config.checksum_timeout(),
        }
    }
}

/// Cached counts and scan dates for one replica.
#[derive(Clone, Debug, Serialize)]
pub struct ReplicaSummary {
    #[serde(flatten)]
    pub replica: Replica,
    pub missing_count: u64,
    pub changed_count: u64,
    pub total_file_count: u64,
    #[serde(with = "time::serde::rfc3339::option")]
    pub missing_checked_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub changed_checked_at: Option<OffsetDateTime>,
}

/// The bit-preservation reconciliation engine.
pub struct ActiveBitPreservation {
    pub(crate) registry: ReplicaRegistry,
    pub(crate) admin: Arc<dyn MetadataStore>,
    batch: Arc<dyn BatchClient>,
    pub(crate) transfer: Arc<dyn ReplicaTransfer>,
    pub(crate) cache: ReplicaStateCache,
    scan_locks: DashMap<(ReplicaId, ScanKind), Arc<Mutex<()>>>,
    timeouts: ScanTimeouts,
}

impl ActiveBitPreservation {
    pub fn new(
        registry: ReplicaRegistry,
        admin: Arc<dyn MetadataStore>,
        batch: Arc<dyn BatchClient>,
        transfer: Arc<dyn ReplicaTransfer>,
        timeouts: ScanTimeouts,
    ) -> Self {
        Self {
            registry,
            admin,
            batch,
            transfer,
            cache: ReplicaStateCache::new(),
            scan_locks: DashMap::new(),
            timeouts,
        }
    }

    // ---------------------------------------------------------------------
    // Replicas
    // ---------------------------------------------------------------------

    pub fn list_replicas(&self) -> &[Replica] {
        self.registry.list()
    }

    pub fn replica(&self, id: &ReplicaId) -> EngineResult<&Replica> {
        Ok(self.registry.get(id)?)
    }

    /// The preferred repair source for a replica.
    pub fn reference_replica_for(&self, id: &ReplicaId) -> EngineResult<&Replica> {
        self.replica(id)?;
        self.registry
            .reference_replica_for(id)
            .ok_or_else(|| EngineError::NoReferenceReplica(id.to_string()))
    }

    pub fn replica_summary(&self, id: &ReplicaId) -> EngineResult<ReplicaSummary> {
        let replica = self.replica(id)?.clone();
        let cache = self.cache.snapshot(id);
        Ok(ReplicaSummary {
            replica,
            missing_count: cache.missing_count(),
            changed_count: cache.changed_count(),
            total_file_count: cache.total_file_count(),
            missing_checked_at: cache.has_missing_scan().then_some(cache.missing_checked_at),
            changed_checked_at: cache.has_changed_scan().then_some(cache.changed_checked_at),
        })
    }

    // ---------------------------------------------------------------------
    // Preservation state
    // ---------------------------------------------------------------------

    /// Merge a file's admin record with every replica's cached scans.
    ///
    /// Returns `None` for files admin data does not know, including names
    /// that could never be valid filenames.
    pub async fn get_preservation_state(
        &self,
        filename: &str,
    ) -> EngineResult<Option<PreservationState>> {
        if validate_filename(filename).is_err() {
            return Ok(None);
        }
        let Some(record) = self.admin.get_admin_record(filename).await? else {
            return Ok(None);
        };
        let snapshots: Vec<Arc<ReplicaFileCache>> = self
            .registry
            .list()
            .iter()
            .map(|r| self.cache.snapshot(&r.id))
            .collect();
        Ok(Some(PreservationState::build(
            record,
            self.registry
                .list()
                .iter()
                .zip(snapshots.iter().map(Arc::as_ref)),
        )))
    }

    /// Preservation state for each filename, computed independently.
    ///
    /// A file whose admin record cannot be decoded maps to `None` without
    /// affecting the others. Admin data being unreachable is still an error.
    pub async fn get_preservation_state_map<S: AsRef<str>>(
        &self,
        filenames: &[S],
    ) -> EngineResult<BTreeMap<String, Option<PreservationState>>> {
        let mut states = BTreeMap::new();
        for filename in filenames {
            let filename = filename.as_ref();
            if states.contains_key(filename) {
                continue;
            }
            let state = match self.get_preservation_state(filename).await {
                Ok(state) => state,
                Err(EngineError::Metadata(e @ MetadataError::CorruptRecord { .. })) => {
                    warn!(filename, error = %e, "skipping unreadable admin record");
                    None
                }
                Err(e) => return Err(e),
            };
            states.insert(filename.to_string(), state);
        }
        Ok(states)
    }

    // ---------------------------------------------------------------------
    // Cached reads
    // ---------------------------------------------------------------------

    fn snapshot(&self, id: &ReplicaId) -> EngineResult<Arc<ReplicaFileCache>> {
        self.replica(id)?;
        Ok(self.cache.snapshot(id))
    }

    pub fn get_missing_files(&self, id: &ReplicaId) -> EngineResult<BTreeSet<String>> {
        Ok(self.snapshot(id)?.missing_files.clone())
    }

    pub fn get_changed_files(&self, id: &ReplicaId) -> EngineResult<BTreeSet<String>> {
        Ok(self.snapshot(id)?.changed_files.clone())
    }

    pub fn get_number_of_missing_files(&self, id: &ReplicaId) -> EngineResult<u64> {
        Ok(self.snapshot(id)?.missing_count())
    }

    pub fn get_number_of_changed_files(&self, id: &ReplicaId) -> EngineResult<u64> {
        Ok(self.snapshot(id)?.changed_count())
    }

    /// Files the replica held at its last missing-scan.
    pub fn get_number_of_files(&self, id: &ReplicaId) -> EngineResult<u64> {
        Ok(self.snapshot(id)?.total_file_count())
    }

    /// Completion time of the last missing-scan; the Unix epoch if none.
    pub fn get_date_for_missing_files(&self, id: &ReplicaId) -> EngineResult<OffsetDateTime> {
        Ok(self.snapshot(id)?.missing_checked_at)
    }

    /// Completion time of the last changed-scan; the Unix epoch if none.
    pub fn get_date_for_changed_files(&self, id: &ReplicaId) -> EngineResult<OffsetDateTime> {
        Ok(self.snapshot(id)?.changed_checked_at)
    }

    /// Forget everything cached for a replica.
    pub fn reset_cache(&self, id: &ReplicaId) -> EngineResult<()> {
        self.replica(id)?;
        self.cache.reset(id);
        metrics::CACHED_MISSING_FILES
            .with_label_values(&[id.as_str()])
            .set(0);
        metrics::CACHED_CHANGED_FILES
            .with_label_values(&[id.as_str()])
            .set(0);
        info!(replica = %id, "replica cache reset");
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Scans
    // ---------------------------------------------------------------------

    fn scan_lock(&self, id: &ReplicaId, kind: ScanKind) -> Arc<Mutex<()>> {
        self.scan_locks
            .entry((id.clone(), kind))
            .or_default()
            .value()
            .clone()
    }

    /// Rescan which admin-data files a replica is missing.
    ///
    /// Scans of the same replica and kind run one at a time; a caller that
    /// waited behind another scan starts its own afterwards.
    pub async fn find_missing_files(&self, id: &ReplicaId) -> EngineResult<ScanOutcome> {
        self.replica(id)?;
        let lock = self.scan_lock(id, ScanKind::Missing);
        let _guard = lock.lock().await;

        let started = Instant::now();
        info!(replica = %id, kind = "missing", "scan started");
        let admin_files: BTreeSet<String> =
            self.admin.list_admin_filenames().await?.into_iter().collect();

        let job = BatchJob::list_files(FilenameFilter::All, self.timeouts.list_files);
        let status = self.batch.dispatch(job, id).await;

        let outcome = match self.cache.record_missing_scan(
            id,
            &admin_files,
            &status,
            OffsetDateTime::now_utc(),
        ) {
            Some(cache) => {
                metrics::CACHED_MISSING_FILES
                    .with_label_values(&[id.as_str()])
                    .set(cache.missing_count() as i64);
                ScanOutcome::Completed {
                    processed: status.files_processed,
                    failed: status.files_failed.len() as u64,
                    found: cache.missing_count(),
                }
            }
            None => ScanOutcome::Degraded {
                reason: degraded_reason(&status),
            },
        };
        self.log_scan(id, ScanKind::Missing, &outcome, started);
        Ok(outcome)
    }

    /// Rescan which admin-data files have a wrong checksum on a replica.
    pub async fn find_changed_files(&self, id: &ReplicaId) -> EngineResult<ScanOutcome> {
        self.replica(id)?;
        let lock = self.scan_lock(id, ScanKind::Changed);
        let _guard = lock.lock().await;

        let started = Instant::now();
        info!(replica = %id, kind = "changed", "scan started");
        let admin_checksums = self.admin.list_admin_checksums().await?;

        let job = BatchJob::checksum_all(FilenameFilter::All, self.timeouts.checksum);
        let status = self.batch.dispatch(job, id).await;

        let outcome = match self.cache.record_changed_scan(
            id,
            &admin_checksums,
            &status,
            OffsetDateTime::now_utc(),
        ) {
            Some(cache) => {
                metrics::CACHED_CHANGED_FILES
                    .with_label_values(&[id.as_str()])
                    .set(cache.changed_count() as i64);
                ScanOutcome::Completed {
                    processed: status.files_processed,
                    failed: status.files_failed.len() as u64,
                    found: cache.changed_count(),
                }
            }
            None => ScanOutcome::Degraded {
                reason: degraded_reason(&status),
            },
        };
        self.log_scan(id, ScanKind::Changed, &outcome, started);
        Ok(outcome)
    }

    fn log_scan(&self, id: &ReplicaId, kind: ScanKind, outcome: &ScanOutcome, started: Instant) {
        let elapsed = started.elapsed();
        match outcome {
            ScanOutcome::Completed {
                processed,
                failed,
                found,
            } => {
                info!(
                    replica = %id,
                    kind = %kind,
                    processed,
                    failed,
                    found,
                    elapsed_secs = elapsed.as_secs_f64(),
                    "scan completed"
                );
                metrics::record_scan(kind.as_str(), "completed", elapsed.as_secs_f64());
            }
            ScanOutcome::Degraded { reason } => {
                warn!(
                    replica = %id,
                    kind = %kind,
                    reason = %reason,
                    "scan degraded, cache unchanged"
                );
                metrics::record_scan(kind.as_str(), "degraded", elapsed.as_secs_f64());
            }
        }
    }
}

fn degraded_reason(status: &bitpres_batch::BatchStatus) -> String {
    status
        .degraded_reason
        .clone()
        .unwrap_or_else(|| "batch job returned no usable result".to_string())
}
