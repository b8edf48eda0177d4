//! Per-replica cache of the last completed scans.
//!
//! Entries are immutable snapshots behind `Arc`. A completed scan builds a
//! new snapshot and swaps it in under the map's shard lock, so readers see
//! either the old or the new scan, never a mix. Degraded scans are ignored.

use bitpres_batch::BatchStatus;
use bitpres_core::{Checksum, ChecksumStatus, FileListStatus, ReplicaId};
use dashmap::DashMap;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use time::OffsetDateTime;

/// What the last scans of one replica found.
#[derive(Clone, Debug)]
pub struct ReplicaFileCache {
    /// Admin-data files absent from the replica at the last missing-scan.
    pub missing_files: BTreeSet<String>,
    /// Files the replica reported at the last missing-scan.
    pub listed_files: BTreeSet<String>,
    /// Completion time of the last missing-scan; epoch if none.
    pub missing_checked_at: OffsetDateTime,

    /// Admin-data files whose checksum on the replica disagreed with admin
    /// data at the last changed-scan.
    pub changed_files: BTreeSet<String>,
    /// Checksums the replica reported at the last changed-scan.
    pub checksums: BTreeMap<String, Checksum>,
    /// Completion time of the last changed-scan; epoch if none.
    pub changed_checked_at: OffsetDateTime,
}

impl Default for ReplicaFileCache {
    fn default() -> Self {
        Self {
            missing_files: BTreeSet::new(),
            listed_files: BTreeSet::new(),
            missing_checked_at: OffsetDateTime::UNIX_EPOCH,
            changed_files: BTreeSet::new(),
            checksums: BTreeMap::new(),
            changed_checked_at: OffsetDateTime::UNIX_EPOCH,
        }
    }
}

impl ReplicaFileCache {
    pub fn has_missing_scan(&self) -> bool {
        self.missing_checked_at != OffsetDateTime::UNIX_EPOCH
    }

    pub fn has_changed_scan(&self) -> bool {
        self.changed_checked_at != OffsetDateTime::UNIX_EPOCH
    }

    pub fn missing_count(&self) -> u64 {
        self.missing_files.len() as u64
    }

    pub fn changed_count(&self) -> u64 {
        self.changed_files.len() as u64
    }

    /// Number of files the replica held at the last missing-scan.
    pub fn total_file_count(&self) -> u64 {
        self.listed_files.len() as u64
    }

    /// Presence of a file according to the last missing-scan.
    ///
    /// Files the scan did not cover (added to admin data afterwards, and not
    /// on the replica) have no status yet.
    pub fn file_status(&self, filename: &str) -> FileListStatus {
        if !self.has_missing_scan() {
            FileListStatus::NoFilelistStatus
        } else if self.listed_files.contains(filename) {
            FileListStatus::Ok
        } else if self.missing_files.contains(filename) {
            FileListStatus::Missing
        } else {
            FileListStatus::NoFilelistStatus
        }
    }

    /// Checksum correctness of a file against an expected checksum.
    pub fn checksum_status(&self, filename: &str, expected: &Checksum) -> ChecksumStatus {
        match self.checksums.get(filename) {
            Some(actual) if actual == expected => ChecksumStatus::Ok,
            Some(_) => ChecksumStatus::Corrupt,
            None => ChecksumStatus::Unknown,
        }
    }

    pub fn checksum(&self, filename: &str) -> Option<&Checksum> {
        self.checksums.get(filename)
    }

    /// Whether this replica holds a usable copy: listed, and not known to be corrupt.
    pub fn holds_good_copy(&self, filename: &str, expected: &Checksum) -> bool {
        self.file_status(filename) == FileListStatus::Ok
            && self.checksum_status(filename, expected) != ChecksumStatus::Corrupt
    }
}

/// Process-wide cache of per-replica scan results.
#[derive(Default)]
pub struct ReplicaStateCache {
    entries: DashMap<ReplicaId, Arc<ReplicaFileCache>>,
}

impl ReplicaStateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot for a replica. Replicas never scanned yield an empty cache.
    pub fn snapshot(&self, replica: &ReplicaId) -> Arc<ReplicaFileCache> {
        self.entries
            .get(replica)
            .map(|entry| Arc::clone(entry.value()))
            .unwrap_or_default()
    }

    /// Fold a completed missing-scan into the cache.
    ///
    /// `admin_files` is every filename in admin data when the scan started.
    /// Files the replica reported as failed count as absent. Returns the new
    /// snapshot, or `None` (cache untouched) if the status is degraded.
    pub fn record_missing_scan(
        &self,
        replica: &ReplicaId,
        admin_files: &BTreeSet<String>,
        status: &BatchStatus,
        checked_at: OffsetDateTime,
    ) -> Option<Arc<ReplicaFileCache>> {
        let listed = status.file_list()?;
        let present: BTreeSet<String> = listed.difference(&status.files_failed).cloned().collect();
        let missing = admin_files.difference(&present).cloned().collect();

        Some(self.replace(replica, |cache| {
            cache.missing_files = missing;
            cache.listed_files = present;
            cache.missing_checked_at = checked_at;
        }))
    }

    /// Fold a completed changed-scan into the cache.
    ///
    /// `admin_checksums` is the expected checksum of every admin-data file
    /// when the scan started. Returns `None` (cache untouched) if the status
    /// is degraded.
    pub fn record_changed_scan(
        &self,
        replica: &ReplicaId,
        admin_checksums: &BTreeMap<String, Checksum>,
        status: &BatchStatus,
        checked_at: OffsetDateTime,
    ) -> Option<Arc<ReplicaFileCache>> {
        let reported = status.checksum_list()?;
        let checksums: BTreeMap<String, Checksum> = reported
            .iter()
            .filter(|(name, _)| !status.files_failed.contains(*name))
            .map(|(name, checksum)| (name.clone(), checksum.clone()))
            .collect();
        let changed = checksums
            .iter()
            .filter(|(name, actual)| {
                admin_checksums
                    .get(*name)
                    .is_some_and(|expected| expected != *actual)
            })
            .map(|(name, _)| name.clone())
            .collect();

        Some(self.replace(replica, |cache| {
            cache.changed_files = changed;
            cache.checksums = checksums;
            cache.changed_checked_at = checked_at;
        }))
    }

    /// Drop everything cached for a replica.
    pub fn reset(&self, replica: &ReplicaId) {
        self.entries.remove(replica);
    }

    fn replace(
        &self,
        replica: &ReplicaId,
        update: impl FnOnce(&mut ReplicaFileCache),
    ) -> Arc<ReplicaFileCache> {
        let mut entry = self.entries.entry(replica.clone()).or_default();
        let mut next = ReplicaFileCache::clone(entry.value());
        update(&mut next);
        let next = Arc::new(next);
        *entry.value_mut() = Arc::clone(&next);
        next
    }
}
