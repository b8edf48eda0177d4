//! Corrections flowing from replicas back into admin data.

use crate::engine::ActiveBitPreservation;
use crate::error::EngineResult;
use crate::repair::{RepairOutcome, RepairReport, SkipReason};
use bitpres_core::{
    AdminRecord, Checksum, ChecksumStatus, FileListStatus, ReplicaId, ReplicaStoreState,
    validate_filename,
};
use bitpres_metadata::AdminDataStore;
use std::collections::{BTreeMap, BTreeSet};
use time::OffsetDateTime;
use tracing::info;

impl ActiveBitPreservation {
    /// Files some replica holds that admin data does not know, with the
    /// replicas that reported each one.
    pub async fn get_missing_files_for_admin_data(
        &self,
    ) -> EngineResult<BTreeMap<String, BTreeSet<ReplicaId>>> {
        let known: BTreeSet<String> =
            self.admin.list_admin_filenames().await?.into_iter().collect();

        let mut unknown: BTreeMap<String, BTreeSet<ReplicaId>> = BTreeMap::new();
        for replica in self.registry.list() {
            let cache = self.cache.snapshot(&replica.id);
            let reported = cache
                .listed_files
                .iter()
                .chain(cache.checksums.keys())
                .filter(|name| !known.contains(*name));
            for name in reported {
                unknown
                    .entry(name.clone())
                    .or_default()
                    .insert(replica.id.clone());
            }
        }
        Ok(unknown)
    }

    /// Admin-data files whose checksum every reporting replica contradicts
    /// with one agreed value, mapped to that value.
    pub async fn get_changed_files_for_admin_data(
        &self,
    ) -> EngineResult<BTreeMap<String, Checksum>> {
        let admin = self.admin.list_admin_checksums().await?;
        Ok(admin
            .into_iter()
            .filter_map(|(name, expected)| {
                self.agreed_checksum(&name)
                    .filter(|agreed| *agreed != expected)
                    .map(|agreed| (name, agreed))
            })
            .collect())
    }

    /// Create admin records for files the replicas hold but admin data lacks.
    ///
    /// The checksum comes from the replicas' cached checksums, which must
    /// all agree. Existing records are never replaced.
    pub async fn add_missing_files_to_admin_data<S: AsRef<str>>(
        &self,
        filenames: &[S],
    ) -> EngineResult<RepairReport> {
        let mut report = RepairReport::default();
        for filename in filenames {
            let filename = filename.as_ref();
            if report.outcomes.contains_key(filename) {
                continue;
            }
            let outcome = self.add_one(filename).await;
            report.insert("admin_add", filename, outcome);
        }
        Ok(report)
    }

    async fn add_one(&self, filename: &str) -> RepairOutcome {
        if validate_filename(filename).is_err() {
            return RepairOutcome::Skipped {
                reason: SkipReason::InvalidFilename,
            };
        }
        match self.admin.get_admin_record(filename).await {
            Ok(None) => {}
            Ok(Some(_)) => {
                return RepairOutcome::Skipped {
                    reason: SkipReason::AlreadyInAdminData,
                };
            }
            Err(e) => {
                return RepairOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        }

        let holders: Vec<ReplicaId> = self
            .registry
            .list()
            .iter()
            .filter(|r| {
                let cache = self.cache.snapshot(&r.id);
                cache.listed_files.contains(filename) || cache.checksums.contains_key(filename)
            })
            .map(|r| r.id.clone())
            .collect();
        if holders.is_empty() {
            return RepairOutcome::Skipped {
                reason: SkipReason::NotOnAnyReplica,
            };
        }

        let mut checksums = self.reported_checksums(filename).into_keys();
        let checksum = match (checksums.next(), checksums.next()) {
            (Some(checksum), None) => checksum,
            (None, _) => {
                return RepairOutcome::Skipped {
                    reason: SkipReason::NoChecksum,
                };
            }
            (Some(_), Some(_)) => {
                return RepairOutcome::Skipped {
                    reason: SkipReason::ConflictingChecksums,
                };
            }
        };

        let record = match AdminRecord::new(filename, checksum, OffsetDateTime::now_utc()) {
            Ok(record) => holders.into_iter().fold(record, |record, id| {
                record.with_state(id, ReplicaStoreState::UploadCompleted)
            }),
            Err(e) => {
                return RepairOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        };
        match self.admin.add_admin_record(&record).await {
            Ok(true) => RepairOutcome::Repaired,
            Ok(false) => RepairOutcome::Skipped {
                reason: SkipReason::AlreadyInAdminData,
            },
            Err(e) => RepairOutcome::Failed {
                reason: e.to_string(),
            },
        }
    }

    /// Bring a record's per-replica states in line with the cached scans.
    ///
    /// Replicas the scans show holding a good copy become `UPLOAD_COMPLETED`,
    /// replicas missing the file or holding a corrupt copy become
    /// `UPLOAD_FAILED`, and replicas without scan data keep their state. If
    /// every replica that reported a checksum agrees on a value other than
    /// the recorded one, that value replaces it first.
    pub async fn change_state_for_admin_data(
        &self,
        filename: &str,
    ) -> EngineResult<Option<AdminRecord>> {
        if validate_filename(filename).is_err() {
            return Ok(None);
        }
        let Some(mut record) = self.admin.get_admin_record(filename).await? else {
            return Ok(None);
        };

        if let Some(agreed) = self.agreed_checksum(filename)
            && agreed != record.checksum
        {
            info!(filename, old = %record.checksum, new = %agreed, "admin checksum replaced");
            record.checksum = agreed;
        }

        for replica in self.registry.list() {
            let cache = self.cache.snapshot(&replica.id);
            let file_status = cache.file_status(filename);
            let checksum_status = cache.checksum_status(filename, &record.checksum);
            let state = if file_status == FileListStatus::Missing
                || checksum_status == ChecksumStatus::Corrupt
            {
                ReplicaStoreState::UploadFailed
            } else if file_status == FileListStatus::Ok || checksum_status == ChecksumStatus::Ok {
                ReplicaStoreState::UploadCompleted
            } else {
                continue;
            };
            record.replica_states.insert(replica.id.clone(), state);
        }

        self.admin.put_admin_record(&record).await?;
        info!(filename, "admin states recomputed");
        Ok(Some(record))
    }

    /// Distinct cached checksums for a file, with the replicas reporting each.
    fn reported_checksums(&self, filename: &str) -> BTreeMap<Checksum, BTreeSet<ReplicaId>> {
        let mut reported: BTreeMap<Checksum, BTreeSet<ReplicaId>> = BTreeMap::new();
        for replica in self.registry.list() {
            if let Some(checksum) = self.cache.snapshot(&replica.id).checksum(filename) {
                reported
                    .entry(checksum.clone())
                    .or_default()
                    .insert(replica.id.clone());
            }
        }
        reported
    }

    fn agreed_checksum(&self, filename: &str) -> Option<Checksum> {
        let mut reported = self.reported_checksums(filename).into_keys();
        match (reported.next(), reported.next()) {
            (Some(agreed), None) => Some(agreed),
            _ => None,
        }
    }
}
