//! The computed, per-file preservation view.

use crate::cache::ReplicaFileCache;
use bitpres_core::{
    AdminRecord, Checksum, ChecksumStatus, FileListStatus, Replica, ReplicaId, ReplicaKind,
    ReplicaStoreState,
};
use serde::Serialize;

/// One replica's view of a file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReplicaPreservation {
    pub replica_id: ReplicaId,
    pub kind: ReplicaKind,
    pub file_status: FileListStatus,
    pub checksum_status: ChecksumStatus,
    /// Checksum the replica reported at its last changed-scan.
    pub cached_checksum: Option<Checksum>,
    /// What admin data has acknowledged for this replica.
    pub admin_state: Option<ReplicaStoreState>,
}

/// Admin record merged with every replica's cached scan results.
///
/// Never stored; rebuilt from the cache on every request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PreservationState {
    pub filename: String,
    pub admin: AdminRecord,
    /// One entry per registered replica, in registry order.
    pub replicas: Vec<ReplicaPreservation>,
}

impl PreservationState {
    pub(crate) fn build<'a>(
        admin: AdminRecord,
        replicas: impl IntoIterator<Item = (&'a Replica, &'a ReplicaFileCache)>,
    ) -> Self {
        let filename = admin.filename.clone();
        let replicas = replicas
            .into_iter()
            .map(|(replica, cache)| ReplicaPreservation {
                replica_id: replica.id.clone(),
                kind: replica.kind,
                file_status: cache.file_status(&filename),
                checksum_status: cache.checksum_status(&filename, &admin.checksum),
                cached_checksum: cache.checksum(&filename).cloned(),
                admin_state: admin.state_for(&replica.id),
            })
            .collect();
        Self {
            filename,
            admin,
            replicas,
        }
    }

    pub fn replica(&self, id: &ReplicaId) -> Option<&ReplicaPreservation> {
        self.replicas.iter().find(|r| &r.replica_id == id)
    }

    /// Replicas where the file is missing or corrupt.
    pub fn problem_replicas(&self) -> impl Iterator<Item = &ReplicaPreservation> {
        self.replicas.iter().filter(|r| {
            r.file_status == FileListStatus::Missing || r.checksum_status == ChecksumStatus::Corrupt
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use time::OffsetDateTime;

    #[test]
    fn test_build_merges_admin_and_cache() {
        let good = Checksum::compute(b"good");
        let one = Replica::new(ReplicaId::parse("ONE").unwrap(), "one", ReplicaKind::BitArchive);
        let two = Replica::new(ReplicaId::parse("TWO").unwrap(), "two", ReplicaKind::BitArchive);
        let admin = AdminRecord::new("a.arc", good.clone(), OffsetDateTime::UNIX_EPOCH)
            .unwrap()
            .with_state(one.id.clone(), ReplicaStoreState::UploadCompleted);

        let mut scanned = ReplicaFileCache {
            missing_checked_at: OffsetDateTime::now_utc(),
            changed_checked_at: OffsetDateTime::now_utc(),
            ..Default::default()
        };
        scanned.listed_files = BTreeSet::from(["a.arc".to_string()]);
        scanned
            .checksums
            .insert("a.arc".to_string(), Checksum::compute(b"bad"));
        let unscanned = ReplicaFileCache::default();

        let state = PreservationState::build(admin, [(&one, &scanned), (&two, &unscanned)]);

        let on_one = state.replica(&one.id).unwrap();
        assert_eq!(on_one.file_status, FileListStatus::Ok);
        assert_eq!(on_one.checksum_status, ChecksumStatus::Corrupt);
        assert_eq!(on_one.admin_state, Some(ReplicaStoreState::UploadCompleted));

        let on_two = state.replica(&two.id).unwrap();
        assert_eq!(on_two.file_status, FileListStatus::NoFilelistStatus);
        assert_eq!(on_two.checksum_status, ChecksumStatus::Unknown);
        assert_eq!(on_two.admin_state, None);

        assert_eq!(state.problem_replicas().count(), 1);

        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["replicas"][0]["file_status"], "OK");
        assert_eq!(json["replicas"][0]["checksum_status"], "CORRUPT");
    }
}
