//! Batch job results.

use crate::job::{BatchJob, FilenameFilter};
use bitpres_core::{Checksum, ReplicaId};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// The artifact a completed job produces.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BatchResult {
    /// Filenames held by the replica.
    FileList(BTreeSet<String>),
    /// Checksum per filename.
    ChecksumList(BTreeMap<String, Checksum>),
}

/// Aggregated outcome of one batch job on one replica.
#[derive(Clone, Debug)]
pub struct BatchStatus {
    pub replica_id: ReplicaId,
    pub job_id: Uuid,
    /// Files the replica attempted.
    pub files_processed: u64,
    /// Files that errored; they are absent from the result.
    pub files_failed: BTreeSet<String>,
    pub result: Option<BatchResult>,
    /// False when the job did not run to completion (timeout, no agent,
    /// unreadable listing). Such a status carries no new information.
    pub complete: bool,
    /// Why the job did not complete.
    pub degraded_reason: Option<String>,
}

impl BatchStatus {
    pub fn completed(
        replica_id: ReplicaId,
        job_id: Uuid,
        files_processed: u64,
        files_failed: BTreeSet<String>,
        result: BatchResult,
    ) -> Self {
        Self {
            replica_id,
            job_id,
            files_processed,
            files_failed,
            result: Some(result),
            complete: true,
            degraded_reason: None,
        }
    }

    /// A status for a job that produced nothing usable.
    ///
    /// Every file the job named explicitly is marked failed.
    pub fn degraded(replica_id: ReplicaId, job: &BatchJob, reason: impl Into<String>) -> Self {
        let files_failed = match &job.filter {
            FilenameFilter::Names(names) => names.clone(),
            FilenameFilter::All | FilenameFilter::Prefix(_) => BTreeSet::new(),
        };
        Self {
            replica_id,
            job_id: job.id,
            files_processed: 0,
            files_failed,
            result: None,
            complete: false,
            degraded_reason: Some(reason.into()),
        }
    }

    /// The file listing, if this is a completed ListFiles status.
    pub fn file_list(&self) -> Option<&BTreeSet<String>> {
        match (&self.result, self.complete) {
            (Some(BatchResult::FileList(files)), true) => Some(files),
            _ => None,
        }
    }

    /// The checksum listing, if this is a completed ChecksumAll status.
    pub fn checksum_list(&self) -> Option<&BTreeMap<String, Checksum>> {
        match (&self.result, self.complete) {
            (Some(BatchResult::ChecksumList(checksums)), true) => Some(checksums),
            _ => None,
        }
    }
}
