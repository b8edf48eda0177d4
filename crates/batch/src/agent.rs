//! Replica-side batch job executor.

use crate::bus::BatchRequest;
use crate::job::{BatchJob, BatchOperation};
use crate::status::{BatchResult, BatchStatus};
use bitpres_core::{Checksum, ReplicaKind};
use bitpres_storage::{ReplicaBackend, StorageResult};
use futures::StreamExt;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Runs batch jobs against one replica's storage, one job at a time.
pub struct BatchAgent {
    backend: Arc<ReplicaBackend>,
}

impl BatchAgent {
    pub fn new(backend: Arc<ReplicaBackend>) -> Self {
        Self { backend }
    }

    /// Serve requests until the queue closes.
    pub async fn run(self, mut requests: mpsc::Receiver<BatchRequest>) {
        let replica = self.backend.replica().id.clone();
        info!(replica = %replica, "batch agent started");
        while let Some(request) = requests.recv().await {
            let status = self.execute(&request.job).await;
            request.respond(status);
        }
        info!(replica = %replica, "batch agent stopped");
    }

    /// Start the agent in a background task.
    pub fn spawn(self, requests: mpsc::Receiver<BatchRequest>) -> JoinHandle<()> {
        tokio::spawn(self.run(requests))
    }

    /// Execute one job.
    ///
    /// Per-file read failures are recorded in the status without aborting
    /// the job. A replica whose file listing cannot be read at all yields a
    /// degraded status.
    pub async fn execute(&self, job: &BatchJob) -> BatchStatus {
        let replica = &self.backend.replica().id;
        let started = Instant::now();
        debug!(
            replica = %replica,
            job_id = %job.id,
            operation = %job.operation,
            "executing batch job"
        );

        let outcome = match (self.backend.replica().kind, job.operation) {
            (ReplicaKind::BitArchive, BatchOperation::ListFiles) => self.list_stored(job).await,
            (ReplicaKind::BitArchive, BatchOperation::ChecksumAll) => self.digest_stored(job).await,
            (ReplicaKind::ChecksumArchive, operation) => self.read_listing(job, operation).await,
        };

        match outcome {
            Ok((processed, failed, result)) => {
                debug!(
                    replica = %replica,
                    job_id = %job.id,
                    processed,
                    failed = failed.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "batch job finished"
                );
                BatchStatus::completed(replica.clone(), job.id, processed, failed, result)
            }
            Err(e) => {
                warn!(replica = %replica, job_id = %job.id, error = %e, "batch job aborted");
                BatchStatus::degraded(replica.clone(), job, format!("listing failed: {e}"))
            }
        }
    }

    async fn stored_names(&self, job: &BatchJob) -> StorageResult<Vec<String>> {
        let mut keys = self.backend.store().list_stream("").await?;
        let mut names = Vec::new();
        while let Some(key) = keys.next().await {
            let key = key?;
            if job.filter.matches(&key) {
                names.push(key);
            }
        }
        Ok(names)
    }

    async fn list_stored(
        &self,
        job: &BatchJob,
    ) -> StorageResult<(u64, BTreeSet<String>, BatchResult)> {
        let names: BTreeSet<String> = self.stored_names(job).await?.into_iter().collect();
        Ok((names.len() as u64, BTreeSet::new(), BatchResult::FileList(names)))
    }

    async fn digest_stored(
        &self,
        job: &BatchJob,
    ) -> StorageResult<(u64, BTreeSet<String>, BatchResult)> {
        let names = self.stored_names(job).await?;
        let mut checksums = BTreeMap::new();
        let mut failed = BTreeSet::new();
        for name in &names {
            match self.digest(name).await {
                Ok(checksum) => {
                    checksums.insert(name.clone(), checksum);
                }
                Err(e) => {
                    warn!(
                        replica = %self.backend.replica().id,
                        filename = %name,
                        error = %e,
                        "checksum failed"
                    );
                    failed.insert(name.clone());
                }
            }
        }
        Ok((
            names.len() as u64,
            failed,
            BatchResult::ChecksumList(checksums),
        ))
    }

    async fn digest(&self, filename: &str) -> StorageResult<Checksum> {
        let mut stream = self.backend.store().get_stream(filename).await?;
        let mut hasher = Checksum::hasher();
        while let Some(chunk) = stream.next().await {
            hasher.update(&chunk?);
        }
        Ok(hasher.finalize())
    }

    async fn read_listing(
        &self,
        job: &BatchJob,
        operation: BatchOperation,
    ) -> StorageResult<(u64, BTreeSet<String>, BatchResult)> {
        let scanned = self.backend.scan_checksum_listing().await?;
        for rejected in &scanned.rejected {
            warn!(
                replica = %self.backend.replica().id,
                line = rejected.line,
                filename = ?rejected.filename,
                reason = %rejected.reason,
                "unusable checksum listing line"
            );
        }

        let failed: BTreeSet<String> = scanned
            .rejected_files()
            .into_iter()
            .filter(|name| job.filter.matches(name))
            .collect();
        let entries: BTreeMap<String, Checksum> = scanned
            .listing
            .iter()
            .filter(|(name, _)| job.filter.matches(name))
            .map(|(name, checksum)| (name.to_string(), checksum.clone()))
            .collect();
        let processed = (entries.len() + failed.len()) as u64;
        let result = match operation {
            BatchOperation::ListFiles => BatchResult::FileList(
                entries.into_keys().chain(failed.iter().cloned()).collect(),
            ),
            BatchOperation::ChecksumAll => BatchResult::ChecksumList(entries),
        };
        Ok((processed, failed, result))
    }
}
