//! The dispatch contract between the engine and replicas.

use crate::job::BatchJob;
use crate::status::BatchStatus;
use async_trait::async_trait;
use bitpres_core::ReplicaId;

/// Sends batch jobs to replicas.
///
/// `dispatch` never fails: a job that cannot be delivered, or whose response
/// does not arrive within `job.timeout`, resolves to a degraded status.
#[async_trait]
pub trait BatchClient: Send + Sync {
    async fn dispatch(&self, job: BatchJob, replica: &ReplicaId) -> BatchStatus;
}
