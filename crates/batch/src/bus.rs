//! In-process message fabric between the engine and replica agents.
//!
//! Each registered replica has a bounded request queue. A request carries a
//! oneshot reply channel; the dispatcher waits on it for at most the job's
//! timeout.

use crate::job::BatchJob;
use crate::protocol::BatchClient;
use crate::status::BatchStatus;
use async_trait::async_trait;
use bitpres_core::ReplicaId;
use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// A job delivered to a replica agent, with its reply channel.
#[derive(Debug)]
pub struct BatchRequest {
    pub job: BatchJob,
    reply: oneshot::Sender<BatchStatus>,
}

impl BatchRequest {
    /// Send the job's status back. A dispatcher that already gave up is ignored.
    pub fn respond(self, status: BatchStatus) {
        if self.reply.send(status).is_err() {
            debug!(job_id = %self.job.id, "dispatcher gone before batch reply");
        }
    }
}

/// Routes batch jobs to per-replica agent queues.
pub struct BatchBus {
    agents: DashMap<ReplicaId, mpsc::Sender<BatchRequest>>,
    queue_depth: usize,
}

impl BatchBus {
    pub fn new(queue_depth: usize) -> Self {
        Self {
            agents: DashMap::new(),
            queue_depth: queue_depth.max(1),
        }
    }

    /// Register an agent for a replica and return its request queue.
    /// A previous registration for the same replica is replaced.
    pub fn register(&self, replica: ReplicaId) -> mpsc::Receiver<BatchRequest> {
        let (tx, rx) = mpsc::channel(self.queue_depth);
        self.agents.insert(replica, tx);
        rx
    }

    /// Drop a replica's queue. Its agent stops once the queue drains.
    pub fn unregister(&self, replica: &ReplicaId) {
        self.agents.remove(replica);
    }

    /// Close every agent queue.
    pub fn shutdown(&self) {
        self.agents.clear();
    }

    pub fn is_registered(&self, replica: &ReplicaId) -> bool {
        self.agents.contains_key(replica)
    }
}

#[async_trait]
impl BatchClient for BatchBus {
    async fn dispatch(&self, job: BatchJob, replica: &ReplicaId) -> BatchStatus {
        // Clone the sender out so no map guard is held across an await.
        let Some(sender) = self.agents.get(replica).map(|entry| entry.value().clone()) else {
            warn!(replica = %replica, job_id = %job.id, "no batch agent registered");
            return BatchStatus::degraded(replica.clone(), &job, "no batch agent registered");
        };

        let (reply, response) = oneshot::channel();
        let request = BatchRequest {
            job: job.clone(),
            reply,
        };

        let exchange = async {
            sender
                .send(request)
                .await
                .map_err(|_| "batch agent queue closed".to_string())?;
            response
                .await
                .map_err(|_| "batch agent dropped the request".to_string())
        };

        match tokio::time::timeout(job.timeout, exchange).await {
            Ok(Ok(status)) if status.job_id == job.id && &status.replica_id == replica => status,
            Ok(Ok(status)) => {
                warn!(
                    replica = %replica,
                    job_id = %job.id,
                    reply_job_id = %status.job_id,
                    "batch reply does not match request"
                );
                BatchStatus::degraded(replica.clone(), &job, "mismatched batch reply")
            }
            Ok(Err(reason)) => {
                warn!(replica = %replica, job_id = %job.id, reason = %reason, "batch job failed");
                BatchStatus::degraded(replica.clone(), &job, reason)
            }
            Err(_) => {
                warn!(
                    replica = %replica,
                    job_id = %job.id,
                    timeout_secs = job.timeout.as_secs_f64(),
                    "batch job timed out"
                );
                BatchStatus::degraded(
                    replica.clone(),
                    &job,
                    format!("timed out after {:?}", job.timeout),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::FilenameFilter;
    use crate::status::BatchResult;
    use std::collections::BTreeSet;
    use std::time::Duration;

    fn one() -> ReplicaId {
        ReplicaId::parse("ONE").unwrap()
    }

    #[tokio::test]
    async fn test_unregistered_replica_degrades() {
        let bus = BatchBus::new(4);
        let job = BatchJob::list_files(FilenameFilter::All, Duration::from_secs(1));
        let status = bus.dispatch(job, &one()).await;
        assert!(!status.complete);
        assert!(status.degraded_reason.unwrap().contains("no batch agent"));
    }

    #[tokio::test]
    async fn test_silent_agent_times_out() {
        let bus = BatchBus::new(4);
        let _rx = bus.register(one());
        let job = BatchJob::list_files(FilenameFilter::All, Duration::from_millis(50));
        let status = bus.dispatch(job, &one()).await;
        assert!(!status.complete);
        assert!(status.result.is_none());
    }

    #[tokio::test]
    async fn test_dropped_request_degrades() {
        let bus = BatchBus::new(4);
        let mut rx = bus.register(one());
        tokio::spawn(async move {
            while let Some(request) = rx.recv().await {
                drop(request);
            }
        });
        let job = BatchJob::list_files(FilenameFilter::All, Duration::from_secs(5));
        let status = bus.dispatch(job, &one()).await;
        assert_eq!(
            status.degraded_reason.as_deref(),
            Some("batch agent dropped the request")
        );
    }

    #[tokio::test]
    async fn test_reply_is_correlated() {
        let bus = BatchBus::new(4);
        let mut rx = bus.register(one());
        tokio::spawn(async move {
            while let Some(request) = rx.recv().await {
                let status = BatchStatus::completed(
                    one(),
                    request.job.id,
                    1,
                    BTreeSet::new(),
                    BatchResult::FileList(["a.arc".to_string()].into_iter().collect()),
                );
                request.respond(status);
            }
        });

        let job = BatchJob::list_files(FilenameFilter::All, Duration::from_secs(5));
        let job_id = job.id;
        let status = bus.dispatch(job, &one()).await;
        assert!(status.complete);
        assert_eq!(status.job_id, job_id);
        assert_eq!(status.file_list().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_closes_queues() {
        let bus = BatchBus::new(4);
        let mut rx = bus.register(one());
        assert!(bus.is_registered(&one()));
        bus.shutdown();
        assert!(!bus.is_registered(&one()));
        assert!(rx.recv().await.is_none());
    }
}
