//! Test doubles for engine collaborators.

use async_trait::async_trait;
use bitpres_batch::{BatchClient, BatchJob, BatchStatus};
use bitpres_core::ReplicaId;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Batch client that counts concurrent and total dispatches.
#[allow(dead_code)]
pub struct CountingClient {
    inner: Arc<dyn BatchClient>,
    pub dispatched: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

#[allow(dead_code)]
impl CountingClient {
    pub fn wrap(inner: Arc<dyn BatchClient>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            dispatched: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl BatchClient for CountingClient {
    async fn dispatch(&self, job: BatchJob, replica: &ReplicaId) -> BatchStatus {
        self.dispatched.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let status = self.inner.dispatch(job, replica).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        status
    }
}
