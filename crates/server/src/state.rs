//! Application state shared across handlers.

use bitpres_batch::BatchBus;
use bitpres_core::config::AppConfig;
use bitpres_engine::ActiveBitPreservation;
use bitpres_metadata::MetadataStore;
use bitpres_storage::ReplicaSet;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// The reconciliation engine.
    pub engine: Arc<ActiveBitPreservation>,
    /// Admin data store.
    pub metadata: Arc<dyn MetadataStore>,
    /// Replica storage handles.
    pub replicas: ReplicaSet,
    /// Batch fabric the replica agents listen on.
    pub bus: Arc<BatchBus>,
}
