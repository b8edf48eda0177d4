//! Wiring of the daemon's long-lived services.

use crate::state::AppState;
use anyhow::{Context, Result, anyhow};
use bitpres_batch::{BatchAgent, BatchBus};
use bitpres_core::config::AppConfig;
use bitpres_engine::{ActiveBitPreservation, ScanTimeouts, spawn_scheduler};
use bitpres_storage::ReplicaSet;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Running services: shared state plus the background tasks behind it.
pub struct Services {
    pub state: AppState,
    agents: Vec<JoinHandle<()>>,
    scheduler: Option<JoinHandle<()>>,
}

impl Services {
    /// Open admin data and replica storage, start one batch agent per
    /// replica, and build the engine.
    pub async fn start(config: AppConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow!("invalid configuration: {e}"))?;
        let registry = config.registry().context("invalid replica registry")?;

        let metadata = bitpres_metadata::from_config(&config.metadata)
            .await
            .context("failed to initialize metadata store")?;
        tracing::info!("Metadata store initialized");

        let replicas = ReplicaSet::from_config(&config.replicas)
            .await
            .context("failed to open replica storage")?;
        replicas
            .health_check()
            .await
            .context("replica storage health check failed")?;
        tracing::info!(count = registry.list().len(), "Replica storage verified");

        let bus = Arc::new(BatchBus::new(config.batch.queue_depth));
        let mut agents = Vec::new();
        for backend in replicas.backends() {
            let requests = bus.register(backend.replica().id.clone());
            agents.push(BatchAgent::new(Arc::clone(backend)).spawn(requests));
        }
        tracing::info!(agents = agents.len(), "Batch agents spawned");

        let engine = Arc::new(ActiveBitPreservation::new(
            registry,
            metadata.clone(),
            bus.clone(),
            Arc::new(replicas.clone()),
            ScanTimeouts::from(&config.batch),
        ));

        let scheduler = if config.schedule.enabled {
            Some(spawn_scheduler(engine.clone(), &config.schedule))
        } else {
            tracing::info!("Automatic rescans disabled");
            None
        };

        Ok(Self {
            state: AppState {
                config: Arc::new(config),
                engine,
                metadata,
                replicas,
                bus,
            },
            agents,
            scheduler,
        })
    }

    /// Stop the scheduler and let each agent finish its current job.
    pub async fn shutdown(self) {
        if let Some(scheduler) = self.scheduler {
            scheduler.abort();
        }
        self.state.bus.shutdown();
        for agent in self.agents {
            if let Err(e) = agent.await {
                tracing::warn!(error = %e, "Batch agent ended abnormally");
            }
        }
        tracing::info!("Services stopped");
    }
}
