//! Periodic rescans of every replica.

use crate::engine::{ActiveBitPreservation, ScanOutcome};
use bitpres_core::config::{ScheduleConfig, ScheduledScan};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, warn};

/// Spawn the scan loop. The first run happens one interval after start.
///
/// A run that outlasts the interval delays the next tick rather than
/// overlapping it. Abort the handle to stop the loop.
pub fn spawn_scheduler(
    engine: Arc<ActiveBitPreservation>,
    config: &ScheduleConfig,
) -> JoinHandle<()> {
    let interval = config.interval();
    let jobs = config.jobs.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(interval_secs = interval.as_secs(), ?jobs, "scan scheduler started");

        loop {
            ticker.tick().await;
            run_scheduled_scans(&engine, &jobs).await;
        }
    })
}

/// Run each configured scan against every replica, one after another.
///
/// Returns the number of scans that completed.
pub async fn run_scheduled_scans(engine: &ActiveBitPreservation, jobs: &[ScheduledScan]) -> usize {
    let started = std::time::Instant::now();
    let mut completed = 0;
    for replica in engine.list_replicas() {
        for job in jobs {
            let result = match job {
                ScheduledScan::Missing => engine.find_missing_files(&replica.id).await,
                ScheduledScan::Changed => engine.find_changed_files(&replica.id).await,
            };
            match result {
                Ok(ScanOutcome::Completed { .. }) => completed += 1,
                Ok(ScanOutcome::Degraded { .. }) => {}
                Err(e) => {
                    warn!(replica = %replica.id, scan = ?job, error = %e, "scheduled scan failed")
                }
            }
        }
    }
    info!(
        completed,
        elapsed_secs = started.elapsed().as_secs_f64(),
        "scheduled scans finished"
    );
    completed
}
