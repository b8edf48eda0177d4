//! Reconciliation engine for bit preservation.
//!
//! [`ActiveBitPreservation`] compares what admin data says each replica
//! should hold with what the replicas last reported, and repairs the
//! differences in either direction:
//! - scans (`find_missing_files`, `find_changed_files`) refresh the
//!   per-replica cache through the batch protocol
//! - queries answer from that cache without touching a replica
//! - repairs copy good data onto a replica, or correct admin data from
//!   what the replicas agree on

pub mod admin_data;
pub mod cache;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod preservation;
pub mod repair;
pub mod scheduler;

pub use cache::{ReplicaFileCache, ReplicaStateCache};
pub use engine::{ActiveBitPreservation, ReplicaSummary, ScanKind, ScanOutcome, ScanTimeouts};
pub use error::{EngineError, EngineResult};
pub use preservation::{PreservationState, ReplicaPreservation};
pub use repair::{RepairOutcome, RepairReport, SkipReason};
pub use scheduler::{run_scheduled_scans, spawn_scheduler};
