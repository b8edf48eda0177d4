//! Batch job protocol for the bit-preservation engine.
//!
//! Replicas are scanned by batch jobs: the engine dispatches a job to one
//! replica and waits, with a timeout, for an aggregated status. Scans can
//! legitimately take hours, and a job that cannot complete resolves to a
//! degraded status rather than an error.
//!
//! This crate provides:
//! - Job and status types
//! - The `BatchClient` dispatch contract
//! - `BatchBus`, an in-process fabric with correlated request/response
//! - `BatchAgent`, the replica-side executor

pub mod agent;
pub mod bus;
pub mod job;
pub mod protocol;
pub mod status;

pub use agent::BatchAgent;
pub use bus::{BatchBus, BatchRequest};
pub use job::{BatchJob, BatchOperation, FilenameFilter};
pub use protocol::BatchClient;
pub use status::{BatchResult, BatchStatus};
