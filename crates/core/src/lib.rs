//! Core domain types and shared logic for the bit-preservation engine.
//!
//! This crate defines the canonical data model used across all other crates:
//! - Replica identities, kinds and the configured replica registry
//! - Per-file and per-replica status enums
//! - Admin records and their per-replica acknowledgment state
//! - Checksums and operator credentials
//! - Application configuration

pub mod admin;
pub mod checksum;
pub mod config;
pub mod credentials;
pub mod error;
pub mod filename;
pub mod replica;
pub mod status;

pub use admin::AdminRecord;
pub use checksum::{Checksum, ChecksumHasher};
pub use credentials::Credentials;
pub use error::{Error, Result};
pub use filename::validate_filename;
pub use replica::{Replica, ReplicaId, ReplicaKind, ReplicaRegistry};
pub use status::{ChecksumStatus, FileListStatus, ReplicaStoreState};

/// Separator between filename and checksum in checksum listings.
pub const CHECKSUM_SEPARATOR: &str = "##";
