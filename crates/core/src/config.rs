//! Configuration types shared across crates.

use crate::credentials::is_valid_secret_hash;
use crate::replica::{Replica, ReplicaId, ReplicaKind, ReplicaRegistry};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8380").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Enable the /metrics endpoint for Prometheus scraping (default: true).
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

fn default_bind() -> String {
    "127.0.0.1:8380".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

/// Operator token configuration.
///
/// Every mutating operator endpoint (scans, repairs, admin-data corrections)
/// requires a bearer token whose SHA-256 matches `token_hash`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Pre-computed hash of the admin token (SHA256 hex, 64 characters).
    /// Generate with: `echo -n "your-secret-token" | sha256sum`
    pub token_hash: String,
}

impl AdminConfig {
    /// Create a test configuration with a dummy token hash.
    ///
    /// **For testing only.** The hash is deterministic but not a real token.
    pub fn for_testing() -> Self {
        Self {
            // SHA256 of "test-admin-token"
            token_hash: "17d6bfe05d1b1fb7bc499f8e3f639c7b3eda4c40f321eef8887a0c04c89a99c5"
                .to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if !is_valid_secret_hash(&self.token_hash) {
            return Err("admin.token_hash must be a 64-character SHA-256 hex digest".to_string());
        }
        Ok(())
    }
}

/// Storage backend configuration for one replica.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Local filesystem storage.
    Filesystem {
        /// Root directory for storage.
        path: PathBuf,
    },
}

impl StorageConfig {
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::Filesystem { path } => {
                if path.as_os_str().is_empty() {
                    return Err("filesystem storage path cannot be empty".to_string());
                }
            }
        }
        Ok(())
    }
}

/// One configured replica.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReplicaConfig {
    /// Replica identity.
    pub id: String,
    /// Human-readable name (defaults to the id).
    #[serde(default)]
    pub name: Option<String>,
    /// What the replica stores.
    pub kind: ReplicaKind,
    /// Where the replica's content lives.
    pub storage: StorageConfig,
    /// SHA-256 hex of the credential that authorizes removing files from
    /// this replica. Without it, credentialed removals are always refused.
    #[serde(default)]
    pub credentials_hash: Option<String>,
}

impl ReplicaConfig {
    /// Build the registry entry for this replica.
    pub fn to_replica(&self) -> crate::Result<Replica> {
        let id = ReplicaId::parse(&self.id)?;
        let name = self.name.clone().unwrap_or_else(|| self.id.clone());
        Ok(Replica::new(id, name, self.kind))
    }
}

/// Metadata (admin data) store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetadataConfig {
    /// SQLite database.
    Sqlite {
        /// Path to the database file.
        path: PathBuf,
        /// Advisory query timeout in seconds (default: 600).
        #[serde(default = "default_sqlite_query_timeout_secs")]
        query_timeout_secs: Option<u64>,
    },
}

fn default_sqlite_query_timeout_secs() -> Option<u64> {
    Some(600)
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: PathBuf::from("./data/admin.db"),
            query_timeout_secs: default_sqlite_query_timeout_secs(),
        }
    }
}

/// Batch job configuration.
///
/// Replica scans read terabytes of content, so timeouts are measured in hours.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Timeout for file-listing jobs in seconds (default: 24 hours).
    #[serde(default = "default_list_files_timeout_secs")]
    pub list_files_timeout_secs: u64,
    /// Timeout for checksum jobs in seconds (default: 48 hours).
    #[serde(default = "default_checksum_timeout_secs")]
    pub checksum_timeout_secs: u64,
    /// Pending requests each replica agent accepts before senders wait.
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,
}

fn default_list_files_timeout_secs() -> u64 {
    86_400
}

fn default_checksum_timeout_secs() -> u64 {
    172_800
}

fn default_queue_depth() -> usize {
    16
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            list_files_timeout_secs: default_list_files_timeout_secs(),
            checksum_timeout_secs: default_checksum_timeout_secs(),
            queue_depth: default_queue_depth(),
        }
    }
}

impl BatchConfig {
    pub fn list_files_timeout(&self) -> Duration {
        Duration::from_secs(self.list_files_timeout_secs)
    }

    pub fn checksum_timeout(&self) -> Duration {
        Duration::from_secs(self.checksum_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.list_files_timeout_secs == 0 {
            return Err("batch.list_files_timeout_secs must be > 0".to_string());
        }
        if self.checksum_timeout_secs == 0 {
            return Err("batch.checksum_timeout_secs must be > 0".to_string());
        }
        if self.queue_depth == 0 {
            return Err("batch.queue_depth must be > 0".to_string());
        }
        Ok(())
    }
}

/// A scan kind the scheduler can run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduledScan {
    /// Refresh the missing-files cache.
    Missing,
    /// Refresh the changed-files cache.
    Changed,
}

/// Automatic rescan configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Run scans automatically (default: false).
    #[serde(default)]
    pub enabled: bool,
    /// Interval between scheduled runs in seconds (default: 24 hours).
    #[serde(default = "default_schedule_interval_secs")]
    pub interval_secs: u64,
    /// Which scans to run on every tick (default: both).
    #[serde(default = "default_scheduled_scans")]
    pub jobs: Vec<ScheduledScan>,
}

fn default_schedule_interval_secs() -> u64 {
    86_400
}

fn default_scheduled_scans() -> Vec<ScheduledScan> {
    vec![ScheduledScan::Missing, ScheduledScan::Changed]
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: default_schedule_interval_secs(),
            jobs: default_scheduled_scans(),
        }
    }
}

impl ScheduleConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.enabled {
            return Ok(());
        }
        if self.interval_secs < 60 {
            return Err(format!(
                "schedule.interval_secs={} is too short; use at least 60 seconds",
                self.interval_secs
            ));
        }
        if self.jobs.is_empty() {
            return Err("schedule.jobs cannot be empty when scheduling is enabled".to_string());
        }
        Ok(())
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Operator token configuration (required).
    pub admin: AdminConfig,
    /// Admin data store configuration.
    #[serde(default)]
    pub metadata: MetadataConfig,
    /// Replicas in reference priority order.
    pub replicas: Vec<ReplicaConfig>,
    /// Batch job configuration.
    #[serde(default)]
    pub batch: BatchConfig,
    /// Automatic rescan configuration.
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

impl AppConfig {
    /// Validate the full configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.admin.validate()?;
        self.batch.validate()?;
        self.schedule.validate()?;

        if self.replicas.is_empty() {
            return Err("at least one replica must be configured".to_string());
        }
        let mut ids = HashSet::new();
        for replica in &self.replicas {
            ReplicaId::parse(&replica.id)
                .map_err(|e| format!("replicas[{}]: {e}", replica.id))?;
            if !ids.insert(replica.id.as_str()) {
                return Err(format!("duplicate replica id: {}", replica.id));
            }
            replica
                .storage
                .validate()
                .map_err(|e| format!("replicas[{}]: {e}", replica.id))?;
            if let Some(hash) = &replica.credentials_hash
                && !is_valid_secret_hash(hash)
            {
                return Err(format!(
                    "replicas[{}].credentials_hash must be a 64-character SHA-256 hex digest",
                    replica.id
                ));
            }
        }
        Ok(())
    }

    /// Build the replica registry from the configured replicas.
    pub fn registry(&self) -> crate::Result<ReplicaRegistry> {
        let replicas = self
            .replicas
            .iter()
            .map(ReplicaConfig::to_replica)
            .collect::<crate::Result<Vec<_>>>()?;
        ReplicaRegistry::new(replicas)
    }

    /// Create a test configuration with sensible defaults.
    ///
    /// **For testing only.** Two filesystem bit archives and one checksum
    /// archive under `./data`, SQLite admin data, and a dummy admin token.
    pub fn for_testing() -> Self {
        let replica = |id: &str, kind: ReplicaKind| ReplicaConfig {
            id: id.to_string(),
            name: None,
            kind,
            storage: StorageConfig::Filesystem {
                path: PathBuf::from(format!("./data/replicas/{id}")),
            },
            credentials_hash: None,
        };
        Self {
            server: ServerConfig::default(),
            admin: AdminConfig::for_testing(),
            metadata: MetadataConfig::default(),
            replicas: vec![
                replica("ONE", ReplicaKind::BitArchive),
                replica("TWO", ReplicaKind::BitArchive),
                replica("CS", ReplicaKind::ChecksumArchive),
            ],
            batch: BatchConfig::default(),
            schedule: ScheduleConfig::default(),
        }
    }
}
