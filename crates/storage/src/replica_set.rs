//! Per-replica storage handles and the reference-replica byte transfer.

use crate::checksum_list::{ChecksumListing, ScannedListing};
use crate::error::{StorageError, StorageResult};
use crate::traits::ArchiveStore;
use async_trait::async_trait;
use bitpres_core::config::ReplicaConfig;
use bitpres_core::{Checksum, Credentials, Replica, ReplicaId, ReplicaKind, validate_filename};
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Attempts made for a transfer that fails with an I/O error.
const TRANSFER_ATTEMPTS: u32 = 3;

/// Base delay between transfer attempts; doubled after each failure.
const TRANSFER_RETRY_DELAY: Duration = Duration::from_millis(200);

/// Byte transfer between replicas, used by repairs.
///
/// Transient I/O failures are retried here; callers see a single outcome.
#[async_trait]
pub trait ReplicaTransfer: Send + Sync {
    /// Read a file's bytes from a bit-archive replica.
    async fn fetch(&self, replica: &ReplicaId, filename: &str) -> StorageResult<Bytes>;

    /// Store a file on a replica. Never overwrites an existing file.
    async fn store(&self, replica: &ReplicaId, filename: &str, data: Bytes) -> StorageResult<()>;

    /// Remove a file from a replica. Requires credentials accepted by that replica.
    async fn remove(
        &self,
        replica: &ReplicaId,
        filename: &str,
        credentials: &Credentials,
    ) -> StorageResult<()>;
}

/// Storage for one replica.
pub struct ReplicaBackend {
    replica: Replica,
    store: Arc<dyn ArchiveStore>,
    credentials_hash: Option<String>,
    // Serializes read-modify-write cycles on a checksum archive's listing.
    listing_lock: Mutex<()>,
}

impl ReplicaBackend {
    pub fn new(
        replica: Replica,
        store: Arc<dyn ArchiveStore>,
        credentials_hash: Option<String>,
    ) -> Self {
        Self {
            replica,
            store,
            credentials_hash,
            listing_lock: Mutex::new(()),
        }
    }

    pub fn replica(&self) -> &Replica {
        &self.replica
    }

    pub fn store(&self) -> &Arc<dyn ArchiveStore> {
        &self.store
    }

    /// Check credentials against this replica's configured hash.
    ///
    /// A replica without a configured hash refuses every credential.
    pub fn authorize(&self, credentials: &Credentials) -> StorageResult<()> {
        match &self.credentials_hash {
            Some(hash) if credentials.matches_hash(hash) => Ok(()),
            Some(_) => Err(StorageError::PermissionDenied(format!(
                "credentials rejected by replica {}",
                self.replica.id
            ))),
            None => Err(StorageError::PermissionDenied(format!(
                "replica {} accepts no credentialed removals",
                self.replica.id
            ))),
        }
    }

    /// Current checksum listing of a checksum archive.
    pub async fn checksum_listing(&self) -> StorageResult<ChecksumListing> {
        self.require_kind(ReplicaKind::ChecksumArchive, "checksum listing")?;
        ChecksumListing::load(self.store.as_ref()).await
    }

    /// Checksum listing for a scan. Unusable lines are reported, not fatal.
    pub async fn scan_checksum_listing(&self) -> StorageResult<ScannedListing> {
        self.require_kind(ReplicaKind::ChecksumArchive, "checksum listing")?;
        ChecksumListing::load_for_scan(self.store.as_ref()).await
    }

    /// Read a file's bytes.
    pub async fn fetch(&self, filename: &str) -> StorageResult<Bytes> {
        validate_filename(filename)?;
        self.require_kind(ReplicaKind::BitArchive, "fetch")?;
        self.store.get(filename).await
    }

    /// Store a file. Fails with `AlreadyExists` rather than overwrite.
    pub async fn store_file(&self, filename: &str, data: Bytes) -> StorageResult<()> {
        validate_filename(filename)?;
        match self.replica.kind {
            ReplicaKind::BitArchive => {
                if self.store.put_if_not_exists(filename, data).await? {
                    Ok(())
                } else {
                    Err(StorageError::AlreadyExists(filename.to_string()))
                }
            }
            ReplicaKind::ChecksumArchive => {
                let checksum = Checksum::compute(&data);
                let _guard = self.listing_lock.lock().await;
                let mut listing = self.checksum_listing().await?;
                if !listing.insert(filename, checksum) {
                    return Err(StorageError::AlreadyExists(filename.to_string()));
                }
                listing.save(self.store.as_ref()).await
            }
        }
    }

    /// Remove a file after checking credentials.
    pub async fn remove_file(
        &self,
        filename: &str,
        credentials: &Credentials,
    ) -> StorageResult<()> {
        validate_filename(filename)?;
        self.authorize(credentials)?;
        match self.replica.kind {
            ReplicaKind::BitArchive => self.store.delete(filename).await,
            ReplicaKind::ChecksumArchive => {
                let _guard = self.listing_lock.lock().await;
                let mut listing = self.checksum_listing().await?;
                if listing.remove(filename).is_none() {
                    return Err(StorageError::NotFound(filename.to_string()));
                }
                listing.save(self.store.as_ref()).await
            }
        }
    }

    fn require_kind(&self, kind: ReplicaKind, operation: &str) -> StorageResult<()> {
        if self.replica.kind == kind {
            Ok(())
        } else {
            Err(StorageError::Unsupported(format!(
                "{operation} on {} replica {}",
                self.replica.kind, self.replica.id
            )))
        }
    }
}

/// All configured replicas' storage, keyed by replica id.
#[derive(Clone, Default)]
pub struct ReplicaSet {
    backends: HashMap<ReplicaId, Arc<ReplicaBackend>>,
}

impl ReplicaSet {
    pub fn new(backends: impl IntoIterator<Item = ReplicaBackend>) -> Self {
        Self {
            backends: backends
                .into_iter()
                .map(|b| (b.replica.id.clone(), Arc::new(b)))
                .collect(),
        }
    }

    /// Open every configured replica's storage backend.
    pub async fn from_config(configs: &[ReplicaConfig]) -> StorageResult<Self> {
        let mut backends = Vec::with_capacity(configs.len());
        for config in configs {
            let replica = config.to_replica()?;
            let store = crate::from_config(&config.storage).await?;
            info!(
                replica = %replica.id,
                kind = %replica.kind,
                backend = store.backend_name(),
                "replica storage opened"
            );
            backends.push(ReplicaBackend::new(
                replica,
                store,
                config.credentials_hash.clone(),
            ));
        }
        Ok(Self::new(backends))
    }

    pub fn get(&self, id: &ReplicaId) -> StorageResult<&Arc<ReplicaBackend>> {
        self.backends
            .get(id)
            .ok_or_else(|| StorageError::UnknownReplica(id.to_string()))
    }

    pub fn backends(&self) -> impl Iterator<Item = &Arc<ReplicaBackend>> {
        self.backends.values()
    }

    /// Check every replica's storage, reporting the first failure.
    pub async fn health_check(&self) -> StorageResult<()> {
        for backend in self.backends.values() {
            backend.store.health_check().await.inspect_err(|e| {
                warn!(replica = %backend.replica.id, error = %e, "replica storage unhealthy");
            })?;
        }
        Ok(())
    }
}

async fn with_retries<T, F, Fut>(what: &str, replica: &ReplicaId, mut op: F) -> StorageResult<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = StorageResult<T>>,
{
    let mut delay = TRANSFER_RETRY_DELAY;
    let mut attempt = 1;
    loop {
        match op().await {
            Err(StorageError::Io(e)) if attempt < TRANSFER_ATTEMPTS => {
                debug!(replica = %replica, attempt, error = %e, "{what} failed, retrying");
                tokio::time::sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
            other => return other,
        }
    }
}

#[async_trait]
impl ReplicaTransfer for ReplicaSet {
    async fn fetch(&self, replica: &ReplicaId, filename: &str) -> StorageResult<Bytes> {
        let backend: &ReplicaBackend = self.get(replica)?;
        with_retries("fetch", replica, move || backend.fetch(filename)).await
    }

    async fn store(&self, replica: &ReplicaId, filename: &str, data: Bytes) -> StorageResult<()> {
        let backend: &ReplicaBackend = self.get(replica)?;
        with_retries("store", replica, move || {
            backend.store_file(filename, data.clone())
        })
        .await
    }

    async fn remove(
        &self,
        replica: &ReplicaId,
        filename: &str,
        credentials: &Credentials,
    ) -> StorageResult<()> {
        let backend: &ReplicaBackend = self.get(replica)?;
        with_retries("remove", replica, move || {
            backend.remove_file(filename, credentials)
        })
        .await
    }
}
