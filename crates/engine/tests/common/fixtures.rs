//! A complete engine over temp-dir replicas and a temp-dir admin database.

use bitpres_batch::{BatchAgent, BatchBus, BatchClient, BatchRequest};
use bitpres_core::credentials::hash_secret;
use bitpres_core::{AdminRecord, Checksum, Replica, ReplicaId, ReplicaKind, ReplicaRegistry};
use bitpres_engine::{ActiveBitPreservation, ScanTimeouts};
use bitpres_metadata::{AdminDataStore, MetadataStore, SqliteStore};
use bitpres_storage::{
    ArchiveStore, ChecksumListing, FilesystemBackend, ReplicaBackend, ReplicaSet,
};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use time::OffsetDateTime;
use tokio::sync::mpsc;

/// Secret accepted by every test replica.
#[allow(dead_code)]
pub const CREDENTIALS: &str = "test-credentials";

/// Bit archives `ONE` and `TWO`, checksum archive `CS`.
#[allow(dead_code)]
pub const REPLICAS: [(&str, ReplicaKind); 3] = [
    ("ONE", ReplicaKind::BitArchive),
    ("TWO", ReplicaKind::BitArchive),
    ("CS", ReplicaKind::ChecksumArchive),
];

#[allow(dead_code)]
pub fn id(s: &str) -> ReplicaId {
    ReplicaId::parse(s).unwrap()
}

/// Engine wired to real collaborators, cleaned up on drop.
#[allow(dead_code)]
pub struct TestEngine {
    pub engine: Arc<ActiveBitPreservation>,
    pub admin: Arc<SqliteStore>,
    pub replicas: ReplicaSet,
    pub bus: Arc<BatchBus>,
    /// Queues of replicas whose agent never answers.
    silent: Vec<mpsc::Receiver<BatchRequest>>,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestEngine {
    pub async fn new() -> Self {
        Self::start(&[], Duration::from_secs(10)).await
    }

    /// Build the engine. Replicas named in `silent` accept jobs but never reply.
    pub async fn start(silent: &[&str], timeout: Duration) -> Self {
        Self::start_with(silent, timeout, |bus| bus as Arc<dyn BatchClient>).await
    }

    /// Like [`TestEngine::start`], with the engine's batch client wrapped.
    pub async fn start_with(
        silent: &[&str],
        timeout: Duration,
        client: impl FnOnce(Arc<BatchBus>) -> Arc<dyn BatchClient>,
    ) -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let admin = Arc::new(
            SqliteStore::new(temp_dir.path().join("admin.db"), None)
                .await
                .unwrap(),
        );

        let mut backends = Vec::new();
        for (name, kind) in REPLICAS {
            let store: Arc<dyn ArchiveStore> = Arc::new(
                FilesystemBackend::new(temp_dir.path().join("replicas").join(name))
                    .await
                    .unwrap(),
            );
            backends.push(ReplicaBackend::new(
                Replica::new(id(name), name, kind),
                store,
                Some(hash_secret(CREDENTIALS)),
            ));
        }
        let registry =
            ReplicaRegistry::new(backends.iter().map(|b| b.replica().clone()).collect()).unwrap();
        let replicas = ReplicaSet::new(backends);

        let bus = Arc::new(BatchBus::new(4));
        let mut silent_queues = Vec::new();
        for backend in replicas.backends() {
            let rx = bus.register(backend.replica().id.clone());
            if silent.contains(&backend.replica().id.as_str()) {
                silent_queues.push(rx);
            } else {
                BatchAgent::new(Arc::clone(backend)).spawn(rx);
            }
        }

        let engine = Arc::new(ActiveBitPreservation::new(
            registry,
            admin.clone() as Arc<dyn MetadataStore>,
            client(bus.clone()),
            Arc::new(replicas.clone()),
            ScanTimeouts {
                list_files: timeout,
                checksum: timeout,
            },
        ));

        Self {
            engine,
            admin,
            replicas,
            bus,
            silent: silent_queues,
            _temp_dir: temp_dir,
        }
    }

    /// Record `filename` in admin data with the digest of `content`.
    pub async fn admit(&self, filename: &str, content: &[u8]) -> AdminRecord {
        let record = AdminRecord::new(
            filename,
            Checksum::compute(content),
            OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap(),
        )
        .unwrap();
        self.admin.put_admin_record(&record).await.unwrap();
        record
    }

    /// Store a file on a replica through its normal write path.
    pub async fn put(&self, replica: &str, filename: &str, content: &[u8]) {
        self.replicas
            .get(&id(replica))
            .unwrap()
            .store_file(filename, Bytes::copy_from_slice(content))
            .await
            .unwrap();
    }

    /// Overwrite a file on a replica behind the engine's back.
    pub async fn corrupt(&self, replica: &str, filename: &str, content: &[u8]) {
        let backend = self.replicas.get(&id(replica)).unwrap();
        if backend.replica().kind.holds_bytes() {
            backend
                .store()
                .put(filename, Bytes::copy_from_slice(content))
                .await
                .unwrap();
        } else {
            let mut listing = ChecksumListing::load(backend.store().as_ref()).await.unwrap();
            listing.remove(filename);
            listing.insert(filename, Checksum::compute(content));
            listing.save(backend.store().as_ref()).await.unwrap();
        }
    }

    /// Bytes a bit archive currently holds for a file.
    pub async fn read(&self, replica: &str, filename: &str) -> Option<Bytes> {
        self.replicas
            .get(&id(replica))
            .unwrap()
            .store()
            .get(filename)
            .await
            .ok()
    }

    pub async fn record(&self, filename: &str) -> Option<AdminRecord> {
        self.admin.get_admin_record(filename).await.unwrap()
    }

    /// Run both scans on every replica.
    pub async fn scan_all(&self) {
        for (name, _) in REPLICAS {
            self.engine.find_missing_files(&id(name)).await.unwrap();
            self.engine.find_changed_files(&id(name)).await.unwrap();
        }
    }

    /// Number of jobs queued for silent replicas.
    pub fn pending_silent_jobs(&mut self) -> usize {
        let mut pending = 0;
        for rx in &mut self.silent {
            while rx.try_recv().is_ok() {
                pending += 1;
            }
        }
        pending
    }
}
