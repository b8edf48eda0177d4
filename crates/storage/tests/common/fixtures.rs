use bitpres_core::credentials::hash_secret;
use bitpres_core::{Replica, ReplicaId, ReplicaKind};
use bitpres_storage::{ArchiveStore, FilesystemBackend, ReplicaBackend};
use bytes::Bytes;
use std::path::Path;
use std::sync::Arc;

/// Generate deterministic test data using a seeded pseudo-random generator.
/// Same seed produces same output (reproducible tests).
#[allow(dead_code)]
pub fn seeded_bytes(seed: u64, len: usize) -> Bytes {
    let mut data = vec![0u8; len];
    let mut state = seed;

    // Simple LCG (Linear Congruential Generator)
    for chunk in data.chunks_mut(8) {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        let bytes = state.to_le_bytes();
        for (i, byte) in chunk.iter_mut().enumerate() {
            *byte = bytes[i % 8];
        }
    }

    Bytes::from(data)
}

/// Filesystem-backed replica under `root/<id>`, optionally wrapping its store.
#[allow(dead_code)]
pub async fn replica_backend(
    root: &Path,
    id: &str,
    kind: ReplicaKind,
    secret: Option<&str>,
    wrap: impl FnOnce(Arc<dyn ArchiveStore>) -> Arc<dyn ArchiveStore>,
) -> ReplicaBackend {
    let store: Arc<dyn ArchiveStore> =
        Arc::new(FilesystemBackend::new(root.join(id)).await.unwrap());
    ReplicaBackend::new(
        Replica::new(ReplicaId::parse(id).unwrap(), id, kind),
        wrap(store),
        secret.map(hash_secret),
    )
}
