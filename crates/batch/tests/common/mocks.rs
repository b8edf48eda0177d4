use async_trait::async_trait;
use bitpres_core::credentials::hash_secret;
use bitpres_core::{Replica, ReplicaId, ReplicaKind};
use bitpres_storage::error::{StorageError, StorageResult};
use bitpres_storage::traits::{ArchiveStore, ByteStream, KeyStream};
use bitpres_storage::{FilesystemBackend, ReplicaBackend};
use bytes::Bytes;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

/// Store wrapper whose reads of selected keys always fail.
#[allow(dead_code)]
pub struct UnreadableKeys {
    inner: Arc<dyn ArchiveStore>,
    unreadable: HashSet<String>,
}

#[allow(dead_code)]
impl UnreadableKeys {
    pub fn wrap(inner: Arc<dyn ArchiveStore>, keys: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            inner,
            unreadable: keys.iter().map(|k| k.to_string()).collect(),
        })
    }

    fn check(&self, key: &str) -> StorageResult<()> {
        if self.unreadable.contains(key) {
            Err(StorageError::Io(std::io::Error::other("bad sector")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ArchiveStore for UnreadableKeys {
    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        self.check(key)?;
        self.inner.get(key).await
    }

    async fn get_stream(&self, key: &str) -> StorageResult<ByteStream> {
        self.check(key)?;
        self.inner.get_stream(key).await
    }

    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()> {
        self.inner.put(key, data).await
    }

    async fn put_if_not_exists(&self, key: &str, data: Bytes) -> StorageResult<bool> {
        self.inner.put_if_not_exists(key, data).await
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.inner.delete(key).await
    }

    async fn list_stream(&self, prefix: &str) -> StorageResult<KeyStream> {
        self.inner.list_stream(prefix).await
    }

    fn backend_name(&self) -> &'static str {
        "unreadable-keys"
    }
}

/// Filesystem-backed replica with the given files, some of them unreadable.
#[allow(dead_code)]
pub async fn replica_with_files(
    root: &Path,
    id: &str,
    kind: ReplicaKind,
    files: &[(&str, &[u8])],
    unreadable: &[&str],
) -> Arc<ReplicaBackend> {
    let fs: Arc<dyn ArchiveStore> =
        Arc::new(FilesystemBackend::new(root.join(id)).await.unwrap());
    let backend = ReplicaBackend::new(
        Replica::new(ReplicaId::parse(id).unwrap(), id, kind),
        UnreadableKeys::wrap(fs, unreadable),
        Some(hash_secret("test-credentials")),
    );
    for (name, content) in files {
        backend
            .store_file(name, Bytes::copy_from_slice(content))
            .await
            .unwrap();
    }
    Arc::new(backend)
}
