use async_trait::async_trait;
use bitpres_storage::error::{StorageError, StorageResult};
use bitpres_storage::traits::{ArchiveStore, ByteStream, KeyStream};
use bytes::Bytes;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Store wrapper whose reads fail with an I/O error a fixed number of times
/// before passing through to the inner store.
#[allow(dead_code)]
pub struct FlakyStore {
    inner: Arc<dyn ArchiveStore>,
    failures_left: AtomicUsize,
    pub get_calls: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl FlakyStore {
    pub fn wrap(inner: Arc<dyn ArchiveStore>, failures: usize) -> (Arc<Self>, Arc<AtomicUsize>) {
        let counter = Arc::new(AtomicUsize::new(0));
        let store = Arc::new(Self {
            inner,
            failures_left: AtomicUsize::new(failures),
            get_calls: counter.clone(),
        });
        (store, counter)
    }

    fn maybe_fail(&self) -> StorageResult<()> {
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "injected read failure",
            )))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ArchiveStore for FlakyStore {
    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.maybe_fail()?;
        self.inner.get(key).await
    }

    async fn get_stream(&self, key: &str) -> StorageResult<ByteStream> {
        self.maybe_fail()?;
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
        "flaky"
    }
}
