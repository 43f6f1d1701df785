//! Shared fixtures for unit tests

use crate::error::{MirrorError, StoreError};
use crate::mirror::{CloudMirror, MirrorUpload};
use crate::service::FileService;
use crate::store::{MemoryMetadataStore, MetadataStore};
use crate::sync::{sync_queue, SyncReceiver};
use crate::types::{FileId, FileRecord};
use crate::LocalBlobStore;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::{self, Stream};
use std::convert::Infallible;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mirror that records calls and can be told to fail
#[derive(Debug, Default)]
pub struct RecordingMirror {
    pub fail_put: bool,
    pub fail_delete: bool,
    pub puts: Mutex<Vec<String>>,
    pub deletes: Mutex<Vec<String>>,
}

impl RecordingMirror {
    pub fn failing() -> Self {
        Self {
            fail_put: true,
            fail_delete: true,
            ..Default::default()
        }
    }

    pub fn puts(&self) -> Vec<String> {
        self.puts.lock().unwrap().clone()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }
}

#[async_trait]
impl CloudMirror for RecordingMirror {
    async fn put(&self, upload: &MirrorUpload) -> Result<String, MirrorError> {
        if self.fail_put {
            return Err(MirrorError::Upload("mirror unavailable".to_string()));
        }
        self.puts.lock().unwrap().push(upload.key.clone());
        Ok(format!("https://mirror.test/{}", upload.key))
    }

    async fn delete(&self, key: &str) -> Result<(), MirrorError> {
        self.deletes.lock().unwrap().push(key.to_string());
        if self.fail_delete {
            return Err(MirrorError::Delete("mirror unavailable".to_string()));
        }
        Ok(())
    }
}

/// Store whose inserts always fail, delegating everything else
#[derive(Debug, Default)]
pub struct RejectingStore {
    inner: MemoryMetadataStore,
    pub inserts: AtomicUsize,
}

#[async_trait]
impl MetadataStore for RejectingStore {
    async fn insert(&self, _record: &FileRecord) -> Result<(), StoreError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::backend(std::io::Error::new(
            std::io::ErrorKind::Other,
            "transaction aborted",
        )))
    }

    async fn get(&self, id: &FileId) -> Result<Option<FileRecord>, StoreError> {
        self.inner.get(id).await
    }

    async fn mark_accessed(
        &self,
        id: &FileId,
        at: DateTime<Utc>,
    ) -> Result<Option<FileRecord>, StoreError> {
        self.inner.mark_accessed(id, at).await
    }

    async fn set_remote_location(
        &self,
        id: &FileId,
        location: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        self.inner.set_remote_location(id, location, at).await
    }

    async fn delete(&self, id: &FileId) -> Result<bool, StoreError> {
        self.inner.delete(id).await
    }

    async fn list(&self, offset: usize, limit: usize) -> Result<Vec<FileRecord>, StoreError> {
        self.inner.list(offset, limit).await
    }

    async fn updated_before(
        &self,
        cutoff: DateTime<Utc>,
        never_accessed: bool,
    ) -> Result<Vec<FileRecord>, StoreError> {
        self.inner.updated_before(cutoff, never_accessed).await
    }

    async fn list_unmirrored(&self, limit: usize) -> Result<Vec<FileRecord>, StoreError> {
        self.inner.list_unmirrored(limit).await
    }
}

pub struct Harness {
    pub service: FileService,
    pub store: Arc<MemoryMetadataStore>,
    pub mirror: Arc<RecordingMirror>,
    pub receiver: SyncReceiver,
}

/// Service over an in-memory store whose sync queue is left undrained
pub fn harness(root: &Path, mirror: RecordingMirror) -> Harness {
    let store = Arc::new(MemoryMetadataStore::new());
    let mirror = Arc::new(mirror);
    let (queue, receiver) = sync_queue();
    let service = FileService::new(
        LocalBlobStore::new(root),
        store.clone(),
        mirror.clone(),
        queue,
    );
    Harness {
        service,
        store,
        mirror,
        receiver,
    }
}

/// Byte stream yielding `data` in pieces of `piece` bytes
pub fn chunked(data: &[u8], piece: usize) -> impl Stream<Item = Result<Bytes, Infallible>> {
    let chunks: Vec<_> = data
        .chunks(piece.max(1))
        .map(|c| Ok(Bytes::copy_from_slice(c)))
        .collect();
    stream::iter(chunks)
}

/// Count the entries under a directory
pub fn dir_entries(root: &Path) -> usize {
    std::fs::read_dir(root).map(|d| d.count()).unwrap_or(0)
}

/// Store whose inserts commit and then stall before acknowledging
#[derive(Debug)]
pub struct SlowCommitStore {
    pub inner: Arc<MemoryMetadataStore>,
    pub stall: Duration,
}

#[async_trait]
impl MetadataStore for SlowCommitStore {
    async fn insert(&self, record: &FileRecord) -> Result<(), StoreError> {
        self.inner.insert(record).await?;
        tokio::time::sleep(self.stall).await;
        Ok(())
    }

    async fn get(&self, id: &FileId) -> Result<Option<FileRecord>, StoreError> {
        self.inner.get(id).await
    }

    async fn mark_accessed(
        &self,
        id: &FileId,
        at: DateTime<Utc>,
    ) -> Result<Option<FileRecord>, StoreError> {
        self.inner.mark_accessed(id, at).await
    }

    async fn set_remote_location(
        &self,
        id: &FileId,
        location: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        self.inner.set_remote_location(id, location, at).await
    }

    async fn delete(&self, id: &FileId) -> Result<bool, StoreError> {
        self.inner.delete(id).await
    }

    async fn list(&self, offset: usize, limit: usize) -> Result<Vec<FileRecord>, StoreError> {
        self.inner.list(offset, limit).await
    }

    async fn updated_before(
        &self,
        cutoff: DateTime<Utc>,
        never_accessed: bool,
    ) -> Result<Vec<FileRecord>, StoreError> {
        self.inner.updated_before(cutoff, never_accessed).await
    }

    async fn list_unmirrored(&self, limit: usize) -> Result<Vec<FileRecord>, StoreError> {
        self.inner.list_unmirrored(limit).await
    }
}

/// Poll until `root` holds `expected` entries; removals on cancellation run off-thread
pub async fn wait_for_entries(root: &Path, expected: usize) -> usize {
    for _ in 0..100 {
        if dir_entries(root) == expected {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    dir_entries(root)
}
