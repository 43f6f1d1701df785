//! The file lifecycle service facade

use crate::blob_store::LocalBlobStore;
use crate::error::{LifecycleError, Result};
use crate::ingest::DEFAULT_CHUNK_SIZE;
use crate::mirror::CloudMirror;
use crate::store::MetadataStore;
use crate::sync::{SyncQueue, SyncStats};
use crate::types::{FileId, FileRecord};
use chrono::Utc;
use std::io;
use std::sync::Arc;
use tokio::fs::File;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// A record together with an open handle on its bytes
#[derive(Debug)]
pub struct OpenedFile {
    pub record: FileRecord,
    pub file: File,
}

/// Entry point for ingestion, retrieval, deletion and cleanup
pub struct FileService {
    pub(crate) blobs: LocalBlobStore,
    pub(crate) store: Arc<dyn MetadataStore>,
    pub(crate) mirror: Arc<dyn CloudMirror>,
    pub(crate) sync: SyncQueue,
    pub(crate) chunk_size: usize,
    /// Held for the duration of a cleanup run
    pub(crate) cleanup_guard: Mutex<()>,
}

impl FileService {
    pub fn new(
        blobs: LocalBlobStore,
        store: Arc<dyn MetadataStore>,
        mirror: Arc<dyn CloudMirror>,
        sync: SyncQueue,
    ) -> Self {
        Self {
            blobs,
            store,
            mirror,
            sync,
            chunk_size: DEFAULT_CHUNK_SIZE,
            cleanup_guard: Mutex::new(()),
        }
    }

    /// Override the write chunk size (bytes)
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn blobs(&self) -> &LocalBlobStore {
        &self.blobs
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Look up a record and record the access
    pub async fn get_by_id(&self, id: &FileId) -> Result<FileRecord> {
        match self.store.mark_accessed(id, Utc::now()).await? {
            Some(record) => {
                debug!(id = %id, "Touched file record");
                Ok(record)
            }
            None => Err(LifecycleError::NotFound(*id)),
        }
    }

    /// Records in insertion order
    pub async fn list(&self, offset: usize, limit: usize) -> Result<Vec<FileRecord>> {
        Ok(self.store.list(offset, limit).await?)
    }

    /// Look up a record, record the access and open its bytes for reading
    pub async fn open(&self, id: &FileId) -> Result<OpenedFile> {
        let record = self.get_by_id(id).await?;
        match self.blobs.open(&record.local_path).await {
            Ok(file) => Ok(OpenedFile { record, file }),
            // The record is being deleted
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(id = %id, path = ?record.local_path, "Blob missing for file record");
                Err(LifecycleError::NotFound(*id))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Enqueue up to `limit` records that have no remote location yet
    pub async fn requeue_unmirrored(&self, limit: usize) -> Result<usize> {
        let pending = self.store.list_unmirrored(limit).await?;
        let mut queued = 0;
        for record in &pending {
            if self.sync.enqueue(record.id) {
                queued += 1;
            }
        }
        if queued > 0 {
            info!(queued, "Re-queued unmirrored files for cloud sync");
        }
        Ok(queued)
    }

    pub fn sync_stats(&self) -> SyncStats {
        self.sync.stats()
    }
}
