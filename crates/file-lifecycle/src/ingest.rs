//! Streamed ingestion of uploads

use crate::error::{IngestFailure, LifecycleError, Result, StoreError};
use crate::service::FileService;
use crate::types::{FileId, FileRecord, Upload};
use bytes::Bytes;
use chrono::Utc;
use futures::{Stream, StreamExt};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, error, info, warn};

/// Write buffer size used when streaming uploads to disk
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

const MAX_EXTENSION_LEN: usize = 16;

/// Derive a storage extension (including the dot) from a client file name
///
/// Only the final path component is considered and leading dots do not start
/// an extension, so `.bashrc` has none. Extensions with characters outside
/// `[A-Za-z0-9_-]` are dropped.
pub fn derive_extension(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let stem_start = base.len() - base.trim_start_matches('.').len();

    let ext = match base.rfind('.') {
        Some(idx) if idx > stem_start => &base[idx + 1..],
        _ => return String::new(),
    };

    let valid = !ext.is_empty()
        && ext.len() <= MAX_EXTENSION_LEN
        && ext
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        format!(".{}", ext)
    } else {
        String::new()
    }
}

/// A blob being written; removed on drop unless committed
struct PartialBlob {
    path: Option<PathBuf>,
}

impl PartialBlob {
    fn new(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    fn commit(mut self) {
        self.path = None;
    }

    /// Remove the bytes written so far
    async fn discard(mut self) {
        if let Some(path) = self.path.take() {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!(path = ?path, "Removed uncommitted blob"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = ?path, error = %e, "Failed to remove uncommitted blob"),
            }
        }
    }
}

impl Drop for PartialBlob {
    fn drop(&mut self) {
        // Only reached when the ingest future is cancelled mid-write
        if let Some(path) = self.path.take() {
            let remove = move || {
                if let Err(e) = std::fs::remove_file(&path) {
                    if e.kind() != io::ErrorKind::NotFound {
                        warn!(path = ?path, error = %e, "Failed to remove partial blob");
                    }
                }
            };
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn_blocking(remove);
                }
                Err(_) => remove(),
            }
        }
    }
}

fn disk_error(err: io::Error) -> LifecycleError {
    LifecycleError::IngestionFailed(IngestFailure::Disk(Box::new(err)))
}

impl FileService {
    /// Stream an upload to local storage and commit its record
    ///
    /// Returns once the record is committed; cloud sync happens later on the
    /// sync workers. On any failure nothing is left behind on disk.
    pub async fn ingest<S, E>(&self, upload: Upload, stream: S) -> Result<FileRecord>
    where
        S: Stream<Item = std::result::Result<Bytes, E>>,
        E: fmt::Display,
    {
        let id = FileId::new();
        let extension = derive_extension(&upload.name);
        let local_path = self.blobs.path_for(&id, &extension);

        let (size_bytes, blob) = match self.write_blob(&local_path, stream).await {
            Ok(written) => written,
            Err(e) => {
                warn!(id = %id, name = %upload.name, error = %e, "Ingestion failed");
                return Err(e);
            }
        };

        let now = Utc::now();
        let record = FileRecord {
            id,
            original_name: upload.name,
            size_bytes,
            media_type: upload.media_type,
            extension,
            local_path,
            remote_location: None,
            created_at: now,
            updated_at: now,
            last_accessed_at: None,
        };

        // Commit, rollback and the sync hand-off run detached so a dropped
        // caller cannot leave a record without its blob
        let store = self.store.clone();
        let sync = self.sync.clone();
        let commit = tokio::spawn(async move {
            if let Err(e) = store.insert(&record).await {
                error!(id = %id, error = %e, "Failed to commit file record, rolling back local write");
                blob.discard().await;
                return Err(e);
            }
            blob.commit();

            info!(
                id = %id,
                name = %record.original_name,
                size = record.size_bytes,
                "Ingested file"
            );
            if !sync.enqueue(id) {
                warn!(id = %id, "Sync queue closed, file left for the next re-sync pass");
            }
            Ok(record)
        });

        commit
            .await
            .map_err(StoreError::backend)
            .and_then(|committed| committed)
            .map_err(LifecycleError::MetadataCommitFailed)
    }

    async fn write_blob<S, E>(&self, path: &Path, stream: S) -> Result<(u64, PartialBlob)>
    where
        S: Stream<Item = std::result::Result<Bytes, E>>,
        E: fmt::Display,
    {
        let file = self.blobs.create(path).await.map_err(disk_error)?;
        let blob = PartialBlob::new(path.to_path_buf());

        let mut writer = BufWriter::with_capacity(self.chunk_size, file);
        match copy_stream(&mut writer, stream).await {
            Ok(size) => {
                drop(writer);
                Ok((size, blob))
            }
            Err(e) => {
                drop(writer);
                blob.discard().await;
                Err(e)
            }
        }
    }
}

/// Write every chunk of `stream` and sync to disk, returning the byte count
async fn copy_stream<S, E>(writer: &mut BufWriter<tokio::fs::File>, stream: S) -> Result<u64>
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    E: fmt::Display,
{
    let mut stream = std::pin::pin!(stream);
    let mut size: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk
            .map_err(|e| LifecycleError::IngestionFailed(IngestFailure::Source(e.to_string())))?;
        writer.write_all(&chunk).await.map_err(disk_error)?;
        size += chunk.len() as u64;
    }

    writer.flush().await.map_err(disk_error)?;
    writer.get_ref().sync_all().await.map_err(disk_error)?;
    Ok(size)
}
