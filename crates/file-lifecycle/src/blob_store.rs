//! On-disk storage for file bytes

use crate::types::FileId;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tracing::{debug, info};

/// Local blob store rooted at a single directory
///
/// Blobs are named `<id><extension>`. Ingestion is the only writer and
/// deletion the only remover; ids are fresh per upload so no path is ever
/// written twice.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Ensure the storage root exists
    pub async fn init(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root).await?;
        info!(root = ?self.root, "Blob store initialized");
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, id: &FileId, extension: &str) -> PathBuf {
        self.root.join(format!("{}{}", id, extension))
    }

    /// Create a new blob for writing, failing if the path is already taken
    pub(crate) async fn create(&self, path: &Path) -> io::Result<File> {
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await
    }

    pub async fn open(&self, path: &Path) -> io::Result<File> {
        File::open(path).await
    }

    pub async fn exists(&self, path: &Path) -> bool {
        fs::try_exists(path).await.unwrap_or(false)
    }

    /// Remove a blob; returns `false` when it was already gone
    pub async fn remove(&self, path: &Path) -> io::Result<bool> {
        match fs::remove_file(path).await {
            Ok(()) => {
                debug!(path = ?path, "Removed blob");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}
