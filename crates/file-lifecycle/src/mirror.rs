//! Remote object store seam

use crate::error::MirrorError;
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// One file to upload to the mirror
#[derive(Debug, Clone)]
pub struct MirrorUpload {
    /// Object key, `<id><extension>`
    pub key: String,
    /// Local bytes to send
    pub path: PathBuf,
    pub size_bytes: u64,
    pub media_type: Option<String>,
}

/// Async client for the remote object store
#[async_trait]
pub trait CloudMirror: Send + Sync {
    /// Upload a file, returning its remote location once the store confirms it
    async fn put(&self, upload: &MirrorUpload) -> Result<String, MirrorError>;

    /// Delete an object by key
    async fn delete(&self, key: &str) -> Result<(), MirrorError>;
}

/// Stand-in mirror that pretends to upload after a fixed latency
///
/// Used when no object store endpoint is configured.
#[derive(Debug, Clone)]
pub struct SimulatedMirror {
    base_url: String,
    latency: Duration,
}

impl SimulatedMirror {
    pub fn new(base_url: impl Into<String>, latency: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            latency,
        }
    }

    pub fn location_for(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }
}

impl Default for SimulatedMirror {
    fn default() -> Self {
        Self::new("https://example-cloud-storage.com", Duration::from_secs(2))
    }
}

#[async_trait]
impl CloudMirror for SimulatedMirror {
    async fn put(&self, upload: &MirrorUpload) -> Result<String, MirrorError> {
        tokio::time::sleep(self.latency).await;
        let location = self.location_for(&upload.key);
        debug!(key = %upload.key, location = %location, "Simulated upload");
        Ok(location)
    }

    async fn delete(&self, key: &str) -> Result<(), MirrorError> {
        tokio::time::sleep(self.latency).await;
        debug!(key = %key, "Simulated delete");
        Ok(())
    }
}
