use chrono::{DateTime, Utc};
use file_lifecycle::{FileId, FileRecord, SyncStats};
use serde::{Deserialize, Serialize};

/// File metadata as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileResponse {
    pub uid: FileId,
    pub filename: String,
    pub size: u64,
    pub format: Option<String>,
    pub extension: String,
    pub local_path: String,
    pub cloud_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_download: Option<DateTime<Utc>>,
}

impl From<FileRecord> for FileResponse {
    fn from(record: FileRecord) -> Self {
        Self {
            uid: record.id,
            filename: record.original_name,
            size: record.size_bytes,
            format: record.media_type,
            extension: record.extension,
            local_path: record.local_path.to_string_lossy().into_owned(),
            cloud_path: record.remote_location,
            created_at: record.created_at,
            updated_at: record.updated_at,
            last_download: record.last_accessed_at,
        }
    }
}

/// Body of a base64 upload
#[derive(Debug, Deserialize)]
pub struct FileBase64 {
    pub filename: String,
    pub file_base64: String,
}

/// Pagination for the file list
#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub skip: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    100
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
    pub sync: SyncStats,
}
