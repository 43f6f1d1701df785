use chrono::{DateTime, Utc};
use file_lifecycle::{FileId, FileRecord};
use sqlx::FromRow;
use std::path::PathBuf;
use uuid::Uuid;

/// Column list shared by every query returning a whole file row
pub(crate) const FILE_COLUMNS: &str =
    "uid, filename, size, format, extension, local_path, cloud_path, created_at, updated_at, last_download";

/// File row returned from SELECT queries
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct FileRow {
    pub uid: Uuid,
    pub filename: String,
    pub size: i64,
    pub format: Option<String>,
    pub extension: String,
    pub local_path: String,
    pub cloud_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_download: Option<DateTime<Utc>>,
}

impl From<FileRow> for FileRecord {
    fn from(row: FileRow) -> Self {
        Self {
            id: FileId::from(row.uid),
            original_name: row.filename,
            // Enforced non-negative by a CHECK constraint
            size_bytes: u64::try_from(row.size).unwrap_or_default(),
            media_type: row.format,
            extension: row.extension,
            local_path: PathBuf::from(row.local_path),
            remote_location: row.cloud_path,
            created_at: row.created_at,
            updated_at: row.updated_at,
            last_accessed_at: row.last_download,
        }
    }
}

impl From<&FileRecord> for FileRow {
    fn from(record: &FileRecord) -> Self {
        Self {
            uid: *record.id.as_uuid(),
            filename: record.original_name.clone(),
            size: i64::try_from(record.size_bytes).unwrap_or(i64::MAX),
            format: record.media_type.clone(),
            extension: record.extension.clone(),
            local_path: record.local_path.to_string_lossy().into_owned(),
            cloud_path: record.remote_location.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
            last_download: record.last_accessed_at,
        }
    }
}
