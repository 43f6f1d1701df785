//! Core types for the file lifecycle engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

/// Identifier of a stored file, generated once at ingestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(Uuid);

impl FileId {
    /// Generate a fresh random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for FileId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for FileId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl FromStr for FileId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Metadata record describing one stored file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: FileId,
    pub original_name: String,
    pub size_bytes: u64,
    pub media_type: Option<String>,
    pub extension: String,
    pub local_path: PathBuf,
    /// Absent until the mirror has confirmed an upload
    pub remote_location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Absent means never downloaded since creation
    pub last_accessed_at: Option<DateTime<Utc>>,
}

impl FileRecord {
    /// Key of this file in the remote object store
    pub fn object_key(&self) -> String {
        format!("{}{}", self.id, self.extension)
    }

    pub fn is_mirrored(&self) -> bool {
        self.remote_location.is_some()
    }
}

/// Client-declared attributes of an incoming upload
#[derive(Debug, Clone, Default)]
pub struct Upload {
    pub name: String,
    pub media_type: Option<String>,
}

impl Upload {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            media_type: None,
        }
    }

    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }
}

/// Outcome counters of one cleanup run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    /// Records matching the stale rule
    pub stale: usize,
    /// Records matching the unused rule
    pub unused: usize,
    /// Distinct records handed to deletion
    pub selected: usize,
    pub deleted: usize,
    /// Records that vanished between selection and deletion
    pub already_gone: usize,
    /// Deleted locally but the remote delete failed
    pub remote_orphans: usize,
    pub failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> FileRecord {
        let now = Utc::now();
        let id = FileId::new();
        FileRecord {
            id,
            original_name: "report.pdf".to_string(),
            size_bytes: 2048,
            media_type: Some("application/pdf".to_string()),
            extension: ".pdf".to_string(),
            local_path: PathBuf::from(format!("/data/{}.pdf", id)),
            remote_location: None,
            created_at: now,
            updated_at: now,
            last_accessed_at: None,
        }
    }

    #[test]
    fn test_file_id_round_trips_through_string() {
        let id = FileId::new();
        let parsed: FileId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_file_id_rejects_garbage() {
        assert!("not-a-uuid".parse::<FileId>().is_err());
    }

    #[test]
    fn test_fresh_ids_differ() {
        assert_ne!(FileId::new(), FileId::new());
    }

    #[test]
    fn test_object_key_includes_extension() {
        let record = sample_record();
        assert_eq!(record.object_key(), format!("{}.pdf", record.id));
        assert!(!record.is_mirrored());
    }

    #[test]
    fn test_file_id_serializes_as_plain_uuid() {
        let id = FileId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
    }

    #[test]
    fn test_upload_builder() {
        let upload = Upload::new("a.txt").with_media_type("text/plain");
        assert_eq!(upload.name, "a.txt");
        assert_eq!(upload.media_type.as_deref(), Some("text/plain"));
    }

    #[test]
    fn test_cleanup_report_default() {
        let report = CleanupReport::default();
        assert_eq!(report.selected, 0);
        assert_eq!(report.deleted, 0);
        assert_eq!(report.remote_orphans, 0);
    }
}
