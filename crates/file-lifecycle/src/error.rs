//! Error types for the file lifecycle engine

use crate::types::FileId;
use std::fmt;

/// Why an upload could not be written locally
#[derive(Debug)]
pub enum IngestFailure {
    /// The incoming byte stream failed
    Source(String),
    /// Writing to the local blob store failed
    Disk(Box<std::io::Error>),
}

impl fmt::Display for IngestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestFailure::Source(msg) => write!(f, "upload stream error: {}", msg),
            IngestFailure::Disk(err) => write!(f, "disk write error: {}", err),
        }
    }
}

/// Errors from a metadata store backend
#[derive(Debug)]
pub enum StoreError {
    /// A record with the same id or local path already exists
    Conflict(String),
    Backend(Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        StoreError::Backend(Box::new(err))
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            StoreError::Backend(err) => write!(f, "Store backend error: {}", err),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Backend(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

/// Errors from the remote object store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorError {
    Upload(String),
    Delete(String),
}

impl fmt::Display for MirrorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MirrorError::Upload(msg) => write!(f, "Upload error: {}", msg),
            MirrorError::Delete(msg) => write!(f, "Delete error: {}", msg),
        }
    }
}

impl std::error::Error for MirrorError {}

#[derive(Debug)]
pub enum LifecycleError {
    /// Nothing was committed; partial local bytes were removed
    IngestionFailed(IngestFailure),
    /// The local write succeeded but the record insert did not; local bytes were removed
    MetadataCommitFailed(StoreError),
    NotFound(FileId),
    Store(StoreError),
    Io(Box<std::io::Error>),
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleError::IngestionFailed(failure) => write!(f, "Ingestion failed: {}", failure),
            LifecycleError::MetadataCommitFailed(err) => {
                write!(f, "Metadata commit failed: {}", err)
            }
            LifecycleError::NotFound(id) => write!(f, "File not found: {}", id),
            LifecycleError::Store(err) => write!(f, "Metadata store error: {}", err),
            LifecycleError::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for LifecycleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LifecycleError::IngestionFailed(IngestFailure::Disk(err)) => Some(err.as_ref()),
            LifecycleError::MetadataCommitFailed(err) => Some(err),
            LifecycleError::Store(err) => Some(err),
            LifecycleError::Io(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<StoreError> for LifecycleError {
    fn from(err: StoreError) -> Self {
        LifecycleError::Store(err)
    }
}

impl From<std::io::Error> for LifecycleError {
    fn from(err: std::io::Error) -> Self {
        LifecycleError::Io(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, LifecycleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingestion_failed_display() {
        let err = LifecycleError::IngestionFailed(IngestFailure::Source(
            "connection reset".to_string(),
        ));
        assert_eq!(
            format!("{}", err),
            "Ingestion failed: upload stream error: connection reset"
        );
    }

    #[test]
    fn test_disk_failure_exposes_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err = LifecycleError::IngestionFailed(IngestFailure::Disk(Box::new(io)));
        assert!(format!("{}", err).contains("disk full"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_not_found_display() {
        let id = FileId::new();
        let err = LifecycleError::NotFound(id);
        assert_eq!(format!("{}", err), format!("File not found: {}", id));
    }

    #[test]
    fn test_mirror_error_display() {
        assert_eq!(
            format!("{}", MirrorError::Upload("timeout".to_string())),
            "Upload error: timeout"
        );
        assert_eq!(
            format!("{}", MirrorError::Delete("503".to_string())),
            "Delete error: 503"
        );
    }

    #[test]
    fn test_store_conflict_display() {
        let err = StoreError::Conflict("duplicate id".to_string());
        assert_eq!(format!("{}", err), "Conflict: duplicate id");
    }

    #[test]
    fn test_error_is_debug() {
        let err = LifecycleError::NotFound(FileId::new());
        let debug_str = format!("{:?}", err);
        assert!(debug_str.contains("NotFound"));
    }
}
