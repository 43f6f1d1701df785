//! Idempotent deletion of a file from every tier

use crate::error::{MirrorError, Result};
use crate::service::FileService;
use crate::types::FileId;
use tracing::{info, warn};

/// Outcome of deleting one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deletion {
    /// No record existed, or a concurrent deletion removed it first
    NotFound,
    Deleted,
    /// Deleted locally, but the remote copy could not be removed and is now
    /// orphaned in the mirror. Local state stays authoritative.
    RemoteOrphaned(MirrorError),
}

impl Deletion {
    /// Whether this call removed the local bytes and record
    pub fn removed(&self) -> bool {
        !matches!(self, Deletion::NotFound)
    }
}

impl FileService {
    /// Delete a file; returns `false` if it did not exist
    pub async fn delete_by_id(&self, id: &FileId) -> Result<bool> {
        Ok(self.delete_file(id).await?.removed())
    }

    /// Delete local bytes, then the record, then the remote copy
    ///
    /// Removing the record is the visibility boundary. A blob that is already
    /// missing is tolerated; any other filesystem error aborts before the
    /// record is touched so a later run can retry.
    pub async fn delete_file(&self, id: &FileId) -> Result<Deletion> {
        let Some(record) = self.store.get(id).await? else {
            return Ok(Deletion::NotFound);
        };

        if !self.blobs.remove(&record.local_path).await? {
            warn!(id = %id, path = ?record.local_path, "Blob already missing during delete");
        }

        if !self.store.delete(id).await? {
            return Ok(Deletion::NotFound);
        }

        let key = record.object_key();
        match self.mirror.delete(&key).await {
            Ok(()) => {
                info!(id = %id, "Deleted file");
                Ok(Deletion::Deleted)
            }
            Err(e) => {
                warn!(id = %id, key = %key, error = %e, "Deleted file locally, remote object orphaned");
                Ok(Deletion::RemoteOrphaned(e))
            }
        }
    }
}
