//! Metadata store seam and the in-memory implementation

use crate::error::StoreError;
use crate::types::{FileId, FileRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

/// Transactional storage for file records
///
/// Every method is atomic on its own. Mutations are targeted (touch, set
/// location) rather than whole-record writes so a sync completion and a
/// concurrent read touch never overwrite each other.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Insert a new record; fails with `StoreError::Conflict` on a duplicate id or path
    async fn insert(&self, record: &FileRecord) -> Result<(), StoreError>;

    async fn get(&self, id: &FileId) -> Result<Option<FileRecord>, StoreError>;

    /// Set `last_accessed_at` and `updated_at` to `at`, returning the touched record
    async fn mark_accessed(
        &self,
        id: &FileId,
        at: DateTime<Utc>,
    ) -> Result<Option<FileRecord>, StoreError>;

    /// Record a confirmed upload; returns `false` if the record no longer exists
    async fn set_remote_location(
        &self,
        id: &FileId,
        location: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Remove a record; returns `false` if it was already gone
    async fn delete(&self, id: &FileId) -> Result<bool, StoreError>;

    /// Records in insertion order
    async fn list(&self, offset: usize, limit: usize) -> Result<Vec<FileRecord>, StoreError>;

    /// Records with `updated_at < cutoff`, optionally only those never accessed
    async fn updated_before(
        &self,
        cutoff: DateTime<Utc>,
        never_accessed: bool,
    ) -> Result<Vec<FileRecord>, StoreError>;

    /// Records without a remote location, oldest first
    async fn list_unmirrored(&self, limit: usize) -> Result<Vec<FileRecord>, StoreError>;
}

/// Process-local metadata store, kept in insertion order
#[derive(Debug, Default)]
pub struct MemoryMetadataStore {
    records: RwLock<Vec<FileRecord>>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn insert(&self, record: &FileRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        if records.iter().any(|r| r.id == record.id) {
            return Err(StoreError::Conflict(format!("duplicate id {}", record.id)));
        }
        if records.iter().any(|r| r.local_path == record.local_path) {
            return Err(StoreError::Conflict(format!(
                "duplicate local path {}",
                record.local_path.display()
            )));
        }
        records.push(record.clone());
        Ok(())
    }

    async fn get(&self, id: &FileId) -> Result<Option<FileRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(records.iter().find(|r| r.id == *id).cloned())
    }

    async fn mark_accessed(
        &self,
        id: &FileId,
        at: DateTime<Utc>,
    ) -> Result<Option<FileRecord>, StoreError> {
        let mut records = self.records.write().await;
        Ok(records.iter_mut().find(|r| r.id == *id).map(|record| {
            record.last_accessed_at = Some(at);
            record.updated_at = at;
            record.clone()
        }))
    }

    async fn set_remote_location(
        &self,
        id: &FileId,
        location: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        match records.iter_mut().find(|r| r.id == *id) {
            Some(record) => {
                record.remote_location = Some(location.to_string());
                record.updated_at = at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &FileId) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        match records.iter().position(|r| r.id == *id) {
            Some(index) => {
                records.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list(&self, offset: usize, limit: usize) -> Result<Vec<FileRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(records.iter().skip(offset).take(limit).cloned().collect())
    }

    async fn updated_before(
        &self,
        cutoff: DateTime<Utc>,
        never_accessed: bool,
    ) -> Result<Vec<FileRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|r| r.updated_at < cutoff)
            .filter(|r| !never_accessed || r.last_accessed_at.is_none())
            .cloned()
            .collect())
    }

    async fn list_unmirrored(&self, limit: usize) -> Result<Vec<FileRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|r| r.remote_location.is_none())
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::path::PathBuf;

    fn record(updated_days_ago: i64, accessed: bool) -> FileRecord {
        let id = FileId::new();
        let updated_at = Utc::now() - Duration::days(updated_days_ago);
        FileRecord {
            id,
            original_name: format!("{}.txt", id),
            size_bytes: 1,
            media_type: None,
            extension: ".txt".to_string(),
            local_path: PathBuf::from(format!("/tmp/{}.txt", id)),
            remote_location: None,
            created_at: updated_at,
            updated_at,
            last_accessed_at: accessed.then_some(updated_at),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = MemoryMetadataStore::new();
        let r = record(0, false);
        store.insert(&r).await.unwrap();

        assert_eq!(store.get(&r.id).await.unwrap(), Some(r));
        assert_eq!(store.get(&FileId::new()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicates() {
        let store = MemoryMetadataStore::new();
        let r = record(0, false);
        store.insert(&r).await.unwrap();

        let err = store.insert(&r).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        let mut same_path = record(0, false);
        same_path.local_path = r.local_path.clone();
        assert!(matches!(
            store.insert(&same_path).await.unwrap_err(),
            StoreError::Conflict(_)
        ));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_mark_accessed_bumps_both_timestamps() {
        let store = MemoryMetadataStore::new();
        let r = record(5, false);
        store.insert(&r).await.unwrap();

        let now = Utc::now();
        let touched = store.mark_accessed(&r.id, now).await.unwrap().unwrap();
        assert_eq!(touched.last_accessed_at, Some(now));
        assert_eq!(touched.updated_at, now);
        assert_eq!(touched.created_at, r.created_at);

        assert!(store
            .mark_accessed(&FileId::new(), now)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_set_remote_location_on_missing_record() {
        let store = MemoryMetadataStore::new();
        let updated = store
            .set_remote_location(&FileId::new(), "https://mirror/x", Utc::now())
            .await
            .unwrap();
        assert!(!updated);
    }

    #[tokio::test]
    async fn test_delete_reports_presence() {
        let store = MemoryMetadataStore::new();
        let r = record(0, false);
        store.insert(&r).await.unwrap();

        assert!(store.delete(&r.id).await.unwrap());
        assert!(!store.delete(&r.id).await.unwrap());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_list_keeps_insertion_order() {
        let store = MemoryMetadataStore::new();
        let records: Vec<_> = (0..5).map(|_| record(0, false)).collect();
        for r in &records {
            store.insert(r).await.unwrap();
        }

        let page = store.list(1, 2).await.unwrap();
        assert_eq!(page, records[1..3].to_vec());
        assert!(store.list(10, 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_updated_before_filters() {
        let store = MemoryMetadataStore::new();
        let old_read = record(10, true);
        let old_unread = record(10, false);
        let fresh = record(0, false);
        for r in [&old_read, &old_unread, &fresh] {
            store.insert(r).await.unwrap();
        }

        let cutoff = Utc::now() - Duration::days(1);
        let all_old = store.updated_before(cutoff, false).await.unwrap();
        assert_eq!(all_old, vec![old_read.clone(), old_unread.clone()]);

        let unread_old = store.updated_before(cutoff, true).await.unwrap();
        assert_eq!(unread_old, vec![old_unread]);
    }

    #[tokio::test]
    async fn test_list_unmirrored() {
        let store = MemoryMetadataStore::new();
        let a = record(0, false);
        let b = record(0, false);
        store.insert(&a).await.unwrap();
        store.insert(&b).await.unwrap();
        store
            .set_remote_location(&a.id, "https://mirror/a", Utc::now())
            .await
            .unwrap();

        let pending = store.list_unmirrored(10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, b.id);
    }
}
