//! `MetadataStore` backed by PostgreSQL

use crate::{files, types::FileRow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use file_lifecycle::{FileId, FileRecord, MetadataStore, StoreError};
use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

/// Versioned schema, tracked in the `_sqlx_migrations` table
static MIGRATOR: Migrator = sqlx::migrate!();

pub struct PgMetadataStore {
    pool: PgPool,
}

impl PgMetadataStore {
    /// Connect to the database
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        info!("Connecting to database...");
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        info!("Database connection established");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        info!(migrations = MIGRATOR.iter().count(), "Applying file store schema");
        MIGRATOR.run(&self.pool).await?;
        info!("File store schema up to date");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Map a sqlx error, surfacing unique violations as conflicts
fn store_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(db.message().to_string())
        }
        other => StoreError::backend(other),
    }
}

/// Clamp a count to the range Postgres accepts for OFFSET/LIMIT
fn to_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn into_records(rows: Vec<FileRow>) -> Vec<FileRecord> {
    rows.into_iter().map(FileRecord::from).collect()
}

#[async_trait]
impl MetadataStore for PgMetadataStore {
    async fn insert(&self, record: &FileRecord) -> Result<(), StoreError> {
        files::insert_file(&self.pool, &FileRow::from(record))
            .await
            .map_err(store_error)
    }

    async fn get(&self, id: &FileId) -> Result<Option<FileRecord>, StoreError> {
        let row = files::get_file(&self.pool, *id.as_uuid())
            .await
            .map_err(store_error)?;
        Ok(row.map(FileRecord::from))
    }

    async fn mark_accessed(
        &self,
        id: &FileId,
        at: DateTime<Utc>,
    ) -> Result<Option<FileRecord>, StoreError> {
        let row = files::touch_file(&self.pool, *id.as_uuid(), at)
            .await
            .map_err(store_error)?;
        Ok(row.map(FileRecord::from))
    }

    async fn set_remote_location(
        &self,
        id: &FileId,
        location: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        files::set_cloud_path(&self.pool, *id.as_uuid(), location, at)
            .await
            .map_err(store_error)
    }

    async fn delete(&self, id: &FileId) -> Result<bool, StoreError> {
        files::delete_file(&self.pool, *id.as_uuid())
            .await
            .map_err(store_error)
    }

    async fn list(&self, offset: usize, limit: usize) -> Result<Vec<FileRecord>, StoreError> {
        let rows = files::list_files(&self.pool, to_i64(offset), to_i64(limit))
            .await
            .map_err(store_error)?;
        Ok(into_records(rows))
    }

    async fn updated_before(
        &self,
        cutoff: DateTime<Utc>,
        never_accessed: bool,
    ) -> Result<Vec<FileRecord>, StoreError> {
        let rows = files::files_updated_before(&self.pool, cutoff, never_accessed)
            .await
            .map_err(store_error)?;
        Ok(into_records(rows))
    }

    async fn list_unmirrored(&self, limit: usize) -> Result<Vec<FileRecord>, StoreError> {
        let rows = files::list_unmirrored(&self.pool, to_i64(limit))
            .await
            .map_err(store_error)?;
        Ok(into_records(rows))
    }
}
