// File record queries

use crate::types::{FileRow, FILE_COLUMNS};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Insert a new file row
pub async fn insert_file(
    executor: impl sqlx::PgExecutor<'_>,
    row: &FileRow,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO files (
            uid, filename, size, format, extension, local_path,
            cloud_path, created_at, updated_at, last_download
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(row.uid)
    .bind(&row.filename)
    .bind(row.size)
    .bind(&row.format)
    .bind(&row.extension)
    .bind(&row.local_path)
    .bind(&row.cloud_path)
    .bind(row.created_at)
    .bind(row.updated_at)
    .bind(row.last_download)
    .execute(executor)
    .await?;
    Ok(())
}

/// Get a file by uid
pub async fn get_file(
    executor: impl sqlx::PgExecutor<'_>,
    uid: Uuid,
) -> Result<Option<FileRow>, sqlx::Error> {
    sqlx::query_as(&format!("SELECT {FILE_COLUMNS} FROM files WHERE uid = $1"))
        .bind(uid)
        .fetch_optional(executor)
        .await
}

/// Record a download, bumping both `last_download` and `updated_at`
pub async fn touch_file(
    executor: impl sqlx::PgExecutor<'_>,
    uid: Uuid,
    at: DateTime<Utc>,
) -> Result<Option<FileRow>, sqlx::Error> {
    sqlx::query_as(&format!(
        "UPDATE files SET last_download = $2, updated_at = $2 WHERE uid = $1 RETURNING {FILE_COLUMNS}"
    ))
    .bind(uid)
    .bind(at)
    .fetch_optional(executor)
    .await
}

/// Set the cloud path; returns false if the row no longer exists
pub async fn set_cloud_path(
    executor: impl sqlx::PgExecutor<'_>,
    uid: Uuid,
    cloud_path: &str,
    at: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE files SET cloud_path = $2, updated_at = $3 WHERE uid = $1")
        .bind(uid)
        .bind(cloud_path)
        .bind(at)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Delete a file row; returns false if it did not exist
pub async fn delete_file(
    executor: impl sqlx::PgExecutor<'_>,
    uid: Uuid,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM files WHERE uid = $1")
        .bind(uid)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Page through files in insertion order
pub async fn list_files(
    executor: impl sqlx::PgExecutor<'_>,
    offset: i64,
    limit: i64,
) -> Result<Vec<FileRow>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {FILE_COLUMNS} FROM files ORDER BY seq OFFSET $1 LIMIT $2"
    ))
    .bind(offset)
    .bind(limit)
    .fetch_all(executor)
    .await
}

/// Files last updated before `cutoff`, optionally only never-downloaded ones
pub async fn files_updated_before(
    executor: impl sqlx::PgExecutor<'_>,
    cutoff: DateTime<Utc>,
    never_downloaded: bool,
) -> Result<Vec<FileRow>, sqlx::Error> {
    sqlx::query_as(&format!(
        r#"
        SELECT {FILE_COLUMNS} FROM files
        WHERE updated_at < $1 AND (NOT $2 OR last_download IS NULL)
        ORDER BY seq
        "#
    ))
    .bind(cutoff)
    .bind(never_downloaded)
    .fetch_all(executor)
    .await
}

/// Oldest files with no cloud path yet
pub async fn list_unmirrored(
    executor: impl sqlx::PgExecutor<'_>,
    limit: i64,
) -> Result<Vec<FileRow>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {FILE_COLUMNS} FROM files WHERE cloud_path IS NULL ORDER BY seq LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(executor)
    .await
}
