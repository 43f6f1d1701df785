use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::body::Body;
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::Json;
use base64::Engine;
use bytes::Bytes;
use file_lifecycle::{FileId, Upload};
use futures::stream::{self, Stream};
use futures::TryStreamExt;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::info;

use crate::error::AppError;
use crate::state::SharedState;
use crate::types::{FileBase64, FileResponse, ListParams, MessageResponse};

/// Parse a path uid into a file id
fn parse_uid(uid: &str) -> Result<FileId, AppError> {
    uid.parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid file id: {uid}")))
}

/// POST /api/v1/files
/// Create a file from a base64 string.
pub async fn upload_base64(
    State(state): State<SharedState>,
    Json(body): Json<FileBase64>,
) -> Result<(StatusCode, Json<FileResponse>), AppError> {
    let data = base64::engine::general_purpose::STANDARD
        .decode(body.file_base64.trim())
        .map_err(|e| AppError::BadRequest(format!("Invalid base64 file data: {e}")))?;

    let bytes = stream::iter([Ok::<_, Infallible>(Bytes::from(data))]);
    let record = state
        .service
        .ingest(Upload::new(body.filename), bytes)
        .await?;

    Ok((StatusCode::ACCEPTED, Json(record.into())))
}

/// Map a multipart read error, keeping the body limit distinct
fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(format!("Upload too large: {}", err.body_text()))
    } else {
        AppError::BadRequest(format!("Invalid multipart body: {}", err.body_text()))
    }
}

/// POST /api/v1/files/stream
/// Stream the multipart `file` field straight to disk.
pub async fn upload_stream(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<FileResponse>), AppError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }

        let mut upload = Upload::new(field.file_name().unwrap_or("upload"));
        if let Some(content_type) = field.content_type() {
            upload = upload.with_media_type(content_type);
        }

        let too_large = AtomicBool::new(false);
        let body = field.inspect_err(|e| {
            if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                too_large.store(true, Ordering::Relaxed);
            }
        });

        return match state.service.ingest(upload, body).await {
            Ok(record) => Ok((StatusCode::ACCEPTED, Json(record.into()))),
            Err(e) if too_large.load(Ordering::Relaxed) => {
                Err(AppError::PayloadTooLarge(format!("Upload too large: {e}")))
            }
            Err(e) => Err(e.into()),
        };
    }

    Err(AppError::BadRequest("Missing multipart field \"file\"".to_string()))
}

/// GET /api/v1/files/{uid}
/// Stream the file back as an attachment.
pub async fn download(
    State(state): State<SharedState>,
    Path(uid): Path<String>,
) -> Result<Response, AppError> {
    let id = parse_uid(&uid)?;
    let opened = state.service.open(&id).await?;
    let record = opened.record;

    let content_type = record
        .media_type
        .clone()
        .unwrap_or_else(|| "application/octet-stream".to_string());

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, record.size_bytes)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition(&record.original_name),
        )
        .body(Body::from_stream(read_chunks(
            opened.file,
            state.service.chunk_size(),
        )))
        .map_err(|e| AppError::Internal(e.to_string()))
}

/// GET /api/v1/files/{uid}/metadata
pub async fn metadata(
    State(state): State<SharedState>,
    Path(uid): Path<String>,
) -> Result<Json<FileResponse>, AppError> {
    let id = parse_uid(&uid)?;
    let record = state.service.get_by_id(&id).await?;
    Ok(Json(record.into()))
}

/// GET /api/v1/files?skip=0&limit=100
pub async fn list(
    State(state): State<SharedState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<FileResponse>>, AppError> {
    let records = state.service.list(params.skip, params.limit).await?;
    Ok(Json(records.into_iter().map(FileResponse::from).collect()))
}

/// DELETE /api/v1/files/{uid}
pub async fn delete(
    State(state): State<SharedState>,
    Path(uid): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = parse_uid(&uid)?;
    if !state.service.delete_by_id(&id).await? {
        return Err(AppError::NotFound("File not found".to_string()));
    }

    info!(id = %id, "File deleted via API");
    Ok(Json(MessageResponse {
        message: "File deleted successfully".to_string(),
    }))
}

/// `attachment` disposition, falling back to RFC 5987 encoding for names
/// that cannot go in a quoted string
fn content_disposition(filename: &str) -> String {
    let plain = filename
        .chars()
        .all(|c| c.is_ascii() && !c.is_ascii_control() && c != '"' && c != '\\');
    if plain {
        format!("attachment; filename=\"{}\"", filename)
    } else {
        format!(
            "attachment; filename*=utf-8''{}",
            urlencoding::encode(filename)
        )
    }
}

/// Read a file as a stream of chunks of at most `chunk_size` bytes
fn read_chunks(file: File, chunk_size: usize) -> impl Stream<Item = std::io::Result<Bytes>> {
    stream::try_unfold(file, move |mut file| async move {
        let mut buf = vec![0u8; chunk_size];
        let n = file.read(&mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some((Bytes::from(buf), file)))
    })
}
