//! Error types for the file storage server

use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use file_lifecycle::{IngestFailure, LifecycleError};
use serde_json::json;

/// Startup and wiring errors
#[derive(Debug)]
pub enum ServerError {
    Config(String),
    Io(Box<std::io::Error>),
    Database(sqlx::Error),
    Mirror(cloud_mirror_client::CloudMirrorError),
    Lifecycle(LifecycleError),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::Config(msg) => write!(f, "Configuration error: {}", msg),
            ServerError::Io(err) => write!(f, "IO error: {}", err),
            ServerError::Database(err) => write!(f, "Database error: {}", err),
            ServerError::Mirror(err) => write!(f, "Cloud mirror error: {}", err),
            ServerError::Lifecycle(err) => write!(f, "File lifecycle error: {}", err),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServerError::Io(err) => Some(err.as_ref()),
            ServerError::Database(err) => Some(err),
            ServerError::Mirror(err) => Some(err),
            ServerError::Lifecycle(err) => Some(err),
            ServerError::Config(_) => None,
        }
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        ServerError::Io(Box::new(err))
    }
}

impl From<sqlx::Error> for ServerError {
    fn from(err: sqlx::Error) -> Self {
        ServerError::Database(err)
    }
}

impl From<cloud_mirror_client::CloudMirrorError> for ServerError {
    fn from(err: cloud_mirror_client::CloudMirrorError) -> Self {
        ServerError::Mirror(err)
    }
}

impl From<LifecycleError> for ServerError {
    fn from(err: LifecycleError) -> Self {
        ServerError::Lifecycle(err)
    }
}

impl From<tracing_subscriber::filter::ParseError> for ServerError {
    fn from(err: tracing_subscriber::filter::ParseError) -> Self {
        ServerError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;

/// Request error type that converts to HTTP responses
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NotFound(String),
    PayloadTooLarge(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".into(),
                )
            }
        };

        (status, axum::Json(json!({ "error": message }))).into_response()
    }
}

impl From<LifecycleError> for AppError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::NotFound(_) => AppError::NotFound("File not found".to_string()),
            LifecycleError::IngestionFailed(IngestFailure::Source(msg)) => {
                AppError::BadRequest(format!("Upload interrupted: {}", msg))
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}
