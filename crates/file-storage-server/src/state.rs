use chrono::{DateTime, Utc};
use file_lifecycle::FileService;
use std::sync::Arc;

/// Shared state for the HTTP server
pub struct AppState {
    pub service: Arc<FileService>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(service: Arc<FileService>) -> Self {
        Self {
            service,
            started_at: Utc::now(),
        }
    }
}

pub type SharedState = Arc<AppState>;
