//! HTTP server for the file storage API
//!
//! Provides /health, the /api/v1/files endpoints and a static upload form.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::routes;
use crate::state::SharedState;

/// Create the HTTP router
pub fn create_router(state: SharedState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(routes::health::health))
        .route(
            "/api/v1/files",
            get(routes::files::list).post(routes::files::upload_base64),
        )
        .route("/api/v1/files/stream", post(routes::files::upload_stream))
        .route(
            "/api/v1/files/{uid}",
            get(routes::files::download).delete(routes::files::delete),
        )
        .route("/api/v1/files/{uid}/metadata", get(routes::files::metadata))
        .route("/static/index.html", get(routes::frontend::index))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(
    state: SharedState,
    port: u16,
    max_upload_bytes: usize,
) -> std::io::Result<()> {
    let router = create_router(state, max_upload_bytes);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await
}
