//! File Storage Server
//!
//! Accepts uploads over HTTP, mirrors them to a cloud object store and
//! expires stale or unused files once a day.

use std::sync::Arc;
use std::time::Duration;

use cloud_mirror_client::HttpMirrorClient;
use file_lifecycle::{
    sync_queue, CloudMirror, FileService, LocalBlobStore, MemoryMetadataStore, MetadataStore,
    RetentionScheduler, SimulatedMirror, SyncWorkerPool,
};
use file_storage_server::config::Config;
use file_storage_server::error::Result;
use file_storage_server::server::start_server;
use file_storage_server::state::AppState;
use file_store_db::PgMetadataStore;
use tracing::{error, info, warn};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Unmirrored records picked up again at startup
const REQUEUE_LIMIT: usize = 10_000;

/// Latency of the stand-in mirror used when no object store is configured
const SIMULATED_MIRROR_LATENCY: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let env_filter = EnvFilter::from_default_env()
        .add_directive("file_storage_server=info".parse()?)
        .add_directive("file_lifecycle=info".parse()?);

    // Use JSON format for GCP Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    };

    info!("Starting File Storage Server...");

    // Load configuration from environment
    let config = Config::from_env()?;
    info!("Port: {}", config.port);
    info!("Upload dir: {}", config.upload_dir.display());

    let blobs = LocalBlobStore::new(&config.upload_dir);
    blobs.init().await?;

    let store: Arc<dyn MetadataStore> = match &config.database_url {
        Some(url) => {
            let store = PgMetadataStore::connect(url).await?;
            store.migrate().await?;
            Arc::new(store)
        }
        None => {
            warn!("DATABASE_URL not set, file records will not survive a restart");
            Arc::new(MemoryMetadataStore::new())
        }
    };

    let mirror: Arc<dyn CloudMirror> = match &config.mirror_url {
        Some(url) => {
            info!("Cloud mirror: {}", url);
            Arc::new(HttpMirrorClient::new(url)?)
        }
        None => {
            warn!("MIRROR_URL not set, using simulated cloud mirror");
            Arc::new(SimulatedMirror::new(
                config.mirror_public_url.clone(),
                SIMULATED_MIRROR_LATENCY,
            ))
        }
    };

    // Background cloud sync
    let (queue, receiver) = sync_queue();
    let workers = SyncWorkerPool::spawn(config.sync_workers, receiver, store.clone(), mirror.clone());

    let service = Arc::new(
        FileService::new(blobs, store, mirror, queue).with_chunk_size(config.chunk_size),
    );

    if let Err(e) = service.requeue_unmirrored(REQUEUE_LIMIT).await {
        error!(error = %e, "Failed to re-queue unmirrored files");
    }

    // Daily retention cleanup
    let scheduler =
        RetentionScheduler::new(service.clone(), config.schedule, config.retention).spawn();

    let state = Arc::new(AppState::new(service));
    let served = start_server(state, config.port, config.max_upload_bytes).await;

    scheduler.abort();
    workers.abort();
    served?;
    Ok(())
}
