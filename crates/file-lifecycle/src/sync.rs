//! Background mirroring of ingested files to the cloud object store

use crate::error::MirrorError;
use crate::mirror::{CloudMirror, MirrorUpload};
use crate::store::MetadataStore;
use crate::types::FileId;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Default)]
struct SyncCounters {
    queued: AtomicU64,
    mirrored: AtomicU64,
    failed: AtomicU64,
    skipped: AtomicU64,
}

/// Snapshot of sync activity since startup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStats {
    pub queued: u64,
    pub mirrored: u64,
    pub failed: u64,
    pub skipped: u64,
}

/// Producer side of the sync work queue
#[derive(Debug, Clone)]
pub struct SyncQueue {
    tx: mpsc::UnboundedSender<FileId>,
    counters: Arc<SyncCounters>,
}

/// Consumer side of the sync work queue
#[derive(Debug)]
pub struct SyncReceiver {
    rx: mpsc::UnboundedReceiver<FileId>,
    counters: Arc<SyncCounters>,
}

/// Create a connected sync queue
pub fn sync_queue() -> (SyncQueue, SyncReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let counters = Arc::new(SyncCounters::default());
    (
        SyncQueue {
            tx,
            counters: counters.clone(),
        },
        SyncReceiver { rx, counters },
    )
}

impl SyncQueue {
    /// Enqueue a file for mirroring; never blocks. Returns `false` once the
    /// workers are gone.
    pub fn enqueue(&self, id: FileId) -> bool {
        if self.tx.send(id).is_err() {
            return false;
        }
        self.counters.queued.fetch_add(1, Ordering::Relaxed);
        debug!(id = %id, "Queued file for cloud sync");
        true
    }

    pub fn stats(&self) -> SyncStats {
        SyncStats {
            queued: self.counters.queued.load(Ordering::Relaxed),
            mirrored: self.counters.mirrored.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            skipped: self.counters.skipped.load(Ordering::Relaxed),
        }
    }
}

impl SyncReceiver {
    /// Take the next queued id without waiting
    pub fn try_recv(&mut self) -> Option<FileId> {
        self.rx.try_recv().ok()
    }
}

/// Result of one sync job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Mirrored(String),
    AlreadyMirrored,
    /// The record was deleted before or during the upload
    RecordGone,
    UploadFailed(MirrorError),
    StoreFailed(String),
}

/// Mirror one file and record its remote location
///
/// Safe to run more than once for the same id. A failed upload leaves the
/// record without a remote location so a later re-sync pass picks it up.
pub async fn sync_one(
    store: &dyn MetadataStore,
    mirror: &dyn CloudMirror,
    id: FileId,
) -> SyncOutcome {
    let record = match store.get(&id).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            debug!(id = %id, "Skipping sync, record deleted");
            return SyncOutcome::RecordGone;
        }
        Err(e) => {
            error!(id = %id, error = %e, "Failed to load record for sync");
            return SyncOutcome::StoreFailed(e.to_string());
        }
    };

    if record.is_mirrored() {
        return SyncOutcome::AlreadyMirrored;
    }

    let upload = MirrorUpload {
        key: record.object_key(),
        path: record.local_path.clone(),
        size_bytes: record.size_bytes,
        media_type: record.media_type.clone(),
    };

    let location = match mirror.put(&upload).await {
        Ok(location) => location,
        Err(e) => {
            warn!(id = %id, error = %e, "Cloud upload failed");
            return SyncOutcome::UploadFailed(e);
        }
    };

    match store.set_remote_location(&id, &location, Utc::now()).await {
        Ok(true) => {
            info!(id = %id, location = %location, "File mirrored");
            SyncOutcome::Mirrored(location)
        }
        Ok(false) => {
            // Deleted while the upload was in flight; don't leave the copy behind
            if let Err(e) = mirror.delete(&upload.key).await {
                warn!(id = %id, key = %upload.key, error = %e, "Remote object orphaned");
            }
            SyncOutcome::RecordGone
        }
        Err(e) => {
            error!(id = %id, error = %e, "Failed to record remote location");
            SyncOutcome::StoreFailed(e.to_string())
        }
    }
}

/// Fixed pool of tasks draining the sync queue
pub struct SyncWorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl SyncWorkerPool {
    pub fn spawn(
        workers: usize,
        receiver: SyncReceiver,
        store: Arc<dyn MetadataStore>,
        mirror: Arc<dyn CloudMirror>,
    ) -> Self {
        let counters = receiver.counters.clone();
        let rx = Arc::new(Mutex::new(receiver.rx));
        let workers = workers.max(1);

        let handles = (0..workers)
            .map(|worker| {
                let rx = rx.clone();
                let store = store.clone();
                let mirror = mirror.clone();
                let counters = counters.clone();
                tokio::spawn(async move {
                    loop {
                        let next = rx.lock().await.recv().await;
                        let Some(id) = next else {
                            break;
                        };
                        let counter = match sync_one(store.as_ref(), mirror.as_ref(), id).await {
                            SyncOutcome::Mirrored(_) => &counters.mirrored,
                            SyncOutcome::AlreadyMirrored | SyncOutcome::RecordGone => {
                                &counters.skipped
                            }
                            SyncOutcome::UploadFailed(_) | SyncOutcome::StoreFailed(_) => {
                                &counters.failed
                            }
                        };
                        counter.fetch_add(1, Ordering::Relaxed);
                    }
                    debug!(worker, "Sync worker stopped");
                })
            })
            .collect();

        info!(workers, "Started cloud sync workers");
        Self { handles }
    }

    /// Wait for every worker to finish; they stop once all queue handles are dropped
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Sync worker panicked");
            }
        }
    }

    pub fn abort(&self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}
