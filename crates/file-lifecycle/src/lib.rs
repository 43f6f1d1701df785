//! File lifecycle engine
//!
//! Streams uploads to a local blob store, commits a metadata record, mirrors
//! every file to a remote object store in the background, and purges files
//! that are stale or were never downloaded.

mod blob_store;
mod deletion;
mod error;
mod ingest;
mod mirror;
mod retention;
mod scheduler;
mod service;
mod store;
mod sync;
#[cfg(test)]
mod test_support;
mod types;

pub use blob_store::LocalBlobStore;
pub use deletion::Deletion;
pub use error::{IngestFailure, LifecycleError, MirrorError, Result, StoreError};
pub use ingest::{derive_extension, DEFAULT_CHUNK_SIZE};
pub use mirror::{CloudMirror, MirrorUpload, SimulatedMirror};
pub use retention::{select_for_cleanup, RetentionPolicy};
pub use scheduler::{DailySchedule, RetentionScheduler};
pub use service::{FileService, OpenedFile};
pub use store::{MemoryMetadataStore, MetadataStore};
pub use sync::{sync_one, sync_queue, SyncOutcome, SyncQueue, SyncReceiver, SyncStats, SyncWorkerPool};
pub use types::{CleanupReport, FileId, FileRecord, Upload};
