//! File storage service
//!
//! HTTP surface over the file lifecycle engine: uploads are streamed to
//! local disk, mirrored to a cloud object store in the background and
//! purged by a daily retention job.

pub mod config;
pub mod error;
pub mod routes;
pub mod server;
pub mod state;
pub mod types;
