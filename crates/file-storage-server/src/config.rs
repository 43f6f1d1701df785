use std::env;
use std::path::PathBuf;

use file_lifecycle::{DailySchedule, RetentionPolicy, DEFAULT_CHUNK_SIZE};

use crate::error::{Result, ServerError};

/// Application configuration parsed from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Unset means records live in memory for the life of the process
    pub database_url: Option<String>,
    pub upload_dir: PathBuf,
    pub chunk_size: usize,
    pub retention: RetentionPolicy,
    pub schedule: DailySchedule,
    pub sync_workers: usize,
    /// Unset means uploads go to the simulated mirror
    pub mirror_url: Option<String>,
    pub mirror_public_url: String,
    pub max_upload_bytes: usize,
}

impl Config {
    /// Parse configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Parse configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let parsed = |key: &str, default: u64| -> Result<u64> {
            match lookup(key) {
                Some(raw) => raw.trim().parse().map_err(|_| {
                    ServerError::Config(format!("{} must be a non-negative integer, got {:?}", key, raw))
                }),
                None => Ok(default),
            }
        };

        let port = u16::try_from(parsed("PORT", 8123)?)
            .map_err(|_| ServerError::Config("PORT out of range".to_string()))?;

        let database_url = lookup("DATABASE_URL").filter(|url| !url.is_empty());

        let upload_dir = lookup("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("uploads"));

        let chunk_size = to_usize(parsed("CHUNK_SIZE", DEFAULT_CHUNK_SIZE as u64)?).max(1);

        let retention = RetentionPolicy::new(
            to_u32(parsed("CLEAN_OLD_FILES_DAYS", 30)?),
            to_u32(parsed("CLEAN_FILES_NO_USE_DAYS", 1)?),
        );

        let hour = to_u32(parsed("CLEANUP_HOUR", 20)?);
        let minute = to_u32(parsed("CLEANUP_MINUTE", 0)?);
        let schedule = DailySchedule::new(hour, minute).ok_or_else(|| {
            ServerError::Config(format!("invalid cleanup time {:02}:{:02}", hour, minute))
        })?;

        let sync_workers = to_usize(parsed("SYNC_WORKERS", 4)?).max(1);

        let mirror_url = lookup("MIRROR_URL").filter(|url| !url.is_empty());
        let mirror_public_url = lookup("MIRROR_PUBLIC_URL")
            .unwrap_or_else(|| "https://example-cloud-storage.com".to_string());

        let max_upload_bytes = to_usize(parsed("MAX_UPLOAD_BYTES", 1024 * 1024 * 1024)?);

        Ok(Self {
            port,
            database_url,
            upload_dir,
            chunk_size,
            retention,
            schedule,
            sync_workers,
            mirror_url,
            mirror_public_url,
            max_upload_bytes,
        })
    }
}

fn to_u32(n: u64) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

fn to_usize(n: u64) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}
