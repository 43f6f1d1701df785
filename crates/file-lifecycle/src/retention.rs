//! Retention policy: which files to purge and the cleanup run itself

use crate::deletion::Deletion;
use crate::error::Result;
use crate::service::FileService;
use crate::types::{CleanupReport, FileId, FileRecord};
use chrono::{DateTime, Datelike, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{error, info};

/// Day thresholds for the two cleanup rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    /// Files not updated for this many days are deleted regardless of access
    pub stale_days: u32,
    /// Files never downloaded and not updated for this many days are deleted
    pub unused_days: u32,
}

impl RetentionPolicy {
    pub fn new(stale_days: u32, unused_days: u32) -> Self {
        Self {
            stale_days,
            unused_days,
        }
    }

    /// `None` when the threshold reaches past the earliest storable
    /// timestamp, in which case the rule matches nothing
    pub fn stale_cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        days_before(now, self.stale_days)
    }

    pub fn unused_cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        days_before(now, self.unused_days)
    }
}

fn days_before(now: DateTime<Utc>, days: u32) -> Option<DateTime<Utc>> {
    let cutoff = now.checked_sub_signed(TimeDelta::try_days(i64::from(days))?)?;
    (cutoff.year() >= 1).then_some(cutoff)
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::new(30, 1)
    }
}

/// Union of the stale and unused selections, each id once, first-seen order
pub fn select_for_cleanup(stale: &[FileRecord], unused: &[FileRecord]) -> Vec<FileId> {
    let mut seen = HashSet::new();
    stale
        .iter()
        .chain(unused)
        .map(|record| record.id)
        .filter(|id| seen.insert(*id))
        .collect()
}

impl FileService {
    /// Purge stale and unused files as of now
    pub async fn run_cleanup(&self, stale_days: u32, unused_days: u32) -> Result<CleanupReport> {
        self.run_cleanup_at(RetentionPolicy::new(stale_days, unused_days), Utc::now())
            .await
    }

    /// Purge files as of `now`, waiting for any run already in progress
    pub async fn run_cleanup_at(
        &self,
        policy: RetentionPolicy,
        now: DateTime<Utc>,
    ) -> Result<CleanupReport> {
        let _running = self.cleanup_guard.lock().await;
        self.cleanup(policy, now).await
    }

    /// Purge files unless a run is already in progress, in which case `None`
    pub async fn try_run_cleanup(&self, policy: RetentionPolicy) -> Option<Result<CleanupReport>> {
        let _running = self.cleanup_guard.try_lock().ok()?;
        Some(self.cleanup(policy, Utc::now()).await)
    }

    async fn cleanup(&self, policy: RetentionPolicy, now: DateTime<Utc>) -> Result<CleanupReport> {
        let stale = match policy.stale_cutoff(now) {
            Some(cutoff) => self.store.updated_before(cutoff, false).await?,
            None => Vec::new(),
        };
        let unused = match policy.unused_cutoff(now) {
            Some(cutoff) => self.store.updated_before(cutoff, true).await?,
            None => Vec::new(),
        };
        let selected = select_for_cleanup(&stale, &unused);

        let mut report = CleanupReport {
            stale: stale.len(),
            unused: unused.len(),
            selected: selected.len(),
            ..Default::default()
        };

        for id in selected {
            match self.delete_file(&id).await {
                Ok(Deletion::Deleted) => report.deleted += 1,
                Ok(Deletion::RemoteOrphaned(_)) => {
                    report.deleted += 1;
                    report.remote_orphans += 1;
                }
                Ok(Deletion::NotFound) => report.already_gone += 1,
                Err(e) => {
                    error!(id = %id, error = %e, "Cleanup failed to delete file");
                    report.failed += 1;
                }
            }
        }

        info!(
            stale_days = policy.stale_days,
            unused_days = policy.unused_days,
            selected = report.selected,
            deleted = report.deleted,
            remote_orphans = report.remote_orphans,
            failed = report.failed,
            "Cleanup run finished"
        );

        Ok(report)
    }
}
