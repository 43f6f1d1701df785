//! Daily trigger for the retention cleanup

use crate::retention::RetentionPolicy;
use crate::service::FileService;
use crate::types::CleanupReport;
use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Wall-clock time of day (UTC) at which cleanup fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    time: NaiveTime,
}

impl DailySchedule {
    /// `None` unless `hour < 24` and `minute < 60`
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(|time| Self { time })
    }

    /// The first firing strictly after `now`
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = Utc.from_utc_datetime(&now.date_naive().and_time(self.time));
        if today > now {
            today
        } else {
            today + Duration::days(1)
        }
    }
}

impl Default for DailySchedule {
    fn default() -> Self {
        Self {
            time: NaiveTime::from_hms_opt(20, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

/// Runs the cleanup once a day for the life of the process
#[derive(Clone)]
pub struct RetentionScheduler {
    service: Arc<FileService>,
    schedule: DailySchedule,
    policy: RetentionPolicy,
}

impl RetentionScheduler {
    pub fn new(service: Arc<FileService>, schedule: DailySchedule, policy: RetentionPolicy) -> Self {
        Self {
            service,
            schedule,
            policy,
        }
    }

    /// Run one cleanup unless the previous one is still going
    pub async fn fire(&self) -> Option<CleanupReport> {
        match self.service.try_run_cleanup(self.policy).await {
            None => {
                warn!("Skipping scheduled cleanup, previous run still in progress");
                None
            }
            Some(Ok(report)) => Some(report),
            Some(Err(e)) => {
                error!(error = %e, "Scheduled cleanup failed");
                None
            }
        }
    }

    pub async fn run(self) {
        info!(
            at = %self.schedule.time,
            stale_days = self.policy.stale_days,
            unused_days = self.policy.unused_days,
            "Cleanup scheduler started"
        );
        loop {
            let now = Utc::now();
            let next = self.schedule.next_after(now);
            let wait = (next - now).to_std().unwrap_or_default();
            info!(next = %next, "Next cleanup scheduled");
            tokio::time::sleep(wait).await;

            // A run that outlasts the period must not stack up behind itself
            let this = self.clone();
            tokio::spawn(async move {
                this.fire().await;
            });
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
