//! In-process delivery scheduler.
//!
//! Runs the subscription delivery processor every day at 09:00 UTC and a
//! dry-run check every Monday at 08:00 UTC. Both are also available from
//! `loomi-cli process-deliveries`.

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, TimeDelta, Utc};
use sqlx::PgPool;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument};

use crate::services::deliveries::DeliveryProcessor;

/// A scheduled run of the delivery processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    /// Daily at 09:00 UTC, records deliveries.
    Deliveries,
    /// Mondays at 08:00 UTC, only logs what is due.
    DryRunCheck,
}

impl Job {
    const ALL: [Self; 2] = [Self::Deliveries, Self::DryRunCheck];

    #[must_use]
    pub const fn dry_run(self) -> bool {
        matches!(self, Self::DryRunCheck)
    }

    /// First run strictly after `now`.
    #[must_use]
    pub fn next_after(self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.date_naive();
        match self {
            Self::Deliveries => {
                let at = at_hour(today, 9);
                if at > now { at } else { at_hour(today + Days::new(1), 9) }
            }
            Self::DryRunCheck => {
                let ahead = (7 - today.weekday().num_days_from_monday()) % 7;
                let at = at_hour(today + Days::new(u64::from(ahead)), 8);
                if at > now { at } else { at_hour(today + Days::new(u64::from(ahead) + 7), 8) }
            }
        }
    }
}

fn at_hour(date: NaiveDate, hour: i64) -> DateTime<Utc> {
    (date.and_time(NaiveTime::MIN) + TimeDelta::hours(hour)).and_utc()
}

/// The job due next after `now`, and when.
#[must_use]
pub fn next_job(now: DateTime<Utc>) -> (Job, DateTime<Utc>) {
    Job::ALL
        .into_iter()
        .map(|job| (job, job.next_after(now)))
        .min_by_key(|(_, at)| *at)
        .unwrap_or_else(|| (Job::Deliveries, Job::Deliveries.next_after(now)))
}

/// Spawn the scheduler loop. It runs until the runtime shuts down.
pub fn spawn(pool: PgPool) -> JoinHandle<()> {
    info!("Spawning delivery scheduler");
    tokio::spawn(async move {
        loop {
            let now = Utc::now();
            let (job, at) = next_job(now);
            info!(?job, next_run = %at, "Delivery scheduler waiting");
            tokio::time::sleep((at - now).to_std().unwrap_or_default()).await;
            run_job(&pool, job).await;
        }
    })
}

#[instrument(skip(pool))]
async fn run_job(pool: &PgPool, job: Job) {
    match DeliveryProcessor::new(pool, job.dry_run()).run(Utc::now()).await {
        Ok(report) => info!(?job, ?report, "Scheduled delivery run finished"),
        Err(e) => error!(?job, error = %e, "Scheduled delivery run failed"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_daily_run() {
        // 2025-03-05 is a Wednesday
        assert_eq!(
            Job::Deliveries.next_after(utc(2025, 3, 5, 8, 59)),
            utc(2025, 3, 5, 9, 0)
        );
        assert_eq!(
            Job::Deliveries.next_after(utc(2025, 3, 5, 9, 0)),
            utc(2025, 3, 6, 9, 0)
        );
    }

    #[test]
    fn test_monday_check() {
        assert_eq!(
            Job::DryRunCheck.next_after(utc(2025, 3, 5, 12, 0)),
            utc(2025, 3, 10, 8, 0)
        );
        // Monday before and after 08:00
        assert_eq!(
            Job::DryRunCheck.next_after(utc(2025, 3, 10, 7, 0)),
            utc(2025, 3, 10, 8, 0)
        );
        assert_eq!(
            Job::DryRunCheck.next_after(utc(2025, 3, 10, 8, 30)),
            utc(2025, 3, 17, 8, 0)
        );
    }

    #[test]
    fn test_next_job() {
        assert_eq!(
            next_job(utc(2025, 3, 10, 7, 0)),
            (Job::DryRunCheck, utc(2025, 3, 10, 8, 0))
        );
        assert_eq!(
            next_job(utc(2025, 3, 10, 8, 0)),
            (Job::Deliveries, utc(2025, 3, 10, 9, 0))
        );
        assert!(Job::DryRunCheck.dry_run());
        assert!(!Job::Deliveries.dry_run());
    }
}
