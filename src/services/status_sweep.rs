use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::utils::logger::{event_fields, LOGGER};

/// Moves interviews that were never closed from `upcoming` to `completed`
/// once their start time is further back than the grace period.
pub struct StatusSweepService {
    pub db: PgPool,
    pub grace: Duration,
}

pub fn overdue_cutoff(now: DateTime<Utc>, grace: Duration) -> DateTime<Utc> {
    now - grace.max(Duration::zero())
}

impl StatusSweepService {
    pub fn new(db: PgPool, grace_minutes: i64) -> Self {
        Self {
            db,
            grace: Duration::minutes(grace_minutes),
        }
    }

    pub async fn complete_overdue(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE interviews
            SET status = 'completed', end_time = $1, updated_at = $1
            WHERE status = 'upcoming' AND start_time < $2
            "#,
        )
        .bind(now)
        .bind(overdue_cutoff(now, self.grace))
        .execute(&self.db)
        .await?;

        let completed = result.rows_affected();
        if completed > 0 {
            LOGGER.log_business_event(
                "overdue_interviews_completed",
                None,
                event_fields([("count", completed.into())]),
            );
        }

        Ok(completed)
    }
}

/// Registers the sweep as a cron job and starts the scheduler. The returned
/// scheduler must be kept alive for the job to keep firing.
pub async fn start_scheduler(db: PgPool, cron: &str, grace_minutes: i64) -> Result<JobScheduler> {
    let sched = JobScheduler::new().await?;

    let job = Job::new_async(cron, move |_uuid, _l| {
        let service = StatusSweepService::new(db.clone(), grace_minutes);
        Box::pin(async move {
            match service.complete_overdue(Utc::now()).await {
                Ok(count) => tracing::debug!("Status sweep finished, {} interviews completed", count),
                Err(e) => tracing::error!("Status sweep failed: {}", e),
            }
        })
    })?;

    sched.add(job).await?;
    sched.start().await?;

    tracing::info!("Status sweep scheduled with cron '{}'", cron);
    Ok(sched)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cutoff_subtracts_grace() {
        let now: DateTime<Utc> = "2025-03-10T09:00:00Z".parse().unwrap();
        let cutoff = overdue_cutoff(now, Duration::minutes(60));
        assert_eq!(cutoff, "2025-03-10T08:00:00Z".parse::<DateTime<Utc>>().unwrap());
    }

    #[test]
    fn negative_grace_is_ignored() {
        let now = Utc::now();
        assert_eq!(overdue_cutoff(now, Duration::minutes(-15)), now);
    }
}
