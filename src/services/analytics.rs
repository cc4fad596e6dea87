use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgPool, Row};
use std::{collections::HashMap, time::Instant};

use crate::{
    models::{interview::InterviewStatus, role_change::RoleChangeStatus, track::TrackValue},
    services::category::{categories_of, CategoryCounts, InterviewCategory},
    utils::logger::LOGGER,
};

#[derive(Debug, Serialize)]
pub struct AnalyticsResponse {
    pub total_students: i64,
    pub total_staff: i64,
    pub total_guests: i64,
    pub total_interviews: usize,
    pub interviews_by_category: CategoryCounts,
    pub role_changes: RoleChangeStats,
    pub tracks: TrackStats,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Default, PartialEq, Serialize)]
pub struct RoleChangeStats {
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
}

#[derive(Debug, Default, PartialEq, Serialize)]
pub struct TrackStats {
    pub tvl: i64,
    pub academic: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    #[error("database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for AnalyticsError {
    fn from(error: sqlx::Error) -> Self {
        AnalyticsError::DatabaseError(error.to_string())
    }
}

/// Per-bucket counts; an interview matching two buckets is counted in both.
pub fn count_categories(
    interviews: &[(InterviewStatus, DateTime<Utc>)],
    now: DateTime<Utc>,
) -> CategoryCounts {
    let mut counts = CategoryCounts::default();
    for (status, start_time) in interviews {
        for category in categories_of(status, *start_time, now) {
            match category {
                InterviewCategory::Upcoming => counts.upcoming += 1,
                InterviewCategory::Completed => counts.completed += 1,
                InterviewCategory::Succeeded => counts.succeeded += 1,
                InterviewCategory::Failed => counts.failed += 1,
            }
        }
    }
    counts
}

#[derive(Debug)]
pub struct AnalyticsService {
    pool: PgPool,
}

impl AnalyticsService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_dashboard(&self, now: DateTime<Utc>) -> Result<AnalyticsResponse, AnalyticsError> {
        let start_time = Instant::now();

        let (
            (total_students, total_staff, total_guests),
            interviews,
            role_changes,
            tracks,
        ) = tokio::try_join!(
            self.get_user_counts(),
            self.get_interview_schedule(),
            self.get_role_change_stats(),
            self.get_track_stats(),
        )?;

        LOGGER.log_performance_metric(
            "analytics_total_duration_ms",
            start_time.elapsed().as_millis() as f64,
        );

        Ok(AnalyticsResponse {
            total_students,
            total_staff,
            total_guests,
            total_interviews: interviews.len(),
            interviews_by_category: count_categories(&interviews, now),
            role_changes,
            tracks,
            generated_at: now,
        })
    }

    async fn get_user_counts(&self) -> Result<(i64, i64, i64), sqlx::Error> {
        let row = sqlx::query(
            "SELECT
                COUNT(*) FILTER (WHERE role = 'student')::bigint AS students,
                COUNT(*) FILTER (WHERE role IN ('teacher', 'admin'))::bigint AS staff,
                COUNT(*) FILTER (WHERE role = 'guest')::bigint AS guests
             FROM users",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok((row.get(0), row.get(1), row.get(2)))
    }

    // Buckets depend on the clock, so they are computed here rather than in SQL.
    async fn get_interview_schedule(&self) -> Result<Vec<(InterviewStatus, DateTime<Utc>)>, sqlx::Error> {
        let rows = sqlx::query("SELECT status, start_time FROM interviews")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let status: String = row.get(0);
                (InterviewStatus::from(status), row.get(1))
            })
            .collect())
    }

    async fn get_role_change_stats(&self) -> Result<RoleChangeStats, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT status, COUNT(*)::bigint FROM role_change_requests GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut stats = RoleChangeStats::default();
        for row in rows {
            let status: RoleChangeStatus = row.get(0);
            let count: i64 = row.get(1);
            match status {
                RoleChangeStatus::Pending => stats.pending = count,
                RoleChangeStatus::Approved => stats.approved = count,
                RoleChangeStatus::Rejected => stats.rejected = count,
            }
        }
        Ok(stats)
    }

    /// Only selections made by users who are currently students are counted.
    async fn get_track_stats(&self) -> Result<TrackStats, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT t.value, COUNT(*)::bigint
             FROM track_selections t
             JOIN users u ON u.id = t.user_id
             WHERE u.role = 'student'
             GROUP BY t.value",
        )
        .fetch_all(&self.pool)
        .await?;

        let counts: HashMap<TrackValue, i64> = rows
            .iter()
            .map(|row| (row.get::<TrackValue, _>(0), row.get::<i64, _>(1)))
            .collect();

        Ok(TrackStats {
            tvl: counts.get(&TrackValue::Tvl).copied().unwrap_or(0),
            academic: counts.get(&TrackValue::Academic).copied().unwrap_or(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn counts_follow_classifier() {
        let now: DateTime<Utc> = "2025-03-10T09:00:00Z".parse().unwrap();
        let interviews = vec![
            (InterviewStatus::Upcoming, now + Duration::days(1)),
            (InterviewStatus::Upcoming, now - Duration::days(1)),
            (InterviewStatus::Completed, now - Duration::days(2)),
            (InterviewStatus::Succeeded, now - Duration::days(3)),
            (InterviewStatus::Failed, now - Duration::days(3)),
            (InterviewStatus::Failed, now + Duration::days(3)),
            (InterviewStatus::Completed, now + Duration::days(1)),
            (InterviewStatus::Other("draft".to_string()), now),
        ];

        assert_eq!(
            count_categories(&interviews, now),
            CategoryCounts {
                upcoming: 2,
                completed: 3,
                succeeded: 1,
                failed: 2,
            }
        );
    }
}
