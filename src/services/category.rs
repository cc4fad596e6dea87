//! Sorting interviews into the four lifecycle buckets shown in list views.
//!
//! The boundary between "upcoming" and "completed" is driven by the clock,
//! not by the stored status: an interview still marked `upcoming` whose start
//! time has passed is reported as completed. The current time is always an
//! explicit argument.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::models::interview::{Interview, InterviewStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterviewCategory {
    Upcoming,
    Completed,
    Succeeded,
    Failed,
}

impl InterviewCategory {
    pub const ALL: [InterviewCategory; 4] = [
        InterviewCategory::Upcoming,
        InterviewCategory::Completed,
        InterviewCategory::Succeeded,
        InterviewCategory::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InterviewCategory::Upcoming => "upcoming",
            InterviewCategory::Completed => "completed",
            InterviewCategory::Succeeded => "succeeded",
            InterviewCategory::Failed => "failed",
        }
    }
}

impl fmt::Display for InterviewCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown interview category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for InterviewCategory {
    type Err = UnknownCategory;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "upcoming" => Ok(InterviewCategory::Upcoming),
            "completed" => Ok(InterviewCategory::Completed),
            "succeeded" => Ok(InterviewCategory::Succeeded),
            "failed" => Ok(InterviewCategory::Failed),
            _ => Err(UnknownCategory(raw.to_string())),
        }
    }
}

/// Bucket membership for one interview.
///
/// Rules per bucket:
/// - succeeded / failed: the status says so.
/// - completed: the status says so, or no verdict yet and the start time is not in the future.
/// - upcoming: no verdict yet and the start time is in the future.
///
/// Buckets are checked independently, so a `completed` interview whose start
/// time is still ahead sits in both "upcoming" and "completed". Statuses
/// outside the known four belong to no bucket.
pub fn belongs_to(
    status: &InterviewStatus,
    start_time: DateTime<Utc>,
    category: InterviewCategory,
    now: DateTime<Utc>,
) -> bool {
    if let InterviewStatus::Other(_) = status {
        return false;
    }

    let started = start_time <= now;

    match category {
        InterviewCategory::Succeeded => *status == InterviewStatus::Succeeded,
        InterviewCategory::Failed => *status == InterviewStatus::Failed,
        InterviewCategory::Completed => {
            *status == InterviewStatus::Completed || (!status.is_decided() && started)
        }
        InterviewCategory::Upcoming => !status.is_decided() && !started,
    }
}

/// String-keyed variant of [`belongs_to`]; an unrecognised bucket name never matches.
pub fn matches_category_name(
    status: &InterviewStatus,
    start_time: DateTime<Utc>,
    category: &str,
    now: DateTime<Utc>,
) -> bool {
    category
        .parse::<InterviewCategory>()
        .map(|category| belongs_to(status, start_time, category, now))
        .unwrap_or(false)
}

/// Every bucket an interview falls in, in [`InterviewCategory::ALL`] order.
pub fn categories_of(
    status: &InterviewStatus,
    start_time: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Vec<InterviewCategory> {
    InterviewCategory::ALL
        .into_iter()
        .filter(|category| belongs_to(status, start_time, *category, now))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedInterviews<T> {
    pub upcoming: Vec<T>,
    pub completed: Vec<T>,
    pub succeeded: Vec<T>,
    pub failed: Vec<T>,
}

impl<T> GroupedInterviews<T> {
    pub fn bucket_mut(&mut self, category: InterviewCategory) -> &mut Vec<T> {
        match category {
            InterviewCategory::Upcoming => &mut self.upcoming,
            InterviewCategory::Completed => &mut self.completed,
            InterviewCategory::Succeeded => &mut self.succeeded,
            InterviewCategory::Failed => &mut self.failed,
        }
    }

    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> GroupedInterviews<U> {
        GroupedInterviews {
            upcoming: self.upcoming.into_iter().map(&mut f).collect(),
            completed: self.completed.into_iter().map(&mut f).collect(),
            succeeded: self.succeeded.into_iter().map(&mut f).collect(),
            failed: self.failed.into_iter().map(&mut f).collect(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategoryCounts {
    pub upcoming: usize,
    pub completed: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Splits interviews into buckets, keeping input order inside each bucket.
/// Each bucket holds exactly what the single-bucket listing would return, so an
/// interview matching two buckets appears in both. Interviews with an
/// unrecognised status are dropped with a warning.
pub fn group_by_category(interviews: Vec<Interview>, now: DateTime<Utc>) -> GroupedInterviews<Interview> {
    let mut grouped = GroupedInterviews {
        upcoming: Vec::new(),
        completed: Vec::new(),
        succeeded: Vec::new(),
        failed: Vec::new(),
    };

    for interview in interviews {
        let categories = categories_of(&interview.status, interview.start_time, now);
        match categories.split_last() {
            Some((last, rest)) => {
                for category in rest {
                    grouped.bucket_mut(*category).push(interview.clone());
                }
                grouped.bucket_mut(*last).push(interview);
            }
            None => tracing::warn!(
                interview_id = %interview.id,
                status = %interview.status,
                "interview has a status outside every category"
            ),
        }
    }

    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::interview::sample_interview;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        "2025-03-10T09:00:00Z".parse().unwrap()
    }

    fn memberships(status: InterviewStatus, start: DateTime<Utc>) -> Vec<InterviewCategory> {
        categories_of(&status, start, now())
    }

    #[test]
    fn succeeded_only_in_succeeded_bucket() {
        for start in [now() - Duration::days(3), now() + Duration::days(3)] {
            assert_eq!(
                memberships(InterviewStatus::Succeeded, start),
                vec![InterviewCategory::Succeeded]
            );
        }
    }

    #[test]
    fn failed_only_in_failed_bucket() {
        for start in [now() - Duration::days(3), now() + Duration::days(3)] {
            assert_eq!(
                memberships(InterviewStatus::Failed, start),
                vec![InterviewCategory::Failed]
            );
        }
    }

    #[test]
    fn overdue_upcoming_counts_as_completed() {
        let start = now() - Duration::minutes(30);
        assert!(belongs_to(&InterviewStatus::Upcoming, start, InterviewCategory::Completed, now()));
        assert!(!belongs_to(&InterviewStatus::Upcoming, start, InterviewCategory::Upcoming, now()));
    }

    #[test]
    fn future_upcoming_is_upcoming() {
        let start = now() + Duration::hours(2);
        assert!(belongs_to(&InterviewStatus::Upcoming, start, InterviewCategory::Upcoming, now()));
        assert!(!belongs_to(&InterviewStatus::Upcoming, start, InterviewCategory::Completed, now()));
    }

    #[test]
    fn completed_yesterday_is_only_completed() {
        assert_eq!(
            memberships(InterviewStatus::Completed, now() - Duration::days(1)),
            vec![InterviewCategory::Completed]
        );
    }

    #[test]
    fn completed_with_future_start_is_upcoming_and_completed() {
        let start = now() + Duration::days(1);
        assert!(belongs_to(&InterviewStatus::Completed, start, InterviewCategory::Upcoming, now()));
        assert_eq!(
            memberships(InterviewStatus::Completed, start),
            vec![InterviewCategory::Upcoming, InterviewCategory::Completed]
        );
    }

    #[test]
    fn start_exactly_now_is_completed() {
        assert_eq!(
            memberships(InterviewStatus::Upcoming, now()),
            vec![InterviewCategory::Completed]
        );
    }

    #[test]
    fn unknown_status_matches_nothing() {
        let status = InterviewStatus::Other("upcomming".to_string());
        assert!(memberships(status.clone(), now() - Duration::days(1)).is_empty());
        assert!(memberships(status, now() + Duration::days(1)).is_empty());
    }

    #[test]
    fn unknown_category_name_never_matches() {
        let start = now() - Duration::days(1);
        assert!(matches_category_name(&InterviewStatus::Completed, start, "completed", now()));
        assert!(matches_category_name(&InterviewStatus::Completed, start, "Completed", now()));
        assert!(!matches_category_name(&InterviewStatus::Completed, start, "archived", now()));
    }

    #[test]
    fn parse_rejects_unknown_names() {
        assert_eq!("failed".parse::<InterviewCategory>(), Ok(InterviewCategory::Failed));
        assert_eq!(
            "done".parse::<InterviewCategory>(),
            Err(UnknownCategory("done".to_string()))
        );
    }

    #[test]
    fn grouping_keeps_order_and_drops_unknown() {
        let interviews = vec![
            sample_interview("a", InterviewStatus::Upcoming, now() + Duration::days(1), "s1"),
            sample_interview("b", InterviewStatus::Upcoming, now() - Duration::days(1), "s2"),
            sample_interview("c", InterviewStatus::Succeeded, now() - Duration::days(2), "s3"),
            sample_interview("d", InterviewStatus::Other("paused".into()), now(), "s4"),
            sample_interview("e", InterviewStatus::Upcoming, now() + Duration::days(2), "s5"),
        ];

        let grouped = group_by_category(interviews, now());
        let titles = |bucket: &Vec<Interview>| bucket.iter().map(|i| i.title.clone()).collect::<Vec<_>>();

        assert_eq!(titles(&grouped.upcoming), vec!["a", "e"]);
        assert_eq!(titles(&grouped.completed), vec!["b"]);
        assert_eq!(titles(&grouped.succeeded), vec!["c"]);
        assert!(grouped.failed.is_empty());
    }

    #[test]
    fn grouping_places_overlapping_interview_in_both_buckets() {
        let interviews = vec![
            sample_interview("early-close", InterviewStatus::Completed, now() + Duration::days(1), "s1"),
            sample_interview("next-week", InterviewStatus::Upcoming, now() + Duration::days(7), "s2"),
        ];

        let grouped = group_by_category(interviews, now());
        let titles = |bucket: &Vec<Interview>| bucket.iter().map(|i| i.title.clone()).collect::<Vec<_>>();

        assert_eq!(titles(&grouped.upcoming), vec!["early-close", "next-week"]);
        assert_eq!(titles(&grouped.completed), vec!["early-close"]);
        assert!(grouped.succeeded.is_empty());
        assert!(grouped.failed.is_empty());
    }
}
