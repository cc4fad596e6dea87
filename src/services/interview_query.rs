use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::{collections::HashMap, time::Instant};

use crate::{
    models::{
        interview::{Interview, InterviewResponse},
        user::User,
    },
    services::{
        category::{belongs_to, group_by_category, GroupedInterviews, InterviewCategory},
        pagination::{filter_by_search, paginate, Page, PageQuery, PageWindow, Searchable},
    },
    utils::logger::{event_fields, LOGGER},
};

pub const DEFAULT_INTERVIEWS_PER_PAGE: usize = 6;

/// Interview joined with the data a list row needs about its candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterviewListItem {
    #[serde(flatten)]
    pub interview: InterviewResponse,
    pub candidate_name: Option<String>,
    pub candidate_image: Option<String>,
}

impl Searchable for InterviewListItem {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.interview.title.as_str()];
        if let Some(name) = &self.candidate_name {
            fields.push(name);
        }
        if let Some(description) = &self.interview.description {
            fields.push(description);
        }
        fields
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterviewView {
    /// Everything, newest start time first.
    Schedule,
    /// One bucket, in storage order.
    Category(InterviewCategory),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InterviewListQuery {
    pub view: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub items_per_page: Option<i64>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InterviewQueryError {
    #[error("unknown view '{0}', expected 'schedule' or 'category'")]
    UnknownView(String),
    #[error("the category view needs a category")]
    MissingCategory,
    #[error("the schedule view does not take a category")]
    CategoryWithSchedule,
    #[error(transparent)]
    UnknownCategory(#[from] crate::services::category::UnknownCategory),
    #[error("database error: {0}")]
    Database(String),
}

impl InterviewListQuery {
    pub fn page_query(&self) -> PageQuery {
        PageQuery {
            search: self.search.clone(),
            page: self.page,
            items_per_page: self.items_per_page,
        }
    }

    pub fn view(&self) -> Result<InterviewView, InterviewQueryError> {
        let category = self.category.as_deref().filter(|c| !c.trim().is_empty());

        match self.view.as_deref().map(str::trim) {
            // a bare ?category= is accepted as shorthand for the category view
            None | Some("") => match category {
                Some(category) => Ok(InterviewView::Category(category.parse()?)),
                None => Ok(InterviewView::Schedule),
            },
            Some("schedule") => match category {
                Some(_) => Err(InterviewQueryError::CategoryWithSchedule),
                None => Ok(InterviewView::Schedule),
            },
            Some("category") => {
                let category = category.ok_or(InterviewQueryError::MissingCategory)?;
                Ok(InterviewView::Category(category.parse()?))
            }
            Some(other) => Err(InterviewQueryError::UnknownView(other.to_string())),
        }
    }
}

fn index_by_external_id(users: &[User]) -> HashMap<&str, &User> {
    users
        .iter()
        .map(|user| (user.external_id.as_str(), user))
        .collect()
}

fn to_list_item(interview: Interview, users: &HashMap<&str, &User>) -> InterviewListItem {
    let candidate = users.get(interview.candidate_id.as_str());
    InterviewListItem {
        candidate_name: candidate.map(|user| user.name.clone()),
        candidate_image: candidate.and_then(|user| user.image.clone()),
        interview: InterviewResponse::from(interview),
    }
}

pub fn join_candidates(interviews: Vec<Interview>, users: &[User]) -> Vec<InterviewListItem> {
    let index = index_by_external_id(users);
    interviews
        .into_iter()
        .map(|interview| to_list_item(interview, &index))
        .collect()
}

/// Filter, search, sort and cut one page of interviews. Expects interviews in
/// storage (creation) order.
pub fn build_interview_page(
    interviews: Vec<Interview>,
    users: &[User],
    view: InterviewView,
    search: Option<&str>,
    window: PageWindow,
    now: DateTime<Utc>,
) -> Page<InterviewListItem> {
    let interviews: Vec<Interview> = match view {
        InterviewView::Schedule => interviews,
        InterviewView::Category(category) => interviews
            .into_iter()
            .filter(|interview| belongs_to(&interview.status, interview.start_time, category, now))
            .collect(),
    };

    let mut items = filter_by_search(join_candidates(interviews, users), search);

    if view == InterviewView::Schedule {
        items.sort_by(|a, b| b.interview.start_time.cmp(&a.interview.start_time));
    }

    paginate(items, window)
}

#[derive(Debug)]
pub struct InterviewQueryService {
    pool: PgPool,
}

impl InterviewQueryService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_all(&self) -> Result<(Vec<Interview>, Vec<User>), InterviewQueryError> {
        let start_time = Instant::now();
        let query = "SELECT * FROM interviews ORDER BY created_at ASC, id ASC";

        let (interviews, users) = tokio::try_join!(
            sqlx::query_as::<_, Interview>(query).fetch_all(&self.pool),
            sqlx::query_as::<_, User>("SELECT * FROM users").fetch_all(&self.pool),
        )
        .map_err(|e| InterviewQueryError::Database(e.to_string()))?;

        LOGGER.log_database_query(query, start_time.elapsed().as_millis(), Some(interviews.len()));
        Ok((interviews, users))
    }

    pub async fn list_page(
        &self,
        query: &InterviewListQuery,
        now: DateTime<Utc>,
    ) -> Result<Page<InterviewListItem>, InterviewQueryError> {
        let view = query.view()?;
        let (interviews, users) = self.load_all().await?;

        let page_query = query.page_query();
        let page = build_interview_page(
            interviews,
            &users,
            view,
            page_query.search_term(),
            page_query.window(DEFAULT_INTERVIEWS_PER_PAGE),
            now,
        );

        LOGGER.log_business_event(
            "interview_page_served",
            None,
            event_fields([
                ("total_count", page.total_count.into()),
                ("returned", page.items.len().into()),
            ]),
        );

        Ok(page)
    }

    pub async fn grouped(
        &self,
        now: DateTime<Utc>,
    ) -> Result<GroupedInterviews<InterviewListItem>, InterviewQueryError> {
        let (interviews, users) = self.load_all().await?;
        let index = index_by_external_id(&users);
        Ok(group_by_category(interviews, now).map(|interview| to_list_item(interview, &index)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        interview::{sample_interview, InterviewStatus},
        user::{sample_user, UserRole},
    };
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        "2025-03-10T09:00:00Z".parse().unwrap()
    }

    fn users() -> Vec<User> {
        vec![
            sample_user("s1", "Maria Santos", UserRole::Student),
            sample_user("s2", "Jose Rizal", UserRole::Student),
        ]
    }

    fn interviews() -> Vec<Interview> {
        vec![
            sample_interview("Engineering", InterviewStatus::Upcoming, now() + Duration::days(1), "s1"),
            sample_interview("Nursing", InterviewStatus::Completed, now() - Duration::days(1), "s2"),
            sample_interview("Education", InterviewStatus::Succeeded, now() - Duration::days(5), "s1"),
            sample_interview("Accountancy", InterviewStatus::Upcoming, now() - Duration::hours(1), "s2"),
            sample_interview("Agriculture", InterviewStatus::Failed, now() - Duration::days(9), "ghost"),
        ]
    }

    fn titles(page: &Page<InterviewListItem>) -> Vec<&str> {
        page.items.iter().map(|i| i.interview.title.as_str()).collect()
    }

    #[test]
    fn schedule_view_sorts_newest_first() {
        let page = build_interview_page(
            interviews(),
            &users(),
            InterviewView::Schedule,
            None,
            PageWindow::new(1, 10),
            now(),
        );
        assert_eq!(
            titles(&page),
            vec!["Engineering", "Accountancy", "Nursing", "Education", "Agriculture"]
        );
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn category_view_keeps_storage_order() {
        let page = build_interview_page(
            interviews(),
            &users(),
            InterviewView::Category(InterviewCategory::Completed),
            None,
            PageWindow::new(1, 10),
            now(),
        );
        assert_eq!(titles(&page), vec!["Nursing", "Accountancy"]);
        assert_eq!(page.total_count, 2);
    }

    #[test]
    fn search_matches_candidate_name() {
        let page = build_interview_page(
            interviews(),
            &users(),
            InterviewView::Schedule,
            Some("santos"),
            PageWindow::new(1, 10),
            now(),
        );
        assert_eq!(titles(&page), vec!["Engineering", "Education"]);
    }

    #[test]
    fn missing_candidate_has_no_name() {
        let items = join_candidates(interviews(), &users());
        let orphan = items.iter().find(|i| i.interview.candidate_id == "ghost").unwrap();
        assert_eq!(orphan.candidate_name, None);
        assert_eq!(items[0].candidate_name.as_deref(), Some("Maria Santos"));
    }

    #[test]
    fn five_items_two_per_page() {
        let page = build_interview_page(
            interviews(),
            &users(),
            InterviewView::Schedule,
            None,
            PageWindow::new(3, 2),
            now(),
        );
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total_pages, 3);
        assert_eq!(titles(&page), vec!["Agriculture"]);
    }

    fn query(view: Option<&str>, category: Option<&str>) -> InterviewListQuery {
        InterviewListQuery {
            view: view.map(str::to_string),
            category: category.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn view_parsing() {
        assert_eq!(query(None, None).view(), Ok(InterviewView::Schedule));
        assert_eq!(
            query(Some("category"), Some("failed")).view(),
            Ok(InterviewView::Category(InterviewCategory::Failed))
        );
        assert_eq!(
            query(None, Some("upcoming")).view(),
            Ok(InterviewView::Category(InterviewCategory::Upcoming))
        );
        assert_eq!(
            query(Some("category"), None).view(),
            Err(InterviewQueryError::MissingCategory)
        );
        assert!(matches!(
            query(Some("category"), Some("archived")).view(),
            Err(InterviewQueryError::UnknownCategory(_))
        ));
        assert!(matches!(
            query(Some("calendar"), None).view(),
            Err(InterviewQueryError::UnknownView(_))
        ));
    }

    #[test]
    fn schedule_view_rejects_a_category() {
        assert_eq!(
            query(Some("schedule"), Some("failed")).view(),
            Err(InterviewQueryError::CategoryWithSchedule)
        );
        assert_eq!(query(Some("schedule"), Some("  ")).view(), Ok(InterviewView::Schedule));
    }

    #[test]
    fn repeated_schedule_search_returns_same_page() {
        let same_start = now() + Duration::days(2);
        let mut all = interviews();
        all.push(sample_interview("Engineering B", InterviewStatus::Upcoming, same_start, "s1"));
        all.push(sample_interview("Engineering A", InterviewStatus::Upcoming, same_start, "s1"));
        all.push(sample_interview("Engineering C", InterviewStatus::Upcoming, same_start, "s2"));

        let ids = |page: &Page<InterviewListItem>| {
            page.items.iter().map(|i| i.interview.id).collect::<Vec<_>>()
        };
        let run = |page: i64| {
            build_interview_page(
                all.clone(),
                &users(),
                InterviewView::Schedule,
                Some("engineering"),
                PageWindow::new(page, 2),
                now(),
            )
        };

        for page in 1..=2 {
            let first = run(page);
            let second = run(page);
            assert_eq!(ids(&first), ids(&second));
            assert_eq!(first.total_count, second.total_count);
            assert_eq!(first.total_pages, second.total_pages);
        }

        // equal start times keep storage order
        assert_eq!(titles(&run(1)), vec!["Engineering B", "Engineering A"]);
        assert_eq!(titles(&run(2)), vec!["Engineering C", "Engineering"]);
    }
}
