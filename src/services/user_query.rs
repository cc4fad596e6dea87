use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::time::Instant;

use crate::{
    models::{
        interview::{Interview, InterviewResponse},
        user::{User, UserResponse, UserRole},
    },
    services::pagination::{filter_by_search, paginate, Page, PageQuery, PageWindow, Searchable},
    utils::logger::LOGGER,
};

pub const DEFAULT_USERS_PER_PAGE: usize = 6;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserWithInterviews {
    #[serde(flatten)]
    pub user: UserResponse,
    pub interviews: Vec<InterviewResponse>,
    pub interview_count: usize,
}

impl Searchable for User {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.email.as_str()]
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserListQuery {
    pub role: UserRole,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub items_per_page: Option<i64>,
}

impl UserListQuery {
    pub fn page_query(&self) -> PageQuery {
        PageQuery {
            search: self.search.clone(),
            page: self.page,
            items_per_page: self.items_per_page,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UserQueryError {
    #[error("guests cannot be listed")]
    GuestListing,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Students are linked to the interviews they sit; staff to the ones they run.
fn is_linked(role: UserRole, user: &User, interview: &Interview) -> bool {
    match role {
        UserRole::Student => interview.candidate_id == user.external_id,
        _ => interview.interviewer_ids.iter().any(|id| *id == user.external_id),
    }
}

/// Search users of one role, attach their interviews, order by interview
/// count (most first, ties keep storage order) and cut one page.
pub fn build_user_page(
    users: Vec<User>,
    interviews: &[Interview],
    role: UserRole,
    search: Option<&str>,
    window: PageWindow,
) -> Page<UserWithInterviews> {
    let users: Vec<User> = users.into_iter().filter(|user| user.role == role).collect();

    let mut enriched: Vec<UserWithInterviews> = filter_by_search(users, search)
        .into_iter()
        .map(|user| {
            let linked: Vec<InterviewResponse> = interviews
                .iter()
                .filter(|interview| is_linked(role, &user, interview))
                .cloned()
                .map(InterviewResponse::from)
                .collect();

            UserWithInterviews {
                interview_count: linked.len(),
                interviews: linked,
                user: UserResponse::from(user),
            }
        })
        .collect();

    enriched.sort_by(|a, b| b.interview_count.cmp(&a.interview_count));

    paginate(enriched, window)
}

#[derive(Debug)]
pub struct UserQueryService {
    pool: PgPool,
}

impl UserQueryService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_page(&self, query: &UserListQuery) -> Result<Page<UserWithInterviews>, UserQueryError> {
        if query.role == UserRole::Guest {
            return Err(UserQueryError::GuestListing);
        }

        let start_time = Instant::now();
        let users_query = "SELECT * FROM users WHERE role = $1 ORDER BY created_at ASC";

        let (users, interviews) = tokio::try_join!(
            sqlx::query_as::<_, User>(users_query)
                .bind(query.role)
                .fetch_all(&self.pool),
            sqlx::query_as::<_, Interview>("SELECT * FROM interviews ORDER BY created_at ASC")
                .fetch_all(&self.pool),
        )?;

        LOGGER.log_database_query(users_query, start_time.elapsed().as_millis(), Some(users.len()));

        let page_query = query.page_query();
        Ok(build_user_page(
            users,
            &interviews,
            query.role,
            page_query.search_term(),
            page_query.window(DEFAULT_USERS_PER_PAGE),
        ))
    }
}
