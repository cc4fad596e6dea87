use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::{
    middleware::auth::AuthUser,
    models::interview::{
        CreateInterviewRequest, Interview, InterviewResponse, InterviewStatus,
        UpdateAiFeedbackRequest, UpdateInterviewStatusRequest,
    },
    services::{
        category::GroupedInterviews,
        interview_query::{InterviewListItem, InterviewListQuery, InterviewQueryService},
        pagination::Page,
    },
    utils::{
        errors::AppError,
        logger::{event_fields, LOGGER},
    },
    AppState,
};

/// Effect of a status change on `end_time`. Only "completed" stamps it and
/// only "upcoming" clears it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EndTimeChange {
    Stamp(DateTime<Utc>),
    Clear,
    Keep,
}

impl EndTimeChange {
    fn for_status(status: &InterviewStatus, now: DateTime<Utc>) -> Self {
        match status {
            InterviewStatus::Completed => EndTimeChange::Stamp(now),
            InterviewStatus::Upcoming => EndTimeChange::Clear,
            _ => EndTimeChange::Keep,
        }
    }

    /// `(overwrite, value)` for the `CASE` in the status update.
    fn binds(self) -> (bool, Option<DateTime<Utc>>) {
        match self {
            EndTimeChange::Stamp(at) => (true, Some(at)),
            EndTimeChange::Clear => (true, None),
            EndTimeChange::Keep => (false, None),
        }
    }
}

fn to_responses(interviews: Vec<Interview>) -> Vec<InterviewResponse> {
    interviews.into_iter().map(InterviewResponse::from).collect()
}

pub async fn get_all_interviews(
    State(state): State<AppState>,
    Extension(_auth_user): Extension<AuthUser>,
) -> Result<Json<Vec<InterviewResponse>>, AppError> {
    let interviews = sqlx::query_as::<_, Interview>(
        "SELECT * FROM interviews ORDER BY created_at ASC"
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(to_responses(interviews)))
}

pub async fn get_my_interviews(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<Json<Vec<InterviewResponse>>, AppError> {
    let interviews = sqlx::query_as::<_, Interview>(
        "SELECT * FROM interviews WHERE candidate_id = $1 ORDER BY start_time DESC"
    )
    .bind(&auth_user.external_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(to_responses(interviews)))
}

pub async fn get_interview_page(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<InterviewListQuery>,
) -> Result<Json<Page<InterviewListItem>>, AppError> {
    auth_user.require_staff(&state.db).await?;

    let service = InterviewQueryService::new(state.db.clone());
    let page = service.list_page(&query, Utc::now()).await?;

    Ok(Json(page))
}

pub async fn get_grouped_interviews(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<Json<GroupedInterviews<InterviewListItem>>, AppError> {
    auth_user.require_staff(&state.db).await?;

    let service = InterviewQueryService::new(state.db.clone());
    Ok(Json(service.grouped(Utc::now()).await?))
}

pub async fn get_interview_by_call_id(
    State(state): State<AppState>,
    Extension(_auth_user): Extension<AuthUser>,
    Path(stream_call_id): Path<String>,
) -> Result<Json<InterviewResponse>, AppError> {
    let interview = sqlx::query_as::<_, Interview>(
        "SELECT * FROM interviews WHERE stream_call_id = $1 ORDER BY created_at ASC LIMIT 1"
    )
    .bind(&stream_call_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound("No interview for this call".to_string()))?;

    Ok(Json(InterviewResponse::from(interview)))
}

pub async fn create_interview(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<CreateInterviewRequest>,
) -> Result<(StatusCode, Json<InterviewResponse>), AppError> {
    auth_user.require_staff(&state.db).await?;
    payload.validate()?;

    let status = payload.status.clone().unwrap_or(InterviewStatus::Upcoming);

    let interview = sqlx::query_as::<_, Interview>(
        r#"
        INSERT INTO interviews (title, description, start_time, status, stream_call_id, candidate_id, interviewer_ids)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(payload.start_time)
    .bind(status.as_str())
    .bind(&payload.stream_call_id)
    .bind(&payload.candidate_id)
    .bind(&payload.interviewer_ids)
    .fetch_one(&state.db)
    .await?;

    LOGGER.log_business_event(
        "interview_created",
        Some(&auth_user.external_id),
        event_fields([
            ("interview_id", interview.id.to_string().into()),
            ("candidate_id", interview.candidate_id.clone().into()),
        ]),
    );

    Ok((StatusCode::CREATED, Json(InterviewResponse::from(interview))))
}

pub async fn update_interview_status(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateInterviewStatusRequest>,
) -> Result<Json<InterviewResponse>, AppError> {
    auth_user.require_staff(&state.db).await?;

    let (overwrite_end_time, end_time) = EndTimeChange::for_status(&payload.status, Utc::now()).binds();

    let interview = sqlx::query_as::<_, Interview>(
        r#"
        UPDATE interviews
        SET status = $1,
            end_time = CASE WHEN $2 THEN $3 ELSE end_time END,
            updated_at = NOW()
        WHERE id = $4
        RETURNING *
        "#,
    )
    .bind(payload.status.as_str())
    .bind(overwrite_end_time)
    .bind(end_time)
    .bind(id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound("Interview not found".to_string()))?;

    LOGGER.log_business_event(
        "interview_status_updated",
        Some(&auth_user.external_id),
        event_fields([
            ("interview_id", id.to_string().into()),
            ("status", payload.status.as_str().into()),
        ]),
    );

    Ok(Json(InterviewResponse::from(interview)))
}

pub async fn update_interview_feedback(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAiFeedbackRequest>,
) -> Result<Json<InterviewResponse>, AppError> {
    payload.validate()?;

    let existing = sqlx::query_as::<_, Interview>("SELECT * FROM interviews WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Interview not found".to_string()))?;

    if existing.candidate_id != auth_user.external_id {
        auth_user.require_staff(&state.db).await?;
    }

    let interview = sqlx::query_as::<_, Interview>(
        r#"
        UPDATE interviews
        SET student_answer = $1, ai_feedback = $2, updated_at = NOW()
        WHERE id = $3
        RETURNING *
        "#,
    )
    .bind(&payload.student_answer)
    .bind(sqlx::types::Json(&payload.ai_feedback))
    .bind(id)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(InterviewResponse::from(interview)))
}

pub async fn delete_interview(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth_user.require_staff(&state.db).await?;

    let mut tx = state.db.begin().await?;

    let comments = sqlx::query("DELETE FROM comments WHERE interview_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    let result = sqlx::query("DELETE FROM interviews WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        tx.rollback().await?;
        return Err(AppError::NotFound("Interview not found".to_string()));
    }

    tx.commit().await?;

    LOGGER.log_business_event(
        "interview_deleted",
        Some(&auth_user.external_id),
        event_fields([
            ("interview_id", id.to_string().into()),
            ("comments_deleted", comments.rows_affected().into()),
        ]),
    );

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        "2025-03-10T09:00:00Z".parse().unwrap()
    }

    #[test]
    fn completing_stamps_end_time() {
        assert_eq!(
            EndTimeChange::for_status(&InterviewStatus::Completed, now()).binds(),
            (true, Some(now()))
        );
    }

    #[test]
    fn reopening_clears_end_time() {
        assert_eq!(
            EndTimeChange::for_status(&InterviewStatus::Upcoming, now()),
            EndTimeChange::Clear
        );
        assert_eq!(EndTimeChange::Clear.binds(), (true, None));
    }

    #[test]
    fn verdicts_leave_end_time_alone() {
        for status in [
            InterviewStatus::Succeeded,
            InterviewStatus::Failed,
            InterviewStatus::Other("on-hold".to_string()),
        ] {
            assert_eq!(EndTimeChange::for_status(&status, now()).binds(), (false, None));
        }
    }
}
