use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    middleware::auth::AuthUser,
    models::comment::{Comment, CreateCommentRequest},
    utils::errors::AppError,
    AppState,
};

pub async fn add_comment(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(interview_id): Path<Uuid>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Comment>), AppError> {
    let interviewer = auth_user.require_staff(&state.db).await?;
    payload.validate()?;

    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM interviews WHERE id = $1)")
        .bind(interview_id)
        .fetch_one(&state.db)
        .await?;

    if !exists {
        return Err(AppError::NotFound("Interview not found".to_string()));
    }

    let comment = sqlx::query_as::<_, Comment>(
        r#"
        INSERT INTO comments (interview_id, interviewer_id, content, rating)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(interview_id)
    .bind(&interviewer.external_id)
    .bind(&payload.content)
    .bind(payload.rating)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn get_comments(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(interview_id): Path<Uuid>,
) -> Result<Json<Vec<Comment>>, AppError> {
    auth_user.require_staff(&state.db).await?;

    let comments = sqlx::query_as::<_, Comment>(
        "SELECT * FROM comments WHERE interview_id = $1 ORDER BY created_at ASC"
    )
    .bind(interview_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(comments))
}
