use axum::{
    extract::{Extension, State},
    response::Json,
};

use crate::{
    middleware::auth::AuthUser,
    models::track::{StoreTrackRequest, TrackSelection},
    utils::errors::AppError,
    AppState,
};

/// One selection per user; picking again overwrites the previous choice.
pub async fn store_track(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<StoreTrackRequest>,
) -> Result<Json<TrackSelection>, AppError> {
    let user = auth_user.load_user(&state.db).await?;

    let selection = sqlx::query_as::<_, TrackSelection>(
        r#"
        INSERT INTO track_selections (user_id, user_email, value)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id)
        DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(user.id)
    .bind(&user.email)
    .bind(payload.value)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(selection))
}

pub async fn get_student_tracks(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<Json<Vec<TrackSelection>>, AppError> {
    auth_user.require_admin(&state.db).await?;

    let selections = sqlx::query_as::<_, TrackSelection>(
        r#"
        SELECT t.*
        FROM track_selections t
        JOIN users u ON u.id = t.user_id
        WHERE u.role = 'student'
        ORDER BY t.created_at ASC
        "#,
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(selections))
}
