use axum::{
    extract::{Extension, Path, Query, State},
    response::Json,
};
use validator::Validate;

use crate::{
    middleware::auth::AuthUser,
    models::user::{SyncUserRequest, UpdateUserRoleRequest, User, UserResponse},
    services::{
        pagination::Page,
        user_query::{UserListQuery, UserQueryService, UserWithInterviews},
    },
    utils::{
        errors::AppError,
        logger::{event_fields, LOGGER},
    },
    AppState,
};

/// First-sight registration of the signed-in account. Existing users come
/// back untouched, so the client can call this on every sign-in.
pub async fn sync_user(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<SyncUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    payload.validate()?;

    let inserted = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (external_id, name, email, image, role)
        VALUES ($1, $2, $3, $4, 'guest')
        ON CONFLICT (external_id) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(&auth_user.external_id)
    .bind(&payload.name)
    .bind(&payload.email)
    .bind(&payload.image)
    .fetch_optional(&state.db)
    .await?;

    let user = match inserted {
        Some(user) => {
            LOGGER.log_business_event("user_synced", Some(&user.external_id), Default::default());
            user
        }
        None => auth_user.load_user(&state.db).await?,
    };

    Ok(Json(UserResponse::from(user)))
}

pub async fn get_users(
    State(state): State<AppState>,
    Extension(_auth_user): Extension<AuthUser>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at ASC")
        .fetch_all(&state.db)
        .await?;

    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

pub async fn get_current_user(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<Json<UserResponse>, AppError> {
    let user = auth_user.load_user(&state.db).await?;
    Ok(Json(UserResponse::from(user)))
}

pub async fn get_user_by_external_id(
    State(state): State<AppState>,
    Extension(_auth_user): Extension<AuthUser>,
    Path(external_id): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE external_id = $1")
        .bind(&external_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(UserResponse::from(user)))
}

pub async fn update_user_role(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(external_id): Path<String>,
    Json(payload): Json<UpdateUserRoleRequest>,
) -> Result<Json<UserResponse>, AppError> {
    auth_user.require_admin(&state.db).await?;

    let user = sqlx::query_as::<_, User>(
        "UPDATE users SET role = $1, updated_at = NOW() WHERE external_id = $2 RETURNING *"
    )
    .bind(payload.role)
    .bind(&external_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    LOGGER.log_business_event(
        "user_role_updated",
        Some(&auth_user.external_id),
        event_fields([
            ("target_user", external_id.into()),
            ("role", payload.role.as_str().into()),
        ]),
    );

    Ok(Json(UserResponse::from(user)))
}

pub async fn get_users_page(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<UserListQuery>,
) -> Result<Json<Page<UserWithInterviews>>, AppError> {
    auth_user.require_staff(&state.db).await?;

    let service = UserQueryService::new(state.db.clone());
    Ok(Json(service.list_page(&query).await?))
}
