use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    middleware::auth::AuthUser,
    models::{
        role_change::{
            CreateRoleChangeRequest, RoleChangeRequest, RoleChangeStatus,
            UpdateRoleChangeStatusRequest,
        },
        user::User,
    },
    services::pagination::{matches_search, paginate, Page, PageQuery, PageWindow},
    utils::{
        errors::AppError,
        logger::{event_fields, LOGGER},
    },
    AppState,
};

pub const DEFAULT_REQUESTS_PER_PAGE: usize = 5;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoleChangeListQuery {
    pub status: Option<RoleChangeStatus>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub items_per_page: Option<i64>,
}

impl RoleChangeListQuery {
    fn page_query(&self) -> PageQuery {
        PageQuery {
            search: self.search.clone(),
            page: self.page,
            items_per_page: self.items_per_page,
        }
    }
}

/// Expects requests newest first, as loaded from storage.
pub fn build_request_page(
    requests: Vec<RoleChangeRequest>,
    status: Option<RoleChangeStatus>,
    search: Option<&str>,
    window: PageWindow,
) -> Page<RoleChangeRequest> {
    let filtered = requests
        .into_iter()
        .filter(|request| status.map_or(true, |status| request.status == status))
        .filter(|request| {
            matches_search(
                &[
                    request.requestor_name.as_deref().unwrap_or(""),
                    request.current_role.as_str(),
                    request.requested_role.as_str(),
                    request.request_reason.as_deref().unwrap_or(""),
                ],
                search,
            )
        })
        .collect();

    paginate(filtered, window)
}

pub async fn create_role_change(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<CreateRoleChangeRequest>,
) -> Result<(StatusCode, Json<RoleChangeRequest>), AppError> {
    payload.validate()?;
    let user = auth_user.load_user(&state.db).await?;

    if payload.requested_role == user.role {
        return Err(AppError::invalid_field(
            "requested_role",
            "Requested role must differ from the current role",
        ));
    }

    let request = sqlx::query_as::<_, RoleChangeRequest>(
        r#"
        INSERT INTO role_change_requests
            (requested_by, requestor_name, from_role, requested_role, request_reason, request_proof, status)
        VALUES ($1, $2, $3, $4, $5, $6, 'pending')
        RETURNING *
        "#,
    )
    .bind(&user.external_id)
    .bind(&user.name)
    .bind(user.role)
    .bind(payload.requested_role)
    .bind(&payload.request_reason)
    .bind(&payload.request_proof)
    .fetch_one(&state.db)
    .await?;

    LOGGER.log_business_event(
        "role_change_requested",
        Some(&user.external_id),
        event_fields([
            ("request_id", request.id.to_string().into()),
            ("requested_role", request.requested_role.as_str().into()),
        ]),
    );

    Ok((StatusCode::CREATED, Json(request)))
}

pub async fn get_role_changes(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<RoleChangeListQuery>,
) -> Result<Json<Page<RoleChangeRequest>>, AppError> {
    auth_user.require_admin(&state.db).await?;

    let requests = sqlx::query_as::<_, RoleChangeRequest>(
        "SELECT * FROM role_change_requests ORDER BY created_at DESC"
    )
    .fetch_all(&state.db)
    .await?;

    let page_query = query.page_query();
    Ok(Json(build_request_page(
        requests,
        query.status,
        page_query.search_term(),
        page_query.window(DEFAULT_REQUESTS_PER_PAGE),
    )))
}

pub async fn get_my_role_changes(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<Json<Vec<RoleChangeRequest>>, AppError> {
    let requests = sqlx::query_as::<_, RoleChangeRequest>(
        "SELECT * FROM role_change_requests WHERE requested_by = $1 ORDER BY created_at DESC"
    )
    .bind(&auth_user.external_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(requests))
}

pub async fn get_role_change(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<RoleChangeRequest>, AppError> {
    let request = sqlx::query_as::<_, RoleChangeRequest>(
        "SELECT * FROM role_change_requests WHERE id = $1"
    )
    .bind(id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound("Request not found".to_string()))?;

    if request.requested_by != auth_user.external_id {
        auth_user.require_admin(&state.db).await?;
    }

    Ok(Json(request))
}

/// Resolves a request. Approval applies the requested role to the requester
/// in the same transaction.
pub async fn update_role_change_status(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRoleChangeStatusRequest>,
) -> Result<Json<RoleChangeRequest>, AppError> {
    auth_user.require_admin(&state.db).await?;

    let mut tx = state.db.begin().await?;

    let request = sqlx::query_as::<_, RoleChangeRequest>(
        r#"
        UPDATE role_change_requests
        SET status = $1, updated_at = NOW()
        WHERE id = $2
        RETURNING *
        "#,
    )
    .bind(payload.status)
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Request not found".to_string()))?;

    if payload.status == RoleChangeStatus::Approved {
        sqlx::query_as::<_, User>(
            "UPDATE users SET role = $1, updated_at = NOW() WHERE external_id = $2 RETURNING *"
        )
        .bind(request.requested_role)
        .bind(&request.requested_by)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Requesting user no longer exists".to_string()))?;
    }

    tx.commit().await?;

    LOGGER.log_business_event(
        "role_change_resolved",
        Some(&auth_user.external_id),
        event_fields([
            ("request_id", id.to_string().into()),
            ("status", payload.status.as_str().into()),
        ]),
    );

    Ok(Json(request))
}
