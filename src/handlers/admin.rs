use axum::{
    extract::{Extension, State},
    response::Json,
};
use chrono::Utc;
use serde::Serialize;

use crate::{
    middleware::auth::AuthUser,
    services::{
        analytics::{AnalyticsResponse, AnalyticsService},
        status_sweep::StatusSweepService,
    },
    utils::{
        errors::AppError,
        logger::{event_fields, LOGGER},
    },
    AppState,
};

#[derive(Debug, Serialize)]
pub struct SweepResponse {
    pub message: String,
    pub completed: u64,
}

pub async fn get_analytics(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<Json<AnalyticsResponse>, AppError> {
    if let Err(e) = auth_user.require_admin(&state.db).await {
        LOGGER.log_business_event(
            "unauthorized_analytics_access",
            Some(&auth_user.external_id),
            Default::default(),
        );
        return Err(e);
    }

    LOGGER.log_request("GET", "/admin/analytics", Some(&auth_user.external_id), 200);

    let analytics_service = AnalyticsService::new(state.db.clone());
    let analytics = analytics_service.get_dashboard(Utc::now()).await?;

    Ok(Json(analytics))
}

pub async fn trigger_status_sweep(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<Json<SweepResponse>, AppError> {
    auth_user.require_admin(&state.db).await?;

    let sweep = StatusSweepService::new(state.db.clone(), state.sweep_grace_minutes);
    let completed = sweep.complete_overdue(Utc::now()).await.map_err(|e| {
        LOGGER.log_error(
            &e.to_string(),
            event_fields([("operation", "status_sweep".into())]),
        );
        AppError::InternalServerError("Status sweep failed".to_string())
    })?;

    Ok(Json(SweepResponse {
        message: format!(
            "Marked upcoming interviews older than {} minutes as completed",
            state.sweep_grace_minutes
        ),
        completed,
    }))
}
