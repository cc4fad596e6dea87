use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::HashMap;
use chrono::{DateTime, Utc};

use crate::services::{
    analytics::AnalyticsError, interview_query::InterviewQueryError, user_query::UserQueryError,
};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub details: Option<HashMap<String, Vec<String>>>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug)]
pub enum AppError {
    ValidationError(HashMap<String, Vec<String>>),
    NotFound(String),
    Unauthorized(String),
    Forbidden(String),
    Conflict(String),
    InternalServerError(String),
}

impl AppError {
    /// Validation failure on a single field, shaped like the ones produced by `validator`.
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        let mut details = HashMap::new();
        details.insert(field.to_string(), vec![message.into()]);
        AppError::ValidationError(details)
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (error_type, message, details) = match self {
            AppError::ValidationError(errors) => (
                "VALIDATION_ERROR",
                "Validation failed".to_string(),
                Some(errors),
            ),
            AppError::NotFound(msg) => ("NOT_FOUND", msg, None),
            AppError::Unauthorized(msg) => ("UNAUTHORIZED", msg, None),
            AppError::Forbidden(msg) => ("FORBIDDEN", msg, None),
            AppError::Conflict(msg) => ("CONFLICT", msg, None),
            AppError::InternalServerError(msg) => ("INTERNAL_SERVER_ERROR", msg, None),
        };

        let error_response = ErrorResponse {
            error: error_type.to_string(),
            message,
            details,
            timestamp: Utc::now(),
        };

        (status, Json(error_response)).into_response()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut error_map = HashMap::new();

        for (field, field_errors) in errors.field_errors() {
            let messages: Vec<String> = field_errors
                .iter()
                .map(|error| {
                    error.message
                        .as_ref()
                        .map(|msg| msg.to_string())
                        .unwrap_or_else(|| format!("Invalid value for field '{}'", field))
                })
                .collect();
            error_map.insert(field.to_string(), messages);
        }

        // nested structs (ai_feedback) report under their own key
        for (field, kind) in errors.errors() {
            if let validator::ValidationErrorsKind::Struct(nested) = kind {
                for (inner, inner_errors) in nested.field_errors() {
                    let messages = inner_errors
                        .iter()
                        .map(|error| {
                            error.message
                                .as_ref()
                                .map(|msg| msg.to_string())
                                .unwrap_or_else(|| format!("Invalid value for field '{}'", inner))
                        })
                        .collect();
                    error_map.insert(format!("{}.{}", field, inner), messages);
                }
            }
        }

        AppError::ValidationError(error_map)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => AppError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => {
                if db_err.is_unique_violation() {
                    AppError::Conflict("Resource already exists".to_string())
                } else {
                    tracing::error!("database error: {}", db_err);
                    AppError::InternalServerError("Database error occurred".to_string())
                }
            }
            other => {
                tracing::error!("database error: {}", other);
                AppError::InternalServerError("Database error occurred".to_string())
            }
        }
    }
}

impl From<InterviewQueryError> for AppError {
    fn from(error: InterviewQueryError) -> Self {
        match error {
            InterviewQueryError::UnknownView(_) | InterviewQueryError::CategoryWithSchedule => {
                AppError::invalid_field("view", error.to_string())
            }
            InterviewQueryError::MissingCategory | InterviewQueryError::UnknownCategory(_) => {
                AppError::invalid_field("category", error.to_string())
            }
            InterviewQueryError::Database(msg) => {
                tracing::error!("interview query failed: {}", msg);
                AppError::InternalServerError("Database error occurred".to_string())
            }
        }
    }
}

impl From<UserQueryError> for AppError {
    fn from(error: UserQueryError) -> Self {
        match error {
            UserQueryError::GuestListing => AppError::invalid_field("role", error.to_string()),
            UserQueryError::Database(db_err) => AppError::from(db_err),
        }
    }
}

impl From<AnalyticsError> for AppError {
    fn from(error: AnalyticsError) -> Self {
        tracing::error!("analytics failed: {}", error);
        AppError::InternalServerError("Failed to build analytics".to_string())
    }
}
