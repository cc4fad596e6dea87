use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::models::user::UserRole;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RoleChangeRequest {
    pub id: Uuid,
    pub requested_by: String,
    pub requestor_name: Option<String>,
    #[sqlx(rename = "from_role")]
    pub current_role: UserRole,
    pub requested_role: UserRole,
    pub request_reason: Option<String>,
    pub request_proof: Option<String>,
    pub status: RoleChangeStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "role_change_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RoleChangeStatus {
    Pending,
    Approved,
    Rejected,
}

impl RoleChangeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleChangeStatus::Pending => "pending",
            RoleChangeStatus::Approved => "approved",
            RoleChangeStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRoleChangeRequest {
    pub requested_role: UserRole,
    #[validate(length(min = 10, max = 2000, message = "Reason must be between 10 and 2000 characters"))]
    pub request_reason: String,
    #[validate(url(message = "Proof must be a valid URL"))]
    pub request_proof: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleChangeStatusRequest {
    pub status: RoleChangeStatus,
}
