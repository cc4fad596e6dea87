use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

/// Account mirrored from the external identity provider.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub external_id: String,
    pub name: String,
    pub email: String,
    pub image: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Guest,
    Student,
    Teacher,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Guest => "guest",
            UserRole::Student => "student",
            UserRole::Teacher => "teacher",
            UserRole::Admin => "admin",
        }
    }

    /// Teachers and admins conduct and review interviews.
    pub fn is_staff(&self) -> bool {
        matches!(self, UserRole::Teacher | UserRole::Admin)
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct SyncUserRequest {
    #[validate(length(min = 1, message = "Name must not be empty"))]
    pub name: String,
    #[validate(email(message = "Email must be a valid address"))]
    pub email: String,
    #[validate(url(message = "Image must be a valid URL"))]
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRoleRequest {
    pub role: UserRole,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub external_id: String,
    pub name: String,
    pub email: String,
    pub image: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            external_id: user.external_id,
            name: user.name,
            email: user.email,
            image: user.image,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_user(external_id: &str, name: &str, role: UserRole) -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4(),
        external_id: external_id.to_string(),
        name: name.to_string(),
        email: format!("{}@school.test", external_id),
        image: None,
        role,
        created_at: now,
        updated_at: now,
    }
}
