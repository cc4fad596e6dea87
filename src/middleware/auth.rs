use crate::{
    models::user::User,
    utils::{errors::AppError, jwt::verify_jwt},
    AppState,
};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use sqlx::PgPool;

/// Identity proven by the bearer token. Roles live in our database, not in
/// the token, so anything role-gated goes through [`AuthUser::load_user`].
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub external_id: String,
}

impl AuthUser {
    pub async fn load_user(&self, db: &PgPool) -> Result<User, AppError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE external_id = $1")
            .bind(&self.external_id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::Forbidden("User has not been synced yet".to_string()))
    }

    pub async fn require_staff(&self, db: &PgPool) -> Result<User, AppError> {
        let user = self.load_user(db).await?;
        if !user.role.is_staff() {
            return Err(AppError::Forbidden(
                "Only teachers and admins can do this".to_string(),
            ));
        }
        Ok(user)
    }

    pub async fn require_admin(&self, db: &PgPool) -> Result<User, AppError> {
        let user = self.load_user(db).await?;
        if !user.role.is_admin() {
            return Err(AppError::Forbidden("Only admins can do this".to_string()));
        }
        Ok(user)
    }
}

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get("Authorization")
        .and_then(|header| header.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&request)
        .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

    let claims = verify_jwt(token, &state.jwt_secret).map_err(|e| {
        tracing::debug!("rejected token: {}", e);
        AppError::Unauthorized("Invalid or expired token".to_string())
    })?;

    let auth_user = AuthUser {
        external_id: claims.sub,
    };

    request.extensions_mut().insert(auth_user);
    Ok(next.run(request).await)
}
