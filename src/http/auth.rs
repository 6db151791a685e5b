use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::app::auth::AuthService;
use crate::app::users::UserService;
use crate::http::AppError;
use crate::AppState;

/// Any authenticated user, decoded from the bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub username: String,
}

/// An authenticated user whose row carries the admin flag. The flag is
/// read per request, not baked into the token, so demotion takes effect
/// immediately.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub user_id: Uuid,
}

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let auth_header = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::unauthorized("missing Authorization header"))?;

    auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::unauthorized("invalid Authorization header"))
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;

        let service = AuthService::new(
            state.db.clone(),
            state.paseto_key,
            state.auth_token_ttl_hours,
        );
        let identity = service
            .authenticate(token)
            .map_err(|_| AppError::internal("failed to authenticate"))?
            .ok_or_else(|| AppError::unauthorized("invalid token"))?;

        Ok(AuthUser {
            user_id: identity.user_id,
            username: identity.username,
        })
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;

        let is_admin = UserService::new(state.db.clone())
            .is_admin(user.user_id)
            .await
            .map_err(|err| {
                tracing::error!(error = %err, "failed to load admin flag");
                AppError::internal("failed to authenticate")
            })?;

        if !is_admin {
            return Err(AppError::forbidden("Access denied. Admin only."));
        }

        Ok(AdminUser {
            user_id: user.user_id,
        })
    }
}
