use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::HeaderName;
use axum::http::request::Parts;
use subtle::ConstantTimeEq;

use crate::domain::user::Actor;
use crate::http::AppError;
use crate::AppState;

/// The caller behind a valid access token, resolved to their profile.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub profile_id: i64,
    pub is_staff: bool,
}

impl AuthUser {
    pub fn actor(&self) -> Actor {
        Actor {
            user_id: self.user_id,
            profile_id: self.profile_id,
            is_staff: self.is_staff,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AdminToken;

const ADMIN_TOKEN_HEADER: HeaderName = HeaderName::from_static("x-admin-token");

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("missing Authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::unauthorized("invalid Authorization header"))?;

        let service = state.auth_service();
        let session = service
            .authenticate_access_token(token)
            .await
            .map_err(|_| AppError::internal("failed to authenticate"))?
            .ok_or_else(|| AppError::unauthorized("invalid token"))?;

        let actor = service
            .actor_for_user(session.user_id)
            .await
            .map_err(|err| {
                tracing::error!(error = ?err, user_id = session.user_id, "failed to load caller profile");
                AppError::internal("failed to authenticate")
            })?
            .ok_or_else(|| AppError::unauthorized("account no longer exists"))?;

        Ok(AuthUser {
            user_id: actor.user_id,
            profile_id: actor.profile_id,
            is_staff: actor.is_staff,
        })
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminToken {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let expected = state
            .admin_token
            .as_ref()
            .ok_or_else(|| AppError::forbidden("admin token not configured"))?;

        let provided = parts
            .headers
            .get(ADMIN_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::forbidden("missing admin token"))?;

        if !bool::from(provided.as_bytes().ct_eq(expected.as_bytes())) {
            return Err(AppError::forbidden("invalid admin token"));
        }

        Ok(AdminToken)
    }
}
