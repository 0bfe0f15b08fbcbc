//! Authentication extractors
//!
//! JWT verification and caller identity for handlers.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{verify_token, AuthService, JwtError, Role};
use crate::error::ApiError;

/// Caller identity taken from the bearer token
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub role: Role,
    pub studio_id: Option<Uuid>,
}

impl AuthenticatedUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Studio accounts act only on their own studio
    pub fn owns_studio(&self, studio_id: Uuid) -> bool {
        self.role == Role::Studio && self.studio_id == Some(studio_id)
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Admin access required".to_string()))
        }
    }
}

/// 401/403 with the same `{"error": {"code", "message"}}` body as `ApiError`
fn reject(status: StatusCode, code: &'static str, message: &'static str) -> Response {
    let body = json!({ "error": { "code": code, "message": message } });
    (status, Json(body)).into_response()
}

fn unauthorized(code: &'static str, message: &'static str) -> Response {
    reject(StatusCode::UNAUTHORIZED, code, message)
}

/// Requires a valid access token
#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    unauthorized("MISSING_TOKEN", "Authorization header with Bearer token required")
                })?;

        let auth_service = Arc::<AuthService>::from_ref(state);

        let claims = verify_token(bearer.token(), auth_service.jwt_secret()).map_err(|e| {
            let (code, message) = match e {
                JwtError::TokenExpired => ("TOKEN_EXPIRED", "Token has expired"),
                JwtError::WrongKind(_) => ("INVALID_TOKEN_TYPE", "Expected access token"),
                _ => ("INVALID_TOKEN", "Invalid token"),
            };
            unauthorized(code, message)
        })?;

        let user_id = claims
            .user_id()
            .ok_or_else(|| unauthorized("INVALID_TOKEN", "Invalid user ID in token"))?;

        Ok(AuthenticatedUser {
            user_id,
            role: claims.role,
            studio_id: claims.studio_id,
        })
    }
}

/// Caller identity when a valid token is present; anonymous otherwise
#[derive(Debug, Clone)]
pub struct OptionalUser(pub Option<AuthenticatedUser>);

#[async_trait]
impl<S> FromRequestParts<S> for OptionalUser
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalUser(
            AuthenticatedUser::from_request_parts(parts, state).await.ok(),
        ))
    }
}

/// Rejects every caller but admins with 403
pub struct AdminUser(pub AuthenticatedUser);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;

        if !user.is_admin() {
            return Err(reject(StatusCode::FORBIDDEN, "FORBIDDEN", "Admin access required"));
        }

        Ok(AdminUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role, studio_id: Option<Uuid>) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: Uuid::new_v4(),
            role,
            studio_id,
        }
    }

    #[test]
    fn test_studio_ownership() {
        let studio = Uuid::new_v4();
        assert!(user(Role::Studio, Some(studio)).owns_studio(studio));
        assert!(!user(Role::Studio, Some(Uuid::new_v4())).owns_studio(studio));
        // a buyer claiming a studio id is still a buyer
        assert!(!user(Role::Buyer, Some(studio)).owns_studio(studio));
    }

    #[test]
    fn test_require_admin() {
        assert!(user(Role::Admin, None).require_admin().is_ok());
        assert!(matches!(
            user(Role::Studio, None).require_admin(),
            Err(ApiError::Forbidden(_))
        ));
    }
}
