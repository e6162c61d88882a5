// Request extractors for authenticated and admin-only routes

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use tracing::{debug, warn};

use crate::auth::{error::AuthError, models::Role, token::TokenService};

/// Authenticated caller, extracted from `Authorization: Bearer <jwt>`
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: i32,
    pub email: String,
    pub role: Role,
}

impl AuthenticatedUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, AuthError> {
    let auth_header = parts
        .headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidToken)?;

    auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        warn!("Authorization header missing 'Bearer ' prefix for {}", parts.uri.path());
        AuthError::InvalidToken
    })
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    TokenService: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let token_service = TokenService::from_ref(state);
        let claims = token_service.validate(token)?;

        Ok(AuthenticatedUser {
            user_id: claims.sub,
            email: claims.email,
            role: claims.role,
        })
    }
}

/// Caller that must hold the admin role
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthenticatedUser);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    TokenService: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;

        if !user.is_admin() {
            warn!(
                "Authorization failed: user_id={}, role={}, endpoint={}",
                user.user_id,
                user.role,
                parts.uri.path()
            );
            return Err(AuthError::InsufficientPermissions {
                required: Role::Admin,
                actual: user.role,
            });
        }

        debug!("Admin access granted: user_id={}, endpoint={}", user.user_id, parts.uri.path());
        Ok(AdminUser(user))
    }
}
