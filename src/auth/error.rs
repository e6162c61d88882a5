// Authentication and authorization error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

use crate::auth::models::Role;

/// Errors raised while authenticating a request
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing authentication token")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    ExpiredToken,

    /// Caller is authenticated but lacks the required role
    #[error("Insufficient permissions: required role '{required}'")]
    InsufficientPermissions { required: Role, actual: Role },

    #[error("Token generation failed: {0}")]
    TokenGenerationError(String),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingToken | AuthError::InvalidToken | AuthError::ExpiredToken => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::InsufficientPermissions { .. } => StatusCode::FORBIDDEN,
            AuthError::TokenGenerationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match &self {
            AuthError::MissingToken | AuthError::InvalidToken | AuthError::ExpiredToken => {
                warn!("Rejected request: {}", self);
                self.to_string()
            }
            AuthError::InsufficientPermissions { required, actual } => {
                warn!("Authorization failed: required role '{}', user has role '{}'", required, actual);
                self.to_string()
            }
            AuthError::TokenGenerationError(msg) => {
                error!("Token generation error: {}", msg);
                "Internal server error".to_string()
            }
        };

        (self.status_code(), Json(json!({ "error": message }))).into_response()
    }
}
