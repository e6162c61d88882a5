use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Error types for cart operations
#[derive(Debug, thiserror::Error)]
pub enum CartError {
    #[error("Box not found: {0}")]
    BoxNotFound(i32),

    #[error("Box {0} is not in your cart")]
    NotInCart(i32),

    #[error("A cart line cannot hold more than {max} units")]
    QuantityLimit { max: i32 },

    #[error("A cart cannot hold more than {max} different boxes")]
    TooManyLines { max: i64 },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for CartError {
    fn from(err: sqlx::Error) -> Self {
        CartError::DatabaseError(err.to_string())
    }
}

impl CartError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            CartError::BoxNotFound(_) | CartError::NotInCart(_) => StatusCode::NOT_FOUND,
            CartError::QuantityLimit { .. } | CartError::TooManyLines { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            CartError::ValidationError(_) => StatusCode::BAD_REQUEST,
            CartError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for CartError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            CartError::DatabaseError(msg) => {
                tracing::error!("Database error in cart: {}", msg);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
