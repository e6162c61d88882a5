use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Error types for inventory operations
#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("Box not found: {0}")]
    BoxNotFound(i32),

    #[error("Stock alert not found")]
    AlertNotFound,

    #[error("Insufficient stock: {available} available, {requested} requested")]
    InsufficientStock { available: i32, requested: i32 },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for InventoryError {
    fn from(err: sqlx::Error) -> Self {
        InventoryError::DatabaseError(err.to_string())
    }
}

impl InventoryError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            InventoryError::BoxNotFound(_) | InventoryError::AlertNotFound => StatusCode::NOT_FOUND,
            InventoryError::InsufficientStock { .. } => StatusCode::CONFLICT,
            InventoryError::ValidationError(_) => StatusCode::BAD_REQUEST,
            InventoryError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for InventoryError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            InventoryError::DatabaseError(msg) => {
                tracing::error!("Database error in inventory: {}", msg);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
