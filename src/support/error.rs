use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::support::TicketStatus;

/// Error types for support tickets
#[derive(Debug, thiserror::Error)]
pub enum SupportError {
    #[error("Support ticket not found")]
    NotFound,

    #[error("Order not found")]
    OrderNotFound,

    #[error("Cannot move ticket from {from} to {to}")]
    InvalidTransition { from: TicketStatus, to: TicketStatus },

    #[error("Ticket is closed")]
    Closed,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for SupportError {
    fn from(err: sqlx::Error) -> Self {
        SupportError::DatabaseError(err.to_string())
    }
}

impl SupportError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            SupportError::NotFound | SupportError::OrderNotFound => StatusCode::NOT_FOUND,
            SupportError::InvalidTransition { .. } | SupportError::Closed => StatusCode::CONFLICT,
            SupportError::ValidationError(_) => StatusCode::BAD_REQUEST,
            SupportError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for SupportError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            SupportError::DatabaseError(msg) => {
                tracing::error!("Database error in support: {}", msg);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(SupportError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(SupportError::Closed.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            SupportError::InvalidTransition {
                from: TicketStatus::Closed,
                to: TicketStatus::Open
            }
            .to_string(),
            "Cannot move ticket from closed to open"
        );
    }
}
