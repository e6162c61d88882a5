// Catalog-level error handling
// Shared error type for the box catalog and search endpoints

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, warn};

/// Error type for catalog handlers
///
/// Each variant maps to one HTTP status code and a stable `error_code`.
#[derive(Debug)]
pub enum ApiError {
    /// Field-level validation failures from `validator` (400)
    ValidationError(validator::ValidationErrors),

    /// Malformed query parameters (400)
    BadRequest(String),

    /// Resource not found by ID (404)
    NotFound { resource: String, id: String },

    /// Duplicate resource, e.g. a box name already in use (409)
    Conflict { message: String },

    /// Database failures (500, details are only logged)
    DatabaseError(sqlx::Error),
}

/// JSON body returned for every catalog error
#[derive(Serialize)]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g. "VALIDATION_ERROR", "NOT_FOUND")
    pub error_code: String,

    /// Human-readable error message
    pub message: String,

    /// Field-level details, omitted when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,

    /// RFC 3339 timestamp of when the error was produced
    pub timestamp: String,
}

impl ErrorResponse {
    fn new(error_code: &str, message: String, details: Option<serde_json::Value>) -> Self {
        Self {
            error_code: error_code.to_string(),
            message,
            details,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = self.to_error_response();
        (status, Json(error_response)).into_response()
    }
}

impl ApiError {
    /// Convert into status code and response body, logging by severity
    fn to_error_response(&self) -> (StatusCode, ErrorResponse) {
        match self {
            ApiError::ValidationError(errors) => {
                debug!("Validation error: {:?}", errors);
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::new(
                        "VALIDATION_ERROR",
                        "Request validation failed".to_string(),
                        Some(serde_json::to_value(errors).unwrap_or(serde_json::json!({}))),
                    ),
                )
            }
            ApiError::BadRequest(message) => {
                debug!("Bad request: {}", message);
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::new("BAD_REQUEST", message.clone(), None),
                )
            }
            ApiError::NotFound { resource, id } => {
                debug!("Resource not found: {} with id {}", resource, id);
                (
                    StatusCode::NOT_FOUND,
                    ErrorResponse::new("NOT_FOUND", format!("{} with id {} not found", resource, id), None),
                )
            }
            ApiError::Conflict { message } => {
                warn!("Conflict error: {}", message);
                (
                    StatusCode::CONFLICT,
                    ErrorResponse::new("CONFLICT", message.clone(), None),
                )
            }
            ApiError::DatabaseError(db_error) => {
                error!("Database error: {:?}", db_error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("DATABASE_ERROR", "A database error occurred".to_string(), None),
                )
            }
        }
    }

    /// HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ValidationError(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(error: sqlx::Error) -> Self {
        ApiError::DatabaseError(error)
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::BadRequest("bad".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::NotFound { resource: "Box".to_string(), id: "1".to_string() }.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Conflict { message: "dup".to_string() }.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::DatabaseError(sqlx::Error::RowNotFound).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_database_error_message_is_generic() {
        let (status, body) = ApiError::DatabaseError(sqlx::Error::PoolTimedOut).to_error_response();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error_code, "DATABASE_ERROR");
        assert!(!body.message.contains("PoolTimedOut"));
    }

    #[test]
    fn test_not_found_message() {
        let (_, body) = ApiError::NotFound {
            resource: "Box".to_string(),
            id: "42".to_string(),
        }
        .to_error_response();
        assert_eq!(body.message, "Box with id 42 not found");
    }
}
