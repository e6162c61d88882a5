use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Error types for review operations
#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("Review not found")]
    NotFound,

    #[error("You have already reviewed this box")]
    DuplicateReview,

    #[error("You can only change your own reviews")]
    Forbidden,

    #[error("Box not found: {0}")]
    BoxNotFound(i32),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for ReviewError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => ReviewError::DuplicateReview,
            other => ReviewError::DatabaseError(other.to_string()),
        }
    }
}

impl ReviewError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ReviewError::NotFound | ReviewError::BoxNotFound(_) => StatusCode::NOT_FOUND,
            ReviewError::DuplicateReview => StatusCode::CONFLICT,
            ReviewError::Forbidden => StatusCode::FORBIDDEN,
            ReviewError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ReviewError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ReviewError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            ReviewError::DatabaseError(msg) => {
                tracing::error!("Database error in reviews: {}", msg);
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
        assert_eq!(ReviewError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ReviewError::BoxNotFound(3).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ReviewError::DuplicateReview.status_code(), StatusCode::CONFLICT);
        assert_eq!(ReviewError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            ReviewError::ValidationError("bad".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_database_error_hidden_from_client() {
        let response = ReviewError::DatabaseError("relation missing".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
