use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde_json::json;

use crate::inventory::InventoryError;
use crate::orders::OrderStatus;
use crate::referrals::ReferralError;

/// Error types for order operations
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Order not found")]
    NotFound,

    #[error("Box not found or unavailable: {0}")]
    BoxNotFound(i32),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Order was modified concurrently, please retry")]
    Conflict,

    #[error("Refund amount {requested} exceeds order total {total}")]
    RefundExceedsTotal { requested: Decimal, total: Decimal },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error(transparent)]
    Referral(#[from] ReferralError),

    #[error(transparent)]
    Inventory(#[from] InventoryError),
}

impl From<sqlx::Error> for OrderError {
    fn from(err: sqlx::Error) -> Self {
        OrderError::DatabaseError(err.to_string())
    }
}

impl OrderError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            OrderError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            OrderError::NotFound => StatusCode::NOT_FOUND,
            OrderError::Conflict => StatusCode::CONFLICT,
            OrderError::BoxNotFound(_)
            | OrderError::InvalidTransition { .. }
            | OrderError::RefundExceedsTotal { .. }
            | OrderError::ValidationError(_) => StatusCode::BAD_REQUEST,
            OrderError::Referral(err) => err.status_code(),
            OrderError::Inventory(err) => err.status_code(),
        }
    }
}

impl IntoResponse for OrderError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_message = match self {
            OrderError::Referral(err) => return err.into_response(),
            OrderError::Inventory(err) => return err.into_response(),
            OrderError::DatabaseError(msg) => {
                tracing::error!("Database error in orders: {}", msg);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_wrapped_errors_keep_their_status() {
        let err: OrderError = InventoryError::InsufficientStock { available: 10, requested: 15 }.into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.to_string(), "Insufficient stock: 10 available, 15 requested");

        let err: OrderError = ReferralError::Expired.into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_refund_message() {
        let err = OrderError::RefundExceedsTotal { requested: dec!(1200), total: dec!(1000) };
        assert_eq!(err.to_string(), "Refund amount 1200 exceeds order total 1000");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_database_error_is_opaque() {
        let response = OrderError::DatabaseError("connection reset".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
