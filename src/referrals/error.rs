use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde_json::json;

use crate::referrals::UsageStatus;

/// Error types for referral operations
#[derive(Debug, thiserror::Error)]
pub enum ReferralError {
    #[error("Invalid referral code")]
    InvalidCode,

    #[error("Referral code has expired")]
    Expired,

    #[error("Referral code usage limit exceeded")]
    LimitExceeded,

    #[error("You cannot use your own referral code")]
    SelfReferral,

    #[error("Minimum order value of {minimum} required to use this referral code")]
    BelowMinimum { minimum: Decimal },

    #[error("You have already used this referral code")]
    AlreadyUsed,

    #[error("Could not generate a unique referral code")]
    CodeGeneration,

    #[error("Referral code {0} is already taken")]
    CodeTaken(String),

    #[error("Referral not found")]
    NotFound,

    #[error("Referral usage not found")]
    UsageNotFound,

    #[error("Cannot move referral usage from {from} to {to}")]
    InvalidStatusTransition { from: UsageStatus, to: UsageStatus },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for ReferralError {
    fn from(err: sqlx::Error) -> Self {
        ReferralError::DatabaseError(err.to_string())
    }
}

impl ReferralError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ReferralError::NotFound | ReferralError::UsageNotFound => StatusCode::NOT_FOUND,
            ReferralError::CodeTaken(_) | ReferralError::AlreadyUsed => StatusCode::CONFLICT,
            ReferralError::CodeGeneration | ReferralError::DatabaseError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ReferralError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            ReferralError::DatabaseError(msg) => {
                tracing::error!("Database error in referrals: {}", msg);
                "Internal server error".to_string()
            }
            ReferralError::CodeGeneration => {
                tracing::error!("Referral code generation exhausted its attempts");
                self.to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
