use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A customer's review of a mystery box; one per user and box
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Review {
    pub id: i32,
    pub user_id: i32,
    pub box_id: i32,
    pub rating: i16,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request DTO for POST /api/reviews
#[derive(Debug, Deserialize, Validate, Clone)]
pub struct CreateReviewRequest {
    pub box_id: i32,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i16,
    #[validate(length(max = 1000, message = "Comment must not exceed 1000 characters"))]
    pub comment: Option<String>,
}

/// Request DTO for PUT /api/reviews/{id}
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateReviewRequest {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: Option<i16>,
    #[validate(length(max = 1000, message = "Comment must not exceed 1000 characters"))]
    pub comment: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_range() {
        let request = CreateReviewRequest {
            box_id: 1,
            rating: 5,
            comment: Some("Loved the surprise".to_string()),
        };
        assert!(request.validate().is_ok());

        let request = CreateReviewRequest { rating: 0, ..request };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_update_rating_out_of_range() {
        let request = UpdateReviewRequest {
            rating: Some(6),
            comment: None,
        };
        assert!(request.validate().is_err());

        let empty = UpdateReviewRequest {
            rating: None,
            comment: None,
        };
        assert!(empty.validate().is_ok());
    }

    #[test]
    fn test_comment_too_long() {
        let request = CreateReviewRequest {
            box_id: 1,
            rating: 3,
            comment: Some("x".repeat(1001)),
        };
        assert!(request.validate().is_err());
    }
}
