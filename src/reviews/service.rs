use sqlx::PgPool;
use validator::Validate;

use crate::reviews::{CreateReviewRequest, RatingCalculator, Review, ReviewError, ReviewRepository, UpdateReviewRequest};

/// Service layer for review business logic
///
/// Every write is followed by an explicit rating recompute for the box. A failed
/// recompute is logged and does not fail the review write.
#[derive(Clone)]
pub struct ReviewService {
    repository: ReviewRepository,
    rating_calculator: RatingCalculator,
}

impl ReviewService {
    pub fn new(pool: PgPool) -> Self {
        let repository = ReviewRepository::new(pool);
        Self {
            rating_calculator: RatingCalculator::new(repository.clone()),
            repository,
        }
    }

    pub async fn create_review(&self, user_id: i32, request: CreateReviewRequest) -> Result<Review, ReviewError> {
        request
            .validate()
            .map_err(|e| ReviewError::ValidationError(e.to_string()))?;

        if !self.repository.box_exists(request.box_id).await? {
            return Err(ReviewError::BoxNotFound(request.box_id));
        }

        let review = self
            .repository
            .create(user_id, request.box_id, request.rating, request.comment)
            .await?;

        tracing::info!("User {} reviewed box {} with {} stars", user_id, review.box_id, review.rating);
        self.refresh_rating(review.box_id).await;
        Ok(review)
    }

    pub async fn update_review(
        &self,
        review_id: i32,
        user_id: i32,
        request: UpdateReviewRequest,
    ) -> Result<Review, ReviewError> {
        request
            .validate()
            .map_err(|e| ReviewError::ValidationError(e.to_string()))?;

        let existing = self.owned_review(review_id, user_id).await?;
        let updated = self
            .repository
            .update(review_id, request.rating, request.comment)
            .await?;

        if updated.rating != existing.rating {
            self.refresh_rating(updated.box_id).await;
        }
        Ok(updated)
    }

    pub async fn delete_review(&self, review_id: i32, user_id: i32) -> Result<(), ReviewError> {
        let existing = self.owned_review(review_id, user_id).await?;
        self.repository.delete(review_id).await?;

        tracing::info!("User {} deleted review {} of box {}", user_id, review_id, existing.box_id);
        self.refresh_rating(existing.box_id).await;
        Ok(())
    }

    pub async fn reviews_for_box(&self, box_id: i32) -> Result<Vec<Review>, ReviewError> {
        self.repository.find_by_box(box_id).await
    }

    async fn owned_review(&self, review_id: i32, user_id: i32) -> Result<Review, ReviewError> {
        let review = self
            .repository
            .find_by_id(review_id)
            .await?
            .ok_or(ReviewError::NotFound)?;

        if review.user_id != user_id {
            return Err(ReviewError::Forbidden);
        }
        Ok(review)
    }

    async fn refresh_rating(&self, box_id: i32) {
        if let Err(e) = self.rating_calculator.recalculate(box_id).await {
            tracing::warn!("Failed to recalculate rating for box {}: {}", box_id, e);
        }
    }
}
