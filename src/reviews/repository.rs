use sqlx::PgPool;

use crate::reviews::{Review, ReviewError};

const REVIEW_COLUMNS: &str = "id, user_id, box_id, rating, comment, created_at, updated_at";

/// Repository for database operations on reviews
#[derive(Clone)]
pub struct ReviewRepository {
    pool: PgPool,
}

impl ReviewRepository {
    /// Create a new ReviewRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a review; a second review of the same box by the same user is a DuplicateReview
    pub async fn create(
        &self,
        user_id: i32,
        box_id: i32,
        rating: i16,
        comment: Option<String>,
    ) -> Result<Review, ReviewError> {
        let review = sqlx::query_as::<_, Review>(&format!(
            r#"
            INSERT INTO reviews (user_id, box_id, rating, comment)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            REVIEW_COLUMNS
        ))
        .bind(user_id)
        .bind(box_id)
        .bind(rating)
        .bind(comment)
        .fetch_one(&self.pool)
        .await?;

        Ok(review)
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<Review>, ReviewError> {
        let review = sqlx::query_as::<_, Review>(&format!("SELECT {} FROM reviews WHERE id = $1", REVIEW_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(review)
    }

    /// Update rating and/or comment, leaving absent fields unchanged
    pub async fn update(&self, id: i32, rating: Option<i16>, comment: Option<String>) -> Result<Review, ReviewError> {
        let review = sqlx::query_as::<_, Review>(&format!(
            r#"
            UPDATE reviews
            SET rating = COALESCE($2, rating),
                comment = COALESCE($3, comment),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            REVIEW_COLUMNS
        ))
        .bind(id)
        .bind(rating)
        .bind(comment)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ReviewError::NotFound)?;

        Ok(review)
    }

    pub async fn delete(&self, id: i32) -> Result<(), ReviewError> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ReviewError::NotFound);
        }

        Ok(())
    }

    /// Reviews of a box, newest first
    pub async fn find_by_box(&self, box_id: i32) -> Result<Vec<Review>, ReviewError> {
        let reviews = sqlx::query_as::<_, Review>(&format!(
            "SELECT {} FROM reviews WHERE box_id = $1 ORDER BY created_at DESC, id DESC",
            REVIEW_COLUMNS
        ))
        .bind(box_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(reviews)
    }

    /// All rating values for a box
    pub async fn ratings_for_box(&self, box_id: i32) -> Result<Vec<i16>, ReviewError> {
        let ratings: Vec<(i16,)> = sqlx::query_as("SELECT rating FROM reviews WHERE box_id = $1")
            .bind(box_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(ratings.into_iter().map(|(r,)| r).collect())
    }

    /// Store the aggregate rating shown on the box
    pub async fn update_box_rating(&self, box_id: i32, average: f64, count: i32) -> Result<(), ReviewError> {
        sqlx::query("UPDATE boxes SET rating = $2, review_count = $3, updated_at = NOW() WHERE id = $1")
            .bind(box_id)
            .bind(average)
            .bind(count)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Whether an active box with this id exists
    pub async fn box_exists(&self, box_id: i32) -> Result<bool, ReviewError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM boxes WHERE id = $1 AND is_active = TRUE)")
            .bind(box_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }
}
