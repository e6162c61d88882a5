use crate::reviews::{ReviewError, ReviewRepository};

/// Average rating and review count of a box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingSummary {
    pub average: f64,
    pub count: i32,
}

impl RatingSummary {
    /// Arithmetic mean rounded to one decimal place; zero when there are no reviews
    pub fn from_ratings(ratings: &[i16]) -> Self {
        if ratings.is_empty() {
            return Self { average: 0.0, count: 0 };
        }

        let sum: i64 = ratings.iter().map(|&r| i64::from(r)).sum();
        let mean = sum as f64 / ratings.len() as f64;
        Self {
            average: (mean * 10.0).round() / 10.0,
            count: ratings.len() as i32,
        }
    }
}

/// Recomputes the aggregate rating stored on a box
#[derive(Clone)]
pub struct RatingCalculator {
    repository: ReviewRepository,
}

impl RatingCalculator {
    pub fn new(repository: ReviewRepository) -> Self {
        Self { repository }
    }

    /// Recalculate from all reviews of `box_id` and write it to the box row
    pub async fn recalculate(&self, box_id: i32) -> Result<RatingSummary, ReviewError> {
        let ratings = self.repository.ratings_for_box(box_id).await?;
        let summary = RatingSummary::from_ratings(&ratings);

        self.repository
            .update_box_rating(box_id, summary.average, summary.count)
            .await?;

        tracing::debug!("Box {} rating is now {} over {} reviews", box_id, summary.average, summary.count);
        Ok(summary)
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    /// The average of 1..=5 ratings stays within 1..=5
    #[test]
    fn prop_average_within_bounds() {
        proptest!(|(ratings in prop::collection::vec(1i16..=5, 1..200))| {
            let summary = RatingSummary::from_ratings(&ratings);
            prop_assert!(summary.average >= 1.0 && summary.average <= 5.0);
            prop_assert_eq!(summary.count as usize, ratings.len());
        });
    }
}
