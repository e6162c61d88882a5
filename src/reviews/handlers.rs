// HTTP handlers for review endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::auth::AuthenticatedUser;
use crate::reviews::{CreateReviewRequest, Review, ReviewError, UpdateReviewRequest};
use crate::AppState;

/// Create a new review
/// POST /api/reviews
pub async fn create_review_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<Review>), ReviewError> {
    let review = state.review_service.create_review(user.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// Update the caller's review
/// PUT /api/reviews/{id}
pub async fn update_review_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(review_id): Path<i32>,
    Json(request): Json<UpdateReviewRequest>,
) -> Result<Json<Review>, ReviewError> {
    let review = state
        .review_service
        .update_review(review_id, user.user_id, request)
        .await?;

    Ok(Json(review))
}

/// Delete the caller's review
/// DELETE /api/reviews/{id}
pub async fn delete_review_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(review_id): Path<i32>,
) -> Result<StatusCode, ReviewError> {
    state.review_service.delete_review(review_id, user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Reviews of a box
/// GET /api/boxes/{id}/reviews
pub async fn list_box_reviews_handler(
    State(state): State<AppState>,
    Path(box_id): Path<i32>,
) -> Result<Json<Vec<Review>>, ReviewError> {
    let reviews = state.review_service.reviews_for_box(box_id).await?;
    Ok(Json(reviews))
}
