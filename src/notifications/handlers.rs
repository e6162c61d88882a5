// HTTP handlers for in-app notifications

use axum::{
    extract::{Path, State},
    Json,
};

use crate::auth::AuthenticatedUser;
use crate::error::ApiError;
use crate::notifications::Notification;

/// Handler for GET /api/user/notifications
pub async fn list_notifications_handler(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Notification>>, ApiError> {
    let notifications = state.notifications.list_for_user(user.user_id).await?;
    Ok(Json(notifications))
}

/// Handler for PUT /api/user/notifications/{id}/read
pub async fn mark_notification_read_handler(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<Notification>, ApiError> {
    let notification = state
        .notifications
        .mark_read(user.user_id, id)
        .await?
        .ok_or_else(|| ApiError::NotFound {
            resource: "Notification".to_string(),
            id: id.to_string(),
        })?;

    Ok(Json(notification))
}
