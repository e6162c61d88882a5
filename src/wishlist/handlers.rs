// HTTP handlers for the wishlist

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::auth::AuthenticatedUser;
use crate::db::find_box;
use crate::error::ApiError;
use crate::wishlist::{AddWishlistItemRequest, WishlistItem};
use crate::AppState;

fn box_not_found(box_id: i32) -> ApiError {
    ApiError::NotFound {
        resource: "Box".to_string(),
        id: box_id.to_string(),
    }
}

/// GET /api/user/wishlist
pub async fn list_wishlist_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<WishlistItem>>, ApiError> {
    let items = state.wishlist.list(user.user_id).await?;
    Ok(Json(items))
}

/// Save an active box; saving it again is a no-op
/// POST /api/user/wishlist
pub async fn add_wishlist_item_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<AddWishlistItemRequest>,
) -> Result<(StatusCode, Json<Vec<WishlistItem>>), ApiError> {
    let mystery_box = find_box(&state.db, request.box_id)
        .await?
        .filter(|b| b.is_active)
        .ok_or_else(|| box_not_found(request.box_id))?;

    let added = state.wishlist.add(user.user_id, mystery_box.id).await?;
    let status = if added { StatusCode::CREATED } else { StatusCode::OK };

    let items = state.wishlist.list(user.user_id).await?;
    Ok((status, Json(items)))
}

/// DELETE /api/user/wishlist/{box_id}
pub async fn remove_wishlist_item_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(box_id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    if !state.wishlist.remove(user.user_id, box_id).await? {
        return Err(box_not_found(box_id));
    }
    Ok(StatusCode::NO_CONTENT)
}
