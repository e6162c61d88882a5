// HTTP handlers for the shopping cart

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::auth::AuthenticatedUser;
use crate::cart::{AddToCartRequest, Cart, CartError, UpdateCartItemRequest};
use crate::AppState;

/// GET /api/cart
pub async fn get_cart_handler(State(state): State<AppState>, user: AuthenticatedUser) -> Result<Json<Cart>, CartError> {
    let cart = state.cart_service.get_cart(user.user_id).await?;
    Ok(Json(cart))
}

/// Add a box to the cart, merging with an existing line
/// POST /api/cart
pub async fn add_to_cart_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<AddToCartRequest>,
) -> Result<Json<Cart>, CartError> {
    let cart = state.cart_service.add_item(user.user_id, request).await?;
    Ok(Json(cart))
}

/// PUT /api/cart/{box_id}
pub async fn update_cart_item_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(box_id): Path<i32>,
    Json(request): Json<UpdateCartItemRequest>,
) -> Result<Json<Cart>, CartError> {
    let cart = state.cart_service.update_item(user.user_id, box_id, request).await?;
    Ok(Json(cart))
}

/// DELETE /api/cart/{box_id}
pub async fn remove_cart_item_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(box_id): Path<i32>,
) -> Result<Json<Cart>, CartError> {
    let cart = state.cart_service.remove_item(user.user_id, box_id).await?;
    Ok(Json(cart))
}

/// DELETE /api/cart
pub async fn clear_cart_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<StatusCode, CartError> {
    state.cart_service.clear(user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
