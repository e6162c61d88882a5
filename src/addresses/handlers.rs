// HTTP handlers for the saved address book

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::addresses::{SaveAddressRequest, SavedAddress};
use crate::auth::AuthenticatedUser;
use crate::error::ApiError;
use crate::AppState;

/// GET /api/user/addresses
pub async fn list_addresses_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<SavedAddress>>, ApiError> {
    let addresses = state.address_service.list(user.user_id).await?;
    Ok(Json(addresses))
}

/// POST /api/user/addresses
pub async fn create_address_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<SaveAddressRequest>,
) -> Result<(StatusCode, Json<SavedAddress>), ApiError> {
    let address = state.address_service.create(user.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(address)))
}

/// PUT /api/user/addresses/{id}
pub async fn update_address_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<SaveAddressRequest>,
) -> Result<Json<SavedAddress>, ApiError> {
    let address = state.address_service.update(user.user_id, id, request).await?;
    Ok(Json(address))
}

/// DELETE /api/user/addresses/{id}
pub async fn delete_address_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    state.address_service.delete(user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
