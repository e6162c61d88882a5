// HTTP handlers for order endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{AdminUser, AuthenticatedUser};
use crate::orders::{
    AdminOrderQuery, CheckoutRequest, Order, OrderDetail, OrderError, PublicTracking, RefundRequest,
    TrackingQuery, TrackingUpdateRequest, UpdateOrderStatusRequest,
};

/// Handler for POST /api/checkout
/// Places an order for the authenticated user
pub async fn checkout_handler(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<OrderDetail>), OrderError> {
    let detail = state.order_service.checkout(user.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// Handler for GET /api/orders
/// Lists the caller's orders, newest first
pub async fn list_my_orders_handler(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Order>>, OrderError> {
    let orders = state.order_service.list_user_orders(user.user_id).await?;
    Ok(Json(orders))
}

/// Handler for GET /api/orders/{order_id}
pub async fn get_my_order_handler(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderDetail>, OrderError> {
    let detail = state.order_service.get_user_order(user.user_id, order_id).await?;
    Ok(Json(detail))
}

/// Handler for GET /api/admin/orders
pub async fn admin_list_orders_handler(
    State(state): State<crate::AppState>,
    _admin: AdminUser,
    Query(query): Query<AdminOrderQuery>,
) -> Result<Json<Vec<Order>>, OrderError> {
    let orders = state.order_service.admin_list(&query).await?;
    Ok(Json(orders))
}

/// Handler for GET /api/admin/orders/{order_id}
pub async fn admin_get_order_handler(
    State(state): State<crate::AppState>,
    _admin: AdminUser,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderDetail>, OrderError> {
    let detail = state.order_service.admin_get(order_id).await?;
    Ok(Json(detail))
}

/// Handler for PUT /api/admin/orders/{order_id}
/// Moves an order along its lifecycle
pub async fn update_order_status_handler(
    State(state): State<crate::AppState>,
    AdminUser(admin): AdminUser,
    Path(order_id): Path<Uuid>,
    Json(request): Json<UpdateOrderStatusRequest>,
) -> Result<Json<Order>, OrderError> {
    request
        .validate()
        .map_err(|e| OrderError::ValidationError(e.to_string()))?;

    let order = state
        .order_service
        .update_status(order_id, request.status, request.description, Some(admin.user_id))
        .await?;

    Ok(Json(order))
}

/// Handler for POST /api/admin/orders/{order_id}/tracking
pub async fn add_tracking_update_handler(
    State(state): State<crate::AppState>,
    _admin: AdminUser,
    Path(order_id): Path<Uuid>,
    Json(request): Json<TrackingUpdateRequest>,
) -> Result<(StatusCode, Json<OrderDetail>), OrderError> {
    request
        .validate()
        .map_err(|e| OrderError::ValidationError(e.to_string()))?;

    let detail = state.order_service.add_tracking_update(order_id, request).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// Handler for POST /api/admin/orders/{order_id}/refund
pub async fn refund_order_handler(
    State(state): State<crate::AppState>,
    AdminUser(admin): AdminUser,
    Path(order_id): Path<Uuid>,
    Json(request): Json<RefundRequest>,
) -> Result<Json<Order>, OrderError> {
    request
        .validate()
        .map_err(|e| OrderError::ValidationError(e.to_string()))?;

    let order = state.order_service.refund(order_id, request, admin.user_id).await?;
    Ok(Json(order))
}

/// Handler for GET /api/tracking
/// Public lookup by order number, optionally checked against the shipping phone
pub async fn track_order_handler(
    State(state): State<crate::AppState>,
    Query(query): Query<TrackingQuery>,
) -> Result<Json<PublicTracking>, OrderError> {
    query
        .validate()
        .map_err(|e| OrderError::ValidationError(e.to_string()))?;

    let tracking = state
        .order_service
        .track(&query.order_number, query.phone.as_deref())
        .await?;

    Ok(Json(tracking))
}
