// HTTP handlers for inventory endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::auth::AdminUser;
use crate::inventory::{
    AlertFilter, InventoryError, InventorySummary, InventoryTransaction, RecordTransactionRequest, StockAlert,
    TransactionFilter,
};

/// Handler for POST /api/admin/inventory/transactions
pub async fn record_transaction_handler(
    State(state): State<crate::AppState>,
    AdminUser(admin): AdminUser,
    Json(request): Json<RecordTransactionRequest>,
) -> Result<(StatusCode, Json<InventoryTransaction>), InventoryError> {
    request
        .validate()
        .map_err(|e| InventoryError::ValidationError(e.to_string()))?;

    let transaction = state
        .inventory_service
        .record_transaction(request.into_movement(admin.user_id))
        .await?;

    Ok((StatusCode::CREATED, Json(transaction)))
}

/// Handler for GET /api/admin/inventory/transactions
pub async fn list_transactions_handler(
    State(state): State<crate::AppState>,
    _admin: AdminUser,
    Query(filter): Query<TransactionFilter>,
) -> Result<Json<Vec<InventoryTransaction>>, InventoryError> {
    Ok(Json(state.inventory_service.list_transactions(&filter).await?))
}

/// Handler for GET /api/admin/inventory/alerts
/// Active alerts only unless `active_only=false`
pub async fn list_alerts_handler(
    State(state): State<crate::AppState>,
    _admin: AdminUser,
    Query(filter): Query<AlertFilter>,
) -> Result<Json<Vec<StockAlert>>, InventoryError> {
    let alerts = state
        .inventory_service
        .list_alerts(filter.active_only.unwrap_or(true))
        .await?;

    Ok(Json(alerts))
}

/// Handler for PUT /api/admin/inventory/alerts/{id}/acknowledge
pub async fn acknowledge_alert_handler(
    State(state): State<crate::AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
) -> Result<Json<StockAlert>, InventoryError> {
    let alert = state
        .inventory_service
        .acknowledge_alert(id, admin.user_id)
        .await?;

    Ok(Json(alert))
}

/// Handler for GET /api/admin/inventory/summary
pub async fn inventory_summary_handler(
    State(state): State<crate::AppState>,
    _admin: AdminUser,
) -> Result<Json<InventorySummary>, InventoryError> {
    Ok(Json(state.inventory_service.summary().await?))
}
