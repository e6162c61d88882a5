use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;
use validator::Validate;

use crate::validation::validate_non_negative_amount;

/// Kind of stock movement recorded in the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Restock,
    Sale,
    /// Sets the stock to an absolute value
    Adjustment,
    Return,
    Damaged,
    Expired,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Restock => "restock",
            TransactionType::Sale => "sale",
            TransactionType::Adjustment => "adjustment",
            TransactionType::Return => "return",
            TransactionType::Damaged => "damaged",
            TransactionType::Expired => "expired",
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    LowStock,
    OutOfStock,
    Overstock,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::LowStock => "low_stock",
            AlertType::OutOfStock => "out_of_stock",
            AlertType::Overstock => "overstock",
        }
    }
}

impl std::fmt::Display for AlertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a ledger entry refers to outside the inventory
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier_info: Option<String>,
}

impl TransactionReference {
    pub fn for_order(order_id: Uuid) -> Self {
        Self {
            order_id: Some(order_id),
            ..Self::default()
        }
    }
}

/// Immutable ledger entry for one stock-changing event
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InventoryTransaction {
    pub id: i64,
    pub box_id: i32,
    pub transaction_type: TransactionType,
    /// Magnitude of the movement; signed delta for adjustments
    pub quantity: i32,
    pub previous_stock: i32,
    pub new_stock: i32,
    pub reason: String,
    pub reference: Json<TransactionReference>,
    pub performed_by: i32,
    pub unit_cost: Option<Decimal>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StockAlert {
    pub id: i64,
    pub box_id: i32,
    pub alert_type: AlertType,
    pub current_stock: i32,
    pub threshold: i32,
    pub is_active: bool,
    pub acknowledged_by: Option<i32>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything needed to write one ledger entry
#[derive(Debug, Clone)]
pub struct StockMovement {
    pub box_id: i32,
    pub transaction_type: TransactionType,
    pub quantity: i32,
    pub reason: String,
    pub performed_by: i32,
    pub reference: TransactionReference,
    pub unit_cost: Option<Decimal>,
    pub notes: Option<String>,
}

/// Request DTO for POST /api/admin/inventory/transactions
#[derive(Debug, Deserialize, Validate)]
pub struct RecordTransactionRequest {
    pub box_id: i32,
    pub transaction_type: TransactionType,
    pub quantity: i32,
    #[validate(length(min = 1, max = 500, message = "Reason must be between 1 and 500 characters"))]
    pub reason: String,
    #[serde(default)]
    pub reference: Option<TransactionReference>,
    #[validate(custom = "validate_non_negative_amount")]
    pub unit_cost: Option<Decimal>,
    #[validate(length(max = 1000, message = "Notes must not exceed 1000 characters"))]
    pub notes: Option<String>,
}

impl RecordTransactionRequest {
    pub fn into_movement(self, performed_by: i32) -> StockMovement {
        StockMovement {
            box_id: self.box_id,
            transaction_type: self.transaction_type,
            quantity: self.quantity,
            reason: self.reason,
            performed_by,
            reference: self.reference.unwrap_or_default(),
            unit_cost: self.unit_cost,
            notes: self.notes,
        }
    }
}

/// Query parameters for GET /api/admin/inventory/transactions
#[derive(Debug, Default, Deserialize)]
pub struct TransactionFilter {
    pub box_id: Option<i32>,
    pub transaction_type: Option<TransactionType>,
    pub limit: Option<i64>,
}

/// Query parameters for GET /api/admin/inventory/alerts
#[derive(Debug, Default, Deserialize)]
pub struct AlertFilter {
    pub active_only: Option<bool>,
}

/// Stock overview across the catalog
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct InventorySummary {
    pub total_boxes: i64,
    pub total_units: i64,
    pub low_stock_count: i64,
    pub out_of_stock_count: i64,
    pub overstock_count: i64,
    pub stock_value: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_type_names() {
        let parsed: TransactionType = serde_json::from_str("\"return\"").unwrap();
        assert_eq!(parsed, TransactionType::Return);
        assert_eq!(TransactionType::Adjustment.to_string(), "adjustment");
        assert!(serde_json::from_str::<TransactionType>("\"gift\"").is_err());
    }

    #[test]
    fn test_alert_type_names() {
        assert_eq!(serde_json::to_string(&AlertType::OutOfStock).unwrap(), "\"out_of_stock\"");
        assert_eq!(AlertType::LowStock.to_string(), "low_stock");
    }

    #[test]
    fn test_reference_skips_empty_fields() {
        let order_id = Uuid::new_v4();
        let json = serde_json::to_value(TransactionReference::for_order(order_id)).unwrap();
        assert_eq!(json, serde_json::json!({ "order_id": order_id }));
    }
}
