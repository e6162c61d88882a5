use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::validation::validate_positive_amount;

/// A mystery gift box in the catalog
///
/// `stock` is owned by the inventory ledger; catalog writes never touch it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct MysteryBox {
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = "Diwali Delight Box")]
    pub name: String,
    #[schema(example = "Sweets, diyas and a surprise keepsake")]
    pub description: String,
    #[schema(example = "festive")]
    pub category: String,
    #[schema(value_type = String, example = "1499.00")]
    pub price: Decimal,
    pub image_url: Option<String>,
    #[schema(example = 42)]
    pub stock: i32,
    #[schema(example = 10)]
    pub low_stock_threshold: i32,
    #[schema(example = 1000)]
    pub overstock_threshold: i32,
    pub is_active: bool,
    #[schema(example = 4.5, minimum = 0.0, maximum = 5.0)]
    pub rating: f64,
    pub review_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for POST /api/admin/boxes
///
/// New boxes start with zero stock; the first restock goes through the inventory ledger.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateBox {
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    #[schema(example = "Diwali Delight Box")]
    pub name: String,
    #[validate(length(max = 5000, message = "Description must not exceed 5000 characters"))]
    #[serde(default)]
    pub description: String,
    #[validate(length(min = 1, max = 100, message = "Category must be between 1 and 100 characters"))]
    #[schema(example = "festive")]
    pub category: String,
    #[validate(custom = "validate_positive_amount")]
    #[schema(value_type = String, example = "1499.00")]
    pub price: Decimal,
    #[validate(url(message = "Image URL must be a valid URL"))]
    pub image_url: Option<String>,
    #[validate(range(min = 0, message = "Low stock threshold must not be negative"))]
    pub low_stock_threshold: Option<i32>,
    #[validate(range(min = 1, message = "Overstock threshold must be positive"))]
    pub overstock_threshold: Option<i32>,
}

/// Payload for PUT /api/admin/boxes/{id}; omitted fields keep their value
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateBox {
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 5000, message = "Description must not exceed 5000 characters"))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Category must be between 1 and 100 characters"))]
    pub category: Option<String>,
    #[validate(custom = "validate_positive_amount")]
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    #[validate(url(message = "Image URL must be a valid URL"))]
    pub image_url: Option<String>,
    #[validate(range(min = 0, message = "Low stock threshold must not be negative"))]
    pub low_stock_threshold: Option<i32>,
    #[validate(range(min = 1, message = "Overstock threshold must be positive"))]
    pub overstock_threshold: Option<i32>,
    pub is_active: Option<bool>,
}

/// Default low stock threshold for new boxes
pub const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 10;
/// Default overstock threshold for new boxes
pub const DEFAULT_OVERSTOCK_THRESHOLD: i32 = 1000;
