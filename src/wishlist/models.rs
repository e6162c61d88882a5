use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Saved box with its current catalog details
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WishlistItem {
    pub box_id: i32,
    pub name: String,
    pub category: String,
    pub price: Decimal,
    pub image_url: Option<String>,
    pub in_stock: bool,
    pub is_active: bool,
    pub added_at: DateTime<Utc>,
}

/// Request DTO for POST /api/user/wishlist
#[derive(Debug, Deserialize)]
pub struct AddWishlistItemRequest {
    pub box_id: i32,
}
