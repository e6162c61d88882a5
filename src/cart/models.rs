use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::orders::PriceCalculator;

/// Distinct boxes a cart may hold, the same cap checkout applies
pub const MAX_CART_LINES: i64 = 50;
/// Units of one box a single line may hold
pub const MAX_LINE_QUANTITY: i32 = 100;

/// Cart row joined with the box's current price and availability
#[derive(Debug, Clone, FromRow)]
pub struct CartLine {
    pub box_id: i32,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub personalization: Option<String>,
    pub stock: i32,
    pub is_active: bool,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartItem {
    pub box_id: i32,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
    pub personalization: Option<String>,
    /// Box is still sold and has enough stock for this line
    pub available: bool,
    pub added_at: DateTime<Utc>,
}

/// Cart as shown to its owner, priced at current box prices
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cart {
    pub items: Vec<CartItem>,
    pub item_count: i32,
    /// Sum over the available lines only
    pub subtotal: Decimal,
}

impl Cart {
    pub fn from_lines(lines: Vec<CartLine>) -> Self {
        let items: Vec<CartItem> = lines
            .into_iter()
            .map(|line| CartItem {
                available: line.is_active && line.stock >= line.quantity,
                line_total: PriceCalculator::line_total(line.quantity, line.unit_price),
                box_id: line.box_id,
                name: line.name,
                unit_price: line.unit_price,
                quantity: line.quantity,
                personalization: line.personalization,
                added_at: line.added_at,
            })
            .collect();

        let available_totals: Vec<Decimal> = items
            .iter()
            .filter(|item| item.available)
            .map(|item| item.line_total)
            .collect();

        Self {
            item_count: items.iter().map(|item| item.quantity).sum(),
            subtotal: PriceCalculator::calculate_subtotal(&available_totals),
            items,
        }
    }
}

fn default_quantity() -> i32 {
    1
}

/// Request DTO for POST /api/cart
#[derive(Debug, Deserialize, Validate)]
pub struct AddToCartRequest {
    pub box_id: i32,
    /// Added to the quantity already in the cart
    #[serde(default = "default_quantity")]
    #[validate(range(min = 1, max = 100, message = "Quantity must be between 1 and 100"))]
    pub quantity: i32,
    #[validate(length(max = 500, message = "Personalization must not exceed 500 characters"))]
    pub personalization: Option<String>,
}

/// Request DTO for PUT /api/cart/{box_id}
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCartItemRequest {
    #[validate(range(min = 1, max = 100, message = "Quantity must be between 1 and 100"))]
    pub quantity: i32,
    #[validate(length(max = 500, message = "Personalization must not exceed 500 characters"))]
    pub personalization: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(box_id: i32, unit_price: Decimal, quantity: i32, stock: i32, is_active: bool) -> CartLine {
        CartLine {
            box_id,
            name: format!("Box {}", box_id),
            unit_price,
            quantity,
            personalization: None,
            stock,
            is_active,
            added_at: Utc::now(),
        }
    }

    #[test]
    fn test_cart_totals() {
        let cart = Cart::from_lines(vec![line(1, dec!(499), 2, 10, true), line(2, dec!(250.50), 1, 3, true)]);
        assert_eq!(cart.items[0].line_total, dec!(998));
        assert_eq!(cart.item_count, 3);
        assert_eq!(cart.subtotal, dec!(1248.50));
    }

    #[test]
    fn test_unavailable_lines_excluded_from_subtotal() {
        let cart = Cart::from_lines(vec![
            line(1, dec!(499), 1, 10, true),
            line(2, dec!(300), 5, 4, true),
            line(3, dec!(200), 1, 10, false),
        ]);
        assert!(cart.items[0].available);
        assert!(!cart.items[1].available);
        assert!(!cart.items[2].available);
        assert_eq!(cart.subtotal, dec!(499));
        assert_eq!(cart.item_count, 7);
    }

    #[test]
    fn test_empty_cart() {
        let cart = Cart::from_lines(Vec::new());
        assert!(cart.items.is_empty());
        assert_eq!(cart.subtotal, Decimal::ZERO);
        assert_eq!(cart.item_count, 0);
    }

    #[test]
    fn test_add_request_defaults_to_one() {
        let request: AddToCartRequest = serde_json::from_str(r#"{"box_id": 4}"#).unwrap();
        assert_eq!(request.quantity, 1);
        assert!(request.validate().is_ok());

        let request: AddToCartRequest = serde_json::from_str(r#"{"box_id": 4, "quantity": 101}"#).unwrap();
        assert!(request.validate().is_err());
    }
}
