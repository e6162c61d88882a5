use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;
use validator::Validate;

use crate::validation::{validate_non_negative_amount, validate_phone, validate_referral_code};

/// Order status enum representing the lifecycle of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Packed,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 8] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Processing,
        OrderStatus::Packed,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::Refunded,
    ];

    /// Convert status to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Processing => "processing",
            OrderStatus::Packed => "packed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        }
    }

    /// Default timeline text for a status change
    pub fn describe(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Order placed",
            OrderStatus::Confirmed => "Order confirmed",
            OrderStatus::Processing => "Order is being prepared",
            OrderStatus::Packed => "Order packed",
            OrderStatus::Shipped => "Order shipped",
            OrderStatus::Delivered => "Order delivered",
            OrderStatus::Cancelled => "Order cancelled",
            OrderStatus::Refunded => "Order refunded",
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payment status enum representing the payment state of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Pending
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cod,
    Card,
    Upi,
    NetBanking,
}

/// Postal address stored as a JSON document on the order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Address {
    #[validate(length(min = 1, max = 100, message = "Full name must be between 1 and 100 characters"))]
    pub full_name: String,
    #[validate(custom = "validate_phone")]
    pub phone: String,
    #[validate(length(min = 1, max = 200, message = "Address line must be between 1 and 200 characters"))]
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 200, message = "Address line must not exceed 200 characters"))]
    pub line2: Option<String>,
    #[validate(length(min = 1, max = 100, message = "City is required"))]
    pub city: String,
    #[validate(length(min = 1, max = 100, message = "State is required"))]
    pub state: String,
    #[validate(length(min = 3, max = 12, message = "Postal code must be between 3 and 12 characters"))]
    pub postal_code: String,
    #[validate(length(min = 2, max = 56, message = "Country is required"))]
    pub country: String,
}

impl Address {
    /// Digits of the phone number, ignoring spaces and punctuation
    pub fn phone_digits(&self) -> String {
        digits_only(&self.phone)
    }
}

pub fn digits_only(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Domain model representing an order in the database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: i32,
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub shipping_address: Json<Address>,
    pub billing_address: Json<Address>,
    pub carrier: Option<String>,
    pub tracking_number: Option<String>,
    pub tracking_url: Option<String>,
    pub tracking_status: Option<String>,
    pub notes: Option<String>,
    pub referral_code: Option<String>,
    pub rewards_earned: i32,
    pub refund_amount: Option<Decimal>,
    pub refund_reason: Option<String>,
    pub refunded_at: Option<DateTime<Utc>>,
    /// Bumped on every status change
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Domain model representing an item within an order
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OrderItem {
    pub id: i32,
    pub order_id: Uuid,
    pub box_id: i32,
    /// Box name at the time of ordering
    pub name: String,
    /// Box price at the time of ordering
    pub unit_price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
    pub personalization: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TimelineEntry {
    pub id: i64,
    #[serde(skip_serializing)]
    pub order_id: Uuid,
    pub status: OrderStatus,
    pub description: String,
    pub updated_by: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Carrier-side progress reported for a shipment
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TrackingUpdate {
    pub id: i64,
    #[serde(skip_serializing)]
    pub order_id: Uuid,
    pub status: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Line item priced and ready to insert
#[derive(Debug, Clone, PartialEq)]
pub struct PricedItem {
    pub box_id: i32,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
    pub personalization: Option<String>,
}

/// Request DTO for one checkout line
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CheckoutItem {
    pub box_id: i32,
    #[validate(range(min = 1, max = 100, message = "Quantity must be between 1 and 100"))]
    pub quantity: i32,
    #[validate(length(max = 500, message = "Personalization must not exceed 500 characters"))]
    pub personalization: Option<String>,
}

/// Request DTO for POST /api/checkout
#[derive(Debug, Deserialize, Validate)]
pub struct CheckoutRequest {
    #[validate(length(min = 1, max = 50, message = "Order must contain between 1 and 50 items"))]
    pub items: Vec<CheckoutItem>,
    pub shipping_address: Address,
    /// Defaults to the shipping address
    pub billing_address: Option<Address>,
    pub payment_method: PaymentMethod,
    #[validate(custom = "validate_referral_code")]
    pub referral_code: Option<String>,
    #[validate(length(max = 1000, message = "Notes must not exceed 1000 characters"))]
    pub notes: Option<String>,
}

impl CheckoutRequest {
    /// Validate the request together with its addresses and lines
    pub fn validate_all(&self) -> Result<(), validator::ValidationErrors> {
        self.validate()?;
        self.shipping_address.validate()?;
        if let Some(billing) = &self.billing_address {
            billing.validate()?;
        }
        for item in &self.items {
            item.validate()?;
        }
        Ok(())
    }
}

/// Request DTO for PUT /api/admin/orders/{id}
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
    #[validate(length(min = 1, max = 500, message = "Description must be between 1 and 500 characters"))]
    pub description: Option<String>,
}

/// Request DTO for POST /api/admin/orders/{id}/tracking
#[derive(Debug, Deserialize, Validate)]
pub struct TrackingUpdateRequest {
    #[validate(length(min = 1, max = 64, message = "Tracking status must be between 1 and 64 characters"))]
    pub status: String,
    #[validate(length(max = 200, message = "Location must not exceed 200 characters"))]
    pub location: Option<String>,
    #[validate(length(max = 500, message = "Description must not exceed 500 characters"))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Carrier must be between 1 and 100 characters"))]
    pub carrier: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Tracking number must be between 1 and 100 characters"))]
    pub tracking_number: Option<String>,
    #[validate(url(message = "Tracking URL must be a valid URL"))]
    pub tracking_url: Option<String>,
}

/// Request DTO for POST /api/admin/orders/{id}/refund
#[derive(Debug, Deserialize, Validate)]
pub struct RefundRequest {
    /// Defaults to the order total
    #[validate(custom = "validate_non_negative_amount")]
    pub amount: Option<Decimal>,
    #[validate(length(min = 1, max = 500, message = "Reason must be between 1 and 500 characters"))]
    pub reason: String,
}

/// Query parameters for GET /api/admin/orders
#[derive(Debug, Default, Deserialize)]
pub struct AdminOrderQuery {
    pub status: Option<OrderStatus>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Query parameters for GET /api/tracking
#[derive(Debug, Deserialize, Validate)]
pub struct TrackingQuery {
    #[validate(length(min = 1, max = 32, message = "Order number is required"))]
    pub order_number: String,
    pub phone: Option<String>,
}

/// Order with its lines and history
#[derive(Debug, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub timeline: Vec<TimelineEntry>,
    pub tracking_updates: Vec<TrackingUpdate>,
}

/// Public view of an order for tracking without login
#[derive(Debug, Serialize)]
pub struct PublicTracking {
    pub order_number: String,
    pub status: OrderStatus,
    pub carrier: Option<String>,
    pub tracking_number: Option<String>,
    pub tracking_url: Option<String>,
    pub tracking_status: Option<String>,
    pub timeline: Vec<TimelineEntry>,
    pub tracking_updates: Vec<TrackingUpdate>,
    pub created_at: DateTime<Utc>,
}

impl From<OrderDetail> for PublicTracking {
    fn from(detail: OrderDetail) -> Self {
        Self {
            order_number: detail.order.order_number,
            status: detail.order.status,
            carrier: detail.order.carrier,
            tracking_number: detail.order.tracking_number,
            tracking_url: detail.order.tracking_url,
            tracking_status: detail.order.tracking_status,
            timeline: detail.timeline,
            tracking_updates: detail.tracking_updates,
            created_at: detail.order.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn address() -> Address {
        Address {
            full_name: "Asha Rao".to_string(),
            phone: "+91 98765-43210".to_string(),
            line1: "12 Park Street".to_string(),
            line2: None,
            city: "Kolkata".to_string(),
            state: "West Bengal".to_string(),
            postal_code: "700016".to_string(),
            country: "India".to_string(),
        }
    }

    #[test]
    fn test_status_round_trip_names() {
        for status in OrderStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
        assert!(serde_json::from_str::<OrderStatus>("\"completed\"").is_err());
    }

    #[test]
    fn test_payment_method_names() {
        assert_eq!(serde_json::to_string(&PaymentMethod::NetBanking).unwrap(), "\"net_banking\"");
        assert_eq!(serde_json::from_str::<PaymentMethod>("\"cod\"").unwrap(), PaymentMethod::Cod);
    }

    #[test]
    fn test_phone_digits() {
        assert_eq!(address().phone_digits(), "919876543210");
        assert_eq!(digits_only("(987) 654-3210"), "9876543210");
    }

    #[test]
    fn test_address_validation() {
        assert!(address().validate().is_ok());
        let mut bad = address();
        bad.phone = "12".to_string();
        assert!(bad.validate().is_err());
        bad = address();
        bad.city = String::new();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_checkout_requires_items() {
        let request = CheckoutRequest {
            items: vec![],
            shipping_address: address(),
            billing_address: None,
            payment_method: PaymentMethod::Cod,
            referral_code: None,
            notes: None,
        };
        assert!(request.validate_all().is_err());
    }

    #[test]
    fn test_checkout_item_quantity_validated() {
        let request = CheckoutRequest {
            items: vec![CheckoutItem { box_id: 1, quantity: 0, personalization: None }],
            shipping_address: address(),
            billing_address: None,
            payment_method: PaymentMethod::Card,
            referral_code: Some("FRIEND10".to_string()),
            notes: None,
        };
        assert!(request.validate_all().is_err());
    }

    #[test]
    fn test_checkout_item_count_bounds() {
        let line = CheckoutItem { box_id: 1, quantity: 1, personalization: None };
        let mut request = CheckoutRequest {
            items: vec![line.clone(); 50],
            shipping_address: address(),
            billing_address: None,
            payment_method: PaymentMethod::Cod,
            referral_code: None,
            notes: None,
        };
        assert!(request.validate_all().is_ok());

        request.items.push(line);
        assert!(request.validate_all().is_err());
    }

    #[test]
    fn test_checkout_item_json_shape() {
        let line = CheckoutItem { box_id: 3, quantity: 2, personalization: Some("Happy birthday".to_string()) };
        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["box_id"], 3);
        assert_eq!(json["quantity"], 2);
        assert_eq!(json["personalization"], "Happy birthday");
    }
}
