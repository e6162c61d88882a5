use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use validator::Validate;

use crate::orders::Address;

/// Saved addresses a user may keep
pub const MAX_SAVED_ADDRESSES: i64 = 10;

/// Address book entry
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SavedAddress {
    pub id: i32,
    #[serde(skip_serializing)]
    pub user_id: i32,
    pub label: Option<String>,
    pub address: Json<Address>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request DTO for POST and PUT /api/user/addresses
#[derive(Debug, Deserialize, Validate)]
pub struct SaveAddressRequest {
    /// Short name such as "Home" or "Office"
    #[validate(length(min = 1, max = 50, message = "Label must be between 1 and 50 characters"))]
    pub label: Option<String>,
    pub address: Address,
    /// Make this the default; an existing default cannot be unset directly
    #[serde(default)]
    pub is_default: bool,
}

impl SaveAddressRequest {
    pub fn validate_all(&self) -> Result<(), validator::ValidationErrors> {
        self.validate()?;
        self.address.validate()
    }
}

/// A user's first address is their default whatever the request says
pub fn becomes_default(requested: bool, existing_addresses: i64) -> bool {
    requested || existing_addresses == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(phone: &str) -> SaveAddressRequest {
        serde_json::from_value(json!({
            "label": "Home",
            "address": {
                "full_name": "Asha Rao",
                "phone": phone,
                "line1": "12 Park Street",
                "city": "Kolkata",
                "state": "West Bengal",
                "postal_code": "700016",
                "country": "India"
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_first_address_is_default() {
        assert!(becomes_default(false, 0));
        assert!(becomes_default(true, 3));
        assert!(!becomes_default(false, 3));
    }

    #[test]
    fn test_nested_address_validated() {
        let ok = request("+91 98765 43210");
        assert!(!ok.is_default);
        assert!(ok.validate_all().is_ok());
        assert!(request("12").validate_all().is_err());
    }

    #[test]
    fn test_empty_label_rejected() {
        let mut req = request("+91 98765 43210");
        req.label = Some(String::new());
        assert!(req.validate_all().is_err());
    }
}
