// Validation utilities module
// Custom validators shared by request DTOs

use regex::Regex;
use rust_decimal::Decimal;
use std::sync::OnceLock;
use validator::ValidationError;

/// Referral codes are 6-12 uppercase letters or digits
fn referral_code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Z0-9]{6,12}$").expect("referral code pattern is valid"))
}

/// Validates a referral code after uppercasing it, so "abc123" and "ABC123" behave the same
pub fn validate_referral_code(code: &str) -> Result<(), ValidationError> {
    if referral_code_pattern().is_match(&code.trim().to_uppercase()) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_referral_code"))
    }
}

/// Validates that a money amount is strictly positive
pub fn validate_positive_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount <= Decimal::ZERO {
        Err(ValidationError::new("amount_must_be_positive"))
    } else {
        Ok(())
    }
}

/// Validates that a money amount is zero or more
pub fn validate_non_negative_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount < Decimal::ZERO {
        Err(ValidationError::new("amount_must_not_be_negative"))
    } else {
        Ok(())
    }
}

/// Validates an Indian-style phone number: 10 to 13 digits once separators are stripped
pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
    let allowed = phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '(' | ')'));
    if allowed && (10..=13).contains(&digits) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_phone"))
    }
}
