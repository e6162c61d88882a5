use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;
use validator::Validate;

use crate::validation::{validate_non_negative_amount, validate_referral_code};

/// Reward granted to the person redeeming a code
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RewardRule {
    /// Percent of the order value, optionally capped
    Percentage {
        value: Decimal,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_amount: Option<Decimal>,
    },
    /// Flat amount off the order
    Fixed { value: Decimal },
    /// Loyalty points credited later; no discount at checkout
    Points { value: Decimal },
}

impl RewardRule {
    pub fn validate_terms(&self) -> Result<(), String> {
        match *self {
            RewardRule::Percentage { value, max_amount } => {
                if value <= Decimal::ZERO || value > Decimal::ONE_HUNDRED {
                    return Err("Percentage reward must be between 0 and 100".to_string());
                }
                if matches!(max_amount, Some(max) if max <= Decimal::ZERO) {
                    return Err("Reward cap must be positive".to_string());
                }
                Ok(())
            }
            RewardRule::Fixed { value } | RewardRule::Points { value } => {
                if value <= Decimal::ZERO {
                    Err("Reward value must be positive".to_string())
                } else {
                    Ok(())
                }
            }
        }
    }
}

/// Reward credited to the code owner on each redemption
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReferrerReward {
    /// Percent of the discount the referee received
    Percentage { value: Decimal },
    Fixed { value: Decimal },
    Points { value: Decimal },
}

impl ReferrerReward {
    pub fn validate_terms(&self) -> Result<(), String> {
        match *self {
            ReferrerReward::Percentage { value } if value <= Decimal::ZERO || value > Decimal::ONE_HUNDRED => {
                Err("Percentage referrer reward must be between 0 and 100".to_string())
            }
            ReferrerReward::Fixed { value } | ReferrerReward::Points { value } if value <= Decimal::ZERO => {
                Err("Referrer reward value must be positive".to_string())
            }
            _ => Ok(()),
        }
    }
}

/// A shareable referral code
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Referral {
    pub id: Uuid,
    /// The referrer who owns the code
    pub user_id: i32,
    pub code: String,
    pub is_active: bool,
    pub usage_limit: Option<i32>,
    pub usage_count: i32,
    pub expires_at: Option<DateTime<Utc>>,
    pub reward: Json<RewardRule>,
    pub referrer_reward: Json<ReferrerReward>,
    pub minimum_order_value: Decimal,
    pub description: Option<String>,
    pub created_by: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Referral {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(expires_at) if expires_at <= now)
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self.usage_limit, Some(limit) if self.usage_count >= limit)
    }
}

/// Lifecycle of a single redemption's payout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UsageStatus {
    Pending,
    Confirmed,
    Paid,
    Cancelled,
}

impl UsageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UsageStatus::Pending => "pending",
            UsageStatus::Confirmed => "confirmed",
            UsageStatus::Paid => "paid",
            UsageStatus::Cancelled => "cancelled",
        }
    }

    /// pending -> confirmed | cancelled, confirmed -> paid | cancelled
    pub fn can_transition_to(&self, next: UsageStatus) -> bool {
        matches!(
            (self, next),
            (UsageStatus::Pending, UsageStatus::Confirmed)
                | (UsageStatus::Pending, UsageStatus::Cancelled)
                | (UsageStatus::Confirmed, UsageStatus::Paid)
                | (UsageStatus::Confirmed, UsageStatus::Cancelled)
        )
    }
}

impl std::fmt::Display for UsageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One successful redemption of a referral code
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReferralUsage {
    pub id: Uuid,
    pub referral_id: Uuid,
    pub referrer_id: i32,
    pub referee_id: i32,
    pub order_id: Uuid,
    pub discount_amount: Decimal,
    pub reward_amount: Decimal,
    pub status: UsageStatus,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Fields for inserting a referral
#[derive(Debug, Clone)]
pub struct NewReferral {
    pub user_id: i32,
    pub code: String,
    pub usage_limit: Option<i32>,
    pub expires_at: Option<DateTime<Utc>>,
    pub reward: RewardRule,
    pub referrer_reward: ReferrerReward,
    pub minimum_order_value: Decimal,
    pub description: Option<String>,
    pub created_by: i32,
}

/// Request DTO for POST /api/referrals
#[derive(Debug, Default, Deserialize, Validate)]
pub struct CreateOwnReferralRequest {
    /// Optional human-chosen base for the code
    #[validate(length(max = 64, message = "Code base must not exceed 64 characters"))]
    pub base: Option<String>,
}

/// Request DTO for POST /api/admin/referrals
#[derive(Debug, Deserialize, Validate)]
pub struct CreateReferralRequest {
    /// Owner of the code
    pub user_id: i32,
    /// Exact code to use; generated when absent
    #[validate(custom = "validate_referral_code")]
    pub code: Option<String>,
    pub reward: Option<RewardRule>,
    pub referrer_reward: Option<ReferrerReward>,
    #[validate(custom = "validate_non_negative_amount")]
    pub minimum_order_value: Option<Decimal>,
    #[validate(range(min = 1, message = "Usage limit must be at least 1"))]
    pub usage_limit: Option<i32>,
    pub expires_at: Option<DateTime<Utc>>,
    #[validate(length(max = 500, message = "Description must not exceed 500 characters"))]
    pub description: Option<String>,
}

/// Request DTO for PUT /api/admin/referrals/{id}
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateReferralRequest {
    pub is_active: Option<bool>,
    #[validate(range(min = 1, message = "Usage limit must be at least 1"))]
    pub usage_limit: Option<i32>,
    pub expires_at: Option<DateTime<Utc>>,
    #[validate(length(max = 500, message = "Description must not exceed 500 characters"))]
    pub description: Option<String>,
}

/// Request DTO for POST /api/referrals/validate
#[derive(Debug, Deserialize, Validate)]
pub struct ValidateReferralRequest {
    #[validate(custom = "validate_referral_code")]
    pub code: String,
    #[validate(custom = "validate_non_negative_amount")]
    pub order_value: Decimal,
}

/// Request DTO for PUT /api/admin/referral-usages/{id}
#[derive(Debug, Deserialize)]
pub struct UpdateUsageStatusRequest {
    pub status: UsageStatus,
}

/// Outcome of a successful speculative validation
#[derive(Debug, Clone)]
pub struct ReferralQuote {
    pub referral: Referral,
    pub discount: Decimal,
}

/// Response DTO for a validation call
#[derive(Debug, Serialize)]
pub struct ReferralQuoteResponse {
    pub code: String,
    pub discount_amount: Decimal,
    pub reward: RewardRule,
    pub minimum_order_value: Decimal,
}

impl From<ReferralQuote> for ReferralQuoteResponse {
    fn from(quote: ReferralQuote) -> Self {
        Self {
            code: quote.referral.code,
            discount_amount: quote.discount,
            reward: quote.referral.reward.0,
            minimum_order_value: quote.referral.minimum_order_value,
        }
    }
}

/// Usage totals for a referrer
#[derive(Debug, Clone, Default, Serialize, FromRow)]
pub struct ReferralStats {
    pub total_uses: i64,
    pub total_rewards: Decimal,
    pub pending_rewards: Decimal,
}

/// Response DTO for GET /api/referrals
#[derive(Debug, Serialize)]
pub struct MyReferralsResponse {
    pub referrals: Vec<Referral>,
    pub stats: ReferralStats,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    pub(crate) fn sample_referral() -> Referral {
        Referral {
            id: Uuid::new_v4(),
            user_id: 1,
            code: "TOKRI10".to_string(),
            is_active: true,
            usage_limit: None,
            usage_count: 0,
            expires_at: None,
            reward: Json(RewardRule::Fixed { value: dec!(100) }),
            referrer_reward: Json(ReferrerReward::Fixed { value: dec!(50) }),
            minimum_order_value: dec!(0),
            description: None,
            created_by: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_reward_rule_json_shape() {
        let rule: RewardRule =
            serde_json::from_str(r#"{"type":"percentage","value":"10","max_amount":"500"}"#).unwrap();
        assert_eq!(
            rule,
            RewardRule::Percentage { value: dec!(10), max_amount: Some(dec!(500)) }
        );

        let json = serde_json::to_value(RewardRule::Points { value: dec!(200) }).unwrap();
        assert_eq!(json["type"], "points");
    }

    #[test]
    fn test_reward_rule_missing_type_rejected() {
        let parsed: Result<RewardRule, _> = serde_json::from_str(r#"{"value":"10"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_reward_terms_validation() {
        assert!(RewardRule::Percentage { value: dec!(10), max_amount: None }.validate_terms().is_ok());
        assert!(RewardRule::Percentage { value: dec!(150), max_amount: None }.validate_terms().is_err());
        assert!(RewardRule::Percentage { value: dec!(10), max_amount: Some(dec!(0)) }
            .validate_terms()
            .is_err());
        assert!(RewardRule::Fixed { value: dec!(0) }.validate_terms().is_err());
        assert!(ReferrerReward::Points { value: dec!(100) }.validate_terms().is_ok());
        assert!(ReferrerReward::Percentage { value: dec!(0) }.validate_terms().is_err());
    }

    #[test]
    fn test_validity_rules() {
        let now = Utc::now();
        let mut referral = sample_referral();
        assert!(!referral.is_expired(now));
        assert!(!referral.is_exhausted());

        referral.expires_at = Some(now - Duration::minutes(1));
        assert!(referral.is_expired(now));

        referral.expires_at = Some(now + Duration::days(1));
        referral.usage_limit = Some(2);
        referral.usage_count = 2;
        assert!(referral.is_exhausted());

        referral.usage_count = 1;
        assert!(!referral.is_exhausted());
    }

    #[test]
    fn test_usage_status_transitions() {
        assert!(UsageStatus::Pending.can_transition_to(UsageStatus::Confirmed));
        assert!(UsageStatus::Confirmed.can_transition_to(UsageStatus::Paid));
        assert!(UsageStatus::Pending.can_transition_to(UsageStatus::Cancelled));
        assert!(!UsageStatus::Pending.can_transition_to(UsageStatus::Paid));
        assert!(!UsageStatus::Paid.can_transition_to(UsageStatus::Cancelled));
        assert!(!UsageStatus::Cancelled.can_transition_to(UsageStatus::Pending));
    }
}
