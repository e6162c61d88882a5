use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::referrals::{Referral, ReferralError, ReferrerReward, RewardRule};

/// Round a money amount to whole currency units, half away from zero
pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Pure reward arithmetic for referral redemptions
pub struct ReferralRules;

impl ReferralRules {
    /// Checks every redemption rule that does not need the usage table
    ///
    /// Order of checks: expiry, usage limit, self referral, minimum order value.
    pub fn check_eligibility(
        referral: &Referral,
        user_id: i32,
        order_value: Decimal,
        now: DateTime<Utc>,
    ) -> Result<(), ReferralError> {
        if referral.is_expired(now) {
            return Err(ReferralError::Expired);
        }
        if referral.is_exhausted() {
            return Err(ReferralError::LimitExceeded);
        }
        if referral.user_id == user_id {
            return Err(ReferralError::SelfReferral);
        }
        if order_value < referral.minimum_order_value {
            return Err(ReferralError::BelowMinimum {
                minimum: referral.minimum_order_value,
            });
        }
        Ok(())
    }

    /// Discount granted to the referee, rounded and never above the order value
    pub fn discount_for(rule: &RewardRule, order_value: Decimal) -> Decimal {
        let order_value = order_value.max(Decimal::ZERO);
        let raw = match *rule {
            RewardRule::Percentage { value, max_amount } => {
                let discount = order_value * value / Decimal::ONE_HUNDRED;
                match max_amount {
                    Some(max) => discount.min(max),
                    None => discount,
                }
            }
            RewardRule::Fixed { value } => value.min(order_value),
            RewardRule::Points { .. } => Decimal::ZERO,
        };

        // Rounding up can push past a cap, so clamp again afterwards
        let mut discount = round_currency(raw).min(order_value);
        if let RewardRule::Percentage { max_amount: Some(max), .. } = *rule {
            discount = discount.min(max);
        }
        discount.max(Decimal::ZERO)
    }

    /// Points credited to the referee's order for a points-type rule
    pub fn points_for(rule: &RewardRule) -> Decimal {
        match *rule {
            RewardRule::Points { value } => round_currency(value),
            _ => Decimal::ZERO,
        }
    }

    /// Reward credited to the referrer for one redemption
    pub fn referrer_reward_for(reward: &ReferrerReward, discount: Decimal) -> Decimal {
        let raw = match *reward {
            ReferrerReward::Percentage { value } => discount * value / Decimal::ONE_HUNDRED,
            ReferrerReward::Fixed { value } | ReferrerReward::Points { value } => value,
        };
        round_currency(raw)
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn amount(cents: u64) -> Decimal {
        Decimal::from(cents) / Decimal::ONE_HUNDRED
    }

    /// Discount never exceeds the order value and is never negative
    #[test]
    fn prop_discount_bounded_by_order_value() {
        proptest!(|(
            order_cents in 0u64..=10_000_000,
            value_cents in 1u64..=1_000_000,
            percent in 1u32..=100,
            kind in 0u8..3
        )| {
            let order_value = amount(order_cents);
            let rule = match kind {
                0 => RewardRule::Percentage { value: Decimal::from(percent), max_amount: None },
                1 => RewardRule::Fixed { value: amount(value_cents) },
                _ => RewardRule::Points { value: amount(value_cents) },
            };
            let discount = ReferralRules::discount_for(&rule, order_value);
            prop_assert!(discount <= order_value);
            prop_assert!(discount >= Decimal::ZERO);
        });
    }

    /// A percentage discount never exceeds its configured cap
    #[test]
    fn prop_percentage_respects_cap() {
        proptest!(|(
            order_cents in 0u64..=10_000_000,
            cap_cents in 1u64..=1_000_000,
            percent in 1u32..=100
        )| {
            let cap = amount(cap_cents);
            let rule = RewardRule::Percentage { value: Decimal::from(percent), max_amount: Some(cap) };
            let discount = ReferralRules::discount_for(&rule, amount(order_cents));
            prop_assert!(discount <= cap);
        });
    }

    /// Discounts on whole-unit orders are whole currency units
    #[test]
    fn prop_discount_is_whole_units() {
        proptest!(|(order_units in 0u64..=100_000, percent in 1u32..=100)| {
            let rule = RewardRule::Percentage { value: Decimal::from(percent), max_amount: None };
            let discount = ReferralRules::discount_for(&rule, Decimal::from(order_units));
            prop_assert_eq!(discount, discount.trunc());
        });
    }
}
