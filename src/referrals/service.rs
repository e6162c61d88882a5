use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::referrals::{
    normalize_code, CodeGenerator, CreateReferralRequest, MyReferralsResponse, NewReferral, Referral, ReferralError,
    ReferralQuote, ReferralRepository, ReferralRules, ReferralUsage, ReferrerReward, RewardRule,
    UpdateReferralRequest, UsageStatus,
};

/// Terms applied to referrals users create for themselves
pub fn default_reward() -> RewardRule {
    RewardRule::Percentage {
        value: Decimal::from(10),
        max_amount: Some(Decimal::from(200)),
    }
}

pub fn default_referrer_reward() -> ReferrerReward {
    ReferrerReward::Fixed {
        value: Decimal::from(100),
    }
}

pub fn default_minimum_order_value() -> Decimal {
    Decimal::from(500)
}

/// Service layer for the referral engine
#[derive(Clone)]
pub struct ReferralService {
    repository: ReferralRepository,
}

impl ReferralService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: ReferralRepository::new(pool),
        }
    }

    async fn generate_code(&self, base: Option<&str>) -> Result<String, ReferralError> {
        let repository = &self.repository;
        CodeGenerator::new()
            .generate_unique(base, |candidate| async move { repository.code_exists(&candidate).await })
            .await
    }

    /// Self-service referral with the default terms; returns the existing one on repeat calls
    pub async fn create_for_user(&self, user_id: i32, base: Option<&str>) -> Result<Referral, ReferralError> {
        if let Some(existing) = self.repository.find_self_service_by_user(user_id).await? {
            tracing::debug!("User {} already has referral {}", user_id, existing.code);
            return Ok(existing);
        }

        let code = self.generate_code(base).await?;
        let referral = self
            .repository
            .insert(&NewReferral {
                user_id,
                code,
                usage_limit: None,
                expires_at: None,
                reward: default_reward(),
                referrer_reward: default_referrer_reward(),
                minimum_order_value: default_minimum_order_value(),
                description: None,
                created_by: user_id,
            })
            .await?;

        tracing::info!("User {} created referral code {}", user_id, referral.code);
        Ok(referral)
    }

    pub async fn create_by_admin(
        &self,
        admin_id: i32,
        request: CreateReferralRequest,
    ) -> Result<Referral, ReferralError> {
        request
            .validate()
            .map_err(|e| ReferralError::ValidationError(e.to_string()))?;

        let reward = request
            .reward
            .ok_or_else(|| ReferralError::ValidationError("Reward configuration is required".to_string()))?;
        reward.validate_terms().map_err(ReferralError::ValidationError)?;

        let referrer_reward = request.referrer_reward.unwrap_or_else(default_referrer_reward);
        referrer_reward.validate_terms().map_err(ReferralError::ValidationError)?;

        let code = match request.code.as_deref() {
            Some(custom) => {
                let code = normalize_code(custom);
                if self.repository.code_exists(&code).await? {
                    return Err(ReferralError::CodeTaken(code));
                }
                code
            }
            None => self.generate_code(None).await?,
        };

        let referral = self
            .repository
            .insert(&NewReferral {
                user_id: request.user_id,
                code,
                usage_limit: request.usage_limit,
                expires_at: request.expires_at,
                reward,
                referrer_reward,
                minimum_order_value: request.minimum_order_value.unwrap_or(Decimal::ZERO),
                description: request.description,
                created_by: admin_id,
            })
            .await?;

        tracing::info!("Admin {} created referral code {}", admin_id, referral.code);
        Ok(referral)
    }

    pub async fn update_by_admin(
        &self,
        id: Uuid,
        request: UpdateReferralRequest,
    ) -> Result<Referral, ReferralError> {
        request
            .validate()
            .map_err(|e| ReferralError::ValidationError(e.to_string()))?;

        let current = self.get(id).await?;
        if matches!(request.usage_limit, Some(limit) if limit < current.usage_count) {
            return Err(ReferralError::ValidationError(
                "Usage limit cannot be lower than the current usage count".to_string(),
            ));
        }

        let referral = self
            .repository
            .update(id, &request)
            .await?
            .ok_or(ReferralError::NotFound)?;

        tracing::info!("Updated referral {}", referral.code);
        Ok(referral)
    }

    /// Checks a code for a user and order value and quotes the discount
    ///
    /// Nothing is written; the usage is recorded once the order exists.
    pub async fn validate_and_apply(
        &self,
        code: &str,
        user_id: i32,
        order_value: Decimal,
    ) -> Result<ReferralQuote, ReferralError> {
        let referral = self
            .repository
            .find_active_by_code(code)
            .await?
            .ok_or(ReferralError::InvalidCode)?;

        ReferralRules::check_eligibility(&referral, user_id, order_value, Utc::now())?;

        if self.repository.usage_exists(referral.id, user_id).await? {
            return Err(ReferralError::AlreadyUsed);
        }

        let discount = ReferralRules::discount_for(&referral.reward, order_value);
        tracing::debug!("Referral {} quoted discount {} for user {}", referral.code, discount, user_id);

        Ok(ReferralQuote { referral, discount })
    }

    /// Record a redemption on an open connection, typically the checkout transaction
    pub async fn record_usage_in(
        conn: &mut PgConnection,
        referral: &Referral,
        referee_id: i32,
        order_id: Uuid,
        discount: Decimal,
    ) -> Result<ReferralUsage, ReferralError> {
        let reward = ReferralRules::referrer_reward_for(&referral.referrer_reward, discount);
        let usage = ReferralRepository::record_usage(conn, referral, referee_id, order_id, discount, reward).await?;

        tracing::info!(
            "Recorded referral usage {} for code {} (referee {}, reward {})",
            usage.id,
            referral.code,
            referee_id,
            reward
        );
        Ok(usage)
    }

    /// Cancel the usage of a cancelled order on the caller's connection and free its slot
    pub async fn cancel_usage_in(conn: &mut PgConnection, order_id: Uuid) -> Result<Option<ReferralUsage>, ReferralError> {
        let Some(usage) = ReferralRepository::cancel_usage_for_order(&mut *conn, order_id).await? else {
            return Ok(None);
        };
        ReferralRepository::release_usage(&mut *conn, usage.referral_id).await?;

        tracing::info!("Cancelled referral usage {} for order {}", usage.id, order_id);
        Ok(Some(usage))
    }

    /// Record a redemption in its own transaction
    pub async fn record_usage(
        &self,
        referral: &Referral,
        referee_id: i32,
        order_id: Uuid,
        discount: Decimal,
    ) -> Result<ReferralUsage, ReferralError> {
        let mut tx = self.repository.pool().begin().await?;
        let usage = Self::record_usage_in(&mut *tx, referral, referee_id, order_id, discount).await?;
        tx.commit().await?;
        Ok(usage)
    }

    pub async fn update_usage_status(&self, usage_id: Uuid, status: UsageStatus) -> Result<ReferralUsage, ReferralError> {
        let usage = self
            .repository
            .find_usage(usage_id)
            .await?
            .ok_or(ReferralError::UsageNotFound)?;

        if !usage.status.can_transition_to(status) {
            return Err(ReferralError::InvalidStatusTransition {
                from: usage.status,
                to: status,
            });
        }

        let mut tx = self.repository.pool().begin().await?;

        // Another admin may have moved it since the read
        let updated = ReferralRepository::update_usage_status(&mut *tx, usage_id, usage.status, status)
            .await?
            .ok_or(ReferralError::InvalidStatusTransition {
                from: usage.status,
                to: status,
            })?;

        if status == UsageStatus::Cancelled {
            ReferralRepository::release_usage(&mut *tx, updated.referral_id).await?;
        }

        tx.commit().await?;

        tracing::info!("Referral usage {} moved from {} to {}", usage_id, usage.status, status);
        Ok(updated)
    }

    pub async fn list_user_referrals(&self, user_id: i32) -> Result<MyReferralsResponse, ReferralError> {
        let referrals = self.repository.list_by_user(user_id).await?;
        let stats = self.repository.usage_stats(user_id).await?;
        Ok(MyReferralsResponse { referrals, stats })
    }

    pub async fn list_all(&self) -> Result<Vec<Referral>, ReferralError> {
        self.repository.list_all().await
    }

    pub async fn get(&self, id: Uuid) -> Result<Referral, ReferralError> {
        self.repository.find_by_id(id).await?.ok_or(ReferralError::NotFound)
    }

    pub async fn list_usages(&self, referral_id: Uuid) -> Result<Vec<ReferralUsage>, ReferralError> {
        self.get(referral_id).await?;
        self.repository.list_usages(referral_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_terms() {
        assert_eq!(
            default_reward(),
            RewardRule::Percentage { value: dec!(10), max_amount: Some(dec!(200)) }
        );
        assert_eq!(default_referrer_reward(), ReferrerReward::Fixed { value: dec!(100) });
        assert_eq!(default_minimum_order_value(), dec!(500));
        assert!(default_reward().validate_terms().is_ok());
    }

    #[test]
    fn test_default_terms_cap_discount() {
        assert_eq!(ReferralRules::discount_for(&default_reward(), dec!(5000)), dec!(200));
        assert_eq!(ReferralRules::discount_for(&default_reward(), dec!(800)), dec!(80));
    }
}

#[cfg(test)]
mod db_tests {
    use super::*;
    use rust_decimal_macros::dec;

    async fn admin_referral(service: &ReferralService, code: &str, usage_limit: Option<i32>) -> Referral {
        service
            .create_by_admin(
                1,
                CreateReferralRequest {
                    user_id: 100,
                    code: Some(code.to_string()),
                    reward: Some(RewardRule::Fixed { value: dec!(50) }),
                    referrer_reward: None,
                    minimum_order_value: None,
                    usage_limit,
                    expires_at: None,
                    description: None,
                },
            )
            .await
            .unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_code_lookup_ignores_case(pool: PgPool) {
        let service = ReferralService::new(pool);
        let referral = admin_referral(&service, "Diwali50", None).await;
        assert_eq!(referral.code, "DIWALI50");

        for code in ["diwali50", "DIWALI50", "DiWaLi50"] {
            let quote = service.validate_and_apply(code, 7, dec!(1000)).await.unwrap();
            assert_eq!(quote.referral.id, referral.id);
            assert_eq!(quote.discount, dec!(50));
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_second_usage_by_same_referee_rejected(pool: PgPool) {
        let service = ReferralService::new(pool);
        let referral = admin_referral(&service, "HOLI2024", None).await;

        service.record_usage(&referral, 7, Uuid::new_v4(), dec!(50)).await.unwrap();

        let again = service.record_usage(&referral, 7, Uuid::new_v4(), dec!(50)).await;
        assert!(matches!(again, Err(ReferralError::AlreadyUsed)));
        assert!(matches!(
            service.validate_and_apply("HOLI2024", 7, dec!(1000)).await,
            Err(ReferralError::AlreadyUsed)
        ));

        // The failed insert rolled back its counter increment
        assert_eq!(service.get(referral.id).await.unwrap().usage_count, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_usage_limit_enforced(pool: PgPool) {
        let service = ReferralService::new(pool);
        let referral = admin_referral(&service, "ONLYONCE", Some(1)).await;

        service.record_usage(&referral, 7, Uuid::new_v4(), dec!(50)).await.unwrap();

        assert!(matches!(
            service.validate_and_apply("ONLYONCE", 8, dec!(1000)).await,
            Err(ReferralError::LimitExceeded)
        ));
        // A quote taken before the limit was reached cannot slip past it
        assert!(matches!(
            service.record_usage(&referral, 8, Uuid::new_v4(), dec!(50)).await,
            Err(ReferralError::LimitExceeded)
        ));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_cancelled_order_frees_usage_slot(pool: PgPool) {
        let service = ReferralService::new(pool.clone());
        let referral = admin_referral(&service, "GIFTBOX1", Some(1)).await;
        let order_id = Uuid::new_v4();
        service.record_usage(&referral, 7, order_id, dec!(50)).await.unwrap();

        let mut tx = pool.begin().await.unwrap();
        let cancelled = ReferralService::cancel_usage_in(&mut *tx, order_id).await.unwrap().unwrap();
        tx.commit().await.unwrap();

        assert_eq!(cancelled.status, UsageStatus::Cancelled);
        assert_eq!(service.get(referral.id).await.unwrap().usage_count, 0);
        assert!(service.validate_and_apply("GIFTBOX1", 8, dec!(1000)).await.is_ok());

        // Nothing left to cancel the second time
        let mut tx = pool.begin().await.unwrap();
        assert!(ReferralService::cancel_usage_in(&mut *tx, order_id).await.unwrap().is_none());
        tx.commit().await.unwrap();
        assert_eq!(service.get(referral.id).await.unwrap().usage_count, 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_admin_cancel_releases_usage(pool: PgPool) {
        let service = ReferralService::new(pool);
        let referral = admin_referral(&service, "RAKHI100", Some(2)).await;
        let usage = service.record_usage(&referral, 7, Uuid::new_v4(), dec!(50)).await.unwrap();

        let confirmed = service.update_usage_status(usage.id, UsageStatus::Confirmed).await.unwrap();
        assert!(confirmed.confirmed_at.is_some());

        service.update_usage_status(usage.id, UsageStatus::Cancelled).await.unwrap();
        assert_eq!(service.get(referral.id).await.unwrap().usage_count, 0);

        assert!(matches!(
            service.update_usage_status(usage.id, UsageStatus::Paid).await,
            Err(ReferralError::InvalidStatusTransition { .. })
        ));
    }
}
