use rust_decimal::Decimal;
use sqlx::{types::Json, PgConnection, PgPool};
use uuid::Uuid;

use crate::referrals::{
    NewReferral, Referral, ReferralError, ReferralStats, ReferralUsage, UpdateReferralRequest, UsageStatus,
};

const REFERRAL_COLUMNS: &str = "id, user_id, code, is_active, usage_limit, usage_count, expires_at, reward, \
    referrer_reward, minimum_order_value, description, created_by, created_at, updated_at";

const USAGE_COLUMNS: &str = "id, referral_id, referrer_id, referee_id, order_id, discount_amount, reward_amount, \
    status, confirmed_at, paid_at, created_at";

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

/// Repository for referral codes and their usages
#[derive(Clone)]
pub struct ReferralRepository {
    pool: PgPool,
}

impl ReferralRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Whether a code is already stored, compared in normalized form
    pub async fn code_exists(&self, code: &str) -> Result<bool, ReferralError> {
        let exists: Option<bool> = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM referrals WHERE code = UPPER($1))")
            .bind(code)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists.unwrap_or(false))
    }

    pub async fn insert(&self, new: &NewReferral) -> Result<Referral, ReferralError> {
        let result = sqlx::query_as::<_, Referral>(&format!(
            r#"
            INSERT INTO referrals (user_id, code, usage_limit, expires_at, reward, referrer_reward,
                                   minimum_order_value, description, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            REFERRAL_COLUMNS
        ))
        .bind(new.user_id)
        .bind(&new.code)
        .bind(new.usage_limit)
        .bind(new.expires_at)
        .bind(Json(new.reward))
        .bind(Json(new.referrer_reward))
        .bind(new.minimum_order_value)
        .bind(&new.description)
        .bind(new.created_by)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(referral) => Ok(referral),
            Err(err) if is_unique_violation(&err) => Err(ReferralError::CodeTaken(new.code.clone())),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Referral>, ReferralError> {
        let referral = sqlx::query_as::<_, Referral>(&format!("SELECT {} FROM referrals WHERE id = $1", REFERRAL_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(referral)
    }

    /// Active referral by code, case-insensitive
    pub async fn find_active_by_code(&self, code: &str) -> Result<Option<Referral>, ReferralError> {
        let referral = sqlx::query_as::<_, Referral>(&format!(
            "SELECT {} FROM referrals WHERE code = UPPER($1) AND is_active = TRUE",
            REFERRAL_COLUMNS
        ))
        .bind(code.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(referral)
    }

    /// The referral a user created for themselves, if any
    pub async fn find_self_service_by_user(&self, user_id: i32) -> Result<Option<Referral>, ReferralError> {
        let referral = sqlx::query_as::<_, Referral>(&format!(
            "SELECT {} FROM referrals WHERE user_id = $1 AND created_by = $1 ORDER BY created_at LIMIT 1",
            REFERRAL_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(referral)
    }

    pub async fn list_by_user(&self, user_id: i32) -> Result<Vec<Referral>, ReferralError> {
        let referrals = sqlx::query_as::<_, Referral>(&format!(
            "SELECT {} FROM referrals WHERE user_id = $1 ORDER BY created_at DESC",
            REFERRAL_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(referrals)
    }

    pub async fn list_all(&self) -> Result<Vec<Referral>, ReferralError> {
        let referrals = sqlx::query_as::<_, Referral>(&format!(
            "SELECT {} FROM referrals ORDER BY created_at DESC",
            REFERRAL_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(referrals)
    }

    /// Apply an admin update; absent fields keep their stored values
    pub async fn update(&self, id: Uuid, changes: &UpdateReferralRequest) -> Result<Option<Referral>, ReferralError> {
        let referral = sqlx::query_as::<_, Referral>(&format!(
            r#"
            UPDATE referrals
            SET is_active = COALESCE($2, is_active),
                usage_limit = COALESCE($3, usage_limit),
                expires_at = COALESCE($4, expires_at),
                description = COALESCE($5, description),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            REFERRAL_COLUMNS
        ))
        .bind(id)
        .bind(changes.is_active)
        .bind(changes.usage_limit)
        .bind(changes.expires_at)
        .bind(&changes.description)
        .fetch_optional(&self.pool)
        .await?;

        Ok(referral)
    }

    pub async fn usage_exists(&self, referral_id: Uuid, referee_id: i32) -> Result<bool, ReferralError> {
        let exists: Option<bool> = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM referral_usages WHERE referral_id = $1 AND referee_id = $2)",
        )
        .bind(referral_id)
        .bind(referee_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists.unwrap_or(false))
    }

    /// Increment the usage counter and insert the usage row on the caller's connection
    ///
    /// The counter only moves while `usage_count < usage_limit`, so it never passes the limit
    /// under concurrent redemptions. Run inside a transaction so both writes land together.
    pub async fn record_usage(
        conn: &mut PgConnection,
        referral: &Referral,
        referee_id: i32,
        order_id: Uuid,
        discount: Decimal,
        reward: Decimal,
    ) -> Result<ReferralUsage, ReferralError> {
        let updated = sqlx::query(
            r#"
            UPDATE referrals
            SET usage_count = usage_count + 1, updated_at = NOW()
            WHERE id = $1
              AND is_active = TRUE
              AND (usage_limit IS NULL OR usage_count < usage_limit)
            "#,
        )
        .bind(referral.id)
        .execute(&mut *conn)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(ReferralError::LimitExceeded);
        }

        let result = sqlx::query_as::<_, ReferralUsage>(&format!(
            r#"
            INSERT INTO referral_usages (referral_id, referrer_id, referee_id, order_id, discount_amount, reward_amount, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            USAGE_COLUMNS
        ))
        .bind(referral.id)
        .bind(referral.user_id)
        .bind(referee_id)
        .bind(order_id)
        .bind(discount)
        .bind(reward)
        .bind(UsageStatus::Pending)
        .fetch_one(&mut *conn)
        .await;

        match result {
            Ok(usage) => Ok(usage),
            Err(err) if is_unique_violation(&err) => Err(ReferralError::AlreadyUsed),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn list_usages(&self, referral_id: Uuid) -> Result<Vec<ReferralUsage>, ReferralError> {
        let usages = sqlx::query_as::<_, ReferralUsage>(&format!(
            "SELECT {} FROM referral_usages WHERE referral_id = $1 ORDER BY created_at DESC",
            USAGE_COLUMNS
        ))
        .bind(referral_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(usages)
    }

    pub async fn find_usage(&self, id: Uuid) -> Result<Option<ReferralUsage>, ReferralError> {
        let usage = sqlx::query_as::<_, ReferralUsage>(&format!(
            "SELECT {} FROM referral_usages WHERE id = $1",
            USAGE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(usage)
    }

    /// Move a usage from `from` to `to`; `None` when the stored status no longer matches `from`
    pub async fn update_usage_status(
        conn: &mut PgConnection,
        id: Uuid,
        from: UsageStatus,
        to: UsageStatus,
    ) -> Result<Option<ReferralUsage>, ReferralError> {
        let usage = sqlx::query_as::<_, ReferralUsage>(&format!(
            r#"
            UPDATE referral_usages
            SET status = $3,
                confirmed_at = CASE WHEN $3::text = 'confirmed' THEN NOW() ELSE confirmed_at END,
                paid_at = CASE WHEN $3::text = 'paid' THEN NOW() ELSE paid_at END
            WHERE id = $1 AND status = $2
            RETURNING {}
            "#,
            USAGE_COLUMNS
        ))
        .bind(id)
        .bind(from)
        .bind(to)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(usage)
    }

    /// Cancel the open usage recorded against an order, if any
    ///
    /// Paid usages are left alone. The caller releases the code's slot.
    pub async fn cancel_usage_for_order(
        conn: &mut PgConnection,
        order_id: Uuid,
    ) -> Result<Option<ReferralUsage>, ReferralError> {
        let usage = sqlx::query_as::<_, ReferralUsage>(&format!(
            r#"
            UPDATE referral_usages
            SET status = $2
            WHERE order_id = $1 AND status IN ('pending', 'confirmed')
            RETURNING {}
            "#,
            USAGE_COLUMNS
        ))
        .bind(order_id)
        .bind(UsageStatus::Cancelled)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(usage)
    }

    /// Give one use back to a code after its usage was cancelled
    pub async fn release_usage(conn: &mut PgConnection, referral_id: Uuid) -> Result<(), ReferralError> {
        sqlx::query(
            r#"
            UPDATE referrals
            SET usage_count = GREATEST(usage_count - 1, 0), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(referral_id)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Redemption totals for a referrer; cancelled usages earn nothing
    pub async fn usage_stats(&self, referrer_id: i32) -> Result<ReferralStats, ReferralError> {
        let stats = sqlx::query_as::<_, ReferralStats>(
            r#"
            SELECT COUNT(*) AS total_uses,
                   COALESCE(SUM(reward_amount) FILTER (WHERE status <> 'cancelled'), 0) AS total_rewards,
                   COALESCE(SUM(reward_amount) FILTER (WHERE status = 'pending'), 0) AS pending_rewards
            FROM referral_usages
            WHERE referrer_id = $1
            "#,
        )
        .bind(referrer_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }
}
