use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{types::Json, PgConnection, PgPool};
use uuid::Uuid;

use crate::db::BOX_COLUMNS;
use crate::models::MysteryBox;
use crate::orders::error::OrderError;
use crate::orders::{
    Address, Order, OrderItem, OrderStatus, OrderTotals, PaymentMethod, PaymentStatus, PricedItem, TimelineEntry,
    TrackingUpdate, TrackingUpdateRequest,
};

const ORDER_COLUMNS: &str = "id, order_number, user_id, subtotal, shipping_cost, tax, discount, total, status, \
    payment_method, payment_status, shipping_address, billing_address, carrier, tracking_number, tracking_url, \
    tracking_status, notes, referral_code, rewards_earned, refund_amount, refund_reason, refunded_at, version, \
    created_at, updated_at";

const ITEM_COLUMNS: &str = "id, order_id, box_id, name, unit_price, quantity, line_total, personalization";

/// Fields for inserting an order row
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: String,
    pub user_id: i32,
    pub totals: OrderTotals,
    pub payment_method: PaymentMethod,
    pub shipping_address: Address,
    pub billing_address: Address,
    pub notes: Option<String>,
    pub referral_code: Option<String>,
    pub rewards_earned: i32,
}

/// Repository for order operations
#[derive(Clone)]
pub struct OrdersRepository {
    pool: PgPool,
}

impl OrdersRepository {
    /// Create a new OrdersRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Active boxes among `ids`
    pub async fn find_active_boxes(&self, ids: &[i32]) -> Result<Vec<MysteryBox>, OrderError> {
        let boxes = sqlx::query_as::<_, MysteryBox>(&format!(
            "SELECT {} FROM boxes WHERE id = ANY($1) AND is_active = TRUE",
            BOX_COLUMNS
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(boxes)
    }

    /// Next sequence number for `day`, starting at 1
    ///
    /// The counter row is incremented atomically, so concurrent checkouts never share a number.
    pub async fn next_sequence(conn: &mut PgConnection, day: NaiveDate) -> Result<i32, OrderError> {
        let sequence: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO order_number_counters (day, last_value)
            VALUES ($1, 1)
            ON CONFLICT (day) DO UPDATE SET last_value = order_number_counters.last_value + 1
            RETURNING last_value
            "#,
        )
        .bind(day)
        .fetch_one(&mut *conn)
        .await?;

        Ok(sequence)
    }

    pub async fn insert_order(conn: &mut PgConnection, new: &NewOrder) -> Result<Order, OrderError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            r#"
            INSERT INTO orders (order_number, user_id, subtotal, shipping_cost, tax, discount, total, status,
                                payment_method, payment_status, shipping_address, billing_address, notes,
                                referral_code, rewards_earned)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(&new.order_number)
        .bind(new.user_id)
        .bind(new.totals.subtotal)
        .bind(new.totals.shipping_cost)
        .bind(new.totals.tax)
        .bind(new.totals.discount)
        .bind(new.totals.total)
        .bind(OrderStatus::Pending)
        .bind(new.payment_method)
        .bind(PaymentStatus::Pending)
        .bind(Json(&new.shipping_address))
        .bind(Json(&new.billing_address))
        .bind(&new.notes)
        .bind(&new.referral_code)
        .bind(new.rewards_earned)
        .fetch_one(&mut *conn)
        .await?;

        Ok(order)
    }

    pub async fn insert_item(conn: &mut PgConnection, order_id: Uuid, item: &PricedItem) -> Result<OrderItem, OrderError> {
        let item = sqlx::query_as::<_, OrderItem>(&format!(
            r#"
            INSERT INTO order_items (order_id, box_id, name, unit_price, quantity, line_total, personalization)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            ITEM_COLUMNS
        ))
        .bind(order_id)
        .bind(item.box_id)
        .bind(&item.name)
        .bind(item.unit_price)
        .bind(item.quantity)
        .bind(item.line_total)
        .bind(&item.personalization)
        .fetch_one(&mut *conn)
        .await?;

        Ok(item)
    }

    pub async fn insert_timeline(
        conn: &mut PgConnection,
        order_id: Uuid,
        status: OrderStatus,
        description: &str,
        updated_by: Option<i32>,
    ) -> Result<TimelineEntry, OrderError> {
        let entry = sqlx::query_as::<_, TimelineEntry>(
            r#"
            INSERT INTO order_timeline (order_id, status, description, updated_by)
            VALUES ($1, $2, $3, $4)
            RETURNING id, order_id, status, description, updated_by, created_at
            "#,
        )
        .bind(order_id)
        .bind(status)
        .bind(description)
        .bind(updated_by)
        .fetch_one(&mut *conn)
        .await?;

        Ok(entry)
    }

    /// Set the status only if the row still carries `expected_version`
    ///
    /// Returns `None` when another writer got there first.
    pub async fn compare_and_set_status(
        conn: &mut PgConnection,
        order_id: Uuid,
        expected_version: i32,
        status: OrderStatus,
    ) -> Result<Option<Order>, OrderError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            r#"
            UPDATE orders
            SET status = $2, version = version + 1, updated_at = NOW()
            WHERE id = $1 AND version = $3
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(order_id)
        .bind(status)
        .bind(expected_version)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(order)
    }

    pub async fn set_refund(
        conn: &mut PgConnection,
        order_id: Uuid,
        amount: Decimal,
        reason: &str,
    ) -> Result<Order, OrderError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            r#"
            UPDATE orders
            SET refund_amount = $2, refund_reason = $3, refunded_at = NOW(),
                payment_status = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(order_id)
        .bind(amount)
        .bind(reason)
        .bind(PaymentStatus::Refunded)
        .fetch_one(&mut *conn)
        .await?;

        Ok(order)
    }

    /// Append a carrier update and mirror it onto the order's tracking fields
    pub async fn add_tracking_update(
        &self,
        order_id: Uuid,
        update: &TrackingUpdateRequest,
    ) -> Result<Option<TrackingUpdate>, OrderError> {
        let mut tx = self.pool.begin().await?;

        let touched = sqlx::query(
            r#"
            UPDATE orders
            SET tracking_status = $2,
                carrier = COALESCE($3, carrier),
                tracking_number = COALESCE($4, tracking_number),
                tracking_url = COALESCE($5, tracking_url),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(order_id)
        .bind(&update.status)
        .bind(&update.carrier)
        .bind(&update.tracking_number)
        .bind(&update.tracking_url)
        .execute(&mut *tx)
        .await?;

        if touched.rows_affected() == 0 {
            return Ok(None);
        }

        let entry = sqlx::query_as::<_, TrackingUpdate>(
            r#"
            INSERT INTO order_tracking_updates (order_id, status, location, description)
            VALUES ($1, $2, $3, $4)
            RETURNING id, order_id, status, location, description, created_at
            "#,
        )
        .bind(order_id)
        .bind(&update.status)
        .bind(&update.location)
        .bind(&update.description)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(entry))
    }

    pub async fn find_by_id(&self, order_id: Uuid) -> Result<Option<Order>, OrderError> {
        let order = sqlx::query_as::<_, Order>(&format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS))
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(order)
    }

    pub async fn find_by_number(&self, order_number: &str) -> Result<Option<Order>, OrderError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {} FROM orders WHERE order_number = $1",
            ORDER_COLUMNS
        ))
        .bind(order_number.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    pub async fn items(&self, order_id: Uuid) -> Result<Vec<OrderItem>, OrderError> {
        let mut conn = self.pool.acquire().await?;
        Self::items_in(&mut *conn, order_id).await
    }

    pub async fn items_in(conn: &mut PgConnection, order_id: Uuid) -> Result<Vec<OrderItem>, OrderError> {
        let items = sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {} FROM order_items WHERE order_id = $1 ORDER BY id",
            ITEM_COLUMNS
        ))
        .bind(order_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(items)
    }

    /// Timeline in insertion order
    pub async fn timeline(&self, order_id: Uuid) -> Result<Vec<TimelineEntry>, OrderError> {
        let entries = sqlx::query_as::<_, TimelineEntry>(
            r#"
            SELECT id, order_id, status, description, updated_by, created_at
            FROM order_timeline
            WHERE order_id = $1
            ORDER BY id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    pub async fn tracking_updates(&self, order_id: Uuid) -> Result<Vec<TrackingUpdate>, OrderError> {
        let updates = sqlx::query_as::<_, TrackingUpdate>(
            r#"
            SELECT id, order_id, status, location, description, created_at
            FROM order_tracking_updates
            WHERE order_id = $1
            ORDER BY id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(updates)
    }

    pub async fn list_for_user(&self, user_id: i32) -> Result<Vec<Order>, OrderError> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {} FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
            ORDER_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    pub async fn list_all(
        &self,
        status: Option<OrderStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Order>, OrderError> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            r#"
            SELECT {}
            FROM orders
            WHERE ($1::TEXT IS NULL OR status = $1)
            ORDER BY created_at DESC, id
            LIMIT $2 OFFSET $3
            "#,
            ORDER_COLUMNS
        ))
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }
}
