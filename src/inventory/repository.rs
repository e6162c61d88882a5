use sqlx::{types::Json, FromRow, PgConnection, PgPool};

use crate::inventory::{
    AlertRaise, AlertThresholds, AlertType, InventoryError, InventorySummary, InventoryTransaction, StockAlert,
    StockChange, StockMovement, TransactionFilter,
};

const TRANSACTION_COLUMNS: &str = "id, box_id, transaction_type, quantity, previous_stock, new_stock, reason, \
    reference, performed_by, unit_cost, notes, created_at";

const ALERT_COLUMNS: &str = "id, box_id, alert_type, current_stock, threshold, is_active, acknowledged_by, \
    acknowledged_at, resolved_at, created_at, updated_at";

const DEFAULT_TRANSACTION_LIMIT: i64 = 50;
const MAX_TRANSACTION_LIMIT: i64 = 500;

/// Stock level and thresholds of a locked box row
#[derive(Debug, Clone, Copy, FromRow)]
pub struct BoxStock {
    pub stock: i32,
    pub low_stock_threshold: i32,
    pub overstock_threshold: i32,
}

impl BoxStock {
    pub fn thresholds(&self) -> AlertThresholds {
        AlertThresholds {
            low_stock: self.low_stock_threshold,
            overstock: self.overstock_threshold,
        }
    }
}

/// Repository for ledger entries and stock alerts
#[derive(Clone)]
pub struct InventoryRepository {
    pool: PgPool,
}

impl InventoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Read a box's stock and hold its row lock until the transaction ends
    pub async fn lock_box(conn: &mut PgConnection, box_id: i32) -> Result<Option<BoxStock>, InventoryError> {
        let stock = sqlx::query_as::<_, BoxStock>(
            "SELECT stock, low_stock_threshold, overstock_threshold FROM boxes WHERE id = $1 FOR UPDATE",
        )
        .bind(box_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(stock)
    }

    pub async fn insert_transaction(
        conn: &mut PgConnection,
        movement: &StockMovement,
        change: &StockChange,
    ) -> Result<InventoryTransaction, InventoryError> {
        let transaction = sqlx::query_as::<_, InventoryTransaction>(&format!(
            r#"
            INSERT INTO inventory_transactions (box_id, transaction_type, quantity, previous_stock, new_stock,
                                                reason, reference, performed_by, unit_cost, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            TRANSACTION_COLUMNS
        ))
        .bind(movement.box_id)
        .bind(movement.transaction_type)
        .bind(change.recorded_quantity)
        .bind(change.previous_stock)
        .bind(change.new_stock)
        .bind(&movement.reason)
        .bind(Json(&movement.reference))
        .bind(movement.performed_by)
        .bind(movement.unit_cost)
        .bind(&movement.notes)
        .fetch_one(&mut *conn)
        .await?;

        Ok(transaction)
    }

    pub async fn set_stock(conn: &mut PgConnection, box_id: i32, stock: i32) -> Result<(), InventoryError> {
        sqlx::query("UPDATE boxes SET stock = $1, updated_at = NOW() WHERE id = $2")
            .bind(stock)
            .bind(box_id)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }

    /// Open an alert, or refresh the snapshot of the one already active
    pub async fn upsert_alert(
        conn: &mut PgConnection,
        box_id: i32,
        raise: &AlertRaise,
        current_stock: i32,
    ) -> Result<(), InventoryError> {
        sqlx::query(
            r#"
            INSERT INTO stock_alerts (box_id, alert_type, current_stock, threshold)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (box_id, alert_type) WHERE is_active
            DO UPDATE SET current_stock = EXCLUDED.current_stock,
                          threshold = EXCLUDED.threshold,
                          updated_at = NOW()
            "#,
        )
        .bind(box_id)
        .bind(raise.alert_type)
        .bind(current_stock)
        .bind(raise.threshold)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn resolve_alert(
        conn: &mut PgConnection,
        box_id: i32,
        alert_type: AlertType,
    ) -> Result<u64, InventoryError> {
        let result = sqlx::query(
            r#"
            UPDATE stock_alerts
            SET is_active = FALSE, resolved_at = NOW(), updated_at = NOW()
            WHERE box_id = $1 AND alert_type = $2 AND is_active
            "#,
        )
        .bind(box_id)
        .bind(alert_type)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn list_transactions(&self, filter: &TransactionFilter) -> Result<Vec<InventoryTransaction>, InventoryError> {
        let limit = filter
            .limit
            .unwrap_or(DEFAULT_TRANSACTION_LIMIT)
            .clamp(1, MAX_TRANSACTION_LIMIT);

        let transactions = sqlx::query_as::<_, InventoryTransaction>(&format!(
            r#"
            SELECT {}
            FROM inventory_transactions
            WHERE ($1::INTEGER IS NULL OR box_id = $1)
              AND ($2::TEXT IS NULL OR transaction_type = $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3
            "#,
            TRANSACTION_COLUMNS
        ))
        .bind(filter.box_id)
        .bind(filter.transaction_type)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(transactions)
    }

    pub async fn list_alerts(&self, active_only: bool) -> Result<Vec<StockAlert>, InventoryError> {
        let alerts = sqlx::query_as::<_, StockAlert>(&format!(
            "SELECT {} FROM stock_alerts WHERE ($1 = FALSE OR is_active) ORDER BY created_at DESC, id DESC",
            ALERT_COLUMNS
        ))
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;

        Ok(alerts)
    }

    pub async fn acknowledge_alert(&self, id: i64, admin_id: i32) -> Result<Option<StockAlert>, InventoryError> {
        let alert = sqlx::query_as::<_, StockAlert>(&format!(
            r#"
            UPDATE stock_alerts
            SET acknowledged_by = $2, acknowledged_at = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            ALERT_COLUMNS
        ))
        .bind(id)
        .bind(admin_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(alert)
    }

    pub async fn summary(&self) -> Result<InventorySummary, InventoryError> {
        let summary = sqlx::query_as::<_, InventorySummary>(
            r#"
            SELECT COUNT(*) AS total_boxes,
                   COALESCE(SUM(stock), 0)::BIGINT AS total_units,
                   COUNT(*) FILTER (WHERE stock > 0 AND stock <= low_stock_threshold) AS low_stock_count,
                   COUNT(*) FILTER (WHERE stock = 0) AS out_of_stock_count,
                   COUNT(*) FILTER (WHERE stock > overstock_threshold) AS overstock_count,
                   COALESCE(SUM(stock * price), 0) AS stock_value
            FROM boxes
            WHERE is_active = TRUE
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(summary)
    }
}
