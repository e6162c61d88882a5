use sqlx::{PgConnection, PgPool};

use crate::inventory::{
    plan_alerts, AlertThresholds, InventoryError, InventoryRepository, InventorySummary, InventoryTransaction,
    StockAlert, StockLedger, StockMovement, TransactionFilter, TransactionType,
};

/// Service layer for the inventory ledger
#[derive(Clone)]
pub struct InventoryService {
    repository: InventoryRepository,
}

impl InventoryService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: InventoryRepository::new(pool),
        }
    }

    fn check_movement(movement: &StockMovement) -> Result<(), InventoryError> {
        if movement.reason.trim().is_empty() {
            return Err(InventoryError::ValidationError("Reason is required".to_string()));
        }
        if movement.quantity == 0 && movement.transaction_type != TransactionType::Adjustment {
            return Err(InventoryError::ValidationError("Quantity must be non-zero".to_string()));
        }
        Ok(())
    }

    /// Record a movement in its own transaction
    pub async fn record_transaction(&self, movement: StockMovement) -> Result<InventoryTransaction, InventoryError> {
        let mut tx = self.repository.pool().begin().await?;
        let transaction = Self::record_transaction_in(&mut *tx, &movement).await?;
        tx.commit().await?;
        Ok(transaction)
    }

    /// Record a movement on the caller's connection
    ///
    /// The box row stays locked until the surrounding transaction ends. On error nothing
    /// has been written for this movement.
    pub async fn record_transaction_in(
        conn: &mut PgConnection,
        movement: &StockMovement,
    ) -> Result<InventoryTransaction, InventoryError> {
        Self::check_movement(movement)?;

        let stock = InventoryRepository::lock_box(&mut *conn, movement.box_id)
            .await?
            .ok_or(InventoryError::BoxNotFound(movement.box_id))?;

        let change = StockLedger::apply(movement.transaction_type, stock.stock, movement.quantity)?;

        let transaction = InventoryRepository::insert_transaction(&mut *conn, movement, &change).await?;
        InventoryRepository::set_stock(&mut *conn, movement.box_id, change.new_stock).await?;
        Self::check_stock_alerts(&mut *conn, movement.box_id, change.new_stock, stock.thresholds()).await?;

        tracing::info!(
            "Box {} {} {}: stock {} -> {}",
            movement.box_id,
            movement.transaction_type,
            change.recorded_quantity,
            change.previous_stock,
            change.new_stock
        );
        Ok(transaction)
    }

    /// Bring the box's active alerts in line with its current stock
    pub async fn check_stock_alerts(
        conn: &mut PgConnection,
        box_id: i32,
        current_stock: i32,
        thresholds: AlertThresholds,
    ) -> Result<(), InventoryError> {
        let plan = plan_alerts(current_stock, thresholds);

        for raise in &plan.raise {
            InventoryRepository::upsert_alert(&mut *conn, box_id, raise, current_stock).await?;
            tracing::warn!("Box {} has {} alert at stock {}", box_id, raise.alert_type, current_stock);
        }

        for alert_type in &plan.resolve {
            let resolved = InventoryRepository::resolve_alert(&mut *conn, box_id, *alert_type).await?;
            if resolved > 0 {
                tracing::info!("Resolved {} alert for box {}", alert_type, box_id);
            }
        }

        Ok(())
    }

    pub async fn acknowledge_alert(&self, alert_id: i64, admin_id: i32) -> Result<StockAlert, InventoryError> {
        let alert = self
            .repository
            .acknowledge_alert(alert_id, admin_id)
            .await?
            .ok_or(InventoryError::AlertNotFound)?;

        tracing::info!("Admin {} acknowledged alert {}", admin_id, alert_id);
        Ok(alert)
    }

    pub async fn list_transactions(&self, filter: &TransactionFilter) -> Result<Vec<InventoryTransaction>, InventoryError> {
        self.repository.list_transactions(filter).await
    }

    pub async fn list_alerts(&self, active_only: bool) -> Result<Vec<StockAlert>, InventoryError> {
        self.repository.list_alerts(active_only).await
    }

    pub async fn summary(&self) -> Result<InventorySummary, InventoryError> {
        self.repository.summary().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::TransactionReference;

    fn movement(transaction_type: TransactionType, quantity: i32, reason: &str) -> StockMovement {
        StockMovement {
            box_id: 1,
            transaction_type,
            quantity,
            reason: reason.to_string(),
            performed_by: 1,
            reference: TransactionReference::default(),
            unit_cost: None,
            notes: None,
        }
    }

    #[test]
    fn test_reason_required() {
        let result = InventoryService::check_movement(&movement(TransactionType::Restock, 5, "  "));
        assert!(matches!(result, Err(InventoryError::ValidationError(_))));
    }

    #[test]
    fn test_zero_quantity_only_for_adjustment() {
        assert!(InventoryService::check_movement(&movement(TransactionType::Sale, 0, "sold")).is_err());
        assert!(InventoryService::check_movement(&movement(TransactionType::Adjustment, 0, "count")).is_ok());
    }
}

#[cfg(test)]
mod db_tests {
    use super::*;
    use crate::db::{find_box, insert_test_box};
    use crate::inventory::{AlertType, TransactionReference};
    use rust_decimal_macros::dec;

    fn movement(box_id: i32, transaction_type: TransactionType, quantity: i32) -> StockMovement {
        StockMovement {
            box_id,
            transaction_type,
            quantity,
            reason: "Stock count".to_string(),
            performed_by: 1,
            reference: TransactionReference::default(),
            unit_cost: None,
            notes: None,
        }
    }

    async fn transaction_count(pool: &PgPool, box_id: i32) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM inventory_transactions WHERE box_id = $1")
            .bind(box_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_repeated_zero_stock_keeps_one_alert(pool: PgPool) {
        let box_id = insert_test_box(&pool, "Holi Colours", dec!(499), 5).await;
        let service = InventoryService::new(pool.clone());

        service.record_transaction(movement(box_id, TransactionType::Sale, 5)).await.unwrap();
        service
            .record_transaction(movement(box_id, TransactionType::Adjustment, 0))
            .await
            .unwrap();

        let active: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM stock_alerts WHERE box_id = $1 AND alert_type = 'out_of_stock' AND is_active",
        )
        .bind(box_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(active, 1);

        let alerts = service.list_alerts(true).await.unwrap();
        let out_of_stock: Vec<_> = alerts
            .iter()
            .filter(|a| a.box_id == box_id && a.alert_type == AlertType::OutOfStock)
            .collect();
        assert_eq!(out_of_stock.len(), 1);
        assert_eq!(out_of_stock[0].current_stock, 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_restock_resolves_out_of_stock_alert(pool: PgPool) {
        let box_id = insert_test_box(&pool, "Rakhi Treats", dec!(350), 2).await;
        let service = InventoryService::new(pool.clone());

        service.record_transaction(movement(box_id, TransactionType::Sale, 2)).await.unwrap();
        service
            .record_transaction(movement(box_id, TransactionType::Restock, 50))
            .await
            .unwrap();

        let alerts = service.list_alerts(true).await.unwrap();
        assert!(!alerts
            .iter()
            .any(|a| a.box_id == box_id && a.alert_type == AlertType::OutOfStock));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_oversized_sale_writes_nothing(pool: PgPool) {
        let box_id = insert_test_box(&pool, "Diwali Diyas", dec!(799), 10).await;
        let service = InventoryService::new(pool.clone());

        let result = service.record_transaction(movement(box_id, TransactionType::Sale, 15)).await;
        assert!(matches!(
            result,
            Err(InventoryError::InsufficientStock {
                available: 10,
                requested: 15
            })
        ));

        assert_eq!(transaction_count(&pool, box_id).await, 0);
        assert_eq!(find_box(&pool, box_id).await.unwrap().unwrap().stock, 10);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_sale_records_previous_and_new_stock(pool: PgPool) {
        let box_id = insert_test_box(&pool, "Eid Sweets", dec!(650), 10).await;
        let service = InventoryService::new(pool.clone());

        let transaction = service.record_transaction(movement(box_id, TransactionType::Sale, 4)).await.unwrap();
        assert_eq!(transaction.previous_stock, 10);
        assert_eq!(transaction.new_stock, 6);
        assert_eq!(find_box(&pool, box_id).await.unwrap().unwrap().stock, 6);
    }
}
