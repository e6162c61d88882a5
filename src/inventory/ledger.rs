use crate::inventory::{InventoryError, TransactionType};

/// Result of applying one movement to a stock level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockChange {
    pub previous_stock: i32,
    pub new_stock: i32,
    /// Quantity written to the ledger entry
    pub recorded_quantity: i32,
}

/// Stock arithmetic for ledger entries
pub struct StockLedger;

impl StockLedger {
    /// Apply a movement to `previous_stock`
    ///
    /// Restock and return add `|quantity|`, sale, damaged and expired subtract it,
    /// adjustment sets the stock to `quantity`. A negative result is rejected.
    pub fn apply(
        transaction_type: TransactionType,
        previous_stock: i32,
        quantity: i32,
    ) -> Result<StockChange, InventoryError> {
        let magnitude = i64::from(quantity).abs();
        let previous = i64::from(previous_stock);

        let new_stock = match transaction_type {
            TransactionType::Restock | TransactionType::Return => previous + magnitude,
            TransactionType::Sale | TransactionType::Damaged | TransactionType::Expired => previous - magnitude,
            TransactionType::Adjustment => i64::from(quantity),
        };

        if new_stock < 0 {
            return Err(InventoryError::InsufficientStock {
                available: previous_stock,
                requested: i32::try_from(magnitude).unwrap_or(i32::MAX),
            });
        }

        let new_stock = i32::try_from(new_stock)
            .map_err(|_| InventoryError::ValidationError("Resulting stock is too large".to_string()))?;

        let recorded_quantity = match transaction_type {
            TransactionType::Adjustment => new_stock - previous_stock,
            _ => i32::try_from(magnitude)
                .map_err(|_| InventoryError::ValidationError("Quantity is too large".to_string()))?,
        };

        Ok(StockChange {
            previous_stock,
            new_stock,
            recorded_quantity,
        })
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn movement_type() -> impl Strategy<Value = TransactionType> {
        prop_oneof![
            Just(TransactionType::Restock),
            Just(TransactionType::Return),
            Just(TransactionType::Sale),
            Just(TransactionType::Damaged),
            Just(TransactionType::Expired),
        ]
    }

    /// Inbound types add and outbound types subtract the quantity
    #[test]
    fn prop_ledger_arithmetic() {
        proptest!(|(
            tx_type in movement_type(),
            previous in 0i32..=100_000,
            quantity in 1i32..=100_000
        )| {
            let result = StockLedger::apply(tx_type, previous, quantity);
            match tx_type {
                TransactionType::Restock | TransactionType::Return => {
                    prop_assert_eq!(result.unwrap().new_stock, previous + quantity);
                }
                _ if quantity > previous => {
                    let is_insufficient = matches!(result, Err(InventoryError::InsufficientStock { .. }));
                    prop_assert!(is_insufficient);
                }
                _ => {
                    prop_assert_eq!(result.unwrap().new_stock, previous - quantity);
                }
            }
        });
    }

    /// Adjustment lands exactly on the requested stock and records the delta
    #[test]
    fn prop_adjustment_is_direct_set() {
        proptest!(|(previous in 0i32..=100_000, target in 0i32..=100_000)| {
            let change = StockLedger::apply(TransactionType::Adjustment, previous, target).unwrap();
            prop_assert_eq!(change.new_stock, target);
            prop_assert_eq!(change.previous_stock + change.recorded_quantity, target);
        });
    }

    /// An accepted movement never leaves negative stock
    #[test]
    fn prop_stock_never_negative() {
        proptest!(|(tx_type in movement_type(), previous in 0i32..=1000, quantity in -2000i32..=2000)| {
            if let Ok(change) = StockLedger::apply(tx_type, previous, quantity) {
                prop_assert!(change.new_stock >= 0);
            }
        });
    }
}
