use crate::inventory::AlertType;

/// Stock thresholds of a single box
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertThresholds {
    pub low_stock: i32,
    pub overstock: i32,
}

/// An alert that should be active after the reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertRaise {
    pub alert_type: AlertType,
    pub threshold: i32,
}

/// Alerts to raise (or refresh) and alerts to resolve for one stock level
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertPlan {
    pub raise: Vec<AlertRaise>,
    pub resolve: Vec<AlertType>,
}

impl AlertPlan {
    pub fn raises(&self, alert_type: AlertType) -> bool {
        self.raise.iter().any(|r| r.alert_type == alert_type)
    }

    pub fn resolves(&self, alert_type: AlertType) -> bool {
        self.resolve.contains(&alert_type)
    }
}

/// Decides which alerts a box should carry at `current_stock`
///
/// Out-of-stock and low-stock are exclusive. Overstock is judged on its own.
pub fn plan_alerts(current_stock: i32, thresholds: AlertThresholds) -> AlertPlan {
    let mut plan = AlertPlan::default();

    if current_stock <= 0 {
        plan.raise.push(AlertRaise {
            alert_type: AlertType::OutOfStock,
            threshold: 0,
        });
        plan.resolve.push(AlertType::LowStock);
    } else if current_stock <= thresholds.low_stock {
        plan.raise.push(AlertRaise {
            alert_type: AlertType::LowStock,
            threshold: thresholds.low_stock,
        });
        plan.resolve.push(AlertType::OutOfStock);
    } else {
        plan.resolve.push(AlertType::LowStock);
        plan.resolve.push(AlertType::OutOfStock);
    }

    if current_stock > thresholds.overstock {
        plan.raise.push(AlertRaise {
            alert_type: AlertType::Overstock,
            threshold: thresholds.overstock,
        });
    } else {
        plan.resolve.push(AlertType::Overstock);
    }

    plan
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    /// Every alert type is either raised or resolved, never both
    #[test]
    fn prop_plan_partitions_alert_types() {
        proptest!(|(stock in 0i32..=5000, low in 0i32..=100, over in 100i32..=3000)| {
            let plan = plan_alerts(stock, AlertThresholds { low_stock: low, overstock: over });
            for alert_type in [AlertType::LowStock, AlertType::OutOfStock, AlertType::Overstock] {
                prop_assert!(plan.raises(alert_type) != plan.resolves(alert_type));
            }
        });
    }

    /// Low-stock and out-of-stock are never raised together
    #[test]
    fn prop_out_and_low_exclusive() {
        proptest!(|(stock in 0i32..=5000, low in 0i32..=100)| {
            let plan = plan_alerts(stock, AlertThresholds { low_stock: low, overstock: 10_000 });
            prop_assert!(!(plan.raises(AlertType::LowStock) && plan.raises(AlertType::OutOfStock)));
        });
    }
}
