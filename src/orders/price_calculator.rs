use rust_decimal::{Decimal, RoundingStrategy};

use crate::config::CheckoutConfig;

/// Money breakdown of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

/// Service for calculating order prices and totals
pub struct PriceCalculator;

impl PriceCalculator {
    /// Line total for one order item (quantity * unit_price)
    pub fn line_total(quantity: i32, unit_price: Decimal) -> Decimal {
        Decimal::from(quantity) * unit_price
    }

    /// Sum of all line totals
    pub fn calculate_subtotal(line_totals: &[Decimal]) -> Decimal {
        line_totals.iter().sum()
    }

    /// Flat fee below the free shipping threshold, free at or above it
    pub fn shipping_for(subtotal: Decimal, config: &CheckoutConfig) -> Decimal {
        if subtotal >= config.free_shipping_threshold {
            Decimal::ZERO
        } else {
            config.shipping_fee
        }
    }

    /// Tax on the subtotal, rounded to two decimal places
    pub fn tax_for(subtotal: Decimal, config: &CheckoutConfig) -> Decimal {
        (subtotal * config.tax_rate_percent / Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }

    /// total = subtotal + shipping + tax - discount
    pub fn calculate_total(line_totals: &[Decimal], shipping_cost: Decimal, tax: Decimal, discount: Decimal) -> OrderTotals {
        let subtotal = Self::calculate_subtotal(line_totals);
        OrderTotals {
            subtotal,
            shipping_cost,
            tax,
            discount,
            total: subtotal + shipping_cost + tax - discount,
        }
    }
}
