use chrono::NaiveDate;

pub const ORDER_NUMBER_PREFIX: &str = "ORD";

/// Formats `ORD-YYYYMMDD-NNN` from a day and its 1-based sequence
///
/// Sequences past 999 keep all their digits.
pub fn format_order_number(day: NaiveDate, sequence: i32) -> String {
    format!("{}-{}-{:03}", ORDER_NUMBER_PREFIX, day.format("%Y%m%d"), sequence)
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    /// Distinct sequences on the same day give distinct numbers
    #[test]
    fn prop_sequences_are_distinct() {
        proptest!(|(a in 1i32..=100_000, b in 1i32..=100_000)| {
            prop_assume!(a != b);
            let day = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
            prop_assert_ne!(format_order_number(day, a), format_order_number(day, b));
        });
    }
}
