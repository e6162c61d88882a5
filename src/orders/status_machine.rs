use crate::orders::{OrderError, OrderStatus};

/// Service for managing order status transitions
pub struct StatusMachine;

impl StatusMachine {
    /// Statuses reachable in one step from `from`
    ///
    /// # Valid Transitions
    /// - Pending → Confirmed, Cancelled
    /// - Confirmed → Processing, Cancelled
    /// - Processing → Packed, Cancelled
    /// - Packed → Shipped, Cancelled
    /// - Shipped → Delivered
    /// - Delivered → Refunded
    /// - Cancelled → Refunded
    /// - Refunded → (terminal)
    pub fn allowed_next(from: OrderStatus) -> &'static [OrderStatus] {
        match from {
            OrderStatus::Pending => &[OrderStatus::Confirmed, OrderStatus::Cancelled],
            OrderStatus::Confirmed => &[OrderStatus::Processing, OrderStatus::Cancelled],
            OrderStatus::Processing => &[OrderStatus::Packed, OrderStatus::Cancelled],
            OrderStatus::Packed => &[OrderStatus::Shipped, OrderStatus::Cancelled],
            OrderStatus::Shipped => &[OrderStatus::Delivered],
            OrderStatus::Delivered => &[OrderStatus::Refunded],
            OrderStatus::Cancelled => &[OrderStatus::Refunded],
            OrderStatus::Refunded => &[],
        }
    }

    /// Check if a status transition is valid
    ///
    /// Same-status updates are rejected so every accepted update adds one timeline entry.
    pub fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
        Self::allowed_next(from).contains(&to)
    }

    /// Attempt to transition from one status to another
    pub fn transition(from: OrderStatus, to: OrderStatus) -> Result<OrderStatus, OrderError> {
        if Self::is_valid_transition(from, to) {
            Ok(to)
        } else {
            Err(OrderError::InvalidTransition { from, to })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let path = [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Processing,
            OrderStatus::Packed,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Refunded,
        ];
        for pair in path.windows(2) {
            assert!(
                StatusMachine::is_valid_transition(pair[0], pair[1]),
                "{} -> {} should be allowed",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_cancel_allowed_until_shipped() {
        for from in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Processing,
            OrderStatus::Packed,
        ] {
            assert!(StatusMachine::is_valid_transition(from, OrderStatus::Cancelled));
        }
        assert!(!StatusMachine::is_valid_transition(OrderStatus::Shipped, OrderStatus::Cancelled));
        assert!(!StatusMachine::is_valid_transition(OrderStatus::Delivered, OrderStatus::Cancelled));
    }

    #[test]
    fn test_cancelled_can_only_be_refunded() {
        assert!(StatusMachine::is_valid_transition(OrderStatus::Cancelled, OrderStatus::Refunded));
        assert!(!StatusMachine::is_valid_transition(OrderStatus::Cancelled, OrderStatus::Pending));
        assert!(!StatusMachine::is_valid_transition(OrderStatus::Cancelled, OrderStatus::Confirmed));
    }

    #[test]
    fn test_refunded_is_terminal() {
        assert!(StatusMachine::allowed_next(OrderStatus::Refunded).is_empty());
        for to in OrderStatus::ALL {
            assert!(!StatusMachine::is_valid_transition(OrderStatus::Refunded, to));
        }
    }

    #[test]
    fn test_no_skipping_steps() {
        assert!(!StatusMachine::is_valid_transition(OrderStatus::Pending, OrderStatus::Shipped));
        assert!(!StatusMachine::is_valid_transition(OrderStatus::Confirmed, OrderStatus::Delivered));
        assert!(!StatusMachine::is_valid_transition(OrderStatus::Pending, OrderStatus::Refunded));
    }

    #[test]
    fn test_no_going_back() {
        assert!(!StatusMachine::is_valid_transition(OrderStatus::Shipped, OrderStatus::Packed));
        assert!(!StatusMachine::is_valid_transition(OrderStatus::Delivered, OrderStatus::Pending));
    }

    #[test]
    fn test_transition_error_names_both_statuses() {
        let err = StatusMachine::transition(OrderStatus::Shipped, OrderStatus::Pending).unwrap_err();
        assert_eq!(err.to_string(), "Invalid status transition from shipped to pending");
    }
}
