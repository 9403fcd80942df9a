//! Order lifecycle: status state machine, totals, and stock effects.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Error;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        }
    }

    pub fn parse(value: &str) -> Result<Self, Error> {
        match value {
            "pending" => Ok(OrderStatus::Pending),
            "confirmed" => Ok(OrderStatus::Confirmed),
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            "refunded" => Ok(OrderStatus::Refunded),
            other => Err(Error::Validation(format!("unknown order status: {other}"))),
        }
    }

    /// The §4.3 state machine. Transitioning to the current status is not
    /// listed, so redundant transitions are rejected rather than silently
    /// accepted.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, Processing)
                | (Confirmed, Cancelled)
                | (Processing, Shipped)
                | (Shipped, Delivered)
                | (Delivered, Refunded)
        )
    }

    pub fn can_be_cancelled(self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Confirmed)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Cancelled | OrderStatus::Refunded)
    }

    /// Column holding the milestone timestamp recorded when this status is
    /// entered, if any.
    pub fn milestone_column(self) -> Option<&'static str> {
        match self {
            OrderStatus::Confirmed => Some("confirmed_at"),
            OrderStatus::Shipped => Some("shipped_at"),
            OrderStatus::Delivered => Some("delivered_at"),
            _ => None,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn parse(value: &str) -> Result<Self, Error> {
        match value {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            "failed" => Ok(PaymentStatus::Failed),
            "refunded" => Ok(PaymentStatus::Refunded),
            other => Err(Error::Validation(format!("unknown payment status: {other}"))),
        }
    }
}

/// Validate a requested transition, returning the effect it has on the
/// stock ledger.
pub fn validate_transition(from: OrderStatus, to: OrderStatus) -> Result<StockEffect, Error> {
    if !from.can_transition_to(to) {
        return Err(Error::InvalidTransition { from, to });
    }
    Ok(match to {
        // Cancellation returns reserved units to availability.
        OrderStatus::Cancelled => StockEffect::Release,
        // Delivery is the only point where on-hand stock is depleted.
        OrderStatus::Delivered => StockEffect::Consume,
        _ => StockEffect::None,
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StockEffect {
    None,
    Release,
    Consume,
}

/// Monetary breakdown of an order. All components are non-negative and
/// `total = subtotal - discount + shipping + tax`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub shipping_cost: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
}

impl OrderTotals {
    pub fn compute(
        subtotal: Decimal,
        discount_amount: Decimal,
        shipping_cost: Decimal,
        tax_amount: Decimal,
    ) -> Result<Self, Error> {
        for (name, value) in [
            ("subtotal", subtotal),
            ("discount_amount", discount_amount),
            ("shipping_cost", shipping_cost),
            ("tax_amount", tax_amount),
        ] {
            if value.is_sign_negative() {
                return Err(Error::Validation(format!("{name} must be non-negative")));
            }
        }
        if discount_amount > subtotal {
            return Err(Error::Validation(
                "discount_amount cannot exceed subtotal".into(),
            ));
        }
        Ok(Self {
            subtotal,
            discount_amount,
            shipping_cost,
            tax_amount,
            total_amount: subtotal - discount_amount + shipping_cost + tax_amount,
        })
    }
}

/// Shipping and tax are supplied by an external calculator; business rules
/// for them are out of scope here. The flat default charges nothing.
pub trait ChargeCalculator: Send + Sync {
    fn shipping_cost(&self, subtotal: Decimal) -> Decimal;
    fn tax_amount(&self, subtotal: Decimal) -> Decimal;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct FlatCharges;

impl ChargeCalculator for FlatCharges {
    fn shipping_cost(&self, _subtotal: Decimal) -> Decimal {
        Decimal::ZERO
    }

    fn tax_amount(&self, _subtotal: Decimal) -> Decimal {
        Decimal::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn happy_path_transitions() {
        use OrderStatus::*;
        let path = [Pending, Confirmed, Processing, Shipped, Delivered, Refunded];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn cancellation_allowed_only_before_processing() {
        use OrderStatus::*;
        assert!(Pending.can_be_cancelled());
        assert!(Confirmed.can_be_cancelled());
        for s in [Processing, Shipped, Delivered, Cancelled, Refunded] {
            assert!(!s.can_be_cancelled());
            assert!(!s.can_transition_to(Cancelled));
        }
    }

    #[test]
    fn redundant_transition_rejected() {
        let err = validate_transition(OrderStatus::Confirmed, OrderStatus::Confirmed).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidTransition {
                from: OrderStatus::Confirmed,
                to: OrderStatus::Confirmed
            }
        ));
    }

    #[test]
    fn skipping_states_rejected() {
        assert!(validate_transition(OrderStatus::Pending, OrderStatus::Shipped).is_err());
        assert!(validate_transition(OrderStatus::Cancelled, OrderStatus::Pending).is_err());
    }

    #[test]
    fn stock_effects() {
        assert_eq!(
            validate_transition(OrderStatus::Confirmed, OrderStatus::Cancelled).unwrap(),
            StockEffect::Release
        );
        assert_eq!(
            validate_transition(OrderStatus::Shipped, OrderStatus::Delivered).unwrap(),
            StockEffect::Consume
        );
        assert_eq!(
            validate_transition(OrderStatus::Pending, OrderStatus::Confirmed).unwrap(),
            StockEffect::None
        );
    }

    #[test]
    fn totals_formula() {
        let t = OrderTotals::compute(dec!(100.00), dec!(10.00), dec!(5.50), dec!(8.25)).unwrap();
        assert_eq!(t.total_amount, dec!(103.75));
    }

    #[test]
    fn totals_reject_negative_components() {
        assert!(OrderTotals::compute(dec!(10), dec!(-1), dec!(0), dec!(0)).is_err());
    }

    #[test]
    fn totals_reject_discount_above_subtotal() {
        assert!(OrderTotals::compute(dec!(10), dec!(15), dec!(0), dec!(0)).is_err());
    }

    #[test]
    fn status_round_trips_through_text() {
        use OrderStatus::*;
        for s in [Pending, Confirmed, Processing, Shipped, Delivered, Cancelled, Refunded] {
            assert_eq!(OrderStatus::parse(s.as_str()).unwrap(), s);
        }
    }
}
