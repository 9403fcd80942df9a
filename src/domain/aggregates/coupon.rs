//! Coupon validation and discount computation.
//!
//! Checks run in a fixed order and fail fast: the first violated rule is
//! the rejection reason. Redemption (`used_count` increment) happens inside
//! the checkout transaction, not here.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    Percentage,
    Fixed,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountType::Percentage => "percentage",
            DiscountType::Fixed => "fixed",
        }
    }

    pub fn parse(value: &str) -> Result<Self, Error> {
        match value {
            "percentage" => Ok(DiscountType::Percentage),
            "fixed" => Ok(DiscountType::Fixed),
            other => Err(Error::Validation(format!("unknown discount type: {other}"))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Coupon {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub minimum_amount: Decimal,
    /// None means unlimited redemptions.
    pub maximum_uses: Option<i32>,
    pub used_count: i32,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    pub is_active: bool,
    /// Empty lists mean the coupon applies to any product.
    pub applicable_product_ids: Vec<Uuid>,
    pub applicable_category_ids: Vec<Uuid>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CouponRejection {
    Inactive,
    NotYetValid,
    Expired,
    UsageLimitReached,
    MinimumAmountNotMet { minimum: Decimal },
    NotApplicable,
}

impl fmt::Display for CouponRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CouponRejection::Inactive => write!(f, "coupon is not active"),
            CouponRejection::NotYetValid => write!(f, "coupon is not valid yet"),
            CouponRejection::Expired => write!(f, "coupon has expired"),
            CouponRejection::UsageLimitReached => write!(f, "coupon usage limit reached"),
            CouponRejection::MinimumAmountNotMet { minimum } => {
                write!(f, "order amount below coupon minimum of {minimum}")
            }
            CouponRejection::NotApplicable => {
                write!(f, "coupon does not apply to any item in the order")
            }
        }
    }
}

impl std::error::Error for CouponRejection {}

/// One order line as the evaluator sees it: which product, which category.
#[derive(Clone, Copy, Debug)]
pub struct LineRef {
    pub product_id: Uuid,
    pub category_id: Uuid,
}

impl Coupon {
    /// Unconditional validity: active, inside the window, under the cap.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.valid_from <= now
            && now <= self.valid_to
            && self.maximum_uses.map_or(true, |max| self.used_count < max)
    }

    pub fn validate(
        &self,
        now: DateTime<Utc>,
        order_amount: Decimal,
        lines: &[LineRef],
    ) -> Result<(), CouponRejection> {
        if !self.is_active {
            return Err(CouponRejection::Inactive);
        }
        if now < self.valid_from {
            return Err(CouponRejection::NotYetValid);
        }
        if now > self.valid_to {
            return Err(CouponRejection::Expired);
        }
        if let Some(max) = self.maximum_uses {
            if self.used_count >= max {
                return Err(CouponRejection::UsageLimitReached);
            }
        }
        if order_amount < self.minimum_amount {
            return Err(CouponRejection::MinimumAmountNotMet {
                minimum: self.minimum_amount,
            });
        }
        if !self.applicable_product_ids.is_empty() || !self.applicable_category_ids.is_empty() {
            let applies = lines.iter().any(|line| {
                self.applicable_product_ids.contains(&line.product_id)
                    || self.applicable_category_ids.contains(&line.category_id)
            });
            if !applies {
                return Err(CouponRejection::NotApplicable);
            }
        }
        Ok(())
    }

    /// Discount against a subtotal. Never exceeds the subtotal, for either
    /// discount type.
    pub fn discount(&self, subtotal: Decimal) -> Decimal {
        let raw = match self.discount_type {
            DiscountType::Percentage => {
                (subtotal * self.discount_value / dec!(100)).round_dp(2)
            }
            DiscountType::Fixed => self.discount_value,
        };
        raw.min(subtotal).max(Decimal::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn save10(maximum_uses: Option<i32>, used_count: i32) -> Coupon {
        let now = Utc::now();
        Coupon {
            code: "SAVE10".into(),
            discount_type: DiscountType::Percentage,
            discount_value: dec!(10),
            minimum_amount: dec!(50),
            maximum_uses,
            used_count,
            valid_from: now - Duration::days(1),
            valid_to: now + Duration::days(1),
            is_active: true,
            applicable_product_ids: vec![],
            applicable_category_ids: vec![],
        }
    }

    #[test]
    fn percentage_discount() {
        let c = save10(Some(1), 0);
        assert!(c.validate(Utc::now(), dec!(100), &[]).is_ok());
        assert_eq!(c.discount(dec!(100)), dec!(10.00));
    }

    #[test]
    fn exhausted_coupon_rejected() {
        let c = save10(Some(1), 1);
        assert_eq!(
            c.validate(Utc::now(), dec!(100), &[]),
            Err(CouponRejection::UsageLimitReached)
        );
        assert!(!c.is_valid(Utc::now()));
    }

    #[test]
    fn unlimited_uses() {
        let c = save10(None, 10_000);
        assert!(c.validate(Utc::now(), dec!(100), &[]).is_ok());
    }

    #[test]
    fn minimum_amount_enforced() {
        let c = save10(None, 0);
        assert_eq!(
            c.validate(Utc::now(), dec!(49.99), &[]),
            Err(CouponRejection::MinimumAmountNotMet { minimum: dec!(50) })
        );
    }

    #[test]
    fn first_failing_check_wins() {
        // Inactive and expired and exhausted: inactive is checked first.
        let mut c = save10(Some(1), 1);
        c.is_active = false;
        c.valid_to = Utc::now() - Duration::days(2);
        assert_eq!(
            c.validate(Utc::now(), dec!(100), &[]),
            Err(CouponRejection::Inactive)
        );
    }

    #[test]
    fn window_edges() {
        let mut c = save10(None, 0);
        c.valid_from = Utc::now() + Duration::hours(1);
        assert_eq!(
            c.validate(Utc::now(), dec!(100), &[]),
            Err(CouponRejection::NotYetValid)
        );
        c.valid_from = Utc::now() - Duration::days(2);
        c.valid_to = Utc::now() - Duration::hours(1);
        assert_eq!(
            c.validate(Utc::now(), dec!(100), &[]),
            Err(CouponRejection::Expired)
        );
    }

    #[test]
    fn fixed_discount_capped_at_subtotal() {
        let mut c = save10(None, 0);
        c.discount_type = DiscountType::Fixed;
        c.discount_value = dec!(80);
        assert_eq!(c.discount(dec!(60)), dec!(60));
        assert_eq!(c.discount(dec!(100)), dec!(80));
    }

    #[test]
    fn restricted_coupon_requires_matching_line() {
        let product = Uuid::new_v4();
        let category = Uuid::new_v4();
        let mut c = save10(None, 0);
        c.applicable_product_ids = vec![product];

        let other = LineRef {
            product_id: Uuid::new_v4(),
            category_id: Uuid::new_v4(),
        };
        assert_eq!(
            c.validate(Utc::now(), dec!(100), &[other]),
            Err(CouponRejection::NotApplicable)
        );

        let matching = LineRef {
            product_id: product,
            category_id: category,
        };
        assert!(c.validate(Utc::now(), dec!(100), &[other, matching]).is_ok());
    }
}
