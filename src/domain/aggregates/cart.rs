//! Cart totals and merge rules.
//!
//! The cart itself is a set of database rows; this module holds the pure
//! computations over an explicitly loaded line collection. Line subtotals
//! use the product's current price, never a snapshot, so totals are
//! recomputed on every read.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::Error;

#[derive(Clone, Copy, Debug)]
pub struct CartLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl CartLine {
    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

#[derive(Clone, Debug, Default)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new(lines: Vec<CartLine>) -> Self {
        Self { lines }
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn total_items(&self) -> i64 {
        self.lines.iter().map(|l| i64::from(l.quantity)).sum()
    }

    pub fn total_amount(&self) -> Decimal {
        self.lines.iter().map(|l| l.subtotal()).sum()
    }
}

/// Quantity must be at least 1 both on add and on update.
pub fn validate_quantity(quantity: i32) -> Result<(), Error> {
    if quantity < 1 {
        return Err(Error::Validation("quantity must be at least 1".into()));
    }
    Ok(())
}

/// Duplicate adds merge by incrementing the existing quantity rather than
/// replacing it.
pub fn merged_quantity(existing: Option<i32>, added: i32) -> Result<i32, Error> {
    validate_quantity(added)?;
    Ok(existing.unwrap_or(0) + added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn duplicate_add_merges_quantities() {
        let first = merged_quantity(None, 2).unwrap();
        assert_eq!(first, 2);
        let merged = merged_quantity(Some(first), 3).unwrap();
        assert_eq!(merged, 5);

        let cart = Cart::new(vec![CartLine {
            product_id: Uuid::new_v4(),
            quantity: merged,
            unit_price: dec!(4.99),
        }]);
        assert_eq!(cart.total_items(), 5);
        assert_eq!(cart.total_amount(), dec!(24.95));
    }

    #[test]
    fn zero_quantity_rejected() {
        assert!(merged_quantity(Some(2), 0).is_err());
        assert!(validate_quantity(-1).is_err());
    }

    #[test]
    fn totals_over_multiple_lines() {
        let cart = Cart::new(vec![
            CartLine {
                product_id: Uuid::new_v4(),
                quantity: 2,
                unit_price: dec!(3.50),
            },
            CartLine {
                product_id: Uuid::new_v4(),
                quantity: 1,
                unit_price: dec!(12.00),
            },
        ]);
        assert_eq!(cart.total_items(), 3);
        assert_eq!(cart.total_amount(), dec!(19.00));
    }

    #[test]
    fn empty_cart_totals_are_zero() {
        let cart = Cart::default();
        assert!(cart.is_empty());
        assert_eq!(cart.total_items(), 0);
        assert_eq!(cart.total_amount(), Decimal::ZERO);
    }
}
