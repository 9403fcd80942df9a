//! Stock ledger.
//!
//! Tracks on-hand versus reserved quantity for one product. A reservation
//! reduces availability without reducing physical quantity; stock is only
//! permanently depleted when an order is delivered. Invariant maintained
//! throughout: `0 <= reserved <= quantity`.

use uuid::Uuid;

use crate::error::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StockLevel {
    pub product_id: Uuid,
    pub quantity: i32,
    pub reserved: i32,
}

impl StockLevel {
    pub fn new(product_id: Uuid, quantity: i32, reserved: i32) -> Self {
        debug_assert!(reserved >= 0 && reserved <= quantity);
        Self {
            product_id,
            quantity,
            reserved,
        }
    }

    pub fn available(&self) -> i32 {
        self.quantity - self.reserved
    }

    pub fn is_low_stock(&self, reorder_level: i32) -> bool {
        self.available() <= reorder_level
    }

    /// Claim `qty` units against availability. The caller is responsible
    /// for holding the row lock that makes check-then-reserve atomic.
    pub fn reserve(&mut self, qty: i32) -> Result<(), Error> {
        if qty < 1 {
            return Err(Error::Validation("quantity must be at least 1".into()));
        }
        if qty > self.available() {
            return Err(Error::InsufficientStock {
                product_id: self.product_id,
                requested: qty,
                available: self.available(),
            });
        }
        self.reserved += qty;
        Ok(())
    }

    /// Return reserved units to availability. Floored at zero; on-hand
    /// quantity is untouched.
    pub fn release(&mut self, qty: i32) {
        self.reserved = (self.reserved - qty).max(0);
    }

    /// Permanent depletion at delivery: both on-hand and reserved drop.
    pub fn consume(&mut self, qty: i32) -> Result<(), Error> {
        if qty < 1 {
            return Err(Error::Validation("quantity must be at least 1".into()));
        }
        if qty > self.reserved {
            return Err(Error::Validation(format!(
                "cannot consume {} units: only {} reserved",
                qty, self.reserved
            )));
        }
        self.quantity -= qty;
        self.reserved -= qty;
        Ok(())
    }

    /// Warehouse restock. Returns true when the restock cleared a low-stock
    /// condition, which is the trigger for restock notifications.
    pub fn restock(&mut self, qty: i32, reorder_level: i32) -> Result<bool, Error> {
        if qty < 1 {
            return Err(Error::Validation("restock quantity must be at least 1".into()));
        }
        let was_low = self.is_low_stock(reorder_level);
        self.quantity += qty;
        Ok(was_low && !self.is_low_stock(reorder_level))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stock(quantity: i32, reserved: i32) -> StockLevel {
        StockLevel::new(Uuid::new_v4(), quantity, reserved)
    }

    #[test]
    fn reserve_within_availability() {
        let mut s = stock(10, 2);
        s.reserve(5).unwrap();
        assert_eq!(s.reserved, 7);
        assert_eq!(s.available(), 3);
        assert_eq!(s.quantity, 10);
    }

    #[test]
    fn reserve_beyond_availability_fails() {
        let mut s = stock(5, 0);
        s.reserve(3).unwrap();
        let err = s.reserve(3).unwrap_err();
        assert!(matches!(err, Error::InsufficientStock { requested: 3, available: 2, .. }));
        // Failed reservation leaves the ledger untouched.
        assert_eq!(s.reserved, 3);
    }

    #[test]
    fn reserve_rejects_non_positive() {
        let mut s = stock(5, 0);
        assert!(matches!(s.reserve(0), Err(Error::Validation(_))));
    }

    #[test]
    fn release_floors_at_zero() {
        let mut s = stock(5, 2);
        s.release(10);
        assert_eq!(s.reserved, 0);
        assert_eq!(s.quantity, 5);
    }

    #[test]
    fn cancel_returns_exactly_the_reservation() {
        let mut s = stock(8, 0);
        s.reserve(3).unwrap();
        s.release(3);
        assert_eq!(s.quantity, 8);
        assert_eq!(s.reserved, 0);
        assert_eq!(s.available(), 8);
    }

    #[test]
    fn consume_depletes_both_counters() {
        let mut s = stock(10, 4);
        s.consume(4).unwrap();
        assert_eq!(s.quantity, 6);
        assert_eq!(s.reserved, 0);
    }

    #[test]
    fn consume_more_than_reserved_fails() {
        let mut s = stock(10, 2);
        assert!(s.consume(3).is_err());
        assert_eq!(s.quantity, 10);
        assert_eq!(s.reserved, 2);
    }

    #[test]
    fn reserving_can_push_stock_into_low() {
        let mut s = stock(10, 0);
        assert!(!s.is_low_stock(5));
        s.reserve(6).unwrap();
        assert!(s.is_low_stock(5));
        // Delivery consumes the reservation without moving availability,
        // so the downward crossing happens at reservation time.
        s.consume(6).unwrap();
        assert_eq!(s.available(), 4);
        assert!(s.is_low_stock(5));
    }

    #[test]
    fn restock_reports_low_stock_crossing() {
        let mut s = stock(3, 0);
        assert!(s.is_low_stock(5));
        let cleared = s.restock(10, 5).unwrap();
        assert!(cleared);
        assert_eq!(s.quantity, 13);
        // A second restock while already healthy does not re-trigger.
        assert!(!s.restock(5, 5).unwrap());
    }
}
