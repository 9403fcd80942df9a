//! Value objects shared across the domain.

use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

use crate::error::Error;

/// SKU (Stock Keeping Unit) value object. Trimmed and uppercased on entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Sku(String);

impl Sku {
    pub fn new(value: impl Into<String>) -> Result<Self, Error> {
        let value = value.into().trim().to_uppercase();
        if value.is_empty() {
            return Err(Error::Validation("sku must not be empty".into()));
        }
        if value.len() > 100 {
            return Err(Error::Validation("sku must be at most 100 characters".into()));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Sku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Order numbers look like `ORG20250314A1B2C3D4`: a fixed prefix, the
/// creation date, and a random hex suffix. The suffix alone is not a
/// uniqueness guarantee; callers insert under a UNIQUE constraint and
/// regenerate on collision (see the checkout path).
pub struct OrderNumber;

impl OrderNumber {
    pub const PREFIX: &'static str = "ORG";

    pub fn generate(now: DateTime<Utc>) -> String {
        let suffix = &Uuid::new_v4().simple().to_string()[..8];
        format!("{}{}{}", Self::PREFIX, now.format("%Y%m%d"), suffix.to_uppercase())
    }
}

/// Invoice numbers: `INV` + date + 6 random hex chars, same collision
/// policy as order numbers.
pub struct InvoiceNumber;

impl InvoiceNumber {
    pub const PREFIX: &'static str = "INV";

    pub fn generate(now: DateTime<Utc>) -> String {
        let suffix = &Uuid::new_v4().simple().to_string()[..6];
        format!("{}{}{}", Self::PREFIX, now.format("%Y%m%d"), suffix.to_uppercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn sku_normalizes() {
        let sku = Sku::new("  org-carrot-1kg ").unwrap();
        assert_eq!(sku.as_str(), "ORG-CARROT-1KG");
    }

    #[test]
    fn sku_rejects_empty() {
        assert!(Sku::new("   ").is_err());
    }

    #[test]
    fn order_number_shape() {
        let now = "2025-03-14T12:00:00Z".parse().unwrap();
        let n = OrderNumber::generate(now);
        assert!(n.starts_with("ORG20250314"));
        assert_eq!(n.len(), 3 + 8 + 8);
    }

    #[test]
    fn order_numbers_unique_over_many_draws() {
        let now = Utc::now();
        let numbers: HashSet<String> = (0..10_000).map(|_| OrderNumber::generate(now)).collect();
        assert_eq!(numbers.len(), 10_000);
    }

    #[test]
    fn invoice_numbers_unique_over_many_draws() {
        let now = Utc::now();
        let numbers: HashSet<String> = (0..10_000).map(|_| InvoiceNumber::generate(now)).collect();
        assert_eq!(numbers.len(), 10_000);
    }
}
