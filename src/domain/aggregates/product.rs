//! Catalog-side rules: availability states and review aggregation.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Error;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    #[default]
    InStock,
    OutOfStock,
    PreOrder,
    Discontinued,
}

impl Availability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Availability::InStock => "in_stock",
            Availability::OutOfStock => "out_of_stock",
            Availability::PreOrder => "pre_order",
            Availability::Discontinued => "discontinued",
        }
    }

    pub fn parse(value: &str) -> Result<Self, Error> {
        match value {
            "in_stock" => Ok(Availability::InStock),
            "out_of_stock" => Ok(Availability::OutOfStock),
            "pre_order" => Ok(Availability::PreOrder),
            "discontinued" => Ok(Availability::Discontinued),
            other => Err(Error::Validation(format!("unknown availability: {other}"))),
        }
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the product may be added to a cart or ordered at all. Stock
/// levels are checked separately against the ledger.
pub fn is_orderable(is_active: bool, availability: Availability) -> bool {
    is_active && availability != Availability::Discontinued
}

/// Mean of loaded review ratings; 0.0 for an unreviewed product.
pub fn average_rating(ratings: &[i32]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    ratings.iter().map(|r| f64::from(*r)).sum::<f64>() / ratings.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discontinued_is_never_orderable() {
        assert!(!is_orderable(true, Availability::Discontinued));
        assert!(is_orderable(true, Availability::InStock));
        assert!(is_orderable(true, Availability::PreOrder));
        assert!(!is_orderable(false, Availability::InStock));
    }

    #[test]
    fn availability_round_trips() {
        use Availability::*;
        for a in [InStock, OutOfStock, PreOrder, Discontinued] {
            assert_eq!(Availability::parse(a.as_str()).unwrap(), a);
        }
        assert!(Availability::parse("backorder").is_err());
    }

    #[test]
    fn rating_average() {
        assert_eq!(average_rating(&[]), 0.0);
        assert_eq!(average_rating(&[4, 5, 3]), 4.0);
    }
}
