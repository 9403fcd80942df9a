//! Aggregates module
pub mod cart;
pub mod coupon;
pub mod order;
pub mod product;
pub mod stock;

pub use cart::{Cart, CartLine};
pub use coupon::{Coupon, CouponRejection, DiscountType};
pub use order::{OrderStatus, OrderTotals, PaymentStatus, StockEffect};
pub use product::Availability;
pub use stock::StockLevel;
