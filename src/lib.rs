//! Organic Store E-commerce Backend
//!
//! Product catalog, per-customer carts, coupon-aware checkout, an order
//! lifecycle state machine with an append-only tracking log, and a stock
//! ledger separating on-hand from reserved quantity.
//!
//! Layering:
//! - [`domain`] holds the pure rules (state machine, ledger arithmetic,
//!   coupon evaluation, totals, visibility policy) with no I/O.
//! - [`api`] is the HTTP layer: axum handlers translating requests into
//!   sqlx queries and domain calls.
//!
//! Identity, payment, and notification delivery are external
//! collaborators: the caller's identity arrives as headers, events leave
//! as fire-and-forget NATS publishes.

pub mod api;
pub mod domain;
pub mod error;

pub use error::{Error, Result};
