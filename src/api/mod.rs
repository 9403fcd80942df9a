//! HTTP surface: a thin translation layer from requests into domain calls
//! and sqlx queries.

pub mod cart;
pub mod coupons;
pub mod orders;
pub mod products;
pub mod stock;

use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::domain::actor::{Actor, Role};
use crate::domain::aggregates::order::ChargeCalculator;
use crate::domain::events::Notifier;
use crate::error::Error;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub notifier: Notifier,
    pub charges: Arc<dyn ChargeCalculator>,
}

/// The identity provider in front of this service authenticates the caller
/// and forwards identity and role as headers. Both must be present.
#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v).ok())
            .ok_or(Error::Forbidden("missing or invalid x-user-id header"))?;
        let role = parts
            .headers
            .get("x-user-role")
            .and_then(|v| v.to_str().ok())
            .ok_or(Error::Forbidden("missing x-user-role header"))?;
        let role = Role::parse(role)
            .map_err(|_| Error::Forbidden("unknown role in x-user-role header"))?;
        Ok(Actor { id, role })
    }
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub category: Option<Uuid>,
    pub status: Option<String>,
    pub payment_status: Option<String>,
}

impl ListParams {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> u32 {
        self.per_page.unwrap_or(20).clamp(1, 100)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page() - 1) * i64::from(self.per_page())
    }
}

#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/health",
            get(|| async { Json(serde_json::json!({"status": "healthy", "service": "organic-store"})) }),
        )
        .route("/api/v1/products", get(products::list).post(products::create))
        .route("/api/v1/products/:id", get(products::get_one).put(products::update))
        .route(
            "/api/v1/products/:id/reviews",
            get(products::list_reviews).post(products::create_review),
        )
        .route("/api/v1/categories", get(products::list_categories).post(products::create_category))
        .route("/api/v1/stock", get(stock::list))
        .route("/api/v1/stock/:product_id", get(stock::get_one))
        .route("/api/v1/stock/:product_id/restock", post(stock::restock))
        .route(
            "/api/v1/restock-subscriptions",
            get(stock::list_subscriptions).post(stock::subscribe),
        )
        .route("/api/v1/cart", get(cart::get_cart).delete(cart::clear))
        .route("/api/v1/cart/items", post(cart::add_item))
        .route(
            "/api/v1/cart/items/:id",
            axum::routing::put(cart::update_item).delete(cart::remove_item),
        )
        .route("/api/v1/coupons", get(coupons::list).post(coupons::create))
        .route("/api/v1/coupons/validate", post(coupons::validate))
        .route("/api/v1/orders", get(orders::list).post(orders::checkout))
        .route("/api/v1/orders/dashboard", get(orders::dashboard))
        .route("/api/v1/orders/:id", get(orders::get_one))
        .route("/api/v1/orders/:id/cancel", post(orders::cancel))
        .route("/api/v1/orders/:id/status", post(orders::transition))
        .route("/api/v1/orders/:id/tracking", get(orders::tracking_history))
        .route("/api/v1/orders/:id/invoice", get(orders::invoice))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
