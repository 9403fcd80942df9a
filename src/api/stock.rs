//! Stock ledger endpoints: visibility for warehouse staff, restocking,
//! and customer restock subscriptions.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, Postgres, Transaction};
use uuid::Uuid;

use crate::api::AppState;
use crate::domain::actor::Actor;
use crate::domain::aggregates::stock::StockLevel;
use crate::domain::events::DomainEvent;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StockRow {
    pub product_id: Uuid,
    pub quantity: i32,
    pub reserved_quantity: i32,
    pub reorder_level: i32,
    pub max_stock_level: i32,
    pub updated_by: Option<Uuid>,
    pub last_updated: DateTime<Utc>,
}

impl StockRow {
    pub fn level(&self) -> StockLevel {
        StockLevel::new(self.product_id, self.quantity, self.reserved_quantity)
    }
}

/// Load a ledger row under a row lock; every mutation goes through here so
/// check-then-modify is serialized per product.
pub async fn lock_stock(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
) -> Result<StockRow> {
    sqlx::query_as::<_, StockRow>("SELECT * FROM stocks WHERE product_id = $1 FOR UPDATE")
        .bind(product_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(Error::NotFound("stock record"))
}

pub async fn store_level<'e>(
    executor: impl PgExecutor<'e>,
    level: &StockLevel,
    updated_by: Uuid,
) -> Result<()> {
    sqlx::query(
        "UPDATE stocks SET quantity = $2, reserved_quantity = $3, updated_by = $4, last_updated = NOW() \
         WHERE product_id = $1",
    )
    .bind(level.product_id)
    .bind(level.quantity)
    .bind(level.reserved)
    .bind(updated_by)
    .execute(executor)
    .await?;
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct StockView {
    #[serde(flatten)]
    pub row: StockRow,
    pub available_quantity: i32,
    pub is_low_stock: bool,
}

impl From<StockRow> for StockView {
    fn from(row: StockRow) -> Self {
        let level = row.level();
        let available_quantity = level.available();
        let is_low_stock = level.is_low_stock(row.reorder_level);
        Self {
            row,
            available_quantity,
            is_low_stock,
        }
    }
}

pub async fn list(State(s): State<AppState>, actor: Actor) -> Result<Json<Vec<StockView>>> {
    if !actor.role.can_manage_stock() {
        return Err(Error::Forbidden("stock records are restricted to warehouse staff"));
    }
    let rows = sqlx::query_as::<_, StockRow>("SELECT * FROM stocks ORDER BY last_updated DESC")
        .fetch_all(&s.db)
        .await?;
    Ok(Json(rows.into_iter().map(StockView::from).collect()))
}

pub async fn get_one(
    State(s): State<AppState>,
    actor: Actor,
    Path(product_id): Path<Uuid>,
) -> Result<Json<StockView>> {
    if !actor.role.can_manage_stock() {
        return Err(Error::Forbidden("stock records are restricted to warehouse staff"));
    }
    let row = sqlx::query_as::<_, StockRow>("SELECT * FROM stocks WHERE product_id = $1")
        .bind(product_id)
        .fetch_optional(&s.db)
        .await?
        .ok_or(Error::NotFound("stock record"))?;
    Ok(Json(StockView::from(row)))
}

#[derive(Debug, Deserialize)]
pub struct RestockRequest {
    pub quantity: i32,
}

pub async fn restock(
    State(s): State<AppState>,
    actor: Actor,
    Path(product_id): Path<Uuid>,
    Json(r): Json<RestockRequest>,
) -> Result<Json<StockView>> {
    if !actor.role.can_manage_stock() {
        return Err(Error::Forbidden("only warehouse staff may restock"));
    }

    let mut tx = s.db.begin().await?;
    let row = lock_stock(&mut tx, product_id).await?;
    let mut level = row.level();
    let cleared_low_stock = level.restock(r.quantity, row.reorder_level)?;
    store_level(&mut *tx, &level, actor.id).await?;

    let (sku,): (String,) = sqlx::query_as("SELECT sku FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_one(&mut *tx)
        .await?;

    // Subscribers waiting on this product get notified once, then the
    // subscription is marked served.
    let subscriber_ids: Vec<Uuid> = sqlx::query_as::<_, (Uuid,)>(
        "UPDATE restock_subscriptions SET notified_at = NOW() \
         WHERE product_id = $1 AND notified_at IS NULL RETURNING customer_id",
    )
    .bind(product_id)
    .fetch_all(&mut *tx)
    .await?
    .into_iter()
    .map(|(id,)| id)
    .collect();
    tx.commit().await?;

    if cleared_low_stock || !subscriber_ids.is_empty() {
        s.notifier
            .publish(&DomainEvent::Restocked {
                product_id,
                sku: sku.clone(),
                quantity_added: r.quantity,
                subscriber_ids,
            })
            .await;
    }
    tracing::info!(product_id = %product_id, sku = %sku, quantity = r.quantity, "restocked");

    let row = sqlx::query_as::<_, StockRow>("SELECT * FROM stocks WHERE product_id = $1")
        .bind(product_id)
        .fetch_one(&s.db)
        .await?;
    Ok(Json(StockView::from(row)))
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RestockSubscriptionRow {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub product_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub notified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub product_id: Uuid,
}

pub async fn subscribe(
    State(s): State<AppState>,
    actor: Actor,
    Json(r): Json<SubscribeRequest>,
) -> Result<(StatusCode, Json<RestockSubscriptionRow>)> {
    let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM products WHERE id = $1 AND is_active")
        .bind(r.product_id)
        .fetch_optional(&s.db)
        .await?;
    if exists.is_none() {
        return Err(Error::NotFound("product"));
    }
    // Re-subscribing re-arms an already served subscription.
    let sub = sqlx::query_as::<_, RestockSubscriptionRow>(
        "INSERT INTO restock_subscriptions (id, customer_id, product_id) VALUES ($1, $2, $3) \
         ON CONFLICT (customer_id, product_id) DO UPDATE SET notified_at = NULL RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(actor.id)
    .bind(r.product_id)
    .fetch_one(&s.db)
    .await?;
    Ok((StatusCode::CREATED, Json(sub)))
}

pub async fn list_subscriptions(
    State(s): State<AppState>,
    actor: Actor,
) -> Result<Json<Vec<RestockSubscriptionRow>>> {
    let subs = sqlx::query_as::<_, RestockSubscriptionRow>(
        "SELECT * FROM restock_subscriptions WHERE customer_id = $1 ORDER BY created_at DESC",
    )
    .bind(actor.id)
    .fetch_all(&s.db)
    .await?;
    Ok(Json(subs))
}
