//! Cart endpoints. One cart per customer, created on first touch and never
//! deleted, only emptied. Totals are computed on read from current prices.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::api::AppState;
use crate::domain::actor::Actor;
use crate::domain::aggregates::cart::{merged_quantity, validate_quantity, Cart, CartLine};
use crate::domain::aggregates::product::{is_orderable, Availability};
use crate::error::{Error, Result};

/// get-or-create, returning the cart id. The upsert's DO UPDATE is only
/// there to make RETURNING yield a row on the existing-cart path.
async fn cart_id_for(tx: &mut Transaction<'_, Postgres>, customer_id: Uuid) -> Result<Uuid> {
    let (id,): (Uuid,) = sqlx::query_as(
        "INSERT INTO carts (id, customer_id) VALUES ($1, $2) \
         ON CONFLICT (customer_id) DO UPDATE SET updated_at = NOW() RETURNING id",
    )
    .bind(Uuid::new_v4())
    .bind(customer_id)
    .fetch_one(&mut **tx)
    .await?;
    Ok(id)
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct CartItemRow {
    id: Uuid,
    product_id: Uuid,
    product_name: String,
    quantity: i32,
    unit_price: Decimal,
}

#[derive(Debug, Serialize)]
pub struct CartItemView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

#[derive(Debug, Serialize)]
pub struct CartView {
    pub id: Uuid,
    pub items: Vec<CartItemView>,
    pub total_items: i64,
    pub total_amount: Decimal,
}

async fn load_cart(tx: &mut Transaction<'_, Postgres>, customer_id: Uuid) -> Result<CartView> {
    let cart_id = cart_id_for(tx, customer_id).await?;
    let rows = sqlx::query_as::<_, CartItemRow>(
        "SELECT ci.id, ci.product_id, p.name AS product_name, ci.quantity, p.price AS unit_price \
         FROM cart_items ci JOIN products p ON p.id = ci.product_id \
         WHERE ci.cart_id = $1 ORDER BY ci.added_at",
    )
    .bind(cart_id)
    .fetch_all(&mut **tx)
    .await?;

    let cart = Cart::new(
        rows.iter()
            .map(|r| CartLine {
                product_id: r.product_id,
                quantity: r.quantity,
                unit_price: r.unit_price,
            })
            .collect(),
    );
    let total_items = cart.total_items();
    let total_amount = cart.total_amount();

    Ok(CartView {
        id: cart_id,
        items: rows
            .into_iter()
            .map(|r| CartItemView {
                subtotal: r.unit_price * Decimal::from(r.quantity),
                id: r.id,
                product_id: r.product_id,
                product_name: r.product_name,
                quantity: r.quantity,
                unit_price: r.unit_price,
            })
            .collect(),
        total_items,
        total_amount,
    })
}

pub async fn get_cart(State(s): State<AppState>, actor: Actor) -> Result<Json<CartView>> {
    let mut tx = s.db.begin().await?;
    let view = load_cart(&mut tx, actor.id).await?;
    tx.commit().await?;
    Ok(Json(view))
}

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

pub async fn add_item(
    State(s): State<AppState>,
    actor: Actor,
    Json(r): Json<AddItemRequest>,
) -> Result<(StatusCode, Json<CartView>)> {
    validate_quantity(r.quantity)?;

    let mut tx = s.db.begin().await?;
    let product: Option<(bool, String)> =
        sqlx::query_as("SELECT is_active, availability FROM products WHERE id = $1")
            .bind(r.product_id)
            .fetch_optional(&mut *tx)
            .await?;
    let (is_active, availability) = product.ok_or(Error::NotFound("product"))?;
    if !is_orderable(is_active, Availability::parse(&availability)?) {
        return Err(Error::Validation("product is not available for purchase".into()));
    }

    let cart_id = cart_id_for(&mut tx, actor.id).await?;
    // Adding a product already in the cart increments its quantity. The
    // row lock keeps the read-merge-write race-free.
    let existing: Option<(i32,)> = sqlx::query_as(
        "SELECT quantity FROM cart_items WHERE cart_id = $1 AND product_id = $2 FOR UPDATE",
    )
    .bind(cart_id)
    .bind(r.product_id)
    .fetch_optional(&mut *tx)
    .await?;
    let quantity = merged_quantity(existing.map(|(q,)| q), r.quantity)?;
    sqlx::query(
        "INSERT INTO cart_items (id, cart_id, product_id, quantity) VALUES ($1, $2, $3, $4) \
         ON CONFLICT (cart_id, product_id) DO UPDATE SET quantity = $4",
    )
    .bind(Uuid::new_v4())
    .bind(cart_id)
    .bind(r.product_id)
    .bind(quantity)
    .execute(&mut *tx)
    .await?;

    let view = load_cart(&mut tx, actor.id).await?;
    tx.commit().await?;
    Ok((StatusCode::CREATED, Json(view)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: i32,
}

pub async fn update_item(
    State(s): State<AppState>,
    actor: Actor,
    Path(item_id): Path<Uuid>,
    Json(r): Json<UpdateItemRequest>,
) -> Result<Json<CartView>> {
    validate_quantity(r.quantity)?;
    let mut tx = s.db.begin().await?;
    let cart_id = cart_id_for(&mut tx, actor.id).await?;
    let updated = sqlx::query(
        "UPDATE cart_items SET quantity = $3 WHERE id = $1 AND cart_id = $2",
    )
    .bind(item_id)
    .bind(cart_id)
    .bind(r.quantity)
    .execute(&mut *tx)
    .await?;
    if updated.rows_affected() == 0 {
        return Err(Error::NotFound("cart item"));
    }
    let view = load_cart(&mut tx, actor.id).await?;
    tx.commit().await?;
    Ok(Json(view))
}

/// Idempotent: removing an absent item is a no-op, not an error.
pub async fn remove_item(
    State(s): State<AppState>,
    actor: Actor,
    Path(item_id): Path<Uuid>,
) -> Result<StatusCode> {
    let mut tx = s.db.begin().await?;
    let cart_id = cart_id_for(&mut tx, actor.id).await?;
    sqlx::query("DELETE FROM cart_items WHERE id = $1 AND cart_id = $2")
        .bind(item_id)
        .bind(cart_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn clear(State(s): State<AppState>, actor: Actor) -> Result<StatusCode> {
    let mut tx = s.db.begin().await?;
    let cart_id = cart_id_for(&mut tx, actor.id).await?;
    sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
        .bind(cart_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}
