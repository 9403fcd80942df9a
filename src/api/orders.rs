//! Order engine endpoints: checkout, lifecycle transitions, tracking,
//! invoices, and the staff dashboard.
//!
//! Checkout is the one genuinely concurrent-sensitive path: stock rows are
//! locked in product-id order and the whole of (order + items + reservations
//! + coupon redemption) commits or rolls back as a unit.

use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder, Transaction};
use uuid::Uuid;
use validator::Validate;

use crate::api::stock::{lock_stock, store_level};
use crate::api::{coupons, AppState, ListParams, Paginated};
use crate::domain::actor::{Actor, OrderVisibility};
use crate::domain::aggregates::coupon::LineRef;
use crate::domain::aggregates::order::{
    validate_transition, OrderStatus, OrderTotals, StockEffect,
};
use crate::domain::aggregates::product::{is_orderable, Availability};
use crate::domain::events::DomainEvent;
use crate::domain::value_objects::{InvoiceNumber, OrderNumber};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderRow {
    pub id: Uuid,
    pub order_number: String,
    pub customer_id: Uuid,
    pub status: String,
    pub payment_status: String,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub shipping_cost: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    pub coupon_code: Option<String>,
    pub shipping_address: serde_json::Value,
    pub billing_address: Option<serde_json::Value>,
    pub customer_notes: String,
    pub admin_notes: String,
    pub processed_by: Option<Uuid>,
    pub warehouse_manager: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl OrderRow {
    pub fn status(&self) -> Result<OrderStatus> {
        OrderStatus::parse(&self.status)
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub product_sku: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TrackingRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub status: String,
    pub description: String,
    pub location: String,
    pub updated_by: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: OrderRow,
    pub items: Vec<OrderItemRow>,
    pub tracking: Vec<TrackingRow>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct Address {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1))]
    pub address: String,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[validate(length(min = 1, max = 100))]
    pub state: String,
    #[validate(length(min = 1, max = 20))]
    pub postal_code: String,
    #[validate(length(min = 1, max = 100))]
    pub country: String,
    #[serde(default)]
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct ItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    /// Explicit item list; when omitted the customer's cart is used
    /// (and emptied on success).
    pub items: Option<Vec<ItemRequest>>,
    pub shipping_address: Address,
    pub billing_address: Option<Address>,
    pub coupon_code: Option<String>,
    #[serde(default)]
    pub customer_notes: String,
}

/// A generated number that is free at insert time. The random suffix makes
/// collisions rare; the existence check plus the UNIQUE constraint makes
/// uniqueness guaranteed rather than probable.
async fn fresh_number(
    tx: &mut Transaction<'_, Postgres>,
    exists_sql: &str,
    generate: impl Fn() -> String,
) -> Result<String> {
    for _ in 0..5 {
        let candidate = generate();
        let taken: Option<(i32,)> = sqlx::query_as(exists_sql)
            .bind(&candidate)
            .fetch_optional(&mut **tx)
            .await?;
        if taken.is_none() {
            return Ok(candidate);
        }
    }
    Err(Error::Internal("could not allocate a unique number, retry the request"))
}

pub async fn checkout(
    State(s): State<AppState>,
    actor: Actor,
    Json(r): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<OrderDetail>)> {
    r.shipping_address.validate()?;
    if let Some(billing) = &r.billing_address {
        billing.validate()?;
    }

    let mut tx = s.db.begin().await?;

    let from_cart = r.items.is_none();
    let requested: Vec<ItemRequest> = match r.items {
        Some(items) => items,
        None => sqlx::query_as::<_, (Uuid, i32)>(
            "SELECT ci.product_id, ci.quantity FROM cart_items ci \
             JOIN carts c ON c.id = ci.cart_id WHERE c.customer_id = $1",
        )
        .bind(actor.id)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(|(product_id, quantity)| ItemRequest {
            product_id,
            quantity,
        })
        .collect(),
    };
    if requested.is_empty() {
        return Err(Error::Validation("order must contain at least one item".into()));
    }

    // Merge duplicate lines; BTreeMap also fixes the lock acquisition
    // order across concurrent checkouts, avoiding deadlocks.
    let mut quantities: BTreeMap<Uuid, i32> = BTreeMap::new();
    for item in &requested {
        if item.quantity < 1 {
            return Err(Error::Validation("quantity must be at least 1".into()));
        }
        *quantities.entry(item.product_id).or_insert(0) += item.quantity;
    }

    struct Line {
        product_id: Uuid,
        name: String,
        sku: String,
        unit_price: Decimal,
        quantity: i32,
        category_id: Uuid,
    }

    let mut lines: Vec<Line> = Vec::with_capacity(quantities.len());
    let mut low_stock: Vec<DomainEvent> = Vec::new();
    let mut subtotal = Decimal::ZERO;
    for (&product_id, &quantity) in &quantities {
        let product: Option<(String, String, Decimal, Uuid, bool, String)> = sqlx::query_as(
            "SELECT name, sku, price, category_id, is_active, availability \
             FROM products WHERE id = $1 FOR UPDATE",
        )
        .bind(product_id)
        .fetch_optional(&mut *tx)
        .await?;
        let (name, sku, price, category_id, is_active, availability) =
            product.ok_or(Error::NotFound("product"))?;
        if !is_orderable(is_active, Availability::parse(&availability)?) {
            return Err(Error::Validation(format!("product {sku} is not available for purchase")));
        }

        // Atomic check-then-reserve under the row lock. Any failure rolls
        // back every reservation made so far.
        let stock = lock_stock(&mut tx, product_id).await?;
        let mut level = stock.level();
        let was_low = level.is_low_stock(stock.reorder_level);
        level.reserve(quantity)?;
        store_level(&mut *tx, &level, actor.id).await?;
        if !was_low && level.is_low_stock(stock.reorder_level) {
            low_stock.push(DomainEvent::LowStock {
                product_id,
                sku: sku.clone(),
                available: level.available(),
            });
        }

        subtotal += price * Decimal::from(quantity);
        lines.push(Line {
            product_id,
            name,
            sku,
            unit_price: price,
            quantity,
            category_id,
        });
    }

    // Coupon redemption shares the transaction so used_count can never
    // over-run its cap under concurrent checkouts.
    let mut discount = Decimal::ZERO;
    let mut coupon_code = None;
    if let Some(code) = r.coupon_code.as_deref().filter(|c| !c.trim().is_empty()) {
        let row = coupons::find_by_code(&mut *tx, code.trim().to_uppercase().as_str(), true).await?;
        let coupon = row.to_domain()?;
        let refs: Vec<LineRef> = lines
            .iter()
            .map(|l| LineRef {
                product_id: l.product_id,
                category_id: l.category_id,
            })
            .collect();
        coupon.validate(Utc::now(), subtotal, &refs)?;
        discount = coupon.discount(subtotal);
        sqlx::query("UPDATE coupons SET used_count = used_count + 1 WHERE id = $1")
            .bind(row.id)
            .execute(&mut *tx)
            .await?;
        coupon_code = Some(row.code);
    }

    let totals = OrderTotals::compute(
        subtotal,
        discount,
        s.charges.shipping_cost(subtotal),
        s.charges.tax_amount(subtotal),
    )?;

    let now = Utc::now();
    let order_number = fresh_number(
        &mut tx,
        "SELECT 1 FROM orders WHERE order_number = $1",
        || OrderNumber::generate(now),
    )
    .await?;

    let order = sqlx::query_as::<_, OrderRow>(
        "INSERT INTO orders (id, order_number, customer_id, status, payment_status, subtotal, \
         discount_amount, shipping_cost, tax_amount, total_amount, coupon_code, shipping_address, \
         billing_address, customer_notes) \
         VALUES ($1, $2, $3, 'pending', 'pending', $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(&order_number)
    .bind(actor.id)
    .bind(totals.subtotal)
    .bind(totals.discount_amount)
    .bind(totals.shipping_cost)
    .bind(totals.tax_amount)
    .bind(totals.total_amount)
    .bind(&coupon_code)
    .bind(serde_json::to_value(&r.shipping_address).unwrap_or_default())
    .bind(r.billing_address.as_ref().map(|b| serde_json::to_value(b).unwrap_or_default()))
    .bind(&r.customer_notes)
    .fetch_one(&mut *tx)
    .await?;

    let mut items = Vec::with_capacity(lines.len());
    for line in &lines {
        let item = sqlx::query_as::<_, OrderItemRow>(
            "INSERT INTO order_items (id, order_id, product_id, product_name, product_sku, quantity, unit_price, total_price) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(order.id)
        .bind(line.product_id)
        .bind(&line.name)
        .bind(&line.sku)
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(line.unit_price * Decimal::from(line.quantity))
        .fetch_one(&mut *tx)
        .await?;
        items.push(item);
    }

    let tracking = append_tracking(
        &mut tx,
        order.id,
        OrderStatus::Pending,
        "Order placed",
        "",
        actor.id,
    )
    .await?;

    if from_cart {
        // Only the lines that made it into the order leave the cart; an
        // item added concurrently since the snapshot read stays behind.
        let ordered: Vec<Uuid> = quantities.keys().copied().collect();
        sqlx::query(
            "DELETE FROM cart_items WHERE cart_id IN (SELECT id FROM carts WHERE customer_id = $1) \
             AND product_id = ANY($2)",
        )
        .bind(actor.id)
        .bind(&ordered)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    s.notifier
        .publish(&DomainEvent::OrderCreated {
            order_id: order.id,
            order_number: order.order_number.clone(),
            customer_id: actor.id,
        })
        .await;
    for event in &low_stock {
        s.notifier.publish(event).await;
    }
    tracing::info!(order_number = %order.order_number, total = %order.total_amount, "order created");

    Ok((
        StatusCode::CREATED,
        Json(OrderDetail {
            order,
            items,
            tracking: vec![tracking],
        }),
    ))
}

async fn append_tracking(
    tx: &mut Transaction<'_, Postgres>,
    order_id: Uuid,
    status: OrderStatus,
    description: &str,
    location: &str,
    actor_id: Uuid,
) -> Result<TrackingRow> {
    let row = sqlx::query_as::<_, TrackingRow>(
        "INSERT INTO order_tracking (id, order_id, status, description, location, updated_by) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(order_id)
    .bind(status.as_str())
    .bind(description)
    .bind(location)
    .bind(actor_id)
    .fetch_one(&mut **tx)
    .await?;
    Ok(row)
}

pub async fn list(
    State(s): State<AppState>,
    actor: Actor,
    Query(p): Query<ListParams>,
) -> Result<Json<Paginated<OrderRow>>> {
    let visibility = OrderVisibility::for_actor(&actor);

    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM orders WHERE TRUE");
    let mut cb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM orders WHERE TRUE");
    for builder in [&mut qb, &mut cb] {
        match &visibility {
            OrderVisibility::All => {}
            OrderVisibility::StatusIn(statuses) => {
                builder.push(" AND status IN (");
                {
                    let mut separated = builder.separated(", ");
                    for status in statuses.iter() {
                        separated.push_bind(status.as_str());
                    }
                }
                builder.push(")");
            }
            OrderVisibility::CustomerOnly(id) => {
                builder.push(" AND customer_id = ").push_bind(*id);
            }
        }
        if let Some(status) = &p.status {
            builder.push(" AND status = ").push_bind(status.clone());
        }
        if let Some(payment) = &p.payment_status {
            builder.push(" AND payment_status = ").push_bind(payment.clone());
        }
    }
    qb.push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(i64::from(p.per_page()))
        .push(" OFFSET ")
        .push_bind(p.offset());

    let orders = qb.build_query_as::<OrderRow>().fetch_all(&s.db).await?;
    let (total,): (i64,) = cb.build_query_as().fetch_one(&s.db).await?;
    Ok(Json(Paginated {
        data: orders,
        total,
        page: p.page(),
    }))
}

async fn load_visible(
    db: &sqlx::PgPool,
    actor: &Actor,
    order_id: Uuid,
) -> Result<OrderRow> {
    let order = sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1")
        .bind(order_id)
        .fetch_optional(db)
        .await?
        .ok_or(Error::NotFound("order"))?;
    let visibility = OrderVisibility::for_actor(actor);
    if !visibility.allows(order.customer_id, order.status()?) {
        // Hidden orders are indistinguishable from absent ones.
        return Err(Error::NotFound("order"));
    }
    Ok(order)
}

pub async fn get_one(
    State(s): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderDetail>> {
    let order = load_visible(&s.db, &actor, id).await?;
    let items = sqlx::query_as::<_, OrderItemRow>("SELECT * FROM order_items WHERE order_id = $1")
        .bind(id)
        .fetch_all(&s.db)
        .await?;
    let tracking = sqlx::query_as::<_, TrackingRow>(
        "SELECT * FROM order_tracking WHERE order_id = $1 ORDER BY timestamp DESC",
    )
    .bind(id)
    .fetch_all(&s.db)
    .await?;
    Ok(Json(OrderDetail {
        order,
        items,
        tracking,
    }))
}

pub async fn tracking_history(
    State(s): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<TrackingRow>>> {
    load_visible(&s.db, &actor, id).await?;
    let tracking = sqlx::query_as::<_, TrackingRow>(
        "SELECT * FROM order_tracking WHERE order_id = $1 ORDER BY timestamp DESC",
    )
    .bind(id)
    .fetch_all(&s.db)
    .await?;
    Ok(Json(tracking))
}

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub status: OrderStatus,
    pub description: Option<String>,
    #[serde(default)]
    pub location: String,
}

fn authorize_transition(actor: &Actor, to: OrderStatus, order_customer: Uuid) -> Result<()> {
    match to {
        OrderStatus::Cancelled => {
            if actor.id == order_customer || actor.role.is_staff() {
                Ok(())
            } else {
                Err(Error::Forbidden("only the customer or staff may cancel an order"))
            }
        }
        OrderStatus::Confirmed | OrderStatus::Refunded => {
            if actor.role.is_staff() {
                Ok(())
            } else {
                Err(Error::Forbidden("only staff may perform this transition"))
            }
        }
        OrderStatus::Processing | OrderStatus::Shipped | OrderStatus::Delivered => {
            if actor.role.is_staff() || actor.role.can_manage_stock() {
                Ok(())
            } else {
                Err(Error::Forbidden("only staff or warehouse may perform this transition"))
            }
        }
        OrderStatus::Pending => Err(Error::Forbidden("orders cannot be moved back to pending")),
    }
}

async fn perform_transition(
    s: &AppState,
    actor: Actor,
    order_id: Uuid,
    to: OrderStatus,
    description: String,
    location: String,
) -> Result<OrderRow> {
    let mut tx = s.db.begin().await?;
    let order = sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1 FOR UPDATE")
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(Error::NotFound("order"))?;
    if !OrderVisibility::for_actor(&actor).allows(order.customer_id, order.status()?) {
        return Err(Error::NotFound("order"));
    }
    authorize_transition(&actor, to, order.customer_id)?;

    let from = order.status()?;
    let effect = validate_transition(from, to)?;

    let mut low_stock: Vec<DomainEvent> = Vec::new();
    if effect != StockEffect::None {
        let items: Vec<(Uuid, String, i32)> = sqlx::query_as(
            "SELECT product_id, product_sku, quantity FROM order_items WHERE order_id = $1 ORDER BY product_id",
        )
        .bind(order_id)
        .fetch_all(&mut *tx)
        .await?;
        for (product_id, sku, quantity) in items {
            let stock = lock_stock(&mut tx, product_id).await?;
            let mut level = stock.level();
            let was_low = level.is_low_stock(stock.reorder_level);
            match effect {
                StockEffect::Release => level.release(quantity),
                StockEffect::Consume => level.consume(quantity)?,
                StockEffect::None => unreachable!(),
            }
            store_level(&mut *tx, &level, actor.id).await?;
            if !was_low && level.is_low_stock(stock.reorder_level) {
                low_stock.push(DomainEvent::LowStock {
                    product_id,
                    sku,
                    available: level.available(),
                });
            }
        }
    }

    let updated = match to {
        OrderStatus::Confirmed => {
            sqlx::query_as::<_, OrderRow>(
                "UPDATE orders SET status = $2, updated_at = NOW(), confirmed_at = NOW(), processed_by = $3 \
                 WHERE id = $1 RETURNING *",
            )
            .bind(order_id)
            .bind(to.as_str())
            .bind(actor.id)
            .fetch_one(&mut *tx)
            .await?
        }
        OrderStatus::Processing | OrderStatus::Shipped => {
            // Fulfilment stamps the first warehouse manager who touches
            // the order; other actors leave the assignment alone.
            let assignee = actor.role.is_warehouse_manager().then_some(actor.id);
            let sql = if to == OrderStatus::Shipped {
                "UPDATE orders SET status = $2, updated_at = NOW(), shipped_at = NOW(), \
                 warehouse_manager = COALESCE(warehouse_manager, $3) WHERE id = $1 RETURNING *"
            } else {
                "UPDATE orders SET status = $2, updated_at = NOW(), \
                 warehouse_manager = COALESCE(warehouse_manager, $3) WHERE id = $1 RETURNING *"
            };
            sqlx::query_as::<_, OrderRow>(sql)
                .bind(order_id)
                .bind(to.as_str())
                .bind(assignee)
                .fetch_one(&mut *tx)
                .await?
        }
        OrderStatus::Delivered => {
            sqlx::query_as::<_, OrderRow>(
                "UPDATE orders SET status = $2, updated_at = NOW(), delivered_at = NOW() WHERE id = $1 RETURNING *",
            )
            .bind(order_id)
            .bind(to.as_str())
            .fetch_one(&mut *tx)
            .await?
        }
        OrderStatus::Refunded => {
            sqlx::query_as::<_, OrderRow>(
                "UPDATE orders SET status = $2, updated_at = NOW(), payment_status = 'refunded' \
                 WHERE id = $1 RETURNING *",
            )
            .bind(order_id)
            .bind(to.as_str())
            .fetch_one(&mut *tx)
            .await?
        }
        _ => {
            sqlx::query_as::<_, OrderRow>(
                "UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
            )
            .bind(order_id)
            .bind(to.as_str())
            .fetch_one(&mut *tx)
            .await?
        }
    };

    append_tracking(&mut tx, order_id, to, &description, &location, actor.id).await?;
    tx.commit().await?;

    s.notifier
        .publish(&DomainEvent::OrderStatusChanged {
            order_id,
            order_number: updated.order_number.clone(),
            from,
            to,
            actor_id: actor.id,
        })
        .await;
    for event in &low_stock {
        s.notifier.publish(event).await;
    }
    tracing::info!(order_number = %updated.order_number, from = %from, to = %to, "order status changed");
    Ok(updated)
}

pub async fn transition(
    State(s): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(r): Json<TransitionRequest>,
) -> Result<Json<OrderRow>> {
    let description = r
        .description
        .unwrap_or_else(|| format!("Order {}", r.status.as_str()));
    let order = perform_transition(&s, actor, id, r.status, description, r.location).await?;
    Ok(Json(order))
}

pub async fn cancel(
    State(s): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderRow>> {
    let description = if actor.role.is_staff() {
        "Order cancelled by staff".to_string()
    } else {
        "Order cancelled by customer".to_string()
    };
    let order = perform_transition(
        &s,
        actor,
        id,
        OrderStatus::Cancelled,
        description,
        String::new(),
    )
    .await?;
    Ok(Json(order))
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct InvoiceRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub invoice_number: String,
    pub invoice_date: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
}

/// Created lazily on first retrieval, one per order.
pub async fn invoice(
    State(s): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<InvoiceRow>> {
    load_visible(&s.db, &actor, id).await?;

    let mut tx = s.db.begin().await?;
    let existing = sqlx::query_as::<_, InvoiceRow>("SELECT * FROM invoices WHERE order_id = $1")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
    let invoice = match existing {
        Some(invoice) => invoice,
        None => {
            let number = fresh_number(
                &mut tx,
                "SELECT 1 FROM invoices WHERE invoice_number = $1",
                || InvoiceNumber::generate(Utc::now()),
            )
            .await?;
            sqlx::query_as::<_, InvoiceRow>(
                "INSERT INTO invoices (id, order_id, invoice_number) VALUES ($1, $2, $3) \
                 ON CONFLICT (order_id) DO UPDATE SET order_id = EXCLUDED.order_id RETURNING *",
            )
            .bind(Uuid::new_v4())
            .bind(id)
            .bind(&number)
            .fetch_one(&mut *tx)
            .await?
        }
    };
    tx.commit().await?;
    Ok(Json(invoice))
}

pub async fn dashboard(
    State(s): State<AppState>,
    actor: Actor,
) -> Result<Json<serde_json::Value>> {
    if !actor.role.can_manage_stock() && !actor.role.is_staff() {
        return Err(Error::Forbidden("dashboard is restricted to staff"));
    }
    let counts: Vec<(String, i64)> =
        sqlx::query_as("SELECT status, COUNT(*) FROM orders GROUP BY status")
            .fetch_all(&s.db)
            .await?;
    let (revenue,): (Decimal,) = sqlx::query_as(
        "SELECT COALESCE(SUM(total_amount), 0) FROM orders WHERE status = 'delivered'",
    )
    .fetch_one(&s.db)
    .await?;

    let mut by_status = serde_json::Map::new();
    for (status, count) in counts {
        by_status.insert(status, serde_json::json!(count));
    }
    Ok(Json(serde_json::json!({
        "orders_by_status": by_status,
        "total_revenue": revenue,
    })))
}
