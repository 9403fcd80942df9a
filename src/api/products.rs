//! Catalog endpoints: products, categories, reviews.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::api::{AppState, ListParams, Paginated};
use crate::domain::actor::Actor;
use crate::domain::aggregates::product::{average_rating, Availability};
use crate::domain::value_objects::Sku;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductRow {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    pub description: String,
    pub category_id: Uuid,
    pub price: Decimal,
    pub cost_price: Decimal,
    pub availability: String,
    pub is_active: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CategoryRow {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub parent_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ReviewRow {
    pub id: Uuid,
    pub product_id: Uuid,
    pub customer_id: Uuid,
    pub rating: i32,
    pub title: String,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub async fn list(
    State(s): State<AppState>,
    actor: Actor,
    Query(p): Query<ListParams>,
) -> Result<Json<Paginated<ProductRow>>> {
    // Customers browse the live catalog; staff also see inactive products.
    let staff = actor.role.is_staff();
    let products = sqlx::query_as::<_, ProductRow>(
        "SELECT * FROM products \
         WHERE (is_active OR $1) AND ($2::uuid IS NULL OR category_id = $2) \
         ORDER BY created_at DESC LIMIT $3 OFFSET $4",
    )
    .bind(staff)
    .bind(p.category)
    .bind(i64::from(p.per_page()))
    .bind(p.offset())
    .fetch_all(&s.db)
    .await?;
    let (total,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM products WHERE (is_active OR $1) AND ($2::uuid IS NULL OR category_id = $2)",
    )
    .bind(staff)
    .bind(p.category)
    .fetch_one(&s.db)
    .await?;
    Ok(Json(Paginated {
        data: products,
        total,
        page: p.page(),
    }))
}

#[derive(Debug, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: ProductRow,
    pub average_rating: f64,
    pub review_count: usize,
    pub available_quantity: Option<i32>,
}

pub async fn get_one(
    State(s): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<ProductDetail>> {
    let product = sqlx::query_as::<_, ProductRow>(
        "SELECT * FROM products WHERE id = $1 AND (is_active OR $2)",
    )
    .bind(id)
    .bind(actor.role.is_staff())
    .fetch_optional(&s.db)
    .await?
    .ok_or(Error::NotFound("product"))?;

    let ratings: Vec<(i32,)> =
        sqlx::query_as("SELECT rating FROM product_reviews WHERE product_id = $1")
            .bind(id)
            .fetch_all(&s.db)
            .await?;
    let ratings: Vec<i32> = ratings.into_iter().map(|(r,)| r).collect();

    let available: Option<(i32,)> = sqlx::query_as(
        "SELECT quantity - reserved_quantity FROM stocks WHERE product_id = $1",
    )
    .bind(id)
    .fetch_optional(&s.db)
    .await?;

    Ok(Json(ProductDetail {
        product,
        average_rating: average_rating(&ratings),
        review_count: ratings.len(),
        available_quantity: available.map(|(a,)| a),
    }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category_id: Uuid,
    pub sku: String,
    pub price: Decimal,
    pub cost_price: Decimal,
    pub availability: Option<Availability>,
    pub initial_quantity: Option<i32>,
    pub reorder_level: Option<i32>,
}

pub async fn create(
    State(s): State<AppState>,
    actor: Actor,
    Json(r): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductRow>)> {
    if !actor.role.is_staff() {
        return Err(Error::Forbidden("only staff may create products"));
    }
    r.validate()?;
    if r.price <= Decimal::ZERO || r.cost_price <= Decimal::ZERO {
        return Err(Error::Validation("price and cost_price must be positive".into()));
    }
    let sku = Sku::new(r.sku)?;
    let availability = r.availability.unwrap_or_default();

    // Product and its ledger row are created together.
    let mut tx = s.db.begin().await?;
    let product = sqlx::query_as::<_, ProductRow>(
        "INSERT INTO products (id, sku, name, description, category_id, price, cost_price, availability, is_active, created_by) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, TRUE, $9) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(sku.as_str())
    .bind(&r.name)
    .bind(&r.description)
    .bind(r.category_id)
    .bind(r.price)
    .bind(r.cost_price)
    .bind(availability.as_str())
    .bind(actor.id)
    .fetch_one(&mut *tx)
    .await?;
    sqlx::query(
        "INSERT INTO stocks (product_id, quantity, reserved_quantity, reorder_level, updated_by) \
         VALUES ($1, $2, 0, $3, $4)",
    )
    .bind(product.id)
    .bind(r.initial_quantity.unwrap_or(0).max(0))
    .bind(r.reorder_level.unwrap_or(10).max(0))
    .bind(actor.id)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    tracing::info!(product_id = %product.id, sku = %product.sku, "product created");
    Ok((StatusCode::CREATED, Json(product)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    pub availability: Availability,
    pub is_active: bool,
}

pub async fn update(
    State(s): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(r): Json<UpdateProductRequest>,
) -> Result<Json<ProductRow>> {
    if !actor.role.is_staff() {
        return Err(Error::Forbidden("only staff may update products"));
    }
    r.validate()?;
    if r.price <= Decimal::ZERO {
        return Err(Error::Validation("price must be positive".into()));
    }
    // Existing order lines are unaffected: they carry their own snapshot
    // of name, sku and unit price.
    let product = sqlx::query_as::<_, ProductRow>(
        "UPDATE products SET name = $2, description = $3, price = $4, availability = $5, is_active = $6, updated_at = NOW() \
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&r.name)
    .bind(&r.description)
    .bind(r.price)
    .bind(r.availability.as_str())
    .bind(r.is_active)
    .fetch_optional(&s.db)
    .await?
    .ok_or(Error::NotFound("product"))?;
    Ok(Json(product))
}

pub async fn list_categories(State(s): State<AppState>) -> Result<Json<Vec<CategoryRow>>> {
    let categories =
        sqlx::query_as::<_, CategoryRow>("SELECT * FROM categories WHERE is_active ORDER BY name")
            .fetch_all(&s.db)
            .await?;
    Ok(Json(categories))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub parent_id: Option<Uuid>,
}

pub async fn create_category(
    State(s): State<AppState>,
    actor: Actor,
    Json(r): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<CategoryRow>)> {
    if !actor.role.is_staff() {
        return Err(Error::Forbidden("only staff may create categories"));
    }
    r.validate()?;
    let category = sqlx::query_as::<_, CategoryRow>(
        "INSERT INTO categories (id, name, description, parent_id, is_active) \
         VALUES ($1, $2, $3, $4, TRUE) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(&r.name)
    .bind(&r.description)
    .bind(r.parent_id)
    .fetch_one(&s.db)
    .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

#[derive(Debug, Serialize)]
pub struct ReviewList {
    pub reviews: Vec<ReviewRow>,
    pub average_rating: f64,
}

pub async fn list_reviews(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReviewList>> {
    let reviews = sqlx::query_as::<_, ReviewRow>(
        "SELECT * FROM product_reviews WHERE product_id = $1 ORDER BY created_at DESC",
    )
    .bind(id)
    .fetch_all(&s.db)
    .await?;
    let ratings: Vec<i32> = reviews.iter().map(|r| r.rating).collect();
    Ok(Json(ReviewList {
        average_rating: average_rating(&ratings),
        reviews,
    }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReviewRequest {
    #[validate(range(min = 1, max = 5))]
    pub rating: i32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub comment: String,
}

pub async fn create_review(
    State(s): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(r): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<ReviewRow>)> {
    r.validate()?;
    let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM products WHERE id = $1 AND is_active")
        .bind(id)
        .fetch_optional(&s.db)
        .await?;
    if exists.is_none() {
        return Err(Error::NotFound("product"));
    }
    // One review per customer per product; re-reviewing replaces the old one.
    let review = sqlx::query_as::<_, ReviewRow>(
        "INSERT INTO product_reviews (id, product_id, customer_id, rating, title, comment) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         ON CONFLICT (product_id, customer_id) DO UPDATE \
         SET rating = $4, title = $5, comment = $6, updated_at = NOW() RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(id)
    .bind(actor.id)
    .bind(r.rating)
    .bind(&r.title)
    .bind(&r.comment)
    .fetch_one(&s.db)
    .await?;
    Ok((StatusCode::CREATED, Json(review)))
}
