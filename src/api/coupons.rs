//! Coupon administration and validation.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;
use validator::Validate;

use crate::api::AppState;
use crate::domain::actor::Actor;
use crate::domain::aggregates::coupon::{Coupon, DiscountType, LineRef};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CouponRow {
    pub id: Uuid,
    pub code: String,
    pub description: String,
    pub discount_type: String,
    pub discount_value: Decimal,
    pub minimum_amount: Decimal,
    pub maximum_uses: Option<i32>,
    pub used_count: i32,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    pub is_active: bool,
    pub applicable_product_ids: Vec<Uuid>,
    pub applicable_category_ids: Vec<Uuid>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl CouponRow {
    pub fn to_domain(&self) -> Result<Coupon> {
        Ok(Coupon {
            code: self.code.clone(),
            discount_type: DiscountType::parse(&self.discount_type)?,
            discount_value: self.discount_value,
            minimum_amount: self.minimum_amount,
            maximum_uses: self.maximum_uses,
            used_count: self.used_count,
            valid_from: self.valid_from,
            valid_to: self.valid_to,
            is_active: self.is_active,
            applicable_product_ids: self.applicable_product_ids.clone(),
            applicable_category_ids: self.applicable_category_ids.clone(),
        })
    }
}

pub async fn find_by_code<'e>(
    executor: impl PgExecutor<'e>,
    code: &str,
    lock: bool,
) -> Result<CouponRow> {
    let query = if lock {
        "SELECT * FROM coupons WHERE code = $1 FOR UPDATE"
    } else {
        "SELECT * FROM coupons WHERE code = $1"
    };
    sqlx::query_as::<_, CouponRow>(query)
        .bind(code)
        .fetch_optional(executor)
        .await?
        .ok_or(Error::NotFound("coupon"))
}

pub async fn list(State(s): State<AppState>, actor: Actor) -> Result<Json<Vec<CouponRow>>> {
    let query = if actor.role.is_staff() {
        "SELECT * FROM coupons ORDER BY created_at DESC"
    } else {
        "SELECT * FROM coupons WHERE is_active ORDER BY created_at DESC"
    };
    let coupons = sqlx::query_as::<_, CouponRow>(query).fetch_all(&s.db).await?;
    Ok(Json(coupons))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCouponRequest {
    #[validate(length(min = 1, max = 50))]
    pub code: String,
    #[serde(default)]
    pub description: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    #[serde(default)]
    pub minimum_amount: Decimal,
    pub maximum_uses: Option<i32>,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    #[serde(default)]
    pub applicable_product_ids: Vec<Uuid>,
    #[serde(default)]
    pub applicable_category_ids: Vec<Uuid>,
}

pub async fn create(
    State(s): State<AppState>,
    actor: Actor,
    Json(r): Json<CreateCouponRequest>,
) -> Result<(StatusCode, Json<CouponRow>)> {
    if !actor.role.is_staff() {
        return Err(Error::Forbidden("only staff may create coupons"));
    }
    r.validate()?;
    if r.discount_value <= Decimal::ZERO {
        return Err(Error::Validation("discount_value must be positive".into()));
    }
    if r.valid_to <= r.valid_from {
        return Err(Error::Validation("valid_to must be after valid_from".into()));
    }
    let code = r.code.trim().to_uppercase();
    let coupon = sqlx::query_as::<_, CouponRow>(
        "INSERT INTO coupons (id, code, description, discount_type, discount_value, minimum_amount, \
         maximum_uses, valid_from, valid_to, is_active, applicable_product_ids, applicable_category_ids, created_by) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, TRUE, $10, $11, $12) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(&code)
    .bind(&r.description)
    .bind(r.discount_type.as_str())
    .bind(r.discount_value)
    .bind(r.minimum_amount)
    .bind(r.maximum_uses)
    .bind(r.valid_from)
    .bind(r.valid_to)
    .bind(&r.applicable_product_ids)
    .bind(&r.applicable_category_ids)
    .bind(actor.id)
    .fetch_one(&s.db)
    .await?;
    tracing::info!(code = %coupon.code, "coupon created");
    Ok((StatusCode::CREATED, Json(coupon)))
}

#[derive(Debug, Deserialize)]
pub struct ValidateCouponRequest {
    pub code: String,
    pub order_amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct ValidateCouponResponse {
    pub valid: bool,
    pub code: String,
    pub discount: Decimal,
}

/// Dry-run validation against the caller's current cart. Redemption itself
/// happens inside checkout, atomically with order creation.
pub async fn validate(
    State(s): State<AppState>,
    actor: Actor,
    Json(r): Json<ValidateCouponRequest>,
) -> Result<Json<ValidateCouponResponse>> {
    let row = find_by_code(&s.db, r.code.trim().to_uppercase().as_str(), false).await?;
    let coupon = row.to_domain()?;

    let lines: Vec<(Uuid, Uuid)> = sqlx::query_as(
        "SELECT ci.product_id, p.category_id \
         FROM cart_items ci \
         JOIN carts c ON c.id = ci.cart_id \
         JOIN products p ON p.id = ci.product_id \
         WHERE c.customer_id = $1",
    )
    .bind(actor.id)
    .fetch_all(&s.db)
    .await?;
    let lines: Vec<LineRef> = lines
        .into_iter()
        .map(|(product_id, category_id)| LineRef {
            product_id,
            category_id,
        })
        .collect();

    coupon.validate(Utc::now(), r.order_amount, &lines)?;
    Ok(Json(ValidateCouponResponse {
        valid: true,
        code: coupon.code.clone(),
        discount: coupon.discount(r.order_amount),
    }))
}
