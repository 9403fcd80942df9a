//! Request-level error taxonomy.
//!
//! Every failure surfaced to a caller carries a machine-distinguishable
//! `kind` plus a human-readable message. Nothing here is retried
//! internally; a failed request is simply failed back to the client.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::coupon::CouponRejection;
use crate::domain::aggregates::order::OrderStatus;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Validation(String),

    #[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: Uuid,
        requested: i32,
        available: i32,
    },

    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("coupon invalid: {0}")]
    CouponInvalid(#[from] CouponRejection),

    #[error("permission denied: {0}")]
    Forbidden(&'static str),

    #[error("{0}")]
    Internal(&'static str),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation_error",
            Error::InsufficientStock { .. } => "insufficient_stock",
            Error::InvalidTransition { .. } => "invalid_transition",
            Error::NotFound(_) => "not_found",
            Error::CouponInvalid(_) => "coupon_invalid",
            Error::Forbidden(_) => "forbidden",
            Error::Internal(_) | Error::Database(_) => "internal_error",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_) | Error::CouponInvalid(_) => StatusCode::BAD_REQUEST,
            Error::InsufficientStock { .. } | Error::InvalidTransition { .. } => {
                StatusCode::CONFLICT
            }
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::Internal(_) | Error::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        Error::Validation(errors.to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
        }
        let body = Json(json!({ "kind": self.kind(), "message": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_distinct() {
        let errors = [
            Error::Validation("bad".into()),
            Error::NotFound("order"),
            Error::Forbidden("staff only"),
        ];
        let kinds: Vec<_> = errors.iter().map(|e| e.kind()).collect();
        assert_eq!(kinds, vec!["validation_error", "not_found", "forbidden"]);
    }

    #[test]
    fn allocation_exhaustion_is_a_server_fault() {
        // Number generation running out of retries is not the client's
        // doing and must not surface as a validation error.
        let e = Error::Internal("could not allocate a unique number");
        assert_eq!(e.kind(), "internal_error");
    }
}
