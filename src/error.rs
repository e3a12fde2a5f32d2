//! Error taxonomy for the order pipeline and its HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not authenticated")]
    Unauthorized,

    #[error("Admin access required")]
    Forbidden,

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Product {product_id} not found")]
    ProductNotFound { product_id: Uuid },

    #[error("Variant {size}/{color} not found for product {product_id}")]
    VariantNotFound {
        product_id: Uuid,
        size: String,
        color: String,
    },

    #[error("Insufficient stock for {product} ({size}/{color}): {available} available, {requested} requested")]
    InsufficientStock {
        product: String,
        size: String,
        color: String,
        available: i32,
        requested: u32,
    },

    #[error("Invalid status: {status}")]
    InvalidStatus { status: String },

    #[error("Cannot change status from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Design upload failed for {} item(s)", .failures.len())]
    AssetMaterializationFailed { failures: Vec<String> },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::EmptyCart
            | Self::ProductNotFound { .. }
            | Self::VariantNotFound { .. }
            | Self::InsufficientStock { .. }
            | Self::InvalidStatus { .. }
            | Self::InvalidTransition { .. }
            | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::AssetMaterializationFailed { .. } | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::AssetMaterializationFailed { failures } => serde_json::json!({
                "error": self.to_string(),
                "failures": failures,
            }),
            other => serde_json::json!({ "error": other.to_string() }),
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(body)).into_response()
    }
}

impl From<crate::store::StoreError> for ApiError {
    fn from(e: crate::store::StoreError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<crate::objectstore::ObjectStoreError> for ApiError {
    fn from(e: crate::objectstore::ObjectStoreError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(e: validator::ValidationErrors) -> Self {
        Self::Validation(e.to_string())
    }
}
