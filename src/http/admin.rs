//! Back-office order lifecycle endpoints. The wider admin CRUD surface
//! lives elsewhere; only the status state machine is handled here.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::current_admin;
use crate::checkout::lifecycle;
use crate::domain::{Order, OrderStatus, PaymentStatus};
use crate::error::ApiError;
use crate::AppState;

#[derive(Deserialize)]
pub struct SetStatusRequest {
    pub status: String,
}

pub async fn set_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(req): Json<SetStatusRequest>,
) -> Result<Json<Order>, ApiError> {
    current_admin(state.auth.as_ref(), &headers).await?;
    let target = OrderStatus::parse(&req.status).ok_or(ApiError::InvalidStatus {
        status: req.status,
    })?;
    let order = state
        .orders
        .order(id)
        .await?
        .ok_or(ApiError::NotFound("order"))?;
    lifecycle::change_status(state.catalog.as_ref(), state.orders.as_ref(), &order, target).await?;
    let updated = state
        .orders
        .order(id)
        .await?
        .ok_or(ApiError::NotFound("order"))?;
    Ok(Json(updated))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetPaymentStatusRequest {
    pub payment_status: String,
}

pub async fn set_payment_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(req): Json<SetPaymentStatusRequest>,
) -> Result<Json<Order>, ApiError> {
    current_admin(state.auth.as_ref(), &headers).await?;
    let target = PaymentStatus::parse(&req.payment_status).ok_or(ApiError::InvalidStatus {
        status: req.payment_status,
    })?;
    let order = state
        .orders
        .order(id)
        .await?
        .ok_or(ApiError::NotFound("order"))?;
    lifecycle::change_payment_status(state.catalog.as_ref(), state.orders.as_ref(), &order, target)
        .await?;
    let updated = state
        .orders
        .order(id)
        .await?
        .ok_or(ApiError::NotFound("order"))?;
    Ok(Json(updated))
}
