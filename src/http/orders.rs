//! Order placement and listing.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::auth::current_user;
use crate::checkout::{self, CheckoutInput};
use crate::domain::{Address, GatewayRef, ManualProof, Order, PaymentMethod};
use crate::error::ApiError;
use crate::AppState;

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[validate]
    pub shipping_address: AddressInput,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub gateway_order_id: Option<String>,
    #[serde(default)]
    pub gateway_payment_id: Option<String>,
    #[serde(default)]
    pub manual_proof: Option<ManualProofInput>,
    #[serde(default)]
    pub promo_code: Option<String>,
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddressInput {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 5))]
    pub phone: String,
    #[validate(length(min = 1))]
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    #[validate(length(min = 1))]
    pub city: String,
    #[validate(length(min = 1))]
    pub state: String,
    #[validate(length(min = 3))]
    pub postal_code: String,
    #[validate(length(min = 2))]
    pub country: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualProofInput {
    pub transaction_id: String,
    pub screenshot_url: String,
    pub method: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPlacedResponse {
    pub id: Uuid,
    pub order_number: String,
    pub total: i64,
    pub payment_status: String,
}

impl CheckoutRequest {
    fn into_input(self) -> Result<CheckoutInput, ApiError> {
        let gateway_ref = match (self.gateway_order_id, self.gateway_payment_id) {
            (Some(order_id), Some(payment_id)) => Some(GatewayRef {
                gateway_order_id: order_id,
                gateway_payment_id: payment_id,
            }),
            (None, None) => None,
            _ => {
                return Err(ApiError::Validation(
                    "gateway order id and payment id must be supplied together".into(),
                ))
            }
        };
        if self.payment_method == PaymentMethod::Gateway && gateway_ref.is_none() {
            return Err(ApiError::Validation(
                "gateway payments require verified gateway references".into(),
            ));
        }
        let a = self.shipping_address;
        Ok(CheckoutInput {
            shipping_address: Address {
                name: a.name,
                phone: a.phone,
                line1: a.line1,
                line2: a.line2,
                city: a.city,
                state: a.state,
                postal_code: a.postal_code,
                country: a.country,
            },
            payment_method: self.payment_method,
            gateway_ref,
            manual_proof: self.manual_proof.map(|p| ManualProof {
                transaction_id: p.transaction_id,
                screenshot_url: p.screenshot_url,
                method: p.method,
            }),
            promo_code: self.promo_code,
        })
    }
}

pub async fn place_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<OrderPlacedResponse>), ApiError> {
    let user = current_user(state.auth.as_ref(), &headers).await?;
    req.validate()?;
    let input = req.into_input()?;
    let order = checkout::place_order(&state, &user, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(OrderPlacedResponse {
            id: order.id,
            order_number: order.order_number,
            total: order.total,
            payment_status: order.payment_status.as_str().to_string(),
        }),
    ))
}

pub async fn list_orders(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Order>>, ApiError> {
    let user = current_user(state.auth.as_ref(), &headers).await?;
    Ok(Json(state.orders.orders_for_user(user.id).await?))
}
