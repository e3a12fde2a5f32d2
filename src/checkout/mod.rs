//! The cart-to-order pipeline: validation, design materialization, order
//! assembly, and the ordered commit sequence.

pub mod assembler;
pub mod lifecycle;
pub mod materializer;
pub mod sequencer;
pub mod validator;

use async_trait::async_trait;
use uuid::Uuid;

use crate::auth::User;
use crate::domain::{Address, GatewayRef, ManualProof, Order, PaymentMethod};
use crate::error::ApiError;
use crate::AppState;

/// An already-validated discount. Promo validation is a collaborator invoked
/// before order assembly; the assembler takes the amount as given.
#[derive(Clone, Debug)]
pub struct PromoDiscount {
    pub code: String,
    pub amount: i64,
}

#[async_trait]
pub trait PromoValidator: Send + Sync {
    async fn validate(&self, code: &str, order_value: i64) -> Result<PromoDiscount, ApiError>;
}

/// Checkout request after HTTP-level validation. For gateway payments the
/// payment has already been verified by the external gateway collaborator.
#[derive(Clone, Debug)]
pub struct CheckoutInput {
    pub shipping_address: Address,
    pub payment_method: PaymentMethod,
    pub gateway_ref: Option<GatewayRef>,
    pub manual_proof: Option<ManualProof>,
    pub promo_code: Option<String>,
}

/// Runs the full pipeline. Everything up to and including materialization is
/// side-effect-free on the catalog and cart; any failure there leaves both
/// untouched. Once the order document is inserted the caller gets the order
/// back even if later commit steps degrade.
pub async fn place_order(
    state: &AppState,
    user: &User,
    input: CheckoutInput,
) -> Result<Order, ApiError> {
    let cart = state
        .carts
        .cart(user.id)
        .await?
        .filter(|c| !c.is_empty())
        .ok_or(ApiError::EmptyCart)?;

    let intents = validator::validate_cart(state.catalog.as_ref(), &cart).await?;

    let subtotal = assembler::subtotal(&cart);
    let promo = match &input.promo_code {
        Some(code) => Some(state.promos.validate(code, subtotal).await?),
        None => None,
    };

    let order_id = Uuid::now_v7();
    let designs = materializer::materialize_designs(
        state.blobs.as_ref(),
        state.designs.as_ref(),
        user,
        order_id,
        &cart,
    )
    .await?;

    let order = assembler::assemble_order(
        order_id,
        user.id,
        &cart,
        designs,
        input,
        &state.pricing,
        promo,
    );
    sequencer::commit_order(state, user, order, &intents).await
}
