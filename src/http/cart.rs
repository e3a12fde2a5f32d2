//! Cart handlers. The server-held cart is the only cart checkout trusts;
//! prices are snapshotted here, at add-to-cart time.

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::auth::current_user;
use crate::domain::cart::MAX_LINE_QUANTITY;
use crate::domain::{Cart, CartDesign, CartItem};
use crate::error::ApiError;
use crate::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub subtotal: i64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemView {
    pub index: usize,
    pub product_id: Uuid,
    pub name: String,
    pub slug: Option<String>,
    pub image: Option<String>,
    pub size: String,
    pub color: String,
    pub quantity: u32,
    pub customized: bool,
    pub unit_price: i64,
    pub customization_fee: i64,
    pub line_total: i64,
    pub in_stock: bool,
}

/// Enriches cart lines with live catalog display data. Pricing stays the
/// snapshot; only availability reflects the live product.
async fn cart_view(state: &AppState, cart: &Cart) -> Result<CartView, ApiError> {
    let mut items = Vec::with_capacity(cart.items.len());
    for (index, line) in cart.items.iter().enumerate() {
        let product = state.catalog.product(line.product_id).await?;
        let in_stock = product
            .as_ref()
            .filter(|p| p.active)
            .and_then(|p| p.variant(&line.size, &line.color))
            .map_or(false, |v| {
                i32::try_from(line.quantity).is_ok_and(|q| v.stock >= q)
            });
        items.push(CartItemView {
            index,
            product_id: line.product_id,
            name: line.name.clone(),
            slug: product.as_ref().map(|p| p.slug.clone()),
            image: product.as_ref().and_then(|p| p.images.first().cloned()),
            size: line.size.clone(),
            color: line.color.clone(),
            quantity: line.quantity,
            customized: line.customized,
            unit_price: line.unit_price,
            customization_fee: line.customization_fee,
            line_total: (line.unit_price + line.customization_fee) * i64::from(line.quantity),
            in_stock,
        });
    }
    Ok(CartView {
        subtotal: crate::checkout::assembler::subtotal(cart),
        items,
        updated_at: cart.updated_at,
    })
}

pub async fn get_cart(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<CartView>, ApiError> {
    let user = current_user(state.auth.as_ref(), &headers).await?;
    let cart = state
        .carts
        .cart(user.id)
        .await?
        .unwrap_or_else(|| Cart::new(user.id));
    Ok(Json(cart_view(&state, &cart).await?))
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    #[validate(length(min = 1))]
    pub size: String,
    #[validate(length(min = 1))]
    pub color: String,
    #[validate(range(min = 1))]
    pub quantity: u32,
    #[serde(default)]
    pub design: Option<CartDesign>,
}

pub async fn add_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AddToCartRequest>,
) -> Result<(StatusCode, Json<CartView>), ApiError> {
    let user = current_user(state.auth.as_ref(), &headers).await?;
    req.validate()?;
    if req.quantity > MAX_LINE_QUANTITY {
        return Err(ApiError::Validation(format!(
            "quantity must be at most {MAX_LINE_QUANTITY}"
        )));
    }

    let product = state
        .catalog
        .product(req.product_id)
        .await?
        .filter(|p| p.active)
        .ok_or(ApiError::ProductNotFound {
            product_id: req.product_id,
        })?;
    product
        .variant(&req.size, &req.color)
        .ok_or_else(|| ApiError::VariantNotFound {
            product_id: req.product_id,
            size: req.size.clone(),
            color: req.color.clone(),
        })?;
    let customized = req.design.is_some();
    if customized && !product.customizable {
        return Err(ApiError::Validation(format!(
            "product {} does not allow customization",
            product.slug
        )));
    }

    let mut cart = state
        .carts
        .cart(user.id)
        .await?
        .unwrap_or_else(|| Cart::new(user.id));
    cart.add_item(CartItem {
        product_id: product.id,
        name: product.name.clone(),
        size: req.size,
        color: req.color,
        quantity: req.quantity,
        customized,
        design: req.design,
        unit_price: product.base_price,
        customization_fee: if customized {
            product.customization_fee
        } else {
            0
        },
    });
    state.carts.put_cart(&cart).await?;
    Ok((StatusCode::CREATED, Json(cart_view(&state, &cart).await?)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartRequest {
    pub item_index: usize,
    /// Zero or negative removes the line.
    pub quantity: i64,
}

pub async fn set_quantity(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<UpdateCartRequest>,
) -> Result<Json<CartView>, ApiError> {
    let user = current_user(state.auth.as_ref(), &headers).await?;
    if req.quantity > i64::from(MAX_LINE_QUANTITY) {
        return Err(ApiError::Validation(format!(
            "quantity must be at most {MAX_LINE_QUANTITY}"
        )));
    }
    let mut cart = state.carts.cart(user.id).await?.ok_or(ApiError::EmptyCart)?;
    if !cart.set_quantity(req.item_index, req.quantity) {
        return Err(ApiError::Validation(format!(
            "no cart line at index {}",
            req.item_index
        )));
    }
    persist(&state, &cart).await?;
    Ok(Json(cart_view(&state, &cart).await?))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveParams {
    pub item_index: Option<usize>,
}

/// Removes one line when `itemIndex` is given, otherwise drops the whole
/// cart.
pub async fn remove(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<RemoveParams>,
) -> Result<StatusCode, ApiError> {
    let user = current_user(state.auth.as_ref(), &headers).await?;
    match params.item_index {
        None => state.carts.delete_cart(user.id).await?,
        Some(index) => {
            let mut cart = state.carts.cart(user.id).await?.ok_or(ApiError::EmptyCart)?;
            if !cart.remove_item(index) {
                return Err(ApiError::Validation(format!("no cart line at index {index}")));
            }
            persist(&state, &cart).await?;
        }
    }
    Ok(StatusCode::NO_CONTENT)
}

/// An emptied cart is deleted rather than stored: zero items means no cart.
async fn persist(state: &AppState, cart: &Cart) -> Result<(), ApiError> {
    if cart.is_empty() {
        state.carts.delete_cart(cart.user_id).await?;
    } else {
        state.carts.put_cart(cart).await?;
    }
    Ok(())
}
