//! End-to-end pipeline tests over the in-memory stores.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use printworks::auth::{StaticAuthenticator, User};
use printworks::checkout::assembler::PricingPolicy;
use printworks::checkout::{lifecycle, place_order, CheckoutInput};
use printworks::domain::cart::{LibraryImage, SavedDesignRef, ViewPayload, ViewPlacement};
use printworks::domain::{
    Address, Cart, CartDesign, CartItem, Category, OrderStatus, PaymentMethod, PaymentStatus,
    Product, Rect, Variant,
};
use printworks::error::ApiError;
use printworks::notify::Notifier;
use printworks::objectstore::MemoryObjectStore;
use printworks::store::memory::MemoryStore;
use printworks::store::{CartStore, OrderStore};
use printworks::AppState;

const PIXEL: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8BQDwAEhQGAhKmMIQAAAABJRU5ErkJggg==";

struct Fixture {
    state: AppState,
    store: MemoryStore,
    blobs: Arc<MemoryObjectStore>,
    user: User,
}

fn fixture() -> Fixture {
    let store = MemoryStore::new();
    let blobs = Arc::new(MemoryObjectStore::default());
    let user = User {
        id: Uuid::new_v4(),
        email: "buyer@example.com".into(),
        is_admin: false,
    };
    let state = AppState {
        catalog: Arc::new(store.clone()),
        carts: Arc::new(store.clone()),
        orders: Arc::new(store.clone()),
        designs: Arc::new(store.clone()),
        blobs: blobs.clone(),
        promos: Arc::new(store.clone()),
        auth: Arc::new(StaticAuthenticator::default()),
        notifier: Notifier::disabled(),
        pricing: PricingPolicy::default(),
        cron_secret: Some("secret".into()),
        retention_days: 90,
    };
    Fixture {
        state,
        store,
        blobs,
        user,
    }
}

fn product(stock: i32) -> Product {
    Product {
        id: Uuid::new_v4(),
        name: "Classic Tee".into(),
        slug: "classic-tee".into(),
        description: "100% cotton".into(),
        category: Category::Tshirt,
        base_price: 500,
        customization_fee: 100,
        images: vec!["https://cdn.example/tee.png".into()],
        variants: vec![Variant {
            size: "M".into(),
            color: "Red".into(),
            sku: "TEE-M-RED".into(),
            stock,
        }],
        customizable: true,
        active: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn line(product: &Product, qty: u32, design: Option<CartDesign>) -> CartItem {
    let customized = design.is_some();
    CartItem {
        product_id: product.id,
        name: product.name.clone(),
        size: "M".into(),
        color: "Red".into(),
        quantity: qty,
        customized,
        design,
        unit_price: product.base_price,
        customization_fee: if customized {
            product.customization_fee
        } else {
            0
        },
    }
}

async fn seed_cart(fx: &Fixture, items: Vec<CartItem>) {
    let mut cart = Cart::new(fx.user.id);
    for item in items {
        cart.add_item(item);
    }
    fx.store.put_cart(&cart).await.unwrap();
}

fn checkout_input() -> CheckoutInput {
    CheckoutInput {
        shipping_address: Address {
            name: "A Buyer".into(),
            phone: "9999999999".into(),
            line1: "1 Main St".into(),
            line2: None,
            city: "Pune".into(),
            state: "MH".into(),
            postal_code: "411001".into(),
            country: "IN".into(),
        },
        payment_method: PaymentMethod::CashOnDelivery,
        gateway_ref: None,
        manual_proof: None,
        promo_code: None,
    }
}

fn view_design(image_id: &str, referenced_id: &str) -> CartDesign {
    CartDesign::Views(ViewPayload {
        library: vec![LibraryImage {
            id: image_id.into(),
            data: PIXEL.into(),
            name: Some("logo.png".into()),
            mime: Some("image/png".into()),
        }],
        views: vec![ViewPlacement {
            view: 0,
            image_id: referenced_id.into(),
            position: Rect {
                x: 10.0,
                y: 10.0,
                width: 40.0,
                height: 40.0,
                rotation: 0.0,
            },
            preview: None,
        }],
    })
}

// Scenario A: happy path decrements stock, deletes the cart, prices the
// order from the snapshot.
#[tokio::test]
async fn order_placement_commits_stock_and_clears_cart() {
    let fx = fixture();
    let p = product(5);
    fx.store.seed_product(p.clone()).await;
    seed_cart(&fx, vec![line(&p, 2, None)]).await;

    let order = place_order(&fx.state, &fx.user, checkout_input())
        .await
        .unwrap();

    assert_eq!(order.total, 1000);
    assert_eq!(order.subtotal, 1000);
    assert_eq!(order.status, OrderStatus::Confirmed);
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert_eq!(fx.store.variant_stock(p.id, "M", "Red").await, Some(3));
    assert!(fx.store.cart(fx.user.id).await.unwrap().is_none());

    // PW-YYYY-NNNNN
    let parts: Vec<&str> = order.order_number.split('-').collect();
    assert_eq!(parts[0], "PW");
    assert_eq!(parts[1].len(), 4);
    assert_eq!(parts[2].len(), 5);
    assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
    assert!(parts[2].chars().all(|c| c.is_ascii_digit()));
}

// Scenario B: insufficient stock rejects the order with no writes at all.
#[tokio::test]
async fn insufficient_stock_leaves_everything_untouched() {
    let fx = fixture();
    let p = product(1);
    fx.store.seed_product(p.clone()).await;
    seed_cart(&fx, vec![line(&p, 2, None)]).await;

    let err = place_order(&fx.state, &fx.user, checkout_input())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InsufficientStock { .. }));
    assert_eq!(fx.store.variant_stock(p.id, "M", "Red").await, Some(1));
    assert_eq!(fx.store.order_count().await, 0);
    assert!(fx.store.cart(fx.user.id).await.unwrap().is_some());
}

// A quantity past i32::MAX used to wrap negative, pass validation against a
// tiny stock, and then grow the inventory at commit.
#[tokio::test]
async fn wrapping_quantity_cannot_mint_stock() {
    let fx = fixture();
    let p = product(5);
    fx.store.seed_product(p.clone()).await;
    seed_cart(&fx, vec![line(&p, 4_000_000_000, None)]).await;

    let err = place_order(&fx.state, &fx.user, checkout_input())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InsufficientStock { .. }));
    assert_eq!(fx.store.variant_stock(p.id, "M", "Red").await, Some(5));
    assert_eq!(fx.store.order_count().await, 0);
}

#[tokio::test]
async fn empty_cart_is_rejected() {
    let fx = fixture();
    let err = place_order(&fx.state, &fx.user, checkout_input())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::EmptyCart));
}

// Scenario C: one dangling library reference aborts the whole order even
// though the other line was fine, and the attempt's uploads are unwound.
#[tokio::test]
async fn dangling_design_reference_aborts_whole_order() {
    let fx = fixture();
    let p = product(10);
    fx.store.seed_product(p.clone()).await;
    seed_cart(
        &fx,
        vec![
            line(&p, 1, None),
            line(&p, 1, Some(view_design("img-1", "missing-id"))),
        ],
    )
    .await;

    let err = place_order(&fx.state, &fx.user, checkout_input())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::AssetMaterializationFailed { .. }));
    assert_eq!(fx.store.order_count().await, 0);
    assert_eq!(fx.store.variant_stock(p.id, "M", "Red").await, Some(10));
    assert!(fx.store.cart(fx.user.id).await.unwrap().is_some());
    assert_eq!(fx.blobs.len().await, 0);
}

#[tokio::test]
async fn customized_order_materializes_designs() {
    let fx = fixture();
    let p = product(4);
    fx.store.seed_product(p.clone()).await;
    seed_cart(&fx, vec![line(&p, 1, Some(view_design("img-1", "img-1")))]).await;

    let order = place_order(&fx.state, &fx.user, checkout_input())
        .await
        .unwrap();

    // unit 500 + fee 100
    assert_eq!(order.total, 600);
    assert!(order.items[0].customized);
    assert!(order.items[0].design.is_some());
    assert_eq!(fx.store.design_count().await, 1);
    assert_eq!(fx.blobs.len().await, 1);
}

#[tokio::test]
async fn missing_saved_design_aborts() {
    let fx = fixture();
    let p = product(4);
    fx.store.seed_product(p.clone()).await;
    seed_cart(
        &fx,
        vec![line(
            &p,
            1,
            Some(CartDesign::Saved(SavedDesignRef {
                design_id: Uuid::new_v4(),
            })),
        )],
    )
    .await;

    let err = place_order(&fx.state, &fx.user, checkout_input())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::AssetMaterializationFailed { .. }));
    assert_eq!(fx.store.order_count().await, 0);
}

#[tokio::test]
async fn promo_discount_reduces_total() {
    let fx = fixture();
    let p = product(5);
    fx.store.seed_product(p.clone()).await;
    fx.store.seed_promo("WELCOME", 150, 0).await;
    seed_cart(&fx, vec![line(&p, 2, None)]).await;

    let mut input = checkout_input();
    input.promo_code = Some("WELCOME".into());
    let order = place_order(&fx.state, &fx.user, input).await.unwrap();
    assert_eq!(order.discount, 150);
    assert_eq!(order.total, order.subtotal + order.shipping - order.discount);
    assert_eq!(order.promo_code.as_deref(), Some("WELCOME"));
}

#[tokio::test]
async fn unknown_promo_code_rejects_before_any_write() {
    let fx = fixture();
    let p = product(5);
    fx.store.seed_product(p.clone()).await;
    seed_cart(&fx, vec![line(&p, 1, None)]).await;

    let mut input = checkout_input();
    input.promo_code = Some("NOPE".into());
    let err = place_order(&fx.state, &fx.user, input).await.unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
    assert_eq!(fx.store.order_count().await, 0);
    assert_eq!(fx.store.variant_stock(p.id, "M", "Red").await, Some(5));
}

// Scenario D: delivery forces payment to paid (COD collected at the door).
#[tokio::test]
async fn delivery_forces_payment_paid() {
    let fx = fixture();
    let p = product(5);
    fx.store.seed_product(p.clone()).await;
    seed_cart(&fx, vec![line(&p, 1, None)]).await;
    let order = place_order(&fx.state, &fx.user, checkout_input())
        .await
        .unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Pending);

    lifecycle::change_status(
        fx.state.catalog.as_ref(),
        fx.state.orders.as_ref(),
        &order,
        OrderStatus::Delivered,
    )
    .await
    .unwrap();

    let updated = fx.store.order(order.id).await.unwrap().unwrap();
    assert_eq!(updated.status, OrderStatus::Delivered);
    assert_eq!(updated.payment_status, PaymentStatus::Paid);
}

// Scenario E: cancellation restores each line's stock exactly once.
#[tokio::test]
async fn cancellation_restores_stock_exactly_once() {
    let fx = fixture();
    let p = product(5);
    fx.store.seed_product(p.clone()).await;
    seed_cart(&fx, vec![line(&p, 2, None)]).await;
    let order = place_order(&fx.state, &fx.user, checkout_input())
        .await
        .unwrap();
    assert_eq!(fx.store.variant_stock(p.id, "M", "Red").await, Some(3));

    lifecycle::change_status(
        fx.state.catalog.as_ref(),
        fx.state.orders.as_ref(),
        &order,
        OrderStatus::Cancelled,
    )
    .await
    .unwrap();
    assert_eq!(fx.store.variant_stock(p.id, "M", "Red").await, Some(5));

    // A second cancel is rejected by the status guard and cannot
    // double-credit.
    let cancelled = fx.store.order(order.id).await.unwrap().unwrap();
    let err = lifecycle::change_status(
        fx.state.catalog.as_ref(),
        fx.state.orders.as_ref(),
        &cancelled,
        OrderStatus::Cancelled,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::InvalidTransition { .. }));
    assert_eq!(fx.store.variant_stock(p.id, "M", "Red").await, Some(5));
}

#[tokio::test]
async fn failed_payment_cancels_and_restores() {
    let fx = fixture();
    let p = product(5);
    fx.store.seed_product(p.clone()).await;
    seed_cart(&fx, vec![line(&p, 2, None)]).await;
    let order = place_order(&fx.state, &fx.user, checkout_input())
        .await
        .unwrap();
    assert_eq!(fx.store.variant_stock(p.id, "M", "Red").await, Some(3));

    lifecycle::change_payment_status(
        fx.state.catalog.as_ref(),
        fx.state.orders.as_ref(),
        &order,
        PaymentStatus::Failed,
    )
    .await
    .unwrap();

    let updated = fx.store.order(order.id).await.unwrap().unwrap();
    assert_eq!(updated.status, OrderStatus::Cancelled);
    assert_eq!(updated.payment_status, PaymentStatus::Failed);
    assert_eq!(fx.store.variant_stock(p.id, "M", "Red").await, Some(5));
}

#[tokio::test]
async fn orders_list_newest_first() {
    let fx = fixture();
    let p = product(10);
    fx.store.seed_product(p.clone()).await;

    seed_cart(&fx, vec![line(&p, 1, None)]).await;
    let first = place_order(&fx.state, &fx.user, checkout_input())
        .await
        .unwrap();
    seed_cart(&fx, vec![line(&p, 1, None)]).await;
    let second = place_order(&fx.state, &fx.user, checkout_input())
        .await
        .unwrap();

    let orders = fx.store.orders_for_user(fx.user.id).await.unwrap();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0].id, second.id);
    assert_eq!(orders[1].id, first.id);
}

#[tokio::test]
async fn totals_invariant_holds_for_mixed_cart() {
    let fx = fixture();
    let p = product(10);
    fx.store.seed_product(p.clone()).await;
    seed_cart(
        &fx,
        vec![
            line(&p, 3, None),
            line(&p, 1, Some(view_design("img-1", "img-1"))),
        ],
    )
    .await;

    let order = place_order(&fx.state, &fx.user, checkout_input())
        .await
        .unwrap();
    assert_eq!(order.total, order.subtotal + order.shipping - order.discount);
    for item in &order.items {
        assert_eq!(
            item.item_total,
            (item.unit_price + item.customization_fee) * i64::from(item.quantity)
        );
    }
    assert_eq!(order.subtotal, 3 * 500 + 600);
}
