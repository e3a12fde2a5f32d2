//! HTTP surface.

pub mod admin;
pub mod cart;
pub mod cron;
pub mod orders;

use axum::routing::{get, post, put};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/health",
            get(|| async { Json(serde_json::json!({"status": "healthy", "service": "printworks"})) }),
        )
        .route(
            "/cart",
            get(cart::get_cart)
                .post(cart::add_item)
                .put(cart::set_quantity)
                .delete(cart::remove),
        )
        .route("/orders", post(orders::place_order).get(orders::list_orders))
        .route("/admin/orders/:id/status", put(admin::set_status))
        .route(
            "/admin/orders/:id/payment-status",
            put(admin::set_payment_status),
        )
        .route("/cron/cleanup-designs", post(cron::cleanup_designs))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
