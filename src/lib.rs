//! Printworks — print-on-demand storefront order service.
//!
//! The heart of the crate is the cart-to-order pipeline: cart validation,
//! inventory checks, design materialization (ephemeral client payloads into
//! durable priced assets), atomic order creation, inventory decrement, and
//! cart clearing, with defined partial-failure semantics at every step.
//!
//! ## Features
//! - Server-held carts with price snapshots
//! - Custom design upload in current (numbered view) and legacy (named area)
//!   formats
//! - Ordered commit sequence that degrades instead of failing once the order
//!   document exists
//! - Order status state machine with inventory restore on cancellation
//! - Retention sweep for expired design blobs

pub mod auth;
pub mod checkout;
pub mod cleanup;
pub mod config;
pub mod domain;
pub mod error;
pub mod http;
pub mod notify;
pub mod objectstore;
pub mod store;

use std::sync::Arc;

use crate::auth::Authenticator;
use crate::checkout::assembler::PricingPolicy;
use crate::checkout::PromoValidator;
use crate::notify::Notifier;
use crate::objectstore::ObjectStore;
use crate::store::{CartStore, CatalogStore, DesignStore, OrderStore};

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn CatalogStore>,
    pub carts: Arc<dyn CartStore>,
    pub orders: Arc<dyn OrderStore>,
    pub designs: Arc<dyn DesignStore>,
    pub blobs: Arc<dyn ObjectStore>,
    pub promos: Arc<dyn PromoValidator>,
    pub auth: Arc<dyn Authenticator>,
    pub notifier: Notifier,
    pub pricing: PricingPolicy,
    pub cron_secret: Option<String>,
    pub retention_days: i64,
}
