//! Storage seam. The checkout core talks to these traits; production wires
//! [`postgres::PgStore`], tests and the no-database dev mode wire
//! [`memory::MemoryStore`].
//!
//! There is deliberately no cross-collection transaction here: the commit
//! sequence relies on ordered steps with per-step failure policy, and the
//! only multi-writer hazard (variant stock) is handled by conditional
//! single-row updates.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{Cart, CustomDesign, Order, OrderStatus, PaymentStatus, Product};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Duplicate key: {0}")]
    Duplicate(String),
    #[error("Storage error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                return Self::Duplicate(db.message().to_string());
            }
        }
        Self::Backend(e.to_string())
    }
}

/// A validated stock mutation: decrement at commit, increment on cancel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StockIntent {
    pub product_id: Uuid,
    pub size: String,
    pub color: String,
    pub quantity: u32,
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn product(&self, id: Uuid) -> Result<Option<Product>, StoreError>;

    /// Atomically decrements variant stock, only if enough remains. Returns
    /// false when a concurrent order took the stock first.
    async fn decrement_stock(&self, intent: &StockIntent) -> Result<bool, StoreError>;

    async fn increment_stock(&self, intent: &StockIntent) -> Result<(), StoreError>;
}

#[async_trait]
pub trait CartStore: Send + Sync {
    async fn cart(&self, user_id: Uuid) -> Result<Option<Cart>, StoreError>;
    async fn put_cart(&self, cart: &Cart) -> Result<(), StoreError>;
    async fn delete_cart(&self, user_id: Uuid) -> Result<(), StoreError>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Fails with [`StoreError::Duplicate`] on an order-number collision so
    /// the sequencer can re-roll the number.
    async fn insert_order(&self, order: &Order) -> Result<(), StoreError>;

    async fn order(&self, id: Uuid) -> Result<Option<Order>, StoreError>;

    /// Newest first.
    async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, StoreError>;

    async fn set_status(
        &self,
        id: Uuid,
        status: OrderStatus,
        payment_status: Option<PaymentStatus>,
    ) -> Result<(), StoreError>;

    async fn set_payment_status(
        &self,
        id: Uuid,
        payment_status: PaymentStatus,
    ) -> Result<(), StoreError>;

    /// Orders in `status` last touched before `cutoff`, for the retention
    /// sweep.
    async fn orders_in_status_before(
        &self,
        status: OrderStatus,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Order>, StoreError>;
}

#[async_trait]
pub trait DesignStore: Send + Sync {
    async fn insert_design(&self, design: &CustomDesign) -> Result<(), StoreError>;
    async fn design(&self, id: Uuid) -> Result<Option<CustomDesign>, StoreError>;
    async fn designs_for_order(&self, order_id: Uuid) -> Result<Vec<CustomDesign>, StoreError>;
    async fn delete_designs_for_order(&self, order_id: Uuid) -> Result<u64, StoreError>;
}
