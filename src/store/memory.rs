//! In-memory implementation of the storage seam, used by the integration
//! tests and as a dev fallback when no database is configured.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::checkout::{PromoDiscount, PromoValidator};
use crate::domain::{Cart, CustomDesign, Order, OrderStatus, PaymentStatus, Product};
use crate::error::ApiError;

use super::{CartStore, CatalogStore, DesignStore, OrderStore, StockIntent, StoreError};

#[derive(Default)]
struct Inner {
    products: RwLock<HashMap<Uuid, Product>>,
    carts: RwLock<HashMap<Uuid, Cart>>,
    orders: RwLock<HashMap<Uuid, Order>>,
    designs: RwLock<HashMap<Uuid, CustomDesign>>,
    /// code -> (discount, min_order)
    promos: RwLock<HashMap<String, (i64, i64)>>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_product(&self, product: Product) {
        self.inner
            .products
            .write()
            .await
            .insert(product.id, product);
    }

    pub async fn seed_promo(&self, code: impl Into<String>, discount: i64, min_order: i64) {
        self.inner
            .promos
            .write()
            .await
            .insert(code.into(), (discount, min_order));
    }

    pub async fn variant_stock(&self, product_id: Uuid, size: &str, color: &str) -> Option<i32> {
        self.inner
            .products
            .read()
            .await
            .get(&product_id)
            .and_then(|p| p.variant(size, color))
            .map(|v| v.stock)
    }

    pub async fn order_count(&self) -> usize {
        self.inner.orders.read().await.len()
    }

    pub async fn design_count(&self) -> usize {
        self.inner.designs.read().await.len()
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn product(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        Ok(self.inner.products.read().await.get(&id).cloned())
    }

    async fn decrement_stock(&self, intent: &StockIntent) -> Result<bool, StoreError> {
        let Ok(quantity) = i32::try_from(intent.quantity) else {
            return Ok(false);
        };
        let mut products = self.inner.products.write().await;
        let Some(variant) = products.get_mut(&intent.product_id).and_then(|p| {
            p.variants
                .iter_mut()
                .find(|v| v.size == intent.size && v.color == intent.color)
        }) else {
            return Ok(false);
        };
        if variant.stock < quantity {
            return Ok(false);
        }
        variant.stock -= quantity;
        Ok(true)
    }

    async fn increment_stock(&self, intent: &StockIntent) -> Result<(), StoreError> {
        let Ok(quantity) = i32::try_from(intent.quantity) else {
            return Ok(());
        };
        let mut products = self.inner.products.write().await;
        if let Some(variant) = products.get_mut(&intent.product_id).and_then(|p| {
            p.variants
                .iter_mut()
                .find(|v| v.size == intent.size && v.color == intent.color)
        }) {
            variant.stock += quantity;
        }
        Ok(())
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn cart(&self, user_id: Uuid) -> Result<Option<Cart>, StoreError> {
        Ok(self.inner.carts.read().await.get(&user_id).cloned())
    }

    async fn put_cart(&self, cart: &Cart) -> Result<(), StoreError> {
        self.inner
            .carts
            .write()
            .await
            .insert(cart.user_id, cart.clone());
        Ok(())
    }

    async fn delete_cart(&self, user_id: Uuid) -> Result<(), StoreError> {
        self.inner.carts.write().await.remove(&user_id);
        Ok(())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn insert_order(&self, order: &Order) -> Result<(), StoreError> {
        let mut orders = self.inner.orders.write().await;
        if orders.values().any(|o| o.order_number == order.order_number) {
            return Err(StoreError::Duplicate(order.order_number.clone()));
        }
        orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn order(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        Ok(self.inner.orders.read().await.get(&id).cloned())
    }

    async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, StoreError> {
        let mut orders: Vec<Order> = self
            .inner
            .orders
            .read()
            .await
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn set_status(
        &self,
        id: Uuid,
        status: OrderStatus,
        payment_status: Option<PaymentStatus>,
    ) -> Result<(), StoreError> {
        let mut orders = self.inner.orders.write().await;
        if let Some(order) = orders.get_mut(&id) {
            order.status = status;
            if let Some(ps) = payment_status {
                order.payment_status = ps;
            }
            order.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn set_payment_status(
        &self,
        id: Uuid,
        payment_status: PaymentStatus,
    ) -> Result<(), StoreError> {
        let mut orders = self.inner.orders.write().await;
        if let Some(order) = orders.get_mut(&id) {
            order.payment_status = payment_status;
            order.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn orders_in_status_before(
        &self,
        status: OrderStatus,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Order>, StoreError> {
        Ok(self
            .inner
            .orders
            .read()
            .await
            .values()
            .filter(|o| o.status == status && o.updated_at < cutoff)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl DesignStore for MemoryStore {
    async fn insert_design(&self, design: &CustomDesign) -> Result<(), StoreError> {
        self.inner
            .designs
            .write()
            .await
            .insert(design.id, design.clone());
        Ok(())
    }

    async fn design(&self, id: Uuid) -> Result<Option<CustomDesign>, StoreError> {
        Ok(self.inner.designs.read().await.get(&id).cloned())
    }

    async fn designs_for_order(&self, order_id: Uuid) -> Result<Vec<CustomDesign>, StoreError> {
        Ok(self
            .inner
            .designs
            .read()
            .await
            .values()
            .filter(|d| d.order_id == Some(order_id))
            .cloned()
            .collect())
    }

    async fn delete_designs_for_order(&self, order_id: Uuid) -> Result<u64, StoreError> {
        let mut designs = self.inner.designs.write().await;
        let before = designs.len();
        designs.retain(|_, d| d.order_id != Some(order_id));
        Ok((before - designs.len()) as u64)
    }
}

#[async_trait]
impl PromoValidator for MemoryStore {
    async fn validate(&self, code: &str, order_value: i64) -> Result<PromoDiscount, ApiError> {
        let promos = self.inner.promos.read().await;
        let (discount, min_order) = promos
            .get(code)
            .copied()
            .ok_or_else(|| ApiError::Validation(format!("unknown promo code: {code}")))?;
        if order_value < min_order {
            return Err(ApiError::Validation(format!(
                "promo code {code} requires a minimum order of {min_order}"
            )));
        }
        Ok(PromoDiscount {
            code: code.to_string(),
            amount: discount.min(order_value),
        })
    }
}
