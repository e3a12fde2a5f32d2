//! Pricing & inventory validation. Read-only: every line is checked before
//! anything mutates, and prices are trusted from the cart snapshot rather
//! than re-read.

use crate::domain::Cart;
use crate::error::ApiError;
use crate::store::{CatalogStore, StockIntent};

/// Checks every cart line against the live catalog and returns the stock
/// decrements the commit sequence will apply. Deterministic and idempotent
/// for a given database state.
pub async fn validate_cart(
    catalog: &dyn CatalogStore,
    cart: &Cart,
) -> Result<Vec<StockIntent>, ApiError> {
    let mut intents = Vec::with_capacity(cart.items.len());
    for line in &cart.items {
        let product = catalog
            .product(line.product_id)
            .await?
            .filter(|p| p.active)
            .ok_or(ApiError::ProductNotFound {
                product_id: line.product_id,
            })?;
        let variant =
            product
                .variant(&line.size, &line.color)
                .ok_or_else(|| ApiError::VariantNotFound {
                    product_id: line.product_id,
                    size: line.size.clone(),
                    color: line.color.clone(),
                })?;
        // A quantity that does not fit i32 can never be satisfied and must
        // not reach the i32 stock arithmetic.
        let requested = i32::try_from(line.quantity).ok();
        if requested.map_or(true, |q| variant.stock < q) {
            return Err(ApiError::InsufficientStock {
                product: product.name.clone(),
                size: line.size.clone(),
                color: line.color.clone(),
                available: variant.stock,
                requested: line.quantity,
            });
        }
        intents.push(StockIntent {
            product_id: line.product_id,
            size: line.size.clone(),
            color: line.color.clone(),
            quantity: line.quantity,
        });
    }
    Ok(intents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Cart, CartItem, Category, Product, Variant};
    use crate::store::memory::MemoryStore;
    use chrono::Utc;
    use uuid::Uuid;

    fn product(id: Uuid, stock: i32) -> Product {
        Product {
            id,
            name: "Classic Tee".into(),
            slug: "classic-tee".into(),
            description: String::new(),
            category: Category::Tshirt,
            base_price: 500,
            customization_fee: 100,
            images: vec![],
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

    fn cart_with(product_id: Uuid, qty: u32) -> Cart {
        let mut cart = Cart::new(Uuid::new_v4());
        cart.add_item(CartItem {
            product_id,
            name: "Classic Tee".into(),
            size: "M".into(),
            color: "Red".into(),
            quantity: qty,
            customized: false,
            design: None,
            unit_price: 500,
            customization_fee: 0,
        });
        cart
    }

    #[tokio::test]
    async fn produces_intents_without_mutating_stock() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();
        store.seed_product(product(id, 5)).await;
        let intents = validate_cart(&store, &cart_with(id, 2)).await.unwrap();
        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0].quantity, 2);
        assert_eq!(store.variant_stock(id, "M", "Red").await, Some(5));
    }

    #[tokio::test]
    async fn rejects_unknown_product() {
        let store = MemoryStore::new();
        let err = validate_cart(&store, &cart_with(Uuid::new_v4(), 1))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::ProductNotFound { .. }));
    }

    #[tokio::test]
    async fn rejects_unknown_variant() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();
        store.seed_product(product(id, 5)).await;
        let mut cart = cart_with(id, 1);
        cart.items[0].size = "XXL".into();
        let err = validate_cart(&store, &cart).await.unwrap_err();
        assert!(matches!(err, ApiError::VariantNotFound { .. }));
    }

    #[tokio::test]
    async fn rejects_insufficient_stock() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();
        store.seed_product(product(id, 1)).await;
        let err = validate_cart(&store, &cart_with(id, 2)).await.unwrap_err();
        match err {
            ApiError::InsufficientStock {
                available,
                requested,
                ..
            } => {
                assert_eq!(available, 1);
                assert_eq!(requested, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    // A u32 quantity past i32::MAX used to wrap negative and slip past the
    // stock comparison.
    #[tokio::test]
    async fn rejects_quantity_beyond_i32_range() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();
        store.seed_product(product(id, 5)).await;
        let err = validate_cart(&store, &cart_with(id, 4_000_000_000))
            .await
            .unwrap_err();
        match err {
            ApiError::InsufficientStock { requested, .. } => {
                assert_eq!(requested, 4_000_000_000)
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn rejects_inactive_product() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();
        let mut p = product(id, 5);
        p.active = false;
        store.seed_product(p).await;
        let err = validate_cart(&store, &cart_with(id, 1)).await.unwrap_err();
        assert!(matches!(err, ApiError::ProductNotFound { .. }));
    }
}
