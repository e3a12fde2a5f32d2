//! Postgres implementation of the storage seam.
//!
//! Documents keep their nested payloads (cart items, order items, addresses,
//! design metadata) in JSONB columns; variant stock lives in its own child
//! table so decrements are plain conditional row updates.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{
    Address, Cart, CartItem, Category, CustomDesign, DesignFile, GatewayRef, ManualProof, Order,
    OrderItem, OrderStatus, PaymentMethod, PaymentStatus, Product, Rect, ReviewStatus, Variant,
};

use super::{CartStore, CatalogStore, DesignStore, OrderStore, StockIntent, StoreError};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn bad_enum(column: &str, value: &str) -> StoreError {
    StoreError::Backend(format!("unrecognized {column} value: {value}"))
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    slug: String,
    description: String,
    category: String,
    base_price: i64,
    customization_fee: i64,
    images: Json<Vec<String>>,
    customizable: bool,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct VariantRow {
    size: String,
    color: String,
    sku: String,
    stock: i32,
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn product(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        let Some(row) = sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };
        let variants = sqlx::query_as::<_, VariantRow>(
            "SELECT size, color, sku, stock FROM product_variants WHERE product_id = $1",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        let category =
            Category::parse(&row.category).ok_or_else(|| bad_enum("category", &row.category))?;
        Ok(Some(Product {
            id: row.id,
            name: row.name,
            slug: row.slug,
            description: row.description,
            category,
            base_price: row.base_price,
            customization_fee: row.customization_fee,
            images: row.images.0,
            variants: variants
                .into_iter()
                .map(|v| Variant {
                    size: v.size,
                    color: v.color,
                    sku: v.sku,
                    stock: v.stock,
                })
                .collect(),
            customizable: row.customizable,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }))
    }

    async fn decrement_stock(&self, intent: &StockIntent) -> Result<bool, StoreError> {
        // Never bind a truncated quantity; an i32 overflow would go negative
        // and turn the decrement into a credit.
        let Ok(quantity) = i32::try_from(intent.quantity) else {
            return Ok(false);
        };
        let result = sqlx::query(
            "UPDATE product_variants SET stock = stock - $4 \
             WHERE product_id = $1 AND size = $2 AND color = $3 AND stock >= $4",
        )
        .bind(intent.product_id)
        .bind(&intent.size)
        .bind(&intent.color)
        .bind(quantity)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn increment_stock(&self, intent: &StockIntent) -> Result<(), StoreError> {
        let Ok(quantity) = i32::try_from(intent.quantity) else {
            return Ok(());
        };
        sqlx::query(
            "UPDATE product_variants SET stock = stock + $4 \
             WHERE product_id = $1 AND size = $2 AND color = $3",
        )
        .bind(intent.product_id)
        .bind(&intent.size)
        .bind(&intent.color)
        .bind(quantity)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct CartRow {
    user_id: Uuid,
    items: Json<Vec<CartItem>>,
    updated_at: DateTime<Utc>,
}

#[async_trait]
impl CartStore for PgStore {
    async fn cart(&self, user_id: Uuid) -> Result<Option<Cart>, StoreError> {
        let row = sqlx::query_as::<_, CartRow>("SELECT * FROM carts WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| Cart {
            user_id: r.user_id,
            items: r.items.0,
            updated_at: r.updated_at,
        }))
    }

    async fn put_cart(&self, cart: &Cart) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO carts (user_id, items, updated_at) VALUES ($1, $2, $3) \
             ON CONFLICT (user_id) DO UPDATE SET items = $2, updated_at = $3",
        )
        .bind(cart.user_id)
        .bind(Json(&cart.items))
        .bind(cart.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_cart(&self, user_id: Uuid) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM carts WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    order_number: String,
    user_id: Uuid,
    items: Json<Vec<OrderItem>>,
    shipping_address: Json<Address>,
    payment_method: String,
    payment_status: String,
    gateway_ref: Option<Json<GatewayRef>>,
    manual_proof: Option<Json<ManualProof>>,
    status: String,
    subtotal: i64,
    shipping: i64,
    discount: i64,
    promo_code: Option<String>,
    total: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self) -> Result<Order, StoreError> {
        Ok(Order {
            id: self.id,
            order_number: self.order_number,
            user_id: self.user_id,
            items: self.items.0,
            shipping_address: self.shipping_address.0,
            payment_method: PaymentMethod::parse(&self.payment_method)
                .ok_or_else(|| bad_enum("payment_method", &self.payment_method))?,
            payment_status: PaymentStatus::parse(&self.payment_status)
                .ok_or_else(|| bad_enum("payment_status", &self.payment_status))?,
            gateway_ref: self.gateway_ref.map(|j| j.0),
            manual_proof: self.manual_proof.map(|j| j.0),
            status: OrderStatus::parse(&self.status)
                .ok_or_else(|| bad_enum("status", &self.status))?,
            subtotal: self.subtotal,
            shipping: self.shipping,
            discount: self.discount,
            promo_code: self.promo_code,
            total: self.total,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn insert_order(&self, order: &Order) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO orders (id, order_number, user_id, items, shipping_address, \
             payment_method, payment_status, gateway_ref, manual_proof, status, \
             subtotal, shipping, discount, promo_code, total, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)",
        )
        .bind(order.id)
        .bind(&order.order_number)
        .bind(order.user_id)
        .bind(Json(&order.items))
        .bind(Json(&order.shipping_address))
        .bind(order.payment_method.as_str())
        .bind(order.payment_status.as_str())
        .bind(order.gateway_ref.as_ref().map(Json))
        .bind(order.manual_proof.as_ref().map(Json))
        .bind(order.status.as_str())
        .bind(order.subtotal)
        .bind(order.shipping)
        .bind(order.discount)
        .bind(&order.promo_code)
        .bind(order.total)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn order(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(OrderRow::into_order).transpose()
    }

    async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            "SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(OrderRow::into_order).collect()
    }

    async fn set_status(
        &self,
        id: Uuid,
        status: OrderStatus,
        payment_status: Option<PaymentStatus>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE orders SET status = $2, \
             payment_status = COALESCE($3, payment_status), updated_at = $4 WHERE id = $1",
        )
        .bind(id)
        .bind(status.as_str())
        .bind(payment_status.map(PaymentStatus::as_str))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_payment_status(
        &self,
        id: Uuid,
        payment_status: PaymentStatus,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE orders SET payment_status = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(payment_status.as_str())
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn orders_in_status_before(
        &self,
        status: OrderStatus,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            "SELECT * FROM orders WHERE status = $1 AND updated_at < $2 ORDER BY updated_at",
        )
        .bind(status.as_str())
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(OrderRow::into_order).collect()
    }
}

#[derive(sqlx::FromRow)]
struct DesignRow {
    id: Uuid,
    user_id: Uuid,
    product_id: Uuid,
    url: String,
    file: Json<DesignFile>,
    print_area: Option<Json<Rect>>,
    position: Option<Json<Rect>>,
    design_type: String,
    order_id: Option<Uuid>,
    saved_to_library: bool,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DesignRow {
    fn into_design(self) -> Result<CustomDesign, StoreError> {
        Ok(CustomDesign {
            id: self.id,
            user_id: self.user_id,
            product_id: self.product_id,
            url: self.url,
            file: self.file.0,
            print_area: self.print_area.map(|j| j.0),
            position: self.position.map(|j| j.0),
            design_type: self.design_type,
            order_id: self.order_id,
            saved_to_library: self.saved_to_library,
            status: ReviewStatus::parse(&self.status)
                .ok_or_else(|| bad_enum("status", &self.status))?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[async_trait]
impl DesignStore for PgStore {
    async fn insert_design(&self, design: &CustomDesign) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO custom_designs (id, user_id, product_id, url, file, print_area, \
             position, design_type, order_id, saved_to_library, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(design.id)
        .bind(design.user_id)
        .bind(design.product_id)
        .bind(&design.url)
        .bind(Json(&design.file))
        .bind(design.print_area.as_ref().map(Json))
        .bind(design.position.as_ref().map(Json))
        .bind(&design.design_type)
        .bind(design.order_id)
        .bind(design.saved_to_library)
        .bind(design.status.as_str())
        .bind(design.created_at)
        .bind(design.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn design(&self, id: Uuid) -> Result<Option<CustomDesign>, StoreError> {
        let row = sqlx::query_as::<_, DesignRow>("SELECT * FROM custom_designs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(DesignRow::into_design).transpose()
    }

    async fn designs_for_order(&self, order_id: Uuid) -> Result<Vec<CustomDesign>, StoreError> {
        let rows =
            sqlx::query_as::<_, DesignRow>("SELECT * FROM custom_designs WHERE order_id = $1")
                .bind(order_id)
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(DesignRow::into_design).collect()
    }

    async fn delete_designs_for_order(&self, order_id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM custom_designs WHERE order_id = $1")
            .bind(order_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl crate::checkout::PromoValidator for PgStore {
    async fn validate(
        &self,
        code: &str,
        order_value: i64,
    ) -> Result<crate::checkout::PromoDiscount, crate::error::ApiError> {
        let row: Option<(i64, i64)> = sqlx::query_as(
            "SELECT discount, min_order FROM promo_codes WHERE code = $1 AND active",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from)?;
        let (discount, min_order) = row.ok_or_else(|| {
            crate::error::ApiError::Validation(format!("unknown promo code: {code}"))
        })?;
        if order_value < min_order {
            return Err(crate::error::ApiError::Validation(format!(
                "promo code {code} requires a minimum order of {min_order}"
            )));
        }
        Ok(crate::checkout::PromoDiscount {
            code: code.to_string(),
            amount: discount.min(order_value),
        })
    }
}
