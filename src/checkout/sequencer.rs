//! The ordered commit sequence. Once the order document is inserted it is
//! the source of truth: every later step degrades to a warning rather than
//! failing the order.

use chrono::Datelike;

use crate::auth::User;
use crate::domain::{Order, OrderItem};
use crate::error::ApiError;
use crate::notify::{MailMessage, MailRecipient, Notification, NotificationKind};
use crate::store::{StockIntent, StoreError};
use crate::AppState;

use super::assembler;

const MAX_NUMBER_RETRIES: u32 = 5;

pub fn intent_for(item: &OrderItem) -> StockIntent {
    StockIntent {
        product_id: item.product_id,
        size: item.size.clone(),
        color: item.color.clone(),
        quantity: item.quantity,
    }
}

/// Steps, in strict order:
///
/// 1. insert order — fatal on failure, nothing else has happened yet
/// 2. notifications and mail — fire-and-forget
/// 3. conditional stock decrement per intent — shortfalls logged, applied
///    decrements never rolled back
/// 4. delete the cart — a stale cart is confusion, not corruption
pub async fn commit_order(
    state: &AppState,
    user: &User,
    mut order: Order,
    intents: &[StockIntent],
) -> Result<Order, ApiError> {
    let mut retries = 0;
    loop {
        match state.orders.insert_order(&order).await {
            Ok(()) => break,
            Err(StoreError::Duplicate(_)) if retries < MAX_NUMBER_RETRIES => {
                retries += 1;
                order.order_number = assembler::order_number(order.created_at.year());
            }
            Err(e) => return Err(e.into()),
        }
    }
    tracing::info!(
        order_number = %order.order_number,
        user_id = %user.id,
        total = order.total,
        "order committed"
    );

    let customized = order.items.iter().any(|i| i.customized);
    state
        .notifier
        .notify(Notification {
            kind: if customized {
                NotificationKind::CustomizedOrder
            } else {
                NotificationKind::NewOrder
            },
            title: if customized {
                "New customized order".to_string()
            } else {
                "New order".to_string()
            },
            message: format!("Order {} placed for {}", order.order_number, order.total),
            order_id: order.id,
            order_number: order.order_number.clone(),
            is_read: false,
        })
        .await;
    state
        .notifier
        .mail(MailMessage {
            to: MailRecipient::Customer(user.email.clone()),
            template: "order_confirmation",
            order_number: order.order_number.clone(),
            total: order.total,
        })
        .await;
    state
        .notifier
        .mail(MailMessage {
            to: MailRecipient::Admin,
            template: "admin_new_order",
            order_number: order.order_number.clone(),
            total: order.total,
        })
        .await;

    for intent in intents {
        match state.catalog.decrement_stock(intent).await {
            Ok(true) => {}
            // A concurrent order won this stock between validation and
            // commit. The order stands; inventory reconciles against it.
            Ok(false) => tracing::warn!(
                order_number = %order.order_number,
                product_id = %intent.product_id,
                size = %intent.size,
                color = %intent.color,
                quantity = intent.quantity,
                "stock shortfall at commit"
            ),
            Err(e) => tracing::warn!(
                order_number = %order.order_number,
                product_id = %intent.product_id,
                error = %e,
                "stock decrement failed"
            ),
        }
    }

    if let Err(e) = state.carts.delete_cart(user.id).await {
        tracing::warn!(user_id = %user.id, error = %e, "cart cleanup failed after order commit");
    }

    Ok(order)
}
