//! Post-placement order lifecycle: status transitions and their inventory
//! side effects.

use crate::domain::{Order, OrderStatus, PaymentStatus};
use crate::error::ApiError;
use crate::store::{CatalogStore, OrderStore};

use super::sequencer::intent_for;

/// Applies a status transition. Cancelling an order whose stock was
/// decremented increments it back, exactly once; delivering forces the
/// payment to paid (COD collected at the door). Restore failures are logged,
/// not propagated — the status change is already durable.
pub async fn change_status(
    catalog: &dyn CatalogStore,
    orders: &dyn OrderStore,
    order: &Order,
    target: OrderStatus,
) -> Result<(), ApiError> {
    let change = order.status.transition_to(target)?;
    let payment = change.force_paid.then_some(PaymentStatus::Paid);
    orders.set_status(order.id, target, payment).await?;

    if change.restore_stock {
        for item in &order.items {
            let intent = intent_for(item);
            if let Err(e) = catalog.increment_stock(&intent).await {
                tracing::warn!(
                    order_number = %order.order_number,
                    product_id = %item.product_id,
                    error = %e,
                    "stock restore failed on cancellation"
                );
            }
        }
    }
    Ok(())
}

/// Sets the payment status. A failed payment on a live order cancels it and
/// restores inventory through the same guarded transition.
pub async fn change_payment_status(
    catalog: &dyn CatalogStore,
    orders: &dyn OrderStore,
    order: &Order,
    target: PaymentStatus,
) -> Result<(), ApiError> {
    orders.set_payment_status(order.id, target).await?;

    if target == PaymentStatus::Failed && order.status != OrderStatus::Cancelled {
        match change_status(catalog, orders, order, OrderStatus::Cancelled).await {
            Ok(()) => {}
            // Delivered orders cannot be cancelled; the failed payment is
            // recorded and left to back-office follow-up.
            Err(ApiError::InvalidTransition { .. }) => tracing::warn!(
                order_number = %order.order_number,
                "payment failed on an order that can no longer be cancelled"
            ),
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
