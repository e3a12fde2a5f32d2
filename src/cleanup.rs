//! Retention sweep: removes design and payment-proof blobs for orders past
//! the retention window, in two independent batches (delivered, cancelled)
//! under a hard wall-clock budget.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{Order, OrderItemDesign, OrderStatus};
use crate::error::ApiError;
use crate::AppState;

/// Modeled after the platform's 300-second scheduled-job ceiling.
const SWEEP_BUDGET: Duration = Duration::from_secs(300);

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub orders_scanned: u64,
    pub blobs_deleted: u64,
    pub design_rows_deleted: u64,
    pub errors: Vec<String>,
    /// The budget ran out before both batches finished.
    pub truncated: bool,
}

/// Runs both batches. One batch failing outright is recorded and must not
/// stop the other.
pub async fn sweep_expired_designs(state: &AppState, now: DateTime<Utc>) -> SweepReport {
    let cutoff = now - chrono::Duration::days(state.retention_days);
    let deadline = Instant::now() + SWEEP_BUDGET;
    let mut report = SweepReport::default();

    for status in [OrderStatus::Delivered, OrderStatus::Cancelled] {
        if let Err(e) = sweep_batch(state, status, cutoff, deadline, &mut report).await {
            report
                .errors
                .push(format!("{} batch: {e}", status.as_str()));
        }
    }
    if report.truncated {
        tracing::warn!(orders_scanned = report.orders_scanned, "retention sweep hit its budget");
    }
    report
}

async fn sweep_batch(
    state: &AppState,
    status: OrderStatus,
    cutoff: DateTime<Utc>,
    deadline: Instant,
    report: &mut SweepReport,
) -> Result<(), ApiError> {
    let orders = state.orders.orders_in_status_before(status, cutoff).await?;
    for order in orders {
        if Instant::now() >= deadline {
            report.truncated = true;
            return Ok(());
        }
        report.orders_scanned += 1;
        sweep_order(state, &order, report).await;
    }
    Ok(())
}

async fn sweep_order(state: &AppState, order: &Order, report: &mut SweepReport) {
    for url in order_blob_urls(order) {
        match state.blobs.delete(&url).await {
            Ok(()) => report.blobs_deleted += 1,
            Err(e) => report
                .errors
                .push(format!("{}: blob delete failed: {e}", order.order_number)),
        }
    }
    match state.designs.delete_designs_for_order(order.id).await {
        Ok(n) => report.design_rows_deleted += n,
        Err(e) => report
            .errors
            .push(format!("{}: design row delete failed: {e}", order.order_number)),
    }
}

/// Blob URLs this order owns. Saved-library designs are shared assets and
/// are skipped; URLs from other origins are no-ops at the object store.
fn order_blob_urls(order: &Order) -> HashSet<String> {
    let mut urls = HashSet::new();
    for item in &order.items {
        match &item.design {
            None | Some(OrderItemDesign::Saved { .. }) => {}
            Some(OrderItemDesign::Views { views }) => {
                for view in views {
                    urls.insert(view.url.clone());
                    if let Some(preview) = &view.preview_url {
                        urls.insert(preview.clone());
                    }
                }
            }
            Some(OrderItemDesign::Areas {
                front,
                back,
                wraparound,
                preview,
            }) => {
                for slot in [front, back, wraparound, preview].into_iter().flatten() {
                    urls.insert(slot.clone());
                }
            }
        }
    }
    if let Some(proof) = &order.manual_proof {
        urls.insert(proof.screenshot_url.clone());
    }
    urls
}
