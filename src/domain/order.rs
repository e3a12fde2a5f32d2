//! Orders and the status state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

use super::design::OrderItemDesign;

/// Immutable record of a committed transaction. Only `status` and
/// `payment_status` change after creation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    /// Human-readable identifier, `PW-YYYY-NNNNN`. Surfaces in emails and
    /// invoices, so the format is an external contract.
    pub order_number: String,
    pub user_id: Uuid,
    pub items: Vec<OrderItem>,
    /// Point-in-time copy, never a reference.
    pub shipping_address: Address,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_ref: Option<GatewayRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_proof: Option<ManualProof>,
    pub status: OrderStatus,
    pub subtotal: i64,
    pub shipping: i64,
    pub discount: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promo_code: Option<String>,
    /// Always `subtotal + shipping - discount`, computed once at creation.
    pub total: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: Uuid,
    pub name: String,
    pub size: String,
    pub color: String,
    pub quantity: u32,
    pub customized: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub design: Option<OrderItemDesign>,
    pub unit_price: i64,
    pub customization_fee: i64,
    /// `(unit_price + customization_fee) * quantity`, computed once.
    pub item_total: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub name: String,
    pub phone: String,
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Gateway,
    CashOnDelivery,
    ManualUpi,
    ManualQr,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gateway => "gateway",
            Self::CashOnDelivery => "cash_on_delivery",
            Self::ManualUpi => "manual_upi",
            Self::ManualQr => "manual_qr",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "gateway" => Some(Self::Gateway),
            "cash_on_delivery" => Some(Self::CashOnDelivery),
            "manual_upi" => Some(Self::ManualUpi),
            "manual_qr" => Some(Self::ManualQr),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "paid" => Some(Self::Paid),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayRef {
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualProof {
    pub transaction_id: String,
    pub screenshot_url: String,
    pub method: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

/// Side effects a status change requires of the caller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatusChange {
    /// Increment each line's variant stock back. Set only when cancelling an
    /// order whose stock was actually decremented, so a cancel can never
    /// double-credit.
    pub restore_stock: bool,
    /// Force payment status to paid (delivery of a COD order).
    pub force_paid: bool,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "processing" => Some(Self::Processing),
            "shipped" => Some(Self::Shipped),
            "delivered" => Some(Self::Delivered),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Stock was decremented for orders that reached any of these states.
    fn stock_committed(self) -> bool {
        matches!(self, Self::Confirmed | Self::Processing | Self::Shipped)
    }

    /// Position along the fulfilment chain. Cancellation sits outside it and
    /// is handled separately.
    fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Confirmed => 1,
            Self::Processing => 2,
            Self::Shipped => 3,
            Self::Delivered => 4,
            Self::Cancelled => 5,
        }
    }

    /// Validates a transition and reports the side effects it carries.
    /// Fulfilment only moves forward along the chain; skipping ahead is
    /// allowed, moving back is not.
    pub fn transition_to(self, target: Self) -> Result<StatusChange, ApiError> {
        let invalid = || ApiError::InvalidTransition {
            from: self.as_str().to_string(),
            to: target.as_str().to_string(),
        };
        if self == Self::Cancelled {
            return Err(invalid());
        }
        match target {
            Self::Cancelled => match self {
                Self::Delivered => Err(invalid()),
                prior => Ok(StatusChange {
                    restore_stock: prior.stock_committed(),
                    force_paid: false,
                }),
            },
            _ if target.rank() <= self.rank() => Err(invalid()),
            Self::Delivered => Ok(StatusChange {
                restore_stock: false,
                force_paid: true,
            }),
            _ => Ok(StatusChange::default()),
        }
    }
}
