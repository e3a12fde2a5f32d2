//! Durable design assets and the normalized order-line design shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Positioning rectangle, in percentages of the normalized print canvas.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub rotation: f64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignFile {
    pub name: String,
    pub mime: String,
    pub size: u64,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

impl ReviewStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// A materialized, attributable design asset. Created once at order placement
/// (or earlier when saved to a personal library); only `status` changes after
/// that. Rows and their blobs are removed by the retention sweep.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CustomDesign {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub url: String,
    pub file: DesignFile,
    pub print_area: Option<Rect>,
    pub position: Option<Rect>,
    /// Which product view this belongs to: "view-N" or a legacy area name.
    pub design_type: String,
    pub order_id: Option<Uuid>,
    pub saved_to_library: bool,
    pub status: ReviewStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Normalized design reference embedded in an order line. The materializer is
/// the only place the ephemeral cart shapes are resolved; everything
/// downstream sees this.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum OrderItemDesign {
    /// Current numbered-view format.
    Views { views: Vec<MaterializedView> },
    /// Legacy named-area format, URLs only.
    Areas {
        #[serde(skip_serializing_if = "Option::is_none")]
        front: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        back: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        wraparound: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        preview: Option<String>,
    },
    /// Reference to a design materialized before checkout (saved library).
    Saved { design_id: Uuid, url: String },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterializedView {
    pub view: u32,
    pub design_id: Uuid,
    pub url: String,
    pub position: Rect,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
}
