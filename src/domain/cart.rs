//! Server-held cart. One cart per user; a cart with zero items is treated
//! the same as no cart at all.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::design::Rect;

/// Upper bound on a single line's quantity. Keeps quantities far inside i32
/// range so stock arithmetic never wraps.
pub const MAX_LINE_QUANTITY: u32 = 100;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cart {
    pub user_id: Uuid,
    pub items: Vec<CartItem>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            items: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Adds a line, merging quantity into an identical non-customized line.
    pub fn add_item(&mut self, item: CartItem) {
        if item.design.is_none() {
            if let Some(existing) = self.items.iter_mut().find(|i| {
                i.design.is_none()
                    && i.product_id == item.product_id
                    && i.size == item.size
                    && i.color == item.color
            }) {
                existing.quantity = existing.quantity.saturating_add(item.quantity);
                self.touch();
                return;
            }
        }
        self.items.push(item);
        self.touch();
    }

    /// Sets a line's quantity; zero or below removes the line, anything above
    /// [`MAX_LINE_QUANTITY`] is clamped to it.
    pub fn set_quantity(&mut self, index: usize, quantity: i64) -> bool {
        if index >= self.items.len() {
            return false;
        }
        if quantity <= 0 {
            self.items.remove(index);
        } else {
            self.items[index].quantity = quantity.min(i64::from(MAX_LINE_QUANTITY)) as u32;
        }
        self.touch();
        true
    }

    pub fn remove_item(&mut self, index: usize) -> bool {
        if index >= self.items.len() {
            return false;
        }
        self.items.remove(index);
        self.touch();
        true
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// A prospective order line. Pricing is a snapshot taken at add-to-cart time;
/// checkout re-validates existence and stock but never re-reads prices.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: Uuid,
    /// Display-name snapshot.
    pub name: String,
    pub size: String,
    pub color: String,
    pub quantity: u32,
    pub customized: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub design: Option<CartDesign>,
    /// Minor units, copied from the product when the line was added.
    pub unit_price: i64,
    /// Minor units; zero when the line is not customized.
    pub customization_fee: i64,
}

/// Ephemeral client-supplied design payload attached to a cart line.
///
/// Untagged on the wire: the current view format and the saved reference have
/// required fields, the legacy area shape is matched last and rejects unknown
/// keys so it cannot swallow the others.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CartDesign {
    Views(ViewPayload),
    Saved(SavedDesignRef),
    Areas(AreaPayload),
}

/// Current format: a small library of inline images plus one placement per
/// product view referencing a library entry.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewPayload {
    pub library: Vec<LibraryImage>,
    pub views: Vec<ViewPlacement>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryImage {
    pub id: String,
    /// Inline image payload, base64 or a data URL.
    pub data: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub mime: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewPlacement {
    pub view: u32,
    pub image_id: String,
    pub position: Rect,
    /// Optional pre-composited preview of the placed design; uploaded
    /// best-effort.
    #[serde(default)]
    pub preview: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedDesignRef {
    pub design_id: Uuid,
}

/// Legacy format: up to four named slots, each either a plain URL (already
/// stored, passed through) or inline data.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AreaPayload {
    #[serde(default)]
    pub front: Option<String>,
    #[serde(default)]
    pub back: Option<String>,
    #[serde(default)]
    pub wraparound: Option<String>,
    #[serde(default)]
    pub preview: Option<String>,
}
