//! Catalog entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub category: Category,
    /// Unit price in minor units.
    pub base_price: i64,
    /// Surcharge applied per customized unit, in minor units.
    pub customization_fee: i64,
    pub images: Vec<String>,
    /// (size, color) pairs are unique within this list.
    pub variants: Vec<Variant>,
    pub customizable: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn variant(&self, size: &str, color: &str) -> Option<&Variant> {
        self.variants
            .iter()
            .find(|v| v.size == size && v.color == color)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Variant {
    pub size: String,
    pub color: String,
    pub sku: String,
    pub stock: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Tshirt,
    Hoodie,
    Mug,
    Poster,
    Sticker,
    ToteBag,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tshirt => "tshirt",
            Self::Hoodie => "hoodie",
            Self::Mug => "mug",
            Self::Poster => "poster",
            Self::Sticker => "sticker",
            Self::ToteBag => "tote_bag",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "tshirt" => Some(Self::Tshirt),
            "hoodie" => Some(Self::Hoodie),
            "mug" => Some(Self::Mug),
            "poster" => Some(Self::Poster),
            "sticker" => Some(Self::Sticker),
            "tote_bag" => Some(Self::ToteBag),
            _ => None,
        }
    }
}
