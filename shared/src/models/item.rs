//! Inventory item catalog models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stockable item definition (fertilizer, seed, chemicals, ...)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryItem {
    pub id: Uuid,
    /// Unique, immutable-by-convention identity key
    pub sku: String,
    pub name: String,
    pub category: String,
    /// Unit of measure (kg, liter, sack, ...)
    pub unit: String,
    /// Available quantity at or below which the item counts as low stock
    pub reorder_point: Decimal,
    pub status: ItemStatus,
    /// Unit cost of the most recent receipt (last-cost policy)
    pub avg_cost: Decimal,
    pub description: Option<String>,
    pub suppliers: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    /// Whether the given available quantity has crossed the reorder threshold
    pub fn is_low_stock(&self, available: Decimal) -> bool {
        available <= self.reorder_point
    }

    pub fn is_active(&self) -> bool {
        self.status == ItemStatus::Active
    }
}

/// Item lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    #[default]
    Active,
    Inactive,
    Discontinued,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Active => "active",
            ItemStatus::Inactive => "inactive",
            ItemStatus::Discontinued => "discontinued",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(ItemStatus::Active),
            "inactive" => Some(ItemStatus::Inactive),
            "discontinued" => Some(ItemStatus::Discontinued),
            _ => None,
        }
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
