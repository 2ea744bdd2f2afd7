//! Stock-holding location models
//!
//! Warehouses are plots owned by the surrounding application; the ledger
//! only reads them.

use serde::{Deserialize, Serialize};

/// Plot types that may hold stock
pub const STOCK_LOCATION_TYPES: &[&str] = &["storage", "warehouse"];

/// A physical stock-holding location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Warehouse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub location_type: String,
}

impl Warehouse {
    pub fn holds_stock(&self) -> bool {
        is_stock_location_type(&self.location_type)
    }
}

pub fn is_stock_location_type(location_type: &str) -> bool {
    STOCK_LOCATION_TYPES.contains(&location_type)
}
