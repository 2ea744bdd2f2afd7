//! Aggregate inventory statistics

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Dashboard counters for the inventory module
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InventoryStats {
    /// Active catalog items
    pub total_items: i64,
    /// Remaining value of all available lots
    pub stock_value: Decimal,
    pub total_warehouses: i64,
    /// Active items whose available quantity is at or below the reorder point
    pub low_stock_count: i64,
    /// Movements recorded in the last seven days
    pub recent_movements: i64,
}
