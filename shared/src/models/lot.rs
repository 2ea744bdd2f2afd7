//! Stock lot models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A physical, cost-bearing batch of an item received into a warehouse
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockLot {
    pub id: Uuid,
    /// Human-readable lot identifier (e.g., "LOT-1718000000-3F9A1C")
    pub lot_code: String,
    pub item_id: Uuid,
    pub warehouse_id: i64,
    pub batch_no: String,
    /// Remaining quantity; only drains after receipt
    pub quantity: Decimal,
    /// Fixed per lot
    pub unit_cost: Decimal,
    /// Receipt value: received quantity * unit cost
    pub total_cost: Decimal,
    pub expiry_date: Option<NaiveDate>,
    pub supplier: String,
    pub status: LotStatus,
    pub notes: Option<String>,
    pub received_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StockLot {
    /// Lots that FIFO allocation may draw from
    pub fn is_allocatable(&self) -> bool {
        self.status == LotStatus::Available && self.quantity > Decimal::ZERO
    }

    /// Value of what is still on hand at the lot's fixed unit cost
    pub fn remaining_value(&self) -> Decimal {
        self.quantity * self.unit_cost
    }
}

/// Status of a stock lot
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LotStatus {
    #[default]
    Available,
    /// Locked against a pending allocation
    Reserved,
    Expired,
    /// Quantity reached zero; terminal
    Depleted,
}

impl LotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LotStatus::Available => "available",
            LotStatus::Reserved => "reserved",
            LotStatus::Expired => "expired",
            LotStatus::Depleted => "depleted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "available" => Some(LotStatus::Available),
            "reserved" => Some(LotStatus::Reserved),
            "expired" => Some(LotStatus::Expired),
            "depleted" => Some(LotStatus::Depleted),
            _ => None,
        }
    }
}

impl std::fmt::Display for LotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
