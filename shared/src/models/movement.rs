//! Stock movement (audit trail) models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An immutable record of a quantity change against a lot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockMovement {
    pub id: Uuid,
    /// Human-readable movement identifier (e.g., "MOV-1718000000-0B12DE")
    pub movement_code: String,
    pub item_id: Uuid,
    /// Absent only for adjustments not tied to a lot
    pub lot_id: Option<Uuid>,
    pub warehouse_id: i64,
    #[serde(rename = "type")]
    pub movement_type: MovementType,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    /// Fixed at write time: quantity * unit_cost
    pub total_cost: Decimal,
    pub reason: String,
    pub reference: Option<String>,
    pub performed_by: String,
    pub notes: Option<String>,
    pub stock_request_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Direction/kind of a movement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    In,
    Out,
    Transfer,
    Adjustment,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::In => "in",
            MovementType::Out => "out",
            MovementType::Transfer => "transfer",
            MovementType::Adjustment => "adjustment",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "in" => Some(MovementType::In),
            "out" => Some(MovementType::Out),
            "transfer" => Some(MovementType::Transfer),
            "adjustment" => Some(MovementType::Adjustment),
            _ => None,
        }
    }
}

impl std::fmt::Display for MovementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Total value of a movement line, recorded once and never recomputed
pub fn line_cost(quantity: Decimal, unit_cost: Decimal) -> Decimal {
    quantity * unit_cost
}

/// Net quantity a set of movements applied to one lot (in minus out)
pub fn net_lot_quantity<'a>(movements: impl IntoIterator<Item = &'a StockMovement>) -> Decimal {
    movements
        .into_iter()
        .fold(Decimal::ZERO, |acc, m| match m.movement_type {
            MovementType::In => acc + m.quantity,
            MovementType::Out => acc - m.quantity,
            MovementType::Transfer | MovementType::Adjustment => acc,
        })
}
