//! Typed list filters
//!
//! Every list operation takes one of these parameter objects. Each optional
//! field maps to one parameterized predicate in the store; the in-memory
//! store and the tests use `matches` directly.

use uuid::Uuid;

use crate::models::{
    InventoryItem, LotStatus, MovementType, RequestStatus, StockLot, StockMovement, StockRequest,
};

/// Normalize a raw query value: blank and `all` mean "no filter"
pub fn normalize_choice(raw: Option<&str>) -> Option<String> {
    let value = raw?.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("all") {
        None
    } else {
        Some(value.to_string())
    }
}

/// Normalize then parse a raw query value; `Err` carries the rejected text
pub fn parse_choice<T>(
    raw: Option<&str>,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Option<T>, String> {
    match normalize_choice(raw) {
        None => Ok(None),
        Some(value) => parse(&value.to_ascii_lowercase()).map(Some).ok_or(value),
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Filter for the item catalog
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    /// Matches SKU, name or description
    pub search: Option<String>,
    pub category: Option<String>,
}

impl ItemFilter {
    pub fn matches(&self, item: &InventoryItem) -> bool {
        if let Some(search) = &self.search {
            let hit = contains_ci(&item.sku, search)
                || contains_ci(&item.name, search)
                || item
                    .description
                    .as_deref()
                    .is_some_and(|d| contains_ci(d, search));
            if !hit {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if &item.category != category {
                return false;
            }
        }
        true
    }
}

/// Filter for stock lots
#[derive(Debug, Clone, Default)]
pub struct LotFilter {
    /// Matches lot code, batch label, supplier or item name
    pub search: Option<String>,
    pub item_id: Option<Uuid>,
    pub warehouse_id: Option<i64>,
    pub status: Option<LotStatus>,
}

impl LotFilter {
    /// `item_name` is the owning item's name, used by `search`
    pub fn matches(&self, lot: &StockLot, item_name: Option<&str>) -> bool {
        if let Some(search) = &self.search {
            let hit = contains_ci(&lot.lot_code, search)
                || contains_ci(&lot.batch_no, search)
                || contains_ci(&lot.supplier, search)
                || item_name.is_some_and(|n| contains_ci(n, search));
            if !hit {
                return false;
            }
        }
        self.item_id.map_or(true, |id| lot.item_id == id)
            && self.warehouse_id.map_or(true, |id| lot.warehouse_id == id)
            && self.status.map_or(true, |s| lot.status == s)
    }
}

/// Filter for the movement ledger
#[derive(Debug, Clone, Default)]
pub struct MovementFilter {
    /// Matches movement code, reason, reference or performer
    pub search: Option<String>,
    pub movement_type: Option<MovementType>,
    pub item_id: Option<Uuid>,
    pub lot_id: Option<Uuid>,
    pub warehouse_id: Option<i64>,
    pub stock_request_id: Option<Uuid>,
}

impl MovementFilter {
    pub fn matches(&self, movement: &StockMovement) -> bool {
        if let Some(search) = &self.search {
            let hit = contains_ci(&movement.movement_code, search)
                || contains_ci(&movement.reason, search)
                || movement
                    .reference
                    .as_deref()
                    .is_some_and(|r| contains_ci(r, search))
                || contains_ci(&movement.performed_by, search);
            if !hit {
                return false;
            }
        }
        self.movement_type.map_or(true, |t| movement.movement_type == t)
            && self.item_id.map_or(true, |id| movement.item_id == id)
            && self.lot_id.map_or(true, |id| movement.lot_id == Some(id))
            && self.warehouse_id.map_or(true, |id| movement.warehouse_id == id)
            && self
                .stock_request_id
                .map_or(true, |id| movement.stock_request_id == Some(id))
    }
}

/// Filter for stock requests
#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
    pub work_order_id: Option<i64>,
    pub status: Option<RequestStatus>,
    pub item_id: Option<Uuid>,
}

impl RequestFilter {
    pub fn matches(&self, request: &StockRequest) -> bool {
        self.work_order_id.map_or(true, |id| request.work_order_id == id)
            && self.status.map_or(true, |s| request.status == s)
            && self.item_id.map_or(true, |id| request.item_id == id)
    }
}
