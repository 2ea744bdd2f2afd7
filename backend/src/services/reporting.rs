//! Reporting service for the inventory dashboard

use std::sync::Arc;

use chrono::{Duration, Utc};

use shared::{InventoryStats, Warehouse};

use crate::error::AppResult;
use crate::store::{LedgerStore, WarehouseDirectory};

/// Window for the "recent movements" counter
const RECENT_MOVEMENT_DAYS: i64 = 7;

/// Reporting service
#[derive(Clone)]
pub struct InventoryReporting {
    store: Arc<dyn LedgerStore>,
    warehouses: Arc<dyn WarehouseDirectory>,
}

impl InventoryReporting {
    pub fn new(store: Arc<dyn LedgerStore>, warehouses: Arc<dyn WarehouseDirectory>) -> Self {
        Self { store, warehouses }
    }

    /// Dashboard counters
    pub async fn stats(&self) -> AppResult<InventoryStats> {
        let since = Utc::now() - Duration::days(RECENT_MOVEMENT_DAYS);
        let totals = self.store.totals(since).await?;
        let total_warehouses = self.warehouses.count_warehouses().await?;

        Ok(InventoryStats {
            total_items: totals.active_items,
            stock_value: totals.stock_value,
            total_warehouses,
            low_stock_count: totals.low_stock_items,
            recent_movements: totals.movements_since,
        })
    }

    /// Stock-holding locations
    pub async fn warehouses(&self, search: Option<&str>) -> AppResult<Vec<Warehouse>> {
        self.warehouses.list_warehouses(search).await
    }
}
