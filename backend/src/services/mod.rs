//! Business logic services for the inventory ledger

pub mod catalog;
pub mod ledger;
pub mod lot_store;
pub mod notification;
pub mod reporting;
pub mod workflow;

pub use catalog::ItemCatalog;
pub use ledger::MovementLedger;
pub use lot_store::LotStore;
pub use notification::{LedgerEvent, NotificationDispatcher, NotificationOutbox, Notifier};
pub use reporting::InventoryReporting;
pub use workflow::RequestWorkflow;

use std::future::Future;

use shared::Warehouse;

use crate::error::{AppError, AppResult};
use crate::store::WarehouseDirectory;

/// Run a unit of work, retrying it from scratch on serialization conflicts
pub(crate) async fn with_retries<T, F, Fut>(
    operation: &str,
    max_retries: u32,
    mut unit: F,
) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let mut attempt = 0;
    loop {
        match unit().await {
            Err(err) if err.is_retryable() && attempt < max_retries => {
                attempt += 1;
                tracing::warn!(operation, attempt, "Ledger transaction conflict, retrying: {}", err);
            }
            result => return result,
        }
    }
}

/// Resolve a location and require that it holds stock
pub(crate) async fn ensure_stock_warehouse(
    warehouses: &dyn WarehouseDirectory,
    warehouse_id: i64,
) -> AppResult<Warehouse> {
    let warehouse = warehouses
        .find_location(warehouse_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Warehouse".to_string()))?;

    if !warehouse.holds_stock() {
        return Err(AppError::validation(
            "warehouse_id",
            "Location must be of type 'storage' or 'warehouse'",
            "Lokasi harus bertipe 'storage' atau 'warehouse'",
        ));
    }
    Ok(warehouse)
}

/// Map a shared field check onto a field-level validation error
pub(crate) fn check_field(
    field: &str,
    result: Result<(), &'static str>,
    message_id: &str,
) -> AppResult<()> {
    result.map_err(|message| AppError::validation(field, message, message_id))
}
