//! Lot store: receipt and depletion of physical stock lots
//!
//! Every quantity change to a lot is written together with its movement in
//! one unit of work.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use shared::{
    drain_lot, generate_reference_code, line_cost, validate_positive_quantity, validate_required,
    validate_unit_cost, InventoryItem, LotFilter, LotStatus, MovementType, Page, StockLot,
    StockMovement, LOT_CODE_PREFIX,
};

use super::ledger::{MovementDraft, MovementLedger};
use super::notification::{LedgerEvent, NotificationOutbox};
use super::{check_field, ensure_stock_warehouse, with_retries};
use crate::error::{AppError, AppResult};
use crate::store::{LedgerStore, LedgerTx, WarehouseDirectory};

/// Performer recorded on receipts when the caller names none
pub const SYSTEM_PERFORMER: &str = "System";

/// Reason recorded on the `in` movement written at receipt
pub const RECEIPT_REASON: &str = "Stock Receipt";

#[derive(Clone)]
pub struct LotStore {
    store: Arc<dyn LedgerStore>,
    warehouses: Arc<dyn WarehouseDirectory>,
    outbox: NotificationOutbox,
    max_retries: u32,
}

/// Input for receiving a lot into a warehouse
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReceiveLotInput {
    pub item_id: Uuid,
    pub warehouse_id: i64,
    #[validate(length(min = 1, max = 100, message = "Batch number must be between 1 and 100 characters"))]
    pub batch_no: String,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    pub expiry_date: Option<NaiveDate>,
    #[validate(length(min = 1, max = 255, message = "Supplier must be between 1 and 255 characters"))]
    pub supplier: String,
    pub notes: Option<String>,
    /// Defaults to today
    pub received_date: Option<NaiveDate>,
    pub performed_by: Option<String>,
}

/// Input for manually removing stock from a lot
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RemoveStockInput {
    pub lot_id: Uuid,
    pub quantity: Decimal,
    #[validate(length(min = 1, max = 255, message = "Reason must be between 1 and 255 characters"))]
    pub reason: String,
    #[validate(length(min = 1, max = 255, message = "Performer must be between 1 and 255 characters"))]
    pub performed_by: String,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

/// A received lot with the movement that recorded it
#[derive(Debug, Clone, Serialize)]
pub struct LotReceipt {
    #[serde(flatten)]
    pub lot: StockLot,
    pub movement: StockMovement,
    #[serde(skip)]
    pub item: InventoryItem,
}

/// A drained lot with the `out` movement that recorded it
#[derive(Debug, Clone, Serialize)]
pub struct StockRemoval {
    #[serde(flatten)]
    pub lot: StockLot,
    pub movement: StockMovement,
}

/// Attribution for an `out` movement
#[derive(Debug, Clone)]
pub(crate) struct Removal {
    pub reason: String,
    pub performed_by: String,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub stock_request_id: Option<Uuid>,
}

/// Drain `quantity` from a lot and append the matching `out` movement
pub(crate) async fn decrement_in_tx(
    tx: &mut dyn LedgerTx,
    lot_id: Uuid,
    quantity: Decimal,
    removal: &Removal,
    now: DateTime<Utc>,
) -> AppResult<(StockLot, StockMovement)> {
    let mut lot = tx
        .lot_for_update(lot_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Stock lot".to_string()))?;

    let drained = drain_lot(&lot, quantity)?;
    lot.quantity = drained.quantity;
    lot.status = drained.status;
    lot.updated_at = now;
    tx.update_lot(&lot).await?;

    let movement = MovementLedger::append(
        tx,
        MovementDraft {
            movement_type: MovementType::Out,
            item_id: lot.item_id,
            lot_id: Some(lot.id),
            warehouse_id: lot.warehouse_id,
            quantity,
            unit_cost: lot.unit_cost,
            reason: removal.reason.clone(),
            reference: removal.reference.clone(),
            performed_by: removal.performed_by.clone(),
            notes: removal.notes.clone(),
            stock_request_id: removal.stock_request_id,
        },
        now,
    )
    .await?;

    if lot.status == LotStatus::Depleted {
        tracing::debug!(lot_code = %lot.lot_code, "Stock lot depleted");
    }
    Ok((lot, movement))
}

/// Publish a low-stock event if the item is at or below its reorder point
/// in the warehouse. Runs after commit; failures are only logged.
pub(crate) async fn check_low_stock(
    store: &dyn LedgerStore,
    outbox: &NotificationOutbox,
    item_id: Uuid,
    warehouse_id: i64,
) {
    let result: AppResult<()> = async {
        let Some(item) = store.get_item(item_id).await? else {
            return Ok(());
        };
        if !item.is_active() {
            return Ok(());
        }
        let available = store.available_quantity(item_id, warehouse_id).await?;
        if item.is_low_stock(available) {
            tracing::info!(
                sku = %item.sku,
                warehouse_id,
                %available,
                reorder_point = %item.reorder_point,
                "Item at or below reorder point"
            );
            outbox.publish(LedgerEvent::LowStock {
                item_id,
                sku: item.sku,
                item_name: item.name,
                warehouse_id,
                available,
                reorder_point: item.reorder_point,
            });
        }
        Ok(())
    }
    .await;

    if let Err(err) = result {
        tracing::warn!(%item_id, warehouse_id, "Low-stock check failed: {}", err);
    }
}

fn actor_or_system(performed_by: Option<&str>) -> String {
    performed_by
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(SYSTEM_PERFORMER)
        .to_string()
}

impl LotStore {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        warehouses: Arc<dyn WarehouseDirectory>,
        outbox: NotificationOutbox,
        max_retries: u32,
    ) -> Self {
        Self {
            store,
            warehouses,
            outbox,
            max_retries,
        }
    }

    /// Receive a lot. The lot, its `in` movement and the item's average cost
    /// (set to this receipt's unit cost) are committed together.
    pub async fn receive(&self, input: ReceiveLotInput) -> AppResult<LotReceipt> {
        input.validate()?;
        check_field("batch_no", validate_required(&input.batch_no), "Nomor batch wajib diisi")?;
        check_field("supplier", validate_required(&input.supplier), "Pemasok wajib diisi")?;
        check_field(
            "quantity",
            validate_positive_quantity(input.quantity),
            "Jumlah harus lebih besar dari nol",
        )?;
        check_field(
            "unit_cost",
            validate_unit_cost(input.unit_cost),
            "Biaya satuan harus lebih besar dari nol",
        )?;
        ensure_stock_warehouse(self.warehouses.as_ref(), input.warehouse_id).await?;

        let receipt = with_retries("receive_stock_lot", self.max_retries, || {
            self.receive_once(&input)
        })
        .await?;

        tracing::info!(
            lot_code = %receipt.lot.lot_code,
            sku = %receipt.item.sku,
            quantity = %receipt.lot.quantity,
            warehouse_id = receipt.lot.warehouse_id,
            "Received stock lot"
        );
        Ok(receipt)
    }

    async fn receive_once(&self, input: &ReceiveLotInput) -> AppResult<LotReceipt> {
        let mut tx = self.store.begin().await?;
        let mut item = tx
            .item_for_update(input.item_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Inventory item".to_string()))?;

        let now = Utc::now();
        let batch_no = input.batch_no.trim().to_string();
        let lot = StockLot {
            id: Uuid::new_v4(),
            lot_code: generate_reference_code(LOT_CODE_PREFIX, now),
            item_id: item.id,
            warehouse_id: input.warehouse_id,
            batch_no: batch_no.clone(),
            quantity: input.quantity,
            unit_cost: input.unit_cost,
            total_cost: line_cost(input.quantity, input.unit_cost),
            expiry_date: input.expiry_date,
            supplier: input.supplier.trim().to_string(),
            status: LotStatus::Available,
            notes: input.notes.clone(),
            received_date: input.received_date.unwrap_or_else(|| now.date_naive()),
            created_at: now,
            updated_at: now,
        };
        tx.insert_lot(&lot).await?;

        // Last-cost policy: the newest receipt sets the average cost
        item.avg_cost = lot.unit_cost;
        item.updated_at = now;
        tx.update_item(&item).await?;

        let movement = MovementLedger::append(
            tx.as_mut(),
            MovementDraft {
                movement_type: MovementType::In,
                item_id: item.id,
                lot_id: Some(lot.id),
                warehouse_id: lot.warehouse_id,
                quantity: lot.quantity,
                unit_cost: lot.unit_cost,
                reason: RECEIPT_REASON.to_string(),
                reference: Some(batch_no),
                performed_by: actor_or_system(input.performed_by.as_deref()),
                notes: lot.notes.clone(),
                stock_request_id: None,
            },
            now,
        )
        .await?;

        tx.commit().await?;
        Ok(LotReceipt {
            lot,
            movement,
            item,
        })
    }

    /// Committed available quantity of an item in a warehouse
    pub async fn available_quantity(&self, item_id: Uuid, warehouse_id: i64) -> AppResult<Decimal> {
        self.store.available_quantity(item_id, warehouse_id).await
    }

    /// Manually remove stock from a single lot
    pub async fn decrement(&self, input: RemoveStockInput) -> AppResult<StockRemoval> {
        input.validate()?;
        check_field("reason", validate_required(&input.reason), "Alasan wajib diisi")?;
        check_field(
            "performed_by",
            validate_required(&input.performed_by),
            "Pelaksana wajib diisi",
        )?;
        check_field(
            "quantity",
            validate_positive_quantity(input.quantity),
            "Jumlah harus lebih besar dari nol",
        )?;

        let removal = Removal {
            reason: input.reason.trim().to_string(),
            performed_by: input.performed_by.trim().to_string(),
            reference: input.reference.clone(),
            notes: input.notes.clone(),
            stock_request_id: None,
        };

        let (lot, movement) = with_retries("remove_stock", self.max_retries, || {
            self.decrement_once(input.lot_id, input.quantity, &removal)
        })
        .await?;

        tracing::info!(
            lot_code = %lot.lot_code,
            quantity = %movement.quantity,
            remaining = %lot.quantity,
            "Removed stock from lot"
        );
        check_low_stock(self.store.as_ref(), &self.outbox, lot.item_id, lot.warehouse_id).await;

        Ok(StockRemoval { lot, movement })
    }

    async fn decrement_once(
        &self,
        lot_id: Uuid,
        quantity: Decimal,
        removal: &Removal,
    ) -> AppResult<(StockLot, StockMovement)> {
        let mut tx = self.store.begin().await?;
        let result = decrement_in_tx(tx.as_mut(), lot_id, quantity, removal, Utc::now()).await?;
        tx.commit().await?;
        Ok(result)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<StockLot> {
        self.store
            .get_lot(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Stock lot".to_string()))
    }

    pub async fn list(&self, filter: &LotFilter, page: Page) -> AppResult<Vec<StockLot>> {
        self.store.list_lots(filter, page).await
    }
}
