//! Movement ledger: the append-only audit trail of quantity changes
//!
//! Movements are written once and never updated. The line cost is fixed at
//! write time so later changes to an item's average cost never rewrite
//! history.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use shared::{
    generate_reference_code, line_cost, validate_non_negative, validate_positive_quantity,
    validate_required, MovementFilter, MovementType, Page, StockMovement, MOVEMENT_CODE_PREFIX,
};

use super::check_field;
use crate::error::AppResult;
use crate::store::{LedgerStore, LedgerTx};

/// A movement about to be appended
#[derive(Debug, Clone)]
pub struct MovementDraft {
    pub movement_type: MovementType,
    pub item_id: Uuid,
    pub lot_id: Option<Uuid>,
    pub warehouse_id: i64,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    pub reason: String,
    pub reference: Option<String>,
    pub performed_by: String,
    pub notes: Option<String>,
    pub stock_request_id: Option<Uuid>,
}

impl MovementDraft {
    fn into_movement(self, now: DateTime<Utc>) -> StockMovement {
        StockMovement {
            id: Uuid::new_v4(),
            movement_code: generate_reference_code(MOVEMENT_CODE_PREFIX, now),
            item_id: self.item_id,
            lot_id: self.lot_id,
            warehouse_id: self.warehouse_id,
            movement_type: self.movement_type,
            quantity: self.quantity,
            unit_cost: self.unit_cost,
            total_cost: line_cost(self.quantity, self.unit_cost),
            reason: self.reason,
            reference: self.reference,
            performed_by: self.performed_by,
            notes: self.notes,
            stock_request_id: self.stock_request_id,
            created_at: now,
        }
    }
}

/// Read access to the ledger plus standalone appends
#[derive(Clone)]
pub struct MovementLedger {
    store: Arc<dyn LedgerStore>,
}

impl MovementLedger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Append a movement in its own unit of work
    pub async fn record(&self, draft: MovementDraft) -> AppResult<StockMovement> {
        let mut tx = self.store.begin().await?;
        let movement = Self::append(tx.as_mut(), draft, Utc::now()).await?;
        tx.commit().await?;

        tracing::debug!(
            movement_code = %movement.movement_code,
            movement_type = %movement.movement_type,
            "Recorded stock movement"
        );
        Ok(movement)
    }

    /// Append a movement inside a caller's unit of work
    pub(crate) async fn append(
        tx: &mut dyn LedgerTx,
        draft: MovementDraft,
        now: DateTime<Utc>,
    ) -> AppResult<StockMovement> {
        check_field(
            "quantity",
            validate_positive_quantity(draft.quantity),
            "Jumlah harus lebih besar dari nol",
        )?;
        check_field(
            "unit_cost",
            validate_non_negative(draft.unit_cost),
            "Biaya satuan tidak boleh negatif",
        )?;
        check_field("reason", validate_required(&draft.reason), "Alasan wajib diisi")?;
        check_field(
            "performed_by",
            validate_required(&draft.performed_by),
            "Pelaksana wajib diisi",
        )?;

        let movement = draft.into_movement(now);
        tx.insert_movement(&movement).await?;
        Ok(movement)
    }

    pub async fn list(&self, filter: &MovementFilter, page: Page) -> AppResult<Vec<StockMovement>> {
        self.store.list_movements(filter, page).await
    }
}
