//! In-memory ledger store
//!
//! A unit of work takes the store's lock for its whole lifetime and edits a
//! private copy of the state; commit swaps the copy in. Units of work are
//! therefore fully serialized, which is the strongest isolation the
//! PostgreSQL store promises.

use std::cmp::Reverse;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use shared::{
    fifo_order, InventoryItem, ItemFilter, LotFilter, LotStatus, MovementFilter, Page,
    RequestFilter, RequestStatus, StockLot, StockMovement, StockRequest,
};

use super::{LedgerStore, LedgerTotals, LedgerTx};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Default)]
struct LedgerState {
    items: Vec<InventoryItem>,
    lots: Vec<StockLot>,
    movements: Vec<StockMovement>,
    requests: Vec<StockRequest>,
}

impl LedgerState {
    fn available_quantity(&self, item_id: Uuid, warehouse_id: i64) -> Decimal {
        self.lots
            .iter()
            .filter(|l| {
                l.item_id == item_id
                    && l.warehouse_id == warehouse_id
                    && l.status == LotStatus::Available
            })
            .map(|l| l.quantity)
            .sum()
    }

    fn item_name(&self, item_id: Uuid) -> Option<&str> {
        self.items
            .iter()
            .find(|i| i.id == item_id)
            .map(|i| i.name.as_str())
    }
}

/// Ledger store kept entirely in process memory
#[derive(Clone, Default)]
pub struct MemoryLedgerStore {
    state: Arc<Mutex<LedgerState>>,
    injected_conflicts: Arc<AtomicU32>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` commits fail with a serialization conflict
    pub fn inject_conflicts(&self, count: u32) {
        self.injected_conflicts.store(count, Ordering::SeqCst);
    }

    /// Every movement ever recorded, oldest first
    pub async fn all_movements(&self) -> Vec<StockMovement> {
        self.state.lock().await.movements.clone()
    }

    /// Every lot, in receipt order
    pub async fn all_lots(&self) -> Vec<StockLot> {
        self.state.lock().await.lots.clone()
    }

    fn take_injected_conflict(&self) -> bool {
        self.injected_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn begin(&self) -> AppResult<Box<dyn LedgerTx>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTx {
            guard,
            working,
            conflicts: self.injected_conflicts.clone(),
            fail_commit: self.take_injected_conflict(),
        }))
    }

    async fn get_item(&self, id: Uuid) -> AppResult<Option<InventoryItem>> {
        let state = self.state.lock().await;
        Ok(state.items.iter().find(|i| i.id == id).cloned())
    }

    async fn list_items(&self, filter: &ItemFilter, page: Page) -> AppResult<Vec<InventoryItem>> {
        let state = self.state.lock().await;
        let mut items: Vec<InventoryItem> = state
            .items
            .iter()
            .rev()
            .filter(|i| filter.matches(i))
            .cloned()
            .collect();
        items.sort_by_key(|i| Reverse(i.created_at));
        Ok(page.slice(items))
    }

    async fn get_lot(&self, id: Uuid) -> AppResult<Option<StockLot>> {
        let state = self.state.lock().await;
        Ok(state.lots.iter().find(|l| l.id == id).cloned())
    }

    async fn list_lots(&self, filter: &LotFilter, page: Page) -> AppResult<Vec<StockLot>> {
        let state = self.state.lock().await;
        let mut lots: Vec<StockLot> = state
            .lots
            .iter()
            .rev()
            .filter(|l| filter.matches(l, state.item_name(l.item_id)))
            .cloned()
            .collect();
        lots.sort_by_key(|l| Reverse((l.received_date, l.created_at)));
        Ok(page.slice(lots))
    }

    async fn list_movements(
        &self,
        filter: &MovementFilter,
        page: Page,
    ) -> AppResult<Vec<StockMovement>> {
        let state = self.state.lock().await;
        let mut movements: Vec<StockMovement> = state
            .movements
            .iter()
            .rev()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect();
        movements.sort_by_key(|m| Reverse(m.created_at));
        Ok(page.slice(movements))
    }

    async fn get_request(&self, id: Uuid) -> AppResult<Option<StockRequest>> {
        let state = self.state.lock().await;
        Ok(state.requests.iter().find(|r| r.id == id).cloned())
    }

    async fn list_requests(
        &self,
        filter: &RequestFilter,
        page: Page,
    ) -> AppResult<Vec<StockRequest>> {
        let state = self.state.lock().await;
        let mut requests: Vec<StockRequest> = state
            .requests
            .iter()
            .rev()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        requests.sort_by_key(|r| Reverse(r.created_at));
        Ok(page.slice(requests))
    }

    async fn available_quantity(&self, item_id: Uuid, warehouse_id: i64) -> AppResult<Decimal> {
        let state = self.state.lock().await;
        Ok(state.available_quantity(item_id, warehouse_id))
    }

    async fn totals(&self, since: DateTime<Utc>) -> AppResult<LedgerTotals> {
        let state = self.state.lock().await;
        let active: Vec<&InventoryItem> = state.items.iter().filter(|i| i.is_active()).collect();

        let stock_value = state
            .lots
            .iter()
            .filter(|l| l.status == LotStatus::Available)
            .map(|l| l.remaining_value())
            .sum();

        let low_stock_items = active
            .iter()
            .filter(|item| {
                let on_hand: Decimal = state
                    .lots
                    .iter()
                    .filter(|l| l.item_id == item.id && l.status == LotStatus::Available)
                    .map(|l| l.quantity)
                    .sum();
                item.is_low_stock(on_hand)
            })
            .count();

        let movements_since = state
            .movements
            .iter()
            .filter(|m| m.created_at >= since)
            .count();

        Ok(LedgerTotals {
            active_items: active.len() as i64,
            stock_value,
            low_stock_items: low_stock_items as i64,
            movements_since: movements_since as i64,
        })
    }
}

/// Unit of work over the in-memory state
pub struct MemoryTx {
    guard: OwnedMutexGuard<LedgerState>,
    working: LedgerState,
    conflicts: Arc<AtomicU32>,
    fail_commit: bool,
}

impl MemoryTx {
    fn lot_mut(&mut self, id: Uuid) -> AppResult<&mut StockLot> {
        self.working
            .lots
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| AppError::NotFound("Stock lot".to_string()))
    }
}

#[async_trait]
impl LedgerTx for MemoryTx {
    async fn sku_taken(&mut self, sku: &str, exclude: Option<Uuid>) -> AppResult<bool> {
        Ok(self
            .working
            .items
            .iter()
            .any(|i| i.sku == sku && Some(i.id) != exclude))
    }

    async fn insert_item(&mut self, item: &InventoryItem) -> AppResult<()> {
        if self.sku_taken(&item.sku, None).await? {
            return Err(AppError::DuplicateEntry("sku".to_string()));
        }
        self.working.items.push(item.clone());
        Ok(())
    }

    async fn item_for_update(&mut self, id: Uuid) -> AppResult<Option<InventoryItem>> {
        Ok(self.working.items.iter().find(|i| i.id == id).cloned())
    }

    async fn update_item(&mut self, item: &InventoryItem) -> AppResult<()> {
        if self.sku_taken(&item.sku, Some(item.id)).await? {
            return Err(AppError::DuplicateEntry("sku".to_string()));
        }
        let slot = self
            .working
            .items
            .iter_mut()
            .find(|i| i.id == item.id)
            .ok_or_else(|| AppError::NotFound("Inventory item".to_string()))?;
        *slot = item.clone();
        Ok(())
    }

    async fn insert_lot(&mut self, lot: &StockLot) -> AppResult<()> {
        self.working.lots.push(lot.clone());
        Ok(())
    }

    async fn lot_for_update(&mut self, id: Uuid) -> AppResult<Option<StockLot>> {
        Ok(self.working.lots.iter().find(|l| l.id == id).cloned())
    }

    async fn available_lots_for_update(
        &mut self,
        item_id: Uuid,
        warehouse_id: i64,
    ) -> AppResult<Vec<StockLot>> {
        let candidates: Vec<StockLot> = self
            .working
            .lots
            .iter()
            .filter(|l| l.item_id == item_id && l.warehouse_id == warehouse_id)
            .cloned()
            .collect();
        Ok(fifo_order(&candidates).into_iter().cloned().collect())
    }

    async fn update_lot(&mut self, lot: &StockLot) -> AppResult<()> {
        let slot = self.lot_mut(lot.id)?;
        slot.quantity = lot.quantity;
        slot.status = lot.status;
        slot.notes = lot.notes.clone();
        slot.updated_at = lot.updated_at;
        Ok(())
    }

    async fn insert_movement(&mut self, movement: &StockMovement) -> AppResult<()> {
        self.working.movements.push(movement.clone());
        Ok(())
    }

    async fn insert_request(&mut self, request: &StockRequest) -> AppResult<()> {
        self.working.requests.push(request.clone());
        Ok(())
    }

    async fn request_for_update(&mut self, id: Uuid) -> AppResult<Option<StockRequest>> {
        Ok(self.working.requests.iter().find(|r| r.id == id).cloned())
    }

    async fn update_request(&mut self, request: &StockRequest) -> AppResult<()> {
        let slot = self
            .working
            .requests
            .iter_mut()
            .find(|r| r.id == request.id)
            .ok_or_else(|| AppError::NotFound("Stock request".to_string()))?;
        *slot = request.clone();
        Ok(())
    }

    async fn available_quantity(&mut self, item_id: Uuid, warehouse_id: i64) -> AppResult<Decimal> {
        Ok(self.working.available_quantity(item_id, warehouse_id))
    }

    async fn reserved_quantity(
        &mut self,
        item_id: Uuid,
        warehouse_id: i64,
        exclude: Uuid,
    ) -> AppResult<Decimal> {
        Ok(self
            .working
            .requests
            .iter()
            .filter(|r| {
                r.id != exclude
                    && r.item_id == item_id
                    && r.warehouse_id == Some(warehouse_id)
                    && r.status == RequestStatus::Approved
            })
            .map(|r| r.quantity)
            .sum())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let MemoryTx {
            mut guard,
            working,
            conflicts,
            fail_commit,
        } = *self;
        if fail_commit {
            tracing::debug!(
                remaining = conflicts.load(Ordering::SeqCst),
                "Injected serialization conflict"
            );
            return Err(AppError::TransactionConflict(
                "could not serialize access due to concurrent update".to_string(),
            ));
        }
        *guard = working;
        Ok(())
    }
}
