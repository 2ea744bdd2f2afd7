//! Transactional storage for the stock ledger
//!
//! `LedgerStore` serves committed reads and opens units of work. A
//! `LedgerTx` is one unit of work: every read through it sees the rows it
//! has locked, and nothing it writes is visible to others until `commit`.
//! Dropping a `LedgerTx` without committing rolls it back.
//!
//! Two implementations exist: [`PgLedgerStore`] (SERIALIZABLE transactions
//! with row locks) and [`MemoryLedgerStore`] (one exclusive lock per unit of
//! work, used by tests and local development).

pub mod directory;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use shared::{
    InventoryItem, ItemFilter, LotFilter, MovementFilter, Page, RequestFilter, StockLot,
    StockMovement, StockRequest,
};

use crate::error::AppResult;

pub use directory::{
    PgDirectory, RecipientDirectory, StaticDirectory, WarehouseDirectory, WorkOrderDirectory,
};
pub use memory::MemoryLedgerStore;
pub use postgres::PgLedgerStore;

/// Ledger-wide counters behind the stats endpoint
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerTotals {
    pub active_items: i64,
    pub stock_value: Decimal,
    pub low_stock_items: i64,
    pub movements_since: i64,
}

/// Committed-state reads and the entry point for units of work
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Open a unit of work
    async fn begin(&self) -> AppResult<Box<dyn LedgerTx>>;

    async fn get_item(&self, id: Uuid) -> AppResult<Option<InventoryItem>>;

    /// Newest first
    async fn list_items(&self, filter: &ItemFilter, page: Page) -> AppResult<Vec<InventoryItem>>;

    async fn get_lot(&self, id: Uuid) -> AppResult<Option<StockLot>>;

    /// Newest receipt first
    async fn list_lots(&self, filter: &LotFilter, page: Page) -> AppResult<Vec<StockLot>>;

    /// Newest first
    async fn list_movements(
        &self,
        filter: &MovementFilter,
        page: Page,
    ) -> AppResult<Vec<StockMovement>>;

    async fn get_request(&self, id: Uuid) -> AppResult<Option<StockRequest>>;

    /// Newest first
    async fn list_requests(
        &self,
        filter: &RequestFilter,
        page: Page,
    ) -> AppResult<Vec<StockRequest>>;

    /// Sum of quantity over `available` lots for the item in the warehouse
    async fn available_quantity(&self, item_id: Uuid, warehouse_id: i64) -> AppResult<Decimal>;

    /// Counters for the stats endpoint; movements are counted from `since`
    async fn totals(&self, since: DateTime<Utc>) -> AppResult<LedgerTotals>;
}

/// A single atomic unit of work against the ledger
#[async_trait]
pub trait LedgerTx: Send {
    /// Whether another item already uses `sku`
    async fn sku_taken(&mut self, sku: &str, exclude: Option<Uuid>) -> AppResult<bool>;

    async fn insert_item(&mut self, item: &InventoryItem) -> AppResult<()>;

    /// Read an item and hold it until commit
    async fn item_for_update(&mut self, id: Uuid) -> AppResult<Option<InventoryItem>>;

    async fn update_item(&mut self, item: &InventoryItem) -> AppResult<()>;

    async fn insert_lot(&mut self, lot: &StockLot) -> AppResult<()>;

    /// Read a lot and hold it until commit
    async fn lot_for_update(&mut self, id: Uuid) -> AppResult<Option<StockLot>>;

    /// Allocatable lots of the item in the warehouse, held until commit, in
    /// FIFO order (received date, then creation time)
    async fn available_lots_for_update(
        &mut self,
        item_id: Uuid,
        warehouse_id: i64,
    ) -> AppResult<Vec<StockLot>>;

    /// Persist a lot's quantity and status
    async fn update_lot(&mut self, lot: &StockLot) -> AppResult<()>;

    /// Append to the movement ledger
    async fn insert_movement(&mut self, movement: &StockMovement) -> AppResult<()>;

    async fn insert_request(&mut self, request: &StockRequest) -> AppResult<()>;

    /// Read a request and hold it until commit
    async fn request_for_update(&mut self, id: Uuid) -> AppResult<Option<StockRequest>>;

    /// Persist a request's workflow fields
    async fn update_request(&mut self, request: &StockRequest) -> AppResult<()>;

    /// Available quantity as seen inside this unit of work
    async fn available_quantity(&mut self, item_id: Uuid, warehouse_id: i64) -> AppResult<Decimal>;

    /// Quantity held by approved, unfulfilled requests for the item in the
    /// warehouse, not counting `exclude`
    async fn reserved_quantity(
        &mut self,
        item_id: Uuid,
        warehouse_id: i64,
        exclude: Uuid,
    ) -> AppResult<Decimal>;

    async fn commit(self: Box<Self>) -> AppResult<()>;
}
