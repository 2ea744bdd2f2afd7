//! Fixtures shared by the ledger integration tests

#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tokio::sync::mpsc;
use uuid::Uuid;

use agrione_inventory::{
    services::{
        catalog::RegisterItemInput,
        lot_store::{LotReceipt, ReceiveLotInput},
        workflow::{CreateStockRequestInput, StockRequestView},
        ItemCatalog, LedgerEvent, LotStore, MovementLedger, NotificationOutbox, RequestWorkflow,
    },
    store::{MemoryLedgerStore, StaticDirectory},
    AppState, Config,
};
use shared::InventoryItem;

pub const WAREHOUSE_1: i64 = 1;
pub const WAREHOUSE_2: i64 = 2;
pub const FIELD_PLOT: i64 = 9;
pub const WORK_ORDER: i64 = 42;
pub const MANAGER_ID: i64 = 100;
pub const REQUESTER_ID: i64 = 200;

// Helper to create Decimal from string
pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
}

pub struct Ledger {
    pub store: MemoryLedgerStore,
    pub directory: Arc<StaticDirectory>,
    pub state: AppState,
    pub events: mpsc::Receiver<LedgerEvent>,
}

pub fn directory() -> StaticDirectory {
    StaticDirectory::new()
        .with_warehouse(WAREHOUSE_1, "Gudang Utama")
        .with_location(WAREHOUSE_2, "Gudang Pupuk", "storage")
        .with_location(FIELD_PLOT, "Blok A1", "field")
        .with_work_order(WORK_ORDER)
        .with_user(MANAGER_ID, "manager", "warehouse")
        .with_user(REQUESTER_ID, "mandor", "Level 3")
}

pub fn ledger() -> Ledger {
    let store = MemoryLedgerStore::new();
    let directory = Arc::new(directory());
    let (outbox, events) = NotificationOutbox::channel(64);
    let state = AppState {
        store: Arc::new(store.clone()),
        warehouses: directory.clone(),
        work_orders: directory.clone(),
        outbox,
        config: Arc::new(Config::default()),
        db: None,
    };
    Ledger {
        store,
        directory,
        state,
        events,
    }
}

impl Ledger {
    pub fn catalog(&self) -> ItemCatalog {
        self.state.item_catalog()
    }

    pub fn lots(&self) -> LotStore {
        self.state.lot_store()
    }

    pub fn movements(&self) -> MovementLedger {
        self.state.movement_ledger()
    }

    pub fn workflow(&self) -> RequestWorkflow {
        self.state.request_workflow()
    }

    pub async fn item(&self, sku: &str, reorder_point: &str) -> InventoryItem {
        self.catalog()
            .register(item_input(sku, reorder_point))
            .await
            .unwrap()
    }

    pub async fn receive(
        &self,
        item_id: Uuid,
        warehouse_id: i64,
        quantity: &str,
        unit_cost: &str,
        received: NaiveDate,
    ) -> LotReceipt {
        self.lots()
            .receive(receipt_input(item_id, warehouse_id, quantity, unit_cost, received))
            .await
            .unwrap()
    }

    pub async fn request(
        &self,
        item_id: Uuid,
        warehouse_id: Option<i64>,
        quantity: &str,
    ) -> StockRequestView {
        self.workflow()
            .create(request_input(item_id, warehouse_id, quantity), "mandor")
            .await
            .unwrap()
    }

    /// Everything published so far
    pub fn drain_events(&mut self) -> Vec<LedgerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}

pub fn item_input(sku: &str, reorder_point: &str) -> RegisterItemInput {
    RegisterItemInput {
        sku: sku.to_string(),
        name: format!("Pupuk {}", sku),
        category: "fertilizer".to_string(),
        unit: "kg".to_string(),
        reorder_point: dec(reorder_point),
        avg_cost: Decimal::ZERO,
        description: None,
        suppliers: vec!["PT Pupuk Kaltim".to_string()],
    }
}

pub fn receipt_input(
    item_id: Uuid,
    warehouse_id: i64,
    quantity: &str,
    unit_cost: &str,
    received: NaiveDate,
) -> ReceiveLotInput {
    ReceiveLotInput {
        item_id,
        warehouse_id,
        batch_no: format!("B-{}", received),
        quantity: dec(quantity),
        unit_cost: dec(unit_cost),
        expiry_date: None,
        supplier: "PT Pupuk Kaltim".to_string(),
        notes: None,
        received_date: Some(received),
        performed_by: None,
    }
}

pub fn request_input(
    item_id: Uuid,
    warehouse_id: Option<i64>,
    quantity: &str,
) -> CreateStockRequestInput {
    CreateStockRequestInput {
        work_order_id: WORK_ORDER,
        item_id,
        quantity: dec(quantity),
        warehouse_id,
        requested_by: None,
        notes: None,
    }
}
