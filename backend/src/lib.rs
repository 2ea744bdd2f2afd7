//! Agrione inventory ledger
//!
//! Stock ledger and fulfillment engine: item catalog, lot receipt and
//! depletion, the append-only movement ledger and the stock request
//! workflow, served over HTTP.

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod store;

pub use config::Config;

use services::{
    InventoryReporting, ItemCatalog, LotStore, MovementLedger, NotificationOutbox,
    RequestWorkflow,
};
use store::{LedgerStore, WarehouseDirectory, WorkOrderDirectory};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn LedgerStore>,
    pub warehouses: Arc<dyn WarehouseDirectory>,
    pub work_orders: Arc<dyn WorkOrderDirectory>,
    pub outbox: NotificationOutbox,
    pub config: Arc<Config>,
    /// Present when backed by PostgreSQL; used by the health check
    pub db: Option<sqlx::PgPool>,
}

impl AppState {
    pub fn item_catalog(&self) -> ItemCatalog {
        ItemCatalog::new(self.store.clone(), self.config.ledger.max_tx_retries)
    }

    pub fn lot_store(&self) -> LotStore {
        LotStore::new(
            self.store.clone(),
            self.warehouses.clone(),
            self.outbox.clone(),
            self.config.ledger.max_tx_retries,
        )
    }

    pub fn movement_ledger(&self) -> MovementLedger {
        MovementLedger::new(self.store.clone())
    }

    pub fn request_workflow(&self) -> RequestWorkflow {
        RequestWorkflow::new(
            self.store.clone(),
            self.warehouses.clone(),
            self.work_orders.clone(),
            self.outbox.clone(),
            self.config.ledger.max_tx_retries,
        )
    }

    pub fn reporting(&self) -> InventoryReporting {
        InventoryReporting::new(self.store.clone(), self.warehouses.clone())
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", routes::api_routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn root() -> &'static str {
    "Agrione Inventory Ledger API v1.0"
}
