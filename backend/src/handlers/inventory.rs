//! HTTP handlers for items, lots, movements and the dashboard

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use shared::{
    normalize_choice, InventoryItem, InventoryStats, ItemFilter, LotFilter, LotStatus,
    MovementFilter, MovementType, Page, StockLot, StockMovement, Warehouse,
};

use super::query_choice;
use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::catalog::{RegisterItemInput, UpdateItemInput};
use crate::services::lot_store::{LotReceipt, ReceiveLotInput, RemoveStockInput, StockRemoval};
use crate::AppState;

fn parse_uuid(s: &str) -> Option<Uuid> {
    Uuid::parse_str(s).ok()
}

fn parse_id(s: &str) -> Option<i64> {
    s.parse().ok()
}

fn page_for(state: &AppState, page: Option<i64>, limit: Option<i64>) -> Page {
    Page::from_query(
        page,
        limit,
        state.config.ledger.default_page_size,
        state.config.ledger.max_page_size,
    )
}

// ============================================================================
// Items
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListItemsQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// List catalog items
pub async fn list_items(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ListItemsQuery>,
) -> AppResult<Json<Vec<InventoryItem>>> {
    let filter = ItemFilter {
        search: normalize_choice(query.search.as_deref()),
        category: normalize_choice(query.category.as_deref()),
    };
    let page = page_for(&state, query.page, query.limit);
    let items = state.item_catalog().list(&filter, page).await?;
    Ok(Json(items))
}

/// Register a catalog item
pub async fn create_item(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Json(input): Json<RegisterItemInput>,
) -> AppResult<(StatusCode, Json<InventoryItem>)> {
    let item = state.item_catalog().register(input).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn get_item(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<InventoryItem>> {
    let item = state.item_catalog().get(id).await?;
    Ok(Json(item))
}

pub async fn update_item(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateItemInput>,
) -> AppResult<Json<InventoryItem>> {
    let item = state.item_catalog().update(id, input).await?;
    Ok(Json(item))
}

/// Retire an item (marks it discontinued)
pub async fn retire_item(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<InventoryItem>> {
    let item = state.item_catalog().retire(id).await?;
    Ok(Json(item))
}

// ============================================================================
// Stock Lots
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListStockLotsQuery {
    pub search: Option<String>,
    pub item_id: Option<String>,
    pub warehouse_id: Option<String>,
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

pub async fn list_stock_lots(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ListStockLotsQuery>,
) -> AppResult<Json<Vec<StockLot>>> {
    let filter = LotFilter {
        search: normalize_choice(query.search.as_deref()),
        item_id: query_choice("item_id", query.item_id.as_deref(), parse_uuid)?,
        warehouse_id: query_choice("warehouse_id", query.warehouse_id.as_deref(), parse_id)?,
        status: query_choice("status", query.status.as_deref(), LotStatus::parse)?,
    };
    let page = page_for(&state, query.page, query.limit);
    let lots = state.lot_store().list(&filter, page).await?;
    Ok(Json(lots))
}

pub async fn get_stock_lot(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<StockLot>> {
    let lot = state.lot_store().get(id).await?;
    Ok(Json(lot))
}

/// Receive a lot into a warehouse
pub async fn receive_stock_lot(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Json(input): Json<ReceiveLotInput>,
) -> AppResult<(StatusCode, Json<LotReceipt>)> {
    let receipt = state.lot_store().receive(input).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// Manually remove stock from a lot
pub async fn remove_stock(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Json(input): Json<RemoveStockInput>,
) -> AppResult<Json<StockRemoval>> {
    let removal = state.lot_store().decrement(input).await?;
    Ok(Json(removal))
}

// ============================================================================
// Movements
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListStockMovementsQuery {
    pub search: Option<String>,
    #[serde(alias = "type")]
    pub movement_type: Option<String>,
    pub item_id: Option<String>,
    pub lot_id: Option<String>,
    pub warehouse_id: Option<String>,
    pub stock_request_id: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

pub async fn list_stock_movements(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ListStockMovementsQuery>,
) -> AppResult<Json<Vec<StockMovement>>> {
    let filter = MovementFilter {
        search: normalize_choice(query.search.as_deref()),
        movement_type: query_choice(
            "movement_type",
            query.movement_type.as_deref(),
            MovementType::parse,
        )?,
        item_id: query_choice("item_id", query.item_id.as_deref(), parse_uuid)?,
        lot_id: query_choice("lot_id", query.lot_id.as_deref(), parse_uuid)?,
        warehouse_id: query_choice("warehouse_id", query.warehouse_id.as_deref(), parse_id)?,
        stock_request_id: query_choice(
            "stock_request_id",
            query.stock_request_id.as_deref(),
            parse_uuid,
        )?,
    };
    let page = page_for(&state, query.page, query.limit);
    let movements = state.movement_ledger().list(&filter, page).await?;
    Ok(Json(movements))
}

// ============================================================================
// Dashboard
// ============================================================================

pub async fn get_inventory_stats(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<InventoryStats>> {
    let stats = state.reporting().stats().await?;
    Ok(Json(stats))
}

#[derive(Debug, Deserialize)]
pub struct ListWarehousesQuery {
    pub search: Option<String>,
}

/// List stock-holding locations
pub async fn list_warehouses(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ListWarehousesQuery>,
) -> AppResult<Json<Vec<Warehouse>>> {
    let search = normalize_choice(query.search.as_deref());
    let warehouses = state.reporting().warehouses(search.as_deref()).await?;
    Ok(Json(warehouses))
}
