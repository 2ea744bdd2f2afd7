//! Route definitions for the inventory ledger

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - inventory ledger
        .nest("/inventory", inventory_routes(state))
}

/// Inventory routes (protected)
fn inventory_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Item catalog
        .route(
            "/items",
            get(handlers::list_items).post(handlers::create_item),
        )
        .route(
            "/items/:id",
            get(handlers::get_item)
                .put(handlers::update_item)
                .delete(handlers::retire_item),
        )
        // Stock lots
        .route(
            "/stock-lots",
            get(handlers::list_stock_lots).post(handlers::receive_stock_lot),
        )
        .route("/stock-lots/remove", post(handlers::remove_stock))
        .route("/stock-lots/:id", get(handlers::get_stock_lot))
        // Movement ledger
        .route("/stock-movements", get(handlers::list_stock_movements))
        // Dashboard
        .route("/stats", get(handlers::get_inventory_stats))
        .route("/warehouses", get(handlers::list_warehouses))
        // Stock requests
        .route(
            "/stock-requests",
            get(handlers::list_stock_requests).post(handlers::create_stock_request),
        )
        .route("/stock-requests/:id", get(handlers::get_stock_request))
        .route(
            "/stock-requests/:id/approve",
            post(handlers::approve_stock_request),
        )
        .route(
            "/stock-requests/:id/reject",
            post(handlers::reject_stock_request),
        )
        .route(
            "/stock-requests/:id/fulfill",
            post(handlers::fulfill_stock_request),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
