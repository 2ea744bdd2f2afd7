//! HTTP handlers for the stock request workflow

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use shared::{Page, RequestFilter, RequestStatus};

use super::query_choice;
use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::workflow::{
    ApproveStockRequestInput, CreateStockRequestInput, FulfillmentOutcome,
    RejectStockRequestInput, StockRequestView,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListStockRequestsQuery {
    pub work_order_id: Option<String>,
    pub status: Option<String>,
    pub item_id: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Optional body for fulfillment
#[derive(Debug, Default, Deserialize)]
pub struct FulfillStockRequestInput {
    pub performed_by: Option<String>,
}

pub async fn list_stock_requests(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ListStockRequestsQuery>,
) -> AppResult<Json<Vec<StockRequestView>>> {
    let filter = RequestFilter {
        work_order_id: query_choice("work_order_id", query.work_order_id.as_deref(), |s| {
            s.parse().ok()
        })?,
        status: query_choice("status", query.status.as_deref(), RequestStatus::parse)?,
        item_id: query_choice("item_id", query.item_id.as_deref(), |s| {
            Uuid::parse_str(s).ok()
        })?,
    };
    let page = Page::from_query(
        query.page,
        query.limit,
        state.config.ledger.request_page_size,
        state.config.ledger.max_page_size,
    );
    let requests = state.request_workflow().list(&filter, page).await?;
    Ok(Json(requests))
}

pub async fn get_stock_request(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<StockRequestView>> {
    let request = state.request_workflow().get(id).await?;
    Ok(Json(request))
}

/// Raise a stock request for a work order
pub async fn create_stock_request(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateStockRequestInput>,
) -> AppResult<(StatusCode, Json<StockRequestView>)> {
    let request = state
        .request_workflow()
        .create(input, &current_user.0.username)
        .await?;
    Ok((StatusCode::CREATED, Json(request)))
}

pub async fn approve_stock_request(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    input: Option<Json<ApproveStockRequestInput>>,
) -> AppResult<Json<StockRequestView>> {
    let input = input.map(|Json(i)| i).unwrap_or_default();
    let request = state
        .request_workflow()
        .approve(id, input, &current_user.0.username)
        .await?;
    Ok(Json(request))
}

pub async fn reject_stock_request(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<RejectStockRequestInput>,
) -> AppResult<Json<StockRequestView>> {
    let request = state
        .request_workflow()
        .reject(id, input, &current_user.0.username)
        .await?;
    Ok(Json(request))
}

/// Fulfill an approved request from its warehouse's lots, oldest first
pub async fn fulfill_stock_request(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<Uuid>,
    input: Option<Json<FulfillStockRequestInput>>,
) -> AppResult<Json<FulfillmentOutcome>> {
    let input = input.map(|Json(i)| i).unwrap_or_default();
    let outcome = state
        .request_workflow()
        .fulfill(id, input.performed_by.as_deref())
        .await?;
    Ok(Json(outcome))
}
