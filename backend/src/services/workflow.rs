//! Stock request workflow
//!
//! `pending -> approved -> fulfilled`, or `pending -> rejected`.
//!
//! Approval reserves stock: a request is approved only if the warehouse's
//! available quantity, less what other approved requests already hold,
//! covers it. Fulfillment drains lots oldest-first inside a single unit of
//! work; either every lot decrement, movement and the status change commit
//! together, or nothing does.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use shared::{
    generate_reference_code, plan_fifo, validate_positive_quantity, validate_rejection_reason,
    AllocationPlan, InventoryItem, Page, RequestFilter, RequestStatus, StockMovement,
    StockRequest, WorkflowAction, REQUEST_CODE_PREFIX,
};

use super::lot_store::{check_low_stock, decrement_in_tx, Removal, SYSTEM_PERFORMER};
use super::notification::{LedgerEvent, NotificationOutbox};
use super::{check_field, ensure_stock_warehouse, with_retries};
use crate::error::{AppError, AppResult};
use crate::store::{LedgerStore, WarehouseDirectory, WorkOrderDirectory};

/// Notes written on every movement produced by fulfillment
pub const FULFILLMENT_NOTES: &str = "Auto-fulfilled from approved stock request";

#[derive(Clone)]
pub struct RequestWorkflow {
    store: Arc<dyn LedgerStore>,
    warehouses: Arc<dyn WarehouseDirectory>,
    work_orders: Arc<dyn WorkOrderDirectory>,
    outbox: NotificationOutbox,
    max_retries: u32,
}

/// Input for raising a stock request against a work order
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateStockRequestInput {
    pub work_order_id: i64,
    pub item_id: Uuid,
    pub quantity: Decimal,
    pub warehouse_id: Option<i64>,
    #[validate(length(max = 255, message = "Requester must be at most 255 characters"))]
    pub requested_by: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ApproveStockRequestInput {
    #[validate(length(max = 255, message = "Approver must be at most 255 characters"))]
    pub approved_by: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct RejectStockRequestInput {
    #[validate(length(max = 255, message = "Rejecter must be at most 255 characters"))]
    pub rejected_by: Option<String>,
    #[serde(default, alias = "reason")]
    pub rejection_reason: String,
}

/// A request with its item and live availability in its warehouse.
///
/// `available_stock` is read after the request and is not consistent with
/// it under concurrent writes.
#[derive(Debug, Clone, Serialize)]
pub struct StockRequestView {
    #[serde(flatten)]
    pub request: StockRequest,
    pub item: Option<InventoryItem>,
    pub available_stock: Option<Decimal>,
}

/// Result of fulfilling a request
#[derive(Debug, Clone, Serialize)]
pub struct FulfillmentOutcome {
    #[serde(flatten)]
    pub request: StockRequestView,
    pub allocation: AllocationPlan,
    pub movements: Vec<StockMovement>,
}

/// Name the caller gave, or the fallback when blank or absent
fn actor(named: Option<&str>, fallback: &str) -> String {
    named
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

impl RequestWorkflow {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        warehouses: Arc<dyn WarehouseDirectory>,
        work_orders: Arc<dyn WorkOrderDirectory>,
        outbox: NotificationOutbox,
        max_retries: u32,
    ) -> Self {
        Self {
            store,
            warehouses,
            work_orders,
            outbox,
            max_retries,
        }
    }

    /// Raise a pending request; managers are notified after commit
    pub async fn create(
        &self,
        input: CreateStockRequestInput,
        default_requester: &str,
    ) -> AppResult<StockRequestView> {
        input.validate()?;
        check_field(
            "quantity",
            validate_positive_quantity(input.quantity),
            "Jumlah harus lebih besar dari nol",
        )?;

        if !self.work_orders.work_order_exists(input.work_order_id).await? {
            return Err(AppError::NotFound("Work order".to_string()));
        }
        if self.store.get_item(input.item_id).await?.is_none() {
            return Err(AppError::NotFound("Inventory item".to_string()));
        }
        if let Some(warehouse_id) = input.warehouse_id {
            ensure_stock_warehouse(self.warehouses.as_ref(), warehouse_id).await?;
        }

        let requester = actor(input.requested_by.as_deref(), default_requester);
        check_field(
            "requested_by",
            shared::validate_required(&requester),
            "Pemohon wajib diisi",
        )?;

        let now = Utc::now();
        let request = StockRequest {
            id: Uuid::new_v4(),
            request_code: generate_reference_code(REQUEST_CODE_PREFIX, now),
            work_order_id: input.work_order_id,
            item_id: input.item_id,
            quantity: input.quantity,
            warehouse_id: input.warehouse_id,
            status: RequestStatus::Pending,
            requested_by: requester,
            approved_by: None,
            approved_at: None,
            rejected_by: None,
            rejected_at: None,
            rejection_reason: None,
            fulfilled_at: None,
            notes: input.notes,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.store.begin().await?;
        tx.insert_request(&request).await?;
        tx.commit().await?;

        tracing::info!(
            request_code = %request.request_code,
            work_order_id = request.work_order_id,
            quantity = %request.quantity,
            "Created stock request"
        );
        self.outbox.publish(LedgerEvent::RequestCreated {
            request_id: request.id,
            request_code: request.request_code.clone(),
            work_order_id: request.work_order_id,
            requested_by: request.requested_by.clone(),
        });

        Ok(self.view(request).await)
    }

    /// Approve a pending request, reserving its quantity in the bound warehouse
    pub async fn approve(
        &self,
        id: Uuid,
        input: ApproveStockRequestInput,
        default_approver: &str,
    ) -> AppResult<StockRequestView> {
        input.validate()?;
        let approver = actor(input.approved_by.as_deref(), default_approver);
        let notes = input.notes.as_deref();

        let request = with_retries("approve_stock_request", self.max_retries, || {
            self.approve_once(id, &approver, notes)
        })
        .await?;

        tracing::info!(
            request_code = %request.request_code,
            approved_by = %approver,
            "Approved stock request"
        );
        self.outbox.publish(LedgerEvent::RequestApproved {
            request_id: request.id,
            request_code: request.request_code.clone(),
            requested_by: request.requested_by.clone(),
            approved_by: approver,
        });

        Ok(self.view(request).await)
    }

    async fn approve_once(
        &self,
        id: Uuid,
        approver: &str,
        notes: Option<&str>,
    ) -> AppResult<StockRequest> {
        let mut tx = self.store.begin().await?;
        let mut request = tx
            .request_for_update(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Stock request".to_string()))?;

        request.status.next(WorkflowAction::Approve)?;

        if let Some(warehouse_id) = request.warehouse_id {
            let on_hand = tx.available_quantity(request.item_id, warehouse_id).await?;
            let reserved = tx
                .reserved_quantity(request.item_id, warehouse_id, request.id)
                .await?;
            let available = (on_hand - reserved).max(Decimal::ZERO);
            if available < request.quantity {
                return Err(AppError::InsufficientQuantity {
                    available,
                    requested: request.quantity,
                });
            }
        }

        request.approve(approver, notes.map(str::to_string), Utc::now())?;
        tx.update_request(&request).await?;
        tx.commit().await?;
        Ok(request)
    }

    /// Reject a pending request; a reason is required
    pub async fn reject(
        &self,
        id: Uuid,
        input: RejectStockRequestInput,
        default_rejecter: &str,
    ) -> AppResult<StockRequestView> {
        input.validate()?;
        check_field(
            "rejection_reason",
            validate_rejection_reason(&input.rejection_reason),
            "Alasan penolakan wajib diisi",
        )?;
        let rejecter = actor(input.rejected_by.as_deref(), default_rejecter);
        let reason = input.rejection_reason.trim();

        let request = with_retries("reject_stock_request", self.max_retries, || {
            self.reject_once(id, &rejecter, reason)
        })
        .await?;

        tracing::info!(
            request_code = %request.request_code,
            rejected_by = %rejecter,
            "Rejected stock request"
        );
        self.outbox.publish(LedgerEvent::RequestRejected {
            request_id: request.id,
            request_code: request.request_code.clone(),
            requested_by: request.requested_by.clone(),
            rejected_by: rejecter,
            reason: reason.to_string(),
        });

        Ok(self.view(request).await)
    }

    async fn reject_once(&self, id: Uuid, rejecter: &str, reason: &str) -> AppResult<StockRequest> {
        let mut tx = self.store.begin().await?;
        let mut request = tx
            .request_for_update(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Stock request".to_string()))?;

        request.reject(rejecter, reason, Utc::now())?;
        tx.update_request(&request).await?;
        tx.commit().await?;
        Ok(request)
    }

    /// Fulfill an approved request by draining its warehouse's lots in FIFO
    /// order
    pub async fn fulfill(&self, id: Uuid, performer: Option<&str>) -> AppResult<FulfillmentOutcome> {
        let performer = actor(performer, SYSTEM_PERFORMER);

        let (request, allocation, movements) =
            with_retries("fulfill_stock_request", self.max_retries, || {
                self.fulfill_once(id, &performer)
            })
            .await?;

        tracing::info!(
            request_code = %request.request_code,
            lots = allocation.allocations.len(),
            quantity = %allocation.total_quantity(),
            cost = %allocation.total_cost(),
            "Fulfilled stock request"
        );
        self.outbox.publish(LedgerEvent::RequestFulfilled {
            request_id: request.id,
            request_code: request.request_code.clone(),
            requested_by: request.requested_by.clone(),
            quantity: request.quantity,
        });
        if let Some(warehouse_id) = request.warehouse_id {
            check_low_stock(self.store.as_ref(), &self.outbox, request.item_id, warehouse_id).await;
        }

        Ok(FulfillmentOutcome {
            request: self.view(request).await,
            allocation,
            movements,
        })
    }

    async fn fulfill_once(
        &self,
        id: Uuid,
        performer: &str,
    ) -> AppResult<(StockRequest, AllocationPlan, Vec<StockMovement>)> {
        let mut tx = self.store.begin().await?;
        let mut request = tx
            .request_for_update(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Stock request".to_string()))?;

        request.status.next(WorkflowAction::Fulfill)?;
        let warehouse_id = request.warehouse_id.ok_or(AppError::MissingWarehouse)?;

        let lots = tx
            .available_lots_for_update(request.item_id, warehouse_id)
            .await?;
        let plan = plan_fifo(&lots, request.quantity)?;

        let now = Utc::now();
        let removal = Removal {
            reason: format!("Fulfill stock request {}", request.request_code),
            performed_by: performer.to_string(),
            reference: Some(format!("Stock Request #{}", request.request_code)),
            notes: Some(FULFILLMENT_NOTES.to_string()),
            stock_request_id: Some(request.id),
        };

        let mut movements = Vec::with_capacity(plan.allocations.len());
        for allocation in &plan.allocations {
            let (_, movement) = decrement_in_tx(
                tx.as_mut(),
                allocation.lot_id,
                allocation.quantity,
                &removal,
                now,
            )
            .await?;
            movements.push(movement);
        }

        request.fulfill(now)?;
        tx.update_request(&request).await?;
        tx.commit().await?;
        Ok((request, plan, movements))
    }

    pub async fn get(&self, id: Uuid) -> AppResult<StockRequestView> {
        let request = self
            .store
            .get_request(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Stock request".to_string()))?;
        Ok(self.view(request).await)
    }

    pub async fn list(&self, filter: &RequestFilter, page: Page) -> AppResult<Vec<StockRequestView>> {
        let requests = self.store.list_requests(filter, page).await?;
        let mut views = Vec::with_capacity(requests.len());
        for request in requests {
            views.push(self.view(request).await);
        }
        Ok(views)
    }

    /// Attach the item and live availability; lookups here are best-effort
    async fn view(&self, request: StockRequest) -> StockRequestView {
        let item = match self.store.get_item(request.item_id).await {
            Ok(item) => item,
            Err(err) => {
                tracing::warn!(request_id = %request.id, "Failed to load request item: {}", err);
                None
            }
        };

        let available_stock = match request.warehouse_id {
            Some(warehouse_id) => {
                match self
                    .store
                    .available_quantity(request.item_id, warehouse_id)
                    .await
                {
                    Ok(quantity) => Some(quantity),
                    Err(err) => {
                        tracing::warn!(
                            request_id = %request.id,
                            "Failed to load available stock: {}",
                            err
                        );
                        None
                    }
                }
            }
            None => None,
        };

        StockRequestView {
            request,
            item,
            available_stock,
        }
    }
}
