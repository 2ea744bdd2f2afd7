//! PostgreSQL ledger store
//!
//! Units of work run at SERIALIZABLE isolation and take `FOR UPDATE` locks on
//! the request row and every lot they touch. Serialization failures surface
//! as `AppError::TransactionConflict` so callers can retry the whole unit.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use shared::{
    InventoryItem, ItemFilter, ItemStatus, LotFilter, LotStatus, MovementFilter, MovementType,
    Page, RequestFilter, RequestStatus, StockLot, StockMovement, StockRequest,
};

use super::{LedgerStore, LedgerTotals, LedgerTx};
use crate::error::{AppError, AppResult};

const ITEM_COLUMNS: &str = "i.id, i.sku, i.name, i.category, i.unit, i.reorder_point, i.status, \
     i.avg_cost, i.description, i.suppliers, i.created_at, i.updated_at";

const LOT_COLUMNS: &str = "sl.id, sl.lot_code, sl.item_id, sl.warehouse_id, sl.batch_no, \
     sl.quantity, sl.unit_cost, sl.total_cost, sl.expiry_date, sl.supplier, sl.status, sl.notes, \
     sl.received_date, sl.created_at, sl.updated_at";

const MOVEMENT_COLUMNS: &str = "sm.id, sm.movement_code, sm.item_id, sm.lot_id, sm.warehouse_id, \
     sm.type, sm.quantity, sm.unit_cost, sm.total_cost, sm.reason, sm.reference, sm.performed_by, \
     sm.notes, sm.stock_request_id, sm.created_at";

const REQUEST_COLUMNS: &str = "sr.id, sr.request_code, sr.work_order_id, sr.item_id, sr.quantity, \
     sr.warehouse_id, sr.status, sr.requested_by, sr.approved_by, sr.approved_at, sr.rejected_by, \
     sr.rejected_at, sr.rejection_reason, sr.fulfilled_at, sr.notes, sr.created_at, sr.updated_at";

/// Translate store failures into the ledger's error taxonomy
pub(crate) fn map_db_error(err: sqlx::Error) -> AppError {
    if let Some(db_err) = err.as_database_error() {
        let code = db_err.code().map(|c| c.into_owned());
        match code.as_deref() {
            // serialization_failure, deadlock_detected
            Some("40001") | Some("40P01") => {
                return AppError::TransactionConflict(db_err.message().to_string());
            }
            // unique_violation
            Some("23505") => {
                let field = match db_err.constraint() {
                    Some(c) if c.contains("sku") => "sku",
                    Some(c) if c.contains("lot_code") => "lot_code",
                    _ => "code",
                };
                return AppError::DuplicateEntry(field.to_string());
            }
            _ => {}
        }
    }
    AppError::DatabaseError(err)
}

fn unknown_value(column: &str, value: &str) -> AppError {
    AppError::Internal(format!("Unrecognized {} value in store: {}", column, value))
}

// ============================================================================
// Row types
// ============================================================================

#[derive(Debug, FromRow)]
struct ItemRow {
    id: Uuid,
    sku: String,
    name: String,
    category: String,
    unit: String,
    reorder_point: Decimal,
    status: String,
    avg_cost: Decimal,
    description: Option<String>,
    suppliers: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ItemRow {
    fn into_model(self) -> AppResult<InventoryItem> {
        let status =
            ItemStatus::parse(&self.status).ok_or_else(|| unknown_value("item status", &self.status))?;
        Ok(InventoryItem {
            id: self.id,
            sku: self.sku,
            name: self.name,
            category: self.category,
            unit: self.unit,
            reorder_point: self.reorder_point,
            status,
            avg_cost: self.avg_cost,
            description: self.description,
            suppliers: self.suppliers,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct LotRow {
    id: Uuid,
    lot_code: String,
    item_id: Uuid,
    warehouse_id: i64,
    batch_no: String,
    quantity: Decimal,
    unit_cost: Decimal,
    total_cost: Decimal,
    expiry_date: Option<NaiveDate>,
    supplier: String,
    status: String,
    notes: Option<String>,
    received_date: NaiveDate,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl LotRow {
    fn into_model(self) -> AppResult<StockLot> {
        let status =
            LotStatus::parse(&self.status).ok_or_else(|| unknown_value("lot status", &self.status))?;
        Ok(StockLot {
            id: self.id,
            lot_code: self.lot_code,
            item_id: self.item_id,
            warehouse_id: self.warehouse_id,
            batch_no: self.batch_no,
            quantity: self.quantity,
            unit_cost: self.unit_cost,
            total_cost: self.total_cost,
            expiry_date: self.expiry_date,
            supplier: self.supplier,
            status,
            notes: self.notes,
            received_date: self.received_date,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct MovementRow {
    id: Uuid,
    movement_code: String,
    item_id: Uuid,
    lot_id: Option<Uuid>,
    warehouse_id: i64,
    #[sqlx(rename = "type")]
    movement_type: String,
    quantity: Decimal,
    unit_cost: Decimal,
    total_cost: Decimal,
    reason: String,
    reference: Option<String>,
    performed_by: String,
    notes: Option<String>,
    stock_request_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl MovementRow {
    fn into_model(self) -> AppResult<StockMovement> {
        let movement_type = MovementType::parse(&self.movement_type)
            .ok_or_else(|| unknown_value("movement type", &self.movement_type))?;
        Ok(StockMovement {
            id: self.id,
            movement_code: self.movement_code,
            item_id: self.item_id,
            lot_id: self.lot_id,
            warehouse_id: self.warehouse_id,
            movement_type,
            quantity: self.quantity,
            unit_cost: self.unit_cost,
            total_cost: self.total_cost,
            reason: self.reason,
            reference: self.reference,
            performed_by: self.performed_by,
            notes: self.notes,
            stock_request_id: self.stock_request_id,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct RequestRow {
    id: Uuid,
    request_code: String,
    work_order_id: i64,
    item_id: Uuid,
    quantity: Decimal,
    warehouse_id: Option<i64>,
    status: String,
    requested_by: String,
    approved_by: Option<String>,
    approved_at: Option<DateTime<Utc>>,
    rejected_by: Option<String>,
    rejected_at: Option<DateTime<Utc>>,
    rejection_reason: Option<String>,
    fulfilled_at: Option<DateTime<Utc>>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RequestRow {
    fn into_model(self) -> AppResult<StockRequest> {
        let status = RequestStatus::parse(&self.status)
            .ok_or_else(|| unknown_value("request status", &self.status))?;
        Ok(StockRequest {
            id: self.id,
            request_code: self.request_code,
            work_order_id: self.work_order_id,
            item_id: self.item_id,
            quantity: self.quantity,
            warehouse_id: self.warehouse_id,
            status,
            requested_by: self.requested_by,
            approved_by: self.approved_by,
            approved_at: self.approved_at,
            rejected_by: self.rejected_by,
            rejected_at: self.rejected_at,
            rejection_reason: self.rejection_reason,
            fulfilled_at: self.fulfilled_at,
            notes: self.notes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct TotalsRow {
    active_items: i64,
    stock_value: Decimal,
    low_stock_items: i64,
    movements_since: i64,
}

fn collect<R, T>(rows: Vec<R>, convert: fn(R) -> AppResult<T>) -> AppResult<Vec<T>> {
    rows.into_iter().map(convert).collect()
}

/// Substring pattern for `ILIKE ... ESCAPE '\'` with LIKE wildcards in the
/// search text matched literally
pub(crate) fn like_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for c in search.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn push_page(qb: &mut QueryBuilder<'_, Postgres>, page: Page) {
    qb.push(" LIMIT ")
        .push_bind(i64::from(page.limit))
        .push(" OFFSET ")
        .push_bind(page.offset() as i64);
}

// ============================================================================
// Store
// ============================================================================

/// Ledger store backed by PostgreSQL
#[derive(Clone)]
pub struct PgLedgerStore {
    db: PgPool,
}

impl PgLedgerStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub fn pool(&self) -> &PgPool {
        &self.db
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn begin(&self) -> AppResult<Box<dyn LedgerTx>> {
        let mut tx = self.db.begin().await.map_err(map_db_error)?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        Ok(Box::new(PgLedgerTx { tx }))
    }

    async fn get_item(&self, id: Uuid) -> AppResult<Option<InventoryItem>> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {} FROM inventory_items i WHERE i.id = $1",
            ITEM_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(map_db_error)?;
        row.map(ItemRow::into_model).transpose()
    }

    async fn list_items(&self, filter: &ItemFilter, page: Page) -> AppResult<Vec<InventoryItem>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM inventory_items i WHERE 1 = 1",
            ITEM_COLUMNS
        ));
        if let Some(search) = &filter.search {
            let pattern = like_pattern(search);
            qb.push(" AND (i.sku ILIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR i.name ILIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR i.description ILIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }
        if let Some(category) = &filter.category {
            qb.push(" AND i.category = ").push_bind(category.clone());
        }
        qb.push(" ORDER BY i.created_at DESC");
        push_page(&mut qb, page);

        let rows = qb
            .build_query_as::<ItemRow>()
            .fetch_all(&self.db)
            .await
            .map_err(map_db_error)?;
        collect(rows, ItemRow::into_model)
    }

    async fn get_lot(&self, id: Uuid) -> AppResult<Option<StockLot>> {
        let row = sqlx::query_as::<_, LotRow>(&format!(
            "SELECT {} FROM stock_lots sl WHERE sl.id = $1",
            LOT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(map_db_error)?;
        row.map(LotRow::into_model).transpose()
    }

    async fn list_lots(&self, filter: &LotFilter, page: Page) -> AppResult<Vec<StockLot>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM stock_lots sl JOIN inventory_items i ON i.id = sl.item_id WHERE 1 = 1",
            LOT_COLUMNS
        ));
        if let Some(search) = &filter.search {
            let pattern = like_pattern(search);
            qb.push(" AND (sl.lot_code ILIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR sl.batch_no ILIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR sl.supplier ILIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR i.name ILIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }
        if let Some(item_id) = filter.item_id {
            qb.push(" AND sl.item_id = ").push_bind(item_id);
        }
        if let Some(warehouse_id) = filter.warehouse_id {
            qb.push(" AND sl.warehouse_id = ").push_bind(warehouse_id);
        }
        if let Some(status) = filter.status {
            qb.push(" AND sl.status = ").push_bind(status.as_str());
        }
        qb.push(" ORDER BY sl.received_date DESC, sl.created_at DESC");
        push_page(&mut qb, page);

        let rows = qb
            .build_query_as::<LotRow>()
            .fetch_all(&self.db)
            .await
            .map_err(map_db_error)?;
        collect(rows, LotRow::into_model)
    }

    async fn list_movements(
        &self,
        filter: &MovementFilter,
        page: Page,
    ) -> AppResult<Vec<StockMovement>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM stock_movements sm WHERE 1 = 1",
            MOVEMENT_COLUMNS
        ));
        if let Some(search) = &filter.search {
            let pattern = like_pattern(search);
            qb.push(" AND (sm.movement_code ILIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR sm.reason ILIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR sm.reference ILIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR sm.performed_by ILIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }
        if let Some(movement_type) = filter.movement_type {
            qb.push(" AND sm.type = ").push_bind(movement_type.as_str());
        }
        if let Some(item_id) = filter.item_id {
            qb.push(" AND sm.item_id = ").push_bind(item_id);
        }
        if let Some(lot_id) = filter.lot_id {
            qb.push(" AND sm.lot_id = ").push_bind(lot_id);
        }
        if let Some(warehouse_id) = filter.warehouse_id {
            qb.push(" AND sm.warehouse_id = ").push_bind(warehouse_id);
        }
        if let Some(request_id) = filter.stock_request_id {
            qb.push(" AND sm.stock_request_id = ").push_bind(request_id);
        }
        qb.push(" ORDER BY sm.created_at DESC");
        push_page(&mut qb, page);

        let rows = qb
            .build_query_as::<MovementRow>()
            .fetch_all(&self.db)
            .await
            .map_err(map_db_error)?;
        collect(rows, MovementRow::into_model)
    }

    async fn get_request(&self, id: Uuid) -> AppResult<Option<StockRequest>> {
        let row = sqlx::query_as::<_, RequestRow>(&format!(
            "SELECT {} FROM stock_requests sr WHERE sr.id = $1",
            REQUEST_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(map_db_error)?;
        row.map(RequestRow::into_model).transpose()
    }

    async fn list_requests(
        &self,
        filter: &RequestFilter,
        page: Page,
    ) -> AppResult<Vec<StockRequest>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM stock_requests sr WHERE 1 = 1",
            REQUEST_COLUMNS
        ));
        if let Some(work_order_id) = filter.work_order_id {
            qb.push(" AND sr.work_order_id = ").push_bind(work_order_id);
        }
        if let Some(status) = filter.status {
            qb.push(" AND sr.status = ").push_bind(status.as_str());
        }
        if let Some(item_id) = filter.item_id {
            qb.push(" AND sr.item_id = ").push_bind(item_id);
        }
        qb.push(" ORDER BY sr.created_at DESC");
        push_page(&mut qb, page);

        let rows = qb
            .build_query_as::<RequestRow>()
            .fetch_all(&self.db)
            .await
            .map_err(map_db_error)?;
        collect(rows, RequestRow::into_model)
    }

    async fn available_quantity(&self, item_id: Uuid, warehouse_id: i64) -> AppResult<Decimal> {
        sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(SUM(quantity), 0)
            FROM stock_lots
            WHERE item_id = $1 AND warehouse_id = $2 AND status = 'available'
            "#,
        )
        .bind(item_id)
        .bind(warehouse_id)
        .fetch_one(&self.db)
        .await
        .map_err(map_db_error)
    }

    async fn totals(&self, since: DateTime<Utc>) -> AppResult<LedgerTotals> {
        let row = sqlx::query_as::<_, TotalsRow>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM inventory_items WHERE status = 'active') AS active_items,
                (SELECT COALESCE(SUM(quantity * unit_cost), 0)
                   FROM stock_lots WHERE status = 'available') AS stock_value,
                (SELECT COUNT(*)
                   FROM inventory_items i
                  WHERE i.status = 'active'
                    AND COALESCE((SELECT SUM(sl.quantity) FROM stock_lots sl
                                   WHERE sl.item_id = i.id AND sl.status = 'available'), 0)
                        <= i.reorder_point) AS low_stock_items,
                (SELECT COUNT(*) FROM stock_movements WHERE created_at >= $1) AS movements_since
            "#,
        )
        .bind(since)
        .fetch_one(&self.db)
        .await
        .map_err(map_db_error)?;

        Ok(LedgerTotals {
            active_items: row.active_items,
            stock_value: row.stock_value,
            low_stock_items: row.low_stock_items,
            movements_since: row.movements_since,
        })
    }
}

// ============================================================================
// Unit of work
// ============================================================================

/// A SERIALIZABLE PostgreSQL transaction
pub struct PgLedgerTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    async fn sku_taken(&mut self, sku: &str, exclude: Option<Uuid>) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM inventory_items WHERE sku = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(sku)
        .bind(exclude)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_db_error)
    }

    async fn insert_item(&mut self, item: &InventoryItem) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO inventory_items (
                id, sku, name, category, unit, reorder_point, status, avg_cost,
                description, suppliers, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(item.id)
        .bind(&item.sku)
        .bind(&item.name)
        .bind(&item.category)
        .bind(&item.unit)
        .bind(item.reorder_point)
        .bind(item.status.as_str())
        .bind(item.avg_cost)
        .bind(&item.description)
        .bind(&item.suppliers)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_db_error)?;
        Ok(())
    }

    async fn item_for_update(&mut self, id: Uuid) -> AppResult<Option<InventoryItem>> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {} FROM inventory_items i WHERE i.id = $1 FOR UPDATE",
            ITEM_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_db_error)?;
        row.map(ItemRow::into_model).transpose()
    }

    async fn update_item(&mut self, item: &InventoryItem) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE inventory_items
            SET sku = $2, name = $3, category = $4, unit = $5, reorder_point = $6,
                status = $7, avg_cost = $8, description = $9, suppliers = $10, updated_at = $11
            WHERE id = $1
            "#,
        )
        .bind(item.id)
        .bind(&item.sku)
        .bind(&item.name)
        .bind(&item.category)
        .bind(&item.unit)
        .bind(item.reorder_point)
        .bind(item.status.as_str())
        .bind(item.avg_cost)
        .bind(&item.description)
        .bind(&item.suppliers)
        .bind(item.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_db_error)?;
        Ok(())
    }

    async fn insert_lot(&mut self, lot: &StockLot) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO stock_lots (
                id, lot_code, item_id, warehouse_id, batch_no, quantity, unit_cost, total_cost,
                expiry_date, supplier, status, notes, received_date, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(lot.id)
        .bind(&lot.lot_code)
        .bind(lot.item_id)
        .bind(lot.warehouse_id)
        .bind(&lot.batch_no)
        .bind(lot.quantity)
        .bind(lot.unit_cost)
        .bind(lot.total_cost)
        .bind(lot.expiry_date)
        .bind(&lot.supplier)
        .bind(lot.status.as_str())
        .bind(&lot.notes)
        .bind(lot.received_date)
        .bind(lot.created_at)
        .bind(lot.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_db_error)?;
        Ok(())
    }

    async fn lot_for_update(&mut self, id: Uuid) -> AppResult<Option<StockLot>> {
        let row = sqlx::query_as::<_, LotRow>(&format!(
            "SELECT {} FROM stock_lots sl WHERE sl.id = $1 FOR UPDATE",
            LOT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_db_error)?;
        row.map(LotRow::into_model).transpose()
    }

    async fn available_lots_for_update(
        &mut self,
        item_id: Uuid,
        warehouse_id: i64,
    ) -> AppResult<Vec<StockLot>> {
        let rows = sqlx::query_as::<_, LotRow>(&format!(
            r#"
            SELECT {}
            FROM stock_lots sl
            WHERE sl.item_id = $1 AND sl.warehouse_id = $2
              AND sl.status = 'available' AND sl.quantity > 0
            ORDER BY sl.received_date ASC, sl.created_at ASC
            FOR UPDATE
            "#,
            LOT_COLUMNS
        ))
        .bind(item_id)
        .bind(warehouse_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_db_error)?;
        collect(rows, LotRow::into_model)
    }

    async fn update_lot(&mut self, lot: &StockLot) -> AppResult<()> {
        sqlx::query(
            "UPDATE stock_lots SET quantity = $2, status = $3, notes = $4, updated_at = $5 WHERE id = $1",
        )
        .bind(lot.id)
        .bind(lot.quantity)
        .bind(lot.status.as_str())
        .bind(&lot.notes)
        .bind(lot.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_db_error)?;
        Ok(())
    }

    async fn insert_movement(&mut self, movement: &StockMovement) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO stock_movements (
                id, movement_code, item_id, lot_id, warehouse_id, type, quantity, unit_cost,
                total_cost, reason, reference, performed_by, notes, stock_request_id, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(movement.id)
        .bind(&movement.movement_code)
        .bind(movement.item_id)
        .bind(movement.lot_id)
        .bind(movement.warehouse_id)
        .bind(movement.movement_type.as_str())
        .bind(movement.quantity)
        .bind(movement.unit_cost)
        .bind(movement.total_cost)
        .bind(&movement.reason)
        .bind(&movement.reference)
        .bind(&movement.performed_by)
        .bind(&movement.notes)
        .bind(movement.stock_request_id)
        .bind(movement.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_db_error)?;
        Ok(())
    }

    async fn insert_request(&mut self, request: &StockRequest) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO stock_requests (
                id, request_code, work_order_id, item_id, quantity, warehouse_id, status,
                requested_by, notes, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(request.id)
        .bind(&request.request_code)
        .bind(request.work_order_id)
        .bind(request.item_id)
        .bind(request.quantity)
        .bind(request.warehouse_id)
        .bind(request.status.as_str())
        .bind(&request.requested_by)
        .bind(&request.notes)
        .bind(request.created_at)
        .bind(request.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_db_error)?;
        Ok(())
    }

    async fn request_for_update(&mut self, id: Uuid) -> AppResult<Option<StockRequest>> {
        let row = sqlx::query_as::<_, RequestRow>(&format!(
            "SELECT {} FROM stock_requests sr WHERE sr.id = $1 FOR UPDATE",
            REQUEST_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_db_error)?;
        row.map(RequestRow::into_model).transpose()
    }

    async fn update_request(&mut self, request: &StockRequest) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE stock_requests
            SET status = $2, approved_by = $3, approved_at = $4, rejected_by = $5,
                rejected_at = $6, rejection_reason = $7, fulfilled_at = $8, notes = $9,
                updated_at = $10
            WHERE id = $1
            "#,
        )
        .bind(request.id)
        .bind(request.status.as_str())
        .bind(&request.approved_by)
        .bind(request.approved_at)
        .bind(&request.rejected_by)
        .bind(request.rejected_at)
        .bind(&request.rejection_reason)
        .bind(request.fulfilled_at)
        .bind(&request.notes)
        .bind(request.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_db_error)?;
        Ok(())
    }

    async fn available_quantity(&mut self, item_id: Uuid, warehouse_id: i64) -> AppResult<Decimal> {
        sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(SUM(quantity), 0)
            FROM stock_lots
            WHERE item_id = $1 AND warehouse_id = $2 AND status = 'available'
            "#,
        )
        .bind(item_id)
        .bind(warehouse_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_db_error)
    }

    async fn reserved_quantity(
        &mut self,
        item_id: Uuid,
        warehouse_id: i64,
        exclude: Uuid,
    ) -> AppResult<Decimal> {
        sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(SUM(quantity), 0)
            FROM stock_requests
            WHERE item_id = $1 AND warehouse_id = $2 AND status = 'approved' AND id <> $3
            "#,
        )
        .bind(item_id)
        .bind(warehouse_id)
        .bind(exclude)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_db_error)
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await.map_err(map_db_error)
    }
}
