//! Read-only views of entities owned by the surrounding application
//!
//! Warehouses are plots, work orders and users live in their own tables; the
//! ledger only asks whether they exist and who should be notified.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use shared::{Warehouse, STOCK_LOCATION_TYPES};

use super::postgres::{like_pattern, map_db_error};
use crate::error::AppResult;

/// Resolves stock-holding locations
#[async_trait]
pub trait WarehouseDirectory: Send + Sync {
    /// Any location by id, whether or not it holds stock
    async fn find_location(&self, id: i64) -> AppResult<Option<Warehouse>>;

    /// Stock-holding locations, optionally filtered by name or description
    async fn list_warehouses(&self, search: Option<&str>) -> AppResult<Vec<Warehouse>>;

    async fn is_stock_warehouse(&self, id: i64) -> AppResult<bool> {
        Ok(self
            .find_location(id)
            .await?
            .is_some_and(|w| w.holds_stock()))
    }

    async fn count_warehouses(&self) -> AppResult<i64> {
        Ok(self.list_warehouses(None).await?.len() as i64)
    }
}

/// Resolves work orders that raise stock requests
#[async_trait]
pub trait WorkOrderDirectory: Send + Sync {
    async fn work_order_exists(&self, id: i64) -> AppResult<bool>;
}

/// Resolves who receives ledger notifications
#[async_trait]
pub trait RecipientDirectory: Send + Sync {
    /// Approved users holding any of `roles`
    async fn users_with_roles(&self, roles: &[String]) -> AppResult<Vec<i64>>;

    /// User id for a username or email
    async fn user_id_by_name(&self, name: &str) -> AppResult<Option<i64>>;
}

// ============================================================================
// PostgreSQL
// ============================================================================

#[derive(Debug, FromRow)]
struct LocationRow {
    id: i64,
    name: String,
    description: Option<String>,
    #[sqlx(rename = "type")]
    location_type: String,
}

impl From<LocationRow> for Warehouse {
    fn from(row: LocationRow) -> Self {
        Warehouse {
            id: row.id,
            name: row.name,
            description: row.description,
            location_type: row.location_type,
        }
    }
}

/// Directory backed by the application's `plots`, `work_orders` and `users` tables
#[derive(Clone)]
pub struct PgDirectory {
    db: PgPool,
}

impl PgDirectory {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl WarehouseDirectory for PgDirectory {
    async fn find_location(&self, id: i64) -> AppResult<Option<Warehouse>> {
        let row = sqlx::query_as::<_, LocationRow>(
            "SELECT id::BIGINT AS id, name, description, type FROM plots WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(map_db_error)?;
        Ok(row.map(Warehouse::from))
    }

    async fn list_warehouses(&self, search: Option<&str>) -> AppResult<Vec<Warehouse>> {
        let pattern = search.map(like_pattern);
        let rows = sqlx::query_as::<_, LocationRow>(
            r#"
            SELECT id::BIGINT AS id, name, description, type
            FROM plots
            WHERE type = ANY($1)
              AND ($2::text IS NULL OR name ILIKE $2 ESCAPE '\' OR description ILIKE $2 ESCAPE '\')
            ORDER BY name
            "#,
        )
        .bind(STOCK_LOCATION_TYPES)
        .bind(pattern)
        .fetch_all(&self.db)
        .await
        .map_err(map_db_error)?;
        Ok(rows.into_iter().map(Warehouse::from).collect())
    }

    async fn count_warehouses(&self) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM plots WHERE type = ANY($1)")
            .bind(STOCK_LOCATION_TYPES)
            .fetch_one(&self.db)
            .await
            .map_err(map_db_error)
    }
}

#[async_trait]
impl WorkOrderDirectory for PgDirectory {
    async fn work_order_exists(&self, id: i64) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM work_orders WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.db)
            .await
            .map_err(map_db_error)
    }
}

#[async_trait]
impl RecipientDirectory for PgDirectory {
    async fn users_with_roles(&self, roles: &[String]) -> AppResult<Vec<i64>> {
        sqlx::query_scalar::<_, i64>(
            "SELECT id::BIGINT FROM users WHERE role = ANY($1) AND status = 'approved' ORDER BY id",
        )
        .bind(roles)
        .fetch_all(&self.db)
        .await
        .map_err(map_db_error)
    }

    async fn user_id_by_name(&self, name: &str) -> AppResult<Option<i64>> {
        sqlx::query_scalar::<_, i64>(
            "SELECT id::BIGINT FROM users WHERE username = $1 OR email = $1 LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.db)
        .await
        .map_err(map_db_error)
    }
}

// ============================================================================
// Static
// ============================================================================

/// Fixed directory for tests and local runs without the host application
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    locations: Vec<Warehouse>,
    work_orders: HashSet<i64>,
    users: HashMap<String, (i64, String)>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_location(mut self, id: i64, name: &str, location_type: &str) -> Self {
        self.locations.push(Warehouse {
            id,
            name: name.to_string(),
            description: None,
            location_type: location_type.to_string(),
        });
        self
    }

    pub fn with_warehouse(self, id: i64, name: &str) -> Self {
        self.with_location(id, name, "warehouse")
    }

    pub fn with_work_order(mut self, id: i64) -> Self {
        self.work_orders.insert(id);
        self
    }

    pub fn with_user(mut self, id: i64, username: &str, role: &str) -> Self {
        self.users
            .insert(username.to_string(), (id, role.to_string()));
        self
    }
}

#[async_trait]
impl WarehouseDirectory for StaticDirectory {
    async fn find_location(&self, id: i64) -> AppResult<Option<Warehouse>> {
        Ok(self.locations.iter().find(|w| w.id == id).cloned())
    }

    async fn list_warehouses(&self, search: Option<&str>) -> AppResult<Vec<Warehouse>> {
        let needle = search.map(str::to_lowercase);
        let mut warehouses: Vec<Warehouse> = self
            .locations
            .iter()
            .filter(|w| w.holds_stock())
            .filter(|w| {
                needle
                    .as_deref()
                    .map_or(true, |n| w.name.to_lowercase().contains(n))
            })
            .cloned()
            .collect();
        warehouses.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(warehouses)
    }
}

#[async_trait]
impl WorkOrderDirectory for StaticDirectory {
    async fn work_order_exists(&self, id: i64) -> AppResult<bool> {
        Ok(self.work_orders.contains(&id))
    }
}

#[async_trait]
impl RecipientDirectory for StaticDirectory {
    async fn users_with_roles(&self, roles: &[String]) -> AppResult<Vec<i64>> {
        let mut ids: Vec<i64> = self
            .users
            .values()
            .filter(|(_, role)| roles.contains(role))
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn user_id_by_name(&self, name: &str) -> AppResult<Option<i64>> {
        Ok(self.users.get(name).map(|(id, _)| *id))
    }
}
