//! Item catalog service: registration and maintenance of stockable items

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use shared::{
    validate_non_negative, validate_required, validate_sku, InventoryItem, ItemFilter, ItemStatus,
    Page,
};

use super::{check_field, with_retries};
use crate::error::{AppError, AppResult};
use crate::store::LedgerStore;

/// Item catalog backed by the ledger store
#[derive(Clone)]
pub struct ItemCatalog {
    store: Arc<dyn LedgerStore>,
    max_retries: u32,
}

/// Input for registering an item
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterItemInput {
    #[validate(length(min = 1, max = 50, message = "SKU must be between 1 and 50 characters"))]
    pub sku: String,
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 100, message = "Category must be between 1 and 100 characters"))]
    pub category: String,
    #[validate(length(min = 1, max = 50, message = "Unit must be between 1 and 50 characters"))]
    pub unit: String,
    #[serde(default)]
    pub reorder_point: Decimal,
    #[serde(default)]
    pub avg_cost: Decimal,
    pub description: Option<String>,
    #[serde(default)]
    pub suppliers: Vec<String>,
}

/// Partial item update; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateItemInput {
    #[validate(length(min = 1, max = 50, message = "SKU must be between 1 and 50 characters"))]
    pub sku: Option<String>,
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Category must be between 1 and 100 characters"))]
    pub category: Option<String>,
    #[validate(length(min = 1, max = 50, message = "Unit must be between 1 and 50 characters"))]
    pub unit: Option<String>,
    pub reorder_point: Option<Decimal>,
    pub avg_cost: Option<Decimal>,
    pub status: Option<ItemStatus>,
    pub description: Option<String>,
    pub suppliers: Option<Vec<String>>,
}

impl UpdateItemInput {
    fn is_empty(&self) -> bool {
        self.sku.is_none()
            && self.name.is_none()
            && self.category.is_none()
            && self.unit.is_none()
            && self.reorder_point.is_none()
            && self.avg_cost.is_none()
            && self.status.is_none()
            && self.description.is_none()
            && self.suppliers.is_none()
    }
}

fn clean_suppliers(suppliers: Vec<String>) -> Vec<String> {
    suppliers
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl ItemCatalog {
    pub fn new(store: Arc<dyn LedgerStore>, max_retries: u32) -> Self {
        Self { store, max_retries }
    }

    /// Register a new item; the SKU must be unused
    pub async fn register(&self, input: RegisterItemInput) -> AppResult<InventoryItem> {
        input.validate()?;

        let sku = input.sku.trim().to_string();
        check_field("sku", validate_sku(&sku), "SKU tidak valid")?;
        check_field("name", validate_required(&input.name), "Nama wajib diisi")?;
        check_field("category", validate_required(&input.category), "Kategori wajib diisi")?;
        check_field("unit", validate_required(&input.unit), "Satuan wajib diisi")?;
        check_field(
            "reorder_point",
            validate_non_negative(input.reorder_point),
            "Titik pemesanan ulang tidak boleh negatif",
        )?;
        check_field(
            "avg_cost",
            validate_non_negative(input.avg_cost),
            "Biaya rata-rata tidak boleh negatif",
        )?;

        let now = Utc::now();
        let item = InventoryItem {
            id: Uuid::new_v4(),
            sku,
            name: input.name.trim().to_string(),
            category: input.category.trim().to_string(),
            unit: input.unit.trim().to_string(),
            reorder_point: input.reorder_point,
            status: ItemStatus::Active,
            avg_cost: input.avg_cost,
            description: input.description,
            suppliers: clean_suppliers(input.suppliers),
            created_at: now,
            updated_at: now,
        };

        // A concurrent insert of the same SKU aborts this unit with a
        // serialization failure; the retry then sees the SKU as taken.
        with_retries("register_item", self.max_retries, || self.register_once(&item)).await?;

        tracing::info!(item_id = %item.id, sku = %item.sku, "Registered inventory item");
        Ok(item)
    }

    async fn register_once(&self, item: &InventoryItem) -> AppResult<()> {
        let mut tx = self.store.begin().await?;
        if tx.sku_taken(&item.sku, None).await? {
            return Err(AppError::DuplicateEntry("sku".to_string()));
        }
        tx.insert_item(item).await?;
        tx.commit().await
    }

    /// Apply a partial update; a changed SKU must not collide with another item
    pub async fn update(&self, id: Uuid, input: UpdateItemInput) -> AppResult<InventoryItem> {
        if input.is_empty() {
            return Err(AppError::ValidationError("No fields to update".to_string()));
        }
        input.validate()?;

        let item = with_retries("update_item", self.max_retries, || {
            self.update_once(id, &input)
        })
        .await?;

        tracing::info!(item_id = %item.id, "Updated inventory item");
        Ok(item)
    }

    async fn update_once(&self, id: Uuid, input: &UpdateItemInput) -> AppResult<InventoryItem> {
        let mut tx = self.store.begin().await?;
        let mut item = tx
            .item_for_update(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Inventory item".to_string()))?;

        if let Some(sku) = &input.sku {
            let sku = sku.trim().to_string();
            check_field("sku", validate_sku(&sku), "SKU tidak valid")?;
            if sku != item.sku && tx.sku_taken(&sku, Some(id)).await? {
                return Err(AppError::DuplicateEntry("sku".to_string()));
            }
            item.sku = sku;
        }
        if let Some(name) = &input.name {
            check_field("name", validate_required(name), "Nama wajib diisi")?;
            item.name = name.trim().to_string();
        }
        if let Some(category) = &input.category {
            check_field("category", validate_required(category), "Kategori wajib diisi")?;
            item.category = category.trim().to_string();
        }
        if let Some(unit) = &input.unit {
            check_field("unit", validate_required(unit), "Satuan wajib diisi")?;
            item.unit = unit.trim().to_string();
        }
        if let Some(reorder_point) = input.reorder_point {
            check_field(
                "reorder_point",
                validate_non_negative(reorder_point),
                "Titik pemesanan ulang tidak boleh negatif",
            )?;
            item.reorder_point = reorder_point;
        }
        if let Some(avg_cost) = input.avg_cost {
            check_field(
                "avg_cost",
                validate_non_negative(avg_cost),
                "Biaya rata-rata tidak boleh negatif",
            )?;
            item.avg_cost = avg_cost;
        }
        if let Some(status) = input.status {
            item.status = status;
        }
        if let Some(description) = &input.description {
            item.description = Some(description.clone()).filter(|d| !d.trim().is_empty());
        }
        if let Some(suppliers) = &input.suppliers {
            item.suppliers = clean_suppliers(suppliers.clone());
        }

        item.updated_at = Utc::now();
        tx.update_item(&item).await?;
        tx.commit().await?;
        Ok(item)
    }

    /// Mark an item discontinued; its lots are left untouched
    pub async fn retire(&self, id: Uuid) -> AppResult<InventoryItem> {
        let item =
            with_retries("retire_item", self.max_retries, || self.retire_once(id)).await?;

        tracing::info!(item_id = %item.id, "Retired inventory item");
        Ok(item)
    }

    async fn retire_once(&self, id: Uuid) -> AppResult<InventoryItem> {
        let mut tx = self.store.begin().await?;
        let mut item = tx
            .item_for_update(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Inventory item".to_string()))?;

        if item.status != ItemStatus::Discontinued {
            item.status = ItemStatus::Discontinued;
            item.updated_at = Utc::now();
            tx.update_item(&item).await?;
        }
        tx.commit().await?;
        Ok(item)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<InventoryItem> {
        self.store
            .get_item(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Inventory item".to_string()))
    }

    pub async fn list(&self, filter: &ItemFilter, page: Page) -> AppResult<Vec<InventoryItem>> {
        self.store.list_items(filter, page).await
    }
}
