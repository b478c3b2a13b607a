//! Inventory record store: availability, FIFO listing and audited adjustment

use serde::{Deserialize, Serialize};
use serde_json::json;

use shared::{
    is_low, validate_non_negative, validate_required_text, InventoryFilter, InventoryPatch,
    InventoryRecord, NewInventoryRecord, PaginatedResponse, Pagination, Warehouse,
};

use crate::config::LedgerConfig;
use crate::error::{AppError, AppResult};
use crate::services::audit;
use crate::store::{LedgerStore, LedgerTx};

/// Inventory service over a ledger store
#[derive(Clone)]
pub struct InventoryService<S> {
    store: S,
    ledger: LedgerConfig,
}

/// Input for an absolute quantity correction
#[derive(Debug, Deserialize)]
pub struct AdjustInventoryInput {
    pub quantity: i32,
    pub batch_number: Option<String>,
    pub serial_number: Option<String>,
    pub reason: String,
}

/// Result of an adjustment; `adjustment` is new minus old quantity
#[derive(Debug, Clone, Serialize)]
pub struct Adjustment {
    pub record: InventoryRecord,
    pub adjustment: i32,
}

/// Input for the explicit "new combination" path
#[derive(Debug, Deserialize)]
pub struct CreateInventoryInput {
    pub product_id: i64,
    pub warehouse_id: i64,
    pub quantity: i32,
    pub batch_number: Option<String>,
    pub serial_number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateWarehouseInput {
    pub name: String,
    pub location: Option<String>,
}

/// Record with its effective threshold
#[derive(Debug, Clone, Serialize)]
pub struct StockLevel {
    #[serde(flatten)]
    pub record: InventoryRecord,
    pub threshold: i32,
    pub is_low_stock: bool,
}

/// All stock held for one product
#[derive(Debug, Clone, Serialize)]
pub struct ProductInventory {
    pub product_id: i64,
    pub total_available: i64,
    pub records: Vec<StockLevel>,
}

impl<S: LedgerStore> InventoryService<S> {
    pub fn new(store: S, ledger: LedgerConfig) -> Self {
        Self { store, ledger }
    }

    /// Sum of quantity across every record of the product
    pub async fn get_available(&self, product_id: i64) -> AppResult<i64> {
        let mut tx = self.store.begin().await?;
        tx.available_for_product(product_id).await
    }

    /// Records of the product in FIFO depletion order
    pub async fn list_records(&self, product_id: i64) -> AppResult<Vec<InventoryRecord>> {
        let mut tx = self.store.begin().await?;
        tx.inventory_for_product(product_id).await
    }

    pub async fn product_inventory(&self, product_id: i64) -> AppResult<ProductInventory> {
        let mut tx = self.store.begin().await?;
        if !tx.product_exists(product_id).await? {
            return Err(AppError::NotFound(format!("Product {}", product_id)));
        }

        let records = tx.inventory_for_product(product_id).await?;
        let mut levels = Vec::with_capacity(records.len());
        for record in records {
            let threshold = tx
                .get_threshold(record.product_id, record.warehouse_id)
                .await?
                .map(|t| t.threshold)
                .unwrap_or(self.ledger.default_low_stock_threshold);
            levels.push(StockLevel {
                is_low_stock: is_low(record.quantity, threshold),
                threshold,
                record,
            });
        }

        Ok(ProductInventory {
            product_id,
            total_available: levels.iter().map(|l| i64::from(l.record.quantity)).sum(),
            records: levels,
        })
    }

    pub async fn list_inventory(
        &self,
        filter: &InventoryFilter,
        page: &Pagination,
    ) -> AppResult<PaginatedResponse<InventoryRecord>> {
        let page = page.normalized();
        let mut tx = self.store.begin().await?;
        let (records, total) = tx
            .list_inventory(filter, self.ledger.default_low_stock_threshold, &page)
            .await?;
        Ok(PaginatedResponse::new(records, &page, total))
    }

    /// Set a record's quantity absolutely and log the correction
    pub async fn adjust(
        &self,
        actor_id: i64,
        record_id: i64,
        input: AdjustInventoryInput,
    ) -> AppResult<Adjustment> {
        validate_non_negative("quantity", input.quantity)?;
        validate_required_text("reason", &input.reason)?;

        let mut tx = self.store.begin().await?;
        let current = tx
            .lock_inventory(record_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Inventory record {}", record_id)))?;

        let patch = InventoryPatch {
            quantity: Some(input.quantity),
            batch_number: input.batch_number.map(Some),
            serial_number: input.serial_number.map(Some),
        };
        let record = tx
            .patch_inventory(record_id, &patch)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Inventory record {}", record_id)))?;

        let adjustment = record.quantity - current.quantity;
        audit::record(
            &mut tx,
            actor_id,
            audit::INVENTORY_ADJUSTED,
            json!({
                "inventory_id": record_id,
                "product_id": record.product_id,
                "warehouse_id": record.warehouse_id,
                "old_quantity": current.quantity,
                "new_quantity": record.quantity,
                "adjustment": adjustment,
                "reason": input.reason.trim(),
            }),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(
            "Inventory record {} adjusted from {} to {}",
            record_id,
            current.quantity,
            record.quantity
        );

        Ok(Adjustment { record, adjustment })
    }

    /// Create the first record for a (product, warehouse) pair
    pub async fn create_record(
        &self,
        actor_id: i64,
        input: CreateInventoryInput,
    ) -> AppResult<InventoryRecord> {
        validate_non_negative("quantity", input.quantity)?;

        let mut tx = self.store.begin().await?;
        if !tx.product_exists(input.product_id).await? {
            return Err(AppError::NotFound(format!("Product {}", input.product_id)));
        }
        if !tx.warehouse_exists(input.warehouse_id).await? {
            return Err(AppError::NotFound(format!("Warehouse {}", input.warehouse_id)));
        }
        if tx
            .count_inventory_for_pair(input.product_id, input.warehouse_id)
            .await?
            > 0
        {
            return Err(AppError::DuplicateCombination {
                product_id: input.product_id,
                warehouse_id: input.warehouse_id,
            });
        }

        let record = tx
            .insert_inventory(&NewInventoryRecord {
                product_id: input.product_id,
                warehouse_id: input.warehouse_id,
                quantity: input.quantity,
                batch_number: input.batch_number,
                serial_number: input.serial_number,
            })
            .await?;

        audit::record(
            &mut tx,
            actor_id,
            audit::INVENTORY_CREATED,
            json!({
                "inventory_id": record.id,
                "product_id": record.product_id,
                "warehouse_id": record.warehouse_id,
                "quantity": record.quantity,
            }),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(
            "Inventory record {} created for product {} in warehouse {}",
            record.id,
            record.product_id,
            record.warehouse_id
        );

        Ok(record)
    }

    pub async fn list_warehouses(&self) -> AppResult<Vec<Warehouse>> {
        let mut tx = self.store.begin().await?;
        tx.list_warehouses().await
    }

    pub async fn create_warehouse(
        &self,
        actor_id: i64,
        input: CreateWarehouseInput,
    ) -> AppResult<Warehouse> {
        validate_required_text("name", &input.name)?;
        let location = input
            .location
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty());

        let mut tx = self.store.begin().await?;
        let warehouse = tx.insert_warehouse(input.name.trim(), location).await?;
        audit::record(
            &mut tx,
            actor_id,
            audit::WAREHOUSE_CREATED,
            json!({ "warehouse_id": warehouse.id, "name": warehouse.name }),
        )
        .await?;
        tx.commit().await?;

        tracing::info!("Warehouse {} created: {}", warehouse.id, warehouse.name);
        Ok(warehouse)
    }
}

/// Add stock to the record matching the tags, creating it when absent.
/// Used by receiving and returns, which always upsert.
pub async fn create_or_increment<T: LedgerTx>(
    tx: &mut T,
    product_id: i64,
    warehouse_id: i64,
    delta: i32,
    batch_number: Option<&str>,
    serial_number: Option<&str>,
) -> AppResult<InventoryRecord> {
    validate_non_negative("quantity", delta)?;
    let record = tx
        .increment_inventory(product_id, warehouse_id, delta, batch_number, serial_number)
        .await?;
    tracing::debug!(
        "Inventory record {} incremented by {} to {}",
        record.id,
        delta,
        record.quantity
    );
    Ok(record)
}

/// Remove `delta` units from one record, never below zero
pub async fn decrement<T: LedgerTx>(
    tx: &mut T,
    record_id: i64,
    delta: i32,
) -> AppResult<InventoryRecord> {
    validate_non_negative("quantity", delta)?;
    let current = tx
        .lock_inventory(record_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Inventory record {}", record_id)))?;

    let short = || AppError::InsufficientStock {
        product_id: current.product_id,
        available: i64::from(current.quantity),
        required: i64::from(delta),
    };
    if delta > current.quantity {
        return Err(short());
    }

    tx.decrement_inventory(record_id, delta)
        .await?
        .ok_or_else(short)
}
