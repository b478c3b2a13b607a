//! HTTP handlers for inventory endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use shared::{InventoryFilter, InventoryRecord, LowStockThreshold, PaginatedResponse, Warehouse};

use crate::error::AppResult;
use crate::middleware::auth::{ADMINISTRATOR, STOCK_MANAGERS};
use crate::middleware::{require_role, CurrentUser};
use crate::services::inventory::{
    AdjustInventoryInput, Adjustment, CreateInventoryInput, CreateWarehouseInput, InventoryService,
    ProductInventory,
};
use crate::services::low_stock::{LowStockService, ReorderSuggestion, SetThresholdInput};
use crate::store::{LowStockRow, PgLedgerStore};
use crate::AppState;

use super::page_params;

#[derive(Debug, Deserialize)]
pub struct ListInventoryQuery {
    pub warehouse_id: Option<i64>,
    pub low_stock_only: Option<bool>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct AvailableResponse {
    pub product_id: i64,
    pub available: i64,
}

#[derive(Debug, Serialize)]
pub struct LowStockCheckResponse {
    pub alerted: usize,
    pub items: Vec<LowStockRow>,
}

fn inventory_service(state: &AppState) -> InventoryService<PgLedgerStore> {
    InventoryService::new(state.store.clone(), state.config.ledger.clone())
}

fn low_stock_service(state: &AppState) -> LowStockService<PgLedgerStore> {
    LowStockService::new(state.store.clone(), state.config.ledger.clone())
}

/// List inventory records
pub async fn list_inventory(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ListInventoryQuery>,
) -> AppResult<Json<PaginatedResponse<InventoryRecord>>> {
    let filter = InventoryFilter {
        warehouse_id: query.warehouse_id,
        low_stock_only: query.low_stock_only.unwrap_or(false),
    };
    let page = page_params(query.page, query.per_page);
    let records = inventory_service(&state)
        .list_inventory(&filter, &page)
        .await?;
    Ok(Json(records))
}

/// Add a new (product, warehouse) combination
pub async fn create_inventory(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateInventoryInput>,
) -> AppResult<(StatusCode, Json<InventoryRecord>)> {
    require_role(&current_user.0, STOCK_MANAGERS)?;
    let record = inventory_service(&state)
        .create_record(current_user.0.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Manually set a record's quantity
pub async fn adjust_inventory(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(record_id): Path<i64>,
    Json(input): Json<AdjustInventoryInput>,
) -> AppResult<Json<Adjustment>> {
    require_role(&current_user.0, STOCK_MANAGERS)?;
    let adjustment = inventory_service(&state)
        .adjust(current_user.0.user_id, record_id, input)
        .await?;
    Ok(Json(adjustment))
}

/// Stock of one product across warehouses
pub async fn get_product_inventory(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(product_id): Path<i64>,
) -> AppResult<Json<ProductInventory>> {
    let inventory = inventory_service(&state)
        .product_inventory(product_id)
        .await?;
    Ok(Json(inventory))
}

pub async fn get_available(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(product_id): Path<i64>,
) -> AppResult<Json<AvailableResponse>> {
    let available = inventory_service(&state).get_available(product_id).await?;
    Ok(Json(AvailableResponse {
        product_id,
        available,
    }))
}

pub async fn list_low_stock(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<Vec<LowStockRow>>> {
    let rows = low_stock_service(&state).list_low_stock().await?;
    Ok(Json(rows))
}

pub async fn set_threshold(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<SetThresholdInput>,
) -> AppResult<Json<LowStockThreshold>> {
    require_role(&current_user.0, STOCK_MANAGERS)?;
    let threshold = low_stock_service(&state)
        .set_threshold(current_user.0.user_id, input)
        .await?;
    Ok(Json(threshold))
}

/// Raise alerts for low records outside their cooldown
pub async fn check_low_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<LowStockCheckResponse>> {
    require_role(&current_user.0, STOCK_MANAGERS)?;
    let items = low_stock_service(&state)
        .check_low_stock(current_user.0.user_id)
        .await?;
    Ok(Json(LowStockCheckResponse {
        alerted: items.len(),
        items,
    }))
}

pub async fn reorder_suggestions(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<Vec<ReorderSuggestion>>> {
    let suggestions = low_stock_service(&state).reorder_suggestions().await?;
    Ok(Json(suggestions))
}

pub async fn list_warehouses(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<Vec<Warehouse>>> {
    let warehouses = inventory_service(&state).list_warehouses().await?;
    Ok(Json(warehouses))
}

pub async fn create_warehouse(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateWarehouseInput>,
) -> AppResult<(StatusCode, Json<Warehouse>)> {
    require_role(&current_user.0, &[ADMINISTRATOR])?;
    let warehouse = inventory_service(&state)
        .create_warehouse(current_user.0.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(warehouse)))
}
