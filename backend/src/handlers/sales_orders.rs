//! HTTP handlers for sales order endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use shared::{
    PaginatedResponse, SalesOrder, SalesOrderDetail, SalesOrderFilter, SalesOrderStatus,
};

use crate::error::AppResult;
use crate::middleware::auth::{SALES_STAFF, STOCK_MANAGERS};
use crate::middleware::{require_role, CurrentUser};
use crate::services::sales_order::{
    CreateReturnInput, CreateSalesOrderInput, ProcessedOrder, ReturnOutcome, SalesOrderService,
    UpdateStatusInput,
};
use crate::AppState;

use super::page_params;

#[derive(Debug, Deserialize)]
pub struct ListSalesOrdersQuery {
    pub status: Option<String>,
    pub customer_id: Option<i64>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ReturnResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub outcome: ReturnOutcome,
}

#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub status: SalesOrderStatus,
    #[serde(flatten)]
    pub processed: ProcessedOrder,
}

pub async fn list_sales_orders(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ListSalesOrdersQuery>,
) -> AppResult<Json<PaginatedResponse<SalesOrder>>> {
    let filter = SalesOrderFilter {
        status: query
            .status
            .as_deref()
            .map(str::parse::<SalesOrderStatus>)
            .transpose()?,
        customer_id: query.customer_id,
    };
    let page = page_params(query.page, query.per_page);
    let orders = SalesOrderService::new(state.store)
        .list(&filter, &page)
        .await?;
    Ok(Json(orders))
}

pub async fn create_sales_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateSalesOrderInput>,
) -> AppResult<(StatusCode, Json<SalesOrderDetail>)> {
    require_role(&current_user.0, SALES_STAFF)?;
    let order = SalesOrderService::new(state.store)
        .create(current_user.0.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn get_sales_order(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<SalesOrderDetail>> {
    let order = SalesOrderService::new(state.store).get(id).await?;
    Ok(Json(order))
}

pub async fn approve_sales_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<SalesOrder>> {
    require_role(&current_user.0, STOCK_MANAGERS)?;
    let order = SalesOrderService::new(state.store)
        .approve(current_user.0.user_id, id)
        .await?;
    Ok(Json(order))
}

pub async fn update_sales_order_status(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<i64>,
    Json(input): Json<UpdateStatusInput>,
) -> AppResult<Json<SalesOrder>> {
    require_role(&current_user.0, SALES_STAFF)?;
    let order = SalesOrderService::new(state.store)
        .update_status(current_user.0.user_id, id, input)
        .await?;
    Ok(Json(order))
}

/// Fulfill a confirmed order from stock
pub async fn process_sales_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ProcessResponse>> {
    require_role(&current_user.0, STOCK_MANAGERS)?;
    let processed = SalesOrderService::new(state.store)
        .process(current_user.0.user_id, id)
        .await?;
    Ok(Json(ProcessResponse {
        status: processed.sales_order.status,
        processed,
    }))
}

pub async fn create_return(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<i64>,
    Json(input): Json<CreateReturnInput>,
) -> AppResult<(StatusCode, Json<ReturnResponse>)> {
    require_role(&current_user.0, SALES_STAFF)?;
    let outcome = SalesOrderService::new(state.store)
        .create_return(current_user.0.user_id, id, input)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ReturnResponse {
            status: "ok",
            outcome,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;

    use crate::services::fulfillment::Depletion;

    #[test]
    fn test_process_response_carries_top_level_status() {
        let response = ProcessResponse {
            status: SalesOrderStatus::Processing,
            processed: ProcessedOrder {
                sales_order: SalesOrder {
                    id: 9,
                    customer_id: 1,
                    status: SalesOrderStatus::Processing,
                    total_amount: Decimal::new(1200, 2),
                    approved_by: Some(3),
                    approved_at: Some(Utc::now()),
                    order_date: Utc::now(),
                },
                depletions: vec![Depletion {
                    record_id: 4,
                    product_id: 42,
                    quantity: 2,
                }],
            },
        };

        let body = serde_json::to_value(&response).unwrap();
        assert_eq!(body["status"], "processing");
        assert_eq!(body["sales_order"]["id"], 9);
        assert_eq!(body["depletions"][0]["record_id"], 4);
    }
}
