//! Sales order ledger: creation, approval, fulfillment, status and returns

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use shared::{
    validate_line_items, validate_order_total, validate_required_text, validate_return_items,
    InventoryRecord, LineItemInput, PaginatedResponse, Pagination, ReturnItemInput, ReturnType,
    SalesOrder, SalesOrderDetail, SalesOrderFilter, SalesOrderStatus,
};

use crate::error::{AppError, AppResult};
use crate::services::fulfillment::{self, Depletion};
use crate::services::{audit, inventory};
use crate::store::{Approval, LedgerStore, LedgerTx};

pub use crate::services::purchase_order::UpdateStatusInput;

const ENTITY: &str = "sales order";

#[derive(Clone)]
pub struct SalesOrderService<S> {
    store: S,
}

#[derive(Debug, Deserialize)]
pub struct CreateSalesOrderInput {
    pub customer_id: i64,
    pub items: Vec<LineItemInput>,
}

#[derive(Debug, Deserialize)]
pub struct CreateReturnInput {
    pub warehouse_id: i64,
    pub items: Vec<ReturnItemInput>,
    pub reason: String,
    #[serde(rename = "type")]
    pub return_type: ReturnType,
}

/// Outcome of a successful fulfillment
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedOrder {
    pub sales_order: SalesOrder,
    pub depletions: Vec<Depletion>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReturnOutcome {
    pub sales_order_id: i64,
    #[serde(rename = "type")]
    pub return_type: ReturnType,
    pub records: Vec<InventoryRecord>,
}

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Sales order {}", id))
}

impl<S: LedgerStore> SalesOrderService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Create a quotation with its items; total fixed from the line items
    pub async fn create(
        &self,
        actor_id: i64,
        input: CreateSalesOrderInput,
    ) -> AppResult<SalesOrderDetail> {
        validate_line_items(&input.items)?;

        let mut tx = self.store.begin().await?;
        if !tx.customer_exists(input.customer_id).await? {
            return Err(AppError::NotFound(format!("Customer {}", input.customer_id)));
        }
        for item in &input.items {
            if !tx.product_exists(item.product_id).await? {
                return Err(AppError::NotFound(format!("Product {}", item.product_id)));
            }
        }

        let total = validate_order_total(&input.items)?;
        let order = tx.insert_sales_order(input.customer_id, total).await?;
        let mut items = Vec::with_capacity(input.items.len());
        for item in &input.items {
            items.push(tx.insert_sales_order_item(order.id, item).await?);
        }

        audit::record(
            &mut tx,
            actor_id,
            audit::SALES_ORDER_CREATED,
            json!({
                "sales_order_id": order.id,
                "customer_id": order.customer_id,
                "total_amount": order.total_amount,
                "item_count": items.len(),
            }),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(
            "Sales order {} created for customer {} (total {})",
            order.id,
            order.customer_id,
            order.total_amount
        );

        Ok(SalesOrderDetail {
            sales_order: order,
            items,
        })
    }

    /// quotation -> confirmed, recording the approver
    pub async fn approve(&self, actor_id: i64, id: i64) -> AppResult<SalesOrder> {
        let mut tx = self.store.begin().await?;
        let current = tx.lock_sales_order(id).await?.ok_or_else(|| not_found(id))?;
        if current.status != SalesOrderStatus::Quotation {
            return Err(AppError::invalid_transition(
                ENTITY,
                current.status,
                SalesOrderStatus::Confirmed,
            ));
        }

        let approval = Approval {
            approved_by: actor_id,
            approved_at: Utc::now(),
        };
        let order = tx
            .set_sales_order_status(id, SalesOrderStatus::Confirmed, Some(approval))
            .await?;
        audit::record(
            &mut tx,
            actor_id,
            audit::SALES_ORDER_APPROVED,
            json!({ "sales_order_id": id }),
        )
        .await?;
        tx.commit().await?;

        tracing::info!("Sales order {} approved by user {}", id, actor_id);
        Ok(order)
    }

    /// confirmed -> processing, depleting stock for every line item.
    /// A shortfall on any product leaves every record and the order as
    /// they were.
    pub async fn process(&self, actor_id: i64, id: i64) -> AppResult<ProcessedOrder> {
        let mut tx = self.store.begin().await?;
        let current = tx.lock_sales_order(id).await?.ok_or_else(|| not_found(id))?;
        if current.status != SalesOrderStatus::Confirmed {
            return Err(AppError::invalid_transition(
                ENTITY,
                current.status,
                SalesOrderStatus::Processing,
            ));
        }

        let items = tx.sales_order_items(id).await?;
        let depletions = match fulfillment::fulfill(&mut tx, &items).await {
            Ok(depletions) => depletions,
            Err(e) => {
                tracing::info!("Sales order {} not fulfilled: {}", id, e);
                return Err(e);
            }
        };

        let order = tx
            .set_sales_order_status(id, SalesOrderStatus::Processing, None)
            .await?;
        audit::record(
            &mut tx,
            actor_id,
            audit::SALES_ORDER_PROCESSED,
            json!({
                "sales_order_id": id,
                "depletions": depletions,
            }),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(
            "Sales order {} processed ({} inventory records depleted)",
            id,
            depletions.len()
        );

        Ok(ProcessedOrder {
            sales_order: order,
            depletions,
        })
    }

    /// Administrative transitions: shipped, delivered, completed, cancelled.
    /// None of them touch inventory.
    pub async fn update_status(
        &self,
        actor_id: i64,
        id: i64,
        input: UpdateStatusInput,
    ) -> AppResult<SalesOrder> {
        let next: SalesOrderStatus = input.status.trim().parse()?;

        let mut tx = self.store.begin().await?;
        let current = tx.lock_sales_order(id).await?.ok_or_else(|| not_found(id))?;
        if !next.is_administrative() || !current.status.can_transition_to(next) {
            return Err(AppError::invalid_transition(ENTITY, current.status, next));
        }

        let order = tx.set_sales_order_status(id, next, None).await?;
        audit::record(
            &mut tx,
            actor_id,
            audit::SALES_ORDER_STATUS_UPDATED,
            json!({
                "sales_order_id": id,
                "from": current.status,
                "to": next,
            }),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(
            "Sales order {} status changed from {} to {}",
            id,
            current.status,
            next
        );
        Ok(order)
    }

    /// Put returned units back into the given warehouse. Exchanges
    /// reinstate the same way and record no outbound leg.
    pub async fn create_return(
        &self,
        actor_id: i64,
        id: i64,
        input: CreateReturnInput,
    ) -> AppResult<ReturnOutcome> {
        validate_return_items(&input.items)?;
        validate_required_text("reason", &input.reason)?;

        let mut tx = self.store.begin().await?;
        let order = tx.lock_sales_order(id).await?.ok_or_else(|| not_found(id))?;
        if !order.status.accepts_returns() {
            return Err(AppError::invalid_transition(
                ENTITY,
                order.status,
                input.return_type.as_str(),
            ));
        }
        if !tx.warehouse_exists(input.warehouse_id).await? {
            return Err(AppError::NotFound(format!("Warehouse {}", input.warehouse_id)));
        }

        let mut records = Vec::with_capacity(input.items.len());
        for item in &input.items {
            if !tx.product_exists(item.product_id).await? {
                return Err(AppError::NotFound(format!("Product {}", item.product_id)));
            }
            records.push(
                inventory::create_or_increment(
                    &mut tx,
                    item.product_id,
                    input.warehouse_id,
                    item.quantity,
                    None,
                    None,
                )
                .await?,
            );
        }

        let action = match input.return_type {
            ReturnType::Return => audit::SALES_ORDER_RETURN,
            ReturnType::Exchange => audit::SALES_ORDER_EXCHANGE,
        };
        audit::record(
            &mut tx,
            actor_id,
            action,
            json!({
                "sales_order_id": id,
                "warehouse_id": input.warehouse_id,
                "reason": input.reason.trim(),
                "items": input.items,
            }),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(
            "Sales order {} {} of {} line(s) into warehouse {}",
            id,
            input.return_type.as_str(),
            input.items.len(),
            input.warehouse_id
        );

        Ok(ReturnOutcome {
            sales_order_id: id,
            return_type: input.return_type,
            records,
        })
    }

    pub async fn get(&self, id: i64) -> AppResult<SalesOrderDetail> {
        let mut tx = self.store.begin().await?;
        let order = tx.get_sales_order(id).await?.ok_or_else(|| not_found(id))?;
        let items = tx.sales_order_items(id).await?;
        Ok(SalesOrderDetail {
            sales_order: order,
            items,
        })
    }

    pub async fn list(
        &self,
        filter: &SalesOrderFilter,
        page: &Pagination,
    ) -> AppResult<PaginatedResponse<SalesOrder>> {
        let page = page.normalized();
        let mut tx = self.store.begin().await?;
        let (orders, total) = tx.list_sales_orders(filter, &page).await?;
        Ok(PaginatedResponse::new(orders, &page, total))
    }
}
