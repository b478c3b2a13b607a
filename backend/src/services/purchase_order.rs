//! Purchase order ledger: creation, approval, receiving and status updates

use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use shared::{
    validate_line_items, validate_order_total, validate_receive_items, LineItemInput,
    PaginatedResponse, Pagination, PurchaseOrder, PurchaseOrderDetail, PurchaseOrderFilter, PurchaseOrderStatus,
    ReceiptWithItems, ReceiveItemInput,
};

use crate::error::{AppError, AppResult};
use crate::services::{audit, inventory};
use crate::store::{Approval, LedgerStore, LedgerTx};

const ENTITY: &str = "purchase order";

#[derive(Clone)]
pub struct PurchaseOrderService<S> {
    store: S,
}

#[derive(Debug, Deserialize)]
pub struct CreatePurchaseOrderInput {
    pub supplier_id: i64,
    pub items: Vec<LineItemInput>,
}

#[derive(Debug, Deserialize)]
pub struct ReceivePurchaseOrderInput {
    pub warehouse_id: i64,
    pub items: Vec<ReceiveItemInput>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusInput {
    pub status: String,
}

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Purchase order {}", id))
}

impl<S: LedgerStore> PurchaseOrderService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Create an order with its items; total fixed from the line items
    pub async fn create(
        &self,
        actor_id: i64,
        input: CreatePurchaseOrderInput,
    ) -> AppResult<PurchaseOrderDetail> {
        validate_line_items(&input.items)?;

        let mut tx = self.store.begin().await?;
        if !tx.supplier_exists(input.supplier_id).await? {
            return Err(AppError::NotFound(format!("Supplier {}", input.supplier_id)));
        }
        for item in &input.items {
            if !tx.product_exists(item.product_id).await? {
                return Err(AppError::NotFound(format!("Product {}", item.product_id)));
            }
        }

        let total = validate_order_total(&input.items)?;
        let order = tx.insert_purchase_order(input.supplier_id, total).await?;
        let mut items = Vec::with_capacity(input.items.len());
        for item in &input.items {
            items.push(tx.insert_purchase_order_item(order.id, item).await?);
        }

        audit::record(
            &mut tx,
            actor_id,
            audit::PURCHASE_ORDER_CREATED,
            json!({
                "purchase_order_id": order.id,
                "supplier_id": order.supplier_id,
                "total_amount": order.total_amount,
                "item_count": items.len(),
            }),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(
            "Purchase order {} created for supplier {} (total {})",
            order.id,
            order.supplier_id,
            order.total_amount
        );

        Ok(PurchaseOrderDetail {
            purchase_order: order,
            items,
            receipts: Vec::new(),
        })
    }

    /// pending -> approved, recording the approver
    pub async fn approve(&self, actor_id: i64, id: i64) -> AppResult<PurchaseOrder> {
        let mut tx = self.store.begin().await?;
        let current = tx.lock_purchase_order(id).await?.ok_or_else(|| not_found(id))?;
        if current.status != PurchaseOrderStatus::Pending {
            return Err(AppError::invalid_transition(
                ENTITY,
                current.status,
                PurchaseOrderStatus::Approved,
            ));
        }

        let approval = Approval {
            approved_by: actor_id,
            approved_at: Utc::now(),
        };
        let order = tx
            .set_purchase_order_status(id, PurchaseOrderStatus::Approved, Some(approval))
            .await?;
        audit::record(
            &mut tx,
            actor_id,
            audit::PURCHASE_ORDER_APPROVED,
            json!({ "purchase_order_id": id }),
        )
        .await?;
        tx.commit().await?;

        tracing::info!("Purchase order {} approved by user {}", id, actor_id);
        Ok(order)
    }

    /// Record one receipt, add the received stock and mark the order
    /// received. Nothing is kept if any step fails.
    pub async fn receive(
        &self,
        actor_id: i64,
        id: i64,
        input: ReceivePurchaseOrderInput,
    ) -> AppResult<ReceiptWithItems> {
        validate_receive_items(&input.items)?;

        let mut tx = self.store.begin().await?;
        let current = tx.lock_purchase_order(id).await?.ok_or_else(|| not_found(id))?;
        if !current.status.is_receivable() {
            return Err(AppError::invalid_transition(
                ENTITY,
                current.status,
                PurchaseOrderStatus::Received,
            ));
        }
        if !tx.warehouse_exists(input.warehouse_id).await? {
            return Err(AppError::NotFound(format!("Warehouse {}", input.warehouse_id)));
        }

        let receipt = tx
            .insert_receipt(id, input.warehouse_id, actor_id)
            .await?;
        let mut items = Vec::new();
        for item in input.items.iter().filter(|i| i.quantity_received > 0) {
            if !tx.product_exists(item.product_id).await? {
                return Err(AppError::NotFound(format!("Product {}", item.product_id)));
            }
            items.push(tx.insert_receipt_item(receipt.id, item).await?);
            inventory::create_or_increment(
                &mut tx,
                item.product_id,
                input.warehouse_id,
                item.quantity_received,
                item.batch_number.as_deref(),
                item.serial_number.as_deref(),
            )
            .await?;
        }

        tx.set_purchase_order_status(id, PurchaseOrderStatus::Received, None)
            .await?;
        audit::record(
            &mut tx,
            actor_id,
            audit::PURCHASE_ORDER_RECEIVED,
            json!({
                "purchase_order_id": id,
                "receipt_id": receipt.id,
                "warehouse_id": input.warehouse_id,
                "items": items
                    .iter()
                    .map(|i| json!({
                        "product_id": i.product_id,
                        "quantity_received": i.quantity_received,
                    }))
                    .collect::<Vec<_>>(),
            }),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(
            "Purchase order {} received into warehouse {} as receipt {}",
            id,
            input.warehouse_id,
            receipt.id
        );

        Ok(ReceiptWithItems { receipt, items })
    }

    /// Administrative transitions: sent, completed, cancelled
    pub async fn update_status(
        &self,
        actor_id: i64,
        id: i64,
        input: UpdateStatusInput,
    ) -> AppResult<PurchaseOrder> {
        let next: PurchaseOrderStatus = input.status.trim().parse()?;

        let mut tx = self.store.begin().await?;
        let current = tx.lock_purchase_order(id).await?.ok_or_else(|| not_found(id))?;
        if !next.is_administrative() || !current.status.can_transition_to(next) {
            return Err(AppError::invalid_transition(ENTITY, current.status, next));
        }

        let order = tx.set_purchase_order_status(id, next, None).await?;
        audit::record(
            &mut tx,
            actor_id,
            audit::PURCHASE_ORDER_STATUS_UPDATED,
            json!({
                "purchase_order_id": id,
                "from": current.status,
                "to": next,
            }),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(
            "Purchase order {} status changed from {} to {}",
            id,
            current.status,
            next
        );
        Ok(order)
    }

    pub async fn get(&self, id: i64) -> AppResult<PurchaseOrderDetail> {
        let mut tx = self.store.begin().await?;
        let order = tx.get_purchase_order(id).await?.ok_or_else(|| not_found(id))?;
        let items = tx.purchase_order_items(id).await?;
        let receipts = tx.receipts_for_purchase_order(id).await?;
        Ok(PurchaseOrderDetail {
            purchase_order: order,
            items,
            receipts,
        })
    }

    pub async fn list(
        &self,
        filter: &PurchaseOrderFilter,
        page: &Pagination,
    ) -> AppResult<PaginatedResponse<PurchaseOrder>> {
        let page = page.normalized();
        let mut tx = self.store.begin().await?;
        let (orders, total) = tx.list_purchase_orders(filter, &page).await?;
        Ok(PaginatedResponse::new(orders, &page, total))
    }
}
