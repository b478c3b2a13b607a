//! Purchase order ledger tests
//!
//! Creation totals, approval monotonicity, receiving and status rules.

mod common;

use common::*;
use parts_ledger::services::purchase_order::{CreatePurchaseOrderInput, ReceivePurchaseOrderInput};
use parts_ledger::AppError;
use shared::{Pagination, PurchaseOrderFilter, PurchaseOrderStatus, ReceiveItemInput};

fn receive_line(product_id: i64, quantity_received: i32) -> ReceiveItemInput {
    ReceiveItemInput {
        product_id,
        quantity_received,
        batch_number: None,
        serial_number: None,
    }
}

async fn approved_order(ledger: &Ledger, lines: Vec<shared::LineItemInput>) -> i64 {
    let service = ledger.purchase_orders();
    let order = service
        .create(
            ACTOR,
            CreatePurchaseOrderInput {
                supplier_id: SUPPLIER,
                items: lines,
            },
        )
        .await
        .unwrap();
    service.approve(ACTOR, order.purchase_order.id).await.unwrap();
    order.purchase_order.id
}

// ============================================================================
// Creation
// ============================================================================

#[tokio::test]
async fn test_create_fixes_total_from_lines() {
    let ledger = Ledger::new().await;
    let order = ledger
        .purchase_orders()
        .create(
            ACTOR,
            CreatePurchaseOrderInput {
                supplier_id: SUPPLIER,
                items: vec![line(1, 3, "12.50"), line(2, 2, "4.25")],
            },
        )
        .await
        .unwrap();

    assert_eq!(order.purchase_order.total_amount, dec("46.00"));
    assert_eq!(order.purchase_order.status, PurchaseOrderStatus::Pending);
    assert_eq!(order.items.len(), 2);
}

#[tokio::test]
async fn test_create_rejects_empty_items() {
    let ledger = Ledger::new().await;
    let err = ledger
        .purchase_orders()
        .create(
            ACTOR,
            CreatePurchaseOrderInput {
                supplier_id: SUPPLIER,
                items: vec![],
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Validation { ref field, .. } if field == "items"));
    assert_eq!(ledger.store.purchase_order_count().await, 0);
}

#[tokio::test]
async fn test_create_rejects_bad_line_without_partial_order() {
    let ledger = Ledger::new().await;
    let err = ledger
        .purchase_orders()
        .create(
            ACTOR,
            CreatePurchaseOrderInput {
                supplier_id: SUPPLIER,
                items: vec![line(1, 3, "1.00"), line(2, 0, "1.00")],
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Validation { ref field, .. } if field == "items[1].quantity"));
    assert_eq!(ledger.store.purchase_order_count().await, 0);
}

#[tokio::test]
async fn test_create_rejects_total_beyond_money_column() {
    let ledger = Ledger::new().await;
    let err = ledger
        .purchase_orders()
        .create(
            ACTOR,
            CreatePurchaseOrderInput {
                supplier_id: SUPPLIER,
                items: vec![line(1, 3, "4000000000.00")],
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Validation { ref field, .. } if field == "items"));
    assert_eq!(ledger.store.purchase_order_count().await, 0);
}

#[tokio::test]
async fn test_create_unknown_supplier() {
    let ledger = Ledger::new().await;
    let err = ledger
        .purchase_orders()
        .create(
            ACTOR,
            CreatePurchaseOrderInput {
                supplier_id: 999,
                items: vec![line(1, 1, "1.00")],
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_store_failure_during_create_leaves_no_order() {
    let ledger = Ledger::new().await;
    // order row succeeds, first item row fails
    ledger.store.fail_after_writes(1);
    let err = ledger
        .purchase_orders()
        .create(
            ACTOR,
            CreatePurchaseOrderInput {
                supplier_id: SUPPLIER,
                items: vec![line(1, 1, "1.00")],
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Database(_)));
    assert_eq!(ledger.store.purchase_order_count().await, 0);
}

// ============================================================================
// Approval
// ============================================================================

#[tokio::test]
async fn test_approve_records_approver() {
    let ledger = Ledger::new().await;
    let id = approved_order(&ledger, vec![line(1, 1, "1.00")]).await;

    let order = ledger.purchase_orders().get(id).await.unwrap().purchase_order;
    assert_eq!(order.status, PurchaseOrderStatus::Approved);
    assert_eq!(order.approved_by, Some(ACTOR));
    assert!(order.approved_at.is_some());
}

#[tokio::test]
async fn test_second_approval_is_rejected() {
    let ledger = Ledger::new().await;
    let id = approved_order(&ledger, vec![line(1, 1, "1.00")]).await;

    let err = ledger.purchase_orders().approve(ACTOR, id).await.unwrap_err();

    assert!(matches!(err, AppError::InvalidTransition { .. }));
}

#[tokio::test]
async fn test_approve_unknown_order() {
    let ledger = Ledger::new().await;
    let err = ledger.purchase_orders().approve(ACTOR, 12345).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

// ============================================================================
// Receiving
// ============================================================================

#[tokio::test]
async fn test_receive_increments_existing_record() {
    let ledger = Ledger::new().await;
    let existing = ledger.seed(1, WAREHOUSE_A, 4, 10).await;
    let id = approved_order(&ledger, vec![line(1, 6, "2.00")]).await;

    let receipt = ledger
        .purchase_orders()
        .receive(
            ACTOR,
            id,
            ReceivePurchaseOrderInput {
                warehouse_id: WAREHOUSE_A,
                items: vec![receive_line(1, 6)],
            },
        )
        .await
        .unwrap();

    assert_eq!(receipt.items.len(), 1);
    assert_eq!(receipt.receipt.received_by, ACTOR);
    assert_eq!(ledger.record(existing.id).await.quantity, 10);
    let order = ledger.purchase_orders().get(id).await.unwrap();
    assert_eq!(order.purchase_order.status, PurchaseOrderStatus::Received);
    assert_eq!(order.receipts.len(), 1);
}

#[tokio::test]
async fn test_receive_creates_record_for_new_pair_and_skips_zero_lines() {
    let ledger = Ledger::new().await;
    let id = approved_order(&ledger, vec![line(2, 5, "2.00"), line(3, 5, "2.00")]).await;

    ledger
        .purchase_orders()
        .receive(
            ACTOR,
            id,
            ReceivePurchaseOrderInput {
                warehouse_id: WAREHOUSE_B,
                items: vec![receive_line(2, 5), receive_line(3, 0)],
            },
        )
        .await
        .unwrap();

    assert_eq!(ledger.total(2).await, 5);
    assert_eq!(ledger.total(3).await, 0);
    assert_eq!(ledger.store.receipt_items().await.len(), 1);
}

#[tokio::test]
async fn test_receive_is_applied_exactly_once() {
    let ledger = Ledger::new().await;
    let id = approved_order(&ledger, vec![line(1, 5, "2.00")]).await;
    let service = ledger.purchase_orders();
    let input = || ReceivePurchaseOrderInput {
        warehouse_id: WAREHOUSE_A,
        items: vec![receive_line(1, 5)],
    };

    service.receive(ACTOR, id, input()).await.unwrap();
    let err = service.receive(ACTOR, id, input()).await.unwrap_err();

    assert!(matches!(err, AppError::InvalidTransition { .. }));
    assert_eq!(ledger.total(1).await, 5);
    assert_eq!(ledger.store.receipts().await.len(), 1);
}

#[tokio::test]
async fn test_receive_requires_approval() {
    let ledger = Ledger::new().await;
    let order = ledger
        .purchase_orders()
        .create(
            ACTOR,
            CreatePurchaseOrderInput {
                supplier_id: SUPPLIER,
                items: vec![line(1, 5, "2.00")],
            },
        )
        .await
        .unwrap();

    let err = ledger
        .purchase_orders()
        .receive(
            ACTOR,
            order.purchase_order.id,
            ReceivePurchaseOrderInput {
                warehouse_id: WAREHOUSE_A,
                items: vec![receive_line(1, 5)],
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InvalidTransition { .. }));
    assert_eq!(ledger.total(1).await, 0);
}

#[tokio::test]
async fn test_receive_from_sent() {
    let ledger = Ledger::new().await;
    let id = approved_order(&ledger, vec![line(1, 5, "2.00")]).await;
    let service = ledger.purchase_orders();
    service.update_status(ACTOR, id, status("sent")).await.unwrap();

    service
        .receive(
            ACTOR,
            id,
            ReceivePurchaseOrderInput {
                warehouse_id: WAREHOUSE_A,
                items: vec![receive_line(1, 5)],
            },
        )
        .await
        .unwrap();

    assert_eq!(ledger.total(1).await, 5);
}

#[tokio::test]
async fn test_receive_unknown_warehouse() {
    let ledger = Ledger::new().await;
    let id = approved_order(&ledger, vec![line(1, 5, "2.00")]).await;

    let err = ledger
        .purchase_orders()
        .receive(
            ACTOR,
            id,
            ReceivePurchaseOrderInput {
                warehouse_id: 77,
                items: vec![receive_line(1, 5)],
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_store_failure_during_receive_rolls_back_inventory() {
    let ledger = Ledger::new().await;
    let id = approved_order(&ledger, vec![line(1, 5, "2.00"), line(2, 5, "2.00")]).await;

    // receipt, item, increment, item succeed; the second increment fails
    ledger.store.fail_after_writes(4);
    let err = ledger
        .purchase_orders()
        .receive(
            ACTOR,
            id,
            ReceivePurchaseOrderInput {
                warehouse_id: WAREHOUSE_A,
                items: vec![receive_line(1, 5), receive_line(2, 5)],
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Database(_)));
    assert_eq!(ledger.total(1).await, 0);
    assert_eq!(ledger.total(2).await, 0);
    assert!(ledger.store.receipts().await.is_empty());
    let order = ledger.purchase_orders().get(id).await.unwrap();
    assert_eq!(order.purchase_order.status, PurchaseOrderStatus::Approved);
}

// ============================================================================
// Status updates and listing
// ============================================================================

#[tokio::test]
async fn test_update_status_rejects_dedicated_transitions() {
    let ledger = Ledger::new().await;
    let id = approved_order(&ledger, vec![line(1, 5, "2.00")]).await;

    let err = ledger
        .purchase_orders()
        .update_status(ACTOR, id, status("received"))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InvalidTransition { .. }));
}

#[tokio::test]
async fn test_update_status_unknown_value() {
    let ledger = Ledger::new().await;
    let id = approved_order(&ledger, vec![line(1, 5, "2.00")]).await;

    let err = ledger
        .purchase_orders()
        .update_status(ACTOR, id, status("shipped"))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Validation { ref field, .. } if field == "status"));
}

#[tokio::test]
async fn test_cancelled_order_is_terminal() {
    let ledger = Ledger::new().await;
    let id = approved_order(&ledger, vec![line(1, 5, "2.00")]).await;
    let service = ledger.purchase_orders();

    service.update_status(ACTOR, id, status("cancelled")).await.unwrap();
    let err = service.update_status(ACTOR, id, status("sent")).await.unwrap_err();

    assert!(matches!(err, AppError::InvalidTransition { .. }));
}

#[tokio::test]
async fn test_list_filters_by_status() {
    let ledger = Ledger::new().await;
    approved_order(&ledger, vec![line(1, 1, "1.00")]).await;
    ledger
        .purchase_orders()
        .create(
            ACTOR,
            CreatePurchaseOrderInput {
                supplier_id: SUPPLIER,
                items: vec![line(1, 1, "1.00")],
            },
        )
        .await
        .unwrap();

    let filter = PurchaseOrderFilter {
        status: Some(PurchaseOrderStatus::Pending),
        supplier_id: None,
    };
    let page = ledger
        .purchase_orders()
        .list(&filter, &Pagination::default())
        .await
        .unwrap();

    assert_eq!(page.pagination.total_items, 1);
    assert!(page.data.iter().all(|o| o.status == PurchaseOrderStatus::Pending));
}
