//! Audit trail entries written inside each operation's transaction

use serde_json::Value;

use crate::error::AppResult;
use crate::store::{AuditEntry, LedgerTx, NewAuditEntry};

pub const INVENTORY_CREATED: &str = "INVENTORY_CREATED";
pub const INVENTORY_ADJUSTED: &str = "INVENTORY_ADJUSTED";
pub const WAREHOUSE_CREATED: &str = "WAREHOUSE_CREATED";
pub const LOW_STOCK_THRESHOLD_SET: &str = "LOW_STOCK_THRESHOLD_SET";
pub const LOW_STOCK_ALERTED: &str = "LOW_STOCK_ALERTED";

pub const PURCHASE_ORDER_CREATED: &str = "PURCHASE_ORDER_CREATED";
pub const PURCHASE_ORDER_APPROVED: &str = "PURCHASE_ORDER_APPROVED";
pub const PURCHASE_ORDER_RECEIVED: &str = "PURCHASE_ORDER_RECEIVED";
pub const PURCHASE_ORDER_STATUS_UPDATED: &str = "PURCHASE_ORDER_STATUS_UPDATED";

pub const SALES_ORDER_CREATED: &str = "SALES_ORDER_CREATED";
pub const SALES_ORDER_APPROVED: &str = "SALES_ORDER_APPROVED";
pub const SALES_ORDER_PROCESSED: &str = "SALES_ORDER_PROCESSED";
pub const SALES_ORDER_STATUS_UPDATED: &str = "SALES_ORDER_STATUS_UPDATED";
pub const SALES_ORDER_RETURN: &str = "SALES_ORDER_RETURN";
pub const SALES_ORDER_EXCHANGE: &str = "SALES_ORDER_EXCHANGE";

/// Stage an audit entry; it commits or rolls back with the caller's work
pub async fn record<T: LedgerTx>(
    tx: &mut T,
    user_id: i64,
    action: &str,
    details: Value,
) -> AppResult<AuditEntry> {
    tx.insert_audit(&NewAuditEntry::new(user_id, action, details))
        .await
}
