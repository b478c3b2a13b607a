//! Storage seam for the ledger
//!
//! Services never touch a connection pool directly. They open a unit of
//! work with [`LedgerStore::begin`], run primitive row operations on the
//! returned [`LedgerTx`] and finish with [`LedgerTx::commit`]. Dropping a
//! transaction without committing discards everything it staged.
//!
//! Locking reads (`lock_*`) hold their rows until the transaction ends, so
//! concurrent writers to the same inventory record or order serialize.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use shared::{
    InventoryFilter, InventoryPatch, InventoryRecord, LineItemInput, LowStockThreshold,
    NewInventoryRecord, Pagination, PurchaseOrder, PurchaseOrderFilter, PurchaseOrderItem,
    PurchaseOrderStatus, Receipt, ReceiptItem, ReceiptWithItems, ReceiveItemInput, SalesOrder,
    SalesOrderFilter, SalesOrderItem, SalesOrderStatus, Warehouse,
};

use crate::error::AppResult;

pub mod memory;
pub mod postgres;

pub use memory::MemoryLedgerStore;
pub use postgres::PgLedgerStore;

/// Approver and time recorded on an approval transition
#[derive(Debug, Clone, Copy)]
pub struct Approval {
    pub approved_by: i64,
    pub approved_at: DateTime<Utc>,
}

/// Inventory record joined with its effective low-stock threshold
#[derive(Debug, Clone, Serialize)]
pub struct LowStockRow {
    #[serde(flatten)]
    pub record: InventoryRecord,
    pub threshold: i32,
    pub alert_sent_at: Option<DateTime<Utc>>,
}

/// Audit record written alongside every state change
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub id: i64,
    pub user_id: i64,
    pub action: String,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub user_id: i64,
    pub action: String,
    pub details: serde_json::Value,
}

impl NewAuditEntry {
    pub fn new(user_id: i64, action: impl Into<String>, details: serde_json::Value) -> Self {
        Self {
            user_id,
            action: action.into(),
            details,
        }
    }
}

/// Handle that opens units of work
#[async_trait]
pub trait LedgerStore: Clone + Send + Sync + 'static {
    type Tx: LedgerTx;

    async fn begin(&self) -> AppResult<Self::Tx>;
}

/// One atomic unit of work against the ledger tables
#[async_trait]
pub trait LedgerTx: Send {
    // Catalog

    async fn product_exists(&mut self, product_id: i64) -> AppResult<bool>;

    async fn warehouse_exists(&mut self, warehouse_id: i64) -> AppResult<bool>;

    async fn supplier_exists(&mut self, supplier_id: i64) -> AppResult<bool>;

    async fn customer_exists(&mut self, customer_id: i64) -> AppResult<bool>;

    /// Fails with `DuplicateEntry` when the name is taken
    async fn insert_warehouse(&mut self, name: &str, location: Option<&str>)
        -> AppResult<Warehouse>;

    async fn list_warehouses(&mut self) -> AppResult<Vec<Warehouse>>;

    // Inventory records

    async fn get_inventory(&mut self, record_id: i64) -> AppResult<Option<InventoryRecord>>;

    async fn lock_inventory(&mut self, record_id: i64) -> AppResult<Option<InventoryRecord>>;

    /// All records for a product in FIFO order
    async fn inventory_for_product(&mut self, product_id: i64) -> AppResult<Vec<InventoryRecord>>;

    /// Like [`LedgerTx::inventory_for_product`], holding row locks
    async fn lock_inventory_for_product(
        &mut self,
        product_id: i64,
    ) -> AppResult<Vec<InventoryRecord>>;

    /// Number of records for a (product, warehouse) pair, any tags
    async fn count_inventory_for_pair(&mut self, product_id: i64, warehouse_id: i64)
        -> AppResult<i64>;

    /// Page of records, newest-updated first, plus the total match count
    async fn list_inventory(
        &mut self,
        filter: &InventoryFilter,
        default_threshold: i32,
        page: &Pagination,
    ) -> AppResult<(Vec<InventoryRecord>, u64)>;

    async fn insert_inventory(&mut self, record: &NewInventoryRecord) -> AppResult<InventoryRecord>;

    /// Add `delta` to the record matching (product, warehouse, batch,
    /// serial), creating it when absent
    async fn increment_inventory(
        &mut self,
        product_id: i64,
        warehouse_id: i64,
        delta: i32,
        batch_number: Option<&str>,
        serial_number: Option<&str>,
    ) -> AppResult<InventoryRecord>;

    /// Apply a patch and bump `last_updated`. `None` if the record is gone.
    async fn patch_inventory(
        &mut self,
        record_id: i64,
        patch: &InventoryPatch,
    ) -> AppResult<Option<InventoryRecord>>;

    /// Subtract `delta` only if the record holds at least that much.
    /// `None` when the record is gone or short.
    async fn decrement_inventory(
        &mut self,
        record_id: i64,
        delta: i32,
    ) -> AppResult<Option<InventoryRecord>>;

    async fn available_for_product(&mut self, product_id: i64) -> AppResult<i64>;

    // Low-stock thresholds

    async fn upsert_threshold(
        &mut self,
        product_id: i64,
        warehouse_id: i64,
        threshold: i32,
    ) -> AppResult<LowStockThreshold>;

    async fn get_threshold(
        &mut self,
        product_id: i64,
        warehouse_id: i64,
    ) -> AppResult<Option<LowStockThreshold>>;

    /// Records at or below their effective threshold, lowest quantity first
    async fn list_low_stock(&mut self, default_threshold: i32) -> AppResult<Vec<LowStockRow>>;

    /// Stamp `alert_sent_at`, creating the entry at `default_threshold`
    /// when the pair has none
    async fn mark_alerted(
        &mut self,
        product_id: i64,
        warehouse_id: i64,
        at: DateTime<Utc>,
        default_threshold: i32,
    ) -> AppResult<LowStockThreshold>;

    // Purchase orders

    async fn insert_purchase_order(
        &mut self,
        supplier_id: i64,
        total_amount: Decimal,
    ) -> AppResult<PurchaseOrder>;

    async fn insert_purchase_order_item(
        &mut self,
        purchase_order_id: i64,
        item: &LineItemInput,
    ) -> AppResult<PurchaseOrderItem>;

    async fn get_purchase_order(&mut self, id: i64) -> AppResult<Option<PurchaseOrder>>;

    async fn lock_purchase_order(&mut self, id: i64) -> AppResult<Option<PurchaseOrder>>;

    async fn purchase_order_items(&mut self, id: i64) -> AppResult<Vec<PurchaseOrderItem>>;

    async fn list_purchase_orders(
        &mut self,
        filter: &PurchaseOrderFilter,
        page: &Pagination,
    ) -> AppResult<(Vec<PurchaseOrder>, u64)>;

    async fn set_purchase_order_status(
        &mut self,
        id: i64,
        status: PurchaseOrderStatus,
        approval: Option<Approval>,
    ) -> AppResult<PurchaseOrder>;

    async fn insert_receipt(
        &mut self,
        purchase_order_id: i64,
        warehouse_id: i64,
        received_by: i64,
    ) -> AppResult<Receipt>;

    async fn insert_receipt_item(
        &mut self,
        receipt_id: i64,
        item: &ReceiveItemInput,
    ) -> AppResult<ReceiptItem>;

    async fn receipts_for_purchase_order(&mut self, id: i64) -> AppResult<Vec<ReceiptWithItems>>;

    // Sales orders

    async fn insert_sales_order(
        &mut self,
        customer_id: i64,
        total_amount: Decimal,
    ) -> AppResult<SalesOrder>;

    async fn insert_sales_order_item(
        &mut self,
        sales_order_id: i64,
        item: &LineItemInput,
    ) -> AppResult<SalesOrderItem>;

    async fn get_sales_order(&mut self, id: i64) -> AppResult<Option<SalesOrder>>;

    async fn lock_sales_order(&mut self, id: i64) -> AppResult<Option<SalesOrder>>;

    async fn sales_order_items(&mut self, id: i64) -> AppResult<Vec<SalesOrderItem>>;

    async fn list_sales_orders(
        &mut self,
        filter: &SalesOrderFilter,
        page: &Pagination,
    ) -> AppResult<(Vec<SalesOrder>, u64)>;

    async fn set_sales_order_status(
        &mut self,
        id: i64,
        status: SalesOrderStatus,
        approval: Option<Approval>,
    ) -> AppResult<SalesOrder>;

    // Audit

    async fn insert_audit(&mut self, entry: &NewAuditEntry) -> AppResult<AuditEntry>;

    /// Make every staged change durable
    async fn commit(self) -> AppResult<()>;
}
