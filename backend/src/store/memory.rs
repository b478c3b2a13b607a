//! In-process ledger store for tests and local runs
//!
//! A single `tokio::sync::Mutex` guards the whole state. `begin` takes the
//! owned guard, so units of work run one at a time, and stages changes on
//! a copy that only replaces the shared state on `commit`.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use shared::{
    is_low, sort_fifo, InventoryFilter, InventoryPatch, InventoryRecord, LineItemInput,
    LowStockThreshold, NewInventoryRecord, Pagination, PurchaseOrder, PurchaseOrderFilter,
    PurchaseOrderItem, PurchaseOrderStatus, Receipt, ReceiptItem, ReceiptWithItems,
    ReceiveItemInput, SalesOrder, SalesOrderFilter, SalesOrderItem, SalesOrderStatus, Warehouse,
};

use super::{Approval, AuditEntry, LedgerStore, LedgerTx, LowStockRow, NewAuditEntry};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    next_id: i64,
    clock: Option<DateTime<Utc>>,
    products: BTreeSet<i64>,
    suppliers: BTreeSet<i64>,
    customers: BTreeSet<i64>,
    warehouses: BTreeMap<i64, Warehouse>,
    inventory: BTreeMap<i64, InventoryRecord>,
    thresholds: BTreeMap<(i64, i64), LowStockThreshold>,
    purchase_orders: BTreeMap<i64, PurchaseOrder>,
    purchase_order_items: Vec<PurchaseOrderItem>,
    receipts: Vec<Receipt>,
    receipt_items: Vec<ReceiptItem>,
    sales_orders: BTreeMap<i64, SalesOrder>,
    sales_order_items: Vec<SalesOrderItem>,
    audit: Vec<AuditEntry>,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    /// Strictly increasing timestamps so FIFO order follows write order
    fn tick(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let at = match self.clock {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.clock = Some(at);
        at
    }

    fn effective_threshold(&self, record: &InventoryRecord, default: i32) -> (i32, Option<DateTime<Utc>>) {
        self.thresholds
            .get(&(record.product_id, record.warehouse_id))
            .map(|t| (t.threshold, t.alert_sent_at))
            .unwrap_or((default, None))
    }

    fn product_records(&self, product_id: i64) -> Vec<InventoryRecord> {
        let mut records: Vec<InventoryRecord> = self
            .inventory
            .values()
            .filter(|r| r.product_id == product_id)
            .cloned()
            .collect();
        sort_fifo(&mut records);
        records
    }
}

fn page_of<T: Clone>(rows: &[T], page: &Pagination) -> Vec<T> {
    rows.iter()
        .skip(page.offset() as usize)
        .take(page.limit() as usize)
        .cloned()
        .collect()
}

/// Test double for [`LedgerStore`] with fault injection
#[derive(Clone)]
pub struct MemoryLedgerStore {
    state: Arc<Mutex<MemoryState>>,
    // Writes left before the injected fault fires; negative disables it
    fault_after: Arc<AtomicI64>,
}

impl Default for MemoryLedgerStore {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            fault_after: Arc::new(AtomicI64::new(-1)),
        }
    }
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the write after the next `writes` ones fail with a store
    /// error. Fires once.
    pub fn fail_after_writes(&self, writes: i64) {
        self.fault_after.store(writes, Ordering::SeqCst);
    }

    pub async fn add_product(&self, id: i64) {
        let mut state = self.state.lock().await;
        state.products.insert(id);
        state.next_id = state.next_id.max(id);
    }

    pub async fn add_supplier(&self, id: i64) {
        let mut state = self.state.lock().await;
        state.suppliers.insert(id);
        state.next_id = state.next_id.max(id);
    }

    pub async fn add_customer(&self, id: i64) {
        let mut state = self.state.lock().await;
        state.customers.insert(id);
        state.next_id = state.next_id.max(id);
    }

    pub async fn add_warehouse(&self, id: i64, name: &str) -> Warehouse {
        let mut state = self.state.lock().await;
        let created_at = state.tick();
        let warehouse = Warehouse {
            id,
            name: name.to_string(),
            location: None,
            created_at,
        };
        state.warehouses.insert(id, warehouse.clone());
        state.next_id = state.next_id.max(id);
        warehouse
    }

    /// Insert a record with an explicit `last_updated`, bypassing checks
    pub async fn seed_inventory(
        &self,
        record: NewInventoryRecord,
        last_updated: DateTime<Utc>,
    ) -> InventoryRecord {
        let mut state = self.state.lock().await;
        let record = InventoryRecord {
            id: state.next_id(),
            product_id: record.product_id,
            warehouse_id: record.warehouse_id,
            quantity: record.quantity,
            batch_number: record.batch_number,
            serial_number: record.serial_number,
            last_updated,
        };
        state.inventory.insert(record.id, record.clone());
        record
    }

    pub async fn inventory(&self) -> Vec<InventoryRecord> {
        self.state.lock().await.inventory.values().cloned().collect()
    }

    pub async fn audit_log(&self) -> Vec<AuditEntry> {
        self.state.lock().await.audit.clone()
    }

    pub async fn receipts(&self) -> Vec<Receipt> {
        self.state.lock().await.receipts.clone()
    }

    pub async fn receipt_items(&self) -> Vec<ReceiptItem> {
        self.state.lock().await.receipt_items.clone()
    }

    pub async fn purchase_order_count(&self) -> usize {
        self.state.lock().await.purchase_orders.len()
    }

    pub async fn sales_order_count(&self) -> usize {
        self.state.lock().await.sales_orders.len()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> AppResult<MemoryTx> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(MemoryTx {
            guard,
            staged,
            fault_after: self.fault_after.clone(),
        })
    }
}

/// Unit of work over a staged copy of the state
pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
    fault_after: Arc<AtomicI64>,
}

impl MemoryTx {
    /// Count one write against the injected fault
    fn write(&mut self) -> AppResult<&mut MemoryState> {
        let left = self.fault_after.load(Ordering::SeqCst);
        if left == 0 {
            self.fault_after.store(-1, Ordering::SeqCst);
            return Err(AppError::Database(sqlx::Error::Protocol(
                "injected fault".to_string(),
            )));
        }
        if left > 0 {
            self.fault_after.store(left - 1, Ordering::SeqCst);
        }
        Ok(&mut self.staged)
    }
}

#[async_trait]
impl LedgerTx for MemoryTx {
    async fn product_exists(&mut self, product_id: i64) -> AppResult<bool> {
        Ok(self.staged.products.contains(&product_id))
    }

    async fn warehouse_exists(&mut self, warehouse_id: i64) -> AppResult<bool> {
        Ok(self.staged.warehouses.contains_key(&warehouse_id))
    }

    async fn supplier_exists(&mut self, supplier_id: i64) -> AppResult<bool> {
        Ok(self.staged.suppliers.contains(&supplier_id))
    }

    async fn customer_exists(&mut self, customer_id: i64) -> AppResult<bool> {
        Ok(self.staged.customers.contains(&customer_id))
    }

    async fn insert_warehouse(
        &mut self,
        name: &str,
        location: Option<&str>,
    ) -> AppResult<Warehouse> {
        if self.staged.warehouses.values().any(|w| w.name == name) {
            return Err(AppError::DuplicateEntry("warehouse name".to_string()));
        }
        let state = self.write()?;
        let warehouse = Warehouse {
            id: state.next_id(),
            name: name.to_string(),
            location: location.map(str::to_string),
            created_at: state.tick(),
        };
        state.warehouses.insert(warehouse.id, warehouse.clone());
        Ok(warehouse)
    }

    async fn list_warehouses(&mut self) -> AppResult<Vec<Warehouse>> {
        let mut warehouses: Vec<Warehouse> = self.staged.warehouses.values().cloned().collect();
        warehouses.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(warehouses)
    }

    async fn get_inventory(&mut self, record_id: i64) -> AppResult<Option<InventoryRecord>> {
        Ok(self.staged.inventory.get(&record_id).cloned())
    }

    async fn lock_inventory(&mut self, record_id: i64) -> AppResult<Option<InventoryRecord>> {
        self.get_inventory(record_id).await
    }

    async fn inventory_for_product(&mut self, product_id: i64) -> AppResult<Vec<InventoryRecord>> {
        Ok(self.staged.product_records(product_id))
    }

    async fn lock_inventory_for_product(
        &mut self,
        product_id: i64,
    ) -> AppResult<Vec<InventoryRecord>> {
        Ok(self.staged.product_records(product_id))
    }

    async fn count_inventory_for_pair(
        &mut self,
        product_id: i64,
        warehouse_id: i64,
    ) -> AppResult<i64> {
        let count = self
            .staged
            .inventory
            .values()
            .filter(|r| r.product_id == product_id && r.warehouse_id == warehouse_id)
            .count();
        Ok(count as i64)
    }

    async fn list_inventory(
        &mut self,
        filter: &InventoryFilter,
        default_threshold: i32,
        page: &Pagination,
    ) -> AppResult<(Vec<InventoryRecord>, u64)> {
        let state = &self.staged;
        let mut rows: Vec<InventoryRecord> = state
            .inventory
            .values()
            .filter(|r| filter.warehouse_id.map_or(true, |w| r.warehouse_id == w))
            .filter(|r| {
                !filter.low_stock_only
                    || is_low(r.quantity, state.effective_threshold(r, default_threshold).0)
            })
            .cloned()
            .collect();
        rows.sort_by_key(|r| std::cmp::Reverse(r.fifo_key()));
        let total = rows.len() as u64;
        Ok((page_of(&rows, page), total))
    }

    async fn insert_inventory(&mut self, record: &NewInventoryRecord) -> AppResult<InventoryRecord> {
        let taken = self.staged.inventory.values().any(|r| {
            r.product_id == record.product_id
                && r.warehouse_id == record.warehouse_id
                && r.matches_tags(record.batch_number.as_deref(), record.serial_number.as_deref())
        });
        if taken {
            return Err(AppError::DuplicateCombination {
                product_id: record.product_id,
                warehouse_id: record.warehouse_id,
            });
        }
        let state = self.write()?;
        let record = InventoryRecord {
            id: state.next_id(),
            product_id: record.product_id,
            warehouse_id: record.warehouse_id,
            quantity: record.quantity,
            batch_number: record.batch_number.clone(),
            serial_number: record.serial_number.clone(),
            last_updated: state.tick(),
        };
        state.inventory.insert(record.id, record.clone());
        Ok(record)
    }

    async fn increment_inventory(
        &mut self,
        product_id: i64,
        warehouse_id: i64,
        delta: i32,
        batch_number: Option<&str>,
        serial_number: Option<&str>,
    ) -> AppResult<InventoryRecord> {
        let state = self.write()?;
        let now = state.tick();
        let existing = state.inventory.values_mut().find(|r| {
            r.product_id == product_id
                && r.warehouse_id == warehouse_id
                && r.matches_tags(batch_number, serial_number)
        });
        if let Some(record) = existing {
            record.quantity += delta;
            record.last_updated = now;
            return Ok(record.clone());
        }

        let record = InventoryRecord {
            id: state.next_id(),
            product_id,
            warehouse_id,
            quantity: delta,
            batch_number: batch_number.map(str::to_string),
            serial_number: serial_number.map(str::to_string),
            last_updated: now,
        };
        state.inventory.insert(record.id, record.clone());
        Ok(record)
    }

    async fn patch_inventory(
        &mut self,
        record_id: i64,
        patch: &InventoryPatch,
    ) -> AppResult<Option<InventoryRecord>> {
        let state = self.write()?;
        let now = state.tick();
        Ok(state.inventory.get_mut(&record_id).map(|record| {
            patch.apply(record);
            record.last_updated = now;
            record.clone()
        }))
    }

    async fn decrement_inventory(
        &mut self,
        record_id: i64,
        delta: i32,
    ) -> AppResult<Option<InventoryRecord>> {
        let state = self.write()?;
        let now = state.tick();
        Ok(state
            .inventory
            .get_mut(&record_id)
            .filter(|r| r.quantity >= delta)
            .map(|record| {
                record.quantity -= delta;
                record.last_updated = now;
                record.clone()
            }))
    }

    async fn available_for_product(&mut self, product_id: i64) -> AppResult<i64> {
        Ok(self
            .staged
            .inventory
            .values()
            .filter(|r| r.product_id == product_id)
            .map(|r| i64::from(r.quantity))
            .sum())
    }

    async fn upsert_threshold(
        &mut self,
        product_id: i64,
        warehouse_id: i64,
        threshold: i32,
    ) -> AppResult<LowStockThreshold> {
        let state = self.write()?;
        let entry = state
            .thresholds
            .entry((product_id, warehouse_id))
            .or_insert(LowStockThreshold {
                product_id,
                warehouse_id,
                threshold,
                alert_sent_at: None,
            });
        entry.threshold = threshold;
        Ok(entry.clone())
    }

    async fn get_threshold(
        &mut self,
        product_id: i64,
        warehouse_id: i64,
    ) -> AppResult<Option<LowStockThreshold>> {
        Ok(self.staged.thresholds.get(&(product_id, warehouse_id)).cloned())
    }

    async fn list_low_stock(&mut self, default_threshold: i32) -> AppResult<Vec<LowStockRow>> {
        let state = &self.staged;
        let mut rows: Vec<LowStockRow> = state
            .inventory
            .values()
            .filter_map(|r| {
                let (threshold, alert_sent_at) = state.effective_threshold(r, default_threshold);
                is_low(r.quantity, threshold).then(|| LowStockRow {
                    record: r.clone(),
                    threshold,
                    alert_sent_at,
                })
            })
            .collect();
        rows.sort_by_key(|row| (row.record.quantity, row.record.id));
        Ok(rows)
    }

    async fn mark_alerted(
        &mut self,
        product_id: i64,
        warehouse_id: i64,
        at: DateTime<Utc>,
        default_threshold: i32,
    ) -> AppResult<LowStockThreshold> {
        let state = self.write()?;
        let entry = state
            .thresholds
            .entry((product_id, warehouse_id))
            .or_insert(LowStockThreshold {
                product_id,
                warehouse_id,
                threshold: default_threshold,
                alert_sent_at: None,
            });
        entry.alert_sent_at = Some(at);
        Ok(entry.clone())
    }

    async fn insert_purchase_order(
        &mut self,
        supplier_id: i64,
        total_amount: Decimal,
    ) -> AppResult<PurchaseOrder> {
        let state = self.write()?;
        let order = PurchaseOrder {
            id: state.next_id(),
            supplier_id,
            status: PurchaseOrderStatus::Pending,
            total_amount,
            approved_by: None,
            approved_at: None,
            order_date: state.tick(),
        };
        state.purchase_orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn insert_purchase_order_item(
        &mut self,
        purchase_order_id: i64,
        item: &LineItemInput,
    ) -> AppResult<PurchaseOrderItem> {
        let state = self.write()?;
        let item = PurchaseOrderItem {
            id: state.next_id(),
            purchase_order_id,
            product_id: item.product_id,
            quantity: item.quantity,
            unit_price: item.unit_price,
        };
        state.purchase_order_items.push(item.clone());
        Ok(item)
    }

    async fn get_purchase_order(&mut self, id: i64) -> AppResult<Option<PurchaseOrder>> {
        Ok(self.staged.purchase_orders.get(&id).cloned())
    }

    async fn lock_purchase_order(&mut self, id: i64) -> AppResult<Option<PurchaseOrder>> {
        self.get_purchase_order(id).await
    }

    async fn purchase_order_items(&mut self, id: i64) -> AppResult<Vec<PurchaseOrderItem>> {
        Ok(self
            .staged
            .purchase_order_items
            .iter()
            .filter(|i| i.purchase_order_id == id)
            .cloned()
            .collect())
    }

    async fn list_purchase_orders(
        &mut self,
        filter: &PurchaseOrderFilter,
        page: &Pagination,
    ) -> AppResult<(Vec<PurchaseOrder>, u64)> {
        let mut rows: Vec<PurchaseOrder> = self
            .staged
            .purchase_orders
            .values()
            .filter(|o| filter.status.map_or(true, |s| o.status == s))
            .filter(|o| filter.supplier_id.map_or(true, |s| o.supplier_id == s))
            .cloned()
            .collect();
        rows.sort_by_key(|o| std::cmp::Reverse((o.order_date, o.id)));
        let total = rows.len() as u64;
        Ok((page_of(&rows, page), total))
    }

    async fn set_purchase_order_status(
        &mut self,
        id: i64,
        status: PurchaseOrderStatus,
        approval: Option<Approval>,
    ) -> AppResult<PurchaseOrder> {
        let state = self.write()?;
        let order = state
            .purchase_orders
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Purchase order {}", id)))?;
        order.status = status;
        if let Some(approval) = approval {
            order.approved_by = Some(approval.approved_by);
            order.approved_at = Some(approval.approved_at);
        }
        Ok(order.clone())
    }

    async fn insert_receipt(
        &mut self,
        purchase_order_id: i64,
        warehouse_id: i64,
        received_by: i64,
    ) -> AppResult<Receipt> {
        let state = self.write()?;
        let receipt = Receipt {
            id: state.next_id(),
            purchase_order_id,
            warehouse_id,
            received_by,
            received_date: state.tick(),
        };
        state.receipts.push(receipt.clone());
        Ok(receipt)
    }

    async fn insert_receipt_item(
        &mut self,
        receipt_id: i64,
        item: &ReceiveItemInput,
    ) -> AppResult<ReceiptItem> {
        let state = self.write()?;
        let item = ReceiptItem {
            id: state.next_id(),
            receipt_id,
            product_id: item.product_id,
            quantity_received: item.quantity_received,
            batch_number: item.batch_number.clone(),
            serial_number: item.serial_number.clone(),
        };
        state.receipt_items.push(item.clone());
        Ok(item)
    }

    async fn receipts_for_purchase_order(&mut self, id: i64) -> AppResult<Vec<ReceiptWithItems>> {
        let state = &self.staged;
        Ok(state
            .receipts
            .iter()
            .filter(|r| r.purchase_order_id == id)
            .map(|receipt| ReceiptWithItems {
                receipt: receipt.clone(),
                items: state
                    .receipt_items
                    .iter()
                    .filter(|i| i.receipt_id == receipt.id)
                    .cloned()
                    .collect(),
            })
            .collect())
    }

    async fn insert_sales_order(
        &mut self,
        customer_id: i64,
        total_amount: Decimal,
    ) -> AppResult<SalesOrder> {
        let state = self.write()?;
        let order = SalesOrder {
            id: state.next_id(),
            customer_id,
            status: SalesOrderStatus::Quotation,
            total_amount,
            approved_by: None,
            approved_at: None,
            order_date: state.tick(),
        };
        state.sales_orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn insert_sales_order_item(
        &mut self,
        sales_order_id: i64,
        item: &LineItemInput,
    ) -> AppResult<SalesOrderItem> {
        let state = self.write()?;
        let item = SalesOrderItem {
            id: state.next_id(),
            sales_order_id,
            product_id: item.product_id,
            quantity: item.quantity,
            unit_price: item.unit_price,
        };
        state.sales_order_items.push(item.clone());
        Ok(item)
    }

    async fn get_sales_order(&mut self, id: i64) -> AppResult<Option<SalesOrder>> {
        Ok(self.staged.sales_orders.get(&id).cloned())
    }

    async fn lock_sales_order(&mut self, id: i64) -> AppResult<Option<SalesOrder>> {
        self.get_sales_order(id).await
    }

    async fn sales_order_items(&mut self, id: i64) -> AppResult<Vec<SalesOrderItem>> {
        Ok(self
            .staged
            .sales_order_items
            .iter()
            .filter(|i| i.sales_order_id == id)
            .cloned()
            .collect())
    }

    async fn list_sales_orders(
        &mut self,
        filter: &SalesOrderFilter,
        page: &Pagination,
    ) -> AppResult<(Vec<SalesOrder>, u64)> {
        let mut rows: Vec<SalesOrder> = self
            .staged
            .sales_orders
            .values()
            .filter(|o| filter.status.map_or(true, |s| o.status == s))
            .filter(|o| filter.customer_id.map_or(true, |c| o.customer_id == c))
            .cloned()
            .collect();
        rows.sort_by_key(|o| std::cmp::Reverse((o.order_date, o.id)));
        let total = rows.len() as u64;
        Ok((page_of(&rows, page), total))
    }

    async fn set_sales_order_status(
        &mut self,
        id: i64,
        status: SalesOrderStatus,
        approval: Option<Approval>,
    ) -> AppResult<SalesOrder> {
        let state = self.write()?;
        let order = state
            .sales_orders
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Sales order {}", id)))?;
        order.status = status;
        if let Some(approval) = approval {
            order.approved_by = Some(approval.approved_by);
            order.approved_at = Some(approval.approved_at);
        }
        Ok(order.clone())
    }

    async fn insert_audit(&mut self, entry: &NewAuditEntry) -> AppResult<AuditEntry> {
        let state = self.write()?;
        let entry = AuditEntry {
            id: state.next_id(),
            user_id: entry.user_id,
            action: entry.action.clone(),
            details: entry.details.clone(),
            created_at: state.tick(),
        };
        state.audit.push(entry.clone());
        Ok(entry)
    }

    async fn commit(self) -> AppResult<()> {
        let MemoryTx {
            mut guard, staged, ..
        } = self;
        *guard = staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(product_id: i64, warehouse_id: i64, quantity: i32) -> NewInventoryRecord {
        NewInventoryRecord {
            product_id,
            warehouse_id,
            quantity,
            batch_number: None,
            serial_number: None,
        }
    }

    #[tokio::test]
    async fn test_drop_without_commit_discards_changes() {
        let store = MemoryLedgerStore::new();
        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_inventory(&plain(1, 1, 5)).await.unwrap();
        }
        assert!(store.inventory().await.is_empty());
    }

    #[tokio::test]
    async fn test_commit_publishes_changes() {
        let store = MemoryLedgerStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.insert_inventory(&plain(1, 1, 5)).await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(store.inventory().await.len(), 1);
    }

    #[tokio::test]
    async fn test_injected_fault_fires_once() {
        let store = MemoryLedgerStore::new();
        store.fail_after_writes(1);
        let mut tx = store.begin().await.unwrap();
        tx.increment_inventory(1, 1, 3, None, None).await.unwrap();
        let err = tx.increment_inventory(1, 1, 3, None, None).await.unwrap_err();
        assert!(matches!(err, AppError::Database(_)));
        tx.increment_inventory(1, 1, 3, None, None).await.unwrap();
    }

    #[tokio::test]
    async fn test_increment_treats_missing_tags_as_equal() {
        let store = MemoryLedgerStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.increment_inventory(1, 1, 3, None, None).await.unwrap();
        let r = tx.increment_inventory(1, 1, 4, None, None).await.unwrap();
        assert_eq!(r.quantity, 7);
        let tagged = tx.increment_inventory(1, 1, 2, Some("B-1"), None).await.unwrap();
        assert_ne!(tagged.id, r.id);
        assert_eq!(tx.count_inventory_for_pair(1, 1).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_decrement_refuses_to_go_negative() {
        let store = MemoryLedgerStore::new();
        let mut tx = store.begin().await.unwrap();
        let r = tx.insert_inventory(&plain(1, 1, 2)).await.unwrap();
        assert!(tx.decrement_inventory(r.id, 3).await.unwrap().is_none());
        assert_eq!(tx.decrement_inventory(r.id, 2).await.unwrap().unwrap().quantity, 0);
    }
}
