//! PostgreSQL implementation of the ledger store
//!
//! Every unit of work is a READ COMMITTED transaction. Locking reads use
//! `SELECT ... FOR UPDATE`; the inventory upsert relies on the expression
//! unique index over (product, warehouse, batch, serial).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use shared::{
    InventoryFilter, InventoryPatch, InventoryRecord, LineItemInput, LowStockThreshold,
    NewInventoryRecord, Pagination, PurchaseOrder, PurchaseOrderFilter, PurchaseOrderItem,
    PurchaseOrderStatus, Receipt, ReceiptItem, ReceiptWithItems, ReceiveItemInput, SalesOrder,
    SalesOrderFilter, SalesOrderItem, SalesOrderStatus, Warehouse,
};

use super::{Approval, AuditEntry, LedgerStore, LedgerTx, LowStockRow, NewAuditEntry};
use crate::error::{AppError, AppResult};

const INVENTORY_COLUMNS: &str =
    "id, product_id, warehouse_id, quantity, batch_number, serial_number, last_updated";

const PURCHASE_ORDER_COLUMNS: &str =
    "id, supplier_id, status, total_amount, approved_by, approved_at, order_date";

const SALES_ORDER_COLUMNS: &str =
    "id, customer_id, status, total_amount, approved_by, approved_at, order_date";

/// Store backed by a shared connection pool
#[derive(Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    type Tx = PgLedgerTx;

    async fn begin(&self) -> AppResult<PgLedgerTx> {
        let tx = self.pool.begin().await?;
        Ok(PgLedgerTx { tx })
    }
}

/// Open transaction; rolls back on drop unless committed
pub struct PgLedgerTx {
    tx: Transaction<'static, Postgres>,
}

// ============================================================================
// Row types
// ============================================================================

#[derive(Debug, FromRow)]
struct InventoryRow {
    id: i64,
    product_id: i64,
    warehouse_id: i64,
    quantity: i32,
    batch_number: Option<String>,
    serial_number: Option<String>,
    last_updated: DateTime<Utc>,
}

impl From<InventoryRow> for InventoryRecord {
    fn from(row: InventoryRow) -> Self {
        InventoryRecord {
            id: row.id,
            product_id: row.product_id,
            warehouse_id: row.warehouse_id,
            quantity: row.quantity,
            batch_number: row.batch_number,
            serial_number: row.serial_number,
            last_updated: row.last_updated,
        }
    }
}

#[derive(Debug, FromRow)]
struct LowStockDbRow {
    #[sqlx(flatten)]
    record: InventoryRow,
    threshold: i32,
    alert_sent_at: Option<DateTime<Utc>>,
}

#[derive(Debug, FromRow)]
struct ThresholdRow {
    product_id: i64,
    warehouse_id: i64,
    threshold: i32,
    alert_sent_at: Option<DateTime<Utc>>,
}

impl From<ThresholdRow> for LowStockThreshold {
    fn from(row: ThresholdRow) -> Self {
        LowStockThreshold {
            product_id: row.product_id,
            warehouse_id: row.warehouse_id,
            threshold: row.threshold,
            alert_sent_at: row.alert_sent_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct WarehouseRow {
    id: i64,
    name: String,
    location: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<WarehouseRow> for Warehouse {
    fn from(row: WarehouseRow) -> Self {
        Warehouse {
            id: row.id,
            name: row.name,
            location: row.location,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct PurchaseOrderRow {
    id: i64,
    supplier_id: i64,
    status: String,
    total_amount: Decimal,
    approved_by: Option<i64>,
    approved_at: Option<DateTime<Utc>>,
    order_date: DateTime<Utc>,
}

impl TryFrom<PurchaseOrderRow> for PurchaseOrder {
    type Error = AppError;

    fn try_from(row: PurchaseOrderRow) -> AppResult<Self> {
        let status = row
            .status
            .parse::<PurchaseOrderStatus>()
            .map_err(|e| AppError::Internal(e.to_string()))?;
        Ok(PurchaseOrder {
            id: row.id,
            supplier_id: row.supplier_id,
            status,
            total_amount: row.total_amount,
            approved_by: row.approved_by,
            approved_at: row.approved_at,
            order_date: row.order_date,
        })
    }
}

#[derive(Debug, FromRow)]
struct SalesOrderRow {
    id: i64,
    customer_id: i64,
    status: String,
    total_amount: Decimal,
    approved_by: Option<i64>,
    approved_at: Option<DateTime<Utc>>,
    order_date: DateTime<Utc>,
}

impl TryFrom<SalesOrderRow> for SalesOrder {
    type Error = AppError;

    fn try_from(row: SalesOrderRow) -> AppResult<Self> {
        let status = row
            .status
            .parse::<SalesOrderStatus>()
            .map_err(|e| AppError::Internal(e.to_string()))?;
        Ok(SalesOrder {
            id: row.id,
            customer_id: row.customer_id,
            status,
            total_amount: row.total_amount,
            approved_by: row.approved_by,
            approved_at: row.approved_at,
            order_date: row.order_date,
        })
    }
}

#[derive(Debug, FromRow)]
struct OrderItemRow {
    id: i64,
    order_id: i64,
    product_id: i64,
    quantity: i32,
    unit_price: Decimal,
}

impl From<OrderItemRow> for PurchaseOrderItem {
    fn from(row: OrderItemRow) -> Self {
        PurchaseOrderItem {
            id: row.id,
            purchase_order_id: row.order_id,
            product_id: row.product_id,
            quantity: row.quantity,
            unit_price: row.unit_price,
        }
    }
}

impl From<OrderItemRow> for SalesOrderItem {
    fn from(row: OrderItemRow) -> Self {
        SalesOrderItem {
            id: row.id,
            sales_order_id: row.order_id,
            product_id: row.product_id,
            quantity: row.quantity,
            unit_price: row.unit_price,
        }
    }
}

#[derive(Debug, FromRow)]
struct ReceiptRow {
    id: i64,
    purchase_order_id: i64,
    warehouse_id: i64,
    received_by: i64,
    received_date: DateTime<Utc>,
}

impl From<ReceiptRow> for Receipt {
    fn from(row: ReceiptRow) -> Self {
        Receipt {
            id: row.id,
            purchase_order_id: row.purchase_order_id,
            warehouse_id: row.warehouse_id,
            received_by: row.received_by,
            received_date: row.received_date,
        }
    }
}

#[derive(Debug, FromRow)]
struct ReceiptItemRow {
    id: i64,
    receipt_id: i64,
    product_id: i64,
    quantity_received: i32,
    batch_number: Option<String>,
    serial_number: Option<String>,
}

impl From<ReceiptItemRow> for ReceiptItem {
    fn from(row: ReceiptItemRow) -> Self {
        ReceiptItem {
            id: row.id,
            receipt_id: row.receipt_id,
            product_id: row.product_id,
            quantity_received: row.quantity_received,
            batch_number: row.batch_number,
            serial_number: row.serial_number,
        }
    }
}

#[derive(Debug, FromRow)]
struct AuditRow {
    id: i64,
    user_id: i64,
    action: String,
    details: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl From<AuditRow> for AuditEntry {
    fn from(row: AuditRow) -> Self {
        AuditEntry {
            id: row.id,
            user_id: row.user_id,
            action: row.action,
            details: row.details,
            created_at: row.created_at,
        }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

impl PgLedgerTx {
    async fn exists(&mut self, sql: &str, id: i64) -> AppResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(sql)
            .bind(id)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(exists)
    }

    async fn fetch_inventory(&mut self, sql: &str, id: i64) -> AppResult<Vec<InventoryRecord>> {
        let rows = sqlx::query_as::<_, InventoryRow>(sql)
            .bind(id)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn fetch_purchase_order(&mut self, id: i64, lock: bool) -> AppResult<Option<PurchaseOrder>> {
        let sql = format!(
            "SELECT {PURCHASE_ORDER_COLUMNS} FROM purchase_orders WHERE id = $1{}",
            if lock { " FOR UPDATE" } else { "" }
        );
        sqlx::query_as::<_, PurchaseOrderRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?
            .map(PurchaseOrder::try_from)
            .transpose()
    }

    async fn fetch_sales_order(&mut self, id: i64, lock: bool) -> AppResult<Option<SalesOrder>> {
        let sql = format!(
            "SELECT {SALES_ORDER_COLUMNS} FROM sales_orders WHERE id = $1{}",
            if lock { " FOR UPDATE" } else { "" }
        );
        sqlx::query_as::<_, SalesOrderRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?
            .map(SalesOrder::try_from)
            .transpose()
    }
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    async fn product_exists(&mut self, product_id: i64) -> AppResult<bool> {
        self.exists("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)", product_id)
            .await
    }

    async fn warehouse_exists(&mut self, warehouse_id: i64) -> AppResult<bool> {
        self.exists("SELECT EXISTS(SELECT 1 FROM warehouses WHERE id = $1)", warehouse_id)
            .await
    }

    async fn supplier_exists(&mut self, supplier_id: i64) -> AppResult<bool> {
        self.exists("SELECT EXISTS(SELECT 1 FROM suppliers WHERE id = $1)", supplier_id)
            .await
    }

    async fn customer_exists(&mut self, customer_id: i64) -> AppResult<bool> {
        self.exists("SELECT EXISTS(SELECT 1 FROM customers WHERE id = $1)", customer_id)
            .await
    }

    async fn insert_warehouse(
        &mut self,
        name: &str,
        location: Option<&str>,
    ) -> AppResult<Warehouse> {
        let row = sqlx::query_as::<_, WarehouseRow>(
            r#"
            INSERT INTO warehouses (name, location)
            VALUES ($1, $2)
            RETURNING id, name, location, created_at
            "#,
        )
        .bind(name)
        .bind(location)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::DuplicateEntry("warehouse name".to_string())
            } else {
                AppError::Database(e)
            }
        })?;

        Ok(row.into())
    }

    async fn list_warehouses(&mut self) -> AppResult<Vec<Warehouse>> {
        let rows = sqlx::query_as::<_, WarehouseRow>(
            "SELECT id, name, location, created_at FROM warehouses ORDER BY name",
        )
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_inventory(&mut self, record_id: i64) -> AppResult<Option<InventoryRecord>> {
        let sql = format!("SELECT {INVENTORY_COLUMNS} FROM inventory WHERE id = $1");
        Ok(self.fetch_inventory(&sql, record_id).await?.into_iter().next())
    }

    async fn lock_inventory(&mut self, record_id: i64) -> AppResult<Option<InventoryRecord>> {
        let sql = format!("SELECT {INVENTORY_COLUMNS} FROM inventory WHERE id = $1 FOR UPDATE");
        Ok(self.fetch_inventory(&sql, record_id).await?.into_iter().next())
    }

    async fn inventory_for_product(&mut self, product_id: i64) -> AppResult<Vec<InventoryRecord>> {
        let sql = format!(
            "SELECT {INVENTORY_COLUMNS} FROM inventory WHERE product_id = $1 \
             ORDER BY last_updated ASC, id ASC"
        );
        self.fetch_inventory(&sql, product_id).await
    }

    async fn lock_inventory_for_product(
        &mut self,
        product_id: i64,
    ) -> AppResult<Vec<InventoryRecord>> {
        // Rows are locked in id order; callers re-sort into FIFO order after
        // the lock is held since a concurrent writer may have moved
        // last_updated while we waited.
        let sql = format!(
            "SELECT {INVENTORY_COLUMNS} FROM inventory WHERE product_id = $1 \
             ORDER BY id ASC FOR UPDATE"
        );
        let mut records = self.fetch_inventory(&sql, product_id).await?;
        shared::sort_fifo(&mut records);
        Ok(records)
    }

    async fn count_inventory_for_pair(
        &mut self,
        product_id: i64,
        warehouse_id: i64,
    ) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM inventory WHERE product_id = $1 AND warehouse_id = $2",
        )
        .bind(product_id)
        .bind(warehouse_id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(count)
    }

    async fn list_inventory(
        &mut self,
        filter: &InventoryFilter,
        default_threshold: i32,
        page: &Pagination,
    ) -> AppResult<(Vec<InventoryRecord>, u64)> {
        const WHERE: &str = r#"
            FROM inventory i
            LEFT JOIN low_stock_alerts lsa
                ON lsa.product_id = i.product_id AND lsa.warehouse_id = i.warehouse_id
            WHERE ($1::BIGINT IS NULL OR i.warehouse_id = $1)
              AND (NOT $2 OR i.quantity <= COALESCE(lsa.threshold, $3))
        "#;

        let rows = sqlx::query_as::<_, InventoryRow>(&format!(
            "SELECT i.id, i.product_id, i.warehouse_id, i.quantity, i.batch_number, \
             i.serial_number, i.last_updated {WHERE} \
             ORDER BY i.last_updated DESC, i.id DESC LIMIT $4 OFFSET $5"
        ))
        .bind(filter.warehouse_id)
        .bind(filter.low_stock_only)
        .bind(default_threshold)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&mut *self.tx)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) {WHERE}"))
            .bind(filter.warehouse_id)
            .bind(filter.low_stock_only)
            .bind(default_threshold)
            .fetch_one(&mut *self.tx)
            .await?;

        Ok((rows.into_iter().map(Into::into).collect(), total as u64))
    }

    async fn insert_inventory(&mut self, record: &NewInventoryRecord) -> AppResult<InventoryRecord> {
        let row = sqlx::query_as::<_, InventoryRow>(&format!(
            "INSERT INTO inventory (product_id, warehouse_id, quantity, batch_number, serial_number) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {INVENTORY_COLUMNS}"
        ))
        .bind(record.product_id)
        .bind(record.warehouse_id)
        .bind(record.quantity)
        .bind(&record.batch_number)
        .bind(&record.serial_number)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::DuplicateCombination {
                    product_id: record.product_id,
                    warehouse_id: record.warehouse_id,
                }
            } else {
                AppError::Database(e)
            }
        })?;

        Ok(row.into())
    }

    async fn increment_inventory(
        &mut self,
        product_id: i64,
        warehouse_id: i64,
        delta: i32,
        batch_number: Option<&str>,
        serial_number: Option<&str>,
    ) -> AppResult<InventoryRecord> {
        let row = sqlx::query_as::<_, InventoryRow>(&format!(
            r#"
            INSERT INTO inventory (product_id, warehouse_id, quantity, batch_number, serial_number)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (product_id, warehouse_id, (COALESCE(batch_number, '')), (COALESCE(serial_number, '')))
            DO UPDATE SET quantity = inventory.quantity + EXCLUDED.quantity, last_updated = NOW()
            RETURNING {INVENTORY_COLUMNS}
            "#
        ))
        .bind(product_id)
        .bind(warehouse_id)
        .bind(delta)
        .bind(batch_number)
        .bind(serial_number)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row.into())
    }

    async fn patch_inventory(
        &mut self,
        record_id: i64,
        patch: &InventoryPatch,
    ) -> AppResult<Option<InventoryRecord>> {
        let row = sqlx::query_as::<_, InventoryRow>(&format!(
            r#"
            UPDATE inventory
            SET quantity = COALESCE($2, quantity),
                batch_number = CASE WHEN $3 THEN $4 ELSE batch_number END,
                serial_number = CASE WHEN $5 THEN $6 ELSE serial_number END,
                last_updated = NOW()
            WHERE id = $1
            RETURNING {INVENTORY_COLUMNS}
            "#
        ))
        .bind(record_id)
        .bind(patch.quantity)
        .bind(patch.batch_number.is_some())
        .bind(patch.batch_number.clone().flatten())
        .bind(patch.serial_number.is_some())
        .bind(patch.serial_number.clone().flatten())
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn decrement_inventory(
        &mut self,
        record_id: i64,
        delta: i32,
    ) -> AppResult<Option<InventoryRecord>> {
        let row = sqlx::query_as::<_, InventoryRow>(&format!(
            r#"
            UPDATE inventory
            SET quantity = quantity - $2, last_updated = NOW()
            WHERE id = $1 AND quantity >= $2
            RETURNING {INVENTORY_COLUMNS}
            "#
        ))
        .bind(record_id)
        .bind(delta)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn available_for_product(&mut self, product_id: i64) -> AppResult<i64> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(quantity), 0)::BIGINT FROM inventory WHERE product_id = $1",
        )
        .bind(product_id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(total)
    }

    async fn upsert_threshold(
        &mut self,
        product_id: i64,
        warehouse_id: i64,
        threshold: i32,
    ) -> AppResult<LowStockThreshold> {
        let row = sqlx::query_as::<_, ThresholdRow>(
            r#"
            INSERT INTO low_stock_alerts (product_id, warehouse_id, threshold)
            VALUES ($1, $2, $3)
            ON CONFLICT (product_id, warehouse_id)
            DO UPDATE SET threshold = EXCLUDED.threshold
            RETURNING product_id, warehouse_id, threshold, alert_sent_at
            "#,
        )
        .bind(product_id)
        .bind(warehouse_id)
        .bind(threshold)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row.into())
    }

    async fn get_threshold(
        &mut self,
        product_id: i64,
        warehouse_id: i64,
    ) -> AppResult<Option<LowStockThreshold>> {
        let row = sqlx::query_as::<_, ThresholdRow>(
            r#"
            SELECT product_id, warehouse_id, threshold, alert_sent_at
            FROM low_stock_alerts
            WHERE product_id = $1 AND warehouse_id = $2
            "#,
        )
        .bind(product_id)
        .bind(warehouse_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn list_low_stock(&mut self, default_threshold: i32) -> AppResult<Vec<LowStockRow>> {
        let rows = sqlx::query_as::<_, LowStockDbRow>(
            r#"
            SELECT i.id, i.product_id, i.warehouse_id, i.quantity, i.batch_number,
                   i.serial_number, i.last_updated,
                   COALESCE(lsa.threshold, $1) AS threshold, lsa.alert_sent_at
            FROM inventory i
            LEFT JOIN low_stock_alerts lsa
                ON lsa.product_id = i.product_id AND lsa.warehouse_id = i.warehouse_id
            WHERE i.quantity <= COALESCE(lsa.threshold, $1)
            ORDER BY i.quantity ASC, i.id ASC
            "#,
        )
        .bind(default_threshold)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| LowStockRow {
                record: r.record.into(),
                threshold: r.threshold,
                alert_sent_at: r.alert_sent_at,
            })
            .collect())
    }

    async fn mark_alerted(
        &mut self,
        product_id: i64,
        warehouse_id: i64,
        at: DateTime<Utc>,
        default_threshold: i32,
    ) -> AppResult<LowStockThreshold> {
        let row = sqlx::query_as::<_, ThresholdRow>(
            r#"
            INSERT INTO low_stock_alerts (product_id, warehouse_id, threshold, alert_sent_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (product_id, warehouse_id)
            DO UPDATE SET alert_sent_at = EXCLUDED.alert_sent_at
            RETURNING product_id, warehouse_id, threshold, alert_sent_at
            "#,
        )
        .bind(product_id)
        .bind(warehouse_id)
        .bind(default_threshold)
        .bind(at)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row.into())
    }

    async fn insert_purchase_order(
        &mut self,
        supplier_id: i64,
        total_amount: Decimal,
    ) -> AppResult<PurchaseOrder> {
        let row = sqlx::query_as::<_, PurchaseOrderRow>(&format!(
            "INSERT INTO purchase_orders (supplier_id, status, total_amount) \
             VALUES ($1, $2, $3) RETURNING {PURCHASE_ORDER_COLUMNS}"
        ))
        .bind(supplier_id)
        .bind(PurchaseOrderStatus::Pending.as_str())
        .bind(total_amount)
        .fetch_one(&mut *self.tx)
        .await?;

        row.try_into()
    }

    async fn insert_purchase_order_item(
        &mut self,
        purchase_order_id: i64,
        item: &LineItemInput,
    ) -> AppResult<PurchaseOrderItem> {
        let row = sqlx::query_as::<_, OrderItemRow>(
            r#"
            INSERT INTO purchase_order_items (purchase_order_id, product_id, quantity, unit_price)
            VALUES ($1, $2, $3, $4)
            RETURNING id, purchase_order_id AS order_id, product_id, quantity, unit_price
            "#,
        )
        .bind(purchase_order_id)
        .bind(item.product_id)
        .bind(item.quantity)
        .bind(item.unit_price)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row.into())
    }

    async fn get_purchase_order(&mut self, id: i64) -> AppResult<Option<PurchaseOrder>> {
        self.fetch_purchase_order(id, false).await
    }

    async fn lock_purchase_order(&mut self, id: i64) -> AppResult<Option<PurchaseOrder>> {
        self.fetch_purchase_order(id, true).await
    }

    async fn purchase_order_items(&mut self, id: i64) -> AppResult<Vec<PurchaseOrderItem>> {
        let rows = sqlx::query_as::<_, OrderItemRow>(
            r#"
            SELECT id, purchase_order_id AS order_id, product_id, quantity, unit_price
            FROM purchase_order_items
            WHERE purchase_order_id = $1
            ORDER BY id
            "#,
        )
        .bind(id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_purchase_orders(
        &mut self,
        filter: &PurchaseOrderFilter,
        page: &Pagination,
    ) -> AppResult<(Vec<PurchaseOrder>, u64)> {
        const WHERE: &str = r#"
            FROM purchase_orders
            WHERE ($1::VARCHAR IS NULL OR status = $1)
              AND ($2::BIGINT IS NULL OR supplier_id = $2)
        "#;
        let status = filter.status.map(|s| s.as_str());

        let rows = sqlx::query_as::<_, PurchaseOrderRow>(&format!(
            "SELECT {PURCHASE_ORDER_COLUMNS} {WHERE} ORDER BY order_date DESC, id DESC LIMIT $3 OFFSET $4"
        ))
        .bind(status)
        .bind(filter.supplier_id)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&mut *self.tx)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) {WHERE}"))
            .bind(status)
            .bind(filter.supplier_id)
            .fetch_one(&mut *self.tx)
            .await?;

        let orders = rows
            .into_iter()
            .map(PurchaseOrder::try_from)
            .collect::<AppResult<Vec<_>>>()?;
        Ok((orders, total as u64))
    }

    async fn set_purchase_order_status(
        &mut self,
        id: i64,
        status: PurchaseOrderStatus,
        approval: Option<Approval>,
    ) -> AppResult<PurchaseOrder> {
        let row = sqlx::query_as::<_, PurchaseOrderRow>(&format!(
            r#"
            UPDATE purchase_orders
            SET status = $2,
                approved_by = COALESCE($3, approved_by),
                approved_at = COALESCE($4, approved_at)
            WHERE id = $1
            RETURNING {PURCHASE_ORDER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(status.as_str())
        .bind(approval.map(|a| a.approved_by))
        .bind(approval.map(|a| a.approved_at))
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Purchase order {}", id)))?;

        row.try_into()
    }

    async fn insert_receipt(
        &mut self,
        purchase_order_id: i64,
        warehouse_id: i64,
        received_by: i64,
    ) -> AppResult<Receipt> {
        let row = sqlx::query_as::<_, ReceiptRow>(
            r#"
            INSERT INTO receipts (purchase_order_id, warehouse_id, received_by)
            VALUES ($1, $2, $3)
            RETURNING id, purchase_order_id, warehouse_id, received_by, received_date
            "#,
        )
        .bind(purchase_order_id)
        .bind(warehouse_id)
        .bind(received_by)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row.into())
    }

    async fn insert_receipt_item(
        &mut self,
        receipt_id: i64,
        item: &ReceiveItemInput,
    ) -> AppResult<ReceiptItem> {
        let row = sqlx::query_as::<_, ReceiptItemRow>(
            r#"
            INSERT INTO receipt_items (receipt_id, product_id, quantity_received, batch_number, serial_number)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, receipt_id, product_id, quantity_received, batch_number, serial_number
            "#,
        )
        .bind(receipt_id)
        .bind(item.product_id)
        .bind(item.quantity_received)
        .bind(&item.batch_number)
        .bind(&item.serial_number)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row.into())
    }

    async fn receipts_for_purchase_order(&mut self, id: i64) -> AppResult<Vec<ReceiptWithItems>> {
        let receipts = sqlx::query_as::<_, ReceiptRow>(
            r#"
            SELECT id, purchase_order_id, warehouse_id, received_by, received_date
            FROM receipts
            WHERE purchase_order_id = $1
            ORDER BY received_date, id
            "#,
        )
        .bind(id)
        .fetch_all(&mut *self.tx)
        .await?;

        let items = sqlx::query_as::<_, ReceiptItemRow>(
            r#"
            SELECT ri.id, ri.receipt_id, ri.product_id, ri.quantity_received,
                   ri.batch_number, ri.serial_number
            FROM receipt_items ri
            JOIN receipts r ON r.id = ri.receipt_id
            WHERE r.purchase_order_id = $1
            ORDER BY ri.id
            "#,
        )
        .bind(id)
        .fetch_all(&mut *self.tx)
        .await?;

        let mut items: Vec<ReceiptItem> = items.into_iter().map(Into::into).collect();
        Ok(receipts
            .into_iter()
            .map(|r| {
                let receipt: Receipt = r.into();
                let (mine, rest): (Vec<_>, Vec<_>) =
                    items.drain(..).partition(|i| i.receipt_id == receipt.id);
                items = rest;
                ReceiptWithItems {
                    receipt,
                    items: mine,
                }
            })
            .collect())
    }

    async fn insert_sales_order(
        &mut self,
        customer_id: i64,
        total_amount: Decimal,
    ) -> AppResult<SalesOrder> {
        let row = sqlx::query_as::<_, SalesOrderRow>(&format!(
            "INSERT INTO sales_orders (customer_id, status, total_amount) \
             VALUES ($1, $2, $3) RETURNING {SALES_ORDER_COLUMNS}"
        ))
        .bind(customer_id)
        .bind(SalesOrderStatus::Quotation.as_str())
        .bind(total_amount)
        .fetch_one(&mut *self.tx)
        .await?;

        row.try_into()
    }

    async fn insert_sales_order_item(
        &mut self,
        sales_order_id: i64,
        item: &LineItemInput,
    ) -> AppResult<SalesOrderItem> {
        let row = sqlx::query_as::<_, OrderItemRow>(
            r#"
            INSERT INTO sales_order_items (sales_order_id, product_id, quantity, unit_price)
            VALUES ($1, $2, $3, $4)
            RETURNING id, sales_order_id AS order_id, product_id, quantity, unit_price
            "#,
        )
        .bind(sales_order_id)
        .bind(item.product_id)
        .bind(item.quantity)
        .bind(item.unit_price)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row.into())
    }

    async fn get_sales_order(&mut self, id: i64) -> AppResult<Option<SalesOrder>> {
        self.fetch_sales_order(id, false).await
    }

    async fn lock_sales_order(&mut self, id: i64) -> AppResult<Option<SalesOrder>> {
        self.fetch_sales_order(id, true).await
    }

    async fn sales_order_items(&mut self, id: i64) -> AppResult<Vec<SalesOrderItem>> {
        let rows = sqlx::query_as::<_, OrderItemRow>(
            r#"
            SELECT id, sales_order_id AS order_id, product_id, quantity, unit_price
            FROM sales_order_items
            WHERE sales_order_id = $1
            ORDER BY id
            "#,
        )
        .bind(id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_sales_orders(
        &mut self,
        filter: &SalesOrderFilter,
        page: &Pagination,
    ) -> AppResult<(Vec<SalesOrder>, u64)> {
        const WHERE: &str = r#"
            FROM sales_orders
            WHERE ($1::VARCHAR IS NULL OR status = $1)
              AND ($2::BIGINT IS NULL OR customer_id = $2)
        "#;
        let status = filter.status.map(|s| s.as_str());

        let rows = sqlx::query_as::<_, SalesOrderRow>(&format!(
            "SELECT {SALES_ORDER_COLUMNS} {WHERE} ORDER BY order_date DESC, id DESC LIMIT $3 OFFSET $4"
        ))
        .bind(status)
        .bind(filter.customer_id)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&mut *self.tx)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) {WHERE}"))
            .bind(status)
            .bind(filter.customer_id)
            .fetch_one(&mut *self.tx)
            .await?;

        let orders = rows
            .into_iter()
            .map(SalesOrder::try_from)
            .collect::<AppResult<Vec<_>>>()?;
        Ok((orders, total as u64))
    }

    async fn set_sales_order_status(
        &mut self,
        id: i64,
        status: SalesOrderStatus,
        approval: Option<Approval>,
    ) -> AppResult<SalesOrder> {
        let row = sqlx::query_as::<_, SalesOrderRow>(&format!(
            r#"
            UPDATE sales_orders
            SET status = $2,
                approved_by = COALESCE($3, approved_by),
                approved_at = COALESCE($4, approved_at)
            WHERE id = $1
            RETURNING {SALES_ORDER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(status.as_str())
        .bind(approval.map(|a| a.approved_by))
        .bind(approval.map(|a| a.approved_at))
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Sales order {}", id)))?;

        row.try_into()
    }

    async fn insert_audit(&mut self, entry: &NewAuditEntry) -> AppResult<AuditEntry> {
        let row = sqlx::query_as::<_, AuditRow>(
            r#"
            INSERT INTO audit_logs (user_id, action, details)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, action, details, created_at
            "#,
        )
        .bind(entry.user_id)
        .bind(&entry.action)
        .bind(&entry.details)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row.into())
    }

    async fn commit(self) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
