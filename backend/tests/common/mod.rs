//! Shared fixture for ledger integration tests

#![allow(dead_code)]

use std::str::FromStr;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use parts_ledger::config::LedgerConfig;
use parts_ledger::services::purchase_order::UpdateStatusInput;
use parts_ledger::services::sales_order::CreateSalesOrderInput;
use parts_ledger::services::{
    InventoryService, LowStockService, PurchaseOrderService, SalesOrderService,
};
use parts_ledger::store::MemoryLedgerStore;
use shared::{InventoryRecord, LineItemInput, NewInventoryRecord};

pub const WAREHOUSE_A: i64 = 1;
pub const WAREHOUSE_B: i64 = 2;
pub const SUPPLIER: i64 = 100;
pub const CUSTOMER: i64 = 200;
pub const ACTOR: i64 = 9;

pub const PRODUCTS: [i64; 5] = [1, 2, 3, 7, 42];

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn line(product_id: i64, quantity: i32, unit_price: &str) -> LineItemInput {
    LineItemInput {
        product_id,
        quantity,
        unit_price: dec(unit_price),
    }
}

pub fn status(s: &str) -> UpdateStatusInput {
    UpdateStatusInput {
        status: s.to_string(),
    }
}

/// Memory-backed ledger seeded with two warehouses, one supplier, one
/// customer and the products in [`PRODUCTS`]
pub struct Ledger {
    pub store: MemoryLedgerStore,
}

impl Ledger {
    pub async fn new() -> Self {
        let store = MemoryLedgerStore::new();
        store.add_warehouse(WAREHOUSE_A, "Main").await;
        store.add_warehouse(WAREHOUSE_B, "Overflow").await;
        store.add_supplier(SUPPLIER).await;
        store.add_customer(CUSTOMER).await;
        for product in PRODUCTS {
            store.add_product(product).await;
        }
        Self { store }
    }

    pub fn inventory(&self) -> InventoryService<MemoryLedgerStore> {
        InventoryService::new(self.store.clone(), LedgerConfig::default())
    }

    pub fn low_stock(&self) -> LowStockService<MemoryLedgerStore> {
        LowStockService::new(self.store.clone(), LedgerConfig::default())
    }

    pub fn purchase_orders(&self) -> PurchaseOrderService<MemoryLedgerStore> {
        PurchaseOrderService::new(self.store.clone())
    }

    pub fn sales_orders(&self) -> SalesOrderService<MemoryLedgerStore> {
        SalesOrderService::new(self.store.clone())
    }

    /// Seed an untagged record last updated `minutes_ago`
    pub async fn seed(
        &self,
        product_id: i64,
        warehouse_id: i64,
        quantity: i32,
        minutes_ago: i64,
    ) -> InventoryRecord {
        self.store
            .seed_inventory(
                NewInventoryRecord {
                    product_id,
                    warehouse_id,
                    quantity,
                    batch_number: None,
                    serial_number: None,
                },
                Utc::now() - Duration::minutes(minutes_ago),
            )
            .await
    }

    pub async fn record(&self, id: i64) -> InventoryRecord {
        self.store
            .inventory()
            .await
            .into_iter()
            .find(|r| r.id == id)
            .unwrap()
    }

    pub async fn total(&self, product_id: i64) -> i64 {
        self.inventory().get_available(product_id).await.unwrap()
    }

    /// Create and approve a sales order
    pub async fn confirmed_order(&self, lines: &[(i64, i32)]) -> i64 {
        let service = self.sales_orders();
        let order = service
            .create(
                ACTOR,
                CreateSalesOrderInput {
                    customer_id: CUSTOMER,
                    items: lines.iter().map(|&(p, q)| line(p, q, "5.00")).collect(),
                },
            )
            .await
            .unwrap();
        let id = order.sales_order.id;
        service.approve(ACTOR, id).await.unwrap();
        id
    }

    /// Drive a stocked order through fulfillment to the given status
    pub async fn order_in_status(&self, lines: &[(i64, i32)], target: &str) -> i64 {
        let id = self.confirmed_order(lines).await;
        let service = self.sales_orders();
        service.process(ACTOR, id).await.unwrap();
        for step in ["shipped", "delivered", "completed"] {
            service.update_status(ACTOR, id, status(step)).await.unwrap();
            if step == target {
                break;
            }
        }
        id
    }
}
