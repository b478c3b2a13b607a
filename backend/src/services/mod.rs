//! Ledger services

pub mod audit;
pub mod fulfillment;
pub mod inventory;
pub mod low_stock;
pub mod purchase_order;
pub mod sales_order;

pub use inventory::InventoryService;
pub use low_stock::LowStockService;
pub use purchase_order::PurchaseOrderService;
pub use sales_order::SalesOrderService;
