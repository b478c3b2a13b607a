//! HTTP handlers

pub mod health;
pub mod inventory;
pub mod purchase_orders;
pub mod sales_orders;

pub use health::*;
pub use inventory::*;
pub use purchase_orders::*;
pub use sales_orders::*;

use shared::Pagination;

/// Pagination from optional query parameters
pub(crate) fn page_params(page: Option<u32>, per_page: Option<u32>) -> Pagination {
    let defaults = Pagination::default();
    Pagination {
        page: page.unwrap_or(defaults.page),
        per_page: per_page.unwrap_or(defaults.per_page),
    }
    .normalized()
}
