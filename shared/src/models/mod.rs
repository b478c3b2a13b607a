//! Domain models for the parts ledger

mod inventory;
mod line_item;
mod purchase_order;
mod sales_order;
mod status;
mod threshold;

pub use inventory::*;
pub use line_item::*;
pub use purchase_order::*;
pub use sales_order::*;
pub use status::*;
pub use threshold::*;
