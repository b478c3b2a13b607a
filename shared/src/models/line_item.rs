//! Order line-item input shared by purchase and sales orders

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Prices and totals are stored as NUMERIC(12,2)
pub const AMOUNT_INTEGER_DIGITS: u32 = 10;

/// Smallest amount that no longer fits the money columns
pub fn amount_limit() -> Decimal {
    Decimal::from(10i64.pow(AMOUNT_INTEGER_DIGITS))
}

/// A requested line on a new order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemInput {
    pub product_id: i64,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl LineItemInput {
    /// quantity x unit_price, `None` on overflow
    pub fn line_total(&self) -> Option<Decimal> {
        Decimal::from(self.quantity).checked_mul(self.unit_price)
    }
}

/// Order total: sum of quantity x unit_price over all lines. `None` when
/// the arithmetic overflows.
pub fn order_total(items: &[LineItemInput]) -> Option<Decimal> {
    items
        .iter()
        .try_fold(Decimal::ZERO, |total, item| total.checked_add(item.line_total()?))
}
