//! Low-stock threshold model and reorder arithmetic

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Threshold applied to a (product, warehouse) pair with no stored entry
pub const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 10;

/// Per (product, warehouse) reorder trigger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowStockThreshold {
    pub product_id: i64,
    pub warehouse_id: i64,
    pub threshold: i32,
    /// Throttles repeat alerts; only the alerting path writes it
    pub alert_sent_at: Option<DateTime<Utc>>,
}

/// Low when at or below the threshold
pub fn is_low(quantity: i32, threshold: i32) -> bool {
    quantity <= threshold
}

/// Suggested reorder size for a low record
pub fn suggested_reorder_quantity(quantity: i32, threshold: i32) -> i32 {
    if quantity == 0 {
        threshold.saturating_mul(3)
    } else if is_low(quantity, threshold) {
        threshold.saturating_mul(2)
    } else {
        threshold
    }
}

/// Whether a new alert may go out given when the last one was sent
pub fn alert_due(alert_sent_at: Option<DateTime<Utc>>, now: DateTime<Utc>, cooldown: Duration) -> bool {
    match alert_sent_at {
        None => true,
        Some(sent) => now - sent >= cooldown,
    }
}
