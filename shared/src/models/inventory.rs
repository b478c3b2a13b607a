//! Inventory record and warehouse models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stock of one product at one warehouse, optionally tagged by batch/serial
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub id: i64,
    pub product_id: i64,
    pub warehouse_id: i64,
    /// Never negative
    pub quantity: i32,
    pub batch_number: Option<String>,
    pub serial_number: Option<String>,
    pub last_updated: DateTime<Utc>,
}

impl InventoryRecord {
    /// Depletion order key: oldest-updated first, id breaks ties
    pub fn fifo_key(&self) -> (DateTime<Utc>, i64) {
        (self.last_updated, self.id)
    }

    /// Whether this record carries the given batch/serial tags
    pub fn matches_tags(&self, batch_number: Option<&str>, serial_number: Option<&str>) -> bool {
        self.batch_number.as_deref() == batch_number && self.serial_number.as_deref() == serial_number
    }
}

/// Sort records into FIFO depletion order
pub fn sort_fifo(records: &mut [InventoryRecord]) {
    records.sort_by_key(InventoryRecord::fifo_key);
}

/// Fields for a record that does not exist yet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInventoryRecord {
    pub product_id: i64,
    pub warehouse_id: i64,
    pub quantity: i32,
    pub batch_number: Option<String>,
    pub serial_number: Option<String>,
}

/// Partial update of an inventory record.
///
/// `None` leaves a field untouched. For the tag fields, `Some(None)` clears
/// the tag and `Some(Some(value))` replaces it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventoryPatch {
    pub quantity: Option<i32>,
    pub batch_number: Option<Option<String>>,
    pub serial_number: Option<Option<String>>,
}

impl InventoryPatch {
    pub fn quantity(quantity: i32) -> Self {
        Self {
            quantity: Some(quantity),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.quantity.is_none() && self.batch_number.is_none() && self.serial_number.is_none()
    }

    /// Apply the patch in place. Does not touch `last_updated`.
    pub fn apply(&self, record: &mut InventoryRecord) {
        if let Some(quantity) = self.quantity {
            record.quantity = quantity;
        }
        if let Some(batch) = &self.batch_number {
            record.batch_number = batch.clone();
        }
        if let Some(serial) = &self.serial_number {
            record.serial_number = serial.clone();
        }
    }
}

/// Filter for inventory listings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryFilter {
    pub warehouse_id: Option<i64>,
    pub low_stock_only: bool,
}

/// A storage location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warehouse {
    pub id: i64,
    pub name: String,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
}
