//! Low-stock threshold registry, reorder suggestions and throttled alerts

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use shared::{
    alert_due, is_low, suggested_reorder_quantity, validate_non_negative, InventoryRecord,
    LowStockThreshold,
};

use crate::config::LedgerConfig;
use crate::error::{AppError, AppResult};
use crate::services::audit;
use crate::store::{LedgerStore, LedgerTx, LowStockRow};

#[derive(Clone)]
pub struct LowStockService<S> {
    store: S,
    ledger: LedgerConfig,
}

#[derive(Debug, Deserialize)]
pub struct SetThresholdInput {
    pub product_id: i64,
    pub warehouse_id: i64,
    pub threshold: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReorderSuggestion {
    pub inventory_id: i64,
    pub product_id: i64,
    pub warehouse_id: i64,
    pub current_quantity: i32,
    pub threshold: i32,
    pub suggested_quantity: i32,
}

impl From<&LowStockRow> for ReorderSuggestion {
    fn from(row: &LowStockRow) -> Self {
        ReorderSuggestion {
            inventory_id: row.record.id,
            product_id: row.record.product_id,
            warehouse_id: row.record.warehouse_id,
            current_quantity: row.record.quantity,
            threshold: row.threshold,
            suggested_quantity: suggested_reorder_quantity(row.record.quantity, row.threshold),
        }
    }
}

impl<S: LedgerStore> LowStockService<S> {
    pub fn new(store: S, ledger: LedgerConfig) -> Self {
        Self { store, ledger }
    }

    /// Upsert the threshold for a (product, warehouse) pair
    pub async fn set_threshold(
        &self,
        actor_id: i64,
        input: SetThresholdInput,
    ) -> AppResult<LowStockThreshold> {
        validate_non_negative("threshold", input.threshold)?;

        let mut tx = self.store.begin().await?;
        if !tx.product_exists(input.product_id).await? {
            return Err(AppError::NotFound(format!("Product {}", input.product_id)));
        }
        if !tx.warehouse_exists(input.warehouse_id).await? {
            return Err(AppError::NotFound(format!("Warehouse {}", input.warehouse_id)));
        }

        let stored = tx
            .upsert_threshold(input.product_id, input.warehouse_id, input.threshold)
            .await?;
        audit::record(
            &mut tx,
            actor_id,
            audit::LOW_STOCK_THRESHOLD_SET,
            json!({
                "product_id": stored.product_id,
                "warehouse_id": stored.warehouse_id,
                "threshold": stored.threshold,
            }),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(
            "Low-stock threshold for product {} in warehouse {} set to {}",
            stored.product_id,
            stored.warehouse_id,
            stored.threshold
        );
        Ok(stored)
    }

    /// Stored threshold, or the configured default
    pub async fn get_threshold(&self, product_id: i64, warehouse_id: i64) -> AppResult<i32> {
        let mut tx = self.store.begin().await?;
        Ok(tx
            .get_threshold(product_id, warehouse_id)
            .await?
            .map(|t| t.threshold)
            .unwrap_or(self.ledger.default_low_stock_threshold))
    }

    pub async fn is_low_stock(&self, record: &InventoryRecord) -> AppResult<bool> {
        let threshold = self
            .get_threshold(record.product_id, record.warehouse_id)
            .await?;
        Ok(is_low(record.quantity, threshold))
    }

    pub async fn mark_alerted(
        &self,
        product_id: i64,
        warehouse_id: i64,
    ) -> AppResult<LowStockThreshold> {
        let mut tx = self.store.begin().await?;
        let entry = tx
            .mark_alerted(
                product_id,
                warehouse_id,
                Utc::now(),
                self.ledger.default_low_stock_threshold,
            )
            .await?;
        tx.commit().await?;
        Ok(entry)
    }

    pub async fn list_low_stock(&self) -> AppResult<Vec<LowStockRow>> {
        let mut tx = self.store.begin().await?;
        tx.list_low_stock(self.ledger.default_low_stock_threshold)
            .await
    }

    pub async fn reorder_suggestions(&self) -> AppResult<Vec<ReorderSuggestion>> {
        let rows = self.list_low_stock().await?;
        Ok(rows.iter().map(ReorderSuggestion::from).collect())
    }

    /// Low records whose pair has not been alerted within the cooldown
    pub async fn due_alerts(&self, now: DateTime<Utc>) -> AppResult<Vec<LowStockRow>> {
        let rows = self.list_low_stock().await?;
        Ok(self.filter_due(rows, now))
    }

    /// Raise every due alert and stamp its pair
    pub async fn check_low_stock(&self, actor_id: i64) -> AppResult<Vec<LowStockRow>> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let rows = tx
            .list_low_stock(self.ledger.default_low_stock_threshold)
            .await?;
        let due = self.filter_due(rows, now);

        let mut alerted = BTreeSet::new();
        for row in &due {
            let record = &row.record;
            tracing::warn!(
                "Low stock: product {} in warehouse {} at {} (threshold {})",
                record.product_id,
                record.warehouse_id,
                record.quantity,
                row.threshold
            );
            if alerted.insert((record.product_id, record.warehouse_id)) {
                tx.mark_alerted(
                    record.product_id,
                    record.warehouse_id,
                    now,
                    self.ledger.default_low_stock_threshold,
                )
                .await?;
            }
        }

        if !due.is_empty() {
            audit::record(
                &mut tx,
                actor_id,
                audit::LOW_STOCK_ALERTED,
                json!({
                    "pairs": alerted
                        .iter()
                        .map(|(p, w)| json!({ "product_id": p, "warehouse_id": w }))
                        .collect::<Vec<_>>(),
                }),
            )
            .await?;
        }
        tx.commit().await?;

        Ok(due)
    }

    fn filter_due(&self, rows: Vec<LowStockRow>, now: DateTime<Utc>) -> Vec<LowStockRow> {
        let cooldown = self.ledger.alert_cooldown();
        rows.into_iter()
            .filter(|row| alert_due(row.alert_sent_at, now, cooldown))
            .collect()
    }
}
