//! Fulfillment engine: all-or-nothing FIFO depletion for a sales order
//!
//! Demand is aggregated per product. Rows are locked product by product in
//! ascending product_id order, then checked against the demand in the
//! order each product first appears on the order, so the reported
//! shortfall is the first short line. No row is touched until every
//! product has passed, and concurrent fulfillments over the same products
//! cannot both pass the check on stale totals.
//!
//! The locks come from the store: `FOR UPDATE` in Postgres, the single
//! state mutex in the memory store.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use shared::{InventoryRecord, SalesOrderItem};

use crate::error::{AppError, AppResult};
use crate::services::inventory;
use crate::store::LedgerTx;

/// Units taken from one inventory record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Depletion {
    pub record_id: i64,
    pub product_id: i64,
    pub quantity: i32,
}

/// Total requested quantity per product
pub fn demand_by_product(items: &[SalesOrderItem]) -> BTreeMap<i64, i64> {
    let mut demand = BTreeMap::new();
    for item in items {
        *demand.entry(item.product_id).or_insert(0) += i64::from(item.quantity);
    }
    demand
}

/// Walk `records` (already in FIFO order) taking `min(remaining, quantity)`
/// from each until `required` is covered. `None` when the records hold
/// less than `required` in total.
pub fn plan_depletion(records: &[InventoryRecord], required: i64) -> Option<Vec<Depletion>> {
    let available: i64 = records.iter().map(|r| i64::from(r.quantity)).sum();
    if available < required {
        return None;
    }

    let mut remaining = required;
    let mut plan = Vec::new();
    for record in records {
        if remaining <= 0 {
            break;
        }
        if record.quantity <= 0 {
            continue;
        }
        let take = remaining.min(i64::from(record.quantity));
        plan.push(Depletion {
            record_id: record.id,
            product_id: record.product_id,
            // bounded by record.quantity
            quantity: take as i32,
        });
        remaining -= take;
    }
    Some(plan)
}

/// Distinct products in the order they first appear on the order
pub fn products_in_item_order(items: &[SalesOrderItem]) -> Vec<i64> {
    let mut seen = BTreeSet::new();
    items
        .iter()
        .map(|item| item.product_id)
        .filter(|product_id| seen.insert(*product_id))
        .collect()
}

/// Deplete stock for every line item or fail without changing anything
/// the caller goes on to commit.
pub async fn fulfill<T: LedgerTx>(tx: &mut T, items: &[SalesOrderItem]) -> AppResult<Vec<Depletion>> {
    let demand = demand_by_product(items);

    // Phase 1: lock every product, ascending
    let mut locked = BTreeMap::new();
    for &product_id in demand.keys() {
        let records = tx.lock_inventory_for_product(product_id).await?;
        locked.insert(product_id, records);
    }

    // Check in line order; the first short line is the one reported
    let mut plans = Vec::with_capacity(demand.len());
    for product_id in products_in_item_order(items) {
        let required = demand.get(&product_id).copied().unwrap_or(0);
        let records = locked.get(&product_id).map(Vec::as_slice).unwrap_or(&[]);
        let plan = plan_depletion(records, required).ok_or_else(|| {
            AppError::InsufficientStock {
                product_id,
                available: records.iter().map(|r| i64::from(r.quantity)).sum(),
                required,
            }
        })?;
        plans.push(plan);
    }

    // Phase 2: apply
    let mut applied = Vec::new();
    for depletion in plans.into_iter().flatten() {
        let record = inventory::decrement(&mut *tx, depletion.record_id, depletion.quantity).await?;
        tracing::debug!(
            "Depleted {} of product {} from inventory record {} ({} left)",
            depletion.quantity,
            depletion.product_id,
            depletion.record_id,
            record.quantity
        );
        applied.push(depletion);
    }

    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    fn record(id: i64, quantity: i32) -> InventoryRecord {
        InventoryRecord {
            id,
            product_id: 42,
            warehouse_id: id,
            quantity,
            batch_number: None,
            serial_number: None,
            last_updated: Utc.timestamp_opt(1_700_000_000 + id, 0).unwrap(),
        }
    }

    fn item(product_id: i64, quantity: i32) -> SalesOrderItem {
        SalesOrderItem {
            id: 0,
            sales_order_id: 1,
            product_id,
            quantity,
            unit_price: Decimal::ONE,
        }
    }

    #[test]
    fn test_oldest_record_drained_first() {
        let plan = plan_depletion(&[record(1, 10), record(2, 5)], 12).unwrap();
        assert_eq!(
            plan,
            vec![
                Depletion { record_id: 1, product_id: 42, quantity: 10 },
                Depletion { record_id: 2, product_id: 42, quantity: 2 },
            ]
        );
    }

    #[test]
    fn test_partial_from_first_record_only() {
        let plan = plan_depletion(&[record(1, 10), record(2, 5)], 4).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].quantity, 4);
    }

    #[test]
    fn test_shortfall_yields_no_plan() {
        assert!(plan_depletion(&[record(1, 10), record(2, 5)], 20).is_none());
    }

    #[test]
    fn test_empty_records_skipped() {
        let plan = plan_depletion(&[record(1, 0), record(2, 3)], 3).unwrap();
        assert_eq!(plan, vec![Depletion { record_id: 2, product_id: 42, quantity: 3 }]);
    }

    #[test]
    fn test_products_keep_first_appearance_order() {
        let order = products_in_item_order(&[item(42, 1), item(3, 1), item(42, 2), item(7, 1)]);
        assert_eq!(order, vec![42, 3, 7]);
    }

    #[test]
    fn test_demand_aggregates_repeated_products() {
        let demand = demand_by_product(&[item(7, 2), item(3, 1), item(7, 4)]);
        assert_eq!(demand.into_iter().collect::<Vec<_>>(), vec![(3, 1), (7, 6)]);
    }

    proptest! {
        #[test]
        fn prop_plan_covers_exactly_required(
            quantities in prop::collection::vec(0i32..50, 1..8),
            required in 0i64..400,
        ) {
            let records: Vec<_> = quantities
                .iter()
                .enumerate()
                .map(|(i, &q)| record(i as i64 + 1, q))
                .collect();
            let available: i64 = quantities.iter().map(|&q| i64::from(q)).sum();

            match plan_depletion(&records, required) {
                None => prop_assert!(available < required),
                Some(plan) => {
                    let taken: i64 = plan.iter().map(|d| i64::from(d.quantity)).sum();
                    prop_assert_eq!(taken, required);
                }
            }
        }

        #[test]
        fn prop_never_takes_more_than_a_record_holds(
            quantities in prop::collection::vec(0i32..50, 1..8),
            required in 0i64..400,
        ) {
            let records: Vec<_> = quantities
                .iter()
                .enumerate()
                .map(|(i, &q)| record(i as i64 + 1, q))
                .collect();
            if let Some(plan) = plan_depletion(&records, required) {
                for d in plan {
                    let held = records.iter().find(|r| r.id == d.record_id).unwrap().quantity;
                    prop_assert!(d.quantity > 0 && d.quantity <= held);
                }
            }
        }

        #[test]
        fn prop_only_last_touched_record_left_partial(
            quantities in prop::collection::vec(1i32..50, 1..8),
            required in 1i64..400,
        ) {
            let records: Vec<_> = quantities
                .iter()
                .enumerate()
                .map(|(i, &q)| record(i as i64 + 1, q))
                .collect();
            if let Some(plan) = plan_depletion(&records, required) {
                // Touched records are a FIFO prefix, all but the last drained
                for (i, d) in plan.iter().enumerate() {
                    prop_assert_eq!(d.record_id, records[i].id);
                    if i + 1 < plan.len() {
                        prop_assert_eq!(d.quantity, records[i].quantity);
                    }
                }
            }
        }
    }
}
