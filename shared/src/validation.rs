//! Input validation for ledger operations
//!
//! Every check runs before any store access, so a failing request never
//! mutates state.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{amount_limit, order_total, LineItemInput, ReceiveItemInput, ReturnItemInput};

/// A rejected input field
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct FieldError {
    /// Path of the offending field, e.g. `items[2].quantity`
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate the lines of a new purchase or sales order
pub fn validate_line_items(items: &[LineItemInput]) -> Result<(), FieldError> {
    if items.is_empty() {
        return Err(FieldError::new("items", "Items must not be empty"));
    }
    for (i, item) in items.iter().enumerate() {
        if item.quantity <= 0 {
            return Err(FieldError::new(
                format!("items[{i}].quantity"),
                "Quantity must be a positive integer",
            ));
        }
        if item.unit_price < Decimal::ZERO {
            return Err(FieldError::new(
                format!("items[{i}].unit_price"),
                "Unit price must not be negative",
            ));
        }
        // NUMERIC(12,2) on the way in
        if item.unit_price.scale() > 2 {
            return Err(FieldError::new(
                format!("items[{i}].unit_price"),
                "Unit price must have at most 2 decimal places",
            ));
        }
        if item.unit_price >= amount_limit() {
            return Err(FieldError::new(
                format!("items[{i}].unit_price"),
                "Unit price exceeds the maximum amount",
            ));
        }
    }
    validate_order_total(items).map(|_| ())
}

/// Order total, rejected when it overflows or does not fit the money columns
pub fn validate_order_total(items: &[LineItemInput]) -> Result<Decimal, FieldError> {
    match order_total(items) {
        Some(total) if total < amount_limit() => Ok(total),
        _ => Err(FieldError::new(
            "items",
            "Order total exceeds the maximum amount",
        )),
    }
}

/// Validate the lines of a receiving request. Zero-quantity lines are allowed
/// and skipped by the ledger.
pub fn validate_receive_items(items: &[ReceiveItemInput]) -> Result<(), FieldError> {
    if items.is_empty() {
        return Err(FieldError::new("items", "Items must not be empty"));
    }
    for (i, item) in items.iter().enumerate() {
        if item.quantity_received < 0 {
            return Err(FieldError::new(
                format!("items[{i}].quantity_received"),
                "Quantity received must be a non-negative integer",
            ));
        }
    }
    Ok(())
}

/// Validate the lines of a return or exchange
pub fn validate_return_items(items: &[ReturnItemInput]) -> Result<(), FieldError> {
    if items.is_empty() {
        return Err(FieldError::new("items", "Items must not be empty"));
    }
    for (i, item) in items.iter().enumerate() {
        if item.quantity <= 0 {
            return Err(FieldError::new(
                format!("items[{i}].quantity"),
                "Quantity must be a positive integer",
            ));
        }
    }
    Ok(())
}

/// Stock quantities and thresholds may be zero but never negative
pub fn validate_non_negative(field: &str, value: i32) -> Result<(), FieldError> {
    if value < 0 {
        return Err(FieldError::new(field, "Must be a non-negative integer"));
    }
    Ok(())
}

/// Free-text fields that must carry something
pub fn validate_required_text(field: &str, value: &str) -> Result<(), FieldError> {
    if value.trim().is_empty() {
        return Err(FieldError::new(field, "Must not be blank"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn line(quantity: i32, price: &str) -> LineItemInput {
        LineItemInput {
            product_id: 1,
            quantity,
            unit_price: Decimal::from_str(price).unwrap(),
        }
    }

    #[test]
    fn test_empty_items_rejected() {
        let err = validate_line_items(&[]).unwrap_err();
        assert_eq!(err.field, "items");
    }

    #[test]
    fn test_zero_quantity_names_index() {
        let err = validate_line_items(&[line(1, "2.00"), line(0, "2.00")]).unwrap_err();
        assert_eq!(err.field, "items[1].quantity");
    }

    #[test]
    fn test_negative_price_rejected() {
        let err = validate_line_items(&[line(1, "-0.01")]).unwrap_err();
        assert_eq!(err.field, "items[0].unit_price");
    }

    #[test]
    fn test_free_line_allowed() {
        assert!(validate_line_items(&[line(3, "0")]).is_ok());
    }

    #[test]
    fn test_three_decimal_price_rejected() {
        assert!(validate_line_items(&[line(1, "1.005")]).is_err());
    }

    #[test]
    fn test_order_total() {
        let items = [line(2, "12.50"), line(3, "1.10")];
        assert_eq!(order_total(&items), Some(Decimal::from_str("28.30").unwrap()));
        assert_eq!(
            validate_order_total(&items).unwrap(),
            Decimal::from_str("28.30").unwrap()
        );
    }

    #[test]
    fn test_price_beyond_money_column_rejected() {
        let err = validate_line_items(&[line(1, "10000000000.00")]).unwrap_err();
        assert_eq!(err.field, "items[0].unit_price");
        assert!(validate_line_items(&[line(1, "9999999999.99")]).is_ok());
    }

    #[test]
    fn test_overflowing_total_rejected_without_panic() {
        let items = [line(i32::MAX, "79000000000000000000.00")];
        assert_eq!(order_total(&items), None);

        let err = validate_line_items(&[line(i32::MAX, "9999999999.99")]).unwrap_err();
        assert_eq!(err.field, "items");
    }

    #[test]
    fn test_total_at_limit_rejected() {
        let err = validate_line_items(&[line(2, "5000000000.00")]).unwrap_err();
        assert_eq!(err.field, "items");
        assert!(validate_line_items(&[line(1, "5000000000.00"), line(1, "4999999999.99")]).is_ok());
    }

    #[test]
    fn test_receive_allows_zero() {
        let items = [ReceiveItemInput {
            product_id: 1,
            quantity_received: 0,
            batch_number: None,
            serial_number: None,
        }];
        assert!(validate_receive_items(&items).is_ok());
    }

    #[test]
    fn test_receive_rejects_negative() {
        let items = [ReceiveItemInput {
            product_id: 1,
            quantity_received: -1,
            batch_number: None,
            serial_number: None,
        }];
        assert_eq!(
            validate_receive_items(&items).unwrap_err().field,
            "items[0].quantity_received"
        );
    }

    #[test]
    fn test_return_rejects_zero() {
        let items = [ReturnItemInput { product_id: 7, quantity: 0 }];
        assert!(validate_return_items(&items).is_err());
    }

    #[test]
    fn test_required_text() {
        assert!(validate_required_text("reason", "   ").is_err());
        assert!(validate_required_text("reason", "damaged").is_ok());
    }
}
