//! Sales order and return models

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ParseStatusError;

/// Lifecycle of a customer order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SalesOrderStatus {
    Quotation,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Completed,
    Cancelled,
}

impl SalesOrderStatus {
    pub const ALL: [SalesOrderStatus; 7] = [
        SalesOrderStatus::Quotation,
        SalesOrderStatus::Confirmed,
        SalesOrderStatus::Processing,
        SalesOrderStatus::Shipped,
        SalesOrderStatus::Delivered,
        SalesOrderStatus::Completed,
        SalesOrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SalesOrderStatus::Quotation => "quotation",
            SalesOrderStatus::Confirmed => "confirmed",
            SalesOrderStatus::Processing => "processing",
            SalesOrderStatus::Shipped => "shipped",
            SalesOrderStatus::Delivered => "delivered",
            SalesOrderStatus::Completed => "completed",
            SalesOrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SalesOrderStatus::Completed | SalesOrderStatus::Cancelled)
    }

    /// Whether goods may come back from an order in this status
    pub fn accepts_returns(&self) -> bool {
        matches!(self, SalesOrderStatus::Delivered | SalesOrderStatus::Completed)
    }

    /// Edges of the sales order state machine
    pub fn can_transition_to(&self, next: SalesOrderStatus) -> bool {
        use SalesOrderStatus::*;

        if next == Cancelled {
            return !self.is_terminal();
        }
        matches!(
            (self, next),
            (Quotation, Confirmed)
                | (Confirmed, Processing)
                | (Processing, Shipped)
                | (Shipped, Delivered)
                | (Delivered, Completed)
        )
    }

    /// Whether a plain status update may set this status. Confirmation and
    /// processing have their own operations.
    pub fn is_administrative(&self) -> bool {
        matches!(
            self,
            SalesOrderStatus::Shipped
                | SalesOrderStatus::Delivered
                | SalesOrderStatus::Completed
                | SalesOrderStatus::Cancelled
        )
    }
}

impl std::fmt::Display for SalesOrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SalesOrderStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SalesOrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseStatusError {
                kind: "sales order",
                value: s.to_string(),
            })
    }
}

/// A commitment to sell to a customer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesOrder {
    pub id: i64,
    pub customer_id: i64,
    pub status: SalesOrderStatus,
    pub total_amount: Decimal,
    pub approved_by: Option<i64>,
    pub approved_at: Option<DateTime<Utc>>,
    pub order_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesOrderItem {
    pub id: i64,
    pub sales_order_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesOrderDetail {
    pub sales_order: SalesOrder,
    pub items: Vec<SalesOrderItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SalesOrderFilter {
    pub status: Option<SalesOrderStatus>,
    pub customer_id: Option<i64>,
}

/// Kind of reversal against a delivered order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnType {
    Return,
    Exchange,
}

impl ReturnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnType::Return => "return",
            ReturnType::Exchange => "exchange",
        }
    }
}

/// One line of a return request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnItemInput {
    pub product_id: i64,
    pub quantity: i32,
}
