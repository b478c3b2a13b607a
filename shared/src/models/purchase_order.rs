//! Purchase order, receipt and their line-item models

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ParseStatusError;

/// Lifecycle of a supplier order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseOrderStatus {
    Pending,
    Approved,
    Sent,
    Received,
    Completed,
    Cancelled,
}

impl PurchaseOrderStatus {
    pub const ALL: [PurchaseOrderStatus; 6] = [
        PurchaseOrderStatus::Pending,
        PurchaseOrderStatus::Approved,
        PurchaseOrderStatus::Sent,
        PurchaseOrderStatus::Received,
        PurchaseOrderStatus::Completed,
        PurchaseOrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseOrderStatus::Pending => "pending",
            PurchaseOrderStatus::Approved => "approved",
            PurchaseOrderStatus::Sent => "sent",
            PurchaseOrderStatus::Received => "received",
            PurchaseOrderStatus::Completed => "completed",
            PurchaseOrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PurchaseOrderStatus::Completed | PurchaseOrderStatus::Cancelled
        )
    }

    /// Whether goods may be received against an order in this status
    pub fn is_receivable(&self) -> bool {
        matches!(self, PurchaseOrderStatus::Approved | PurchaseOrderStatus::Sent)
    }

    /// Edges of the purchase order state machine
    pub fn can_transition_to(&self, next: PurchaseOrderStatus) -> bool {
        use PurchaseOrderStatus::*;

        if next == Cancelled {
            return !self.is_terminal();
        }
        matches!(
            (self, next),
            (Pending, Approved)
                | (Approved, Sent)
                | (Approved, Received)
                | (Sent, Received)
                | (Received, Completed)
        )
    }

    /// Whether a plain status update may set this status. Approval and
    /// receiving have their own operations with side effects.
    pub fn is_administrative(&self) -> bool {
        matches!(
            self,
            PurchaseOrderStatus::Sent
                | PurchaseOrderStatus::Completed
                | PurchaseOrderStatus::Cancelled
        )
    }
}

impl std::fmt::Display for PurchaseOrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PurchaseOrderStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PurchaseOrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseStatusError {
                kind: "purchase order",
                value: s.to_string(),
            })
    }
}

/// A commitment to buy from a supplier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub id: i64,
    pub supplier_id: i64,
    pub status: PurchaseOrderStatus,
    /// Fixed at creation from the line items
    pub total_amount: Decimal,
    pub approved_by: Option<i64>,
    pub approved_at: Option<DateTime<Utc>>,
    pub order_date: DateTime<Utc>,
}

/// Immutable purchase order line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderItem {
    pub id: i64,
    pub purchase_order_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// A physical receiving event against a purchase order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub id: i64,
    pub purchase_order_id: i64,
    pub warehouse_id: i64,
    pub received_by: i64,
    pub received_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptItem {
    pub id: i64,
    pub receipt_id: i64,
    pub product_id: i64,
    pub quantity_received: i32,
    pub batch_number: Option<String>,
    pub serial_number: Option<String>,
}

/// One line of a receiving request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveItemInput {
    pub product_id: i64,
    pub quantity_received: i32,
    #[serde(default)]
    pub batch_number: Option<String>,
    #[serde(default)]
    pub serial_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptWithItems {
    pub receipt: Receipt,
    pub items: Vec<ReceiptItem>,
}

/// Purchase order with its lines and receipts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseOrderDetail {
    pub purchase_order: PurchaseOrder,
    pub items: Vec<PurchaseOrderItem>,
    pub receipts: Vec<ReceiptWithItems>,
}

/// Filter for purchase order listings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PurchaseOrderFilter {
    pub status: Option<PurchaseOrderStatus>,
    pub supplier_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use PurchaseOrderStatus::*;

    #[test]
    fn test_round_trip_strings() {
        for status in PurchaseOrderStatus::ALL {
            assert_eq!(status.as_str().parse::<PurchaseOrderStatus>(), Ok(status));
        }
    }

    #[test]
    fn test_unknown_status_rejected() {
        let err = "shipped".parse::<PurchaseOrderStatus>().unwrap_err();
        assert_eq!(err.value, "shipped");
    }

    #[test]
    fn test_approve_only_from_pending() {
        assert!(Pending.can_transition_to(Approved));
        for from in [Approved, Sent, Received, Completed, Cancelled] {
            assert!(!from.can_transition_to(Approved), "{from} -> approved");
        }
    }

    #[test]
    fn test_receive_from_approved_or_sent() {
        assert!(Approved.can_transition_to(Received));
        assert!(Sent.can_transition_to(Received));
        assert!(!Pending.can_transition_to(Received));
        assert!(Approved.is_receivable() && Sent.is_receivable());
        assert!(!Received.is_receivable());
    }

    #[test]
    fn test_cancel_from_any_non_terminal() {
        for from in [Pending, Approved, Sent, Received] {
            assert!(from.can_transition_to(Cancelled));
        }
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Cancelled));
    }

    #[test]
    fn test_no_backward_edges() {
        assert!(!Received.can_transition_to(Sent));
        assert!(!Sent.can_transition_to(Pending));
        assert!(!Completed.can_transition_to(Received));
    }
}
