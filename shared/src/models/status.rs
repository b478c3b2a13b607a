//! Error type shared by the order status enums

use thiserror::Error;

/// Returned when a status string does not name a known status
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} status '{value}'")]
pub struct ParseStatusError {
    pub kind: &'static str,
    pub value: String,
}
