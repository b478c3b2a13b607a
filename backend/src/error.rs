//! Error handling for the parts ledger
//!
//! Every ledger failure maps to one structured JSON body. Store diagnostics
//! are logged, never returned.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use shared::{FieldError, ParseStatusError};

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    // Validation errors
    #[error("Validation error: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Inventory already exists for product {product_id} in warehouse {warehouse_id}")]
    DuplicateCombination { product_id: i64, warehouse_id: i64 },

    // Ledger rule violations
    #[error("Invalid {entity} transition from {from} to {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    #[error("Insufficient inventory for product {product_id}. Available: {available}, Required: {required}")]
    InsufficientStock {
        product_id: i64,
        available: i64,
        required: i64,
    },

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn invalid_transition(
        entity: &'static str,
        from: impl std::fmt::Display,
        to: impl std::fmt::Display,
    ) -> Self {
        AppError::InvalidTransition {
            entity,
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Stable machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::InsufficientPermissions => "INSUFFICIENT_PERMISSIONS",
            AppError::Validation { .. } => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::DuplicateEntry(_) => "DUPLICATE_ENTRY",
            AppError::DuplicateCombination { .. } => "DUPLICATE_COMBINATION",
            AppError::InvalidTransition { .. } => "INVALID_TRANSITION",
            AppError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            AppError::Database(_) => "TRANSACTION_FAILURE",
            AppError::Internal(_) | AppError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::InsufficientPermissions => StatusCode::FORBIDDEN,
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DuplicateEntry(_)
            | AppError::DuplicateCombination { .. }
            | AppError::InvalidTransition { .. } => StatusCode::CONFLICT,
            AppError::InsufficientStock { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Database(_) | AppError::Internal(_) | AppError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Body sent to the caller
    pub fn detail(&self) -> ErrorDetail {
        let mut detail = ErrorDetail {
            code: self.code().to_string(),
            message: self.to_string(),
            field: None,
            product_id: None,
            available: None,
            required: None,
        };

        match self {
            AppError::Validation { field, message } => {
                detail.message = message.clone();
                detail.field = Some(field.clone());
            }
            AppError::NotFound(resource) => {
                detail.message = format!("{} not found", resource);
            }
            AppError::DuplicateCombination { product_id, .. } => {
                detail.product_id = Some(*product_id);
            }
            AppError::InsufficientStock {
                product_id,
                available,
                required,
            } => {
                detail.product_id = Some(*product_id);
                detail.available = Some(*available);
                detail.required = Some(*required);
            }
            AppError::Database(_) => {
                detail.message = "The operation could not be completed and was rolled back".to_string();
            }
            AppError::Internal(_) | AppError::InternalError(_) => {
                detail.message = "An internal server error occurred".to_string();
            }
            _ => {}
        }

        detail
    }
}

impl From<FieldError> for AppError {
    fn from(err: FieldError) -> Self {
        AppError::Validation {
            field: err.field,
            message: err.message,
        }
    }
}

impl From<ParseStatusError> for AppError {
    fn from(err: ParseStatusError) -> Self {
        AppError::Validation {
            field: "status".to_string(),
            message: err.to_string(),
        }
    }
}

/// Error response structure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<i64>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Log the error for debugging
        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        (status, Json(ErrorResponse { error: self.detail() })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_detail() {
        let err = AppError::InsufficientStock {
            product_id: 42,
            available: 15,
            required: 20,
        };
        let detail = err.detail();
        assert_eq!(detail.code, "INSUFFICIENT_STOCK");
        assert_eq!(detail.product_id, Some(42));
        assert_eq!(detail.available, Some(15));
        assert_eq!(detail.required, Some(20));
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_database_error_hides_driver_text() {
        let err = AppError::Database(sqlx::Error::PoolTimedOut);
        let detail = err.detail();
        assert_eq!(detail.code, "TRANSACTION_FAILURE");
        assert!(!detail.message.to_lowercase().contains("pool"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_field_error_conversion() {
        let err: AppError = FieldError::new("items[0].quantity", "bad").into();
        let detail = err.detail();
        assert_eq!(detail.field.as_deref(), Some("items[0].quantity"));
        assert_eq!(detail.message, "bad");
    }

    #[test]
    fn test_transition_conflict() {
        let err = AppError::invalid_transition("purchase order", "approved", "approved");
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.code(), "INVALID_TRANSITION");
    }

    #[test]
    fn test_detail_serialization_omits_empty_fields() {
        let body = serde_json::to_value(ErrorResponse {
            error: AppError::NotFound("Sales order 9".into()).detail(),
        })
        .unwrap();
        assert_eq!(body["error"]["message"], "Sales order 9 not found");
        assert!(body["error"].get("product_id").is_none());
    }
}
