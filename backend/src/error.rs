//! Error handling for the inventory ledger
//!
//! Provides consistent error responses in English and Bahasa Indonesia

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use shared::{AllocationError, TransitionError};

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    // Validation errors
    #[error("Validation error: {message}")]
    Validation {
        field: String,
        message: String,
        message_id: String,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Ledger rule errors
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Insufficient stock (available: {available}, requested: {requested})")]
    InsufficientQuantity {
        available: Decimal,
        requested: Decimal,
    },

    #[error("Stock lot is not available: {0}")]
    LotNotAvailable(String),

    #[error("Stock request has no warehouse")]
    MissingWarehouse,

    // Store errors
    #[error("Transaction conflict: {0}")]
    TransactionConflict(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    /// Field-level validation failure
    pub fn validation(field: &str, message: &str, message_id: &str) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.to_string(),
            message_id: message_id.to_string(),
        }
    }

    /// HTTP status this error is surfaced as
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Validation { .. }
            | AppError::ValidationError(_)
            | AppError::InvalidStateTransition(_)
            | AppError::InsufficientQuantity { .. }
            | AppError::LotNotAvailable(_)
            | AppError::MissingWarehouse => StatusCode::BAD_REQUEST,
            AppError::DuplicateEntry(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::TransactionConflict(_)
            | AppError::DatabaseError(_)
            | AppError::Internal(_)
            | AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether retrying the whole unit of work may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::TransactionConflict(_))
    }
}

impl From<TransitionError> for AppError {
    fn from(err: TransitionError) -> Self {
        AppError::InvalidStateTransition(err.to_string())
    }
}

impl From<AllocationError> for AppError {
    fn from(err: AllocationError) -> Self {
        match err {
            AllocationError::NonPositiveQuantity => AppError::validation(
                "quantity",
                "Quantity must be greater than zero",
                "Jumlah harus lebih besar dari nol",
            ),
            AllocationError::LotNotAvailable { .. } => AppError::LotNotAvailable(err.to_string()),
            AllocationError::ExceedsLot {
                available,
                requested,
            }
            | AllocationError::Shortfall {
                available,
                requested,
            } => AppError::InsufficientQuantity {
                available,
                requested,
            },
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field_errors = errors.field_errors();
        let first = field_errors
            .iter()
            .min_by_key(|(field, _)| **field)
            .and_then(|(field, errs)| errs.first().map(|e| (*field, e)));

        match first {
            Some((field, err)) => {
                let message = err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value for {}", field));
                AppError::Validation {
                    field: field.to_string(),
                    message_id: format!("Nilai {} tidak valid", field),
                    message,
                }
            }
            None => AppError::ValidationError(errors.to_string()),
        }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message_en: String,
    pub message_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl AppError {
    fn detail(&self) -> ErrorDetail {
        match self {
            AppError::Unauthorized(msg) => ErrorDetail {
                code: "UNAUTHORIZED".to_string(),
                message_en: msg.clone(),
                message_id: "Tidak memiliki otorisasi".to_string(),
                field: None,
            },
            AppError::Validation {
                field,
                message,
                message_id,
            } => ErrorDetail {
                code: "VALIDATION_ERROR".to_string(),
                message_en: message.clone(),
                message_id: message_id.clone(),
                field: Some(field.clone()),
            },
            AppError::ValidationError(msg) => ErrorDetail {
                code: "VALIDATION_ERROR".to_string(),
                message_en: msg.clone(),
                message_id: format!("Data tidak valid: {}", msg),
                field: None,
            },
            AppError::DuplicateEntry(field) => ErrorDetail {
                code: "DUPLICATE_ENTRY".to_string(),
                message_en: format!("A record with this {} already exists", field),
                message_id: format!("Data dengan {} ini sudah ada", field),
                field: Some(field.clone()),
            },
            AppError::NotFound(resource) => ErrorDetail {
                code: "NOT_FOUND".to_string(),
                message_en: format!("{} not found", resource),
                message_id: format!("{} tidak ditemukan", resource),
                field: None,
            },
            AppError::InvalidStateTransition(msg) => ErrorDetail {
                code: "INVALID_STATE_TRANSITION".to_string(),
                message_en: msg.clone(),
                message_id: format!("Perubahan status tidak diizinkan: {}", msg),
                field: None,
            },
            AppError::InsufficientQuantity {
                available,
                requested,
            } => ErrorDetail {
                code: "INSUFFICIENT_QUANTITY".to_string(),
                message_en: format!(
                    "Insufficient stock (available: {}, requested: {})",
                    available, requested
                ),
                message_id: format!(
                    "Stok tidak mencukupi (tersedia: {}, diminta: {})",
                    available, requested
                ),
                field: Some("quantity".to_string()),
            },
            AppError::LotNotAvailable(msg) => ErrorDetail {
                code: "LOT_NOT_AVAILABLE".to_string(),
                message_en: msg.clone(),
                message_id: "Lot stok tidak tersedia".to_string(),
                field: Some("lot_id".to_string()),
            },
            AppError::MissingWarehouse => ErrorDetail {
                code: "MISSING_WAREHOUSE".to_string(),
                message_en: "Warehouse is required to fulfill a stock request".to_string(),
                message_id: "Gudang wajib diisi untuk memenuhi permintaan stok".to_string(),
                field: Some("warehouse_id".to_string()),
            },
            AppError::TransactionConflict(_) => ErrorDetail {
                code: "TRANSACTION_CONFLICT".to_string(),
                message_en: "The stock ledger is busy; please retry".to_string(),
                message_id: "Buku stok sedang sibuk; silakan coba lagi".to_string(),
                field: None,
            },
            AppError::DatabaseError(_) => ErrorDetail {
                code: "DATABASE_ERROR".to_string(),
                message_en: "A database error occurred".to_string(),
                message_id: "Terjadi kesalahan basis data".to_string(),
                field: None,
            },
            AppError::Internal(msg) => ErrorDetail {
                code: "INTERNAL_ERROR".to_string(),
                message_en: msg.clone(),
                message_id: "Terjadi kesalahan internal server".to_string(),
                field: None,
            },
            AppError::InternalError(_) => ErrorDetail {
                code: "INTERNAL_ERROR".to_string(),
                message_en: "An internal server error occurred".to_string(),
                message_id: "Terjadi kesalahan internal server".to_string(),
                field: None,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_detail = self.detail();

        // Log the error for debugging
        tracing::error!("Error: {:?}", self);

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
