use crate::storage::StorageError;
use shared::error::{AppError, ErrorCode};
use thiserror::Error;

/// Bill lifecycle errors
#[derive(Debug, Error)]
pub enum BillError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Bill not found: {0}")]
    BillNotFound(i64),

    #[error("Order not found: {0}")]
    OrderNotFound(i64),

    #[error("Order {0} is not completed")]
    OrderNotCompleted(i64),

    #[error("Order {order_id} already has bill {bill_id}")]
    AlreadyIssued { order_id: i64, bill_id: i64 },

    #[error("Bill {0} is cancelled or refunded")]
    Terminal(i64),

    #[error("No audit entry for bill {bill_id} version {version}")]
    AuditEntryNotFound { bill_id: i64, version: u64 },

    #[error("Version conflict: expected {expected}, actual {actual}")]
    VersionConflict { expected: u64, actual: u64 },

    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Validation failed: {0}")]
    Validation(String),
}

pub type BillResult<T> = Result<T, BillError>;

impl From<BillError> for AppError {
    fn from(err: BillError) -> Self {
        match err {
            BillError::Storage(e) => {
                tracing::error!(error = %e, "Storage error in bill operation");
                AppError::with_message(ErrorCode::DatabaseError, e.to_string())
            }
            BillError::BillNotFound(id) => {
                AppError::with_message(ErrorCode::BillNotFound, format!("Bill not found: {}", id))
            }
            BillError::OrderNotFound(id) => AppError::with_message(
                ErrorCode::OrderNotFound,
                format!("Order not found: {}", id),
            ),
            BillError::OrderNotCompleted(id) => AppError::with_message(
                ErrorCode::OrderNotCompleted,
                format!("Order {} is not completed", id),
            ),
            BillError::AlreadyIssued { order_id, bill_id } => AppError::with_message(
                ErrorCode::BillAlreadyIssued,
                format!("Order {} already has bill {}", order_id, bill_id),
            )
            .with_detail("billId", bill_id),
            BillError::AuditEntryNotFound { bill_id, version } => AppError::with_message(
                ErrorCode::NotFound,
                format!("No audit entry for bill {} version {}", bill_id, version),
            ),
            BillError::Terminal(id) => AppError::with_message(
                ErrorCode::BillTerminal,
                format!("Bill {} is cancelled or refunded", id),
            ),
            BillError::VersionConflict { expected, actual } => AppError::with_message(
                ErrorCode::VersionConflict,
                format!("Version conflict: expected {}, actual {}", expected, actual),
            )
            .with_detail("expectedVersion", expected)
            .with_detail("actualVersion", actual),
            BillError::InvalidTransition(msg) => {
                AppError::with_message(ErrorCode::InvalidStateTransition, msg)
            }
            BillError::InvalidAmount(msg) => {
                AppError::with_message(ErrorCode::InvalidAmount, msg)
            }
            BillError::Validation(msg) => AppError::validation(msg),
        }
    }
}
