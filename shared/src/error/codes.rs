//! Unified error codes for the billing platform
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 4xxx: Bill lifecycle errors
//! - 5xxx: Checkout / reconciliation errors
//! - 9xxx: System errors

use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,

    // ==================== 4xxx: Bill lifecycle ====================
    /// Bill not found
    BillNotFound = 4001,
    /// Originating order not found
    OrderNotFound = 4002,
    /// Order is not in a completed state
    OrderNotCompleted = 4003,
    /// Order already has a bill (order→bill is 1:1)
    BillAlreadyIssued = 4004,
    /// Bill is in a terminal state (cancelled/refunded)
    BillTerminal = 4005,
    /// Optimistic-concurrency version mismatch
    VersionConflict = 4006,
    /// State transition not legal for current status
    InvalidStateTransition = 4007,
    /// Monetary amount is invalid
    InvalidAmount = 4008,

    // ==================== 5xxx: Checkout ====================
    /// Checkout token unknown or never staged
    CheckoutNotFound = 5001,
    /// Staged checkout expired before the callback arrived
    CheckoutExpired = 5002,
    /// Gateway-confirmed amount disagrees with the staged amount
    AmountMismatch = 5003,
    /// Gateway reported a non-success result code
    PaymentDeclined = 5004,
    /// Order creation failed during reconciliation
    OrderCreationFailed = 5005,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database/storage error
    DatabaseError = 9002,
    /// Configuration error
    ConfigError = 9003,
}

impl ErrorCode {
    /// Default human-readable message for this code
    pub fn message(&self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Unknown => "Unknown error",
            Self::ValidationFailed => "Validation failed",
            Self::NotFound => "Resource not found",
            Self::AlreadyExists => "Resource already exists",
            Self::InvalidRequest => "Invalid request",
            Self::BillNotFound => "Bill not found",
            Self::OrderNotFound => "Order not found",
            Self::OrderNotCompleted => "Order is not completed",
            Self::BillAlreadyIssued => "Order already has a bill",
            Self::BillTerminal => "Bill is cancelled or refunded",
            Self::VersionConflict => "Bill was modified by another editor",
            Self::InvalidStateTransition => "Operation not legal for current status",
            Self::InvalidAmount => "Invalid amount",
            Self::CheckoutNotFound => "Checkout token unknown or expired",
            Self::CheckoutExpired => "Checkout expired",
            Self::AmountMismatch => "Gateway amount disagrees with staged amount",
            Self::PaymentDeclined => "Payment declined by gateway",
            Self::OrderCreationFailed => "Order creation failed",
            Self::InternalError => "Internal server error",
            Self::DatabaseError => "Database error",
            Self::ConfigError => "Configuration error",
        }
    }

    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Success => StatusCode::OK,

            // 404 Not Found (expired tokens are reported as not-found per the
            // callback contract: the caller restarts checkout from the cart)
            Self::NotFound
            | Self::BillNotFound
            | Self::OrderNotFound
            | Self::CheckoutNotFound
            | Self::CheckoutExpired => StatusCode::NOT_FOUND,

            // 409 Conflict
            Self::AlreadyExists
            | Self::BillAlreadyIssued
            | Self::BillTerminal
            | Self::VersionConflict
            | Self::InvalidStateTransition
            | Self::OrderNotCompleted => StatusCode::CONFLICT,

            // 422 Unprocessable Entity
            Self::AmountMismatch => StatusCode::UNPROCESSABLE_ENTITY,

            // 402 Payment Required
            Self::PaymentDeclined => StatusCode::PAYMENT_REQUIRED,

            // 500 Internal Server Error
            Self::InternalError | Self::DatabaseError | Self::ConfigError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }

            // 400 Bad Request (default for validation/business errors)
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", *self as u16, self.message())
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> Self {
        code as u16
    }
}

/// Error returned when deserializing an unknown u16 error code
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid error code: {0}")]
pub struct InvalidErrorCode(pub u16);

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::Success,
            1 => Self::Unknown,
            2 => Self::ValidationFailed,
            3 => Self::NotFound,
            4 => Self::AlreadyExists,
            5 => Self::InvalidRequest,
            4001 => Self::BillNotFound,
            4002 => Self::OrderNotFound,
            4003 => Self::OrderNotCompleted,
            4004 => Self::BillAlreadyIssued,
            4005 => Self::BillTerminal,
            4006 => Self::VersionConflict,
            4007 => Self::InvalidStateTransition,
            4008 => Self::InvalidAmount,
            5001 => Self::CheckoutNotFound,
            5002 => Self::CheckoutExpired,
            5003 => Self::AmountMismatch,
            5004 => Self::PaymentDeclined,
            5005 => Self::OrderCreationFailed,
            9001 => Self::InternalError,
            9002 => Self::DatabaseError,
            9003 => Self::ConfigError,
            other => return Err(InvalidErrorCode(other)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u16_roundtrip() {
        for code in [
            ErrorCode::Success,
            ErrorCode::VersionConflict,
            ErrorCode::CheckoutExpired,
            ErrorCode::DatabaseError,
        ] {
            let raw: u16 = code.into();
            assert_eq!(ErrorCode::try_from(raw).unwrap(), code);
        }
    }

    #[test]
    fn unknown_code_is_rejected() {
        assert!(ErrorCode::try_from(60_000).is_err());
    }

    #[test]
    fn conflict_maps_to_409() {
        assert_eq!(ErrorCode::VersionConflict.http_status(), StatusCode::CONFLICT);
    }
}
