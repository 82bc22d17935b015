//! Unified error system for the billing platform
//!
//! - [`ErrorCode`]: standardized u16 error codes grouped by domain
//! - [`AppError`]: rich error type with codes, messages and details
//! - [`AppResult`]: boundary result alias used by HTTP handlers
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 4xxx: Bill lifecycle errors
//! - 5xxx: Checkout / reconciliation errors
//! - 9xxx: System errors

mod codes;
mod types;

pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{AppError, AppResult};
