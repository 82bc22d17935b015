//! Shared types for the billing platform
//!
//! Wire models, money arithmetic and the unified error system used by
//! `billing-server` and its clients:
//!
//! - **models**: bill, audit, order and checkout shapes
//! - **money**: fixed-point minor-unit arithmetic (no floating point)
//! - **error**: unified error codes with HTTP mapping

pub mod error;
pub mod models;
pub mod money;
pub mod util;

pub use error::{AppError, AppResult, ErrorCode};
