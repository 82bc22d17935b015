//! Order and cart collaborator shapes
//!
//! The billing server treats order creation and cart mutation as external
//! collaborators; these are the boundary types those contracts exchange.

use crate::models::bill::PaymentMethod;
use crate::money::MinorUnits;
use serde::{Deserialize, Serialize};

/// Order lifecycle status as seen by the billing domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Completed,
    Cancelled,
}

/// Payment state on the order itself (narrower than the bill's)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderPaymentState {
    Unpaid,
    Paid,
}

/// A confirmed order, the 1:1 source of a bill
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub status: OrderStatus,
    pub payment_state: OrderPaymentState,
    pub payment_method: PaymentMethod,
    pub total: MinorUnits,
    pub discount: MinorUnits,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub customer_address: Option<String>,
    pub created_at: i64,
}

/// Serialized order draft staged ahead of a wallet redirect
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDraft {
    pub total: MinorUnits,
    pub discount: MinorUnits,
    pub payment_method: PaymentMethod,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub customer_address: Option<String>,
    pub note: Option<String>,
}

/// A cart line referenced by a staged checkout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    pub id: i64,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: MinorUnits,
}
