//! Wallet-checkout staging and reconciliation shapes

use crate::models::order::OrderDraft;
use crate::money::MinorUnits;
use serde::{Deserialize, Serialize};

/// Server-held draft of an in-flight wallet payment
///
/// Created when the gateway redirect is initiated; consumed (deleted)
/// exactly once by a successful callback; left untouched on failure so the
/// same draft can be retried.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingCheckout {
    pub draft: OrderDraft,
    pub cart_line_ids: Vec<i64>,
    pub amount: MinorUnits,
    pub created_at: i64,
}

/// Returned by `stage`: the client holds only the opaque token
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedCheckout {
    pub token: String,
    pub redirect_url: String,
    pub amount: MinorUnits,
    pub expires_at: i64,
}

/// Durable record of a consumed checkout
///
/// Written in the same transaction that deletes the [`PendingCheckout`];
/// a duplicate callback finds this instead of the pending draft and reports
/// the already-known result without side effects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettledCheckout {
    pub token: String,
    pub order_id: i64,
    pub bill_id: i64,
    pub amount: MinorUnits,
    pub settled_at: i64,
}

/// Gateway callback contract (wire-level, camelCase)
///
/// `resultCode == success-sentinel` triggers the success path; any other
/// value takes the failure path. No other values change behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayCallback {
    pub token: String,
    pub result_code: String,
    pub amount: MinorUnits,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
