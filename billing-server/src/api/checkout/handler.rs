//! Checkout API handlers

use axum::{Json, extract::State};
use serde::Deserialize;
use validator::Validate;

use crate::checkout::ReconcileOutcome;
use crate::state::ServerState;
use shared::error::{AppError, AppResult};
use shared::models::{GatewayCallback, OrderDraft, PaymentMethod, StagedCheckout};
use shared::money::MinorUnits;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StageCheckoutRequest {
    /// Order subtotal in minor units
    #[validate(range(min = 1))]
    pub total: MinorUnits,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub discount: MinorUnits,
    #[serde(default)]
    pub cart_line_ids: Vec<i64>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    #[validate(email)]
    pub customer_email: Option<String>,
    pub customer_address: Option<String>,
    pub note: Option<String>,
    /// Earlier staging of the same cart to discard
    pub prior_token: Option<String>,
}

/// Stage an order draft ahead of the gateway redirect
pub async fn stage(
    State(state): State<ServerState>,
    Json(payload): Json<StageCheckoutRequest>,
) -> AppResult<Json<StagedCheckout>> {
    payload
        .validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let draft = OrderDraft {
        total: payload.total,
        discount: payload.discount,
        payment_method: PaymentMethod::Wallet,
        customer_name: payload.customer_name,
        customer_phone: payload.customer_phone,
        customer_email: payload.customer_email,
        customer_address: payload.customer_address,
        note: payload.note,
    };
    let staged = state
        .reconciler
        .stage(draft, payload.cart_line_ids, payload.prior_token)
        .map_err(AppError::from)?;
    Ok(Json(staged))
}

/// Gateway payment-result callback
///
/// A decline reconciles successfully (200 with a `DECLINED` body); only
/// unknown tokens, expiry and amount mismatches surface as errors.
pub async fn callback(
    State(state): State<ServerState>,
    Json(payload): Json<GatewayCallback>,
) -> AppResult<Json<ReconcileOutcome>> {
    let outcome = state
        .reconciler
        .reconcile(&payload)
        .await
        .map_err(AppError::from)?;
    Ok(Json(outcome))
}
