//! Bill API handlers

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use validator::Validate;

use crate::state::ServerState;
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{
    Bill, BillAuditEntry, BillChanges, PaymentMethod, StaffIdentity,
};
use shared::money::MinorUnits;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct IssueBillRequest {
    pub order_id: i64,
    pub staff_id: i64,
    #[validate(length(min = 1, max = 100))]
    pub staff_name: String,
}

/// Issue a bill for a completed order
pub async fn issue(
    State(state): State<ServerState>,
    Json(payload): Json<IssueBillRequest>,
) -> AppResult<Json<Bill>> {
    payload
        .validate()
        .map_err(|e| AppError::validation(e.to_string()))?;
    let order = state
        .orders
        .get_order(payload.order_id)
        .await?
        .ok_or_else(|| {
            AppError::with_message(
                ErrorCode::OrderNotFound,
                format!("Order not found: {}", payload.order_id),
            )
        })?;
    let staff = StaffIdentity {
        id: payload.staff_id,
        name: payload.staff_name,
    };
    let bill = state
        .bills
        .issue(&order, &state.branch, &staff)
        .map_err(AppError::from)?;
    Ok(Json(bill))
}

/// Current bill state
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Bill>> {
    let bill = state.bills.get(id).map_err(AppError::from)?;
    Ok(Json(bill))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EditBillRequest {
    /// Version the client last saw; a stale value is rejected with 409
    pub expected_version: u64,
    pub changes: BillChanges,
    #[validate(length(min = 1, max = 500))]
    pub reason: String,
    pub editor_id: i64,
    #[validate(length(min = 1, max = 100))]
    pub editor_name: String,
}

/// Apply an audited partial edit
pub async fn edit(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<EditBillRequest>,
) -> AppResult<Json<Bill>> {
    payload
        .validate()
        .map_err(|e| AppError::validation(e.to_string()))?;
    if payload.changes.is_empty() {
        return Err(AppError::validation("edit contains no changes"));
    }
    let editor = StaffIdentity {
        id: payload.editor_id,
        name: payload.editor_name,
    };
    let bill = state
        .bills
        .apply_edit(
            id,
            payload.expected_version,
            &payload.changes,
            &payload.reason,
            &editor,
        )
        .map_err(AppError::from)?;
    Ok(Json(bill))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPaymentRequest {
    pub method: PaymentMethod,
    pub amount: MinorUnits,
}

/// Record a payment against a bill
pub async fn record_payment(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<RecordPaymentRequest>,
) -> AppResult<Json<Bill>> {
    let bill = state
        .bills
        .record_payment(id, payload.method, payload.amount)
        .map_err(AppError::from)?;
    Ok(Json(bill))
}

/// Count a print of the bill document
pub async fn mark_printed(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Bill>> {
    let bill = state.bills.mark_printed(id).map_err(AppError::from)?;
    Ok(Json(bill))
}

/// Cancel a bill
pub async fn cancel(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Bill>> {
    let bill = state.bills.cancel(id).map_err(AppError::from)?;
    Ok(Json(bill))
}

/// Refund a paid bill
pub async fn refund(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Bill>> {
    let bill = state.bills.refund(id).map_err(AppError::from)?;
    Ok(Json(bill))
}

/// Full edit history, version ascending
pub async fn audit_history(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Vec<BillAuditEntry>>> {
    let entries = state.bills.history(id).map_err(AppError::from)?;
    Ok(Json(entries))
}

/// The bill's state right after one specific edit
pub async fn audit_at(
    State(state): State<ServerState>,
    Path((id, version)): Path<(i64, u64)>,
) -> AppResult<Json<BillAuditEntry>> {
    let entry = state
        .bills
        .snapshot_at(id, version)
        .map_err(AppError::from)?;
    Ok(Json(entry))
}
