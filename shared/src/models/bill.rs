//! Bill (invoice) wire models
//!
//! Field names serialize in camelCase: the audit record shape and the edit
//! endpoint are wire contracts consumed by existing clients and must stay
//! bit-exact.

use crate::money::{self, MinorUnits};
use serde::{Deserialize, Serialize};

/// Bill lifecycle status
///
/// `Draft → Issued → Paid`; `Issued` or `Paid` may transition to the
/// terminal `Cancelled` / `Refunded` states. Terminal bills accept no
/// further field mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillStatus {
    Draft,
    Issued,
    Paid,
    Cancelled,
    Refunded,
}

impl BillStatus {
    /// Terminal states reject every mutation except the transition itself
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Refunded)
    }
}

/// Payment status, a narrower parallel state machine:
/// `Pending → Paid | Failed`, `Paid → Refunded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

/// Payment method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Card,
    Wallet,
}

/// Branch context captured at issue time (immutable on the bill)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchContext {
    pub id: i64,
    /// Short code embedded in bill numbers, e.g. "HQ" or "D1"
    pub code: String,
}

/// Issuing staff identity (immutable on the bill)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffIdentity {
    pub id: i64,
    pub name: String,
}

/// The bill aggregate: current state of an invoice
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    /// Internal id (snowflake)
    pub id: i64,
    /// Display id: branch-scoped, date-stamped, sequential; immutable
    pub bill_number: String,
    /// Originating order (1:1, immutable link)
    pub order_id: i64,
    pub branch_id: i64,
    pub branch_code: String,
    pub issued_by_id: i64,
    pub issued_by_name: String,

    pub status: BillStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,

    pub subtotal: MinorUnits,
    pub tax_amount: MinorUnits,
    pub discount_amount: MinorUnits,
    pub total: MinorUnits,
    pub paid_amount: MinorUnits,
    pub change_amount: MinorUnits,

    // Customer snapshot: copied from the originating order at issue time,
    // never referenced
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub customer_address: Option<String>,

    pub notes: Option<String>,
    pub internal_notes: Option<String>,

    /// Strictly increases by 1 on every accepted edit; 0 at issue time
    pub version: u64,
    /// Always equals `version`: one audit entry per accepted edit
    pub edit_count: u64,
    pub is_edited: bool,
    pub last_edited_at: Option<i64>,

    pub printed_count: u32,
    pub last_printed_at: Option<i64>,

    pub created_at: i64,
}

impl Bill {
    /// Recompute the derived totals from the primitive amounts.
    ///
    /// Invariants: `total == subtotal + taxAmount - discountAmount` and
    /// `changeAmount == max(0, paidAmount - total)`.
    pub fn recompute_totals(&mut self) {
        self.total = money::bill_total(self.subtotal, self.tax_amount, self.discount_amount);
        self.change_amount = money::change_due(self.paid_amount, self.total);
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Full audited-field snapshot at the bill's current version
    pub fn snapshot(&self) -> BillSnapshot {
        BillSnapshot {
            bill_number: self.bill_number.clone(),
            status: self.status,
            payment_status: self.payment_status,
            payment_method: self.payment_method,
            subtotal: self.subtotal,
            tax_amount: self.tax_amount,
            discount_amount: self.discount_amount,
            total: self.total,
            paid_amount: self.paid_amount,
            change_amount: self.change_amount,
            customer_name: self.customer_name.clone(),
            customer_phone: self.customer_phone.clone(),
            customer_email: self.customer_email.clone(),
            customer_address: self.customer_address.clone(),
            notes: self.notes.clone(),
            internal_notes: self.internal_notes.clone(),
        }
    }
}

/// The audited field set of a bill at one version
///
/// An audit entry's snapshot fully describes the bill after the edit it
/// records: reconstructing "what did the bill look like after edit 3" is a
/// direct lookup, never a replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillSnapshot {
    pub bill_number: String,
    pub status: BillStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub subtotal: MinorUnits,
    pub tax_amount: MinorUnits,
    pub discount_amount: MinorUnits,
    pub total: MinorUnits,
    pub paid_amount: MinorUnits,
    pub change_amount: MinorUnits,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub customer_address: Option<String>,
    pub notes: Option<String>,
    pub internal_notes: Option<String>,
}

/// One immutable audit record (persisted wire shape, bit-exact)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillAuditEntry {
    /// Matches the bill version *after* the edit this entry records
    pub version: u64,
    /// Full field snapshot at that version
    pub snapshot: BillSnapshot,
    /// Field names that differ from version - 1
    pub changed_fields: Vec<String>,
    /// Free-text edit reason
    pub reason: String,
    pub editor_id: i64,
    pub created_at: i64,
}

/// Partial edit payload: absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BillChanges {
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub customer_address: Option<String>,
    pub notes: Option<String>,
    pub internal_notes: Option<String>,
    pub discount_amount: Option<MinorUnits>,
    pub payment_method: Option<PaymentMethod>,
    /// Line-item content changed: recorded as the single opaque "items"
    /// marker in the changed-field list, never structurally diffed
    pub items_changed: bool,
}

impl BillChanges {
    /// True when no field is present at all (distinct from fields that are
    /// present but equal to the current values; the latter is detected by
    /// the snapshot diff)
    pub fn is_empty(&self) -> bool {
        self.customer_name.is_none()
            && self.customer_phone.is_none()
            && self.customer_email.is_none()
            && self.customer_address.is_none()
            && self.notes.is_none()
            && self.internal_notes.is_none()
            && self.discount_amount.is_none()
            && self.payment_method.is_none()
            && !self.items_changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(BillStatus::Cancelled.is_terminal());
        assert!(BillStatus::Refunded.is_terminal());
        assert!(!BillStatus::Issued.is_terminal());
        assert!(!BillStatus::Paid.is_terminal());
    }

    #[test]
    fn audit_entry_wire_shape_is_camel_case() {
        let entry = BillAuditEntry {
            version: 1,
            snapshot: BillSnapshot {
                bill_number: "BIL-HQ-20260823-0001".into(),
                status: BillStatus::Issued,
                payment_status: PaymentStatus::Pending,
                payment_method: PaymentMethod::Cash,
                subtotal: 100_000,
                tax_amount: 10_000,
                discount_amount: 0,
                total: 110_000,
                paid_amount: 0,
                change_amount: 0,
                customer_name: Some("Ana".into()),
                customer_phone: None,
                customer_email: None,
                customer_address: None,
                notes: None,
                internal_notes: None,
            },
            changed_fields: vec!["customerName".into()],
            reason: "typo".into(),
            editor_id: 7,
            created_at: 1_700_000_000_000,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("changedFields").is_some());
        assert!(json.get("editorId").is_some());
        assert!(json.get("createdAt").is_some());
        assert!(json["snapshot"].get("taxAmount").is_some());
        assert_eq!(json["snapshot"]["status"], "ISSUED");
    }

    #[test]
    fn changes_emptiness() {
        assert!(BillChanges::default().is_empty());
        let changes = BillChanges {
            notes: Some("late delivery".into()),
            ..Default::default()
        };
        assert!(!changes.is_empty());
        let marker_only = BillChanges {
            items_changed: true,
            ..Default::default()
        };
        assert!(!marker_only.is_empty());
    }
}
