//! Snapshot diffing for the append-only edit audit trail
//!
//! Each accepted edit appends one [`BillAuditEntry`] whose `changedFields`
//! lists the wire-level (camelCase) names that differ from the previous
//! version. Line-item changes are recorded as the single opaque `"items"`
//! marker; item contents are never structurally diffed here.

use shared::models::{BillAuditEntry, BillSnapshot, StaffIdentity};
use shared::util::now_millis;

/// Marker entry for line-item content changes
pub const ITEMS_FIELD: &str = "items";

/// Wire-level field names that differ between two snapshots
///
/// Both snapshots serialize to flat camelCase JSON objects with an identical
/// key set, so a key-by-key value comparison is exact. Keys come back in
/// serde_json's map order (alphabetical), which keeps the list deterministic.
pub fn changed_fields(prev: &BillSnapshot, next: &BillSnapshot) -> Vec<String> {
    let prev_json = serde_json::to_value(prev).unwrap_or_default();
    let next_json = serde_json::to_value(next).unwrap_or_default();

    let (Some(prev_map), Some(next_map)) = (prev_json.as_object(), next_json.as_object()) else {
        return Vec::new();
    };

    next_map
        .iter()
        .filter(|(key, next_value)| prev_map.get(*key) != Some(next_value))
        .map(|(key, _)| key.clone())
        .collect()
}

/// Build the immutable audit record for an accepted edit
pub fn build_entry(
    version: u64,
    snapshot: BillSnapshot,
    changed: Vec<String>,
    reason: &str,
    editor: &StaffIdentity,
) -> BillAuditEntry {
    BillAuditEntry {
        version,
        snapshot,
        changed_fields: changed,
        reason: reason.to_string(),
        editor_id: editor.id,
        created_at: now_millis(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{BillStatus, PaymentMethod, PaymentStatus};

    fn snapshot() -> BillSnapshot {
        BillSnapshot {
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
        }
    }

    #[test]
    fn identical_snapshots_diff_empty() {
        let a = snapshot();
        assert!(changed_fields(&a, &a.clone()).is_empty());
    }

    #[test]
    fn single_field_change_uses_wire_name() {
        let a = snapshot();
        let mut b = a.clone();
        b.customer_name = Some("Anna".into());
        assert_eq!(changed_fields(&a, &b), vec!["customerName".to_string()]);
    }

    #[test]
    fn derived_totals_show_up_alongside_their_cause() {
        let a = snapshot();
        let mut b = a.clone();
        b.discount_amount = 5_000;
        b.total = 105_000;
        let changed = changed_fields(&a, &b);
        assert!(changed.contains(&"discountAmount".to_string()));
        assert!(changed.contains(&"total".to_string()));
        assert_eq!(changed.len(), 2);
    }

    #[test]
    fn none_to_some_is_a_change() {
        let a = snapshot();
        let mut b = a.clone();
        b.notes = Some("window seat".into());
        assert_eq!(changed_fields(&a, &b), vec!["notes".to_string()]);
    }
}
