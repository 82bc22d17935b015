//! Bill lifecycle management
//!
//! The [`BillManager`] owns every bill mutation: issue, payment, printing,
//! cancellation, refund and audited edits. Each accepted edit bumps the
//! bill's version by exactly 1 and appends one audit entry in the same
//! write transaction, so `version == editCount == audit entries` holds at
//! every commit point.

pub mod audit;
pub mod error;
pub mod numbering;

pub use error::{BillError, BillResult};

use crate::storage::BillStorage;
use chrono_tz::Tz;
use rust_decimal::Decimal;
use shared::models::{
    Bill, BillAuditEntry, BillChanges, BillStatus, BranchContext, Order, OrderPaymentState,
    OrderStatus, PaymentMethod, PaymentStatus, StaffIdentity,
};
use shared::money::{self, MinorUnits};
use shared::util::{now_millis, snowflake_id};

/// Bill lifecycle manager
#[derive(Clone)]
pub struct BillManager {
    storage: BillStorage,
    /// Tax rate in percent, applied at issue time only
    tax_rate: Decimal,
    /// Venue timezone; decides which business day a bill number belongs to
    tz: Tz,
}

impl BillManager {
    pub fn new(storage: BillStorage, tax_rate: Decimal, tz: Tz) -> Self {
        Self {
            storage,
            tax_rate,
            tz,
        }
    }

    /// Issue a bill for a completed order (1:1, immutable link)
    ///
    /// Tax is computed from the configured rate at issue time and never
    /// recomputed afterwards. An order whose payment is already confirmed
    /// (wallet flow) produces a bill that is born `PAID` with the exact
    /// total captured.
    pub fn issue(
        &self,
        order: &Order,
        branch: &BranchContext,
        staff: &StaffIdentity,
    ) -> BillResult<Bill> {
        if order.status != OrderStatus::Completed {
            return Err(BillError::OrderNotCompleted(order.id));
        }
        // The order's discount arrives from a collaborator, so it gets the
        // same bound the edit path enforces: a bill total is never negative.
        let tax_amount = money::tax_for(order.total, self.tax_rate);
        if order.discount < 0 || order.discount > order.total + tax_amount {
            return Err(BillError::InvalidAmount(format!(
                "order {} discount {} exceeds subtotal plus tax",
                order.id, order.discount
            )));
        }
        if let Some(bill_id) = self.storage.find_bill_by_order(order.id)? {
            return Err(BillError::AlreadyIssued {
                order_id: order.id,
                bill_id,
            });
        }

        // The sequence counter commits in its own transaction before the
        // bill write: redb allows a single writer at a time, and a crash
        // between the two may skip a number but never reuse one.
        let date = numbering::business_date(self.tz);
        let scope = numbering::sequence_scope(&branch.code, &date);
        let seq = self.storage.next_bill_sequence(&scope)?;
        let bill_number = numbering::format_bill_number(&branch.code, &date, seq);

        let mut bill = Bill {
            id: snowflake_id(),
            bill_number,
            order_id: order.id,
            branch_id: branch.id,
            branch_code: branch.code.clone(),
            issued_by_id: staff.id,
            issued_by_name: staff.name.clone(),
            status: BillStatus::Issued,
            payment_status: PaymentStatus::Pending,
            payment_method: order.payment_method,
            subtotal: order.total,
            tax_amount,
            discount_amount: order.discount,
            total: 0,
            paid_amount: 0,
            change_amount: 0,
            customer_name: order.customer_name.clone(),
            customer_phone: order.customer_phone.clone(),
            customer_email: order.customer_email.clone(),
            customer_address: order.customer_address.clone(),
            notes: None,
            internal_notes: None,
            version: 0,
            edit_count: 0,
            is_edited: false,
            last_edited_at: None,
            printed_count: 0,
            last_printed_at: None,
            created_at: now_millis(),
        };
        bill.recompute_totals();

        if order.payment_state == OrderPaymentState::Paid {
            bill.paid_amount = bill.total;
            bill.payment_status = PaymentStatus::Paid;
            bill.status = BillStatus::Paid;
            bill.recompute_totals();
        }

        let txn = self.storage.begin_write()?;
        // Re-check under the write transaction; the read above only avoids
        // burning a sequence number on the common duplicate.
        if let Some(existing) = self.storage.find_bill_by_order_txn(&txn, order.id)? {
            return Err(BillError::AlreadyIssued {
                order_id: order.id,
                bill_id: existing,
            });
        }
        self.storage.insert_bill(&txn, &bill)?;
        txn.commit().map_err(crate::storage::StorageError::from)?;

        tracing::info!(
            bill_id = bill.id,
            bill_number = %bill.bill_number,
            order_id = order.id,
            total = bill.total,
            status = ?bill.status,
            "Bill issued"
        );
        Ok(bill)
    }

    /// Record a payment against a bill
    ///
    /// Partial amounts accumulate and leave the payment status `PENDING`;
    /// once the running total covers the bill, the bill flips to `PAID`
    /// and the change due is derived.
    pub fn record_payment(
        &self,
        bill_id: i64,
        method: PaymentMethod,
        amount: MinorUnits,
    ) -> BillResult<Bill> {
        if amount <= 0 {
            return Err(BillError::InvalidAmount(
                "payment amount must be positive".into(),
            ));
        }
        let txn = self.storage.begin_write()?;
        let mut bill = self
            .storage
            .get_bill_txn(&txn, bill_id)?
            .ok_or(BillError::BillNotFound(bill_id))?;
        if bill.is_terminal() {
            return Err(BillError::Terminal(bill_id));
        }
        if bill.payment_status == PaymentStatus::Paid {
            return Err(BillError::InvalidTransition(format!(
                "bill {} is already paid",
                bill_id
            )));
        }

        bill.payment_method = method;
        bill.paid_amount += amount;
        bill.recompute_totals();
        if bill.paid_amount >= bill.total {
            bill.payment_status = PaymentStatus::Paid;
            bill.status = BillStatus::Paid;
        }
        self.storage.update_bill(&txn, &bill)?;
        txn.commit().map_err(crate::storage::StorageError::from)?;

        tracing::info!(
            bill_id,
            method = ?method,
            amount,
            paid = bill.paid_amount,
            change = bill.change_amount,
            payment_status = ?bill.payment_status,
            "Payment recorded"
        );
        Ok(bill)
    }

    /// Count a print of the bill document
    ///
    /// A plain counter: printing is allowed in every state, including the
    /// terminal ones (reprints of cancelled bills happen for bookkeeping).
    pub fn mark_printed(&self, bill_id: i64) -> BillResult<Bill> {
        let txn = self.storage.begin_write()?;
        let mut bill = self
            .storage
            .get_bill_txn(&txn, bill_id)?
            .ok_or(BillError::BillNotFound(bill_id))?;
        bill.printed_count += 1;
        bill.last_printed_at = Some(now_millis());
        self.storage.update_bill(&txn, &bill)?;
        txn.commit().map_err(crate::storage::StorageError::from)?;
        Ok(bill)
    }

    /// Cancel a bill (terminal)
    pub fn cancel(&self, bill_id: i64) -> BillResult<Bill> {
        let txn = self.storage.begin_write()?;
        let mut bill = self
            .storage
            .get_bill_txn(&txn, bill_id)?
            .ok_or(BillError::BillNotFound(bill_id))?;
        if bill.is_terminal() {
            return Err(BillError::Terminal(bill_id));
        }
        bill.status = BillStatus::Cancelled;
        self.storage.update_bill(&txn, &bill)?;
        txn.commit().map_err(crate::storage::StorageError::from)?;
        tracing::info!(bill_id, "Bill cancelled");
        Ok(bill)
    }

    /// Refund a paid bill (terminal)
    pub fn refund(&self, bill_id: i64) -> BillResult<Bill> {
        let txn = self.storage.begin_write()?;
        let mut bill = self
            .storage
            .get_bill_txn(&txn, bill_id)?
            .ok_or(BillError::BillNotFound(bill_id))?;
        if bill.is_terminal() {
            return Err(BillError::Terminal(bill_id));
        }
        if bill.payment_status != PaymentStatus::Paid {
            return Err(BillError::InvalidTransition(format!(
                "bill {} is not paid, nothing to refund",
                bill_id
            )));
        }
        bill.status = BillStatus::Refunded;
        bill.payment_status = PaymentStatus::Refunded;
        self.storage.update_bill(&txn, &bill)?;
        txn.commit().map_err(crate::storage::StorageError::from)?;
        tracing::info!(bill_id, refunded = bill.paid_amount, "Bill refunded");
        Ok(bill)
    }

    /// Apply an audited partial edit
    ///
    /// Rejected outright when the expected version is stale or the bill is
    /// terminal. A payload whose fields all equal the current values is a
    /// no-op: nothing is written and the version does not move. Otherwise
    /// the bill update and its audit entry commit atomically.
    pub fn apply_edit(
        &self,
        bill_id: i64,
        expected_version: u64,
        changes: &BillChanges,
        reason: &str,
        editor: &StaffIdentity,
    ) -> BillResult<Bill> {
        if reason.trim().is_empty() {
            return Err(BillError::Validation("edit reason must not be empty".into()));
        }
        if let Some(discount) = changes.discount_amount {
            if discount < 0 {
                return Err(BillError::InvalidAmount(
                    "discount must be non-negative".into(),
                ));
            }
        }

        let txn = self.storage.begin_write()?;
        let mut bill = self
            .storage
            .get_bill_txn(&txn, bill_id)?
            .ok_or(BillError::BillNotFound(bill_id))?;
        if bill.is_terminal() {
            return Err(BillError::Terminal(bill_id));
        }
        if bill.version != expected_version {
            return Err(BillError::VersionConflict {
                expected: expected_version,
                actual: bill.version,
            });
        }
        if let Some(discount) = changes.discount_amount {
            if discount > bill.subtotal + bill.tax_amount {
                return Err(BillError::InvalidAmount(
                    "discount exceeds subtotal plus tax".into(),
                ));
            }
        }

        let before = bill.snapshot();
        if let Some(ref v) = changes.customer_name {
            bill.customer_name = Some(v.clone());
        }
        if let Some(ref v) = changes.customer_phone {
            bill.customer_phone = Some(v.clone());
        }
        if let Some(ref v) = changes.customer_email {
            bill.customer_email = Some(v.clone());
        }
        if let Some(ref v) = changes.customer_address {
            bill.customer_address = Some(v.clone());
        }
        if let Some(ref v) = changes.notes {
            bill.notes = Some(v.clone());
        }
        if let Some(ref v) = changes.internal_notes {
            bill.internal_notes = Some(v.clone());
        }
        if let Some(v) = changes.discount_amount {
            bill.discount_amount = v;
        }
        if let Some(v) = changes.payment_method {
            bill.payment_method = v;
        }
        bill.recompute_totals();

        let mut changed = audit::changed_fields(&before, &bill.snapshot());
        if changes.items_changed {
            changed.push(audit::ITEMS_FIELD.to_string());
        }
        if changed.is_empty() {
            // No observable change; the open transaction aborts on drop.
            return Ok(bill);
        }

        bill.version += 1;
        bill.edit_count += 1;
        bill.is_edited = true;
        bill.last_edited_at = Some(now_millis());

        let entry = audit::build_entry(bill.version, bill.snapshot(), changed, reason, editor);
        self.storage.update_bill(&txn, &bill)?;
        self.storage.append_audit_entry(&txn, bill_id, &entry)?;
        txn.commit().map_err(crate::storage::StorageError::from)?;

        tracing::info!(
            bill_id,
            version = bill.version,
            changed_fields = ?entry.changed_fields,
            editor_id = editor.id,
            "Bill edited"
        );
        Ok(bill)
    }

    /// Current bill state
    pub fn get(&self, bill_id: i64) -> BillResult<Bill> {
        self.storage
            .get_bill(bill_id)?
            .ok_or(BillError::BillNotFound(bill_id))
    }

    /// Full edit history, version ascending
    pub fn history(&self, bill_id: i64) -> BillResult<Vec<BillAuditEntry>> {
        if self.storage.get_bill(bill_id)?.is_none() {
            return Err(BillError::BillNotFound(bill_id));
        }
        Ok(self.storage.list_audit_entries(bill_id)?)
    }

    /// The bill's state right after a specific edit: direct lookup, no replay
    pub fn snapshot_at(&self, bill_id: i64, version: u64) -> BillResult<BillAuditEntry> {
        if self.storage.get_bill(bill_id)?.is_none() {
            return Err(BillError::BillNotFound(bill_id));
        }
        self.storage
            .get_audit_entry(bill_id, version)?
            .ok_or(BillError::AuditEntryNotFound { bill_id, version })
    }
}
