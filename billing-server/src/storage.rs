//! redb-based storage layer for bills, audit entries and checkouts
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `bills` | `bill_id` | `Bill` | Current bill state |
//! | `bill_by_order` | `order_id` | `bill_id` | 1:1 order→bill enforcement |
//! | `bill_audit` | `(bill_id, version)` | `BillAuditEntry` | Append-only edit log |
//! | `pending_checkouts` | `token` | `PendingCheckout` | Staged wallet drafts |
//! | `settled_checkouts` | `token` | `SettledCheckout` | Consumed-checkout record |
//! | `orders` | `order_id` | `Order` | Local order collaborator |
//! | `cart_lines` | `line_id` | `CartLine` | Local cart collaborator |
//! | `counters` | scope key | `u64` | Bill number sequences |
//!
//! # Durability
//!
//! redb commits with `Durability::Immediate`: copy-on-write with atomic
//! pointer swap, so the database file is always in a consistent state even
//! across power loss. The bill update and its audit entry always share one
//! write transaction; a duplicate-callback check and the pending-checkout
//! delete likewise commit as a unit.

use redb::{
    Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction,
};
use shared::models::{Bill, BillAuditEntry, CartLine, Order, PendingCheckout, SettledCheckout};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Current bill state: key = bill_id, value = JSON-serialized Bill
const BILLS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("bills");

/// 1:1 enforcement index: key = order_id, value = bill_id
const BILL_BY_ORDER_TABLE: TableDefinition<i64, i64> = TableDefinition::new("bill_by_order");

/// Append-only audit log: key = (bill_id, version), value = JSON-serialized BillAuditEntry
const BILL_AUDIT_TABLE: TableDefinition<(i64, u64), &[u8]> = TableDefinition::new("bill_audit");

/// Staged wallet drafts: key = token, value = JSON-serialized PendingCheckout
const PENDING_CHECKOUTS_TABLE: TableDefinition<&str, &[u8]> =
    TableDefinition::new("pending_checkouts");

/// Consumed checkouts: key = token, value = JSON-serialized SettledCheckout
const SETTLED_CHECKOUTS_TABLE: TableDefinition<&str, &[u8]> =
    TableDefinition::new("settled_checkouts");

/// Orders (local collaborator): key = order_id, value = JSON-serialized Order
const ORDERS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("orders");

/// Cart lines (local collaborator): key = line_id, value = JSON-serialized CartLine
const CART_LINES_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("cart_lines");

/// Counters: key = scope string (e.g. "bill_seq:HQ:20260823"), value = u64
const COUNTERS_TABLE: TableDefinition<&str, u64> = TableDefinition::new("counters");

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Billing storage backed by redb
#[derive(Clone)]
pub struct BillStorage {
    db: Arc<Database>,
}

impl BillStorage {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        let storage = Self { db: Arc::new(db) };
        storage.init_tables()?;
        Ok(storage)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        let storage = Self { db: Arc::new(db) };
        storage.init_tables()?;
        Ok(storage)
    }

    fn init_tables(&self) -> StorageResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let _ = write_txn.open_table(BILLS_TABLE)?;
            let _ = write_txn.open_table(BILL_BY_ORDER_TABLE)?;
            let _ = write_txn.open_table(BILL_AUDIT_TABLE)?;
            let _ = write_txn.open_table(PENDING_CHECKOUTS_TABLE)?;
            let _ = write_txn.open_table(SETTLED_CHECKOUTS_TABLE)?;
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(CART_LINES_TABLE)?;
            let _ = write_txn.open_table(COUNTERS_TABLE)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Bills ==========

    /// Store a bill and its order index entry (within transaction)
    ///
    /// Used at issue time; `find_bill_by_order_txn` must be checked first.
    pub fn insert_bill(&self, txn: &WriteTransaction, bill: &Bill) -> StorageResult<()> {
        let bytes = serde_json::to_vec(bill)?;
        {
            let mut bills = txn.open_table(BILLS_TABLE)?;
            bills.insert(bill.id, bytes.as_slice())?;
        }
        {
            let mut index = txn.open_table(BILL_BY_ORDER_TABLE)?;
            index.insert(bill.order_id, bill.id)?;
        }
        Ok(())
    }

    /// Overwrite an existing bill's state (within transaction)
    pub fn update_bill(&self, txn: &WriteTransaction, bill: &Bill) -> StorageResult<()> {
        let bytes = serde_json::to_vec(bill)?;
        let mut bills = txn.open_table(BILLS_TABLE)?;
        bills.insert(bill.id, bytes.as_slice())?;
        Ok(())
    }

    /// Read a bill (read-only transaction)
    pub fn get_bill(&self, bill_id: i64) -> StorageResult<Option<Bill>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(BILLS_TABLE)?;
        match table.get(bill_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Read a bill inside an open write transaction
    pub fn get_bill_txn(&self, txn: &WriteTransaction, bill_id: i64) -> StorageResult<Option<Bill>> {
        let table = txn.open_table(BILLS_TABLE)?;
        match table.get(bill_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Look up the bill id issued for an order, if any (within transaction)
    pub fn find_bill_by_order_txn(
        &self,
        txn: &WriteTransaction,
        order_id: i64,
    ) -> StorageResult<Option<i64>> {
        let index = txn.open_table(BILL_BY_ORDER_TABLE)?;
        Ok(index.get(order_id)?.map(|guard| guard.value()))
    }

    /// Look up the bill id issued for an order, if any (read-only)
    pub fn find_bill_by_order(&self, order_id: i64) -> StorageResult<Option<i64>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(BILL_BY_ORDER_TABLE)?;
        Ok(index.get(order_id)?.map(|guard| guard.value()))
    }

    // ========== Audit log ==========

    /// Append an audit entry (within the same transaction as the bill write)
    ///
    /// The table is append-only by construction: no update or delete method
    /// exists on this storage type.
    pub fn append_audit_entry(
        &self,
        txn: &WriteTransaction,
        bill_id: i64,
        entry: &BillAuditEntry,
    ) -> StorageResult<()> {
        let bytes = serde_json::to_vec(entry)?;
        let mut table = txn.open_table(BILL_AUDIT_TABLE)?;
        table.insert((bill_id, entry.version), bytes.as_slice())?;
        Ok(())
    }

    /// All audit entries for a bill, ordered by version ascending
    pub fn list_audit_entries(&self, bill_id: i64) -> StorageResult<Vec<BillAuditEntry>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(BILL_AUDIT_TABLE)?;
        let mut entries = Vec::new();
        for item in table.range((bill_id, 0u64)..=(bill_id, u64::MAX))? {
            let (_, value) = item?;
            entries.push(serde_json::from_slice(value.value())?);
        }
        Ok(entries)
    }

    /// The audit entry recording a specific version: O(1) lookup, no replay
    pub fn get_audit_entry(
        &self,
        bill_id: i64,
        version: u64,
    ) -> StorageResult<Option<BillAuditEntry>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(BILL_AUDIT_TABLE)?;
        match table.get((bill_id, version))? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    // ========== Pending checkouts ==========

    /// Stage (or re-stage) a pending checkout; an existing draft under the
    /// same token is overwritten; the latest stage wins
    pub fn put_pending_checkout(
        &self,
        token: &str,
        pending: &PendingCheckout,
    ) -> StorageResult<()> {
        let bytes = serde_json::to_vec(pending)?;
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(PENDING_CHECKOUTS_TABLE)?;
            table.insert(token, bytes.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Read a staged checkout without consuming it
    pub fn get_pending_checkout(&self, token: &str) -> StorageResult<Option<PendingCheckout>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PENDING_CHECKOUTS_TABLE)?;
        match table.get(token)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Delete-if-present, returning the deleted draft (within transaction)
    ///
    /// This is the atomic primitive that makes reconciliation idempotent:
    /// exactly one caller observes `Some`.
    pub fn take_pending_checkout(
        &self,
        txn: &WriteTransaction,
        token: &str,
    ) -> StorageResult<Option<PendingCheckout>> {
        let mut table = txn.open_table(PENDING_CHECKOUTS_TABLE)?;
        match table.remove(token)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Discard a staged checkout (lazy expiry); returns whether one existed
    pub fn remove_pending_checkout(&self, token: &str) -> StorageResult<bool> {
        let txn = self.db.begin_write()?;
        let existed = {
            let mut table = txn.open_table(PENDING_CHECKOUTS_TABLE)?;
            table.remove(token)?.is_some()
        };
        txn.commit()?;
        Ok(existed)
    }

    // ========== Settled checkouts ==========

    /// Record a consumed checkout (within the consuming transaction)
    pub fn put_settled_checkout(
        &self,
        txn: &WriteTransaction,
        settled: &SettledCheckout,
    ) -> StorageResult<()> {
        let bytes = serde_json::to_vec(settled)?;
        let mut table = txn.open_table(SETTLED_CHECKOUTS_TABLE)?;
        table.insert(settled.token.as_str(), bytes.as_slice())?;
        Ok(())
    }

    /// Look up the outcome of an already-consumed checkout
    pub fn get_settled_checkout(&self, token: &str) -> StorageResult<Option<SettledCheckout>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SETTLED_CHECKOUTS_TABLE)?;
        match table.get(token)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    // ========== Counters (bill numbering) ==========

    /// Increment and return the sequence for a numbering scope
    /// (crash-safe: committed before the number is used)
    pub fn next_bill_sequence(&self, scope: &str) -> StorageResult<u64> {
        let txn = self.db.begin_write()?;
        let next = {
            let mut table = txn.open_table(COUNTERS_TABLE)?;
            let current = table.get(scope)?.map(|g| g.value()).unwrap_or(0);
            let next = current + 1;
            table.insert(scope, next)?;
            next
        };
        txn.commit()?;
        Ok(next)
    }

    // ========== Orders (local collaborator) ==========

    /// Store a new or updated order (within transaction)
    pub fn store_order(&self, txn: &WriteTransaction, order: &Order) -> StorageResult<()> {
        let bytes = serde_json::to_vec(order)?;
        let mut table = txn.open_table(ORDERS_TABLE)?;
        table.insert(order.id, bytes.as_slice())?;
        Ok(())
    }

    /// Store an order in its own transaction
    pub fn put_order(&self, order: &Order) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        self.store_order(&txn, order)?;
        txn.commit()?;
        Ok(())
    }

    /// Read an order
    pub fn get_order(&self, order_id: i64) -> StorageResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        match table.get(order_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    // ========== Cart lines (local collaborator) ==========

    /// Store a cart line
    pub fn put_cart_line(&self, line: &CartLine) -> StorageResult<()> {
        let bytes = serde_json::to_vec(line)?;
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(CART_LINES_TABLE)?;
            table.insert(line.id, bytes.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Read a cart line
    pub fn get_cart_line(&self, line_id: i64) -> StorageResult<Option<CartLine>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CART_LINES_TABLE)?;
        match table.get(line_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Remove a set of cart lines in one transaction
    pub fn remove_cart_lines(&self, line_ids: &[i64]) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(CART_LINES_TABLE)?;
            for id in line_ids {
                table.remove(*id)?;
            }
        }
        txn.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{
        BillSnapshot, BillStatus, OrderDraft, PaymentMethod, PaymentStatus,
    };
    use shared::util::now_millis;

    fn sample_bill(id: i64, order_id: i64) -> Bill {
        Bill {
            id,
            bill_number: format!("BIL-HQ-20260823-{:04}", id),
            order_id,
            branch_id: 1,
            branch_code: "HQ".into(),
            issued_by_id: 7,
            issued_by_name: "cashier".into(),
            status: BillStatus::Issued,
            payment_status: PaymentStatus::Pending,
            payment_method: PaymentMethod::Cash,
            subtotal: 100_000,
            tax_amount: 10_000,
            discount_amount: 0,
            total: 110_000,
            paid_amount: 0,
            change_amount: 0,
            customer_name: None,
            customer_phone: None,
            customer_email: None,
            customer_address: None,
            notes: None,
            internal_notes: None,
            version: 0,
            edit_count: 0,
            is_edited: false,
            last_edited_at: None,
            printed_count: 0,
            last_printed_at: None,
            created_at: now_millis(),
        }
    }

    fn sample_entry(version: u64) -> BillAuditEntry {
        BillAuditEntry {
            version,
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
                customer_name: None,
                customer_phone: None,
                customer_email: None,
                customer_address: None,
                notes: None,
                internal_notes: None,
            },
            changed_fields: vec!["notes".into()],
            reason: "test".into(),
            editor_id: 7,
            created_at: now_millis(),
        }
    }

    #[test]
    fn bill_roundtrip_and_order_index() {
        let storage = BillStorage::open_in_memory().unwrap();
        let bill = sample_bill(1, 100);

        let txn = storage.begin_write().unwrap();
        assert!(storage.find_bill_by_order_txn(&txn, 100).unwrap().is_none());
        storage.insert_bill(&txn, &bill).unwrap();
        txn.commit().unwrap();

        let loaded = storage.get_bill(1).unwrap().unwrap();
        assert_eq!(loaded.bill_number, bill.bill_number);
        assert_eq!(storage.find_bill_by_order(100).unwrap(), Some(1));
    }

    #[test]
    fn audit_entries_ordered_by_version() {
        let storage = BillStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        for v in [3u64, 1, 2] {
            storage.append_audit_entry(&txn, 5, &sample_entry(v)).unwrap();
        }
        txn.commit().unwrap();

        let entries = storage.list_audit_entries(5).unwrap();
        let versions: Vec<u64> = entries.iter().map(|e| e.version).collect();
        assert_eq!(versions, vec![1, 2, 3]);

        // Direct lookup of one version
        let entry = storage.get_audit_entry(5, 2).unwrap().unwrap();
        assert_eq!(entry.version, 2);
        // Entries for other bills are not visible
        assert!(storage.list_audit_entries(6).unwrap().is_empty());
    }

    #[test]
    fn take_pending_checkout_is_delete_if_present() {
        let storage = BillStorage::open_in_memory().unwrap();
        let pending = PendingCheckout {
            draft: OrderDraft {
                total: 50_000,
                discount: 0,
                payment_method: PaymentMethod::Wallet,
                customer_name: None,
                customer_phone: None,
                customer_email: None,
                customer_address: None,
                note: None,
            },
            cart_line_ids: vec![1, 2],
            amount: 50_000,
            created_at: now_millis(),
        };
        storage.put_pending_checkout("tok-1", &pending).unwrap();

        let txn = storage.begin_write().unwrap();
        let taken = storage.take_pending_checkout(&txn, "tok-1").unwrap();
        assert!(taken.is_some());
        // Second take within the same transaction observes the deletion
        assert!(storage.take_pending_checkout(&txn, "tok-1").unwrap().is_none());
        txn.commit().unwrap();

        assert!(storage.get_pending_checkout("tok-1").unwrap().is_none());
    }

    #[test]
    fn restage_overwrites_draft() {
        let storage = BillStorage::open_in_memory().unwrap();
        let mut pending = PendingCheckout {
            draft: OrderDraft {
                total: 50_000,
                discount: 0,
                payment_method: PaymentMethod::Wallet,
                customer_name: None,
                customer_phone: None,
                customer_email: None,
                customer_address: None,
                note: None,
            },
            cart_line_ids: vec![1],
            amount: 50_000,
            created_at: now_millis(),
        };
        storage.put_pending_checkout("tok-1", &pending).unwrap();
        pending.amount = 75_000;
        storage.put_pending_checkout("tok-1", &pending).unwrap();

        let loaded = storage.get_pending_checkout("tok-1").unwrap().unwrap();
        assert_eq!(loaded.amount, 75_000);
    }

    #[test]
    fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("billing.redb");
        {
            let storage = BillStorage::open(&path).unwrap();
            let txn = storage.begin_write().unwrap();
            storage.insert_bill(&txn, &sample_bill(1, 100)).unwrap();
            storage.append_audit_entry(&txn, 1, &sample_entry(1)).unwrap();
            txn.commit().unwrap();
        }
        let storage = BillStorage::open(&path).unwrap();
        assert!(storage.get_bill(1).unwrap().is_some());
        assert_eq!(storage.list_audit_entries(1).unwrap().len(), 1);
        assert_eq!(storage.find_bill_by_order(100).unwrap(), Some(1));
    }

    #[test]
    fn bill_sequence_is_scoped_and_monotonic() {
        let storage = BillStorage::open_in_memory().unwrap();
        assert_eq!(storage.next_bill_sequence("bill_seq:HQ:20260823").unwrap(), 1);
        assert_eq!(storage.next_bill_sequence("bill_seq:HQ:20260823").unwrap(), 2);
        // A different branch or day starts from 1
        assert_eq!(storage.next_bill_sequence("bill_seq:D1:20260823").unwrap(), 1);
        assert_eq!(storage.next_bill_sequence("bill_seq:HQ:20260824").unwrap(), 1);
    }
}
