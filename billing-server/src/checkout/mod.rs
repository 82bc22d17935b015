//! Wallet checkout staging and asynchronous reconciliation
//!
//! Nothing financial exists while the customer is off at the gateway: the
//! order draft is staged server-side under an opaque token and only the
//! token travels. The gateway callback then reconciles the token, and a
//! success consumes the staged draft exactly once. Failures and declines
//! never consume it, so the same draft can be retried.

use crate::bills::{BillError, BillManager};
use crate::orders::{CartService, OrderService};
use crate::storage::{BillStorage, StorageError};
use dashmap::DashMap;
use serde::Serialize;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    BranchContext, GatewayCallback, OrderDraft, PendingCheckout, SettledCheckout, StagedCheckout,
    StaffIdentity,
};
use shared::money::{self, MinorUnits};
use shared::util::now_millis;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Reconciliation errors
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("Unknown checkout token: {0}")]
    NotFound(String),

    #[error("Checkout expired: {0}")]
    Expired(String),

    #[error("Amount mismatch: staged {staged}, callback {received}")]
    AmountMismatch {
        staged: MinorUnits,
        received: MinorUnits,
    },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Order(AppError),

    #[error(transparent)]
    Bill(#[from] BillError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type CheckoutResult<T> = Result<T, CheckoutError>;

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::NotFound(token) => AppError::with_message(
                ErrorCode::CheckoutNotFound,
                format!("Unknown checkout token: {}", token),
            ),
            CheckoutError::Expired(token) => AppError::with_message(
                ErrorCode::CheckoutExpired,
                format!("Checkout expired: {}", token),
            ),
            CheckoutError::AmountMismatch { staged, received } => AppError::with_message(
                ErrorCode::AmountMismatch,
                "Callback amount does not match the staged amount",
            )
            .with_detail("stagedAmount", staged)
            .with_detail("receivedAmount", received),
            CheckoutError::Validation(msg) => AppError::validation(msg),
            CheckoutError::Order(err) => err,
            CheckoutError::Bill(err) => err.into(),
            CheckoutError::Storage(e) => {
                tracing::error!(error = %e, "Storage error in checkout");
                AppError::database(e.to_string())
            }
        }
    }
}

/// The terminal result of reconciling one callback
///
/// `Declined` is a successful reconciliation of an unsuccessful payment:
/// the HTTP layer reports it with 200, not an error status.
#[derive(Debug, Clone, Serialize)]
#[serde(
    tag = "status",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum ReconcileOutcome {
    Settled {
        order_id: i64,
        bill_id: i64,
        amount: MinorUnits,
    },
    Declined {
        code: String,
        message: String,
    },
}

/// Gateway and reconciliation settings, wired from [`crate::config::Config`]
#[derive(Clone)]
pub struct CheckoutSettings {
    /// Gateway result code meaning "payment captured"
    pub success_code: String,
    /// Base URL the customer is redirected to; the token is appended
    pub redirect_url: String,
    /// Staged drafts older than this are lazily discarded
    pub ttl_ms: i64,
    /// Maximum absolute drift between staged and callback amounts
    pub amount_tolerance: MinorUnits,
    /// Tax rate in percent; staged charges must match the bill total
    /// that issuing will later derive
    pub tax_rate: rust_decimal::Decimal,
}

/// Reconciles asynchronous wallet payments against staged checkouts
pub struct PaymentReconciler {
    storage: BillStorage,
    bills: BillManager,
    orders: Arc<dyn OrderService>,
    carts: Arc<dyn CartService>,
    branch: BranchContext,
    settings: CheckoutSettings,
    /// One settle mutex per token. The durable settled-checkout record is
    /// what makes retries idempotent across restarts; the lock only keeps
    /// concurrent callbacks for one token from both building an order, and
    /// callbacks for unrelated tokens never wait on each other.
    settle_locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl PaymentReconciler {
    pub fn new(
        storage: BillStorage,
        bills: BillManager,
        orders: Arc<dyn OrderService>,
        carts: Arc<dyn CartService>,
        branch: BranchContext,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            storage,
            bills,
            orders,
            carts,
            branch,
            settings,
            settle_locks: Arc::new(DashMap::new()),
        }
    }

    /// Identity recorded as the issuer on reconciled bills
    fn system_staff() -> StaffIdentity {
        StaffIdentity {
            id: 0,
            name: "system".into(),
        }
    }

    /// Stage an order draft ahead of the gateway redirect
    ///
    /// The charge amount is the bill total the draft will produce once
    /// settled. Passing `prior_token` discards an earlier staging of the
    /// same cart, so the latest stage wins.
    pub fn stage(
        &self,
        draft: OrderDraft,
        cart_line_ids: Vec<i64>,
        prior_token: Option<String>,
    ) -> CheckoutResult<StagedCheckout> {
        if draft.total <= 0 {
            return Err(CheckoutError::Validation(
                "draft total must be positive".into(),
            ));
        }
        // Same bound issuing will enforce; a charge amount is never negative.
        let tax = money::tax_for(draft.total, self.settings.tax_rate);
        if draft.discount < 0 || draft.discount > draft.total + tax {
            return Err(CheckoutError::Validation(
                "draft discount must be between zero and the subtotal plus tax".into(),
            ));
        }

        if let Some(prior) = prior_token {
            if self.storage.remove_pending_checkout(&prior)? {
                tracing::info!(token = %prior, "Prior staged checkout discarded");
            }
        }

        let amount = money::bill_total(draft.total, tax, draft.discount);
        let token = uuid::Uuid::new_v4().to_string();
        let created_at = now_millis();

        let pending = PendingCheckout {
            draft,
            cart_line_ids,
            amount,
            created_at,
        };
        self.storage.put_pending_checkout(&token, &pending)?;

        tracing::info!(token = %token, amount, "Checkout staged");
        Ok(StagedCheckout {
            redirect_url: format!("{}?token={}", self.settings.redirect_url, token),
            token,
            amount,
            expires_at: created_at + self.settings.ttl_ms,
        })
    }

    /// Reconcile one gateway callback
    ///
    /// Success consumes the staged draft exactly once: order creation, bill
    /// issue and the pending→settled swap leave a durable settled record,
    /// and any duplicate callback is answered from that record with no side
    /// effects. Failure codes and amount mismatches leave the draft staged.
    pub async fn reconcile(&self, callback: &GatewayCallback) -> CheckoutResult<ReconcileOutcome> {
        let lock = self
            .settle_locks
            .entry(callback.token.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        if let Some(settled) = self.storage.get_settled_checkout(&callback.token)? {
            tracing::info!(
                token = %callback.token,
                order_id = settled.order_id,
                bill_id = settled.bill_id,
                "Duplicate callback answered from settled record"
            );
            self.settle_locks.remove(&callback.token);
            return Ok(ReconcileOutcome::Settled {
                order_id: settled.order_id,
                bill_id: settled.bill_id,
                amount: settled.amount,
            });
        }

        // The map entry stays alive while the token is still settleable
        // (declines, mismatches); it is removed only once the settled record
        // exists or the token is dead, so every callback that could still
        // build an order contends on the same mutex.
        let Some(pending) = self.storage.get_pending_checkout(&callback.token)? else {
            self.settle_locks.remove(&callback.token);
            return Err(CheckoutError::NotFound(callback.token.clone()));
        };

        if now_millis() - pending.created_at > self.settings.ttl_ms {
            self.storage.remove_pending_checkout(&callback.token)?;
            self.settle_locks.remove(&callback.token);
            tracing::warn!(token = %callback.token, "Expired checkout discarded");
            return Err(CheckoutError::Expired(callback.token.clone()));
        }

        if callback.result_code != self.settings.success_code {
            let message = callback
                .message
                .clone()
                .unwrap_or_else(|| "payment declined".into());
            tracing::warn!(
                token = %callback.token,
                code = %callback.result_code,
                message = %message,
                "Gateway declined; draft kept for retry"
            );
            return Ok(ReconcileOutcome::Declined {
                code: callback.result_code.clone(),
                message,
            });
        }

        if !money::within_tolerance(
            callback.amount,
            pending.amount,
            self.settings.amount_tolerance,
        ) {
            return Err(CheckoutError::AmountMismatch {
                staged: pending.amount,
                received: callback.amount,
            });
        }

        let created = self
            .orders
            .create_order(&pending.draft)
            .await
            .map_err(CheckoutError::Order)?;
        let order = self
            .orders
            .mark_completed(created.id)
            .await
            .map_err(CheckoutError::Order)?;
        let bill = self.bills.issue(&order, &self.branch, &Self::system_staff())?;

        // Consume the draft and record the outcome atomically.
        let settled = SettledCheckout {
            token: callback.token.clone(),
            order_id: order.id,
            bill_id: bill.id,
            amount: callback.amount,
            settled_at: now_millis(),
        };
        let txn = self.storage.begin_write()?;
        if self
            .storage
            .take_pending_checkout(&txn, &callback.token)?
            .is_none()
        {
            // Lost under the lock: only possible if the client re-staged
            // this token mid-callback. The order and bill stand.
            tracing::warn!(
                token = %callback.token,
                bill_id = bill.id,
                "Pending draft vanished during settlement"
            );
        }
        self.storage.put_settled_checkout(&txn, &settled)?;
        txn.commit().map_err(StorageError::from)?;
        self.settle_locks.remove(&callback.token);

        if let Err(e) = self.carts.clear_lines(&pending.cart_line_ids).await {
            // Stale cart lines are an annoyance, not a financial error.
            tracing::warn!(token = %callback.token, error = %e, "Cart cleanup failed");
        }

        tracing::info!(
            token = %callback.token,
            order_id = order.id,
            bill_id = bill.id,
            amount = callback.amount,
            "Checkout settled"
        );
        Ok(ReconcileOutcome::Settled {
            order_id: order.id,
            bill_id: bill.id,
            amount: callback.amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::{LocalCartService, LocalOrderService};
    use rust_decimal::Decimal;
    use shared::models::{BillStatus, CartLine, PaymentMethod, PaymentStatus};

    fn settings() -> CheckoutSettings {
        CheckoutSettings {
            success_code: "00".into(),
            redirect_url: "https://pay.example/redirect".into(),
            ttl_ms: 5 * 60 * 1000,
            amount_tolerance: 0,
            tax_rate: Decimal::from(10),
        }
    }

    fn reconciler_with(settings: CheckoutSettings) -> (PaymentReconciler, BillStorage) {
        let storage = BillStorage::open_in_memory().unwrap();
        let bills = BillManager::new(storage.clone(), settings.tax_rate, chrono_tz::UTC);
        let reconciler = PaymentReconciler::new(
            storage.clone(),
            bills,
            Arc::new(LocalOrderService::new(storage.clone())),
            Arc::new(LocalCartService::new(storage.clone())),
            BranchContext {
                id: 1,
                code: "HQ".into(),
            },
            settings,
        );
        (reconciler, storage)
    }

    fn reconciler() -> (PaymentReconciler, BillStorage) {
        reconciler_with(settings())
    }

    fn draft(total: MinorUnits) -> OrderDraft {
        OrderDraft {
            total,
            discount: 0,
            payment_method: PaymentMethod::Wallet,
            customer_name: Some("Ben".into()),
            customer_phone: None,
            customer_email: None,
            customer_address: None,
            note: None,
        }
    }

    fn success_callback(token: &str, amount: MinorUnits) -> GatewayCallback {
        GatewayCallback {
            token: token.into(),
            result_code: "00".into(),
            amount,
            message: None,
        }
    }

    #[tokio::test]
    async fn stage_charges_the_future_bill_total() {
        let (reconciler, storage) = reconciler();
        let staged = reconciler.stage(draft(50_000), vec![], None).unwrap();
        // 50_000 + 10% tax
        assert_eq!(staged.amount, 55_000);
        assert!(staged.redirect_url.contains(&staged.token));
        assert!(staged.expires_at > now_millis());
        assert!(storage.get_pending_checkout(&staged.token).unwrap().is_some());
    }

    #[tokio::test]
    async fn successful_callback_creates_order_and_paid_bill() {
        let (reconciler, storage) = reconciler();
        for id in [11i64, 12] {
            storage
                .put_cart_line(&CartLine {
                    id,
                    product_name: "pho".into(),
                    quantity: 1,
                    unit_price: 25_000,
                })
                .unwrap();
        }
        let staged = reconciler.stage(draft(50_000), vec![11, 12], None).unwrap();

        let outcome = reconciler
            .reconcile(&success_callback(&staged.token, 55_000))
            .await
            .unwrap();
        let ReconcileOutcome::Settled {
            order_id,
            bill_id,
            amount,
        } = outcome
        else {
            panic!("expected settled outcome");
        };
        assert_eq!(amount, 55_000);

        let order = storage.get_order(order_id).unwrap().unwrap();
        assert_eq!(order.payment_method, PaymentMethod::Wallet);

        let bill = storage.get_bill(bill_id).unwrap().unwrap();
        assert_eq!(bill.status, BillStatus::Paid);
        assert_eq!(bill.payment_status, PaymentStatus::Paid);
        assert_eq!(bill.total, 55_000);
        assert_eq!(bill.paid_amount, 55_000);
        assert_eq!(bill.change_amount, 0);

        // Draft consumed, cart cleared
        assert!(storage.get_pending_checkout(&staged.token).unwrap().is_none());
        assert!(storage.get_cart_line(11).unwrap().is_none());
        assert!(storage.get_cart_line(12).unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_callback_preserves_the_draft() {
        let (reconciler, storage) = reconciler();
        let staged = reconciler.stage(draft(50_000), vec![], None).unwrap();

        let callback = GatewayCallback {
            token: staged.token.clone(),
            result_code: "51".into(),
            amount: 55_000,
            message: Some("insufficient funds".into()),
        };
        let outcome = reconciler.reconcile(&callback).await.unwrap();
        let ReconcileOutcome::Declined { code, message } = outcome else {
            panic!("expected declined outcome");
        };
        assert_eq!(code, "51");
        assert_eq!(message, "insufficient funds");

        // Nothing consumed: the retry succeeds against the same token
        assert!(storage.get_pending_checkout(&staged.token).unwrap().is_some());
        let retry = reconciler
            .reconcile(&success_callback(&staged.token, 55_000))
            .await
            .unwrap();
        assert!(matches!(retry, ReconcileOutcome::Settled { .. }));
    }

    #[tokio::test]
    async fn duplicate_success_is_idempotent() {
        let (reconciler, storage) = reconciler();
        let staged = reconciler.stage(draft(50_000), vec![], None).unwrap();
        let callback = success_callback(&staged.token, 55_000);

        let first = reconciler.reconcile(&callback).await.unwrap();
        let second = reconciler.reconcile(&callback).await.unwrap();

        let (
            ReconcileOutcome::Settled {
                order_id: first_order,
                bill_id: first_bill,
                ..
            },
            ReconcileOutcome::Settled {
                order_id: second_order,
                bill_id: second_bill,
                ..
            },
        ) = (first, second)
        else {
            panic!("expected both settled");
        };
        assert_eq!(first_order, second_order);
        assert_eq!(first_bill, second_bill);
        // Exactly one bill exists for that order
        assert_eq!(storage.find_bill_by_order(first_order).unwrap(), Some(first_bill));
    }

    #[tokio::test]
    async fn expired_checkout_is_discarded() {
        let (reconciler, storage) = reconciler();
        let pending = PendingCheckout {
            draft: draft(50_000),
            cart_line_ids: vec![],
            amount: 55_000,
            created_at: now_millis() - 10 * 60 * 1000,
        };
        storage.put_pending_checkout("old-token", &pending).unwrap();

        let result = reconciler
            .reconcile(&success_callback("old-token", 55_000))
            .await;
        assert!(matches!(result, Err(CheckoutError::Expired(_))));
        assert!(storage.get_pending_checkout("old-token").unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_token_is_not_found() {
        let (reconciler, _) = reconciler();
        let result = reconciler
            .reconcile(&success_callback("no-such-token", 1_000))
            .await;
        assert!(matches!(result, Err(CheckoutError::NotFound(_))));
    }

    #[tokio::test]
    async fn amount_mismatch_fails_closed() {
        let (reconciler, storage) = reconciler();
        let staged = reconciler.stage(draft(50_000), vec![], None).unwrap();

        let result = reconciler
            .reconcile(&success_callback(&staged.token, 54_000))
            .await;
        assert!(matches!(
            result,
            Err(CheckoutError::AmountMismatch {
                staged: 55_000,
                received: 54_000
            })
        ));
        // Draft kept: the mismatch needs human eyes, not silent consumption
        assert!(storage.get_pending_checkout(&staged.token).unwrap().is_some());
    }

    #[tokio::test]
    async fn tolerance_allows_small_drift() {
        let mut s = settings();
        s.amount_tolerance = 100;
        let (reconciler, _) = reconciler_with(s);
        let staged = reconciler.stage(draft(50_000), vec![], None).unwrap();

        let outcome = reconciler
            .reconcile(&success_callback(&staged.token, 55_050))
            .await
            .unwrap();
        assert!(matches!(outcome, ReconcileOutcome::Settled { amount: 55_050, .. }));
    }

    #[tokio::test]
    async fn restage_invalidates_the_prior_token() {
        let (reconciler, storage) = reconciler();
        let first = reconciler.stage(draft(50_000), vec![], None).unwrap();
        let second = reconciler
            .stage(draft(60_000), vec![], Some(first.token.clone()))
            .unwrap();

        assert!(storage.get_pending_checkout(&first.token).unwrap().is_none());
        let result = reconciler
            .reconcile(&success_callback(&first.token, 55_000))
            .await;
        assert!(matches!(result, Err(CheckoutError::NotFound(_))));

        // The re-staged draft settles normally
        let outcome = reconciler
            .reconcile(&success_callback(&second.token, 66_000))
            .await
            .unwrap();
        assert!(matches!(outcome, ReconcileOutcome::Settled { .. }));
    }

    #[tokio::test]
    async fn stage_rejects_nonpositive_totals() {
        let (reconciler, _) = reconciler();
        assert!(matches!(
            reconciler.stage(draft(0), vec![], None),
            Err(CheckoutError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn stage_rejects_a_discount_larger_than_the_charge() {
        let (reconciler, storage) = reconciler();
        let mut excessive = draft(50_000);
        // The charge would be 55_000 - 100_000, a negative amount
        excessive.discount = 100_000;
        assert!(matches!(
            reconciler.stage(excessive, vec![], None),
            Err(CheckoutError::Validation(_))
        ));

        // The full 55_000 may still be discounted away: amount bottoms at 0
        let mut comped = draft(50_000);
        comped.discount = 55_000;
        let staged = reconciler.stage(comped, vec![], None).unwrap();
        assert_eq!(staged.amount, 0);
        assert!(storage.get_pending_checkout(&staged.token).unwrap().is_some());
    }

    #[tokio::test]
    async fn concurrent_duplicate_callbacks_build_one_bill() {
        let (reconciler, storage) = reconciler();
        let staged = reconciler.stage(draft(50_000), vec![], None).unwrap();
        let callback = success_callback(&staged.token, 55_000);

        let (first, second) = tokio::join!(
            reconciler.reconcile(&callback),
            reconciler.reconcile(&callback)
        );
        let (
            ReconcileOutcome::Settled {
                order_id, bill_id, ..
            },
            ReconcileOutcome::Settled {
                bill_id: other_bill,
                ..
            },
        ) = (first.unwrap(), second.unwrap())
        else {
            panic!("expected both settled");
        };
        assert_eq!(bill_id, other_bill);
        assert_eq!(storage.find_bill_by_order(order_id).unwrap(), Some(bill_id));
    }
}
