//! Order and cart collaborators
//!
//! The reconciler never touches order rows directly; it goes through these
//! traits so the order subsystem can live in another process later without
//! changing the checkout flow. The local implementations store rows in the
//! same redb database.

use crate::storage::BillStorage;
use async_trait::async_trait;
use shared::error::{AppError, ErrorCode};
use shared::models::{Order, OrderDraft, OrderPaymentState, OrderStatus};
use shared::util::{now_millis, snowflake_id};

/// Order creation and lookup as the billing domain needs it
#[async_trait]
pub trait OrderService: Send + Sync {
    /// Create an order from a staged draft
    ///
    /// Wallet orders only materialize after the gateway confirms payment,
    /// so the created order is born with its payment captured; it still
    /// needs [`mark_completed`](OrderService::mark_completed) before a bill
    /// can be issued for it.
    async fn create_order(&self, draft: &OrderDraft) -> Result<Order, AppError>;

    async fn get_order(&self, order_id: i64) -> Result<Option<Order>, AppError>;

    /// Move an order to its terminal completed status
    async fn mark_completed(&self, order_id: i64) -> Result<Order, AppError>;
}

/// Cart cleanup after a successful checkout
#[async_trait]
pub trait CartService: Send + Sync {
    /// Remove the cart lines consumed by a settled checkout
    async fn clear_lines(&self, line_ids: &[i64]) -> Result<(), AppError>;
}

/// In-process order collaborator backed by the shared database
#[derive(Clone)]
pub struct LocalOrderService {
    storage: BillStorage,
}

impl LocalOrderService {
    pub fn new(storage: BillStorage) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl OrderService for LocalOrderService {
    async fn create_order(&self, draft: &OrderDraft) -> Result<Order, AppError> {
        let order = Order {
            id: snowflake_id(),
            status: OrderStatus::Pending,
            payment_state: OrderPaymentState::Paid,
            payment_method: draft.payment_method,
            total: draft.total,
            discount: draft.discount,
            customer_name: draft.customer_name.clone(),
            customer_phone: draft.customer_phone.clone(),
            customer_email: draft.customer_email.clone(),
            customer_address: draft.customer_address.clone(),
            created_at: now_millis(),
        };
        self.storage.put_order(&order).map_err(|e| {
            tracing::error!(error = %e, "Failed to persist order");
            AppError::with_message(ErrorCode::OrderCreationFailed, e.to_string())
        })?;
        tracing::info!(order_id = order.id, total = order.total, "Order created from checkout");
        Ok(order)
    }

    async fn get_order(&self, order_id: i64) -> Result<Option<Order>, AppError> {
        self.storage
            .get_order(order_id)
            .map_err(|e| AppError::database(e.to_string()))
    }

    async fn mark_completed(&self, order_id: i64) -> Result<Order, AppError> {
        let mut order = self
            .storage
            .get_order(order_id)
            .map_err(|e| AppError::database(e.to_string()))?
            .ok_or_else(|| {
                AppError::with_message(
                    ErrorCode::OrderNotFound,
                    format!("Order not found: {}", order_id),
                )
            })?;
        order.status = OrderStatus::Completed;
        self.storage
            .put_order(&order)
            .map_err(|e| AppError::database(e.to_string()))?;
        Ok(order)
    }
}

/// In-process cart collaborator backed by the shared database
#[derive(Clone)]
pub struct LocalCartService {
    storage: BillStorage,
}

impl LocalCartService {
    pub fn new(storage: BillStorage) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl CartService for LocalCartService {
    async fn clear_lines(&self, line_ids: &[i64]) -> Result<(), AppError> {
        self.storage
            .remove_cart_lines(line_ids)
            .map_err(|e| AppError::database(e.to_string()))?;
        tracing::debug!(count = line_ids.len(), "Cart lines cleared");
        Ok(())
    }
}
