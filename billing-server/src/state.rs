//! Server state
//!
//! [`ServerState`] holds shared references to every service the HTTP layer
//! needs. All fields are cheap to clone (`Arc` or small structs), so the
//! state itself is the axum router state.

use crate::bills::BillManager;
use crate::checkout::{CheckoutSettings, PaymentReconciler};
use crate::config::Config;
use crate::orders::{CartService, LocalCartService, LocalOrderService, OrderService};
use crate::storage::BillStorage;
use chrono_tz::Tz;
use rust_decimal::Decimal;
use shared::models::BranchContext;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub storage: BillStorage,
    pub bills: BillManager,
    pub reconciler: Arc<PaymentReconciler>,
    pub orders: Arc<dyn OrderService>,
    pub carts: Arc<dyn CartService>,
    pub branch: BranchContext,
    /// Startup time in epoch millis, reported by the health endpoint
    pub started_at: i64,
}

impl ServerState {
    /// Initialize every service from configuration
    ///
    /// Creates the working directory and opens (or creates) the database
    /// file inside it. A bad timezone or tax rate falls back to a safe
    /// default with a warning rather than refusing to start.
    pub async fn initialize(config: &Config) -> Self {
        if let Err(e) = std::fs::create_dir_all(&config.work_dir) {
            tracing::warn!(dir = %config.work_dir, error = %e, "Could not create work dir");
        }
        let db_path = std::path::Path::new(&config.work_dir).join("billing.redb");
        let storage = match BillStorage::open(&db_path) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(path = %db_path.display(), error = %e, "Failed to open database");
                panic!("cannot start without a database: {}", e);
            }
        };
        Self::with_storage(config.clone(), storage)
    }

    /// Build the state on top of an already-open database
    ///
    /// Tests use this with an in-memory backend.
    pub fn with_storage(config: Config, storage: BillStorage) -> Self {
        let tz = Tz::from_str(&config.timezone).unwrap_or_else(|_| {
            tracing::warn!(timezone = %config.timezone, "Unknown timezone, falling back to UTC");
            Tz::UTC
        });
        let tax_rate = Decimal::from_str(&config.tax_rate_percent).unwrap_or_else(|_| {
            tracing::warn!(rate = %config.tax_rate_percent, "Bad tax rate, falling back to 0");
            Decimal::ZERO
        });

        let branch = BranchContext {
            id: config.branch_id,
            code: config.branch_code.clone(),
        };
        let bills = BillManager::new(storage.clone(), tax_rate, tz);
        let orders: Arc<dyn OrderService> = Arc::new(LocalOrderService::new(storage.clone()));
        let carts: Arc<dyn CartService> = Arc::new(LocalCartService::new(storage.clone()));
        let reconciler = Arc::new(PaymentReconciler::new(
            storage.clone(),
            bills.clone(),
            orders.clone(),
            carts.clone(),
            branch.clone(),
            CheckoutSettings {
                success_code: config.gateway_success_code.clone(),
                redirect_url: config.gateway_redirect_url.clone(),
                ttl_ms: config.checkout_ttl_ms,
                amount_tolerance: config.amount_tolerance_minor,
                tax_rate,
            },
        ));

        tracing::info!(
            branch = %branch.code,
            timezone = %tz,
            tax_rate = %tax_rate,
            "Server state initialized"
        );

        Self {
            config,
            storage,
            bills,
            reconciler,
            orders,
            carts,
            branch,
            started_at: shared::util::now_millis(),
        }
    }
}
