//! Billing server - bill lifecycle and wallet payment reconciliation
//!
//! # Module structure
//!
//! ```text
//! billing-server/src/
//! ├── config.rs      # Environment-driven configuration
//! ├── logger.rs      # tracing setup
//! ├── storage.rs     # redb tables and transactions
//! ├── bills/         # Bill aggregate: issue, payments, audited edits
//! ├── checkout/      # Wallet checkout staging and reconciliation
//! ├── orders/        # Order and cart collaborators
//! ├── api/           # HTTP routes and handlers
//! ├── state.rs       # Shared server state
//! └── server.rs      # HTTP server startup
//! ```
//!
//! Every bill mutation goes through [`BillManager`]; every wallet callback
//! goes through [`PaymentReconciler`]. The HTTP layer holds no business
//! rules of its own.

pub mod api;
pub mod bills;
pub mod checkout;
pub mod config;
pub mod logger;
pub mod orders;
pub mod server;
pub mod state;
pub mod storage;

pub use bills::BillManager;
pub use checkout::PaymentReconciler;
pub use config::Config;
pub use logger::init_logger_with_file;
pub use server::Server;
pub use state::ServerState;
pub use storage::BillStorage;

/// Load .env, make sure the working directory exists, start logging
pub fn setup_environment() -> std::io::Result<()> {
    dotenv::dotenv().ok();

    let work_dir = std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/billing".into());
    std::fs::create_dir_all(&work_dir)?;

    let log_dir = std::path::Path::new(&work_dir).join("logs");
    std::fs::create_dir_all(&log_dir)?;
    init_logger_with_file(None, log_dir.to_str());

    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
    ____  _ ____
   / __ )(_) / /_  ____  ____ _
  / __  / / / / / / __ \/ __ `/
 / /_/ / / / / /_/ / / / /_/ /
/_____/_/_/_/\__,_/_/ /_/\__, /
                        /____/
    "#
    );
}
