//! Server configuration
//!
//! All settings load from environment variables with sensible defaults:
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | WORK_DIR | /var/lib/billing | Working directory (database, logs) |
//! | HTTP_PORT | 3000 | HTTP API port |
//! | BRANCH_ID | 1 | Numeric branch id stamped on bills |
//! | BRANCH_CODE | HQ | Short code embedded in bill numbers |
//! | TIMEZONE | UTC | Venue timezone; decides the business day |
//! | TAX_RATE_PERCENT | 10 | Tax rate applied at issue time |
//! | CHECKOUT_TTL_MS | 900000 | Staged checkout lifetime (15 min) |
//! | GATEWAY_SUCCESS_CODE | 00 | Gateway result code meaning success |
//! | GATEWAY_REDIRECT_URL | https://localhost/pay | Redirect base URL |
//! | AMOUNT_TOLERANCE_MINOR | 0 | Allowed staged/callback amount drift |
//! | ENVIRONMENT | development | development \| staging \| production |
//! | SHUTDOWN_TIMEOUT_MS | 10000 | Graceful shutdown deadline |

#[derive(Debug, Clone)]
pub struct Config {
    /// Working directory for the database and log files
    pub work_dir: String,
    /// HTTP API port
    pub http_port: u16,
    /// Branch identity stamped on every bill
    pub branch_id: i64,
    pub branch_code: String,
    /// IANA timezone name, e.g. "Asia/Ho_Chi_Minh"
    pub timezone: String,
    /// Tax rate in percent, as a decimal string ("10" or "8.5")
    pub tax_rate_percent: String,
    /// Staged checkout lifetime in milliseconds
    pub checkout_ttl_ms: i64,
    /// Gateway result code that means "payment captured"
    pub gateway_success_code: String,
    /// Base URL the customer is sent to; the token is appended
    pub gateway_redirect_url: String,
    /// Allowed absolute drift between staged and callback amounts
    pub amount_tolerance_minor: i64,
    /// development | staging | production
    pub environment: String,
    /// Graceful shutdown deadline in milliseconds
    pub shutdown_timeout_ms: u64,
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/billing".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            branch_id: std::env::var("BRANCH_ID")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(1),
            branch_code: std::env::var("BRANCH_CODE").unwrap_or_else(|_| "HQ".into()),
            timezone: std::env::var("TIMEZONE").unwrap_or_else(|_| "UTC".into()),
            tax_rate_percent: std::env::var("TAX_RATE_PERCENT").unwrap_or_else(|_| "10".into()),
            checkout_ttl_ms: std::env::var("CHECKOUT_TTL_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(15 * 60 * 1000),
            gateway_success_code: std::env::var("GATEWAY_SUCCESS_CODE")
                .unwrap_or_else(|_| "00".into()),
            gateway_redirect_url: std::env::var("GATEWAY_REDIRECT_URL")
                .unwrap_or_else(|_| "https://localhost/pay".into()),
            amount_tolerance_minor: std::env::var("AMOUNT_TOLERANCE_MINOR")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(0),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            shutdown_timeout_ms: std::env::var("SHUTDOWN_TIMEOUT_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(10000),
        }
    }

    /// Override the filesystem and network bindings, keeping everything
    /// else from the environment. Used by tests.
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
