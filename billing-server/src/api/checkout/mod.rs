//! Checkout API module
//!
//! # Routes
//!
//! | Path | Method | Purpose |
//! |------|--------|---------|
//! | /api/checkout/stage | POST | Stage an order draft before the redirect |
//! | /api/checkout/callback | POST | Gateway payment-result callback |

mod handler;

use axum::{Router, routing::post};

use crate::state::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/checkout", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/stage", post(handler::stage))
        .route("/callback", post(handler::callback))
}
