//! Bill API module
//!
//! # Routes
//!
//! | Path | Method | Purpose |
//! |------|--------|---------|
//! | /api/bills | POST | Issue a bill for a completed order |
//! | /api/bills/{id} | GET | Current bill state |
//! | /api/bills/{id} | PATCH | Audited partial edit |
//! | /api/bills/{id}/payment | POST | Record a payment |
//! | /api/bills/{id}/print | POST | Count a print |
//! | /api/bills/{id}/cancel | POST | Cancel (terminal) |
//! | /api/bills/{id}/refund | POST | Refund a paid bill (terminal) |
//! | /api/bills/{id}/audit | GET | Full edit history |
//! | /api/bills/{id}/audit/{version} | GET | Snapshot after one edit |

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/bills", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", post(handler::issue))
        .route("/{id}", get(handler::get_by_id).patch(handler::edit))
        .route("/{id}/payment", post(handler::record_payment))
        .route("/{id}/print", post(handler::mark_printed))
        .route("/{id}/cancel", post(handler::cancel))
        .route("/{id}/refund", post(handler::refund))
        .route("/{id}/audit", get(handler::audit_history))
        .route("/{id}/audit/{version}", get(handler::audit_at))
}
