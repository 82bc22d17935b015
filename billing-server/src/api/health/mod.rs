//! Health check routes (public, no authentication)

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::state::ServerState;
use shared::util::now_millis;

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/health", get(health))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    branch: String,
    environment: String,
    uptime_seconds: i64,
}

async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        branch: state.branch.code.clone(),
        environment: state.config.environment.clone(),
        uptime_seconds: (now_millis() - state.started_at) / 1000,
    })
}
