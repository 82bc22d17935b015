//! HTTP API routes
//!
//! # Structure
//!
//! - [`bills`] - bill lifecycle, edits and audit history
//! - [`checkout`] - wallet checkout staging and gateway callback
//! - [`health`] - health checks (public)

use axum::Router;
use http::{HeaderName, HeaderValue};
use tower_http::cors::CorsLayer;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::state::ServerState;
use shared::error::AppError;

pub mod bills;
pub mod checkout;
pub mod health;

/// Request ID generator
#[derive(Clone)]
struct XRequestId;

impl MakeRequestId for XRequestId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Unmatched paths answer in the error wire shape, not an empty 404
async fn fallback() -> AppError {
    AppError::not_found("Route")
}

/// All routes, no middleware, no state
pub fn build_router() -> Router<ServerState> {
    Router::new()
        .merge(bills::router())
        .merge(checkout::router())
        .merge(health::router())
        .fallback(fallback)
}

/// Fully configured application with middleware
pub fn build_app() -> Router<ServerState> {
    build_router()
        // CORS - handle cross-origin requests
        .layer(CorsLayer::permissive())
        // Trace - request tracing (logs at INFO level)
        .layer(TraceLayer::new_for_http())
        // Request ID - unique per request, propagated to the response
        .layer(SetRequestIdLayer::new(
            HeaderName::from_static("x-request-id"),
            XRequestId,
        ))
        .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
            "x-request-id",
        )))
}
