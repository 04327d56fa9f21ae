//! HTTP transport for the rate limiter.
//!
//! Maps requests to a key and a cost, asks the [`RateLimiter`] for a
//! decision and projects it onto status codes and `X-RateLimit-*` headers.

mod error;
mod routes;
mod server;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::ratelimit::RateLimiter;

pub use error::{ApiError, ErrorBody};
pub use routes::{
    HealthResponse, StatusResponse, ANONYMOUS_CLIENT, X_RATELIMIT_LIMIT, X_RATELIMIT_REMAINING,
    X_RATELIMIT_RESET,
};
pub use server::HttpServer;

/// Build the service router around a shared limiter.
pub fn router(rate_limiter: Arc<RateLimiter>) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/api/demo", get(routes::demo))
        .route("/api/demo/status", get(routes::status))
        .layer(TraceLayer::new_for_http())
        .with_state(rate_limiter)
}
