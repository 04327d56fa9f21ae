//! Rate-limited HTTP endpoints.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::error::ApiError;
use crate::ratelimit::{Decision, RateLimiter};

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Key used when a request does not name its client.
pub const ANONYMOUS_CLIENT: &str = "anonymous";

fn default_client_id() -> String {
    ANONYMOUS_CLIENT.to_string()
}

fn default_cost() -> i64 {
    1
}

/// Query parameters of the rate-limited endpoint.
#[derive(Debug, Deserialize)]
pub struct DemoParams {
    #[serde(rename = "clientId", default = "default_client_id")]
    pub client_id: String,
    #[serde(default = "default_cost")]
    pub cost: i64,
}

/// Query parameters of the status endpoint.
#[derive(Debug, Deserialize)]
pub struct StatusParams {
    #[serde(rename = "clientId", default = "default_client_id")]
    pub client_id: String,
}

/// Snapshot of a client's quota.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub client_id: String,
    pub limit: u64,
    /// Window length as an ISO-8601 duration
    pub window: String,
    pub window_millis: u64,
    pub remaining: u64,
    pub allowed: bool,
    pub reset_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

fn rate_limit_headers(limit: u64, decision: &Decision) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(decision.remaining));
    headers.insert(X_RATELIMIT_RESET, HeaderValue::from(decision.reset_at.timestamp()));
    headers
}

/// Consume `cost` permits for the client and report the outcome.
pub async fn demo(
    State(limiter): State<Arc<RateLimiter>>,
    Query(params): Query<DemoParams>,
) -> Result<Response, ApiError> {
    if params.cost <= 0 {
        warn!(client_id = %params.client_id, cost = params.cost, "Rejected non-positive cost");
        return Ok((StatusCode::BAD_REQUEST, "cost must be greater than zero").into_response());
    }

    let decision = limiter.evaluate(&params.client_id, params.cost as u64)?;
    let mut headers = rate_limit_headers(limiter.limits().limit, &decision);

    if decision.allowed {
        let body = format!("Request accepted for client {}", params.client_id);
        return Ok((StatusCode::OK, headers, body).into_response());
    }

    let retry_after = decision.retry_after_secs(limiter.now());
    headers.insert(RETRY_AFTER, HeaderValue::from(retry_after));
    debug!(client_id = %params.client_id, retry_after = retry_after, "Request rate limited");

    let body = format!(
        "Too many requests. Try again after {}",
        decision.reset_at.to_rfc3339()
    );
    Ok((StatusCode::TOO_MANY_REQUESTS, headers, body).into_response())
}

/// Report the client's quota without consuming a permit.
pub async fn status(
    State(limiter): State<Arc<RateLimiter>>,
    Query(params): Query<StatusParams>,
) -> Result<Response, ApiError> {
    let decision = limiter.inspect(&params.client_id)?;
    let settings = limiter.limits();
    let headers = rate_limit_headers(settings.limit, &decision);

    let window = chrono::Duration::from_std(settings.window)
        .map(|window| window.to_string())
        .unwrap_or_default();

    let body = StatusResponse {
        client_id: params.client_id,
        limit: settings.limit,
        window,
        window_millis: settings.window.as_millis() as u64,
        remaining: decision.remaining,
        allowed: decision.allowed,
        reset_at: decision.reset_at,
    };

    Ok((StatusCode::OK, headers, Json(body)).into_response())
}

/// Check server health.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
