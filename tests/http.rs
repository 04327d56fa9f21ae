//! Integration tests for the Tollgate HTTP API.
//!
//! Each test starts a server on an ephemeral port with a fixed clock and uses
//! reqwest to exercise the endpoints.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tokio::net::TcpListener;

use tollgate::ratelimit::{LimitSettings, ManualClock, RateLimiter, SharedLimits};

fn start() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

/// Boots a server whose limiter reads `limits`.
/// Returns the base URL and the clock driving the limiter.
async fn spawn_server(limits: SharedLimits) -> (String, ManualClock) {
    let clock = ManualClock::new(start());
    let limiter = Arc::new(RateLimiter::with_clock(limits, clock.clone()));
    let app = tollgate::http::router(limiter);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), clock)
}

fn per_minute(limit: u64) -> SharedLimits {
    SharedLimits::new(LimitSettings::new(limit, Duration::from_secs(60)))
}

fn header(resp: &reqwest::Response, name: &str) -> String {
    resp.headers()
        .get(name)
        .unwrap_or_else(|| panic!("missing {name}"))
        .to_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn health_returns_ok() {
    let (base, _) = spawn_server(per_minute(2)).await;

    let resp = Client::new().get(format!("{base}/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn demo_admits_then_rate_limits() {
    let (base, _) = spawn_server(per_minute(2)).await;
    let client = Client::new();
    let url = format!("{base}/api/demo?clientId=alice");

    let resp = client.get(&url).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(header(&resp, "x-ratelimit-limit"), "2");
    assert_eq!(header(&resp, "x-ratelimit-remaining"), "1");
    assert_eq!(header(&resp, "x-ratelimit-reset"), "1704067260");
    assert!(resp.headers().get("retry-after").is_none());
    assert_eq!(resp.text().await.unwrap(), "Request accepted for client alice");

    client.get(&url).send().await.unwrap();

    let resp = client.get(&url).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(header(&resp, "x-ratelimit-remaining"), "0");
    assert_eq!(header(&resp, "retry-after"), "60");
    let body = resp.text().await.unwrap();
    assert!(body.starts_with("Too many requests. Try again after 2024-01-01T00:01:00"));
}

#[tokio::test]
async fn demo_retry_after_tracks_clock() {
    let (base, clock) = spawn_server(per_minute(1)).await;
    let client = Client::new();
    let url = format!("{base}/api/demo?clientId=bob");

    client.get(&url).send().await.unwrap();
    clock.advance(chrono::Duration::seconds(45));

    let resp = client.get(&url).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(header(&resp, "retry-after"), "15");

    clock.advance(chrono::Duration::seconds(15));
    let resp = client.get(&url).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn demo_defaults_to_anonymous_client() {
    let (base, _) = spawn_server(per_minute(1)).await;
    let client = Client::new();

    let resp = client.get(format!("{base}/api/demo")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "Request accepted for client anonymous");

    let resp = client
        .get(format!("{base}/api/demo?clientId=anonymous"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn demo_cost_consumes_multiple_permits() {
    let (base, _) = spawn_server(per_minute(5)).await;
    let client = Client::new();

    let resp = client
        .get(format!("{base}/api/demo?clientId=carol&cost=3"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(header(&resp, "x-ratelimit-remaining"), "2");

    let resp = client
        .get(format!("{base}/api/demo?clientId=carol&cost=3"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(header(&resp, "x-ratelimit-remaining"), "2");
}

#[tokio::test]
async fn demo_rejects_non_positive_cost() {
    let (base, _) = spawn_server(per_minute(5)).await;
    let client = Client::new();

    for cost in ["0", "-2"] {
        let resp = client
            .get(format!("{base}/api/demo?clientId=dave&cost={cost}"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(resp.text().await.unwrap(), "cost must be greater than zero");
    }

    // Nothing was consumed
    let resp = client
        .get(format!("{base}/api/demo/status?clientId=dave"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["remaining"], 5);
}

#[tokio::test]
async fn demo_rejects_blank_client() {
    let (base, _) = spawn_server(per_minute(5)).await;

    let resp = Client::new()
        .get(format!("{base}/api/demo?clientId=%20"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "invalid_argument");
}

#[tokio::test]
async fn status_reports_snapshot_without_consuming() {
    let (base, _) = spawn_server(per_minute(5)).await;
    let client = Client::new();

    client
        .get(format!("{base}/api/demo?clientId=alice&cost=2"))
        .send()
        .await
        .unwrap();

    for _ in 0..3 {
        let resp = client
            .get(format!("{base}/api/demo/status?clientId=alice"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(header(&resp, "x-ratelimit-limit"), "5");
        assert_eq!(header(&resp, "x-ratelimit-remaining"), "3");
        assert_eq!(header(&resp, "x-ratelimit-reset"), "1704067260");

        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["clientId"], "alice");
        assert_eq!(body["limit"], 5);
        assert_eq!(body["window"], "PT60S");
        assert_eq!(body["windowMillis"], 60_000);
        assert_eq!(body["remaining"], 3);
        assert_eq!(body["allowed"], true);
        assert_eq!(body["resetAt"], "2024-01-01T00:01:00Z");
    }
}

#[tokio::test]
async fn invalid_configuration_is_a_server_error() {
    let limits = per_minute(5);
    let (base, _) = spawn_server(limits.clone()).await;
    let client = Client::new();

    limits.replace(LimitSettings::new(0, Duration::from_secs(60)));

    for path in ["/api/demo", "/api/demo/status"] {
        let resp = client.get(format!("{base}{path}")).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "invalid_configuration");
    }

    limits.replace(LimitSettings::new(5, Duration::from_secs(60)));
    let resp = client.get(format!("{base}/api/demo")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
