use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tollgate::config::{reload_limits, TollgateConfig};
use tollgate::http::HttpServer;
use tollgate::ratelimit::{RateLimiter, SharedLimits};

/// Fixed-window rate limiting service.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Path to a configuration file (YAML, TOML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the HTTP listen address
    #[arg(long)]
    http_addr: Option<SocketAddr>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if args.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_thread_ids(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(true)
            .init();
    }

    info!("Starting Tollgate Rate Limiting Service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config = TollgateConfig::load(args.config.as_deref())?;
    if let Some(addr) = args.http_addr {
        config.server.http_addr = addr;
    }
    info!(
        http_addr = %config.server.http_addr,
        limit = config.rate_limiting.limit,
        window_ms = config.rate_limiting.window_ms,
        "Configuration loaded"
    );

    let settings = config.rate_limiting.limits();
    let limits = SharedLimits::new(settings);
    if let Err(e) = settings.validated_window_ms() {
        warn!(error = %e, "Rate limits are invalid; every check will fail until corrected");
    }

    let rate_limiter = Arc::new(RateLimiter::new(limits.clone()));
    info!("Rate limiter initialized");

    let reload_secs = config.rate_limiting.config_reload_interval_secs;
    match (&args.config, reload_secs) {
        (Some(path), secs) if secs > 0 => {
            info!(path = %path.display(), interval_secs = secs, "Watching configuration for changes");
            tokio::spawn(reload_limits(
                path.clone(),
                limits,
                Duration::from_secs(secs),
            ));
        }
        (None, secs) if secs > 0 => {
            warn!("Configuration reload requested without a configuration file; ignoring");
        }
        _ => {}
    }

    let sweep_secs = config.rate_limiting.sweep_interval_secs;
    if sweep_secs > 0 {
        info!(interval_secs = sweep_secs, "Sweeping stale windows periodically");
        tokio::spawn(sweep_stale_windows(
            rate_limiter.clone(),
            Duration::from_secs(sweep_secs),
        ));
    }

    let http_server = HttpServer::new(config.server.http_addr, rate_limiter);

    // Run the server with graceful shutdown on Ctrl+C
    http_server.serve_with_shutdown(shutdown_signal()).await?;

    info!("Tollgate Rate Limiting Service stopped");
    Ok(())
}

/// Drop expired windows on a fixed interval.
async fn sweep_stale_windows(rate_limiter: Arc<RateLimiter>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        if let Err(e) = rate_limiter.purge_stale() {
            warn!(error = %e, "Skipping stale window sweep");
        }
    }
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
