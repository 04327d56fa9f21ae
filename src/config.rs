//! Configuration management for Tollgate.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, TollgateError};
use crate::ratelimit::{LimitSettings, SharedLimits, DEFAULT_LIMIT, DEFAULT_WINDOW};

/// Prefix for environment variable overrides, e.g. `TOLLGATE_RATE_LIMITING__LIMIT`.
pub const ENV_PREFIX: &str = "TOLLGATE";

/// Main configuration for the Tollgate service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TollgateConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server address
    #[serde(default = "default_http_addr")]
    pub http_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
        }
    }
}

fn default_http_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

/// Rate limiting configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// Maximum permits per window
    #[serde(default = "default_limit")]
    pub limit: u64,

    /// Window length in milliseconds
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    /// How often to re-read the configuration file, 0 disables reloading
    #[serde(default)]
    pub config_reload_interval_secs: u64,

    /// How often to drop expired windows, 0 disables sweeping
    #[serde(default)]
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            window_ms: default_window_ms(),
            config_reload_interval_secs: 0,
            sweep_interval_secs: 0,
        }
    }
}

fn default_limit() -> u64 {
    DEFAULT_LIMIT
}

fn default_window_ms() -> u64 {
    DEFAULT_WINDOW.as_millis() as u64
}

impl RateLimitingConfig {
    /// The limiter settings described by this section.
    ///
    /// Values are passed through unchecked; the limiter rejects invalid ones
    /// on every call.
    pub fn limits(&self) -> LimitSettings {
        LimitSettings::new(self.limit, Duration::from_millis(self.window_ms))
    }
}

impl TollgateConfig {
    /// Load configuration from defaults, an optional file and the environment.
    ///
    /// Later sources override earlier ones. The file format is inferred from
    /// its extension.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            info!(path = %path.display(), "Loading configuration file");
            builder = builder.add_source(config::File::from(path));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| {
            TollgateError::ConfigLoad(format!("Failed to parse configuration: {}", e))
        })
    }
}

/// Periodically re-read `path` and publish its rate limits into `limits`.
///
/// Files that fail to load are logged and skipped, leaving the previous
/// settings in place.
pub async fn reload_limits(path: PathBuf, limits: SharedLimits, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    // The first tick completes immediately and the startup load already ran
    ticker.tick().await;

    loop {
        ticker.tick().await;

        match TollgateConfig::load(Some(&path)) {
            Ok(config) => {
                let updated = config.rate_limiting.limits();
                let previous = limits.replace(updated);
                if previous != updated {
                    info!(
                        limit = updated.limit,
                        window_ms = config.rate_limiting.window_ms,
                        "Applied reloaded rate limits"
                    );
                }
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Configuration reload failed");
            }
        }
    }
}
