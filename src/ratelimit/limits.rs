//! Limit settings and the sources the limiter reads them from.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::error::{Result, TollgateError};

/// Default number of permits per window.
pub const DEFAULT_LIMIT: u64 = 10;
/// Default window length.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// The global quota shared by every key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitSettings {
    /// Maximum permits per window
    pub limit: u64,
    /// Length of each window
    pub window: Duration,
}

impl LimitSettings {
    pub fn new(limit: u64, window: Duration) -> Self {
        Self { limit, window }
    }

    /// Window length in whole milliseconds, after checking both settings.
    pub fn validated_window_ms(&self) -> Result<i64> {
        if self.limit == 0 {
            return Err(TollgateError::InvalidConfiguration(
                "limit must be greater than zero".to_string(),
            ));
        }

        let window_ms = self.window.as_millis();
        if window_ms == 0 {
            return Err(TollgateError::InvalidConfiguration(format!(
                "window must be at least one millisecond, got {:?}",
                self.window
            )));
        }

        i64::try_from(window_ms).map_err(|_| {
            TollgateError::InvalidConfiguration(format!("window {:?} is too large", self.window))
        })
    }
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            window: DEFAULT_WINDOW,
        }
    }
}

/// Where the limiter reads its settings from.
///
/// Settings are read on every call, so a source that changes underneath the
/// limiter takes effect on the next evaluation.
pub trait LimitSource: Send + Sync {
    fn limits(&self) -> LimitSettings;
}

impl LimitSource for LimitSettings {
    fn limits(&self) -> LimitSettings {
        *self
    }
}

/// Settings that can be swapped at runtime, e.g. by a config reload task.
#[derive(Debug, Clone, Default)]
pub struct SharedLimits {
    inner: Arc<RwLock<LimitSettings>>,
}

impl SharedLimits {
    pub fn new(settings: LimitSettings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    /// Replace the current settings, returning the previous ones.
    pub fn replace(&self, settings: LimitSettings) -> LimitSettings {
        std::mem::replace(&mut *self.inner.write(), settings)
    }
}

impl LimitSource for SharedLimits {
    fn limits(&self) -> LimitSettings {
        *self.inner.read()
    }
}
