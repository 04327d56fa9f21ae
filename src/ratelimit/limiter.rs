//! Core fixed-window rate limiter.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use super::clock::{Clock, SystemClock};
use super::decision::Decision;
use super::limits::{LimitSettings, LimitSource};
use super::window::{Window, WindowStore};
use crate::error::{Result, TollgateError};

/// The fixed-window rate limiter.
///
/// Every key gets the same quota: at most `limit` permits per window, where
/// windows are aligned to multiples of the window length since the Unix
/// epoch. This struct is thread-safe and can be shared across tasks.
pub struct RateLimiter {
    /// Per-key windows
    store: WindowStore,
    /// Limit and window length, read on every call
    limits: Arc<dyn LimitSource>,
    /// Time source for window alignment
    clock: Arc<dyn Clock>,
}

/// Boundaries of the window containing the current instant.
#[derive(Debug, Clone, Copy)]
struct WindowBounds {
    now_ms: i64,
    window_ms: i64,
    window_start: i64,
    reset_at: DateTime<Utc>,
}

impl WindowBounds {
    /// The window a key is counting against right now, given what is stored.
    ///
    /// A missing or expired record means the key starts over at zero.
    fn resolve(&self, key: &str, stored: Option<Window>) -> Window {
        match stored {
            Some(window) if !window.is_expired(self.now_ms, self.window_ms) => window,
            Some(window) => {
                debug!(
                    key = %key,
                    previous_start = window.window_start,
                    window_start = self.window_start,
                    "Rolling over expired window"
                );
                Window::fresh(self.window_start)
            }
            None => Window::fresh(self.window_start),
        }
    }
}

impl RateLimiter {
    /// Create a rate limiter reading wall-clock UTC time.
    pub fn new(limits: impl LimitSource + 'static) -> Self {
        Self::with_clock(limits, SystemClock)
    }

    /// Create a rate limiter with an explicit time source.
    pub fn with_clock(limits: impl LimitSource + 'static, clock: impl Clock + 'static) -> Self {
        Self {
            store: WindowStore::new(),
            limits: Arc::new(limits),
            clock: Arc::new(clock),
        }
    }

    /// Consume a single permit for `key`.
    pub fn evaluate_one(&self, key: &str) -> Result<Decision> {
        self.evaluate(key, 1)
    }

    /// Try to consume `permits` for `key` in the current window.
    ///
    /// The request is admitted only if all of its permits fit in what is left
    /// of the window; a rejected request consumes nothing. A request costing
    /// more than the whole limit is always rejected.
    pub fn evaluate(&self, key: &str, permits: u64) -> Result<Decision> {
        validate_key(key)?;
        if permits == 0 {
            return Err(TollgateError::InvalidArgument(
                "permits must be greater than zero".to_string(),
            ));
        }

        let settings = self.limits.limits();
        let bounds = self.current_bounds(&settings)?;
        let limit = settings.limit;

        let (allowed, count) = self.store.update(key, |stored| {
            let current = bounds.resolve(key, stored);
            let allowed = permits <= limit && current.count.saturating_add(permits) <= limit;
            let count = if allowed {
                current.count + permits
            } else {
                current.count
            };

            // Written back even on rejection so a rollover is persisted
            let updated = Window {
                window_start: bounds.window_start,
                count,
            };
            (updated, (allowed, count))
        });

        trace!(
            key = %key,
            permits = permits,
            count = count,
            limit = limit,
            allowed = allowed,
            "Evaluated rate limit"
        );

        if !allowed {
            debug!(key = %key, permits = permits, "Rate limit exceeded");
        }

        Ok(Decision::new(
            allowed,
            limit.saturating_sub(count),
            bounds.reset_at,
        ))
    }

    /// Report what a zero-cost probe would see for `key`, without changing anything.
    pub fn inspect(&self, key: &str) -> Result<Decision> {
        validate_key(key)?;

        let settings = self.limits.limits();
        let bounds = self.current_bounds(&settings)?;

        let count = match self.store.get(key) {
            Some(window) if !window.is_expired(bounds.now_ms, bounds.window_ms) => window.count,
            _ => 0,
        };
        let remaining = settings.limit.saturating_sub(count);

        trace!(key = %key, count = count, remaining = remaining, "Inspected rate limit");

        Ok(Decision::new(remaining > 0, remaining, bounds.reset_at))
    }

    /// Drop windows that have already ended.
    ///
    /// An expired window and a missing one resolve identically, so this only
    /// reclaims memory. Returns the number of windows removed.
    pub fn purge_stale(&self) -> Result<usize> {
        let bounds = self.current_bounds(&self.limits.limits())?;

        let mut removed = 0;
        self.store.retain(|_, window| {
            let keep = !window.is_expired(bounds.now_ms, bounds.window_ms);
            if !keep {
                removed += 1;
            }
            keep
        });

        debug!(removed = removed, remaining = self.store.len(), "Purged stale windows");
        Ok(removed)
    }

    /// Snapshot of the settings currently in effect.
    pub fn limits(&self) -> LimitSettings {
        self.limits.limits()
    }

    /// The limiter's notion of the current time.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Get the number of keys with a stored window.
    pub fn tracked_keys(&self) -> usize {
        self.store.len()
    }

    /// Clear all windows.
    ///
    /// This is primarily useful for testing.
    pub fn clear(&self) {
        self.store.clear();
    }

    fn current_bounds(&self, settings: &LimitSettings) -> Result<WindowBounds> {
        let window_ms = settings.validated_window_ms()?;
        let now_ms = self.clock.now().timestamp_millis();
        let window_start = now_ms - now_ms.rem_euclid(window_ms);

        let reset_at = window_start
            .checked_add(window_ms)
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .ok_or_else(|| {
                TollgateError::InvalidConfiguration(format!(
                    "window of {window_ms}ms ends outside the representable time range"
                ))
            })?;

        Ok(WindowBounds {
            now_ms,
            window_ms,
            window_start,
            reset_at,
        })
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(TollgateError::InvalidArgument(
            "key must be provided".to_string(),
        ));
    }
    Ok(())
}
