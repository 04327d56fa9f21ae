//! The outcome of a rate limit check.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Result of evaluating or inspecting a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    /// Whether the request was (or would be) admitted
    pub allowed: bool,
    /// Permits left in the current window after this call
    pub remaining: u64,
    /// Exclusive end of the current window
    pub reset_at: DateTime<Utc>,
}

impl Decision {
    pub fn new(allowed: bool, remaining: u64, reset_at: DateTime<Utc>) -> Self {
        Self {
            allowed,
            remaining,
            reset_at,
        }
    }

    /// Whole seconds a rejected caller should wait before retrying, never negative.
    pub fn retry_after_secs(&self, now: DateTime<Utc>) -> u64 {
        (self.reset_at.timestamp() - now.timestamp()).max(0) as u64
    }
}
