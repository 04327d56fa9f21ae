//! Fixed-window rate limiting logic and per-key state.

mod clock;
mod decision;
mod limiter;
mod limits;
mod window;

pub use clock::{Clock, ManualClock, SystemClock};
pub use decision::Decision;
pub use limiter::RateLimiter;
pub use limits::{LimitSettings, LimitSource, SharedLimits, DEFAULT_LIMIT, DEFAULT_WINDOW};
pub use window::{Window, WindowStore};
