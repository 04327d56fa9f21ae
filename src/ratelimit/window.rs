//! Per-key window records and the store that owns them.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// The window a key is currently counting against.
///
/// Windows are immutable values: every change replaces the stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// Aligned start of the window, in milliseconds since the Unix epoch
    pub window_start: i64,
    /// Permits consumed so far in this window
    pub count: u64,
}

impl Window {
    /// A window starting at `window_start` with nothing consumed.
    pub fn fresh(window_start: i64) -> Self {
        Self {
            window_start,
            count: 0,
        }
    }

    /// Whether this window has ended at `now_ms` for a window length of `window_ms`.
    pub fn is_expired(&self, now_ms: i64, window_ms: i64) -> bool {
        self.window_start.saturating_add(window_ms) <= now_ms
    }
}

/// Mapping from rate limit key to that key's current [`Window`].
///
/// The store holds no windowing logic. Keys are compared by exact value and
/// entries are never expired on their own.
#[derive(Debug, Default)]
pub struct WindowStore {
    windows: DashMap<String, Window>,
}

impl WindowStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the window stored for `key`, if any.
    pub fn get(&self, key: &str) -> Option<Window> {
        self.windows.get(key).map(|entry| *entry.value())
    }

    /// Replace the window for `key` with the one computed by `f`.
    ///
    /// `f` receives the stored window (if any) and runs while the key's entry
    /// is exclusively locked, so no other `update` or `get` on the same key can
    /// interleave between the read and the write.
    pub fn update<R>(&self, key: &str, f: impl FnOnce(Option<Window>) -> (Window, R)) -> R {
        match self.windows.entry(key.to_owned()) {
            Entry::Occupied(mut entry) => {
                let (window, result) = f(Some(*entry.get()));
                entry.insert(window);
                result
            }
            Entry::Vacant(entry) => {
                let (window, result) = f(None);
                entry.insert(window);
                result
            }
        }
    }

    /// Keep only the windows for which `keep` returns `true`.
    pub fn retain(&self, mut keep: impl FnMut(&str, &Window) -> bool) {
        self.windows.retain(|key, window| keep(key, window));
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Drop every stored window.
    pub fn clear(&self) {
        self.windows.clear();
    }
}
