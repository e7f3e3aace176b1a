//! Fixed-window keys and boundary arithmetic.

use crate::tier::Endpoint;
use std::fmt;

/// Key identifying one counting window.
///
/// Exactly one window is live per (identity, endpoint) at any instant;
/// past windows are immutable and linger only until pruned.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WindowKey {
    /// Credential key of the caller.
    pub identity: String,
    /// Endpoint the request targets.
    pub endpoint: Endpoint,
    /// Epoch second the window starts at.
    pub window_start: u64,
}

impl WindowKey {
    /// Create a window key.
    #[must_use]
    pub fn new(identity: impl Into<String>, endpoint: Endpoint, window_start: u64) -> Self {
        Self {
            identity: identity.into(),
            endpoint,
            window_start,
        }
    }
}

impl fmt::Display for WindowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.identity, self.endpoint, self.window_start)
    }
}

/// Start of the fixed window containing `now_secs`.
///
/// Windows tile the epoch: `floor(now / window) * window`. Every caller
/// observing the same second lands in the same window.
#[must_use]
pub fn window_start(now_secs: u64, window_secs: u64) -> u64 {
    let window = window_secs.max(1);
    (now_secs / window) * window
}

/// End of the fixed window containing `now_secs`, which is also the start
/// of the next one.
#[must_use]
pub fn window_end(now_secs: u64, window_secs: u64) -> u64 {
    window_start(now_secs, window_secs) + window_secs.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_start_floors_to_boundary() {
        assert_eq!(window_start(0, 900), 0);
        assert_eq!(window_start(899, 900), 0);
        assert_eq!(window_start(900, 900), 900);
        assert_eq!(window_start(1_250, 900), 900);
    }

    #[test]
    fn test_window_end_is_next_boundary() {
        assert_eq!(window_end(0, 900), 900);
        assert_eq!(window_end(899, 900), 900);
        assert_eq!(window_end(900, 900), 1_800);
    }

    #[test]
    fn test_same_window_same_key() {
        let a = WindowKey::new("key-1", Endpoint::Current, window_start(905, 900));
        let b = WindowKey::new("key-1", Endpoint::Current, window_start(1_799, 900));
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_endpoints_different_keys() {
        let a = WindowKey::new("key-1", Endpoint::Current, 900);
        let b = WindowKey::new("key-1", Endpoint::Forecast, 900);
        assert_ne!(a, b);
    }

    #[test]
    fn test_window_key_display() {
        let key = WindowKey::new("key-1", Endpoint::AirQuality, 900);
        assert_eq!(key.to_string(), "key-1:air-quality:900");
    }
}
