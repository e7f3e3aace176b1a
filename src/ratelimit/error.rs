//! Error types for rate limiting.

use std::fmt;

/// Errors surfaced by admission checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitError {
    /// The window budget is spent.
    Exceeded {
        /// Budget of the window that was exhausted.
        limit: u64,
        /// Epoch second the window resets.
        reset_at: u64,
        /// Seconds until the reset, at least 1.
        retry_after: u64,
    },
}

impl RateLimitError {
    /// Build a denial for a spent window.
    ///
    /// `retry_after` is derived from `reset_at` and the current time,
    /// clamped to at least one second so clients never retry immediately.
    #[must_use]
    pub fn exceeded(limit: u64, reset_at: u64, now_secs: u64) -> Self {
        Self::Exceeded {
            limit,
            reset_at,
            retry_after: reset_at.saturating_sub(now_secs).max(1),
        }
    }

    /// The budget of the window that denied the request.
    #[must_use]
    pub fn limit(&self) -> u64 {
        match self {
            Self::Exceeded { limit, .. } => *limit,
        }
    }

    /// Epoch second the denying window resets.
    #[must_use]
    pub fn reset_at(&self) -> u64 {
        match self {
            Self::Exceeded { reset_at, .. } => *reset_at,
        }
    }

    /// Seconds the caller should wait before retrying.
    #[must_use]
    pub fn retry_after_secs(&self) -> u64 {
        match self {
            Self::Exceeded { retry_after, .. } => *retry_after,
        }
    }
}

impl fmt::Display for RateLimitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exceeded {
                limit, reset_at, ..
            } => write!(
                f,
                "rate limit of {limit} requests exceeded, window resets at {}",
                format_reset(*reset_at)
            ),
        }
    }
}

impl std::error::Error for RateLimitError {}

/// Errors from a counter store backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backend cannot be reached.
    Unavailable(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(msg) => write!(f, "counter store unavailable: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Human-readable reset timestamp for deny messages and log fields.
#[must_use]
pub fn format_reset(epoch_secs: u64) -> String {
    chrono::DateTime::from_timestamp(epoch_secs as i64, 0)
        .map(|ts| ts.to_rfc3339())
        .unwrap_or_else(|| epoch_secs.to_string())
}
