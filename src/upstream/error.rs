//! Upstream fetch failures.

use thiserror::Error;

/// Failures from the upstream weather provider.
///
/// `Clone` because a single in-flight fetch can fan its outcome out to
/// several coalesced waiters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The provider has no data for the requested city.
    #[error("no weather data for the requested city")]
    NotFound,

    /// The fetch exceeded the configured upstream timeout.
    #[error("upstream request timed out")]
    Timeout,

    /// The provider could not be reached.
    #[error("upstream provider unavailable")]
    UpstreamUnavailable,

    /// The provider rejected the request as over-limit.
    #[error("upstream provider rejected the request as over-limit")]
    UpstreamRateLimited,
}

impl FetchError {
    /// Whether a retry could plausibly succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::UpstreamUnavailable)
    }
}
