//! Unified error type for the request pipeline.
//!
//! Every stage of the pipeline produces its own error type; [`GatewayError`]
//! folds them into one so the response layer can map any failure to an HTTP
//! status and a stable machine-readable code.

use http::StatusCode;
use thiserror::Error;

use crate::identity::AuthError;
use crate::ratelimit::RateLimitError;
use crate::tier::{Capability, Tier};
use crate::upstream::FetchError;

/// Rejections from the capability gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CapabilityError {
    /// The caller's tier does not carry the capability the endpoint needs.
    #[error("tier {tier} is not entitled to {capability} data")]
    NotEntitled {
        /// Tier the caller resolved to.
        tier: Tier,
        /// Capability the requested endpoint requires.
        capability: Capability,
    },
}

/// Any failure a request can hit on its way through the gateway.
///
/// Wraps the stage-specific errors without reformatting them; display output
/// comes straight from the wrapped error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Credential was missing or resolved to no active identity.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The identity spent its window budget.
    #[error(transparent)]
    RateLimit(#[from] RateLimitError),

    /// The tier is not entitled to the endpoint.
    #[error(transparent)]
    Capability(#[from] CapabilityError),

    /// Upstream fetch failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl GatewayError {
    /// HTTP status the embedding server should answer with.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::RateLimit(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Capability(_) => StatusCode::FORBIDDEN,
            Self::Fetch(FetchError::NotFound) => StatusCode::NOT_FOUND,
            Self::Fetch(FetchError::Timeout | FetchError::UpstreamUnavailable) => {
                StatusCode::BAD_GATEWAY
            }
            Self::Fetch(FetchError::UpstreamRateLimited) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Stable code for the rejection envelope's `error` field.
    ///
    /// These strings are part of the wire contract; clients match on them.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Auth(AuthError::MissingCredential) => "missing_api_key",
            Self::Auth(AuthError::InvalidCredential) => "invalid_api_key",
            Self::RateLimit(_) => "rate_limit_exceeded",
            Self::Capability(_) => "capability_not_allowed",
            Self::Fetch(FetchError::NotFound) => "city_not_found",
            Self::Fetch(FetchError::Timeout) => "upstream_timeout",
            Self::Fetch(FetchError::UpstreamUnavailable) => "upstream_unavailable",
            Self::Fetch(FetchError::UpstreamRateLimited) => "upstream_rate_limited",
        }
    }

    /// Seconds until a retry could succeed, for rate-limit denials only.
    #[must_use]
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::RateLimit(err) => Some(err.retry_after_secs()),
            _ => None,
        }
    }
}
