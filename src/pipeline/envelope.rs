//! Response envelopes.
//!
//! The gateway does not speak HTTP itself; it hands the embedding server a
//! status code plus one of these envelopes, already shaped for serialization.

use serde::Serialize;

use crate::ratelimit::Admission;
use crate::tier::Tier;
use crate::upstream::WeatherSnapshot;

use super::error::GatewayError;

/// Rate-limit budget attached to every successful response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitInfo {
    /// Window budget for the caller's tier.
    pub limit: u64,
    /// Requests left in the current window.
    pub remaining: u64,
    /// Epoch second the window resets.
    pub reset_at: u64,
}

impl From<Admission> for RateLimitInfo {
    fn from(admission: Admission) -> Self {
        Self {
            limit: admission.limit,
            remaining: admission.remaining,
            reset_at: admission.reset_at,
        }
    }
}

/// Envelope for a served payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuccessEnvelope {
    /// The weather payload.
    pub data: WeatherSnapshot,
    /// Tier the caller resolved to.
    pub tier: Tier,
    /// Whether the payload came from the response cache.
    ///
    /// `false` for every participant of a coalesced fetch, leader and
    /// waiters alike; only a hit on an already-stored entry counts.
    pub cached: bool,
    /// Budget state after this request.
    pub rate_limit: RateLimitInfo,
}

/// Envelope for a rejected request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectionEnvelope {
    /// Stable machine-readable code, see [`GatewayError::code`].
    pub error: String,
    /// Human-readable description of the failure.
    pub message: String,
    /// Seconds until a retry could succeed; rate-limit denials only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

impl RejectionEnvelope {
    /// Build the envelope for a pipeline failure.
    #[must_use]
    pub fn from_error(error: &GatewayError) -> Self {
        Self {
            error: error.code().to_string(),
            message: error.to_string(),
            retry_after: error.retry_after_secs(),
        }
    }
}

/// Body of a finished request, one variant per outcome.
///
/// Serializes untagged: the success and rejection shapes share no fields, so
/// clients key off `data` versus `error`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Envelope {
    /// Request served.
    Success(SuccessEnvelope),
    /// Request rejected at some stage.
    Rejection(RejectionEnvelope),
}

impl Envelope {
    /// Check if this is a success envelope.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The success payload, if this request was served.
    #[must_use]
    pub fn as_success(&self) -> Option<&SuccessEnvelope> {
        match self {
            Self::Success(envelope) => Some(envelope),
            Self::Rejection(_) => None,
        }
    }

    /// The rejection details, if this request was rejected.
    #[must_use]
    pub fn as_rejection(&self) -> Option<&RejectionEnvelope> {
        match self {
            Self::Success(_) => None,
            Self::Rejection(envelope) => Some(envelope),
        }
    }
}
