//! Request lifecycle states.

use std::fmt;

/// Where a request stands on its path through the gateway.
///
/// A request moves strictly forward: `Start` to `Authenticated` to
/// `RateChecked` to `Served` to `Recorded`, or from any stage into the
/// matching rejection terminal. No state is ever revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Nothing checked yet.
    Start,

    /// Credential resolved to an identity and tier.
    Authenticated,

    /// A slot of the identity's window budget was consumed.
    RateChecked,

    /// Payload produced, from cache or upstream.
    Served,

    /// Usage recorded; the success terminal.
    Recorded,

    /// Rejected: no usable credential.
    RejectedAuth,

    /// Rejected: window budget spent.
    RejectedRate,

    /// Rejected at the serve stage: capability missing or upstream failed.
    RejectedFetch,
}

impl PipelineState {
    /// Check if the request is finished, successfully or not.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Recorded | Self::RejectedAuth | Self::RejectedRate | Self::RejectedFetch
        )
    }

    /// Check if the request ended in a rejection.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::RejectedAuth | Self::RejectedRate | Self::RejectedFetch
        )
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Authenticated => write!(f, "authenticated"),
            Self::RateChecked => write!(f, "rate-checked"),
            Self::Served => write!(f, "served"),
            Self::Recorded => write!(f, "recorded"),
            Self::RejectedAuth => write!(f, "rejected-auth"),
            Self::RejectedRate => write!(f, "rejected-rate"),
            Self::RejectedFetch => write!(f, "rejected-fetch"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(PipelineState::Recorded.is_terminal());
        assert!(PipelineState::RejectedAuth.is_terminal());
        assert!(PipelineState::RejectedRate.is_terminal());
        assert!(PipelineState::RejectedFetch.is_terminal());
        assert!(!PipelineState::Start.is_terminal());
        assert!(!PipelineState::Authenticated.is_terminal());
        assert!(!PipelineState::RateChecked.is_terminal());
        assert!(!PipelineState::Served.is_terminal());
    }

    #[test]
    fn test_rejection_states() {
        assert!(PipelineState::RejectedAuth.is_rejection());
        assert!(PipelineState::RejectedRate.is_rejection());
        assert!(PipelineState::RejectedFetch.is_rejection());
        assert!(!PipelineState::Recorded.is_rejection());
        assert!(!PipelineState::Served.is_rejection());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(PipelineState::Start.to_string(), "start");
        assert_eq!(PipelineState::RateChecked.to_string(), "rate-checked");
        assert_eq!(PipelineState::RejectedRate.to_string(), "rejected-rate");
        assert_eq!(PipelineState::Recorded.to_string(), "recorded");
    }
}
