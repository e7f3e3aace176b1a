//! Request pipeline: the gateway's stage sequence and response shaping.
//!
//! A request flows through fixed stages: credential resolution, rate-limit
//! admission, the capability gate, then the cache-or-upstream serve step.
//! The first failing stage rejects the request; either way the outcome is
//! metered and logged with a per-request correlation id.

mod envelope;
mod error;
mod gateway;
mod state;

pub use envelope::{Envelope, RateLimitInfo, RejectionEnvelope, SuccessEnvelope};
pub use error::{CapabilityError, GatewayError};
pub use gateway::{Gateway, GatewayBuilder, GatewayRequest, GatewayResponse};
pub use state::PipelineState;
