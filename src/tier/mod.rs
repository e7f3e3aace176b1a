//! Subscription tiers and the per-tier policy table.
//!
//! A [`Tier`] names a subscription level; [`TierPolicy`] maps each tier to
//! its rate limits and [`Capability`] set. The policy is plain configuration
//! data: nothing here touches counters or clocks.

mod capability;
mod policy;

pub use capability::{Capability, Endpoint};
pub use policy::{TierLimits, TierPolicy};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Subscription level of an API consumer.
///
/// Ordering follows entitlement: `Free < Premium < Enterprise`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Entry tier with the tightest limits.
    Free,
    /// Paid tier with forecast-class features.
    Premium,
    /// Top tier including historical data.
    Enterprise,
}

impl Tier {
    /// All tiers in ascending entitlement order.
    pub const ALL: [Tier; 3] = [Tier::Free, Tier::Premium, Tier::Enterprise];

    /// Stable lowercase name, matching the serialized form.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Premium => "premium",
            Self::Enterprise => "enterprise",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
