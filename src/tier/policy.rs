//! Per-tier limits and the policy table.

use super::{Capability, Tier};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

/// Limits and entitlements for a single tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierLimits {
    /// Maximum admitted requests per window, per identity and endpoint.
    #[serde(default = "default_max_requests")]
    pub max_requests_per_window: u64,

    /// Length of the fixed counting window.
    #[serde(default = "default_window_duration", with = "humantime_serde")]
    pub window_duration: Duration,

    /// Capabilities this tier is entitled to.
    #[serde(default)]
    pub capabilities: BTreeSet<Capability>,
}

fn default_max_requests() -> u64 {
    100
}

fn default_window_duration() -> Duration {
    Duration::from_secs(15 * 60)
}

impl Default for TierLimits {
    fn default() -> Self {
        Self {
            max_requests_per_window: default_max_requests(),
            window_duration: default_window_duration(),
            capabilities: BTreeSet::new(),
        }
    }
}

impl TierLimits {
    /// Create limits with the given request budget and window length.
    #[must_use]
    pub fn new(max_requests_per_window: u64, window_duration: Duration) -> Self {
        Self {
            max_requests_per_window,
            window_duration,
            capabilities: BTreeSet::new(),
        }
    }

    /// Add a capability.
    #[must_use]
    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities.insert(capability);
        self
    }

    /// Replace the capability set.
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        self.capabilities = capabilities.into_iter().collect();
        self
    }

    /// Window length in whole seconds.
    #[must_use]
    pub fn window_secs(&self) -> u64 {
        self.window_duration.as_secs()
    }

    /// Validate the limits.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_requests_per_window == 0 {
            return Err("max_requests_per_window must be greater than 0".to_string());
        }

        if self.window_duration < Duration::from_secs(1) {
            return Err("window_duration must be at least 1 second".to_string());
        }

        Ok(())
    }
}

/// The full tier table: limits and capabilities for every known tier.
///
/// Defaults mirror the published plans: free 100, premium 1000, enterprise
/// 10000 requests per 15-minute window, with capability sets growing
/// monotonically from free up to enterprise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TierPolicy {
    tiers: HashMap<Tier, TierLimits>,
}

impl Default for TierPolicy {
    fn default() -> Self {
        let mut tiers = HashMap::new();
        for tier in Tier::ALL {
            tiers.insert(tier, Self::builtin_limits(tier));
        }
        Self { tiers }
    }
}

impl TierPolicy {
    /// Create the default policy table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table with no entries at all.
    ///
    /// Useful for building a policy from scratch with [`Self::with_tier`];
    /// a tier absent from the table is unlimited and entitled to nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            tiers: HashMap::new(),
        }
    }

    /// Built-in limits for a tier, used wherever configuration is silent.
    #[must_use]
    pub fn builtin_limits(tier: Tier) -> TierLimits {
        let window = default_window_duration();
        match tier {
            Tier::Free => TierLimits::new(100, window).with_capabilities([Capability::Current]),
            Tier::Premium => TierLimits::new(1_000, window).with_capabilities([
                Capability::Current,
                Capability::Forecast,
                Capability::Alerts,
                Capability::AirQuality,
                Capability::UvIndex,
            ]),
            Tier::Enterprise => TierLimits::new(10_000, window).with_capabilities([
                Capability::Current,
                Capability::Forecast,
                Capability::Alerts,
                Capability::AirQuality,
                Capability::UvIndex,
                Capability::Historical,
            ]),
        }
    }

    /// Override the limits for one tier.
    #[must_use]
    pub fn with_tier(mut self, tier: Tier, limits: TierLimits) -> Self {
        self.tiers.insert(tier, limits);
        self
    }

    /// Limits for a tier, if the table has an entry for it.
    #[must_use]
    pub fn limits_for(&self, tier: Tier) -> Option<&TierLimits> {
        self.tiers.get(&tier)
    }

    /// Whether a tier is entitled to a capability.
    ///
    /// A tier missing from the table is entitled to nothing.
    #[must_use]
    pub fn allows(&self, tier: Tier, capability: Capability) -> bool {
        self.tiers
            .get(&tier)
            .is_some_and(|limits| limits.capabilities.contains(&capability))
    }

    /// Fill in built-in entries for any tier the configuration omitted.
    ///
    /// A partial `[tiers]` section only overrides the tiers it names.
    pub fn fill_missing(&mut self) {
        for tier in Tier::ALL {
            self.tiers
                .entry(tier)
                .or_insert_with(|| Self::builtin_limits(tier));
        }
    }

    /// Validate every entry and the cross-tier capability invariant.
    ///
    /// Capability sets must be monotonically non-decreasing from free up to
    /// enterprise; a premium feature missing from enterprise is a
    /// configuration mistake, not a plan.
    pub fn validate(&self) -> Result<(), String> {
        for (tier, limits) in &self.tiers {
            limits.validate().map_err(|e| format!("tier {tier}: {e}"))?;
        }

        for pair in Tier::ALL.windows(2) {
            let (lower, upper) = (pair[0], pair[1]);
            let (Some(lower_limits), Some(upper_limits)) =
                (self.tiers.get(&lower), self.tiers.get(&upper))
            else {
                continue;
            };

            if !lower_limits
                .capabilities
                .is_subset(&upper_limits.capabilities)
            {
                return Err(format!(
                    "tier {upper} must include every capability of tier {lower}"
                ));
            }
        }

        Ok(())
    }
}
