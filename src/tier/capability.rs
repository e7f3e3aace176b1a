//! Feature capabilities and the endpoints that require them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A feature flag a tier may be entitled to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    /// Current weather conditions.
    Current,
    /// Multi-day forecasts.
    Forecast,
    /// Severe weather alerts.
    Alerts,
    /// Air quality index.
    AirQuality,
    /// UV index.
    UvIndex,
    /// Historical observations.
    Historical,
}

impl Capability {
    /// Stable kebab-case name, matching the serialized form.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Forecast => "forecast",
            Self::Alerts => "alerts",
            Self::AirQuality => "air-quality",
            Self::UvIndex => "uv-index",
            Self::Historical => "historical",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A gated data endpoint.
///
/// Each endpoint requires exactly one capability; the mapping is the policy
/// check the pipeline runs before any upstream work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Endpoint {
    /// Current weather for a city.
    Current,
    /// Forecast for a city.
    Forecast,
    /// Active weather alerts for a city.
    Alerts,
    /// Air quality for a city.
    AirQuality,
    /// UV index for a city.
    UvIndex,
    /// Historical observations for a city.
    Historical,
}

impl Endpoint {
    /// All endpoints.
    pub const ALL: [Endpoint; 6] = [
        Endpoint::Current,
        Endpoint::Forecast,
        Endpoint::Alerts,
        Endpoint::AirQuality,
        Endpoint::UvIndex,
        Endpoint::Historical,
    ];

    /// The capability a caller's tier must carry to use this endpoint.
    #[must_use]
    pub fn required_capability(&self) -> Capability {
        match self {
            Self::Current => Capability::Current,
            Self::Forecast => Capability::Forecast,
            Self::Alerts => Capability::Alerts,
            Self::AirQuality => Capability::AirQuality,
            Self::UvIndex => Capability::UvIndex,
            Self::Historical => Capability::Historical,
        }
    }

    /// Stable kebab-case name, matching the serialized form.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Forecast => "forecast",
            Self::Alerts => "alerts",
            Self::AirQuality => "air-quality",
            Self::UvIndex => "uv-index",
            Self::Historical => "historical",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
