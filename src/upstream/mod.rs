//! Upstream weather data interface.
//!
//! The gateway never talks to a real weather backend directly; it goes
//! through [`WeatherProvider`], with [`StaticProvider`] as the in-memory
//! implementation for tests and local runs. [`fetch_with_retry`] wraps a
//! provider with the configured bounded-retry behavior.

use serde::{Deserialize, Serialize};

mod error;
mod provider;
mod retry;

pub use error::FetchError;
pub use provider::{normalize_city, StaticProvider, WeatherProvider};
pub use retry::fetch_with_retry;

/// One observation for one city, shaped for a tier.
///
/// The air-quality and UV fields ride along only for tiers entitled to
/// them; serialization skips them when absent so free-tier payloads carry
/// no empty placeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    /// City the observation is for, as stored by the provider.
    pub city: String,

    /// Temperature in degrees Celsius.
    pub temperature_c: f64,

    /// Short human-readable conditions, e.g. "partly cloudy".
    pub conditions: String,

    /// Air quality index, present for entitled tiers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub air_quality_index: Option<u32>,

    /// UV index, present for entitled tiers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uv_index: Option<f64>,
}

impl WeatherSnapshot {
    /// Create a snapshot with only the base fields.
    #[must_use]
    pub fn new(city: impl Into<String>, temperature_c: f64, conditions: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            temperature_c,
            conditions: conditions.into(),
            air_quality_index: None,
            uv_index: None,
        }
    }

    /// Attach an air quality index.
    #[must_use]
    pub fn with_air_quality(mut self, index: u32) -> Self {
        self.air_quality_index = Some(index);
        self
    }

    /// Attach a UV index.
    #[must_use]
    pub fn with_uv_index(mut self, index: f64) -> Self {
        self.uv_index = Some(index);
        self
    }
}
