//! Cache keys.

use crate::tier::{Endpoint, Tier};
use crate::upstream::normalize_city;
use std::fmt;

/// Key for one cached response.
///
/// Tier is part of the key: paid tiers receive payloads with extra fields,
/// so entries are never shared across tiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Normalized city name.
    pub city: String,
    /// Endpoint that produced the payload.
    pub endpoint: Endpoint,
    /// Tier the payload is shaped for.
    pub tier: Tier,
}

impl CacheKey {
    /// Build a key, normalizing the city name.
    #[must_use]
    pub fn new(city: &str, endpoint: Endpoint, tier: Tier) -> Self {
        Self {
            city: normalize_city(city),
            endpoint,
            tier,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.city, self.endpoint, self.tier)
    }
}
