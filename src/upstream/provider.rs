//! Weather provider trait and the in-memory provider.

use super::error::FetchError;
use super::WeatherSnapshot;
use crate::tier::Tier;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

/// Source of weather data.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Fetch a snapshot for a city, shaped for the caller's tier.
    async fn fetch(&self, city: &str, tier: Tier) -> Result<WeatherSnapshot, FetchError>;

    /// Provider name for logs.
    fn name(&self) -> &str;
}

impl fmt::Debug for dyn WeatherProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WeatherProvider({})", self.name())
    }
}

/// In-memory provider serving canned snapshots.
///
/// Cities are matched after trimming and lowercasing. Free-tier responses
/// omit the air-quality and UV fields even when the stored snapshot has
/// them; those belong to paid capabilities.
#[derive(Debug, Default)]
pub struct StaticProvider {
    snapshots: RwLock<HashMap<String, WeatherSnapshot>>,
    fetches: AtomicU64,
}

impl StaticProvider {
    /// Create an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the snapshot for a city.
    pub fn insert(&self, snapshot: WeatherSnapshot) {
        let city = normalize_city(&snapshot.city);
        self.snapshots
            .write()
            .expect("provider lock poisoned")
            .insert(city, snapshot);
    }

    /// Number of fetches served, successful or not.
    #[must_use]
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl WeatherProvider for StaticProvider {
    async fn fetch(&self, city: &str, tier: Tier) -> Result<WeatherSnapshot, FetchError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);

        let snapshots = self.snapshots.read().expect("provider lock poisoned");
        let mut snapshot = snapshots
            .get(&normalize_city(city))
            .cloned()
            .ok_or(FetchError::NotFound)?;

        if tier == Tier::Free {
            snapshot.air_quality_index = None;
            snapshot.uv_index = None;
        }

        Ok(snapshot)
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// Canonical form of a city name: trimmed and lowercased.
#[must_use]
pub fn normalize_city(raw: &str) -> String {
    raw.trim().to_lowercase()
}
