//! Configuration type definitions.

use crate::tier::TierPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration structure for the gateway core.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Per-tier limits and capabilities.
    pub tiers: TierPolicy,

    /// Response cache settings.
    pub cache: CacheConfig,

    /// Rate limiter settings.
    pub rate_limit: RateLimitConfig,

    /// Upstream provider settings.
    pub upstream: UpstreamConfig,

    /// Usage metering settings.
    pub usage: UsageConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl GatewayConfig {
    /// Fill in defaults a partial configuration left out.
    ///
    /// A `[tiers]` section naming only some tiers still yields a complete
    /// policy table.
    pub fn normalize(&mut self) {
        self.tiers.fill_missing();
    }
}

/// Response cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Time a cached payload stays servable. Uniform across tiers.
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,

    /// How often the maintenance task sweeps expired entries.
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl CacheConfig {
    /// Validate the cache settings.
    pub fn validate(&self) -> Result<(), String> {
        if self.ttl.is_zero() {
            return Err("cache.ttl must be greater than 0".to_string());
        }

        if self.sweep_interval.is_zero() {
            return Err("cache.sweep_interval must be greater than 0".to_string());
        }

        Ok(())
    }
}

/// Rate limiter settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// What to do when the counter store is unreachable.
    pub fail_policy: FailPolicy,

    /// How long finished windows are kept before pruning.
    #[serde(with = "humantime_serde")]
    pub retain_windows_for: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            fail_policy: FailPolicy::Open,
            retain_windows_for: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl RateLimitConfig {
    /// Validate the rate limiter settings.
    pub fn validate(&self) -> Result<(), String> {
        if self.retain_windows_for.is_zero() {
            return Err("rate_limit.retain_windows_for must be greater than 0".to_string());
        }

        Ok(())
    }
}

/// Behavior when the counter store is unavailable.
///
/// `Open` admits and warns; `Closed` denies. The default is `Open`: a store
/// outage lets clients briefly exceed their limits, but the service stays up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FailPolicy {
    /// Admit the request and log a warning.
    #[default]
    Open,
    /// Deny the request.
    Closed,
}

impl FailPolicy {
    /// Whether this policy admits on store failure.
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }
}

impl std::fmt::Display for FailPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Upstream provider settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Bound on a single upstream computation, including retries.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Extra attempts after an `UpstreamUnavailable` failure.
    pub max_retries: u32,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_retries: 1,
        }
    }
}

impl UpstreamConfig {
    /// Validate the upstream settings.
    pub fn validate(&self) -> Result<(), String> {
        if self.timeout.is_zero() {
            return Err("upstream.timeout must be greater than 0".to_string());
        }

        Ok(())
    }
}

/// Usage metering settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageConfig {
    /// Capacity of the record queue between the request path and the writer.
    pub queue_capacity: usize,

    /// How long usage records are kept before pruning.
    #[serde(with = "humantime_serde")]
    pub retain_records_for: Duration,
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1_024,
            retain_records_for: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl UsageConfig {
    /// Validate the usage settings.
    pub fn validate(&self) -> Result<(), String> {
        if self.queue_capacity == 0 {
            return Err("usage.queue_capacity must be greater than 0".to_string());
        }

        if self.retain_records_for.is_zero() {
            return Err("usage.retain_records_for must be greater than 0".to_string());
        }

        Ok(())
    }
}

/// Logging configuration.
///
/// The host process owns subscriber setup; this section only records the
/// requested level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: LogLevel,
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level (most verbose).
    Trace,
    /// Debug level.
    Debug,
    /// Info level (default).
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level (least verbose).
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}
