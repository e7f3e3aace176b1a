//! # Configuration System
//!
//! TOML-based configuration for the gateway core: per-tier limits and
//! capabilities, cache TTL, rate limiter fail-policy, upstream bounds, and
//! usage metering settings. Loading goes through [`ConfigLoader`], which
//! normalizes partial files and runs the registered validators.
//!
//! ## Example Configuration
//!
//! ```toml
//! [tiers.free]
//! max_requests_per_window = 100
//! window_duration = "15m"
//! capabilities = ["current"]
//!
//! [cache]
//! ttl = "5m"
//!
//! [rate_limit]
//! fail_policy = "open"
//!
//! [upstream]
//! timeout = "10s"
//! max_retries = 1
//! ```

mod error;
mod loader;
mod types;
mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use types::{
    CacheConfig, FailPolicy, GatewayConfig, LogLevel, LoggingConfig, RateLimitConfig,
    UpstreamConfig, UsageConfig,
};
pub use validation::{
    BasicValidator, TierPolicyValidator, ValidationError, ValidationResult, ValidationSeverity,
    Validator,
};
