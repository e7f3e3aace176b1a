//! Configuration file loader.

use super::error::{ConfigError, ConfigResult};
use super::types::GatewayConfig;
use super::validation::{BasicValidator, TierPolicyValidator, Validator};
use std::path::Path;

/// Configuration loader with validation support.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    /// Validators to run on loaded configuration.
    validators: Vec<Box<dyn Validator>>,
}

impl ConfigLoader {
    /// Create a loader with no validators.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a loader with the built-in validators registered.
    #[must_use]
    pub fn standard() -> Self {
        Self::new()
            .with_validator(BasicValidator::new())
            .with_validator(TierPolicyValidator::new())
    }

    /// Add a validator to the loader.
    #[must_use]
    pub fn with_validator<V: Validator + 'static>(mut self, validator: V) -> Self {
        self.validators.push(Box::new(validator));
        self
    }

    /// Load configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file does not exist
    /// - The file cannot be read
    /// - The TOML is malformed
    /// - Validation fails
    pub fn load<P: AsRef<Path>>(&self, path: P) -> ConfigResult<GatewayConfig> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        self.load_str(&content)
    }

    /// Load configuration from a TOML string.
    ///
    /// Partial configurations are normalized (missing tiers filled with
    /// built-in defaults) before validation runs.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The TOML is malformed
    /// - Validation fails
    pub fn load_str(&self, content: &str) -> ConfigResult<GatewayConfig> {
        let mut config: GatewayConfig = toml::from_str(content)?;
        config.normalize();
        self.validate(&config)?;
        Ok(config)
    }

    /// Validate a configuration against all registered validators.
    fn validate(&self, config: &GatewayConfig) -> ConfigResult<()> {
        for validator in &self.validators {
            let result = validator.validate(config);
            if !result.is_valid() {
                let errors: Vec<String> = result
                    .errors_only()
                    .iter()
                    .map(|e| e.message.clone())
                    .collect();
                return Err(ConfigError::ValidationError(errors.join("; ")));
            }
        }
        Ok(())
    }

    /// Load configuration or return default if file doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default<P: AsRef<Path>>(&self, path: P) -> ConfigResult<GatewayConfig> {
        let path = path.as_ref();
        if path.exists() {
            self.load(path)
        } else {
            Ok(GatewayConfig::default())
        }
    }

    /// Save configuration to a file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn save<P: AsRef<Path>>(&self, config: &GatewayConfig, path: P) -> ConfigResult<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(config)?;
        std::fs::write(path, content).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FailPolicy;
    use crate::tier::{Capability, Tier};
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn test_load_from_string() {
        let loader = ConfigLoader::standard();
        let config = loader
            .load_str(
                r#"
            [rate_limit]
            fail_policy = "closed"
        "#,
            )
            .unwrap();
        assert_eq!(config.rate_limit.fail_policy, FailPolicy::Closed);
    }

    #[test]
    fn test_load_normalizes_partial_tiers() {
        let loader = ConfigLoader::standard();
        let config = loader
            .load_str(
                r#"
            [tiers.free]
            max_requests_per_window = 3
            window_duration = "30s"
            capabilities = ["current"]
        "#,
            )
            .unwrap();

        assert_eq!(
            config
                .tiers
                .limits_for(Tier::Free)
                .unwrap()
                .max_requests_per_window,
            3
        );
        assert!(config.tiers.allows(Tier::Enterprise, Capability::Historical));
    }

    #[test]
    fn test_load_rejects_invalid_tier_table() {
        let loader = ConfigLoader::standard();
        // Premium drops "current", which free has.
        let result = loader.load_str(
            r#"
            [tiers.premium]
            max_requests_per_window = 1000
            window_duration = "15m"
            capabilities = ["forecast"]
        "#,
        );

        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        std::fs::write(
            &config_path,
            r#"
            [cache]
            ttl = "1m"
        "#,
        )
        .unwrap();

        let loader = ConfigLoader::standard();
        let config = loader.load(&config_path).unwrap();
        assert_eq!(config.cache.ttl, Duration::from_secs(60));
    }

    #[test]
    fn test_load_nonexistent_file() {
        let loader = ConfigLoader::new();
        let result = loader.load("/nonexistent/path/config.toml");
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_or_default() {
        let loader = ConfigLoader::new();
        let config = loader.load_or_default("/nonexistent/path").unwrap();
        assert_eq!(config.cache.ttl, Duration::from_secs(300));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("saved.toml");

        let mut config = GatewayConfig::default();
        config.upstream.max_retries = 3;

        let loader = ConfigLoader::standard();
        loader.save(&config, &config_path).unwrap();

        let loaded = loader.load(&config_path).unwrap();
        assert_eq!(loaded.upstream.max_retries, 3);
    }
}
