//! Configuration validation system.

use super::types::GatewayConfig;
use std::time::Duration;

/// A single validation error.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// Error message.
    pub message: String,
    /// Severity level.
    pub severity: ValidationSeverity,
}

impl ValidationError {
    /// Create a new error.
    pub fn error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            severity: ValidationSeverity::Error,
        }
    }

    /// Create a new warning.
    pub fn warning(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            severity: ValidationSeverity::Warning,
        }
    }
}

/// Severity of validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationSeverity {
    /// Error - configuration is invalid.
    Error,
    /// Warning - configuration may have issues.
    Warning,
}

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    errors: Vec<ValidationError>,
}

impl ValidationResult {
    /// Create a new empty (valid) result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an error to the result.
    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Check if the validation passed (no errors).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self
            .errors
            .iter()
            .any(|e| e.severity == ValidationSeverity::Error)
    }

    /// Get all validation errors.
    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Get only errors (not warnings).
    #[must_use]
    pub fn errors_only(&self) -> Vec<&ValidationError> {
        self.errors
            .iter()
            .filter(|e| e.severity == ValidationSeverity::Error)
            .collect()
    }

    /// Get only warnings.
    #[must_use]
    pub fn warnings(&self) -> Vec<&ValidationError> {
        self.errors
            .iter()
            .filter(|e| e.severity == ValidationSeverity::Warning)
            .collect()
    }

    /// Merge another validation result into this one.
    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
    }
}

/// Trait for configuration validators.
pub trait Validator: std::fmt::Debug + Send + Sync {
    /// Validate a configuration and return any errors.
    fn validate(&self, config: &GatewayConfig) -> ValidationResult;
}

/// Built-in validator for the per-section bounds checks.
#[derive(Debug, Default)]
pub struct BasicValidator;

impl BasicValidator {
    /// Create a new basic validator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Validator for BasicValidator {
    fn validate(&self, config: &GatewayConfig) -> ValidationResult {
        let mut result = ValidationResult::new();

        if let Err(e) = config.cache.validate() {
            result.add_error(ValidationError::error("cache", e));
        }

        if let Err(e) = config.rate_limit.validate() {
            result.add_error(ValidationError::error("rate_limit", e));
        }

        if let Err(e) = config.upstream.validate() {
            result.add_error(ValidationError::error("upstream", e));
        }

        if let Err(e) = config.usage.validate() {
            result.add_error(ValidationError::error("usage", e));
        }

        if config.cache.ttl < Duration::from_secs(10) {
            result.add_error(ValidationError::warning(
                "cache.ttl",
                "TTL under 10 seconds keeps almost nothing cached",
            ));
        }

        result
    }
}

/// Validator for the tier table.
///
/// Checks every tier's limits and the cross-tier capability invariant: the
/// capability set must not shrink from free up to enterprise.
#[derive(Debug, Default)]
pub struct TierPolicyValidator;

impl TierPolicyValidator {
    /// Create a new tier policy validator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Validator for TierPolicyValidator {
    fn validate(&self, config: &GatewayConfig) -> ValidationResult {
        let mut result = ValidationResult::new();

        if let Err(e) = config.tiers.validate() {
            result.add_error(ValidationError::error("tiers", e));
        }

        result
    }
}
