//! `binwatch.toml` configuration.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::fallback::{FixedReading, RandomReading, UnknownReadingPolicy};
use crate::model::{BinId, FillLevel};

/// Backend used when the configuration does not name one.
pub const DEFAULT_BACKEND: &str = "http";
/// Depot label sent with every route request.
pub const DEFAULT_ORIGIN: &str = "municipal_garage_location";

#[derive(thiserror::Error, Debug)]
/// Errors raised while loading or validating the configuration.
pub enum ConfigError {
    /// The file could not be read.
    #[error("Cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not valid TOML or has unexpected fields.
    #[error("Cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),
    /// A value is out of its allowed range.
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "lowercase")]
/// Which level to substitute when a bin cannot be read.
pub enum FallbackConfig {
    /// Uniform random level.
    Random,
    /// The same level for every unknown bin.
    Fixed {
        /// Substituted fraction.
        level: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
/// Runtime settings shared by every component of the tracker.
pub struct TrackerConfig {
    /// Backend plugin id (`http` or `simulated`).
    pub backend: String,
    /// Bins to poll, in polling order.
    pub bins: Vec<u32>,
    /// Capacity threshold; bins at or above it are flagged.
    pub threshold: f64,
    /// Depot label sent to the optimizer.
    pub origin: String,
    /// Base URL of the telemetry service.
    pub telemetry_url: String,
    /// URL of the route optimizer.
    pub optimizer_url: String,
    /// Seconds between two cycles.
    pub interval_secs: u64,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Consecutive failures before a bin raises a telemetry alarm; 0 disables.
    pub alarm_after: u32,
    /// Unknown-reading policy.
    pub fallback: FallbackConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            backend: DEFAULT_BACKEND.to_owned(),
            bins: vec![1, 2, 3, 4, 5],
            threshold: 0.8,
            origin: DEFAULT_ORIGIN.to_owned(),
            telemetry_url: "http://example.com/iot_endpoint".to_owned(),
            optimizer_url: "http://example.com/route_optimizer".to_owned(),
            interval_secs: 3600,
            request_timeout_secs: 10,
            alarm_after: 3,
            fallback: FallbackConfig::Random,
        }
    }
}

impl TrackerConfig {
    /// Load and validate a configuration file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
    /// validation.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the text is not valid TOML or fails
    /// validation.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: TrackerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Render the effective configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns a [`toml::ser::Error`] if a value cannot be represented.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if FillLevel::new(self.threshold).is_none() {
            return Err(invalid(format!(
                "threshold {} is outside [0, 1]",
                self.threshold
            )));
        }
        if self.bins.contains(&0) {
            return Err(invalid("bin ids must be positive".to_owned()));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self.bins.iter().find(|bin| !seen.insert(**bin)) {
            return Err(invalid(format!("bin {dup} is listed twice")));
        }
        if self.interval_secs == 0 {
            return Err(invalid("interval_secs must be positive".to_owned()));
        }
        if self.request_timeout_secs == 0 {
            return Err(invalid("request_timeout_secs must be positive".to_owned()));
        }
        if self.telemetry_url.trim().is_empty() || self.optimizer_url.trim().is_empty() {
            return Err(invalid("endpoint URLs must not be empty".to_owned()));
        }
        if let FallbackConfig::Fixed { level } = self.fallback
            && FillLevel::new(level).is_none()
        {
            return Err(invalid(format!("fallback level {level} is outside [0, 1]")));
        }
        Ok(())
    }

    /// Configured bins as ids.
    #[must_use]
    pub fn bin_ids(&self) -> Vec<BinId> {
        self.bins.iter().copied().map(BinId).collect()
    }

    /// Capacity threshold. Falls back to "always flag" if unvalidated and out
    /// of range.
    #[must_use]
    pub fn threshold(&self) -> FillLevel {
        FillLevel::new(self.threshold).unwrap_or(FillLevel::EMPTY)
    }

    /// Pause between cycles.
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Upper bound for a single backend request.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Build the configured unknown-reading policy.
    #[must_use]
    pub fn fallback_policy(&self) -> Arc<dyn UnknownReadingPolicy> {
        match self.fallback {
            FallbackConfig::Random => Arc::new(RandomReading),
            FallbackConfig::Fixed { level } => Arc::new(FixedReading(
                FillLevel::new(level).unwrap_or(FillLevel::EMPTY),
            )),
        }
    }
}

fn invalid(message: String) -> ConfigError {
    ConfigError::Invalid(message)
}
