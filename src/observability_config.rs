//! # Observability Configuration
//!
//! Environment-specific configuration for logging and metrics of the digitizer.

use std::env;

use crate::errors::{DigitizerError, DigitizerResult};

/// Observability configuration for different environments
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Environment name (development, staging, production)
    pub environment: String,
    /// Log level for the digitizer crate
    pub log_level: String,
    /// Output format: "pretty" or "json"
    pub log_format: String,
    /// Whether to record metrics through the `metrics` facade
    pub enable_metrics: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            enable_metrics: true,
        }
    }
}

impl ObservabilityConfig {
    /// Load configuration from environment variables. Production runs default
    /// to JSON logs unless `LOG_FORMAT` says otherwise.
    pub fn from_env() -> Self {
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let default_format = if environment == "production" { "json" } else { "pretty" };
        Self {
            log_level: env::var("EEO_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| default_format.to_string()),
            enable_metrics: env::var("ENABLE_METRICS")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
            environment,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> DigitizerResult<()> {
        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(DigitizerError::Config(format!(
                "Invalid log level: {}",
                self.log_level
            )));
        }

        if self.log_format != "pretty" && self.log_format != "json" {
            return Err(DigitizerError::Config(format!(
                "Invalid log format: {}. Expected 'pretty' or 'json'",
                self.log_format
            )));
        }

        Ok(())
    }
}

/// Environment-specific configuration presets
pub mod presets {
    use super::ObservabilityConfig;

    /// Development configuration with verbose, human-readable logs
    pub fn development() -> ObservabilityConfig {
        ObservabilityConfig {
            environment: "development".to_string(),
            log_level: "debug".to_string(),
            log_format: "pretty".to_string(),
            ..Default::default()
        }
    }

    /// Production configuration: JSON logs for batch runs
    pub fn production() -> ObservabilityConfig {
        ObservabilityConfig {
            environment: "production".to_string(),
            log_level: "info".to_string(),
            log_format: "json".to_string(),
            ..Default::default()
        }
    }

    /// Minimal configuration: errors only, no metrics
    pub fn minimal() -> ObservabilityConfig {
        ObservabilityConfig {
            environment: "minimal".to_string(),
            log_level: "error".to_string(),
            enable_metrics: false,
            ..Default::default()
        }
    }
}
