//! Tracing and logging setup module.
//!
//! This module provides:
//! - Structured logging configuration
//! - Tracing span creation utilities

use anyhow::Result;
use tracing_subscriber::prelude::*;

use crate::observability_config::ObservabilityConfig;

/// Initialize structured logging with tracing and configuration.
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing_with_config(config: &ObservabilityConfig) -> Result<()> {
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid observability configuration: {}", e))?;

    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("eeo_digitizer={}", config.log_level.to_lowercase()).parse()?);

    // Pretty for development, JSON for batch runs
    if config.log_format == "pretty" {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_thread_names(false),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true),
            )
            .try_init()?;
    }

    tracing::info!(
        environment = %config.environment,
        log_level = %config.log_level,
        log_format = %config.log_format,
        "Tracing initialized with structured logging"
    );
    Ok(())
}

/// Create a span covering the processing of one form
pub fn form_span(form_type: &str, source: &str) -> tracing::Span {
    tracing::info_span!(
        "form_processing",
        form_type = form_type,
        source = source,
        component = "pipeline"
    )
}

/// Create a span for one table section
pub fn table_span(section: &str, rows: usize, cols: usize) -> tracing::Span {
    tracing::info_span!(
        "table_processing",
        section = section,
        rows = rows,
        cols = cols,
        component = "grid"
    )
}

/// Create a span for page normalization
pub fn page_span(width: u32, height: u32) -> tracing::Span {
    tracing::info_span!(
        "page_normalization",
        width = width,
        height = height,
        component = "preprocessing"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_rejects_invalid_config() {
        let config = ObservabilityConfig {
            log_format: "xml".to_string(),
            ..Default::default()
        };
        assert!(init_tracing_with_config(&config).is_err());
    }

    #[test]
    fn test_spans_can_be_entered() {
        let span = table_span("h", 10, 15);
        let _guard = span.enter();
        let _form = form_span("eeo1", "sample.pdf");
        let _page = page_span(523, 679);
    }
}
