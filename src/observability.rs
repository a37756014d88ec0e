//! Observability module for logging and metrics setup.
//!
//! This module provides:
//! - Structured logging with configurable levels and formats
//! - Metrics recording for table reconciliation and page normalization
//! - Tracing span helpers for form and table processing

pub mod metrics;
pub mod tracing_mod;

pub use tracing_mod::{form_span, init_tracing_with_config, page_span, table_span};

use anyhow::Result;

use crate::observability_config::ObservabilityConfig;

/// Initialize logging and apply the metrics switch from `config`
pub fn init_observability(config: &ObservabilityConfig) -> Result<()> {
    init_tracing_with_config(config)?;
    metrics::set_enabled(config.enable_metrics);
    tracing::info!(
        metrics_enabled = config.enable_metrics,
        "Observability initialized"
    );
    Ok(())
}
