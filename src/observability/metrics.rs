//! Metrics recording helpers.
//!
//! The library only records through the `metrics` facade; installing an exporter is
//! left to the embedding application.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

static ENABLED: AtomicBool = AtomicBool::new(true);

/// Turn recording on or off process-wide
pub fn set_enabled(enabled: bool) {
    ENABLED.store(enabled, Ordering::Relaxed);
}

pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

/// Record the final classification of a validated table
pub fn record_table_classification(form_type: &str, status: &str) {
    if !is_enabled() {
        return;
    }
    metrics::counter!(
        "tables_validated_total",
        "form_type" => form_type.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record a single-cell repair performed by the row corrector
pub fn record_cell_correction(form_type: &str) {
    if !is_enabled() {
        return;
    }
    metrics::counter!("cells_corrected_total", "form_type" => form_type.to_string())
        .increment(1);
}

/// Record a cell-level diagnostic (empty, invalid digit, unconfident, out of grid)
pub fn record_cell_diagnostic(kind: &str) {
    if !is_enabled() {
        return;
    }
    metrics::counter!("cell_diagnostics_total", "kind" => kind.to_string()).increment(1);
}

/// Record how many detections of a section were placed or dropped
pub fn record_grid_mapping(section: &str, placed: usize, dropped: usize) {
    if !is_enabled() {
        return;
    }
    metrics::counter!("detections_placed_total", "section" => section.to_string())
        .increment(placed as u64);
    metrics::counter!("detections_dropped_total", "section" => section.to_string())
        .increment(dropped as u64);
}

/// Record the outcome of page normalization
pub fn record_page_normalization(outcome: &str, duration: Duration) {
    if !is_enabled() {
        return;
    }
    metrics::counter!("pages_normalized_total", "outcome" => outcome.to_string()).increment(1);
    metrics::histogram!("page_normalization_duration_seconds").record(duration.as_secs_f64());
}

/// Record configuration or page-level errors by type
pub fn record_error_metrics(error_type: &str, component: &str) {
    if !is_enabled() {
        return;
    }
    metrics::counter!(
        "errors_total",
        "type" => error_type.to_string(),
        "component" => component.to_string()
    )
    .increment(1);
}
