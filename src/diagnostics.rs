//! # Diagnostics Context
//!
//! Explicit, per-form collector for the non-fatal events raised while mapping,
//! post-processing and validating tables. Every event is forwarded to `tracing`
//! (using the cell vocabulary log summaries grep for) and counted through the
//! `metrics` facade, then retained so callers can inspect or summarize it.

use std::fmt;

use serde::Serialize;

use crate::observability::metrics;

/// A single non-fatal event
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Cell never received a detection; post-processing wrote 0
    EmptyCell {
        section: String,
        col: usize,
        row: usize,
    },
    /// Token is not a plain digit string
    InvalidDigit {
        section: String,
        value: String,
        col: i64,
        row: usize,
    },
    /// Digit parsed but below the confidence threshold
    UnconfidentCell {
        section: String,
        value: String,
        confidence: f32,
        col: usize,
        row: usize,
    },
    /// Detection whose column falls outside the grid; it is dropped
    OutOfGrid {
        section: String,
        value: String,
        col: i64,
        row: usize,
    },
    /// Single low-confidence cell repaired from its row total
    CellCorrected {
        section: String,
        row: usize,
        col: usize,
        old_value: u64,
        new_value: u64,
    },
    /// Row sum mismatch that could not be repaired
    RowMismatchUncorrectable {
        section: String,
        row: usize,
        low_confidence_cells: usize,
    },
    /// Table failed validation after correction
    InvalidTable {
        section: String,
        row_valid: Vec<bool>,
        col_valid: Vec<bool>,
    },
    /// Corner pattern gave no rotation direction
    AmbiguousRotation { angle: f32 },
    /// Section could not be processed because of its configuration
    SectionSkipped { section: String, reason: String },
}

fn py_bools(values: &[bool]) -> String {
    let items: Vec<&str> = values
        .iter()
        .map(|v| if *v { "True" } else { "False" })
        .collect();
    format!("[{}]", items.join(", "))
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::EmptyCell { col, row, .. } => write!(f, "Empty_cell,loc:[{}, {}]", col, row),
            Diagnostic::InvalidDigit { value, col, row, .. } => {
                write!(f, "Invalid_digit,val:{},loc:[{}, {}]", value, col, row)
            }
            Diagnostic::UnconfidentCell {
                value,
                confidence,
                col,
                row,
                ..
            } => write!(
                f,
                "Unconfident_cell,val:{},conf:{:.2},loc:[{}, {}]",
                value, confidence, col, row
            ),
            Diagnostic::OutOfGrid { value, col, row, .. } => {
                write!(f, "Out_of_grid,val:{},loc:[{}, {}]", value, col, row)
            }
            Diagnostic::CellCorrected {
                row,
                col,
                old_value,
                new_value,
                ..
            } => write!(
                f,
                "Corrected_cell,old:{},new:{},loc:[{}, {}]",
                old_value, new_value, col, row
            ),
            Diagnostic::RowMismatchUncorrectable {
                row,
                low_confidence_cells,
                ..
            } => write!(
                f,
                "Invalid_row,row:{},low_confidence_cells:{}",
                row, low_confidence_cells
            ),
            Diagnostic::InvalidTable {
                row_valid,
                col_valid,
                ..
            } => write!(
                f,
                "Invalid table:row-{},col-{}",
                py_bools(row_valid),
                py_bools(col_valid)
            ),
            Diagnostic::AmbiguousRotation { angle } => {
                write!(f, "Rotation direction unresolved: {}", angle)
            }
            Diagnostic::SectionSkipped { section, reason } => {
                write!(f, "sect invalid: {} ({})", section, reason)
            }
        }
    }
}

impl Diagnostic {
    /// Short machine-readable name used as the metrics label
    pub fn kind(&self) -> &'static str {
        match self {
            Diagnostic::EmptyCell { .. } => "empty_cell",
            Diagnostic::InvalidDigit { .. } => "invalid_digit",
            Diagnostic::UnconfidentCell { .. } => "unconfident_cell",
            Diagnostic::OutOfGrid { .. } => "out_of_grid",
            Diagnostic::CellCorrected { .. } => "cell_corrected",
            Diagnostic::RowMismatchUncorrectable { .. } => "row_mismatch_uncorrectable",
            Diagnostic::InvalidTable { .. } => "invalid_table",
            Diagnostic::AmbiguousRotation { .. } => "ambiguous_rotation",
            Diagnostic::SectionSkipped { .. } => "section_skipped",
        }
    }

    /// Section the event belongs to, if any
    pub fn section(&self) -> Option<&str> {
        match self {
            Diagnostic::EmptyCell { section, .. }
            | Diagnostic::InvalidDigit { section, .. }
            | Diagnostic::UnconfidentCell { section, .. }
            | Diagnostic::OutOfGrid { section, .. }
            | Diagnostic::CellCorrected { section, .. }
            | Diagnostic::RowMismatchUncorrectable { section, .. }
            | Diagnostic::InvalidTable { section, .. }
            | Diagnostic::SectionSkipped { section, .. } => Some(section),
            Diagnostic::AmbiguousRotation { .. } => None,
        }
    }
}

/// Event counts for one form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiagnosticSummary {
    pub empty_cells: usize,
    pub invalid_digits: usize,
    pub unconfident_cells: usize,
    pub out_of_grid: usize,
    pub corrected_cells: usize,
    pub uncorrectable_rows: usize,
    pub invalid_tables: usize,
    pub ambiguous_rotations: usize,
    pub skipped_sections: usize,
}

impl DiagnosticSummary {
    pub fn total(&self) -> usize {
        self.empty_cells
            + self.invalid_digits
            + self.unconfident_cells
            + self.out_of_grid
            + self.corrected_cells
            + self.uncorrectable_rows
            + self.invalid_tables
            + self.ambiguous_rotations
            + self.skipped_sections
    }
}

/// Per-form diagnostics context
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    prefix: String,
    events: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Create a context; `prefix` (typically the source file name) is attached
    /// to every log line.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            events: Vec::new(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Log, count and retain an event
    pub fn record(&mut self, event: Diagnostic) {
        let section = event.section().unwrap_or("-");
        match &event {
            Diagnostic::EmptyCell { .. }
            | Diagnostic::InvalidDigit { .. }
            | Diagnostic::UnconfidentCell { .. }
            | Diagnostic::OutOfGrid { .. } => {
                tracing::warn!(
                    target: "eeo_digitizer::grid",
                    source = %self.prefix,
                    section = %section,
                    "{}",
                    event
                );
            }
            Diagnostic::CellCorrected { .. } => {
                tracing::info!(
                    target: "eeo_digitizer::validation",
                    source = %self.prefix,
                    section = %section,
                    "{}",
                    event
                );
            }
            Diagnostic::RowMismatchUncorrectable { .. } | Diagnostic::InvalidTable { .. } => {
                tracing::warn!(
                    target: "eeo_digitizer::validation",
                    source = %self.prefix,
                    section = %section,
                    "{}",
                    event
                );
            }
            Diagnostic::AmbiguousRotation { .. } => {
                tracing::warn!(
                    target: "eeo_digitizer::preprocessing",
                    source = %self.prefix,
                    "{}",
                    event
                );
            }
            Diagnostic::SectionSkipped { .. } => {
                tracing::error!(
                    target: "eeo_digitizer::grid",
                    source = %self.prefix,
                    section = %section,
                    "{}",
                    event
                );
            }
        }
        metrics::record_cell_diagnostic(event.kind());
        self.events.push(event);
    }

    pub fn events(&self) -> &[Diagnostic] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events belonging to one section
    pub fn for_section<'a>(&'a self, section: &'a str) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        self.events
            .iter()
            .filter(move |event| event.section() == Some(section))
    }

    /// Count events by kind
    pub fn summary(&self) -> DiagnosticSummary {
        let mut summary = DiagnosticSummary::default();
        for event in &self.events {
            match event {
                Diagnostic::EmptyCell { .. } => summary.empty_cells += 1,
                Diagnostic::InvalidDigit { .. } => summary.invalid_digits += 1,
                Diagnostic::UnconfidentCell { .. } => summary.unconfident_cells += 1,
                Diagnostic::OutOfGrid { .. } => summary.out_of_grid += 1,
                Diagnostic::CellCorrected { .. } => summary.corrected_cells += 1,
                Diagnostic::RowMismatchUncorrectable { .. } => summary.uncorrectable_rows += 1,
                Diagnostic::InvalidTable { .. } => summary.invalid_tables += 1,
                Diagnostic::AmbiguousRotation { .. } => summary.ambiguous_rotations += 1,
                Diagnostic::SectionSkipped { .. } => summary.skipped_sections += 1,
            }
        }
        summary
    }
}
