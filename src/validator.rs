//! # Table Validation and Correction
//!
//! Checks the arithmetic invariants of a post-processed table (row totals,
//! column totals and the grand total) and performs a bounded repair: a
//! mismatching row is fixed only when exactly one of its cells is below the
//! correction confidence threshold.
//!
//! [`TableValidator::validate`] mutates the table it is given;
//! [`TableValidator::validated_copy`] leaves its input untouched.

use serde::Serialize;

use crate::config::{FormType, GridConfig};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::observability::metrics;
use crate::table::Table;

/// Final classification of a validated table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    /// Every row and column total matches
    Valid,
    /// Everything matches except the grand total, which was overwritten
    ValidInvalidSum,
    /// At least one invariant still fails
    Invalid,
}

impl TableStatus {
    /// Human-readable status, as written to the processing log
    pub fn message(&self) -> &'static str {
        match self {
            TableStatus::Valid => "Valid table",
            TableStatus::ValidInvalidSum => "Valid table, invalid sum",
            TableStatus::Invalid => "Invalid table",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TableStatus::Valid => "valid",
            TableStatus::ValidInvalidSum => "valid_invalid_sum",
            TableStatus::Invalid => "invalid",
        }
    }
}

/// Outcome of validating one table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub row_valid: Vec<bool>,
    pub col_valid: Vec<bool>,
    /// True when any cell value was rewritten
    pub corrected: bool,
    /// `(row, col)` of every repaired cell, grand total included
    pub repaired_cells: Vec<(usize, usize)>,
    pub status: TableStatus,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.status != TableStatus::Invalid
    }
}

/// Result of row validation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowValidation {
    pub row_valid: Vec<bool>,
    pub repaired_cells: Vec<(usize, usize)>,
}

fn sum_values(table: &Table, row: usize, cols: std::ops::Range<usize>) -> u128 {
    cols.filter_map(|col| table.value(row, col))
        .map(u128::from)
        .sum()
}

/// Compares each column's data-row sum against the form's total row.
///
/// EEO-1 totals live in the second-to-last row (the last row is the prior-year
/// total); EEO-5 totals live in the last row. Comparison is exact.
pub fn validate_columns(table: &Table, form_type: FormType) -> Vec<bool> {
    let cols = table.cols();
    let Some(total_row) = form_type.total_row_index(table.rows()) else {
        return vec![false; cols];
    };

    (0..cols)
        .map(|col| {
            let sum: u128 = (0..total_row)
                .filter_map(|row| table.value(row, col))
                .map(u128::from)
                .sum();
            table.value(total_row, col).map(u128::from) == Some(sum)
        })
        .collect()
}

/// Compares each row's data-column sum against its last column, repairing a
/// mismatching row when exactly one cell has confidence below
/// `correction_threshold`.
///
/// * A low-confidence data cell becomes `total − sum(other data cells)`.
/// * A low-confidence total cell becomes `sum(data cells)`.
///
/// A repair that would need a negative data value is rejected and the row stays
/// invalid. Rows with zero or several low-confidence cells are left untouched.
pub fn validate_rows_with_correction(
    table: &mut Table,
    correction_threshold: f32,
    diagnostics: &mut Diagnostics,
) -> RowValidation {
    let (rows, cols) = (table.rows(), table.cols());
    let mut result = RowValidation {
        row_valid: vec![false; rows],
        repaired_cells: Vec::new(),
    };
    if cols == 0 {
        return result;
    }
    let total_col = cols - 1;

    for row in 0..rows {
        let data_sum = sum_values(table, row, 0..total_col);
        let target = table.value(row, total_col).map(u128::from).unwrap_or(0);

        if data_sum == target {
            result.row_valid[row] = true;
            continue;
        }

        let low_confidence: Vec<usize> = (0..cols)
            .filter(|&col| {
                table
                    .confidence(row, col)
                    .is_some_and(|c| c < correction_threshold)
            })
            .collect();

        if low_confidence.len() != 1 {
            diagnostics.record(Diagnostic::RowMismatchUncorrectable {
                section: table.section.clone(),
                row,
                low_confidence_cells: low_confidence.len(),
            });
            continue;
        }

        let col = low_confidence[0];
        let repaired = if col == total_col {
            u64::try_from(data_sum).ok()
        } else {
            let current = table.value(row, col).map(u128::from).unwrap_or(0);
            let rest = data_sum - current;
            target
                .checked_sub(rest)
                .and_then(|v| u64::try_from(v).ok())
        };

        match (repaired, table.grid.get_mut(row, col)) {
            (Some(new_value), Some(cell)) => {
                let old_value = cell.value;
                cell.value = new_value;
                diagnostics.record(Diagnostic::CellCorrected {
                    section: table.section.clone(),
                    row,
                    col,
                    old_value,
                    new_value,
                });
                result.row_valid[row] = true;
                result.repaired_cells.push((row, col));
            }
            _ => {
                diagnostics.record(Diagnostic::RowMismatchUncorrectable {
                    section: table.section.clone(),
                    row,
                    low_confidence_cells: 1,
                });
            }
        }
    }

    result
}

/// Overwrites the grand-total cell when the row totals and the total row agree.
///
/// Sums the total column over the data rows and the total row over the data
/// columns; when both sums are equal the grand total (total row, last column)
/// is set to that value. Returns whether the update happened.
pub fn update_total(table: &mut Table, form_type: FormType) -> bool {
    let cols = table.cols();
    let Some(total_row) = form_type.total_row_index(table.rows()) else {
        return false;
    };
    if cols == 0 {
        return false;
    }
    let total_col = cols - 1;

    let row_totals: u128 = (0..total_row)
        .filter_map(|row| table.value(row, total_col))
        .map(u128::from)
        .sum();
    let total_row_sum = sum_values(table, total_row, 0..total_col);

    if row_totals != total_row_sum {
        return false;
    }
    match (u64::try_from(row_totals), table.grid.get_mut(total_row, total_col)) {
        (Ok(value), Some(cell)) => {
            cell.value = value;
            true
        }
        _ => false,
    }
}

/// Distance of the grand total from the two ways of recomputing it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MarginDifference {
    /// `|Σ row totals − grand total|`
    pub row_total_diff: u64,
    /// `|Σ total-row entries − grand total|`
    pub col_total_diff: u64,
}

impl MarginDifference {
    /// Larger of the two differences
    pub fn max(&self) -> u64 {
        self.row_total_diff.max(self.col_total_diff)
    }
}

/// Compute the margin differences of a table, `None` when it has no total row
pub fn margin_difference(table: &Table, form_type: FormType) -> Option<MarginDifference> {
    let total_row = form_type.total_row_index(table.rows())?;
    let total_col = table.cols().checked_sub(1)?;
    let grand_total = i128::from(table.value(total_row, total_col)?);

    let row_sum: i128 = (0..total_row)
        .filter_map(|row| table.value(row, total_col))
        .map(i128::from)
        .sum();
    let col_sum: i128 = (0..total_col)
        .filter_map(|col| table.value(total_row, col))
        .map(i128::from)
        .sum();

    let abs_diff = |a: i128| u64::try_from((a - grand_total).abs()).unwrap_or(u64::MAX);
    Some(MarginDifference {
        row_total_diff: abs_diff(row_sum),
        col_total_diff: abs_diff(col_sum),
    })
}

/// Validator for one form type
#[derive(Debug, Clone)]
pub struct TableValidator {
    form_type: FormType,
    correction_threshold: f32,
}

impl TableValidator {
    pub fn new(form_type: FormType, config: &GridConfig) -> Self {
        Self {
            form_type,
            correction_threshold: config.low_confidence_correction_threshold,
        }
    }

    pub fn with_threshold(form_type: FormType, correction_threshold: f32) -> Self {
        Self {
            form_type,
            correction_threshold,
        }
    }

    /// Validate and correct `table` in place.
    ///
    /// Rows are validated (and repaired) first, then columns. When every row and
    /// every column but the last is valid, the grand total is reconciled.
    pub fn validate(&self, table: &mut Table, diagnostics: &mut Diagnostics) -> ValidationReport {
        let rows = validate_rows_with_correction(table, self.correction_threshold, diagnostics);
        let col_valid = validate_columns(table, self.form_type);
        let mut repaired_cells = rows.repaired_cells;

        let all_rows = rows.row_valid.iter().all(|v| *v);
        let status = match col_valid.split_last() {
            _ if all_rows && col_valid.iter().all(|v| *v) => TableStatus::Valid,
            Some((false, leading)) if all_rows && leading.iter().all(|v| *v) => {
                if update_total(table, self.form_type) {
                    if let Some(total_row) = self.form_type.total_row_index(table.rows()) {
                        repaired_cells.push((total_row, table.cols() - 1));
                    }
                    TableStatus::ValidInvalidSum
                } else {
                    TableStatus::Invalid
                }
            }
            _ => TableStatus::Invalid,
        };

        match status {
            TableStatus::Invalid => diagnostics.record(Diagnostic::InvalidTable {
                section: table.section.clone(),
                row_valid: rows.row_valid.clone(),
                col_valid: col_valid.clone(),
            }),
            _ => tracing::info!(
                target: "eeo_digitizer::validation",
                source = %diagnostics.prefix(),
                section = %table.section,
                "{}",
                status.message()
            ),
        }

        let form = self.form_type.as_str();
        metrics::record_table_classification(form, status.as_str());
        for _ in &repaired_cells {
            metrics::record_cell_correction(form);
        }

        ValidationReport {
            row_valid: rows.row_valid,
            col_valid,
            corrected: !repaired_cells.is_empty(),
            repaired_cells,
            status,
        }
    }

    /// Validate a copy of `table`, returning the corrected copy and its report
    pub fn validated_copy(&self, table: &Table, diagnostics: &mut Diagnostics) -> (Table, ValidationReport) {
        let mut copy = table.clone();
        let report = self.validate(&mut copy, diagnostics);
        (copy, report)
    }
}
