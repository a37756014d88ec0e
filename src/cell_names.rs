//! Cell identifiers produced by form segmentation.
//!
//! Every segmented region is named `<file>_section_<section>_<field>`. EEO-5
//! table regions use `<file>_section_table_<key>` and the EEO-1 table region
//! ends in `_h_TABLE`.

use lazy_static::lazy_static;
use regex::Regex;

use crate::config::FormType;

lazy_static! {
    static ref EEO5_TABLE_CELL: Regex =
        Regex::new(r"^.+_section_table_([a-z0-9]+)$").expect("Invalid EEO-5 table cell pattern");
    static ref RECORD_ID: Regex = Regex::new(r"(?i)^.*_section_([a-z]+)_([a-z0-9_]+)")
        .expect("Invalid record id pattern");
}

/// Checkbox regions are read by a separate shading detector
const CHECKBOX_CELL_SUFFIXES: [&str; 2] = ["ef_SECTION_E_AND_F", "section_a_TYPE_OF_AGENCY"];

/// Field name of the EEO-1 table region
const EEO1_TABLE_FIELD: &str = "TABLE";

/// What a named cell holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellKind {
    /// EEO-1 section table, by layout section key
    Eeo1Table { section: String },
    /// EEO-5 sub-table; the key is not yet checked against the known sections
    Eeo5Table { section: String },
    /// Checkbox group, not digitized here
    Checkbox,
    /// Free-text field
    Text,
}

/// Classify a cell by its name
pub fn classify_cell(form_type: FormType, name: &str) -> CellKind {
    if CHECKBOX_CELL_SUFFIXES.iter().any(|s| name.ends_with(s)) {
        return CellKind::Checkbox;
    }

    match form_type {
        FormType::Eeo5 => {
            if let Some(caps) = EEO5_TABLE_CELL.captures(name) {
                return CellKind::Eeo5Table {
                    section: caps[1].to_string(),
                };
            }
        }
        FormType::Eeo1 => {
            if let Some((section, field)) = record_parts(name) {
                if field == EEO1_TABLE_FIELD {
                    return CellKind::Eeo1Table { section };
                }
            }
        }
    }
    CellKind::Text
}

/// Split a cell name into its `(section, field)` parts
pub fn record_parts(name: &str) -> Option<(String, String)> {
    RECORD_ID
        .captures(name)
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
}

/// Record id `"<section>-<field>"` for a cell name
pub fn record_id(name: &str) -> Option<String> {
    record_parts(name).map(|(section, field)| format!("{}-{}", section, field))
}
