//! # EEO-5 Table Merging
//!
//! EEO-5 prints Table A across three sub-tables (a1, a2, a3). They are mapped
//! separately, then stacked vertically in that order into one logical table
//! "a" before validation. Tables "b" and "c" pass through unchanged.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::errors::{DigitizerError, DigitizerResult};
use crate::table::{Grid, RawTable};

/// Table sections of an EEO-5 form
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SectionKey {
    A1,
    A2,
    A3,
    B,
    C,
}

impl SectionKey {
    pub const ALL: [SectionKey; 5] = [
        SectionKey::A1,
        SectionKey::A2,
        SectionKey::A3,
        SectionKey::B,
        SectionKey::C,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKey::A1 => "a1",
            SectionKey::A2 => "a2",
            SectionKey::A3 => "a3",
            SectionKey::B => "b",
            SectionKey::C => "c",
        }
    }

    /// Key of the logical table the section ends up in
    pub fn merged_key(&self) -> &'static str {
        match self {
            SectionKey::A1 | SectionKey::A2 | SectionKey::A3 => "a",
            SectionKey::B => "b",
            SectionKey::C => "c",
        }
    }
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionKey {
    type Err = DigitizerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "a1" => Ok(SectionKey::A1),
            "a2" => Ok(SectionKey::A2),
            "a3" => Ok(SectionKey::A3),
            "b" => Ok(SectionKey::B),
            "c" => Ok(SectionKey::C),
            other => Err(DigitizerError::Config(format!(
                "Unknown EEO-5 table section '{}'",
                other
            ))),
        }
    }
}

/// Stack sub-tables vertically, in the given order, into a table named `section`
pub fn stack_tables(section: &str, parts: &[&RawTable]) -> DigitizerResult<RawTable> {
    let grids: Vec<&Grid<_>> = parts.iter().map(|t| &t.grid).collect();
    Ok(RawTable {
        section: section.to_string(),
        grid: Grid::vstack(&grids)?,
    })
}

/// Merges mapped EEO-5 sections into the logical tables "a", "b" and "c".
///
/// "a" is produced only when a1, a2 and a3 are all present and share a column
/// count; otherwise it is skipped with a diagnostic. Missing "b" or "c" tables
/// are likewise skipped.
pub fn merge_eeo5(
    mut sections: BTreeMap<SectionKey, RawTable>,
    diagnostics: &mut Diagnostics,
) -> Vec<RawTable> {
    let mut merged = Vec::with_capacity(3);

    let parts = [SectionKey::A1, SectionKey::A2, SectionKey::A3];
    match parts
        .iter()
        .map(|key| sections.get(key).ok_or(*key))
        .collect::<Result<Vec<_>, _>>()
    {
        Ok(tables) => match stack_tables("a", &tables) {
            Ok(table) => {
                tracing::debug!(
                    target: "eeo_digitizer::grid",
                    rows = table.grid.rows(),
                    "Merged a1/a2/a3 into table a"
                );
                merged.push(table);
            }
            Err(e) => diagnostics.record(Diagnostic::SectionSkipped {
                section: "a".to_string(),
                reason: e.to_string(),
            }),
        },
        Err(missing) => diagnostics.record(Diagnostic::SectionSkipped {
            section: "a".to_string(),
            reason: format!("missing sub-table {}", missing),
        }),
    }

    for key in [SectionKey::B, SectionKey::C] {
        match sections.remove(&key) {
            Some(mut table) => {
                table.section = key.merged_key().to_string();
                merged.push(table);
            }
            None => diagnostics.record(Diagnostic::SectionSkipped {
                section: key.to_string(),
                reason: "missing table".to_string(),
            }),
        }
    }

    merged
}
