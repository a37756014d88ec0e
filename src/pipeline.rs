//! # Form Pipeline
//!
//! Drives one whole form through grid mapping, post-processing, EEO-5 merging
//! and validation, and renders the results as records keyed by cell id.
//!
//! A misconfigured or unmappable section never aborts the form: it is logged,
//! recorded as a `SectionSkipped` diagnostic and left out of the output.

use std::collections::BTreeMap;

use image::{DynamicImage, GenericImageView};
use serde::Serialize;

use crate::cell_names::{classify_cell, record_id, record_parts, CellKind};
use crate::config::{EngineConfig, FormLayout, FormType, RowPitch};
use crate::detection::{flatten_text_lines, OcrDocument};
use crate::diagnostics::{Diagnostic, DiagnosticSummary, Diagnostics};
use crate::errors::{error_logging, DigitizerError, DigitizerResult};
use crate::grid_mapper::{post_process_table, GridMapper};
use crate::merger::{merge_eeo5, SectionKey};
use crate::observability::{form_span, metrics};
use crate::preprocessing::{normalize_page, NormalizedPage};
use crate::table::RawTable;
use crate::validator::{TableValidator, ValidationReport};

/// OCR output for one named cell of a form
#[derive(Debug, Clone)]
pub struct FormCell {
    pub name: String,
    pub document: OcrDocument,
}

impl FormCell {
    pub fn new(name: impl Into<String>, document: OcrDocument) -> Self {
        Self {
            name: name.into(),
            document,
        }
    }
}

/// Content and confidences of a record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RecordBody {
    Table {
        content: Vec<Vec<u64>>,
        confidence: Vec<Vec<f32>>,
    },
    Text {
        content: Vec<String>,
        confidence: Vec<f32>,
    },
}

/// One output record, serialized as `{id, section, content, confidence}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRecord {
    pub id: String,
    pub section: String,
    #[serde(flatten)]
    pub body: RecordBody,
}

/// Everything produced for one form
#[derive(Debug, Clone)]
pub struct FormResult {
    pub source: String,
    pub form_type: FormType,
    /// Sorted by id
    pub records: Vec<TableRecord>,
    /// Validation outcome per table record id
    pub reports: BTreeMap<String, ValidationReport>,
    pub diagnostics: Diagnostics,
}

impl FormResult {
    pub fn record(&self, id: &str) -> Option<&TableRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn summary(&self) -> DiagnosticSummary {
        self.diagnostics.summary()
    }

    /// Records as a pretty-printed JSON array
    pub fn records_json(&self) -> DigitizerResult<String> {
        serde_json::to_string_pretty(&self.records)
            .map_err(|e| DigitizerError::Internal(format!("Cannot serialize records: {}", e)))
    }
}

/// Digitizes whole forms of one type
#[derive(Debug, Clone)]
pub struct FormDigitizer {
    config: EngineConfig,
    layout: FormLayout,
    validator: TableValidator,
}

impl FormDigitizer {
    /// Build a digitizer from an explicit layout
    pub fn new(config: EngineConfig, layout: FormLayout) -> DigitizerResult<Self> {
        config.validate()?;
        layout.validate()?;
        let validator = TableValidator::new(layout.form_type, &config.grid);
        Ok(Self {
            config,
            layout,
            validator,
        })
    }

    /// Build a digitizer with the default layout of `form_type`. EEO-1 fixed row
    /// pitches take `grid.eeo1_row_pitch_px`.
    pub fn for_form(form_type: FormType, config: EngineConfig) -> DigitizerResult<Self> {
        let mut layout = FormLayout::for_form(form_type);
        if form_type == FormType::Eeo1 {
            for section in &mut layout.sections {
                if let RowPitch::Fixed(_) = section.row_pitch {
                    section.row_pitch = RowPitch::Fixed(config.grid.eeo1_row_pitch_px);
                }
            }
        }
        Self::new(config, layout)
    }

    pub fn form_type(&self) -> FormType {
        self.layout.form_type
    }

    pub fn layout(&self) -> &FormLayout {
        &self.layout
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Normalize one scanned page with the configured geometry. Failures are
    /// logged and returned; the caller skips the page.
    pub fn normalize_page(
        &self,
        page_index: usize,
        image: &DynamicImage,
        diagnostics: &mut Diagnostics,
    ) -> DigitizerResult<NormalizedPage> {
        normalize_page(image, &self.config.geometry, diagnostics).map_err(|e| {
            let error = DigitizerError::from(e);
            error_logging::log_page_error(
                &error,
                "normalize_page",
                Some(page_index),
                Some(image.dimensions()),
            );
            metrics::record_error_metrics("page_normalization", "preprocessing");
            error
        })
    }

    /// Map one section's detections onto a fresh raw table
    fn map_section(
        &self,
        section: &str,
        document: &OcrDocument,
        diagnostics: &mut Diagnostics,
    ) -> DigitizerResult<RawTable> {
        let layout = self.layout.section(section)?;
        let mapper = GridMapper::new(layout, &self.config.grid)?;
        mapper.map(&document.pages, diagnostics).map_err(|e| {
            error_logging::log_table_error(
                &e,
                "map_section",
                section,
                Some(document.detection_count()),
            );
            e
        })
    }

    /// Post-process and validate a raw table into a record and its report
    fn finish_table(
        &self,
        id: String,
        section: &str,
        raw: &RawTable,
        diagnostics: &mut Diagnostics,
    ) -> (TableRecord, ValidationReport) {
        let mut table =
            post_process_table(raw, self.config.grid.confidence_threshold, diagnostics);
        let report = self.validator.validate(&mut table, diagnostics);
        let record = TableRecord {
            id,
            section: section.to_string(),
            body: RecordBody::Table {
                content: table.values(),
                confidence: table.confidences(),
            },
        };
        (record, report)
    }

    fn skip_section(section: &str, error: &DigitizerError, diagnostics: &mut Diagnostics) {
        error_logging::log_config_error(error, section, "process_form");
        metrics::record_error_metrics("section_skipped", "pipeline");
        diagnostics.record(Diagnostic::SectionSkipped {
            section: section.to_string(),
            reason: error.to_string(),
        });
    }

    /// Digitize every cell of one form.
    ///
    /// Table cells are mapped, post-processed and validated; EEO-5 sub-tables
    /// a1/a2/a3 are merged into "a" first. Free-text cells become line records.
    /// Checkbox cells are ignored.
    pub fn process_form(&self, source: &str, cells: &[FormCell]) -> FormResult {
        let form_type = self.layout.form_type;
        let _span = form_span(form_type.as_str(), source).entered();

        let mut diagnostics = Diagnostics::new(source);
        let mut records = Vec::with_capacity(cells.len());
        let mut reports = BTreeMap::new();
        let mut eeo5_parts: BTreeMap<SectionKey, RawTable> = BTreeMap::new();

        for cell in cells {
            match classify_cell(form_type, &cell.name) {
                CellKind::Checkbox => {
                    tracing::debug!(
                        target: "eeo_digitizer::grid",
                        cell = %cell.name,
                        "Skipping checkbox cell"
                    );
                }
                CellKind::Text => match record_parts(&cell.name) {
                    Some((section, field)) => {
                        let (content, confidence) = flatten_text_lines(&cell.document);
                        records.push(TableRecord {
                            id: format!("{}-{}", section, field),
                            section,
                            body: RecordBody::Text {
                                content,
                                confidence,
                            },
                        });
                    }
                    None => {
                        tracing::warn!(
                            target: "eeo_digitizer::grid",
                            cell = %cell.name,
                            "Cell name has no section marker, skipping"
                        );
                    }
                },
                CellKind::Eeo1Table { section } => {
                    match self.map_section(&section, &cell.document, &mut diagnostics) {
                        Ok(raw) => {
                            let id = record_id(&cell.name)
                                .unwrap_or_else(|| format!("{}-TABLE", section));
                            let (record, report) =
                                self.finish_table(id, &section, &raw, &mut diagnostics);
                            reports.insert(record.id.clone(), report);
                            records.push(record);
                        }
                        Err(e) => Self::skip_section(&section, &e, &mut diagnostics),
                    }
                }
                CellKind::Eeo5Table { section } => {
                    let mapped = section.parse::<SectionKey>().and_then(|key| {
                        self.map_section(key.as_str(), &cell.document, &mut diagnostics)
                            .map(|raw| (key, raw))
                    });
                    match mapped {
                        Ok((key, raw)) => {
                            eeo5_parts.insert(key, raw);
                        }
                        Err(e) => Self::skip_section(&section, &e, &mut diagnostics),
                    }
                }
            }
        }

        if !eeo5_parts.is_empty() {
            for raw in merge_eeo5(eeo5_parts, &mut diagnostics) {
                let id = format!("table-{}", raw.section.to_uppercase());
                let (record, report) = self.finish_table(id, "table", &raw, &mut diagnostics);
                reports.insert(record.id.clone(), report);
                records.push(record);
            }
        }

        records.sort_by(|a, b| a.id.cmp(&b.id));

        let summary = diagnostics.summary();
        tracing::info!(
            target: "eeo_digitizer::validation",
            source = %source,
            form_type = %form_type.as_str(),
            records = records.len(),
            invalid_tables = summary.invalid_tables,
            diagnostics = summary.total(),
            "Form digitized"
        );

        FormResult {
            source: source.to_string(),
            form_type,
            records,
            reports,
            diagnostics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{Detection, OcrPage, WordGeometry};
    use crate::validator::TableStatus;

    /// Detections centred in each cell, on a page reported at twice natural scale
    fn table_document(values: &[Vec<u64>], pitch: f32) -> OcrDocument {
        let padding = 45.0;
        let page_width = 1000.0;
        let page_height = 2.0 * padding + pitch * values.len() as f32;
        let cell_width = (page_width - 2.0 * padding) / values[0].len() as f32;

        let mut detections = Vec::new();
        for (r, row) in values.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                let x = padding + cell_width * (c as f32 + 0.5);
                let y = padding + pitch * (r as f32 + 0.5);
                let geometry = WordGeometry::new(
                    ((x + 2.0) / page_width, (y - 2.0) / page_height),
                    ((x - 2.0) / page_width, (y + 2.0) / page_height),
                );
                detections.push(Detection::new(&value.to_string(), 0.95, geometry));
            }
        }
        OcrDocument {
            pages: vec![OcrPage::new(page_height * 2.0, page_width * 2.0, detections)],
        }
    }

    fn valid_rows(rows: usize, cols: usize) -> Vec<Vec<u64>> {
        let mut values: Vec<Vec<u64>> = (0..rows - 1)
            .map(|r| {
                let mut row: Vec<u64> = (0..cols - 1).map(|c| (r + c + 1) as u64).collect();
                row.push(row.iter().sum());
                row
            })
            .collect();
        let total: Vec<u64> = (0..cols).map(|c| values.iter().map(|r| r[c]).sum()).collect();
        values.push(total);
        values
    }

    #[test]
    fn test_for_form_applies_eeo1_pitch() {
        let mut config = EngineConfig::default();
        config.grid.eeo1_row_pitch_px = 30;
        let digitizer = FormDigitizer::for_form(FormType::Eeo1, config).unwrap();
        assert_eq!(
            digitizer.layout().section("h").unwrap().row_pitch,
            RowPitch::Fixed(30)
        );
    }

    #[test]
    fn test_process_eeo5_form_merges_and_validates() {
        let digitizer = FormDigitizer::for_form(FormType::Eeo5, EngineConfig::default()).unwrap();
        // 19 rows total for "a": data rows spread across a1/a2/a3, total row last
        let a = valid_rows(19, 15);
        let b = valid_rows(3, 15);
        let c = valid_rows(6, 15);

        let doc = |rows: &[Vec<u64>]| table_document(rows, 40.0);
        let cells = vec![
            FormCell::new("d12_section_table_a1", doc(&a[0..7])),
            FormCell::new("d12_section_table_a2", doc(&a[7..13])),
            FormCell::new("d12_section_table_a3", doc(&a[13..19])),
            FormCell::new("d12_section_table_b", doc(&b)),
            FormCell::new("d12_section_table_c", doc(&c)),
            FormCell::new("d12_section_a_TYPE_OF_AGENCY", OcrDocument { pages: vec![] }),
        ];

        let result = digitizer.process_form("d12", &cells);

        let ids: Vec<&str> = result.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["table-A", "table-B", "table-C"]);
        for id in ["table-A", "table-B", "table-C"] {
            assert_eq!(result.reports[id].status, TableStatus::Valid, "{}", id);
        }
        match &result.record("table-A").unwrap().body {
            RecordBody::Table { content, .. } => assert_eq!(content, &a),
            other => panic!("unexpected body {:?}", other),
        }
        assert_eq!(result.summary().total(), 0);
    }

    #[test]
    fn test_unknown_eeo5_section_is_skipped() {
        let digitizer = FormDigitizer::for_form(FormType::Eeo5, EngineConfig::default()).unwrap();
        let b = valid_rows(3, 15);
        let cells = vec![
            FormCell::new("d12_section_table_d", OcrDocument { pages: vec![] }),
            FormCell::new("d12_section_table_b", table_document(&b, 40.0)),
        ];

        let result = digitizer.process_form("d12", &cells);

        assert!(result.record("table-B").is_some());
        let skipped: Vec<&str> = result
            .diagnostics
            .events()
            .iter()
            .filter(|e| e.kind() == "section_skipped")
            .filter_map(|e| e.section())
            .collect();
        // "d" is unknown; a and c were never supplied
        assert_eq!(skipped, vec!["d", "a", "c"]);
    }

    #[test]
    fn test_text_cells_become_records() {
        let digitizer = FormDigitizer::for_form(FormType::Eeo1, EngineConfig::default()).unwrap();
        let document = OcrDocument::from_json_str(
            r#"{"pages":[{"dimensions":[100,400],"blocks":[{"lines":[{"words":[
                {"value":"ACME","confidence":0.9,"geometry":[[0.1,0.1],[0.2,0.2]]},
                {"value":"Corp","confidence":0.7,"geometry":[[0.3,0.1],[0.4,0.2]]}
            ]}]}]}]}"#,
        )
        .unwrap();
        let cells = vec![FormCell::new("acme_section_b_COMPANY_NAME", document)];

        let result = digitizer.process_form("acme", &cells);
        let record = result.record("b-COMPANY_NAME").unwrap();
        assert_eq!(record.section, "b");
        match &record.body {
            RecordBody::Text {
                content,
                confidence,
            } => {
                assert_eq!(content, &vec!["ACME Corp".to_string()]);
                assert!((confidence[0] - 0.8).abs() < 1e-6);
            }
            other => panic!("unexpected body {:?}", other),
        }
        assert!(result.reports.is_empty());
    }

    #[test]
    fn test_records_json_shape() {
        let record = TableRecord {
            id: "h-TABLE".to_string(),
            section: "h".to_string(),
            body: RecordBody::Table {
                content: vec![vec![1, 2]],
                confidence: vec![vec![0.5, -1.0]],
            },
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["id"], "h-TABLE");
        assert_eq!(value["section"], "h");
        assert_eq!(value["content"][0][1], 2);
        assert_eq!(value["confidence"][0][1], -1.0);
    }
}
