//! # Grid Mapping
//!
//! Places OCR word detections of one form section onto its fixed row/column
//! grid, then converts the raw tokens into numbers.
//!
//! Rows beyond the last grid row are clamped onto it; columns outside the grid
//! are not clamped. Such detections are reported as out-of-grid and dropped.

use crate::config::{GridConfig, RowPitch, SectionLayout};
use crate::detection::{is_digit_token, OcrPage};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::errors::{DigitizerError, DigitizerResult};
use crate::observability::{metrics, table_span};
use crate::table::{Cell, RawCell, RawTable, Table};

/// Grid cell a detection midpoint falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Inside the grid (the row may have been clamped)
    Cell { row: usize, col: usize },
    /// Column outside the grid
    OutOfGrid { row: usize, col: i64 },
}

/// Pixel geometry of one section on one page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellMetrics {
    pub page_width: f32,
    pub page_height: f32,
    pub cell_width: f32,
    pub row_pitch: f32,
}

/// Maps detections of one section onto its grid
#[derive(Debug, Clone)]
pub struct GridMapper {
    layout: SectionLayout,
    render_upscale_factor: f32,
}

impl GridMapper {
    /// Create a mapper for one section; invalid layouts are configuration errors
    pub fn new(layout: &SectionLayout, config: &GridConfig) -> DigitizerResult<Self> {
        layout.validate()?;
        if config.render_upscale_factor <= 0.0 {
            return Err(DigitizerError::Config(format!(
                "render_upscale_factor must be positive, got {}",
                config.render_upscale_factor
            )));
        }
        Ok(Self {
            layout: layout.clone(),
            render_upscale_factor: config.render_upscale_factor,
        })
    }

    pub fn layout(&self) -> &SectionLayout {
        &self.layout
    }

    /// Cell geometry for a page reported at `(height, width)`
    pub fn cell_metrics(&self, height: f32, width: f32) -> DigitizerResult<CellMetrics> {
        let page_width = width / self.render_upscale_factor;
        let page_height = height / self.render_upscale_factor;
        let padding = self.layout.padding_px as f32;

        let cell_width = (page_width - 2.0 * padding) / self.layout.cols as f32;
        let row_pitch = match self.layout.row_pitch {
            RowPitch::Fixed(pitch) => pitch as f32,
            RowPitch::Derived => (page_height - 2.0 * padding) / self.layout.rows as f32,
        };

        if !(cell_width > 0.0 && row_pitch > 0.0) {
            return Err(DigitizerError::Geometry(format!(
                "Page {}x{} too small for section '{}' with {}px padding",
                page_width, page_height, self.layout.key, self.layout.padding_px
            )));
        }

        Ok(CellMetrics {
            page_width,
            page_height,
            cell_width,
            row_pitch,
        })
    }

    /// Grid position of a pixel-space midpoint
    pub fn locate(&self, metrics: &CellMetrics, mid_x: f32, mid_y: f32) -> Placement {
        let padding = self.layout.padding_px as f32;
        let col = ((mid_x - padding) / metrics.cell_width).floor() as i64;
        let row = ((mid_y - padding) / metrics.row_pitch).floor() as i64;

        let last_row = self.layout.rows - 1;
        let row = if row < 0 {
            0
        } else {
            (row as usize).min(last_row)
        };

        if col < 0 || col >= self.layout.cols as i64 {
            Placement::OutOfGrid { row, col }
        } else {
            Placement::Cell {
                row,
                col: col as usize,
            }
        }
    }

    /// Populate a fresh raw table from the detections of every page, in
    /// emission order. A cell is overwritten only while it is empty or holds a
    /// non-digit token.
    pub fn map(&self, pages: &[OcrPage], diagnostics: &mut Diagnostics) -> DigitizerResult<RawTable> {
        let section = self.layout.key.as_str();
        let _span = table_span(section, self.layout.rows, self.layout.cols).entered();

        let mut table = RawTable::empty(section, self.layout.rows, self.layout.cols);
        let mut placed = 0usize;
        let mut dropped = 0usize;

        for page in pages {
            let metrics = self.cell_metrics(page.height, page.width)?;

            for detection in &page.detections {
                let mid = detection
                    .geometry
                    .midpoint(metrics.page_width, metrics.page_height);

                let (row, col) = match self.locate(&metrics, mid.x, mid.y) {
                    Placement::Cell { row, col } => (row, col),
                    Placement::OutOfGrid { row, col } => {
                        diagnostics.record(Diagnostic::OutOfGrid {
                            section: section.to_string(),
                            value: detection.value.clone(),
                            col,
                            row,
                        });
                        dropped += 1;
                        continue;
                    }
                };

                if !detection.is_digit() {
                    diagnostics.record(Diagnostic::InvalidDigit {
                        section: section.to_string(),
                        value: detection.value.clone(),
                        col: col as i64,
                        row,
                    });
                }

                if let Some(cell) = table.grid.get_mut(row, col) {
                    if !cell.holds_digit() {
                        *cell = RawCell::Detected {
                            text: detection.value.clone(),
                            confidence: detection.confidence,
                        };
                        placed += 1;
                    }
                }
            }
        }

        tracing::debug!(
            target: "eeo_digitizer::grid",
            section = %section,
            placed,
            dropped,
            "Mapped detections onto {}x{} grid",
            self.layout.rows,
            self.layout.cols
        );
        metrics::record_grid_mapping(section, placed, dropped);

        Ok(table)
    }
}

/// Converts a raw table into numbers.
///
/// * Empty cells become 0 (confidence stays -1) and are reported.
/// * Non-digit tokens become 0 and are reported.
/// * Digits below `confidence_threshold` keep their value and are reported.
///
/// Never fails; every cell yields a value.
pub fn post_process_table(
    raw: &RawTable,
    confidence_threshold: f32,
    diagnostics: &mut Diagnostics,
) -> Table {
    let grid = raw.grid.map_indexed(|row, col, raw_cell| match raw_cell {
        RawCell::Empty => {
            diagnostics.record(Diagnostic::EmptyCell {
                section: raw.section.clone(),
                col,
                row,
            });
            Cell::empty()
        }
        RawCell::Detected { text, confidence } => match parse_digits(text) {
            None => {
                diagnostics.record(Diagnostic::InvalidDigit {
                    section: raw.section.clone(),
                    value: text.clone(),
                    col: col as i64,
                    row,
                });
                Cell::new(0, *confidence)
            }
            Some(value) => {
                if *confidence < confidence_threshold {
                    diagnostics.record(Diagnostic::UnconfidentCell {
                        section: raw.section.clone(),
                        value: text.clone(),
                        confidence: *confidence,
                        col,
                        row,
                    });
                }
                Cell::new(value, *confidence)
            }
        },
    });
    Table::new(&raw.section, grid)
}

fn parse_digits(text: &str) -> Option<u64> {
    if is_digit_token(text) {
        text.parse().ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{Detection, WordGeometry};

    fn eeo1_mapper() -> GridMapper {
        let layout = SectionLayout::new("h", 10, 15, RowPitch::Fixed(25));
        GridMapper::new(&layout, &GridConfig::default()).unwrap()
    }

    /// Detection centered on pixel `(x, y)` of a page of natural size `(w, h)`
    fn word_at(value: &str, confidence: f32, x: f32, y: f32, w: f32, h: f32) -> Detection {
        let (nx, ny) = (x / w, y / h);
        let half = 0.005;
        Detection::new(
            value,
            confidence,
            WordGeometry::new((nx + half, ny - half), (nx - half, ny + half)),
        )
    }

    #[test]
    fn test_cell_metrics_divides_by_upscale_factor() {
        let mapper = eeo1_mapper();
        let metrics = mapper.cell_metrics(1200.0, 1200.0).unwrap();
        assert_eq!(metrics.page_width, 600.0);
        assert_eq!(metrics.cell_width, (600.0 - 90.0) / 15.0);
        assert_eq!(metrics.row_pitch, 25.0);
    }

    #[test]
    fn test_cell_metrics_derived_pitch() {
        let layout = SectionLayout::new("b", 3, 15, RowPitch::Derived);
        let mapper = GridMapper::new(&layout, &GridConfig::default()).unwrap();
        let metrics = mapper.cell_metrics(390.0, 1200.0).unwrap();
        assert_eq!(metrics.row_pitch, (195.0 - 90.0) / 3.0);
    }

    #[test]
    fn test_cell_metrics_page_too_small() {
        let mapper = eeo1_mapper();
        assert!(matches!(
            mapper.cell_metrics(100.0, 100.0),
            Err(DigitizerError::Geometry(_))
        ));
    }

    #[test]
    fn test_locate_clamps_rows_not_columns() {
        let mapper = eeo1_mapper();
        let metrics = mapper.cell_metrics(1200.0, 1200.0).unwrap();

        assert_eq!(
            mapper.locate(&metrics, 50.0, 50.0),
            Placement::Cell { row: 0, col: 0 }
        );
        // Row 40 clamps onto the last row
        assert_eq!(
            mapper.locate(&metrics, 50.0, 45.0 + 25.0 * 40.0),
            Placement::Cell { row: 9, col: 0 }
        );
        // Right of the last column
        assert!(matches!(
            mapper.locate(&metrics, 590.0, 50.0),
            Placement::OutOfGrid { col: 16, .. }
        ));
        // Left of the padding
        assert!(matches!(
            mapper.locate(&metrics, 30.0, 50.0),
            Placement::OutOfGrid { col: -1, .. }
        ));
    }

    #[test]
    fn test_locate_above_padding_lands_in_first_row() {
        let mapper = eeo1_mapper();
        let metrics = mapper.cell_metrics(1200.0, 1200.0).unwrap();

        // Rows -1 and -2 go to the first row, never wrap to the last
        assert_eq!(
            mapper.locate(&metrics, 50.0, 30.0),
            Placement::Cell { row: 0, col: 0 }
        );
        assert_eq!(
            mapper.locate(&metrics, 84.0, 0.0),
            Placement::Cell { row: 0, col: 1 }
        );
        // Above the padding and left of it stays out of the grid
        assert_eq!(
            mapper.locate(&metrics, 30.0, 30.0),
            Placement::OutOfGrid { row: 0, col: -1 }
        );
    }

    #[test]
    fn test_map_first_digit_wins() {
        let mapper = eeo1_mapper();
        let page = OcrPage::new(
            1200.0,
            1200.0,
            vec![
                word_at("x", 0.9, 50.0, 50.0, 600.0, 600.0),
                word_at("12", 0.9, 52.0, 52.0, 600.0, 600.0),
                word_at("34", 0.95, 54.0, 54.0, 600.0, 600.0),
            ],
        );
        let mut diagnostics = Diagnostics::new("test");
        let table = mapper.map(&[page], &mut diagnostics).unwrap();

        assert_eq!(
            table.grid.get(0, 0),
            Some(&RawCell::Detected {
                text: "12".to_string(),
                confidence: 0.9
            })
        );
        assert_eq!(diagnostics.summary().invalid_digits, 1);
    }

    #[test]
    fn test_map_drops_out_of_grid() {
        let mapper = eeo1_mapper();
        let page = OcrPage::new(
            1200.0,
            1200.0,
            vec![word_at("7", 0.9, 590.0, 50.0, 600.0, 600.0)],
        );
        let mut diagnostics = Diagnostics::new("test");
        let table = mapper.map(&[page], &mut diagnostics).unwrap();

        assert!(table.grid.iter_rows().flatten().all(|c| *c == RawCell::Empty));
        assert_eq!(diagnostics.summary().out_of_grid, 1);
    }

    #[test]
    fn test_post_process_table() {
        let mut raw = RawTable::empty("h", 1, 4);
        *raw.grid.get_mut(0, 1).unwrap() = RawCell::Detected {
            text: "15".to_string(),
            confidence: 0.95,
        };
        *raw.grid.get_mut(0, 2).unwrap() = RawCell::Detected {
            text: "I5".to_string(),
            confidence: 0.9,
        };
        *raw.grid.get_mut(0, 3).unwrap() = RawCell::Detected {
            text: "8".to_string(),
            confidence: 0.5,
        };

        let mut diagnostics = Diagnostics::new("test");
        let table = post_process_table(&raw, 0.8, &mut diagnostics);

        assert_eq!(table.values(), vec![vec![0, 15, 0, 8]]);
        assert_eq!(table.confidences(), vec![vec![-1.0, 0.95, 0.9, 0.5]]);

        let summary = diagnostics.summary();
        assert_eq!(summary.empty_cells, 1);
        assert_eq!(summary.invalid_digits, 1);
        assert_eq!(summary.unconfident_cells, 1);
        assert_eq!(
            diagnostics.events()[0].to_string(),
            "Empty_cell,loc:[0, 0]"
        );
    }

    #[test]
    fn test_post_process_overflowing_digits_are_invalid() {
        let mut raw = RawTable::empty("h", 1, 1);
        *raw.grid.get_mut(0, 0).unwrap() = RawCell::Detected {
            text: "99999999999999999999999".to_string(),
            confidence: 0.99,
        };
        let mut diagnostics = Diagnostics::new("test");
        let table = post_process_table(&raw, 0.8, &mut diagnostics);
        assert_eq!(table.value(0, 0), Some(0));
        assert_eq!(diagnostics.summary().invalid_digits, 1);
    }
}
