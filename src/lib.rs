//! # EEO Form Digitizer
//!
//! Turns scanned EEO-1 and EEO-5 report forms into checked numeric tables:
//! page orientation and crop normalization, placement of OCR word detections
//! onto each section's grid, and reconciliation of the resulting tables against
//! their row, column and grand totals.

pub mod cell_names;
pub mod config;
pub mod detection;
pub mod diagnostics;
pub mod errors;
pub mod geometry;
pub mod grid_mapper;
pub mod merger;
pub mod observability;
pub mod observability_config;
pub mod pipeline;
pub mod preprocessing;
pub mod table;
pub mod validator;

// Re-export types for easier access
pub use config::{EngineConfig, FormLayout, FormType, GeometryConfig, GridConfig, RowPitch, SectionLayout};
pub use detection::{Detection, OcrDocument, OcrPage, WordGeometry};
pub use diagnostics::{Diagnostic, DiagnosticSummary, Diagnostics};
pub use errors::{DigitizerError, DigitizerResult};
pub use grid_mapper::{post_process_table, GridMapper};
pub use pipeline::{FormCell, FormDigitizer, FormResult, RecordBody, TableRecord};
pub use table::{Cell, RawCell, RawTable, Table};
pub use validator::{TableStatus, TableValidator, ValidationReport};
