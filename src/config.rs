//! # Engine Configuration
//!
//! This module gathers every tunable of the digitization engine into typed
//! configuration structures. Values are loaded from environment variables with
//! defaults, validated per section, and form layouts can be supplied as JSON.

use std::env;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{DigitizerError, DigitizerResult};
use crate::observability_config::ObservabilityConfig;

/// Margin in pixels between the rendered cell image border and the table grid
pub const DEFAULT_PADDING_PX: u32 = 45;
/// Fixed row pitch of the EEO-1 section H table, in pixels
pub const DEFAULT_EEO1_ROW_PITCH_PX: u32 = 25;
/// Minimum confidence for an OCR digit to be accepted without a warning
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.8;
/// Confidence below which a cell is considered a repair candidate
pub const DEFAULT_CORRECTION_THRESHOLD: f32 = 0.7;
/// Factor by which the rasterizer inflates reported page dimensions
pub const DEFAULT_RENDER_UPSCALE_FACTOR: f32 = 2.0;
/// Legacy fixed canvas the cropped pages are re-rendered to
pub const DEFAULT_TARGET_WIDTH: u32 = 523;
pub const DEFAULT_TARGET_HEIGHT: u32 = 679;

/// Supported government report forms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormType {
    /// EEO-1 employer information report (single table, section H)
    Eeo1,
    /// EEO-5 elementary-secondary staff information report (tables A, B, C)
    Eeo5,
}

impl FormType {
    /// Number of trailing total rows excluded from column sums.
    ///
    /// EEO-1 carries a current-year total row followed by a prior-year total row;
    /// EEO-5 has a single total row.
    pub fn trailing_total_rows(&self) -> usize {
        match self {
            FormType::Eeo1 => 2,
            FormType::Eeo5 => 1,
        }
    }

    /// Index of the row holding the column totals for a table of `rows` rows.
    pub fn total_row_index(&self, rows: usize) -> Option<usize> {
        let trailing = self.trailing_total_rows();
        (rows > trailing).then(|| rows - trailing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FormType::Eeo1 => "eeo1",
            FormType::Eeo5 => "eeo5",
        }
    }
}

impl FromStr for FormType {
    type Err = DigitizerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "eeo1" => Ok(FormType::Eeo1),
            "eeo5" => Ok(FormType::Eeo5),
            other => Err(DigitizerError::Config(format!(
                "Invalid form type '{}'. Expected 'eeo1' or 'eeo5'",
                other
            ))),
        }
    }
}

/// Vertical spacing of table rows
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowPitch {
    /// Fixed pixel pitch per row
    Fixed(u32),
    /// Uniform pitch derived from the page height: `(height - 2 * padding) / rows`
    Derived,
}

/// Grid description of one table section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionLayout {
    /// Section key as it appears in cell identifiers (e.g. "h", "a1", "b")
    pub key: String,
    /// Number of grid rows, including total rows
    pub rows: usize,
    /// Number of grid columns, including the row-total column
    pub cols: usize,
    /// Margin around the grid in pixels
    #[serde(default = "default_padding")]
    pub padding_px: u32,
    /// Row pitch policy
    pub row_pitch: RowPitch,
}

fn default_padding() -> u32 {
    DEFAULT_PADDING_PX
}

impl SectionLayout {
    pub fn new(key: &str, rows: usize, cols: usize, row_pitch: RowPitch) -> Self {
        Self {
            key: key.to_string(),
            rows,
            cols,
            padding_px: DEFAULT_PADDING_PX,
            row_pitch,
        }
    }

    /// Validate section dimensions
    pub fn validate(&self) -> DigitizerResult<()> {
        if self.key.trim().is_empty() {
            return Err(DigitizerError::Config(
                "Section key cannot be empty".to_string(),
            ));
        }
        if self.rows == 0 || self.cols == 0 {
            return Err(DigitizerError::Config(format!(
                "Section '{}' has an empty grid ({}x{})",
                self.key, self.rows, self.cols
            )));
        }
        if let RowPitch::Fixed(0) = self.row_pitch {
            return Err(DigitizerError::Config(format!(
                "Section '{}' has a zero row pitch",
                self.key
            )));
        }
        Ok(())
    }
}

/// Table layout of one form type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormLayout {
    pub form_type: FormType,
    pub sections: Vec<SectionLayout>,
}

impl FormLayout {
    /// EEO-1 section H: 10 rows (8 job categories, current total, prior-year total)
    /// by 15 columns (14 race/sex columns and the row total).
    pub fn eeo1() -> Self {
        Self {
            form_type: FormType::Eeo1,
            sections: vec![SectionLayout::new(
                "h",
                10,
                15,
                RowPitch::Fixed(DEFAULT_EEO1_ROW_PITCH_PX),
            )],
        }
    }

    /// EEO-5 tables. Table A (18 job categories and its total row) is printed
    /// across three sub-tables a1/a2/a3 that are merged after mapping.
    pub fn eeo5() -> Self {
        Self {
            form_type: FormType::Eeo5,
            sections: vec![
                SectionLayout::new("a1", 7, 15, RowPitch::Derived),
                SectionLayout::new("a2", 6, 15, RowPitch::Derived),
                SectionLayout::new("a3", 6, 15, RowPitch::Derived),
                SectionLayout::new("b", 3, 15, RowPitch::Derived),
                SectionLayout::new("c", 6, 15, RowPitch::Derived),
            ],
        }
    }

    pub fn for_form(form_type: FormType) -> Self {
        match form_type {
            FormType::Eeo1 => Self::eeo1(),
            FormType::Eeo5 => Self::eeo5(),
        }
    }

    /// Parse a layout from its JSON representation and validate it
    pub fn from_json_str(json: &str) -> DigitizerResult<Self> {
        let layout: FormLayout = serde_json::from_str(json)?;
        layout.validate()?;
        Ok(layout)
    }

    /// Load a layout from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> DigitizerResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            DigitizerError::Config(format!(
                "Cannot read layout file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json_str(&json)
    }

    /// Look up a section by key. An unknown key is a configuration error for that
    /// section only.
    pub fn section(&self, key: &str) -> DigitizerResult<&SectionLayout> {
        self.sections.iter().find(|s| s.key == key).ok_or_else(|| {
            DigitizerError::Config(format!(
                "Unknown section '{}' for form {}",
                key,
                self.form_type.as_str()
            ))
        })
    }

    /// Validate the layout and all of its sections
    pub fn validate(&self) -> DigitizerResult<()> {
        if self.sections.is_empty() {
            return Err(DigitizerError::Config(format!(
                "Layout for form {} has no sections",
                self.form_type.as_str()
            )));
        }
        for section in &self.sections {
            section.validate()?;
        }
        Ok(())
    }
}

/// Grid mapping and validation thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    /// Fixed EEO-1 row pitch used when a layout does not override it
    pub eeo1_row_pitch_px: u32,
    /// Confidence below which a parsed digit is logged as unconfident
    pub confidence_threshold: f32,
    /// Confidence below which a cell becomes a single-cell repair candidate
    pub low_confidence_correction_threshold: f32,
    /// Ratio between reported page dimensions and the geometry coordinate convention
    pub render_upscale_factor: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            eeo1_row_pitch_px: DEFAULT_EEO1_ROW_PITCH_PX,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            low_confidence_correction_threshold: DEFAULT_CORRECTION_THRESHOLD,
            render_upscale_factor: DEFAULT_RENDER_UPSCALE_FACTOR,
        }
    }
}

impl GridConfig {
    /// Validate grid configuration
    pub fn validate(&self) -> DigitizerResult<()> {
        if self.eeo1_row_pitch_px == 0 {
            return Err(DigitizerError::Config(
                "eeo1_row_pitch_px must be greater than 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(DigitizerError::Config(format!(
                "confidence_threshold ({}) must be within [0, 1]",
                self.confidence_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.low_confidence_correction_threshold) {
            return Err(DigitizerError::Config(format!(
                "low_confidence_correction_threshold ({}) must be within [0, 1]",
                self.low_confidence_correction_threshold
            )));
        }
        if self.render_upscale_factor <= 0.0 {
            return Err(DigitizerError::Config(format!(
                "render_upscale_factor ({}) must be greater than 0",
                self.render_upscale_factor
            )));
        }
        Ok(())
    }
}

/// Page geometry normalization parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryConfig {
    /// Width of the canvas cropped pages are re-rendered to
    pub target_width: u32,
    /// Height of the canvas cropped pages are re-rendered to
    pub target_height: u32,
    /// Canny hysteresis low threshold
    pub canny_low: f32,
    /// Canny hysteresis high threshold
    pub canny_high: f32,
    /// Angles within this many degrees of 0° or 90° need no rotation
    pub angle_tolerance_deg: f32,
    /// Sigma of the Gaussian window used by the adaptive threshold
    pub adaptive_threshold_sigma: f32,
    /// Constant subtracted from the local Gaussian mean before comparison
    pub adaptive_threshold_offset: i16,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            target_width: DEFAULT_TARGET_WIDTH,
            target_height: DEFAULT_TARGET_HEIGHT,
            canny_low: 50.0,
            canny_high: 150.0,
            angle_tolerance_deg: 0.5,
            adaptive_threshold_sigma: 50.0, // ~301px Gaussian block
            adaptive_threshold_offset: 11,
        }
    }
}

impl GeometryConfig {
    /// Validate geometry configuration
    pub fn validate(&self) -> DigitizerResult<()> {
        if self.target_width == 0 || self.target_height == 0 {
            return Err(DigitizerError::Config(format!(
                "Target canvas must be non-empty, got {}x{}",
                self.target_width, self.target_height
            )));
        }
        if self.canny_low <= 0.0 || self.canny_high < self.canny_low {
            return Err(DigitizerError::Config(format!(
                "Canny thresholds must satisfy 0 < low ({}) <= high ({})",
                self.canny_low, self.canny_high
            )));
        }
        if !(0.0..45.0).contains(&self.angle_tolerance_deg) {
            return Err(DigitizerError::Config(format!(
                "angle_tolerance_deg ({}) must be within [0, 45)",
                self.angle_tolerance_deg
            )));
        }
        if self.adaptive_threshold_sigma <= 0.0 {
            return Err(DigitizerError::Config(
                "adaptive_threshold_sigma must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Unified engine configuration
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Grid mapping and validation thresholds
    pub grid: GridConfig,
    /// Page normalization parameters
    pub geometry: GeometryConfig,
    /// Logging configuration
    pub observability: ObservabilityConfig,
}

fn env_or<T: FromStr>(key: &str, default: &str) -> DigitizerResult<T> {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|_| DigitizerError::Config(format!("{} must be a valid number", key)))
}

impl EngineConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> DigitizerResult<Self> {
        let mut config = Self::default();

        config.grid.eeo1_row_pitch_px = env_or("EEO_ROW_PITCH_PX", "25")?;
        config.grid.confidence_threshold = env_or("EEO_CONFIDENCE_THRESHOLD", "0.8")?;
        config.grid.low_confidence_correction_threshold =
            env_or("EEO_CORRECTION_THRESHOLD", "0.7")?;
        config.grid.render_upscale_factor = env_or("EEO_RENDER_UPSCALE_FACTOR", "2.0")?;

        config.geometry.target_width = env_or("EEO_TARGET_WIDTH", "523")?;
        config.geometry.target_height = env_or("EEO_TARGET_HEIGHT", "679")?;
        config.geometry.canny_low = env_or("EEO_CANNY_LOW", "50")?;
        config.geometry.canny_high = env_or("EEO_CANNY_HIGH", "150")?;
        config.geometry.angle_tolerance_deg = env_or("EEO_ANGLE_TOLERANCE_DEG", "0.5")?;

        config.observability = ObservabilityConfig::from_env();

        Ok(config)
    }

    /// Validate all configuration sections
    pub fn validate(&self) -> DigitizerResult<()> {
        self.grid.validate()?;
        self.geometry.validate()?;
        self.observability.validate()?;
        Ok(())
    }

    /// Get a summary of the current configuration for logging
    pub fn summary(&self) -> String {
        format!(
            "Configuration: confidence_threshold={}, correction_threshold={}, upscale={}, canvas={}x{}, log_level={}",
            self.grid.confidence_threshold,
            self.grid.low_confidence_correction_threshold,
            self.grid.render_upscale_factor,
            self.geometry.target_width,
            self.geometry.target_height,
            self.observability.log_level
        )
    }
}
