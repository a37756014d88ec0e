//! # OCR Detections
//!
//! Word detections produced by the external OCR collaborator, and parsing of its
//! JSON export (`pages → blocks → lines → words`). Emission order is preserved
//! exactly; grid mapping relies on it for first-valid-wins placement.

use serde::{Deserialize, Serialize};

use crate::errors::{DigitizerError, DigitizerResult};
use crate::geometry::Point2;

/// Normalized word box corners in [0, 1] page coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WordGeometry {
    pub top_right: Point2,
    pub bottom_left: Point2,
}

impl WordGeometry {
    pub fn new(top_right: (f32, f32), bottom_left: (f32, f32)) -> Self {
        Self {
            top_right: Point2::new(top_right.0, top_right.1),
            bottom_left: Point2::new(bottom_left.0, bottom_left.1),
        }
    }

    /// Box midpoint scaled to pixel dimensions
    pub fn midpoint(&self, width: f32, height: f32) -> Point2 {
        Point2::new(
            (self.top_right.x + self.bottom_left.x) * width / 2.0,
            (self.top_right.y + self.bottom_left.y) * height / 2.0,
        )
    }
}

/// One detected word
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub value: String,
    pub confidence: f32,
    pub geometry: WordGeometry,
    /// Index of the text line the word belongs to within its page
    #[serde(default)]
    pub line: usize,
}

impl Detection {
    pub fn new(value: &str, confidence: f32, geometry: WordGeometry) -> Self {
        Self {
            value: value.to_string(),
            confidence,
            geometry,
            line: 0,
        }
    }

    /// True when the token is a non-empty string of ASCII digits
    pub fn is_digit(&self) -> bool {
        is_digit_token(&self.value)
    }
}

/// True when `token` is a non-empty string of ASCII digits
pub fn is_digit_token(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit())
}

/// Detections of one page with the page's reported pixel dimensions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrPage {
    pub height: f32,
    pub width: f32,
    pub detections: Vec<Detection>,
}

impl OcrPage {
    pub fn new(height: f32, width: f32, detections: Vec<Detection>) -> Self {
        Self {
            height,
            width,
            detections,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExportDocument {
    #[serde(default)]
    pages: Vec<ExportPage>,
}

#[derive(Debug, Deserialize)]
struct ExportPage {
    /// (height, width)
    dimensions: (f32, f32),
    #[serde(default)]
    blocks: Vec<ExportBlock>,
}

#[derive(Debug, Deserialize)]
struct ExportBlock {
    #[serde(default)]
    lines: Vec<ExportLine>,
}

#[derive(Debug, Deserialize)]
struct ExportLine {
    #[serde(default)]
    words: Vec<ExportWord>,
}

#[derive(Debug, Deserialize)]
struct ExportWord {
    value: String,
    confidence: f32,
    geometry: ((f32, f32), (f32, f32)),
}

/// A parsed OCR export
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrDocument {
    pub pages: Vec<OcrPage>,
}

impl OcrDocument {
    /// Parse the collaborator's JSON export
    pub fn from_json_str(json: &str) -> DigitizerResult<Self> {
        let export: ExportDocument = serde_json::from_str(json)
            .map_err(|e| DigitizerError::InvalidInput(format!("Malformed OCR export: {}", e)))?;
        Ok(Self::from_export(export))
    }

    /// Parse an already-decoded JSON value
    pub fn from_value(value: serde_json::Value) -> DigitizerResult<Self> {
        let export: ExportDocument = serde_json::from_value(value)
            .map_err(|e| DigitizerError::InvalidInput(format!("Malformed OCR export: {}", e)))?;
        Ok(Self::from_export(export))
    }

    fn from_export(export: ExportDocument) -> Self {
        let pages = export
            .pages
            .into_iter()
            .map(|page| {
                let (height, width) = page.dimensions;
                let detections = page
                    .blocks
                    .into_iter()
                    .flat_map(|block| block.lines)
                    .enumerate()
                    .flat_map(|(line_index, line)| {
                        line.words.into_iter().map(move |word| Detection {
                            value: word.value,
                            confidence: word.confidence,
                            geometry: WordGeometry::new(word.geometry.0, word.geometry.1),
                            line: line_index,
                        })
                    })
                    .collect();
                OcrPage::new(height, width, detections)
            })
            .collect();
        Self { pages }
    }

    /// Total number of detections across pages
    pub fn detection_count(&self) -> usize {
        self.pages.iter().map(|p| p.detections.len()).sum()
    }
}

/// Joins the words of each text line with single spaces and averages their
/// confidences. Used for free-text (non-table) form fields.
pub fn flatten_text_lines(document: &OcrDocument) -> (Vec<String>, Vec<f32>) {
    let mut lines = Vec::new();
    let mut confidences = Vec::new();

    for page in &document.pages {
        let mut start = 0;
        while start < page.detections.len() {
            let line_index = page.detections[start].line;
            let end = page.detections[start..]
                .iter()
                .position(|d| d.line != line_index)
                .map_or(page.detections.len(), |offset| start + offset);

            let words = &page.detections[start..end];
            let text: Vec<&str> = words.iter().map(|d| d.value.as_str()).collect();
            let mean = words.iter().map(|d| d.confidence).sum::<f32>() / words.len() as f32;
            lines.push(text.join(" "));
            confidences.push(mean);

            start = end;
        }
    }

    (lines, confidences)
}
