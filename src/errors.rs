//! # Digitizer Error Types
//!
//! This module defines the error types shared by the digitization engine.
//! Only configuration problems and undetectable page content stop processing of a
//! unit of work; everything else is reported as a diagnostic and recovered locally.

use std::fmt;

use crate::preprocessing::PreprocessingError;

/// General error type for the digitization engine
#[derive(Debug, Clone, PartialEq)]
pub enum DigitizerError {
    /// Configuration errors (unknown section key, empty layout, bad env values)
    Config(String),
    /// No content edges could be found on a page
    ContentBoundsNotFound(String),
    /// Geometry errors (degenerate rectangles, invalid dimensions)
    Geometry(String),
    /// Image processing errors
    Image(String),
    /// Malformed OCR export or other caller-supplied input
    InvalidInput(String),
    /// Internal errors
    Internal(String),
}

impl fmt::Display for DigitizerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DigitizerError::Config(msg) => write!(f, "[CONFIG] {}", msg),
            DigitizerError::ContentBoundsNotFound(msg) => write!(f, "[CONTENT_BOUNDS] {}", msg),
            DigitizerError::Geometry(msg) => write!(f, "[GEOMETRY] {}", msg),
            DigitizerError::Image(msg) => write!(f, "[IMAGE] {}", msg),
            DigitizerError::InvalidInput(msg) => write!(f, "[INPUT] {}", msg),
            DigitizerError::Internal(msg) => write!(f, "[INTERNAL] {}", msg),
        }
    }
}

impl std::error::Error for DigitizerError {}

impl From<anyhow::Error> for DigitizerError {
    fn from(err: anyhow::Error) -> Self {
        DigitizerError::Internal(err.to_string())
    }
}

impl From<PreprocessingError> for DigitizerError {
    fn from(err: PreprocessingError) -> Self {
        match err {
            PreprocessingError::ContentBoundsNotFound { .. } => {
                DigitizerError::ContentBoundsNotFound(err.to_string())
            }
            PreprocessingError::DegenerateGeometry { .. } => {
                DigitizerError::Geometry(err.to_string())
            }
            _ => DigitizerError::Image(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for DigitizerError {
    fn from(err: serde_json::Error) -> Self {
        DigitizerError::Config(format!("Invalid JSON: {}", err))
    }
}

/// Result type alias for convenience
pub type DigitizerResult<T> = Result<T, DigitizerError>;

/// Standardized error logging utilities for consistent error reporting
pub mod error_logging {
    use tracing::error;

    /// Log configuration errors for a single section or form
    pub fn log_config_error(error: &impl std::fmt::Display, config_key: &str, operation: &str) {
        error!(
            error = %error,
            config_key = %config_key,
            operation = %operation,
            "Configuration error"
        );
    }

    /// Log page-level failures; the caller skips the page afterwards
    pub fn log_page_error(
        error: &impl std::fmt::Display,
        operation: &str,
        page_index: Option<usize>,
        dimensions: Option<(u32, u32)>,
    ) {
        error!(
            error = %error,
            operation = %operation,
            page_index = ?page_index,
            dimensions = ?dimensions,
            "Page processing failed"
        );
    }

    /// Log table processing errors with section context
    pub fn log_table_error(
        error: &impl std::fmt::Display,
        operation: &str,
        section: &str,
        detection_count: Option<usize>,
    ) {
        error!(
            error = %error,
            operation = %operation,
            section = %section,
            detection_count = ?detection_count,
            "Table processing failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_tags() {
        assert_eq!(
            DigitizerError::Config("unknown section d".to_string()).to_string(),
            "[CONFIG] unknown section d"
        );
        assert!(DigitizerError::ContentBoundsNotFound("page 2".to_string())
            .to_string()
            .starts_with("[CONTENT_BOUNDS]"));
    }

    #[test]
    fn test_preprocessing_error_conversion() {
        let err: DigitizerError = PreprocessingError::ContentBoundsNotFound {
            width: 10,
            height: 20,
        }
        .into();
        assert!(matches!(err, DigitizerError::ContentBoundsNotFound(_)));

        let err: DigitizerError = PreprocessingError::ProcessingFailed {
            message: "boom".to_string(),
        }
        .into();
        assert!(matches!(err, DigitizerError::Image(_)));
    }

    #[test]
    fn test_from_anyhow() {
        let err: DigitizerError = anyhow::anyhow!("unexpected").into();
        assert_eq!(err, DigitizerError::Internal("unexpected".to_string()));
    }
}
