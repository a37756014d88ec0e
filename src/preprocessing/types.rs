//! # Shared Types for Page Normalization
//!
//! This module contains the shared types, structs, and enums used across
//! the page normalization sub-modules.

use image::DynamicImage;

use crate::geometry::{BBox, RotatedRect};

/// Errors that can occur during page normalization.
#[derive(Debug, Clone)]
pub enum PreprocessingError {
    /// Image processing operation failed
    ProcessingFailed { message: String },
    /// Edge detection found no content on the page
    ContentBoundsNotFound { width: u32, height: u32 },
    /// A contour or rectangle too small to define an orientation
    DegenerateGeometry { points: usize },
}

impl std::fmt::Display for PreprocessingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PreprocessingError::ProcessingFailed { message } => {
                write!(f, "Image processing failed: {}", message)
            }
            PreprocessingError::ContentBoundsNotFound { width, height } => {
                write!(f, "No content edges found on {}x{} page", width, height)
            }
            PreprocessingError::DegenerateGeometry { points } => {
                write!(
                    f,
                    "Degenerate contour with {} points cannot define a rectangle",
                    points
                )
            }
        }
    }
}

impl std::error::Error for PreprocessingError {}

/// Outcome of rotation direction analysis.
///
/// Angles follow the image-rotation convention: positive values rotate the page
/// counter-clockwise, negative values clockwise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RotationDecision {
    /// Page is already upright (angle within tolerance of 0° or 90°)
    NoRotation,
    /// Rotate counter-clockwise by the given angle in degrees
    CounterClockwise(f32),
    /// Rotate clockwise; the payload is the signed (negative) angle in degrees
    Clockwise(f32),
    /// Corner pattern does not indicate a direction, or corners are degenerate
    Ambiguous,
}

impl RotationDecision {
    /// Signed rotation angle to apply, `None` when the direction is unresolved
    pub fn angle(&self) -> Option<f32> {
        match self {
            RotationDecision::NoRotation => Some(0.0),
            RotationDecision::CounterClockwise(a) | RotationDecision::Clockwise(a) => Some(*a),
            RotationDecision::Ambiguous => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RotationDecision::NoRotation => "no_rotation",
            RotationDecision::CounterClockwise(_) => "counter_clockwise",
            RotationDecision::Clockwise(_) => "clockwise",
            RotationDecision::Ambiguous => "ambiguous",
        }
    }
}

/// Result of adaptive thresholding.
#[derive(Debug, Clone)]
pub struct ThresholdedImageResult {
    /// Binary image, content pixels set to 255
    pub image: image::GrayImage,
    /// Sigma of the Gaussian window used for the local mean
    pub sigma: f32,
    /// Processing time in milliseconds
    pub processing_time_ms: u32,
}

/// Result of orientation normalization.
#[derive(Debug, Clone)]
pub struct OrientationResult {
    /// The upright image (unchanged when no rotation was applied)
    pub image: DynamicImage,
    /// Direction and angle decision
    pub decision: RotationDecision,
    /// Minimum-area rectangle of the dominant contour
    pub rect: RotatedRect,
    /// Processing time in milliseconds
    pub processing_time_ms: u32,
}

/// Result of cropping a page to its content.
#[derive(Debug, Clone)]
pub struct CroppedPageResult {
    /// Page cropped to its content and rendered onto the target canvas
    pub image: DynamicImage,
    /// Content bounds in the source image
    pub bounds: BBox,
    /// Processing time in milliseconds
    pub processing_time_ms: u32,
}

/// Result of the complete page normalization pipeline.
#[derive(Debug, Clone)]
pub struct NormalizedPage {
    /// Upright page at the target canvas size
    pub image: DynamicImage,
    /// Content bounds found on the source page
    pub bounds: BBox,
    /// Rotation applied, `None` when no dominant contour could be found
    pub decision: Option<RotationDecision>,
    /// Processing time in milliseconds
    pub processing_time_ms: u32,
}
