//! # Page Normalization Module
//!
//! Geometric normalization of scanned form pages before OCR.
//!
//! The module is organized into focused sub-modules:
//! - `cropping`: Canny-based content detection and fixed-canvas re-rendering
//! - `thresholding`: Adaptive Gaussian thresholding and dominant contour extraction
//! - `orientation`: Rotation direction analysis and bound-preserving rotation
//! - `types`: Shared types and error definitions

pub mod cropping;
pub mod orientation;
pub mod thresholding;
pub mod types;

use std::time::Instant;

use image::{DynamicImage, GenericImageView};

// Re-export commonly used types and functions for convenience
pub use types::{
    CroppedPageResult, NormalizedPage, OrientationResult, PreprocessingError, RotationDecision,
    ThresholdedImageResult,
};

pub use cropping::{crop_to_content, detect_content_bounds, render_to_canvas};
pub use orientation::{normalize_orientation, resolve_rotation, rotate_bound};
pub use thresholding::{apply_adaptive_threshold, dominant_contour};

use crate::config::GeometryConfig;
use crate::diagnostics::Diagnostics;
use crate::observability::{self, metrics};

/// Full page normalization: crop to content, find the dominant contour,
/// correct orientation and render onto the target canvas.
///
/// A page without any detectable edges fails with `ContentBoundsNotFound`. A page
/// whose content yields no contour is rendered without rotation.
pub fn normalize_page(
    image: &DynamicImage,
    config: &GeometryConfig,
    diagnostics: &mut Diagnostics,
) -> Result<NormalizedPage, PreprocessingError> {
    let start_time = Instant::now();
    let _span = observability::page_span(image.width(), image.height()).entered();

    let bounds = match detect_content_bounds(image, config) {
        Ok(bounds) => bounds,
        Err(e) => {
            metrics::record_page_normalization("no_content", start_time.elapsed());
            return Err(e);
        }
    };
    let cropped = image.crop_imm(bounds.x0, bounds.y0, bounds.width(), bounds.height());

    let thresholded = apply_adaptive_threshold(
        &cropped,
        config.adaptive_threshold_sigma,
        config.adaptive_threshold_offset,
    )?;

    let (upright, decision) = match dominant_contour(&thresholded.image) {
        Some(contour) => {
            let oriented = normalize_orientation(&cropped, &contour, config, diagnostics)?;
            (oriented.image, Some(oriented.decision))
        }
        None => {
            tracing::debug!(
                target: "eeo_digitizer::preprocessing",
                "No content contour found on {}x{} crop, skipping orientation",
                cropped.width(),
                cropped.height()
            );
            (cropped, None)
        }
    };

    let rendered = render_to_canvas(&upright, config.target_width, config.target_height);

    let elapsed = start_time.elapsed();
    let outcome = decision.map(|d| d.as_str()).unwrap_or("no_contour");
    metrics::record_page_normalization(outcome, elapsed);

    Ok(NormalizedPage {
        image: rendered,
        bounds,
        decision,
        processing_time_ms: elapsed.as_millis() as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_page_blank_fails() {
        let img = DynamicImage::ImageLuma8(image::GrayImage::from_pixel(
            50,
            50,
            image::Luma([255]),
        ));
        let mut diagnostics = Diagnostics::new("blank");
        let result = normalize_page(&img, &GeometryConfig::default(), &mut diagnostics);
        assert!(matches!(
            result,
            Err(PreprocessingError::ContentBoundsNotFound { .. })
        ));
    }

    #[test]
    fn test_normalize_page_upright_form() {
        let mut img = image::GrayImage::from_pixel(300, 400, image::Luma([255]));
        // Table frame
        for x in 40..260 {
            for t in 0..3 {
                img.put_pixel(x, 50 + t, image::Luma([0]));
                img.put_pixel(x, 347 + t, image::Luma([0]));
            }
        }
        for y in 50..350 {
            for t in 0..3 {
                img.put_pixel(40 + t, y, image::Luma([0]));
                img.put_pixel(257 + t, y, image::Luma([0]));
            }
        }

        let config = GeometryConfig {
            adaptive_threshold_sigma: 10.0,
            ..GeometryConfig::default()
        };
        let mut diagnostics = Diagnostics::new("upright");
        let page = normalize_page(&DynamicImage::ImageLuma8(img), &config, &mut diagnostics)
            .unwrap();

        assert_eq!(page.image.dimensions(), (523, 679));
        assert_eq!(page.decision, Some(RotationDecision::NoRotation));
        assert!(diagnostics.is_empty());
    }
}
