//! # Page Orientation Module
//!
//! Determines the rotation direction of a scanned page from the minimum-area
//! rectangle around its dominant content contour, then rotates the whole page
//! about its center onto an expanded white canvas.

use image::{DynamicImage, GenericImage, GenericImageView};
use imageproc::point::Point;
use tracing;

use super::types::{OrientationResult, PreprocessingError, RotationDecision};
use crate::config::GeometryConfig;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::geometry::{self, Corners};

/// Resolves the rotation to apply from classified corners and the folded
/// rectangle angle (degrees in [0, 90)).
///
/// * Angles within `tolerance` of 0° or 90° need no rotation.
/// * Top-left above top-right and bottom-left above bottom-right: the page leans
///   clockwise and is rotated counter-clockwise by the angle (or its complement
///   when closer to 90°).
/// * The mirrored pattern yields a clockwise rotation.
/// * Anything else is `Ambiguous`; no angle is invented.
pub fn resolve_rotation(corners: Option<&Corners>, angle: f32, tolerance: f32) -> RotationDecision {
    if angle < tolerance || angle > 90.0 - tolerance {
        return RotationDecision::NoRotation;
    }

    let Some(c) = corners else {
        return RotationDecision::Ambiguous;
    };

    // Ties at 45° resolve toward 90°
    let closer_to_zero = angle < 45.0;
    let magnitude = if closer_to_zero { angle } else { 90.0 - angle };

    if c.top_left.y < c.top_right.y && c.bottom_left.y < c.bottom_right.y {
        RotationDecision::CounterClockwise(magnitude)
    } else if c.top_left.y > c.top_right.y && c.bottom_left.y > c.bottom_right.y {
        RotationDecision::Clockwise(-magnitude)
    } else {
        RotationDecision::Ambiguous
    }
}

/// Normalizes the orientation of a page given its dominant content contour.
///
/// An ambiguous direction is recorded in `diagnostics` and the page is returned
/// unrotated.
pub fn normalize_orientation(
    image: &DynamicImage,
    contour: &[Point<i32>],
    config: &GeometryConfig,
    diagnostics: &mut Diagnostics,
) -> Result<OrientationResult, PreprocessingError> {
    let start_time = std::time::Instant::now();

    let rect = geometry::min_area_rect(contour).ok_or(PreprocessingError::DegenerateGeometry {
        points: contour.len(),
    })?;
    let corners = geometry::cyclic_points(&rect.corners);

    tracing::debug!(
        target: "eeo_digitizer::preprocessing",
        angle = rect.angle,
        center_x = rect.center.x,
        center_y = rect.center.y,
        "Measured content rectangle"
    );

    let decision = resolve_rotation(corners.as_ref(), rect.angle, config.angle_tolerance_deg);

    let rotated = match decision.angle() {
        Some(angle) if angle != 0.0 => {
            tracing::info!(
                target: "eeo_digitizer::preprocessing",
                direction = decision.as_str(),
                "Rotating page by {:.2}°",
                angle
            );
            rotate_bound(image, angle)?
        }
        Some(_) => {
            tracing::debug!(
                target: "eeo_digitizer::preprocessing",
                "Angle {:.2}° is within tolerance of 0/90, no need to rotate",
                rect.angle
            );
            image.clone()
        }
        None => {
            diagnostics.record(Diagnostic::AmbiguousRotation { angle: rect.angle });
            image.clone()
        }
    };

    Ok(OrientationResult {
        image: rotated,
        decision,
        rect,
        processing_time_ms: start_time.elapsed().as_millis() as u32,
    })
}

/// Rotates an image about its center by `angle_degrees` (positive is
/// counter-clockwise), enlarging the canvas so no content is clipped and
/// filling uncovered background with white.
pub fn rotate_bound(image: &DynamicImage, angle_degrees: f32) -> Result<DynamicImage, PreprocessingError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(PreprocessingError::ProcessingFailed {
            message: "Cannot rotate an empty image".to_string(),
        });
    }

    let angle_rad = angle_degrees.to_radians();
    let cos_a = angle_rad.cos().abs();
    let sin_a = angle_rad.sin().abs();

    let new_width = (height as f32 * sin_a + width as f32 * cos_a).round().max(1.0) as u32;
    let new_height = (height as f32 * cos_a + width as f32 * sin_a).round().max(1.0) as u32;

    match image {
        DynamicImage::ImageRgb8(img) => {
            let mut rotated =
                image::RgbImage::from_pixel(new_width, new_height, image::Rgb([255, 255, 255]));
            apply_nearest_neighbor_rotation(img, &mut rotated, angle_rad);
            Ok(DynamicImage::ImageRgb8(rotated))
        }
        DynamicImage::ImageRgba8(img) => {
            let mut rotated = image::RgbaImage::from_pixel(
                new_width,
                new_height,
                image::Rgba([255, 255, 255, 255]),
            );
            apply_nearest_neighbor_rotation(img, &mut rotated, angle_rad);
            Ok(DynamicImage::ImageRgba8(rotated))
        }
        DynamicImage::ImageLuma8(img) => {
            let mut rotated = image::GrayImage::from_pixel(new_width, new_height, image::Luma([255]));
            apply_nearest_neighbor_rotation(img, &mut rotated, angle_rad);
            Ok(DynamicImage::ImageLuma8(rotated))
        }
        DynamicImage::ImageLumaA8(img) => {
            let mut rotated =
                image::GrayAlphaImage::from_pixel(new_width, new_height, image::LumaA([255, 255]));
            apply_nearest_neighbor_rotation(img, &mut rotated, angle_rad);
            Ok(DynamicImage::ImageLumaA8(rotated))
        }
        _ => Err(PreprocessingError::ProcessingFailed {
            message: "Unsupported image format for rotation".to_string(),
        }),
    }
}

/// Fills `output` by inverse-mapping each pixel back into `input` around both
/// image centers. Pixels mapping outside the source keep their background.
fn apply_nearest_neighbor_rotation<T: GenericImage>(input: &T, output: &mut T, angle_rad: f32) {
    let (orig_width, orig_height) = input.dimensions();
    let (new_width, new_height) = output.dimensions();
    let cos_a = angle_rad.cos();
    let sin_a = angle_rad.sin();

    let src_cx = orig_width as f32 / 2.0;
    let src_cy = orig_height as f32 / 2.0;
    let dst_cx = new_width as f32 / 2.0;
    let dst_cy = new_height as f32 / 2.0;

    for y in 0..new_height {
        for x in 0..new_width {
            let dx = x as f32 + 0.5 - dst_cx;
            let dy = y as f32 + 0.5 - dst_cy;

            let orig_x = cos_a * dx - sin_a * dy + src_cx;
            let orig_y = sin_a * dx + cos_a * dy + src_cy;

            if orig_x >= 0.0
                && orig_x < orig_width as f32
                && orig_y >= 0.0
                && orig_y < orig_height as f32
            {
                let pixel = input.get_pixel(orig_x as u32, orig_y as u32);
                output.put_pixel(x, y, pixel);
            }
        }
    }
}
