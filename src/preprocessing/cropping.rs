//! # Content Cropping Module
//!
//! Locates the content of a scanned page with Canny edge detection, crops the
//! page to the bounding box of all edge pixels and re-renders it onto the
//! fixed target canvas used by the form layouts.

use std::time::Instant;

use image::{imageops::FilterType, DynamicImage, GenericImageView};
use tracing;

use super::types::{CroppedPageResult, PreprocessingError};
use crate::config::GeometryConfig;
use crate::geometry::BBox;

/// Returns the bounding box of all Canny edge pixels.
///
/// A page with no edges at all yields `ContentBoundsNotFound`, which is fatal
/// for that page.
pub fn detect_content_bounds(
    image: &DynamicImage,
    config: &GeometryConfig,
) -> Result<BBox, PreprocessingError> {
    let gray = image.to_luma8();
    let edges = imageproc::edges::canny(&gray, config.canny_low, config.canny_high);

    let bounds = edges
        .enumerate_pixels()
        .filter(|(_, _, pixel)| pixel[0] > 0)
        .fold(None, |acc: Option<BBox>, (x, y, _)| match acc {
            None => Some(BBox::new(x, y, x, y)),
            Some(b) => Some(BBox::new(b.x0.min(x), b.y0.min(y), b.x1.max(x), b.y1.max(y))),
        });

    bounds.ok_or(PreprocessingError::ContentBoundsNotFound {
        width: gray.width(),
        height: gray.height(),
    })
}

/// Scales `image` to fit inside `target_width`×`target_height` keeping its
/// aspect ratio, centered on a white canvas. A zero-sized source or target
/// yields the blank canvas.
pub fn render_to_canvas(image: &DynamicImage, target_width: u32, target_height: u32) -> DynamicImage {
    let (width, height) = image.dimensions();
    let mut canvas = image::RgbImage::from_pixel(
        target_width,
        target_height,
        image::Rgb([255, 255, 255]),
    );
    if width == 0 || height == 0 || target_width == 0 || target_height == 0 {
        return DynamicImage::ImageRgb8(canvas);
    }

    let scale = (target_width as f32 / width as f32).min(target_height as f32 / height as f32);
    let fit_width = ((width as f32 * scale).round() as u32).clamp(1, target_width);
    let fit_height = ((height as f32 * scale).round() as u32).clamp(1, target_height);

    let resized = image
        .resize_exact(fit_width, fit_height, FilterType::CatmullRom)
        .to_rgb8();
    let offset_x = (target_width - fit_width) / 2;
    let offset_y = (target_height - fit_height) / 2;
    image::imageops::overlay(&mut canvas, &resized, offset_x as i64, offset_y as i64);

    DynamicImage::ImageRgb8(canvas)
}

/// Crops a page to its content and renders the crop onto the target canvas.
pub fn crop_to_content(
    image: &DynamicImage,
    config: &GeometryConfig,
) -> Result<CroppedPageResult, PreprocessingError> {
    let start_time = Instant::now();

    let bounds = detect_content_bounds(image, config)?;
    let cropped = image.crop_imm(bounds.x0, bounds.y0, bounds.width(), bounds.height());
    let rendered = render_to_canvas(&cropped, config.target_width, config.target_height);

    let processing_time_ms = start_time.elapsed().as_millis() as u32;

    tracing::debug!(
        target: "eeo_digitizer::preprocessing",
        "Cropped {}x{} page to content {:?} and rendered at {}x{}",
        image.width(),
        image.height(),
        bounds,
        config.target_width,
        config.target_height
    );

    Ok(CroppedPageResult {
        image: rendered,
        bounds,
        processing_time_ms,
    })
}
