//! # Adaptive Thresholding and Contour Extraction
//!
//! Binarizes a scanned page with a Gaussian-weighted local threshold and
//! extracts the dominant content contour used for orientation analysis.

use image::DynamicImage;
use imageproc::contours::{find_contours, BorderType};
use imageproc::point::Point;
use tracing;

use super::types::{PreprocessingError, ThresholdedImageResult};

/// Applies an inverted adaptive Gaussian threshold.
///
/// A pixel becomes foreground (255) when its intensity is at most the Gaussian
/// weighted mean of its neighbourhood minus `offset`; everything else becomes 0.
/// Dark ink on light paper therefore ends up white on black, which is the
/// polarity contour extraction expects.
///
/// # Arguments
///
/// * `image` - The input page
/// * `sigma` - Standard deviation of the Gaussian window
/// * `offset` - Constant subtracted from the local mean
pub fn apply_adaptive_threshold(
    image: &DynamicImage,
    sigma: f32,
    offset: i16,
) -> Result<ThresholdedImageResult, PreprocessingError> {
    let start_time = std::time::Instant::now();

    if sigma <= 0.0 {
        return Err(PreprocessingError::ProcessingFailed {
            message: format!("Adaptive threshold sigma must be positive, got {}", sigma),
        });
    }

    let gray = image.to_luma8();
    if gray.width() == 0 || gray.height() == 0 {
        return Err(PreprocessingError::ProcessingFailed {
            message: "Empty image for thresholding".to_string(),
        });
    }

    let local_mean = imageproc::filter::gaussian_blur_f32(&gray, sigma);

    let mut binary = image::GrayImage::new(gray.width(), gray.height());
    for (x, y, pixel) in gray.enumerate_pixels() {
        let threshold = local_mean.get_pixel(x, y)[0] as i16 - offset;
        let value = if (pixel[0] as i16) <= threshold {
            255u8
        } else {
            0u8
        };
        binary.put_pixel(x, y, image::Luma([value]));
    }

    let processing_time = start_time.elapsed();

    tracing::debug!(
        target: "eeo_digitizer::preprocessing",
        "Adaptive thresholding completed in {}ms: sigma={}, offset={}, dimensions={}x{}",
        processing_time.as_millis(),
        sigma,
        offset,
        gray.width(),
        gray.height()
    );

    Ok(ThresholdedImageResult {
        image: binary,
        sigma,
        processing_time_ms: processing_time.as_millis() as u32,
    })
}

/// Absolute polygon area by the shoelace formula
pub fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice_area: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x as i64 * b.y as i64 - a.y as i64 * b.x as i64)
        .sum();
    (twice_area as f64 / 2.0).abs()
}

/// Returns the outer contour with the largest enclosed area, `None` when the
/// binary image has no foreground.
pub fn dominant_contour(binary: &image::GrayImage) -> Option<Vec<Point<i32>>> {
    find_contours::<i32>(binary)
        .into_iter()
        .filter(|contour| contour.border_type == BorderType::Outer)
        .map(|contour| {
            let area = polygon_area(&contour.points);
            (area, contour.points)
        })
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, points)| points)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_with_dark_rect(width: u32, height: u32, rect: (u32, u32, u32, u32)) -> DynamicImage {
        let mut img = image::GrayImage::from_pixel(width, height, image::Luma([255]));
        let (x0, y0, x1, y1) = rect;
        for y in y0..y1 {
            for x in x0..x1 {
                img.put_pixel(x, y, image::Luma([0]));
            }
        }
        DynamicImage::ImageLuma8(img)
    }

    #[test]
    fn test_adaptive_threshold_marks_ink_as_foreground() {
        let img = page_with_dark_rect(60, 60, (20, 20, 40, 40));
        let result = apply_adaptive_threshold(&img, 8.0, 11).unwrap();

        assert_eq!(result.image.dimensions(), (60, 60));
        // Border of the dark block is well below the local mean
        assert_eq!(result.image.get_pixel(20, 20)[0], 255);
        // Far-away paper stays background
        assert_eq!(result.image.get_pixel(2, 2)[0], 0);
        for pixel in result.image.pixels() {
            assert!(pixel[0] == 0 || pixel[0] == 255);
        }
    }

    #[test]
    fn test_adaptive_threshold_uniform_page_is_empty() {
        let img = DynamicImage::ImageLuma8(image::GrayImage::from_pixel(
            30,
            30,
            image::Luma([200]),
        ));
        let result = apply_adaptive_threshold(&img, 5.0, 11).unwrap();
        assert!(result.image.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn test_adaptive_threshold_rejects_bad_sigma() {
        let img = page_with_dark_rect(10, 10, (2, 2, 4, 4));
        assert!(apply_adaptive_threshold(&img, 0.0, 11).is_err());
    }

    #[test]
    fn test_polygon_area() {
        let square = vec![
            Point::new(0, 0),
            Point::new(10, 0),
            Point::new(10, 10),
            Point::new(0, 10),
        ];
        assert_eq!(polygon_area(&square), 100.0);

        let reversed: Vec<_> = square.iter().rev().copied().collect();
        assert_eq!(polygon_area(&reversed), 100.0);
        assert_eq!(polygon_area(&square[..2]), 0.0);
    }

    #[test]
    fn test_dominant_contour_picks_largest_region() {
        let mut binary = image::GrayImage::new(100, 100);
        for y in 10..20 {
            for x in 10..20 {
                binary.put_pixel(x, y, image::Luma([255]));
            }
        }
        for y in 40..90 {
            for x in 30..80 {
                binary.put_pixel(x, y, image::Luma([255]));
            }
        }

        let contour = dominant_contour(&binary).unwrap();
        let min_x = contour.iter().map(|p| p.x).min().unwrap();
        let max_y = contour.iter().map(|p| p.y).max().unwrap();
        assert_eq!(min_x, 30);
        assert_eq!(max_y, 89);
    }

    #[test]
    fn test_dominant_contour_empty_image() {
        let binary = image::GrayImage::new(20, 20);
        assert!(dominant_contour(&binary).is_none());
    }
}
