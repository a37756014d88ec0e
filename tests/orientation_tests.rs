//! # Page Normalization Tests Module
//!
//! Orientation decisions, bound-preserving rotation and page normalization
//! through the public API.

#[cfg(test)]
mod tests {
    use eeo_digitizer::geometry::{cyclic_points, Point2};
    use eeo_digitizer::preprocessing::{resolve_rotation, rotate_bound, RotationDecision};
    use eeo_digitizer::{DigitizerError, Diagnostics, EngineConfig, FormDigitizer, FormType};
    use image::{DynamicImage, GenericImageView, GrayImage, Luma};

    /// White page with a thick black table frame
    fn framed_page(width: u32, height: u32) -> GrayImage {
        let mut img = GrayImage::from_pixel(width, height, Luma([255]));
        let (x0, y0, x1, y1) = (width / 8, height / 8, width * 7 / 8, height * 7 / 8);
        for x in x0..x1 {
            for t in 0..3 {
                img.put_pixel(x, y0 + t, Luma([0]));
                img.put_pixel(x, y1 - 1 - t, Luma([0]));
            }
        }
        for y in y0..y1 {
            for t in 0..3 {
                img.put_pixel(x0 + t, y, Luma([0]));
                img.put_pixel(x1 - 1 - t, y, Luma([0]));
            }
        }
        img
    }

    /// Test corner classification for rotated orderings with swapped diagonals
    #[test]
    fn test_cyclic_points_rotated_orderings() {
        let corners = [
            Point2::new(10.0, 10.0),
            Point2::new(90.0, 10.0),
            Point2::new(90.0, 60.0),
            Point2::new(10.0, 60.0),
        ];
        for shift in 0..4 {
            let mut points = corners.to_vec();
            points.rotate_left(shift);
            points.swap(0, 2);
            let c = cyclic_points(&points).unwrap();
            assert_eq!(c.top_left, corners[0]);
            assert_eq!(c.top_right, corners[1]);
            assert_eq!(c.bottom_right, corners[2]);
            assert_eq!(c.bottom_left, corners[3]);
        }
    }

    /// Test that angles near either axis need no rotation
    #[test]
    fn test_near_axis_angles_need_no_rotation() {
        for angle in [0.0, 0.3, 89.7, 90.0] {
            assert_eq!(
                resolve_rotation(None, angle, 0.5),
                RotationDecision::NoRotation
            );
        }
        assert_eq!(resolve_rotation(None, 12.0, 0.5), RotationDecision::Ambiguous);
    }

    /// Test that a quarter turn swaps the canvas dimensions
    #[test]
    fn test_rotate_bound_quarter_turn() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(120, 40, Luma([0])));
        let rotated = rotate_bound(&img, 90.0).unwrap();
        assert_eq!(rotated.dimensions(), (40, 120));
    }

    /// Test that a blank page fails with a content-bounds error
    #[test]
    fn test_blank_page_is_rejected() {
        let digitizer = FormDigitizer::for_form(FormType::Eeo5, EngineConfig::default()).unwrap();
        let blank = DynamicImage::ImageLuma8(GrayImage::from_pixel(64, 64, Luma([255])));
        let mut diagnostics = Diagnostics::new("blank_scan");

        let result = digitizer.normalize_page(0, &blank, &mut diagnostics);
        assert!(matches!(
            result,
            Err(DigitizerError::ContentBoundsNotFound(_))
        ));
    }

    /// Test that an upright framed page is rendered onto the target canvas
    #[test]
    fn test_upright_page_rendered_to_canvas() {
        let mut config = EngineConfig::default();
        config.geometry.adaptive_threshold_sigma = 10.0;
        let digitizer = FormDigitizer::for_form(FormType::Eeo1, config).unwrap();
        let page = DynamicImage::ImageLuma8(framed_page(320, 420));
        let mut diagnostics = Diagnostics::new("acme_2019");

        let normalized = digitizer.normalize_page(0, &page, &mut diagnostics).unwrap();

        assert_eq!(normalized.image.dimensions(), (523, 679));
        assert_eq!(normalized.decision, Some(RotationDecision::NoRotation));
        assert!(normalized.bounds.width() < 320);
        assert!(diagnostics.is_empty());
    }
}
