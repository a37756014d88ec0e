//! # Page Geometry
//!
//! Points, rotated rectangles and corner classification used by page
//! orientation normalization. Coordinates are in image space (y grows downward).

use imageproc::point::Point;
use serde::{Deserialize, Serialize};

/// A point in image space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Arithmetic mean of a set of points
    pub fn centroid(points: &[Point2]) -> Option<Point2> {
        if points.is_empty() {
            return None;
        }
        let n = points.len() as f32;
        let (sx, sy) = points
            .iter()
            .fold((0.0f32, 0.0f32), |(sx, sy), p| (sx + p.x, sy + p.y));
        Some(Point2::new(sx / n, sy / n))
    }

    pub fn distance(&self, other: &Point2) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl From<Point<i32>> for Point2 {
    fn from(p: Point<i32>) -> Self {
        Point2::new(p.x as f32, p.y as f32)
    }
}

/// Corners of a quadrilateral classified relative to its centroid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Corners {
    pub top_left: Point2,
    pub top_right: Point2,
    pub bottom_right: Point2,
    pub bottom_left: Point2,
}

/// Classifies exactly four points into top-left, top-right, bottom-right and
/// bottom-left by comparing each against the centroid.
///
/// Returns `None` when the input does not hold four points or when a quadrant is
/// empty (e.g. a rectangle rotated by exactly 45°, where corners sit on the centroid
/// axes). Callers treat `None` as "rotation cannot be determined".
pub fn cyclic_points(points: &[Point2]) -> Option<Corners> {
    if points.len() != 4 {
        return None;
    }
    let center = Point2::centroid(points)?;

    let find = |pred: &dyn Fn(&Point2) -> bool| points.iter().copied().find(|p| pred(p));

    Some(Corners {
        top_left: find(&|p| p.x < center.x && p.y < center.y)?,
        top_right: find(&|p| p.x > center.x && p.y < center.y)?,
        bottom_right: find(&|p| p.x > center.x && p.y > center.y)?,
        bottom_left: find(&|p| p.x < center.x && p.y > center.y)?,
    })
}

/// Minimum-area bounding rectangle of a contour
#[derive(Debug, Clone, PartialEq)]
pub struct RotatedRect {
    pub center: Point2,
    /// (width, height): length of the first box edge and of its neighbour
    pub size: (f32, f32),
    /// Edge angle folded into [0, 90) degrees
    pub angle: f32,
    /// Box corners in the order produced by the rectangle fit
    pub corners: [Point2; 4],
}

impl RotatedRect {
    /// Builds the rectangle description from four box corners given in
    /// traversal order.
    pub fn from_box_points(corners: [Point2; 4]) -> Self {
        let center = Point2::centroid(&corners).unwrap_or(corners[0]);
        let width = corners[0].distance(&corners[1]);
        let height = corners[1].distance(&corners[2]);

        let dx = corners[1].x - corners[0].x;
        let dy = corners[1].y - corners[0].y;
        let angle = if width > 0.0 {
            dy.atan2(dx).to_degrees().rem_euclid(90.0)
        } else {
            0.0
        };
        // rem_euclid can round up to exactly 90.0 for tiny negative angles
        let angle = if angle >= 90.0 { 0.0 } else { angle };

        Self {
            center,
            size: (width, height),
            angle,
            corners,
        }
    }

    pub fn area(&self) -> f32 {
        self.size.0 * self.size.1
    }
}

/// Fits the minimum-area rotated rectangle around a contour.
///
/// Returns `None` for contours with fewer than three points.
pub fn min_area_rect(contour: &[Point<i32>]) -> Option<RotatedRect> {
    if contour.len() < 3 {
        return None;
    }
    let box_points = imageproc::geometry::min_area_rect(contour);
    Some(RotatedRect::from_box_points(box_points.map(Point2::from)))
}

/// Axis-aligned pixel box, inclusive of both corners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BBox {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl BBox {
    pub fn new(x0: u32, y0: u32, x1: u32, y1: u32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> u32 {
        self.x1.saturating_sub(self.x0) + 1
    }

    pub fn height(&self) -> u32 {
        self.y1.saturating_sub(self.y0) + 1
    }
}
