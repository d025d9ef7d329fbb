// scout_core/src/geometry.rs

//! Planar geometry in the robot-local frame.
//!
//! Distances are centimetres. Bearings are compass-style degrees, measured
//! clockwise from the +y ("forward") axis.

use nalgebra::{Point2, Vector2};
use std::fmt;

/// An immutable 2D position in centimetres.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns a new point offset from this one by a polar move.
    ///
    /// # Arguments
    /// * `bearing`: Direction of the move in degrees, clockwise from +y.
    /// * `distance`: Length of the move in centimetres.
    pub fn moved(&self, bearing: f64, distance: f64) -> Point {
        let radians = bearing.to_radians();
        let offset = Vector2::new(radians.sin(), radians.cos()) * distance;
        Point::from(self.as_nalgebra() + offset)
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        nalgebra::distance(&self.as_nalgebra(), &other.as_nalgebra())
    }

    /// Compass bearing (degrees, clockwise from +y) of `other` as seen from this point.
    pub fn bearing_to(&self, other: &Point) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        normalize_degrees(dx.atan2(dy).to_degrees())
    }

    pub fn as_nalgebra(&self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }
}

impl From<Point2<f64>> for Point {
    fn from(p: Point2<f64>) -> Self {
        Point::new(p.x, p.y)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(x={:.1},y={:.1})", self.x, self.y)
    }
}

// --- Angle helpers ---

/// Normalizes an angle in degrees to the half-open range (-180, 180].
pub fn normalize_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

/// Integer variant of [`normalize_degrees`], used for encoder-level turns.
pub fn normalize_degrees_i32(angle: i32) -> i32 {
    let wrapped = angle.rem_euclid(360);
    if wrapped > 180 {
        wrapped - 360
    } else {
        wrapped
    }
}

/// Straight-line distance between two polar endpoints (law of cosines).
///
/// # Arguments
/// * `degrees1`, `distance1`: Angle and range of the first endpoint.
/// * `degrees2`, `distance2`: Angle and range of the second endpoint.
pub fn distance_between_polar_degrees(
    degrees1: f64,
    distance1: f64,
    degrees2: f64,
    distance2: f64,
) -> f64 {
    distance_between_polar_radians(
        degrees1.to_radians(),
        distance1,
        degrees2.to_radians(),
        distance2,
    )
}

pub fn distance_between_polar_radians(
    radians1: f64,
    distance1: f64,
    radians2: f64,
    distance2: f64,
) -> f64 {
    let squared = distance1 * distance1 + distance2 * distance2
        - 2.0 * distance1 * distance2 * (radians1 - radians2).cos();
    // Rounding can push a zero-length chord slightly negative.
    squared.max(0.0).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn move_north_and_east() {
        let north = Point::ORIGIN.moved(0.0, 10.0);
        assert_abs_diff_eq!(north.x, 0.0, epsilon = EPSILON);
        assert_abs_diff_eq!(north.y, 10.0, epsilon = EPSILON);

        let east = Point::ORIGIN.moved(90.0, 10.0);
        assert_abs_diff_eq!(east.x, 10.0, epsilon = EPSILON);
        assert_abs_diff_eq!(east.y, 0.0, epsilon = EPSILON);
    }

    #[test]
    fn bearing_to_matches_move() {
        let start = Point::new(3.0, -4.0);
        let end = start.moved(-135.0, 25.0);
        assert_abs_diff_eq!(start.bearing_to(&end), -135.0, epsilon = 1e-6);
        assert_abs_diff_eq!(start.distance_to(&end), 25.0, epsilon = 1e-6);
    }

    #[test]
    fn normalize_is_half_open() {
        assert_abs_diff_eq!(normalize_degrees(-180.0), 180.0);
        assert_abs_diff_eq!(normalize_degrees(180.0), 180.0);
        assert_abs_diff_eq!(normalize_degrees(540.0), 180.0);
        assert_abs_diff_eq!(normalize_degrees(-190.0), 170.0);
        assert_eq!(normalize_degrees_i32(-180), 180);
        assert_eq!(normalize_degrees_i32(359), -1);
        assert_eq!(normalize_degrees_i32(0), 0);
    }

    #[test]
    fn polar_chord_for_symmetric_rays() {
        let chord = distance_between_polar_degrees(-5.0, 50.0, 5.0, 50.0);
        assert_abs_diff_eq!(chord, 2.0 * 50.0 * 5f64.to_radians().sin(), epsilon = 1e-9);
        assert_abs_diff_eq!(distance_between_polar_degrees(7.0, 20.0, 7.0, 20.0), 0.0);
    }
}
