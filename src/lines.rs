//! Line primitives produced by the detector.

use std::f64::consts::PI;

use nalgebra::{Point2, Vector2};

/// An infinite line in Hesse normal form `normal · p = distance`.
///
/// The origin is the image center; use [`InfiniteLine::corner_aligned_line`] for pixel
/// coordinates. `strength` is the accumulator vote of the peak the line came from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InfiniteLine {
    normal: Vector2<f64>,
    angle: f64,
    distance: f64,
    strength: f64,
}

impl InfiniteLine {
    /// Creates a line from its normal angle in radians.
    pub fn from_angle(angle: f64, distance: f64, strength: f64) -> Self {
        let angle = normalize_angle(angle);
        Self {
            normal: Vector2::new(angle.cos(), angle.sin()),
            angle,
            distance,
            strength,
        }
    }

    /// Creates a line from a (not necessarily unit) normal.
    ///
    /// Returns `None` for a null normal.
    pub fn from_normal(normal: Vector2<f64>, distance: f64, strength: f64) -> Option<Self> {
        let length = normal.norm();
        if length <= f64::EPSILON {
            return None;
        }
        let normal = normal / length;
        Some(Self {
            normal,
            angle: normal.y.atan2(normal.x),
            distance: distance / length,
            strength,
        })
    }

    /// Unit normal.
    pub fn normal(&self) -> Vector2<f64> {
        self.normal
    }

    /// Angle of the normal, in `(-pi, pi]`.
    pub fn angle(&self) -> f64 {
        self.angle
    }

    /// Signed distance to the origin.
    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// Accumulator vote.
    pub fn strength(&self) -> f64 {
        self.strength
    }

    /// Foot point of the origin on the line.
    pub fn point(&self) -> Point2<f64> {
        Point2::from(self.normal * self.distance)
    }

    /// Unit direction, the normal rotated by 90 degrees.
    pub fn direction(&self) -> Vector2<f64> {
        Vector2::new(-self.normal.y, self.normal.x)
    }

    /// Signed distance of `point` to the line.
    pub fn signed_distance(&self, point: &Point2<f64>) -> f64 {
        self.normal.dot(&point.coords) - self.distance
    }

    /// The same line with the origin moved from the image center to the top-left corner.
    pub fn corner_aligned_line(&self, width: u32, height: u32) -> Self {
        let center = Vector2::new(width as f64 * 0.5, height as f64 * 0.5);
        Self {
            distance: self.distance + self.normal.dot(&center),
            ..*self
        }
    }

    /// Same line with a different strength.
    pub fn with_strength(self, strength: f64) -> Self {
        Self { strength, ..self }
    }

    /// True if both lines are parallel within `cos_angle` (the cosine of the maximal
    /// angle between them), regardless of orientation.
    pub fn is_parallel(&self, other: &Self, cos_angle: f64) -> bool {
        self.normal.dot(&other.normal).abs() >= cos_angle
    }

    /// True if both lines describe nearly the same line.
    ///
    /// With `half_orientation` a line also matches its flipped counterpart (opposite
    /// normal and negated distance).
    pub fn is_similar(&self, other: &Self, distance: f64, cos_angle: f64, half_orientation: bool) -> bool {
        let cos = self.normal.dot(&other.normal);

        (cos > 0.0 && cos > cos_angle && (self.distance - other.distance).abs() < distance)
            || (half_orientation
                && cos < 0.0
                && -cos > cos_angle
                && (self.distance + other.distance).abs() < distance)
    }
}

/// A line segment in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FiniteLine {
    pub start: Point2<f64>,
    pub end: Point2<f64>,
}

impl FiniteLine {
    pub fn new(start: Point2<f64>, end: Point2<f64>) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> f64 {
        (self.end - self.start).norm()
    }

    /// Unit direction from start to end, zero for a degenerate segment.
    pub fn direction(&self) -> Vector2<f64> {
        let delta = self.end - self.start;
        let length = delta.norm();
        if length <= f64::EPSILON {
            Vector2::zeros()
        } else {
            delta / length
        }
    }
}

/// Maps an angle into `(-pi, pi]`.
pub(crate) fn normalize_angle(angle: f64) -> f64 {
    let mut angle = angle % (2.0 * PI);
    if angle <= -PI {
        angle += 2.0 * PI;
    } else if angle > PI {
        angle -= 2.0 * PI;
    }
    angle
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_into_half_open_interval() {
        assert!((normalize_angle(-PI) - PI).abs() < 1e-12);
        assert!((normalize_angle(4.0) - (4.0 - 2.0 * PI)).abs() < 1e-12);
        assert!((normalize_angle(0.5) - 0.5).abs() < 1e-12);
        assert!((normalize_angle(-0.5 - 4.0 * PI) + 0.5).abs() < 1e-9);
    }

    #[test]
    fn corner_alignment_moves_origin() {
        let line = InfiniteLine::from_angle(0.0, 10.0, 1.0);
        let aligned = line.corner_aligned_line(200, 100);
        assert!((aligned.distance() - 110.0).abs() < 1e-12);
        assert_eq!(aligned.normal(), line.normal());

        let line = InfiniteLine::from_angle(PI / 2.0, -5.0, 1.0);
        let aligned = line.corner_aligned_line(200, 100);
        assert!((aligned.distance() - 45.0).abs() < 1e-9);
    }

    #[test]
    fn similarity_respects_orientation_mode() {
        let a = InfiniteLine::from_angle(0.3, 20.0, 1.0);
        let b = InfiniteLine::from_angle(0.31, 22.0, 1.0);
        let flipped = InfiniteLine::from_angle(0.3 + PI, -21.0, 1.0);
        let cos = 5f64.to_radians().cos();

        assert!(a.is_similar(&b, 5.0, cos, false));
        assert!(!a.is_similar(&b, 1.0, cos, false));
        assert!(a.is_similar(&flipped, 5.0, cos, true));
        assert!(!a.is_similar(&flipped, 5.0, cos, false));
        assert!(a.is_parallel(&flipped, cos));
    }

    #[test]
    fn from_normal_scales_distance() {
        let line = InfiniteLine::from_normal(Vector2::new(0.0, 2.0), 8.0, 3.0).unwrap();
        assert!((line.distance() - 4.0).abs() < 1e-12);
        assert!((line.angle() - PI / 2.0).abs() < 1e-12);
        assert!(line.signed_distance(&Point2::new(7.0, 4.0)).abs() < 1e-12);
        assert!(InfiniteLine::from_normal(Vector2::zeros(), 1.0, 1.0).is_none());
    }

    #[test]
    fn finite_line_length() {
        let segment = FiniteLine::new(Point2::new(1.0, 1.0), Point2::new(4.0, 5.0));
        assert!((segment.length() - 5.0).abs() < 1e-12);
        assert!((segment.direction() - Vector2::new(0.6, 0.8)).norm() < 1e-12);
    }
}
