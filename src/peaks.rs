//! Sub-pixel peak refinement and the bin-to-line conversion.

use std::f64::consts::{FRAC_PI_2, PI};

use crate::lines::InfiniteLine;

/// Largest accepted refinement offset, in bins.
const MAXIMAL_OFFSET: f64 = 2.0;

/// Votes around a peak, indexed `[angle row][distance column]`; `[1][1]` is the peak.
pub type Neighborhood = [[u32; 3]; 3];

/// Offset of the true maximum from the center of a 3x3 vote neighborhood.
///
/// One Newton step on the quadratic model of the votes: gradient and Hessian come from
/// central differences. Returns `(distance offset, angle offset)` such that the refined
/// position is `bin - offset`, or `None` for a singular Hessian or an offset beyond two
/// bins in either direction.
pub fn refine_peak(votes: &Neighborhood) -> Option<(f64, f64)> {
    let v = |row: usize, col: usize| votes[row][col] as f64;

    // [-1 0 1] * 1/2
    let d = (v(1, 2) - v(1, 0)) * 0.5;
    let a = (v(2, 1) - v(0, 1)) * 0.5;

    // [1 -2 1]
    let dd = v(1, 2) + v(1, 0) - 2.0 * v(1, 1);
    let aa = v(2, 1) + v(0, 1) - 2.0 * v(1, 1);

    // [ 1 0 -1 ]
    // [ 0 0  0 ] * 1/4
    // [-1 0  1 ]
    let da = (v(2, 2) + v(0, 0) - v(2, 0) - v(0, 2)) * 0.25;

    let determinant = dd * aa - da * da;
    if determinant.abs() <= f64::EPSILON {
        return None;
    }

    let offset_distance = (aa * d - da * a) / determinant;
    let offset_angle = (dd * a - da * d) / determinant;

    let valid = |offset: f64| (-MAXIMAL_OFFSET..=MAXIMAL_OFFSET).contains(&offset);
    (valid(offset_distance) && valid(offset_angle)).then_some((offset_distance, offset_angle))
}

/// Geometry of an accumulator needed to turn bins into lines.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BinGeometry {
    pub angle_bins_core: u32,
    pub distance_bins: u32,
    pub distance_bins_half: u32,
    pub maximal_distance: i32,
    pub half_orientation: bool,
}

impl BinGeometry {
    /// Line of a (possibly fractional) accumulator position; `angle_bin` counts core rows.
    pub fn line(&self, distance_bin: f64, angle_bin: f64, strength: f64) -> InfiniteLine {
        let steps = (self.angle_bins_core - 1) as f64;
        let angle = if self.half_orientation {
            angle_bin * PI / steps - FRAC_PI_2
        } else {
            angle_bin * 2.0 * PI / steps - PI
        };

        let distance = (distance_bin - self.distance_bins_half as f64) * 2.0 * self.maximal_distance as f64
            / self.distance_bins as f64;

        InfiniteLine::from_angle(angle, distance, strength)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(f: impl Fn(f64, f64) -> f64) -> Neighborhood {
        let mut votes = [[0u32; 3]; 3];
        for (row, values) in votes.iter_mut().enumerate() {
            for (col, value) in values.iter_mut().enumerate() {
                *value = f(col as f64 - 1.0, row as f64 - 1.0).round() as u32;
            }
        }
        votes
    }

    #[test]
    fn recovers_maximum_of_quadratic() {
        let votes = sample(|d, a| 10000.0 - 100.0 * (d - 0.3).powi(2) - 200.0 * (a + 0.2).powi(2));
        let (offset_distance, offset_angle) = refine_peak(&votes).unwrap();
        assert!((offset_distance + 0.3).abs() < 1e-9);
        assert!((offset_angle - 0.2).abs() < 1e-9);
    }

    #[test]
    fn flat_neighborhood_is_singular() {
        assert_eq!(refine_peak(&[[5; 3]; 3]), None);
        // flat along the angle axis
        assert_eq!(refine_peak(&[[1, 3, 1], [1, 3, 1], [1, 3, 1]]), None);
    }

    #[test]
    fn offsets_are_bounded() {
        // maximum far outside the neighborhood along the distance axis
        let votes = sample(|d, _| 10000.0 - 10.0 * (d - 5.0).powi(2));
        let votes = [votes[1], [votes[1][0] + 100, votes[1][1] + 100, votes[1][2] + 100], votes[1]];
        assert_eq!(refine_peak(&votes), None);

        // interior maximum leaning toward the larger distance neighbor
        let (d, a) = refine_peak(&[[1, 2, 1], [2, 9, 3], [1, 2, 1]]).unwrap();
        assert!((d + 1.0 / 26.0).abs() < 1e-12, "distance offset {d}");
        assert_eq!(a, 0.0);

        let (d, a) = refine_peak(&[[4, 8, 4], [8, 9, 8], [4, 8, 4]]).unwrap();
        assert_eq!((d, a), (0.0, 0.0));

        for pattern in [
            [[1, 2, 1], [2, 9, 3], [1, 2, 1]],
            [[2, 5, 1], [4, 9, 8], [1, 6, 3]],
            [[0, 3, 0], [1, 4, 4], [0, 2, 1]],
        ] {
            let (d, a) = refine_peak(&pattern).unwrap();
            assert!(d.abs() <= 2.0 && a.abs() <= 2.0, "offsets ({d}, {a})");
        }
    }

    #[test]
    fn bins_to_lines() {
        let geometry = BinGeometry {
            angle_bins_core: 361,
            distance_bins: 201,
            distance_bins_half: 100,
            maximal_distance: 100,
            half_orientation: true,
        };
        let line = geometry.line(100.0, 180.0, 7.0);
        assert!(line.angle().abs() < 1e-12);
        assert!(line.distance().abs() < 1e-12);
        assert_eq!(line.strength(), 7.0);

        let line = geometry.line(150.25, 360.0, 1.0);
        assert!((line.angle() - FRAC_PI_2).abs() < 1e-12);
        assert!((line.distance() - 50.25 * 200.0 / 201.0).abs() < 1e-9);

        let full = BinGeometry {
            half_orientation: false,
            ..geometry
        };
        // -pi is reported as pi
        assert!((full.line(100.0, 0.0, 1.0).angle() - PI).abs() < 1e-12);
    }
}
