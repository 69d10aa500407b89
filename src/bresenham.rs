//! Clipping of infinite lines for pixel traces.
//!
//! The traces themselves are walked with [`imageproc::drawing::BresenhamLineIter`];
//! this module only decides where a trace starts and ends and in which direction the
//! fallback neighbors of a trace pixel lie.

use imageproc::drawing::BresenhamLineIter;
use nalgebra::Point2;

use crate::lines::InfiniteLine;

/// Dominant axis of a pixel trace.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TraceOrientation {
    /// `|dx| >= |dy|`, one pixel per column.
    Horizontal,
    /// `|dy| > |dx|`, one pixel per row.
    Vertical,
}

impl TraceOrientation {
    pub fn of(start: (i32, i32), end: (i32, i32)) -> Self {
        if (end.0 - start.0).abs() >= (end.1 - start.1).abs() {
            TraceOrientation::Horizontal
        } else {
            TraceOrientation::Vertical
        }
    }

    /// Pixel `offset` steps away from `(x, y)` across the trace.
    #[inline]
    pub fn across(&self, x: i32, y: i32, offset: i32) -> (i32, i32) {
        match self {
            TraceOrientation::Horizontal => (x, y + offset),
            TraceOrientation::Vertical => (x + offset, y),
        }
    }
}

/// Integer end points of an infinite line clipped to the inclusive rectangle
/// `[left, right] x [top, bottom]`.
///
/// `line` must be in pixel coordinates (see [`InfiniteLine::corner_aligned_line`]).
/// The end points are rounded and clamped into the rectangle. Returns `None` if the
/// line misses the rectangle.
pub fn border_intersection(
    line: &InfiniteLine,
    left: i32,
    top: i32,
    right: i32,
    bottom: i32,
) -> Option<((i32, i32), (i32, i32))> {
    if left > right || top > bottom {
        return None;
    }

    let point = line.point();
    let direction = line.direction();

    let mut t_min = f64::NEG_INFINITY;
    let mut t_max = f64::INFINITY;

    for (origin, delta, low, high) in [
        (point.x, direction.x, left as f64, right as f64),
        (point.y, direction.y, top as f64, bottom as f64),
    ] {
        if delta.abs() <= f64::EPSILON {
            if origin < low || origin > high {
                return None;
            }
            continue;
        }
        let (a, b) = ((low - origin) / delta, (high - origin) / delta);
        t_min = t_min.max(a.min(b));
        t_max = t_max.min(a.max(b));
    }

    if t_min > t_max {
        return None;
    }

    let clamp = |p: Point2<f64>| {
        (
            (p.x.round() as i32).clamp(left, right),
            (p.y.round() as i32).clamp(top, bottom),
        )
    };
    Some((clamp(point + direction * t_min), clamp(point + direction * t_max)))
}

/// All pixels between two end points, both included.
pub fn trace(start: (i32, i32), end: (i32, i32)) -> BresenhamLineIter {
    BresenhamLineIter::new((start.0 as f32, start.1 as f32), (end.0 as f32, end.1 as f32))
}
