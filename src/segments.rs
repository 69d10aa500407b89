//! Finite segments along detected infinite lines.
//!
//! Every line is traced pixel by pixel through the gradient response. A trace pixel
//! supports the line if its response is strong and points roughly along the line
//! normal; short gaps are bridged, long gaps end the current segment.

use nalgebra::Point2;

use crate::bresenham::{border_intersection, trace, TraceOrientation};
use crate::lines::{FiniteLine, InfiniteLine};
use crate::lookup::AngleTables;
use crate::parallel::{execute, Worker};
use crate::response::GradientResponse;

/// Minimal absolute filter response of a pixel supporting a line.
pub(crate) const RESPONSE_THRESHOLD: i8 = 8;

/// Angle bins a supporting response may deviate from the line.
const ANGLE_TOLERANCE: u32 = 3;

/// Trace pixels without support that end a segment.
const MAXIMAL_SPACE: u32 = 10;

/// Supported pixels after the first one a segment needs.
const MINIMAL_LENGTH: u32 = 10;

/// Distance of traces from the image border; keeps all fallback neighbors inside.
const BORDER: i32 = 2;

/// True if any response of the pixel exceeds [`RESPONSE_THRESHOLD`] in magnitude.
#[inline]
pub(crate) fn is_strong(pixel: &[i8]) -> bool {
    pixel
        .iter()
        .any(|&value| value > RESPONSE_THRESHOLD || value < -RESPONSE_THRESHOLD)
}

fn supports(response: &GradientResponse, tables: &AngleTables, line_bin: u32, (x, y): (i32, i32)) -> bool {
    if x < 0 || y < 0 || x as u32 >= response.width() || y as u32 >= response.height() {
        return false;
    }
    let pixel = response.pixel(x as u32, y as u32);
    if !is_strong(pixel) {
        return false;
    }
    let ring = tables.ring();
    tables
        .pixel_bins(response.layout(), pixel)
        .into_iter()
        .flatten()
        .any(|bin| ring.within(line_bin, bin, ANGLE_TOLERANCE))
}

/// Segments of `line` supported by the gradient response.
///
/// The line is clipped to the image shrunk by two pixels and traced from one border to
/// the other. A trace pixel without support may be replaced by its neighbors one or
/// two pixels across the trace. A segment ends after ten unsupported pixels in a row
/// and is kept if it gathered at least ten supported pixels after its first one. End
/// points are pixel coordinates.
pub fn detect_finite_lines(line: &InfiniteLine, response: &GradientResponse, tables: &AngleTables) -> Vec<FiniteLine> {
    let (width, height) = (response.width() as i32, response.height() as i32);
    let pixel_line = line.corner_aligned_line(response.width(), response.height());

    let Some((start, end)) = border_intersection(&pixel_line, BORDER, BORDER, width - 1 - BORDER, height - 1 - BORDER)
    else {
        return Vec::new();
    };

    let orientation = TraceOrientation::of(start, end);
    let line_bin = tables.line_bin(line.angle());

    let supported = |(x, y): (i32, i32)| {
        supports(response, tables, line_bin, (x, y))
            || [1, -1, 2, -2]
                .into_iter()
                .any(|offset| supports(response, tables, line_bin, orientation.across(x, y, offset)))
    };

    let to_point = |(x, y): (i32, i32)| Point2::new(x as f64, y as f64);

    let mut segments = Vec::new();
    let mut current: Option<((i32, i32), (i32, i32))> = None;
    let mut line_length = 0u32;
    let mut no_line_point_since = 0u32;

    for position in trace(start, end) {
        if supported(position) {
            match current.as_mut() {
                Some((_, last)) => {
                    *last = position;
                    line_length += 1;
                }
                None => {
                    current = Some((position, position));
                    line_length = 0;
                }
            }
            no_line_point_since = 0;
        } else {
            no_line_point_since += 1;

            if no_line_point_since >= MAXIMAL_SPACE {
                if let Some((first, last)) = current.take() {
                    if line_length >= MINIMAL_LENGTH {
                        segments.push(FiniteLine::new(to_point(first), to_point(last)));
                    }
                }
            }
        }
    }

    if let Some((first, last)) = current {
        if line_length >= MINIMAL_LENGTH {
            segments.push(FiniteLine::new(to_point(first), to_point(last)));
        }
    }

    segments
}

/// Segments of all lines, distributed over the worker; the order follows `lines`.
pub fn detect_all_finite_lines(
    lines: &[InfiniteLine],
    response: &GradientResponse,
    tables: &AngleTables,
    worker: Option<&Worker>,
) -> Vec<FiniteLine> {
    let segments: Vec<FiniteLine> = execute(worker, 0..lines.len() as u32, 10, |range| {
        lines[range.start as usize..range.end as usize]
            .iter()
            .flat_map(|line| detect_finite_lines(line, response, tables))
            .collect::<Vec<_>>()
    })
    .into_iter()
    .flatten()
    .collect();

    debug!("{} finite lines along {} infinite lines", segments.len(), lines.len());
    segments
}
