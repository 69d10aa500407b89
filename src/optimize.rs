//! Least-squares refinement of detected lines.
//!
//! The accumulator quantizes both angle and distance. A detected line is refined by
//! collecting the strongest matching edge pixel near every tenth trace pixel and
//! fitting a line through them with Levenberg-Marquardt.

use nalgebra::{Matrix2, Point2, Vector2};

use crate::bresenham::{border_intersection, trace};
use crate::lines::InfiniteLine;
use crate::lookup::AngleTables;
use crate::parallel::{execute, Worker};
use crate::response::GradientResponse;
use crate::segments::is_strong;

/// Search radius along the normal used by the detector, in pixels.
pub const DEFAULT_RADIUS: u32 = 5;

/// Every n-th trace pixel is used as a sample.
const SAMPLING_STEPS: usize = 10;

/// Edge points needed for a fit.
const MINIMAL_POINTS: usize = 5;

const ITERATIONS: usize = 10;
const INITIAL_LAMBDA: f64 = 0.001;
const LAMBDA_FACTOR: f64 = 5.0;

/// Refines every line, distributed over the worker.
///
/// Lines whose refinement fails are returned unchanged; the order follows `lines`.
pub fn optimize_infinite_lines(
    lines: &[InfiniteLine],
    response: &GradientResponse,
    tables: &AngleTables,
    radius: u32,
    worker: Option<&Worker>,
) -> Vec<InfiniteLine> {
    let optimized: Vec<InfiniteLine> = execute(worker, 0..lines.len() as u32, 4, |range| {
        lines[range.start as usize..range.end as usize]
            .iter()
            .map(|line| optimize_infinite_line(line, response, tables, radius))
            .collect::<Vec<_>>()
    })
    .into_iter()
    .flatten()
    .collect();

    debug!("optimized {} lines", optimized.len());
    optimized
}

/// Refines one line; returns it unchanged if too few edge points support it or the fit
/// fails.
pub fn optimize_infinite_line(
    line: &InfiniteLine,
    response: &GradientResponse,
    tables: &AngleTables,
    radius: u32,
) -> InfiniteLine {
    let points = edge_points(line, response, tables, radius);
    if points.len() < MINIMAL_POINTS {
        return *line;
    }

    fit_line(line, &points).unwrap_or(*line)
}

/// Strongest matching edge pixels near the samples of the line trace, relative to the
/// image center.
fn edge_points(line: &InfiniteLine, response: &GradientResponse, tables: &AngleTables, radius: u32) -> Vec<Point2<f64>> {
    let (width, height) = (response.width() as i32, response.height() as i32);
    let pixel_line = line.corner_aligned_line(response.width(), response.height());

    let Some((start, end)) = border_intersection(&pixel_line, 2, 2, width - 3, height - 3) else {
        return Vec::new();
    };

    let line_bin = tables.line_bin(line.angle());
    let ring = tables.ring();
    let tolerance = tables.angle_bins * 15 / 360;

    let offset = line.normal() * radius as f64;
    let offset = (offset.x.round() as i32, offset.y.round() as i32);

    let center = Vector2::new(response.width() as f64 * 0.5, response.height() as f64 * 0.5);
    let mut points = Vec::new();

    for (x, y) in trace(start, end).step_by(SAMPLING_STEPS) {
        let from = (x - offset.0, y - offset.1);
        let to = (x + offset.0, y + offset.1);

        let mut best: Option<((i32, i32), i32)> = None;

        for (px, py) in trace(from, to) {
            if px < 0 || py < 0 || px >= width || py >= height {
                continue;
            }
            let pixel = response.pixel(px as u32, py as u32);
            if !is_strong(pixel) {
                continue;
            }
            let aligned = tables
                .pixel_bins(response.layout(), pixel)
                .into_iter()
                .flatten()
                .any(|bin| ring.distance(line_bin, bin) < tolerance);
            if !aligned {
                continue;
            }

            let value = pixel.iter().map(|&v| (v as i32).abs()).max().unwrap_or(0);
            let distance = (px - x).pow(2) + (py - y).pow(2);

            best = match best {
                Some((position, best_value))
                    if value < best_value
                        || (value == best_value
                            && distance >= (position.0 - x).pow(2) + (position.1 - y).pow(2)) =>
                {
                    Some((position, best_value))
                }
                _ => Some(((px, py), value)),
            };
        }

        if let Some(((px, py), _)) = best {
            points.push(Point2::new(px as f64, py as f64) - center);
        }
    }

    points
}

fn squared_error(angle: f64, distance: f64, points: &[Point2<f64>]) -> f64 {
    let (sin, cos) = angle.sin_cos();
    points
        .iter()
        .map(|p| (cos * p.x + sin * p.y - distance).powi(2))
        .sum()
}

/// Orthogonal least-squares line through `points`, starting at `initial`.
///
/// Levenberg-Marquardt over `(angle, distance)` of the Hesse normal form. The result
/// keeps the normal orientation and the strength of `initial`.
pub(crate) fn fit_line(initial: &InfiniteLine, points: &[Point2<f64>]) -> Option<InfiniteLine> {
    let mut angle = initial.angle();
    let mut distance = initial.distance();
    let mut error = squared_error(angle, distance, points);
    let mut lambda = INITIAL_LAMBDA;

    for _ in 0..ITERATIONS {
        let (sin, cos) = angle.sin_cos();

        let mut hessian = Matrix2::<f64>::zeros();
        let mut gradient = Vector2::<f64>::zeros();
        for p in points {
            let residual = cos * p.x + sin * p.y - distance;
            let jacobian = Vector2::new(-sin * p.x + cos * p.y, -1.0);
            hessian += jacobian * jacobian.transpose();
            gradient += jacobian * residual;
        }

        let mut damped = hessian;
        damped[(0, 0)] *= 1.0 + lambda;
        damped[(1, 1)] *= 1.0 + lambda;

        let Some(step) = damped.lu().solve(&(-gradient)) else {
            lambda *= LAMBDA_FACTOR;
            continue;
        };

        let (candidate_angle, candidate_distance) = (angle + step[0], distance + step[1]);
        let candidate_error = squared_error(candidate_angle, candidate_distance, points);

        if candidate_error.is_finite() && candidate_error < error {
            angle = candidate_angle;
            distance = candidate_distance;
            error = candidate_error;
            lambda /= LAMBDA_FACTOR;
        } else {
            lambda *= LAMBDA_FACTOR;
        }
    }

    if !angle.is_finite() || !distance.is_finite() {
        return None;
    }

    let fitted = InfiniteLine::from_angle(angle, distance, initial.strength());
    if fitted.normal().dot(&initial.normal()) < 0.0 {
        Some(InfiniteLine::from_angle(angle + std::f64::consts::PI, -distance, initial.strength()))
    } else {
        Some(fitted)
    }
}
