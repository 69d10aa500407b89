//! Vote generation from a gradient response.

use std::ops::Range;

use crate::accumulator::Accumulator;
use crate::error::{HoughError, Result};
use crate::lookup::LookupCache;
use crate::parallel::{execute, Worker};
use crate::response::GradientResponse;

/// Rows handed to one voting task at least.
const MINIMAL_ROWS_PER_TASK: u32 = 32;

/// Bin layout shared by all accumulators of one detection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccumulatorLayout {
    pub distance_bins: u32,
    pub angle_bins: u32,
    pub mirrored_angle_bins: u32,
    pub half_orientation: bool,
}

impl AccumulatorLayout {
    /// Creates an empty accumulator for a `width x height` image.
    pub fn accumulator(&self, width: u32, height: u32, cache: &LookupCache) -> Result<Accumulator> {
        Accumulator::new(
            width,
            height,
            self.distance_bins,
            self.angle_bins,
            self.mirrored_angle_bins,
            self.half_orientation,
            cache,
        )
    }
}

#[inline]
fn exceeds(pair: [i8; 2], threshold: i8) -> bool {
    pair[0] <= -threshold || pair[0] >= threshold || pair[1] <= -threshold || pair[1] >= threshold
}

/// Casts the votes of the response rows in `rows`.
///
/// The one-pixel image frame never votes. A pixel votes with a response pair when
/// either value of the pair reaches `vote_threshold` in magnitude; with the four
/// channel layout both pairs are checked and may vote independently.
pub fn create_votes(
    response: &GradientResponse,
    accumulator: &mut Accumulator,
    angle_neighbors: u32,
    vote_threshold: u32,
    rows: Range<u32>,
) -> Result<()> {
    let (width, height) = (response.width(), response.height());
    if (width, height) != (accumulator.width(), accumulator.height()) {
        return Err(HoughError::DimensionMismatch(format!(
            "response {}x{} does not match accumulator {}x{}",
            width,
            height,
            accumulator.width(),
            accumulator.height()
        )));
    }

    let threshold = vote_threshold.min(i8::MAX as u32) as i8;
    let first_row = rows.start.max(1);
    let end_row = rows.end.min(height - 1);

    for y in first_row..end_row {
        for x in 1..width - 1 {
            if let Some(pair) = response.axis_aligned(x, y) {
                if exceeds(pair, threshold) {
                    accumulator.accumulate(x, y, pair, angle_neighbors);
                }
            }
            if let Some(pair) = response.diagonal(x, y) {
                if exceeds(pair, threshold) {
                    accumulator.accumulate_diagonal(x, y, pair, angle_neighbors);
                }
            }
        }
    }

    Ok(())
}

/// Votes the whole response into one accumulator.
///
/// Every worker task votes a block of rows into a private accumulator; the partial
/// accumulators are joined into the returned one. Its mirrored rows are not created.
pub fn accumulate_parallel(
    response: &GradientResponse,
    layout: &AccumulatorLayout,
    angle_neighbors: u32,
    vote_threshold: u32,
    cache: &LookupCache,
    worker: Option<&Worker>,
) -> Result<Accumulator> {
    let (width, height) = (response.width(), response.height());

    let mut accumulators = execute(worker, 0..height, MINIMAL_ROWS_PER_TASK, |rows| {
        let mut accumulator = layout.accumulator(width, height, cache)?;
        create_votes(response, &mut accumulator, angle_neighbors, vote_threshold, rows)?;
        Ok(accumulator)
    })
    .into_iter()
    .collect::<Result<Vec<_>>>()?;

    debug!("joining {} partial accumulators", accumulators.len());
    Accumulator::join(&mut accumulators, worker)?;

    accumulators
        .into_iter()
        .next()
        .ok_or_else(|| HoughError::InvalidImageSize { width, height })
}
