//! The Hough vote grid.
//!
//! Rows are angle bins, columns are distance bins. The angle axis is circular, so the
//! grid carries `mirrored_angle_bins` extra rows above and below the core rows holding
//! copies of the rows on the other side of the ring. With them every core cell has a
//! complete neighborhood and peak detection needs no wraparound logic.
//!
//! ```text
//! row 0 .. m            mirror of the last m core rows
//! row m .. m + core     core angle bins
//! row m + core .. end   mirror of the first m core rows
//! ```
//!
//! In half orientation mode the angle `a` and `a + pi` share one line with negated
//! distance, so mirrored rows are copied reversed along the distance axis.

use std::marker::PhantomData;
use std::sync::Arc;

use image::{GrayImage, ImageBuffer, Luma};

use crate::bins::AngleRing;
use crate::error::{HoughError, Result};
use crate::integral::BorderedIntegral;
use crate::lines::InfiniteLine;
use crate::lookup::{response_index, AngleLookupData, AngleTables, DirectionLookupData, LookupCache};
use crate::parallel::{execute, for_each_row_block, Worker};
use crate::peaks::{refine_peak, BinGeometry, Neighborhood};

/// Sigma of the optional accumulator smoothing, close to a 3x3 binomial kernel.
const SMOOTHING_SIGMA: f32 = 0.8;

/// Selects the angle table used for a pair of filter responses.
pub trait ResponseKind {
    fn angle_table(accumulator: &Accumulator) -> &[AngleLookupData];
}

/// `[h, v]` responses of the 0 and 90 degree filters.
#[derive(Clone, Copy, Debug)]
pub struct AxisAligned;

/// `[r45, r135]` responses of the 45 and 135 degree filters.
#[derive(Clone, Copy, Debug)]
pub struct Diagonal;

impl ResponseKind for AxisAligned {
    fn angle_table(accumulator: &Accumulator) -> &[AngleLookupData] {
        &accumulator.angle_lookup
    }
}

impl ResponseKind for Diagonal {
    fn angle_table(accumulator: &Accumulator) -> &[AngleLookupData] {
        &accumulator.diagonal_lookup
    }
}

enum PeakCriterion<'a> {
    Fixed(u32),
    Adaptive {
        integral: &'a BorderedIntegral,
        normalization: f64,
    },
}

/// Vote grid of one image.
#[derive(Clone, Debug)]
pub struct Accumulator {
    width: u32,
    height: u32,
    width_half: i32,
    height_half: i32,
    distance_bins: u32,
    distance_bins_half: u32,
    angle_bins_core: u32,
    mirrored_angle_bins: u32,
    maximal_distance: i32,
    half_orientation: bool,
    grid: Vec<u32>,
    angle_lookup: Arc<[AngleLookupData]>,
    diagonal_lookup: Arc<[AngleLookupData]>,
    direction_lookup: Arc<[DirectionLookupData]>,
    mirrored: bool,
}

impl Accumulator {
    /// Creates an empty accumulator for a `width x height` image.
    ///
    /// `distance_bins` is rounded up to the next odd number and `angle_bins` to the next
    /// even number. `mirrored_angle_bins` must be in `[1, angle_bins / 2)`.
    ///
    /// # Errors
    ///
    /// [`HoughError::InvalidImageSize`] for images below 3x3,
    /// [`HoughError::InvalidParameter`] for invalid bin counts and
    /// [`HoughError::AllocationFailed`] if the grid cannot be allocated.
    pub fn new(
        width: u32,
        height: u32,
        distance_bins: u32,
        angle_bins: u32,
        mirrored_angle_bins: u32,
        half_orientation: bool,
        cache: &LookupCache,
    ) -> Result<Self> {
        if width < 3 || height < 3 {
            return Err(HoughError::InvalidImageSize { width, height });
        }
        if distance_bins == 0 || angle_bins < 2 {
            return Err(HoughError::invalid_parameter(format!(
                "accumulator needs at least 1 distance bin and 2 angle bins, got {distance_bins} and {angle_bins}"
            )));
        }

        let distance_bins = distance_bins | 1;
        let angle_bins_core = angle_bins + angle_bins % 2;

        if mirrored_angle_bins == 0 || mirrored_angle_bins >= angle_bins_core / 2 {
            return Err(HoughError::invalid_parameter(format!(
                "{mirrored_angle_bins} mirrored angle bins invalid for {angle_bins_core} angle bins"
            )));
        }

        let rows = angle_bins_core as usize + 2 * mirrored_angle_bins as usize;
        let elements = rows
            .checked_mul(distance_bins as usize)
            .ok_or(HoughError::AllocationFailed { elements: usize::MAX })?;

        let mut grid = Vec::new();
        grid.try_reserve_exact(elements)
            .map_err(|_| HoughError::AllocationFailed { elements })?;
        grid.resize(elements, 0);

        let diagonal = ((width as f64).powi(2) + (height as f64).powi(2)).sqrt();

        Ok(Self {
            width,
            height,
            width_half: (width / 2) as i32,
            height_half: (height / 2) as i32,
            distance_bins,
            distance_bins_half: distance_bins / 2,
            angle_bins_core,
            mirrored_angle_bins,
            maximal_distance: (diagonal * 0.5).round() as i32,
            half_orientation,
            grid,
            angle_lookup: cache.angle_lookup(angle_bins_core, half_orientation),
            diagonal_lookup: cache.diagonal_angle_lookup(angle_bins_core, half_orientation),
            direction_lookup: cache.direction_lookup(angle_bins_core, distance_bins, half_orientation),
            mirrored: false,
        })
    }

    /// Image width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of distance bins (columns), always odd.
    pub fn distance_bins(&self) -> u32 {
        self.distance_bins
    }

    /// Number of rows including the mirrored ones.
    pub fn angle_bins(&self) -> u32 {
        self.angle_bins_core + 2 * self.mirrored_angle_bins
    }

    /// Number of core angle bins, always even.
    pub fn angle_bins_core(&self) -> u32 {
        self.angle_bins_core
    }

    pub fn mirrored_angle_bins(&self) -> u32 {
        self.mirrored_angle_bins
    }

    pub fn half_orientation_precision(&self) -> bool {
        self.half_orientation
    }

    /// Half of the image diagonal, the largest representable line distance.
    pub fn maximal_distance(&self) -> i32 {
        self.maximal_distance
    }

    /// The whole grid, row-major.
    pub fn votes(&self) -> &[u32] {
        &self.grid
    }

    /// One grid row; `full_row` counts the mirrored rows.
    pub fn row(&self, full_row: u32) -> &[u32] {
        let width = self.distance_bins as usize;
        &self.grid[full_row as usize * width..(full_row as usize + 1) * width]
    }

    /// Angle tables matching this accumulator's bins.
    pub fn angle_tables(&self) -> AngleTables {
        AngleTables {
            axis_aligned: Arc::clone(&self.angle_lookup),
            diagonal: Arc::clone(&self.diagonal_lookup),
            angle_bins: self.angle_bins_core,
            half_orientation: self.half_orientation,
        }
    }

    /// Geometry for converting bins into lines.
    pub fn geometry(&self) -> BinGeometry {
        BinGeometry {
            angle_bins_core: self.angle_bins_core,
            distance_bins: self.distance_bins,
            distance_bins_half: self.distance_bins_half,
            maximal_distance: self.maximal_distance,
            half_orientation: self.half_orientation,
        }
    }

    /// Votes for the `[h, v]` responses of pixel `(x, y)`.
    #[inline]
    pub fn accumulate(&mut self, x: u32, y: u32, responses: [i8; 2], angle_neighbors: u32) {
        self.vote::<AxisAligned>(x, y, responses, angle_neighbors);
    }

    /// Votes for the `[r45, r135]` responses of pixel `(x, y)`.
    #[inline]
    pub fn accumulate_diagonal(&mut self, x: u32, y: u32, responses: [i8; 2], angle_neighbors: u32) {
        self.vote::<Diagonal>(x, y, responses, angle_neighbors);
    }

    /// Adds `weight * (angle_neighbors + 1 - |n|)` to the bins of the response's angle
    /// shifted by `n` in `[-angle_neighbors, angle_neighbors]`.
    pub fn vote<K: ResponseKind>(&mut self, x: u32, y: u32, responses: [i8; 2], angle_neighbors: u32) {
        debug_assert!(x < self.width && y < self.height);
        debug_assert!(angle_neighbors < self.angle_bins_core);

        let entry = K::angle_table(self)[response_index(responses[0], responses[1])];
        if entry.weight == 0 {
            return;
        }

        let ring = AngleRing::new(self.angle_bins_core);
        let normalized_x = x as i64 - self.width_half as i64;
        let normalized_y = y as i64 - self.height_half as i64;
        let neighbors = angle_neighbors as i32;
        let width = self.distance_bins as usize;

        for n in -neighbors..=neighbors {
            let angle_bin = ring.offset(entry.angle_bin, n);
            let direction = self.direction_lookup[angle_bin as usize];

            let distance =
                normalized_x * direction.direction_x as i64 + normalized_y * direction.direction_y as i64;
            let distance_bin = self.distance_bin(distance);

            let local_weight = angle_neighbors + 1 - n.unsigned_abs();
            let cell = &mut self.grid[(angle_bin + self.mirrored_angle_bins) as usize * width + distance_bin];
            *cell = cell.saturating_add(local_weight * entry.weight);
        }

        self.mirrored = false;
    }

    /// Distance bin of a distance scaled by the number of distance bins, rounded half
    /// away from zero.
    #[inline]
    fn distance_bin(&self, distance: i64) -> usize {
        let maximal = self.maximal_distance.max(1) as i64;
        let rounding = if distance >= 0 { maximal } else { -maximal };
        let bin = self.distance_bins_half as i64 + (distance + rounding) / (2 * maximal);
        bin.clamp(0, self.distance_bins as i64 - 1) as usize
    }

    /// Resets all votes.
    pub fn clear(&mut self) {
        self.grid.fill(0);
        self.mirrored = false;
    }

    /// Fills the mirrored rows from the core rows on the other side of the ring.
    ///
    /// Must run after voting and joining and before peak detection.
    pub fn create_mirrored_angle_bins(&mut self) {
        let width = self.distance_bins as usize;
        let core = self.angle_bins_core as usize;
        let mirrored = self.mirrored_angle_bins as usize;
        let reversed = self.half_orientation;

        for n in 0..mirrored {
            // top row n stands for core row n - m
            let source = (core - mirrored + n + mirrored) * width;
            self.copy_row(source, n * width, width, reversed);

            // bottom row n stands for core row core + n
            let source = (n + mirrored) * width;
            self.copy_row(source, (mirrored + core + n) * width, width, reversed);
        }

        self.mirrored = true;
    }

    fn copy_row(&mut self, source: usize, target: usize, width: usize, reversed: bool) {
        self.grid.copy_within(source..source + width, target);
        if reversed {
            self.grid[target..target + width].reverse();
        }
    }

    /// Applies a small Gaussian to the whole grid.
    fn smooth(&mut self) {
        let width = self.distance_bins;
        let height = self.angle_bins();
        let values: Vec<f32> = self.grid.iter().map(|&v| v as f32).collect();

        let Some(image) = ImageBuffer::<Luma<f32>, Vec<f32>>::from_raw(width, height, values) else {
            return;
        };
        let smoothed = imageproc::filter::gaussian_blur_f32(&image, SMOOTHING_SIGMA);

        for (cell, value) in self.grid.iter_mut().zip(smoothed.as_raw()) {
            *cell = value.max(0.0).round() as u32;
        }
    }

    /// Detects all peaks with at least `vote_threshold` votes.
    ///
    /// A peak is strictly larger than its eight neighbors. The lines are returned in
    /// angle-bin order regardless of the worker.
    pub fn detect_peaks(
        &mut self,
        vote_threshold: u32,
        sub_pixel: bool,
        worker: Option<&Worker>,
        smooth: bool,
    ) -> Vec<InfiniteLine> {
        debug_assert!(self.mirrored, "mirrored angle bins must be created before peak detection");

        if smooth {
            self.smooth();
        }

        let criterion = PeakCriterion::Fixed(vote_threshold);
        self.collect_peaks(&criterion, sub_pixel, worker)
    }

    /// Detects all peaks exceeding `factor` times the mean vote of the surrounding
    /// `(2 * window_half + 1)²` window.
    ///
    /// # Errors
    ///
    /// [`HoughError::InvalidParameter`] unless `window_half` equals the number of
    /// mirrored angle bins and is at least 2.
    pub fn detect_adaptive_peaks(
        &mut self,
        factor: f64,
        window_half: u32,
        sub_pixel: bool,
        worker: Option<&Worker>,
        smooth: bool,
    ) -> Result<Vec<InfiniteLine>> {
        debug_assert!(self.mirrored, "mirrored angle bins must be created before peak detection");

        if window_half < 2 || window_half != self.mirrored_angle_bins {
            return Err(HoughError::invalid_parameter(format!(
                "adaptive window half {window_half} must match {} mirrored angle bins",
                self.mirrored_angle_bins
            )));
        }

        if smooth {
            self.smooth();
        }

        let integral = BorderedIntegral::new(&self.grid, self.distance_bins as usize, window_half as usize);
        let window = (2 * window_half + 1) as f64;
        let criterion = PeakCriterion::Adaptive {
            integral: &integral,
            normalization: factor / (window * window),
        };

        Ok(self.collect_peaks(&criterion, sub_pixel, worker))
    }

    fn collect_peaks(&self, criterion: &PeakCriterion<'_>, sub_pixel: bool, worker: Option<&Worker>) -> Vec<InfiniteLine> {
        let lines: Vec<InfiniteLine> = execute(worker, 0..self.angle_bins_core, 20, |angles| {
            self.scan_rows(angles, criterion, sub_pixel)
        })
        .into_iter()
        .flatten()
        .collect();

        debug!("{} accumulator peaks", lines.len());
        lines
    }

    fn scan_rows(&self, angles: std::ops::Range<u32>, criterion: &PeakCriterion<'_>, sub_pixel: bool) -> Vec<InfiniteLine> {
        let width = self.distance_bins as usize;
        let geometry = self.geometry();
        let mut lines = Vec::new();

        for angle in angles {
            let full_row = (angle + self.mirrored_angle_bins) as usize;
            let previous = &self.grid[(full_row - 1) * width..full_row * width];
            let current = &self.grid[full_row * width..(full_row + 1) * width];
            let next = &self.grid[(full_row + 1) * width..(full_row + 2) * width];

            for distance in 1..width - 1 {
                let vote = current[distance];

                let accepted = match criterion {
                    PeakCriterion::Fixed(threshold) => vote >= *threshold,
                    PeakCriterion::Adaptive {
                        integral,
                        normalization,
                    } => {
                        let local = (integral.window_sum(full_row, distance) as f64 * normalization) as u64;
                        vote >= 1 && vote as u64 >= local
                    }
                };
                if !accepted {
                    continue;
                }

                let neighborhood: Neighborhood = [
                    [previous[distance - 1], previous[distance], previous[distance + 1]],
                    [current[distance - 1], vote, current[distance + 1]],
                    [next[distance - 1], next[distance], next[distance + 1]],
                ];
                let is_maximum = neighborhood
                    .iter()
                    .flatten()
                    .enumerate()
                    .all(|(index, &other)| index == 4 || vote > other);
                if !is_maximum {
                    continue;
                }

                let (mut corrected_distance, mut corrected_angle) = (distance as f64, angle as f64);
                if sub_pixel {
                    if let Some((offset_distance, offset_angle)) = refine_peak(&neighborhood) {
                        corrected_distance -= offset_distance;
                        corrected_angle -= offset_angle;
                    }
                }

                lines.push(geometry.line(corrected_distance, corrected_angle, vote as f64));
            }
        }

        lines
    }

    fn check_compatible(&self, other: &Accumulator) -> Result<()> {
        if self.distance_bins != other.distance_bins
            || self.angle_bins_core != other.angle_bins_core
            || self.mirrored_angle_bins != other.mirrored_angle_bins
            || self.half_orientation != other.half_orientation
        {
            return Err(HoughError::DimensionMismatch(format!(
                "cannot join {}x{} accumulator with {}x{} accumulator",
                self.distance_bins,
                self.angle_bins(),
                other.distance_bins,
                other.angle_bins()
            )));
        }
        Ok(())
    }

    /// Adds the core rows of all accumulators to the first one.
    ///
    /// Mirrored rows are left untouched; create them afterwards. An empty or
    /// single-element slice is a no-op.
    pub fn join(accumulators: &mut [Accumulator], worker: Option<&Worker>) -> Result<()> {
        let Some((target, sources)) = accumulators.split_first_mut() else {
            return Ok(());
        };
        if sources.is_empty() {
            return Ok(());
        }
        for source in sources.iter() {
            target.check_compatible(source)?;
        }

        let width = target.distance_bins as usize;
        let core_start = target.mirrored_angle_bins as usize * width;
        let core_end = core_start + target.angle_bins_core as usize * width;
        let sources: &[Accumulator] = sources;

        for_each_row_block(worker, &mut target.grid[core_start..core_end], width, 2, |first_row, block| {
            let offset = core_start + first_row * width;
            for source in sources {
                let values = &source.grid[offset..offset + block.len()];
                for (cell, value) in block.iter_mut().zip(values) {
                    *cell = cell.saturating_add(*value);
                }
            }
        });

        target.mirrored = false;
        Ok(())
    }

    /// Joins exactly two accumulators into the first.
    pub fn join_two(accumulators: &mut [Accumulator], worker: Option<&Worker>) -> Result<()> {
        Self::join_exactly(accumulators, 2, worker)
    }

    /// Joins exactly four accumulators into the first.
    pub fn join_four(accumulators: &mut [Accumulator], worker: Option<&Worker>) -> Result<()> {
        Self::join_exactly(accumulators, 4, worker)
    }

    fn join_exactly(accumulators: &mut [Accumulator], expected: usize, worker: Option<&Worker>) -> Result<()> {
        if accumulators.len() != expected {
            return Err(HoughError::DimensionMismatch(format!(
                "expected {expected} accumulators, got {}",
                accumulators.len()
            )));
        }
        Self::join(accumulators, worker)
    }

    /// The grid scaled to 8 bits, one pixel per bin, for inspection.
    pub fn to_gray_image(&self) -> GrayImage {
        let maximum = self.grid.iter().copied().max().unwrap_or(0).max(1) as f64;
        GrayImage::from_fn(self.distance_bins, self.angle_bins(), |x, y| {
            let vote = self.grid[(y * self.distance_bins + x) as usize] as f64;
            Luma([(vote * 255.0 / maximum).round() as u8])
        })
    }
}
