//! The complete line detection pipeline.

use std::sync::Arc;

use image::{ImageBuffer, Pixel};

use crate::config::{HoughParams, ThresholdMode};
use crate::error::{HoughError, Result};
use crate::filter::filter_lines;
use crate::lines::{FiniteLine, InfiniteLine};
use crate::lookup::LookupCache;
use crate::optimize::{optimize_infinite_lines, DEFAULT_RADIUS};
use crate::parallel::Worker;
use crate::response::GradientResponse;
use crate::segments::detect_all_finite_lines;
use crate::votes::{accumulate_parallel, AccumulatorLayout};

/// Result of one detection.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LineDetection {
    /// Detected lines, origin at the image center, in accumulator angle-bin order.
    pub infinite_lines: Vec<InfiniteLine>,
    /// Segments along the lines in pixel coordinates, if requested.
    pub finite_lines: Option<Vec<FiniteLine>>,
}

/// A configured line detector.
///
/// The detector owns its parameters and shares lookup tables through a
/// [`LookupCache`]; keep one detector around for a video stream so the tables are
/// built only once.
///
/// # Examples
///
/// ```rust,no_run
/// use hough_lines::{HoughParams, LineDetector};
///
/// let detector = LineDetector::new(HoughParams::default()).unwrap();
/// for path in ["frame_0.png", "frame_1.png"] {
///     let image = image::open(path).unwrap().to_luma8();
///     let detection = detector.detect_lines(&image, None).unwrap();
///     for line in &detection.infinite_lines {
///         println!("angle {:.3} distance {:.1}", line.angle(), line.distance());
///     }
/// }
/// ```
#[derive(Clone, Debug)]
pub struct LineDetector {
    params: HoughParams,
    cache: Arc<LookupCache>,
}

impl LineDetector {
    /// Creates a detector with a private lookup cache.
    ///
    /// # Errors
    ///
    /// [`HoughError::InvalidParameter`] if `params` fails validation.
    pub fn new(params: HoughParams) -> Result<Self> {
        Self::with_cache(params, Arc::new(LookupCache::new()))
    }

    /// Creates a detector sharing `cache` with other detectors.
    pub fn with_cache(params: HoughParams, cache: Arc<LookupCache>) -> Result<Self> {
        params.validate()?;
        Ok(Self { params, cache })
    }

    pub fn params(&self) -> &HoughParams {
        &self.params
    }

    pub fn cache(&self) -> &Arc<LookupCache> {
        &self.cache
    }

    /// Detects lines in an 8-bit image with any number of channels.
    ///
    /// # Arguments
    ///
    /// * `image` - Input image, at least 3x3 pixels
    /// * `worker` - Optional thread pool; `None` runs everything on the calling thread
    ///
    /// # Returns
    ///
    /// The detected lines. An image without edges gives an empty result, not an error.
    ///
    /// # Errors
    ///
    /// [`HoughError::InvalidImageSize`] for images below 3x3 and
    /// [`HoughError::AllocationFailed`] if the accumulator cannot be allocated.
    pub fn detect_lines<P>(&self, image: &ImageBuffer<P, Vec<u8>>, worker: Option<&Worker>) -> Result<LineDetection>
    where
        P: Pixel<Subpixel = u8>,
    {
        let response = GradientResponse::from_image(image, self.params.filter_type, self.params.filter_response, worker)?;
        self.detect_lines_in_response(&response, worker)
    }

    /// Runs the pipeline on a precomputed gradient response.
    ///
    /// The response layout must match `params.filter_response`.
    pub fn detect_lines_in_response(&self, response: &GradientResponse, worker: Option<&Worker>) -> Result<LineDetection> {
        let params = &self.params;
        let (width, height) = (response.width(), response.height());

        if response.layout() != params.filter_response {
            return Err(HoughError::DimensionMismatch(format!(
                "response layout {:?} differs from configured {:?}",
                response.layout(),
                params.filter_response
            )));
        }

        let layout = AccumulatorLayout {
            distance_bins: params
                .distance_precision
                .unwrap_or_else(|| default_distance_bins(width, height)),
            angle_bins: params.angle_precision,
            mirrored_angle_bins: params.mirrored_angle_bins(),
            half_orientation: params.half_orientation_precision,
        };
        debug!("detecting lines in {}x{} response with {:?}", width, height, layout);

        let mut accumulator = accumulate_parallel(
            response,
            &layout,
            params.neighbor_votes(),
            params.vote_threshold,
            &self.cache,
            worker,
        )?;
        accumulator.create_mirrored_angle_bins();

        let mut lines = match params.threshold {
            ThresholdMode::Fixed {
                accumulator_threshold,
            } => accumulator.detect_peaks(
                params.internal_vote_threshold(accumulator_threshold),
                params.sub_pixel,
                worker,
                params.smooth_accumulator,
            ),
            ThresholdMode::Adaptive { factor, window } => accumulator.detect_adaptive_peaks(
                factor,
                window / 2,
                params.sub_pixel,
                worker,
                params.smooth_accumulator,
            )?,
        };

        let tables = accumulator.angle_tables();

        if params.optimize_lines && !lines.is_empty() {
            lines = optimize_infinite_lines(&lines, response, &tables, DEFAULT_RADIUS, worker);
        }

        if params.similar_distance > 0.0 && params.similar_angle > 0.0 {
            lines = filter_lines(
                &lines,
                params.similar_distance,
                params.similar_angle,
                params.half_orientation_precision,
            );
            debug!("{} lines after duplicate filter", lines.len());
        }

        let finite_lines = params
            .extract_finite_lines
            .then(|| detect_all_finite_lines(&lines, response, &tables, worker));

        Ok(LineDetection {
            infinite_lines: lines,
            finite_lines,
        })
    }
}

/// One distance bin per two pixels of the image diagonal.
fn default_distance_bins(width: u32, height: u32) -> u32 {
    let diagonal = ((width as f64).powi(2) + (height as f64).powi(2)).sqrt() as u32;
    (diagonal / 2).max(1)
}

/// Detects lines with a one-off detector.
///
/// Lookup tables are rebuilt on every call; use [`LineDetector`] for repeated
/// detections.
///
/// # Examples
///
/// ```rust,no_run
/// use hough_lines::{detect_lines, HoughParams};
///
/// let image = image::open("input.png").unwrap().to_rgb8();
/// let params = HoughParams {
///     extract_finite_lines: true,
///     ..Default::default()
/// };
/// let detection = detect_lines(&image, &params, None).unwrap();
/// println!("{} segments", detection.finite_lines.unwrap_or_default().len());
/// ```
pub fn detect_lines<P>(image: &ImageBuffer<P, Vec<u8>>, params: &HoughParams, worker: Option<&Worker>) -> Result<LineDetection>
where
    P: Pixel<Subpixel = u8>,
{
    LineDetector::new(params.clone())?.detect_lines(image, worker)
}

/// Detects lines with the adaptive threshold, overriding `params.threshold`.
///
/// # Arguments
///
/// * `factor` - Ratio a peak must exceed the mean vote of its surrounding, e.g. `8.0`
/// * `window` - Odd size of the surrounding in bins, at least 5, e.g. `61`
pub fn detect_lines_with_adaptive_threshold<P>(
    image: &ImageBuffer<P, Vec<u8>>,
    params: &HoughParams,
    factor: f64,
    window: u32,
    worker: Option<&Worker>,
) -> Result<LineDetection>
where
    P: Pixel<Subpixel = u8>,
{
    let params = HoughParams {
        threshold: ThresholdMode::Adaptive { factor, window },
        ..params.clone()
    };
    detect_lines(image, &params, worker)
}
