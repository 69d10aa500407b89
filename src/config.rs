//! Parameters of the Hough line detector.
//!
//! Defaults follow the values that work well for VGA-sized camera frames: 360 angle
//! bins over half a turn (about half a degree per bin), one distance bin per two pixels
//! and a duplicate filter merging lines closer than 10 pixels and 5 degrees.

use crate::error::{HoughError, Result};
use crate::response::{FilterResponse, FilterType};

/// Peak acceptance strategy of the accumulator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ThresholdMode {
    /// Global threshold; scaled internally by the maximal filter response and the
    /// angle-neighbor weighting, so `100` is a reasonable start for most images.
    Fixed { accumulator_threshold: u32 },
    /// Peaks must exceed `factor` times the mean vote of the surrounding
    /// `window x window` area of the accumulator.
    Adaptive { factor: f64, window: u32 },
}

impl ThresholdMode {
    /// Half of the adaptive window, `0` for the fixed threshold.
    pub fn window_half(&self) -> u32 {
        match *self {
            ThresholdMode::Fixed { .. } => 0,
            ThresholdMode::Adaptive { window, .. } => window / 2,
        }
    }
}

impl Default for ThresholdMode {
    fn default() -> Self {
        ThresholdMode::Fixed {
            accumulator_threshold: 100,
        }
    }
}

/// Detector-wide parameters.
#[derive(Clone, Debug)]
pub struct HoughParams {
    /// Edge filter producing the gradient response.
    pub filter_type: FilterType,
    /// Which filter directions are computed and voted with.
    pub filter_response: FilterResponse,
    /// Peak acceptance strategy.
    pub threshold: ThresholdMode,
    /// Minimal absolute filter response of a pixel to cast votes, range [0, 127].
    pub vote_threshold: u32,
    /// Number of neighboring angle bins receiving (tapered) votes on each side.
    pub angle_neighbors: u32,
    /// Refines peaks with a quadratic fit of the 3x3 vote neighborhood.
    pub sub_pixel: bool,
    /// Refines lines with a least-squares fit of nearby edge pixels.
    pub optimize_lines: bool,
    /// Extracts finite segments along every detected line.
    pub extract_finite_lines: bool,
    /// Number of angle bins.
    pub angle_precision: u32,
    /// Number of distance bins, `None` for half of the image diagonal.
    pub distance_precision: Option<u32>,
    /// Treats a line and its 180 degree rotated counterpart as the same line.
    pub half_orientation_precision: bool,
    /// Maximal distance between two lines to count as duplicates, in pixels; `0`
    /// disables the duplicate filter.
    pub similar_distance: f64,
    /// Maximal angle between two lines to count as duplicates, in radians; `0`
    /// disables the duplicate filter.
    pub similar_angle: f64,
    /// Applies a 3x3 Gaussian to the accumulator before peak detection.
    pub smooth_accumulator: bool,
}

impl Default for HoughParams {
    fn default() -> Self {
        Self {
            filter_type: FilterType::Scharr,
            filter_response: FilterResponse::HorizontalVerticalDiagonal,
            threshold: ThresholdMode::default(),
            vote_threshold: 16,
            angle_neighbors: 2,
            sub_pixel: true,
            optimize_lines: true,
            extract_finite_lines: false,
            angle_precision: 360,
            distance_precision: None,
            half_orientation_precision: true,
            similar_distance: 10.0,
            similar_angle: 5f64.to_radians(),
            smooth_accumulator: false,
        }
    }
}

impl HoughParams {
    /// Parameters using the adaptive threshold with the given ratio and window size.
    pub fn adaptive(factor: f64, window: u32) -> Self {
        Self {
            threshold: ThresholdMode::Adaptive { factor, window },
            ..Default::default()
        }
    }

    /// Checks every parameter for its valid range.
    pub fn validate(&self) -> Result<()> {
        if self.angle_precision < 2 || self.angle_precision >= 36000 {
            return Err(HoughError::invalid_parameter(format!(
                "angle precision {} outside [2, 36000)",
                self.angle_precision
            )));
        }
        if self.distance_precision == Some(0) {
            return Err(HoughError::invalid_parameter("distance precision must not be zero"));
        }
        if self.vote_threshold > 127 {
            return Err(HoughError::invalid_parameter(format!(
                "vote threshold {} exceeds the 8 bit response range",
                self.vote_threshold
            )));
        }
        if self.similar_distance.is_nan()
            || self.similar_angle.is_nan()
            || self.similar_distance < 0.0
            || self.similar_angle < 0.0
        {
            return Err(HoughError::invalid_parameter(
                "similarity thresholds must be non-negative",
            ));
        }
        match self.threshold {
            ThresholdMode::Fixed {
                accumulator_threshold,
            } => {
                if accumulator_threshold == 0 {
                    return Err(HoughError::invalid_parameter(
                        "accumulator threshold must be positive",
                    ));
                }
            }
            ThresholdMode::Adaptive { factor, window } => {
                if factor.is_nan() || factor <= 0.0 {
                    return Err(HoughError::invalid_parameter(
                        "adaptive threshold factor must be positive",
                    ));
                }
                // 3x3 is the suppression area already
                if window < 5 || window % 2 == 0 {
                    return Err(HoughError::invalid_parameter(format!(
                        "adaptive window {window} must be odd and at least 5"
                    )));
                }
                // the accumulator rounds the angle bins up to an even count
                let core_angle_bins = self.angle_precision + self.angle_precision % 2;
                if window / 2 >= core_angle_bins / 2 {
                    return Err(HoughError::invalid_parameter(format!(
                        "adaptive window {window} too large for {core_angle_bins} angle bins"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Angle neighbors actually used for voting.
    pub(crate) fn neighbor_votes(&self) -> u32 {
        self.angle_neighbors.min(self.angle_precision / 2)
    }

    /// Vote threshold of the accumulator for the fixed threshold mode.
    ///
    /// `threshold * (maximal response / 2) * center weight * (two votes for 0-90 and
    /// 45-135 responses)`.
    pub(crate) fn internal_vote_threshold(&self, accumulator_threshold: u32) -> u32 {
        const MAXIMAL_FILTER_MAGNITUDE: u32 = 128;

        let neighbors = self.neighbor_votes();
        let vote_number = match self.filter_response {
            FilterResponse::HorizontalVerticalDiagonal => 2,
            _ => 1,
        };

        accumulator_threshold
            .saturating_mul(MAXIMAL_FILTER_MAGNITUDE / 2)
            .saturating_mul(neighbors + 1)
            .saturating_mul((neighbors / 10).max(1))
            .saturating_mul(vote_number)
    }

    /// Number of mirrored angle bins the accumulator needs.
    ///
    /// One for the plain 3x3 suppression, half the window for the adaptive mode.
    pub(crate) fn mirrored_angle_bins(&self) -> u32 {
        self.threshold.window_half().max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(HoughParams::default().validate().is_ok());
        assert!(HoughParams::adaptive(8.0, 61).validate().is_ok());
    }

    #[test]
    fn rejects_even_or_tiny_windows() {
        assert!(HoughParams::adaptive(8.0, 4).validate().is_err());
        assert!(HoughParams::adaptive(8.0, 3).validate().is_err());
        assert!(HoughParams::adaptive(0.0, 7).validate().is_err());
    }

    #[test]
    fn window_limit_uses_even_angle_bins() {
        let params = |angle_precision, window| HoughParams {
            angle_precision,
            ..HoughParams::adaptive(8.0, window)
        };
        // 9 bins become 10, leaving room for 4 mirrored rows
        assert!(params(9, 9).validate().is_ok());
        assert!(params(10, 9).validate().is_ok());
        assert!(params(9, 11).validate().is_err());
        assert!(params(10, 11).validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_precision() {
        let params = HoughParams {
            angle_precision: 1,
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(HoughError::InvalidParameter(_))
        ));

        let params = HoughParams {
            distance_precision: Some(0),
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn internal_threshold_scales_with_layout() {
        let params = HoughParams {
            filter_response: FilterResponse::HorizontalVertical,
            ..Default::default()
        };
        assert_eq!(params.internal_vote_threshold(100), 100 * 64 * 3);

        let params = HoughParams::default();
        assert_eq!(params.internal_vote_threshold(100), 100 * 64 * 3 * 2);
    }

    #[test]
    fn mirrored_bins_follow_threshold_mode() {
        assert_eq!(HoughParams::default().mirrored_angle_bins(), 1);
        assert_eq!(HoughParams::adaptive(8.0, 61).mirrored_angle_bins(), 30);
    }
}
