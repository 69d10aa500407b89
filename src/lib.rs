//! # Hough Line Detection Library
//!
//! This crate detects straight lines in 8-bit images with a generalized Hough
//! transform. Every stage of the pipeline can be distributed over a rayon thread pool
//! and the result does not depend on the number of threads.
//!
//! ## Features
//!
//! - Scharr and Sobel gradient responses in two or four directions
//! - Table driven voting with tapered angle neighbors
//! - Circular angle axis with mirrored accumulator rows
//! - Fixed and adaptive (local mean) peak thresholds
//! - Sub-pixel peak refinement from the vote neighborhood
//! - Least-squares line refinement on nearby edge pixels
//! - Finite segment extraction along detected lines
//! - Duplicate removal and parallel line grouping
//! - Line visualization utilities
//! - Optional debug logging (enable with `logger` feature)
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use image::open;
//! use hough_lines::{HoughParams, LineDetector, visualize_lines};
//!
//! let image = open("example.png").unwrap().to_luma8();
//! let detector = LineDetector::new(HoughParams::default()).unwrap();
//! let detection = detector.detect_lines(&image, None).unwrap();
//!
//! let result = visualize_lines(&image, &detection.infinite_lines, &[]);
//! result.save("lines_output.png").unwrap();
//!
//! println!("Found {} lines", detection.infinite_lines.len());
//! ```
//!
//! ## Coordinates
//!
//! Infinite lines use the image center as origin: a point `p` lies on the line if
//! `normal · p == distance`. [`InfiniteLine::corner_aligned_line`] moves the origin to
//! the top-left pixel. Finite lines are given in pixel coordinates.
//!
//! ## Optional Features
//!
//! ### Logger Feature
//!
//! Enable debug logging to monitor the detection pipeline:
//!
//! ```toml
//! [dependencies]
//! hough-lines = { version = "0.1.0", features = ["logger"] }
//! log = "0.4"
//! env_logger = "0.11"
//! ```
//!
//! ```rust,no_run
//! use image::open;
//! use hough_lines::{HoughParams, LineDetector};
//!
//! env_logger::init();
//!
//! let image = open("example.png").unwrap().to_luma8();
//! let detector = LineDetector::new(HoughParams::default()).unwrap();
//! let detection = detector.detect_lines(&image, None).unwrap();
//! // With logger feature, you'll see debug messages like:
//! // DEBUG hough_lines::detector: detecting lines in 640x480 response with ...
//! // DEBUG hough_lines::accumulator: 12 accumulator peaks
//! // DEBUG hough_lines::detector: 9 lines after duplicate filter
//! ```
//!
//! ## Advanced Usage
//!
//! ```rust,no_run
//! use image::open;
//! use hough_lines::{parallel_lines, FilterResponse, HoughParams, LineDetector, Worker};
//!
//! let image = open("facade.png").unwrap().to_rgb8();
//! let worker = Worker::new(0).unwrap();
//!
//! // adaptive threshold for images with uneven contrast
//! let params = HoughParams {
//!     filter_response: FilterResponse::HorizontalVertical,
//!     extract_finite_lines: true,
//!     ..HoughParams::adaptive(8.0, 61)
//! };
//! let detector = LineDetector::new(params).unwrap();
//! let detection = detector.detect_lines(&image, Some(&worker)).unwrap();
//!
//! // groups of lines sharing a vanishing direction
//! let groups = parallel_lines(&detection.infinite_lines, 2f64.to_radians(), 3, true);
//! println!("{} parallel groups", groups.len());
//! ```

// Conditional logging macros
#[cfg(feature = "logger")]
macro_rules! debug {
    ($($arg:tt)*) => {
        log::debug!($($arg)*);
    };
}

#[cfg(not(feature = "logger"))]
macro_rules! debug {
    ($($arg:tt)*) => {};
}

pub mod accumulator;
pub mod bins;
pub mod bresenham;
pub mod config;
pub mod detector;
pub mod error;
pub mod filter;
pub mod integral;
pub mod lines;
pub mod lookup;
pub mod optimize;
pub mod parallel;
pub mod peaks;
pub mod response;
pub mod segments;
pub mod votes;

mod visualize;

pub use accumulator::{Accumulator, AxisAligned, Diagonal, ResponseKind};
pub use config::{HoughParams, ThresholdMode};
pub use detector::{detect_lines, detect_lines_with_adaptive_threshold, LineDetection, LineDetector};
pub use error::{HoughError, Result};
pub use filter::{
    dominant_parallel_lines, filter_lines, parallel_lines, sort_groups_descending, sort_lines_by_distance,
    sort_lines_by_strength,
};
pub use lines::{FiniteLine, InfiniteLine};
pub use lookup::{AngleLookupData, AngleTables, DirectionLookupData, LookupCache};
pub use parallel::Worker;
pub use response::{FilterResponse, FilterType, GradientResponse};
pub use visualize::visualize_lines;
