//! Error type shared by every stage of the detector.

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, HoughError>;

/// Failures surfaced by the line detector.
///
/// Numerical degeneracies (singular Hessians, non-convergent line fits) are never
/// reported here; they fall back to the unrefined value instead.
#[derive(Debug, thiserror::Error)]
pub enum HoughError {
    /// The image (or response) is too small to be filtered with a 3x3 kernel.
    #[error("invalid image size {width}x{height}, need at least 3x3")]
    InvalidImageSize { width: u32, height: u32 },

    /// A detector parameter is outside of its valid range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The vote grid could not be allocated.
    #[error("failed to allocate accumulator with {elements} bins")]
    AllocationFailed { elements: usize },

    /// Accumulators or responses with different layouts were combined.
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// The worker thread pool could not be created.
    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl HoughError {
    pub(crate) fn invalid_parameter(message: impl Into<String>) -> Self {
        HoughError::InvalidParameter(message.into())
    }
}
