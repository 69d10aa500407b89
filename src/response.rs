//! Signed 8-bit gradient responses, the input of the voting stage.
//!
//! A [`GradientResponse`] stores, per pixel, the raw signed outputs of a 3x3 edge
//! filter in two or four directions. The voting stage never looks at the image again:
//! both the angle and the weight of a vote are read from lookup tables indexed by a
//! pair of response bytes.

use image::{ImageBuffer, Pixel};

use crate::error::{HoughError, Result};
use crate::parallel::{execute, Worker};

/// Edge filter used to compute the gradient response.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FilterType {
    /// Scharr 3x3 kernels, normalized by 1/32.
    #[default]
    Scharr,
    /// Sobel 3x3 kernels, normalized by 1/8.
    Sobel,
}

/// Directions computed by the edge filter and their memory layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FilterResponse {
    /// Two channels `[h, v]`: the 0 and 90 degree responses.
    HorizontalVertical,
    /// Two channels `[r45, r135]`: the 45 and 135 degree responses.
    Diagonal,
    /// Four channels `[h, v, r45, r135]`.
    #[default]
    HorizontalVerticalDiagonal,
}

impl FilterResponse {
    /// Interleaved channels per pixel.
    pub fn channels(&self) -> usize {
        match self {
            FilterResponse::HorizontalVertical | FilterResponse::Diagonal => 2,
            FilterResponse::HorizontalVerticalDiagonal => 4,
        }
    }

    /// Channel offset of the `[h, v]` pair, if present.
    pub fn axis_aligned_offset(&self) -> Option<usize> {
        match self {
            FilterResponse::HorizontalVertical | FilterResponse::HorizontalVerticalDiagonal => Some(0),
            FilterResponse::Diagonal => None,
        }
    }

    /// Channel offset of the `[r45, r135]` pair, if present.
    pub fn diagonal_offset(&self) -> Option<usize> {
        match self {
            FilterResponse::HorizontalVertical => None,
            FilterResponse::Diagonal => Some(0),
            FilterResponse::HorizontalVerticalDiagonal => Some(2),
        }
    }
}

type Kernel = [i32; 9];

struct KernelSet {
    horizontal: Kernel,
    vertical: Kernel,
    diagonal_45: Kernel,
    diagonal_135: Kernel,
    normalization: i32,
}

const SCHARR: KernelSet = KernelSet {
    horizontal: [-3, 0, 3, -10, 0, 10, -3, 0, 3],
    vertical: [-3, -10, -3, 0, 0, 0, 3, 10, 3],
    diagonal_45: [-10, -3, 0, -3, 0, 3, 0, 3, 10],
    diagonal_135: [0, -3, -10, 3, 0, -3, 10, 3, 0],
    normalization: 32,
};

const SOBEL: KernelSet = KernelSet {
    horizontal: [-1, 0, 1, -2, 0, 2, -1, 0, 1],
    vertical: [-1, -2, -1, 0, 0, 0, 1, 2, 1],
    diagonal_45: [-2, -1, 0, -1, 0, 1, 0, 1, 2],
    diagonal_135: [0, -1, -2, 1, 0, -1, 2, 1, 0],
    normalization: 8,
};

impl FilterType {
    fn kernels(&self) -> &'static KernelSet {
        match self {
            FilterType::Scharr => &SCHARR,
            FilterType::Sobel => &SOBEL,
        }
    }
}

/// Interleaved signed filter responses of an image.
///
/// The outermost one-pixel frame is always zero.
#[derive(Clone, Debug, PartialEq)]
pub struct GradientResponse {
    width: u32,
    height: u32,
    layout: FilterResponse,
    data: Vec<i8>,
}

impl GradientResponse {
    /// Wraps precomputed responses.
    ///
    /// `data` must hold `width * height * layout.channels()` values.
    pub fn from_raw(width: u32, height: u32, layout: FilterResponse, data: Vec<i8>) -> Result<Self> {
        if width < 3 || height < 3 {
            return Err(HoughError::InvalidImageSize { width, height });
        }
        let expected = width as usize * height as usize * layout.channels();
        if data.len() != expected {
            return Err(HoughError::DimensionMismatch(format!(
                "response of {width}x{height} with {} channels needs {expected} values, got {}",
                layout.channels(),
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            layout,
            data,
        })
    }

    /// Filters an 8-bit image.
    ///
    /// Each channel of a multi-channel image is filtered separately and the channel
    /// with the largest response magnitude wins. Rows are distributed over the worker.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use hough_lines::{FilterResponse, FilterType, GradientResponse};
    ///
    /// let image = image::open("input.png").unwrap().to_rgb8();
    /// let response = GradientResponse::from_image(
    ///     &image,
    ///     FilterType::Scharr,
    ///     FilterResponse::HorizontalVertical,
    ///     None,
    /// )
    /// .unwrap();
    /// assert_eq!(response.pixel(0, 0), &[0, 0]);
    /// ```
    pub fn from_image<P>(
        image: &ImageBuffer<P, Vec<u8>>,
        filter_type: FilterType,
        layout: FilterResponse,
        worker: Option<&Worker>,
    ) -> Result<Self>
    where
        P: Pixel<Subpixel = u8>,
    {
        let (width, height) = image.dimensions();
        if width < 3 || height < 3 {
            return Err(HoughError::InvalidImageSize { width, height });
        }

        let image_channels = P::CHANNEL_COUNT as usize;
        let out_channels = layout.channels();
        let kernels = filter_type.kernels();
        let pixels = image.as_raw();
        let row_stride = width as usize * out_channels;

        debug!(
            "filtering {}x{} image with {:?} into {:?}",
            width, height, filter_type, layout
        );

        let chunks = execute(worker, 1..height - 1, 16, |rows| {
            let mut chunk = vec![0i8; rows.len() * row_stride];
            let mut responses = [0i32; 4];

            for (row_index, y) in rows.enumerate() {
                let row = &mut chunk[row_index * row_stride..(row_index + 1) * row_stride];

                for x in 1..width - 1 {
                    let mut best = [0i32; 4];
                    let mut best_magnitude = -1i64;

                    for channel in 0..image_channels {
                        let sample = |dx: u32, dy: u32| -> i32 {
                            let index = ((y + dy - 1) as usize * width as usize + (x + dx - 1) as usize)
                                * image_channels
                                + channel;
                            pixels[index] as i32
                        };
                        let correlate = |kernel: &Kernel| -> i32 {
                            let mut sum = 0;
                            for ky in 0..3 {
                                for kx in 0..3 {
                                    sum += kernel[(ky * 3 + kx) as usize] * sample(kx, ky);
                                }
                            }
                            sum / kernels.normalization
                        };

                        let count = match layout {
                            FilterResponse::HorizontalVertical => {
                                responses[0] = correlate(&kernels.horizontal);
                                responses[1] = correlate(&kernels.vertical);
                                2
                            }
                            FilterResponse::Diagonal => {
                                responses[0] = correlate(&kernels.diagonal_45);
                                responses[1] = correlate(&kernels.diagonal_135);
                                2
                            }
                            FilterResponse::HorizontalVerticalDiagonal => {
                                responses[0] = correlate(&kernels.horizontal);
                                responses[1] = correlate(&kernels.vertical);
                                responses[2] = correlate(&kernels.diagonal_45);
                                responses[3] = correlate(&kernels.diagonal_135);
                                4
                            }
                        };

                        let magnitude: i64 = responses[..count]
                            .iter()
                            .map(|&r| (r as i64) * (r as i64))
                            .sum();
                        if magnitude > best_magnitude {
                            best_magnitude = magnitude;
                            best = responses;
                        }
                    }

                    let target = &mut row[x as usize * out_channels..(x as usize + 1) * out_channels];
                    for (value, response) in target.iter_mut().zip(best.iter()) {
                        *value = (*response).clamp(i8::MIN as i32, i8::MAX as i32) as i8;
                    }
                }
            }

            chunk
        });

        let mut data = Vec::with_capacity(height as usize * row_stride);
        data.resize(row_stride, 0);
        for chunk in chunks {
            data.extend_from_slice(&chunk);
        }
        data.resize(height as usize * row_stride, 0);

        Ok(Self {
            width,
            height,
            layout,
            data,
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Channel layout.
    pub fn layout(&self) -> FilterResponse {
        self.layout
    }

    /// All responses, row-major and interleaved.
    pub fn data(&self) -> &[i8] {
        &self.data
    }

    /// Responses of one row.
    pub fn row(&self, y: u32) -> &[i8] {
        let stride = self.width as usize * self.layout.channels();
        &self.data[y as usize * stride..(y as usize + 1) * stride]
    }

    /// Responses of one pixel.
    pub fn pixel(&self, x: u32, y: u32) -> &[i8] {
        let channels = self.layout.channels();
        let index = (y as usize * self.width as usize + x as usize) * channels;
        &self.data[index..index + channels]
    }

    /// The `[h, v]` pair of a pixel, if the layout carries it.
    pub fn axis_aligned(&self, x: u32, y: u32) -> Option<[i8; 2]> {
        let offset = self.layout.axis_aligned_offset()?;
        let pixel = self.pixel(x, y);
        Some([pixel[offset], pixel[offset + 1]])
    }

    /// The `[r45, r135]` pair of a pixel, if the layout carries it.
    pub fn diagonal(&self, x: u32, y: u32) -> Option<[i8; 2]> {
        let offset = self.layout.diagonal_offset()?;
        let pixel = self.pixel(x, y);
        Some([pixel[offset], pixel[offset + 1]])
    }
}
