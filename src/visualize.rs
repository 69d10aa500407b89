use image::{ImageBuffer, Pixel, Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;
use rayon::prelude::*;

use crate::bresenham::border_intersection;
use crate::lines::{FiniteLine, InfiniteLine};

/// Draws detected lines on top of the image.
///
/// The image is converted to gray and used as background. Infinite lines are drawn
/// from border to border in green, segments in red on top of them.
///
/// # Arguments
///
/// * `image` - The image the lines were detected in
/// * `lines` - Infinite lines with origin at the image center, as returned by the detector
/// * `segments` - Finite lines in pixel coordinates
///
/// # Examples
///
/// ```rust,no_run
/// use hough_lines::{HoughParams, LineDetector, visualize_lines};
///
/// let image = image::open("input.png").unwrap().to_luma8();
/// let params = HoughParams {
///     extract_finite_lines: true,
///     ..Default::default()
/// };
/// let detection = LineDetector::new(params).unwrap().detect_lines(&image, None).unwrap();
/// let segments = detection.finite_lines.unwrap_or_default();
/// visualize_lines(&image, &detection.infinite_lines, &segments)
///     .save("lines.png")
///     .unwrap();
/// ```
pub fn visualize_lines<P>(image: &ImageBuffer<P, Vec<u8>>, lines: &[InfiniteLine], segments: &[FiniteLine]) -> RgbImage
where
    P: Pixel<Subpixel = u8>,
{
    let (width, height) = image.dimensions();
    let mut canvas = RgbImage::from_fn(width, height, |x, y| {
        let gray = image.get_pixel(x, y).to_luma()[0];
        Rgb([gray, gray, gray])
    });

    let green = Rgb([0u8, 255, 0]);
    let red = Rgb([255u8, 0, 0]);

    // clipping is independent per line, drawing is not
    let clipped: Vec<((i32, i32), (i32, i32))> = lines
        .par_iter()
        .filter_map(|line| {
            let pixel_line = line.corner_aligned_line(width, height);
            border_intersection(&pixel_line, 0, 0, width as i32 - 1, height as i32 - 1)
        })
        .collect();

    for (start, end) in clipped {
        draw_line_segment_mut(
            &mut canvas,
            (start.0 as f32, start.1 as f32),
            (end.0 as f32, end.1 as f32),
            green,
        );
    }

    for segment in segments {
        draw_line_segment_mut(
            &mut canvas,
            (segment.start.x as f32, segment.start.y as f32),
            (segment.end.x as f32, segment.end.y as f32),
            red,
        );
    }

    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use nalgebra::Point2;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn draws_lines_and_segments() {
        let image = GrayImage::from_pixel(40, 30, Luma([100]));
        // x = 25 in pixel coordinates
        let line = InfiniteLine::from_angle(0.0, 5.0, 1.0);
        let segment = FiniteLine::new(Point2::new(2.0, 10.0), Point2::new(12.0, 10.0));

        let canvas = visualize_lines(&image, &[line], &[segment]);
        assert_eq!(canvas.dimensions(), (40, 30));
        assert_eq!(*canvas.get_pixel(25, 0), Rgb([0, 255, 0]));
        assert_eq!(*canvas.get_pixel(25, 29), Rgb([0, 255, 0]));
        assert_eq!(*canvas.get_pixel(7, 10), Rgb([255, 0, 0]));
        assert_eq!(*canvas.get_pixel(7, 20), Rgb([100, 100, 100]));
    }

    #[test]
    fn lines_outside_the_image_are_skipped() {
        let image = GrayImage::from_pixel(20, 20, Luma([7]));
        let outside = InfiniteLine::from_angle(FRAC_PI_2, 50.0, 1.0);
        let canvas = visualize_lines(&image, &[outside], &[]);
        assert!(canvas.pixels().all(|p| *p == Rgb([7, 7, 7])));
    }
}
