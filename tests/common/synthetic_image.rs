use image::{GrayImage, Luma};

/// Full 8-bit step; saturates the Scharr response.
const DARK: f64 = 0.0;
const CONTRAST: f64 = 255.0;

/// Coverage of a pixel by the half plane `normal · (p - center) >= distance`, with a
/// one pixel wide linear ramp.
fn coverage(x: u32, y: u32, width: u32, height: u32, angle_degrees: f64, distance: f64) -> f64 {
    let (sin, cos) = angle_degrees.to_radians().sin_cos();
    let px = x as f64 - (width / 2) as f64;
    let py = y as f64 - (height / 2) as f64;
    (0.5 + cos * px + sin * py - distance).clamp(0.0, 1.0)
}

/// Anti-aliased straight edge; the bright side is the one the normal points to.
///
/// The edge satisfies `normal · (p - center) = distance` with the center at
/// `(width / 2, height / 2)` and the normal at `angle_degrees`.
pub fn edge_image(width: u32, height: u32, angle_degrees: f64, distance: f64) -> GrayImage {
    assert!(width > 0 && height > 0, "image dimensions must be positive");
    GrayImage::from_fn(width, height, |x, y| {
        let value = DARK + CONTRAST * coverage(x, y, width, height, angle_degrees, distance);
        Luma([value.round() as u8])
    })
}

/// Bright anti-aliased stripe between the distances `near` and `far` (`near < far`).
pub fn stripe_image(width: u32, height: u32, angle_degrees: f64, near: f64, far: f64) -> GrayImage {
    assert!(near < far, "stripe needs near < far");
    GrayImage::from_fn(width, height, |x, y| {
        let inside = coverage(x, y, width, height, angle_degrees, near)
            - coverage(x, y, width, height, angle_degrees, far);
        Luma([(DARK + CONTRAST * inside).round() as u8])
    })
}

/// Bright axis-aligned rectangle `[left, right) x [top, bottom)` on a dark background.
pub fn rectangle_image(width: u32, height: u32, left: u32, top: u32, right: u32, bottom: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        let inside = x >= left && x < right && y >= top && y < bottom;
        Luma([if inside { (DARK + CONTRAST) as u8 } else { DARK as u8 }])
    })
}

/// Uniform image without any edge.
pub fn flat_image(width: u32, height: u32) -> GrayImage {
    GrayImage::from_pixel(width, height, Luma([DARK as u8]))
}
