mod common;

use common::synthetic_image::{edge_image, flat_image, rectangle_image, stripe_image};
use hough_lines::{
    detect_lines, detect_lines_with_adaptive_threshold, parallel_lines, FilterResponse, HoughError, HoughParams,
    InfiniteLine, LineDetector, ThresholdMode, Worker,
};
use image::{buffer::ConvertBuffer, RgbImage};

fn params() -> HoughParams {
    HoughParams {
        filter_response: FilterResponse::HorizontalVertical,
        ..Default::default()
    }
}

/// Angle difference in degrees and distance of `line`, expressed with the normal
/// orientation of the expected angle.
fn compare(line: &InfiniteLine, expected_degrees: f64) -> (f64, f64) {
    let expected = expected_degrees.to_radians();
    let (sin, cos) = expected.sin_cos();
    let dot = line.normal().x * cos + line.normal().y * sin;
    let (angle, distance) = if dot < 0.0 {
        (line.angle() + std::f64::consts::PI, -line.distance())
    } else {
        (line.angle(), line.distance())
    };
    let difference = (angle - expected).sin().atan2((angle - expected).cos());
    (difference.to_degrees().abs(), distance)
}

#[test]
fn single_edge_gives_one_accurate_line() {
    let image = edge_image(200, 200, 30.0, 20.0);
    let detection = detect_lines(&image, &params(), None).unwrap();

    assert_eq!(
        detection.infinite_lines.len(),
        1,
        "expected exactly one line, got {:?}",
        detection.infinite_lines
    );
    let (angle_error, distance) = compare(&detection.infinite_lines[0], 30.0);
    assert!(angle_error < 2.0, "angle error {angle_error:.3} deg");
    assert!((distance - 20.0).abs() < 2.0, "distance {distance:.3}");
    assert!(detection.finite_lines.is_none());
}

#[test]
fn empty_image_gives_no_lines() {
    let image = flat_image(120, 90);
    let detection = detect_lines(&image, &params(), None).unwrap();
    assert!(detection.infinite_lines.is_empty());

    let detection = detect_lines_with_adaptive_threshold(&image, &params(), 8.0, 61, None).unwrap();
    assert!(detection.infinite_lines.is_empty());
}

#[test]
fn stripe_gives_two_parallel_lines() {
    let image = stripe_image(200, 200, 30.0, 5.0, 35.0);
    let detection = detect_lines(&image, &params(), None).unwrap();

    let lines = &detection.infinite_lines;
    assert_eq!(lines.len(), 2, "expected two lines, got {lines:?}");

    let (angle_a, distance_a) = compare(&lines[0], 30.0);
    let (angle_b, distance_b) = compare(&lines[1], 30.0);
    assert!(angle_a < 2.0 && angle_b < 2.0);

    let angle_between = lines[0].normal().dot(&lines[1].normal()).abs().min(1.0).acos().to_degrees();
    assert!(angle_between < 1.0, "angle between lines {angle_between:.3} deg");
    assert!(((distance_a - distance_b).abs() - 30.0).abs() < 2.0);

    let groups = parallel_lines(lines, 2f64.to_radians(), 0, true);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].len(), 2);
}

#[test]
fn adaptive_threshold_finds_the_edge() {
    let image = edge_image(200, 200, -50.0, -15.0);
    let detection = detect_lines_with_adaptive_threshold(&image, &params(), 8.0, 31, None).unwrap();

    let strongest = detection
        .infinite_lines
        .iter()
        .max_by(|a, b| a.strength().total_cmp(&b.strength()))
        .expect("at least one line");
    let (angle_error, distance) = compare(strongest, -50.0);
    assert!(angle_error < 2.0, "angle error {angle_error:.3} deg");
    assert!((distance + 15.0).abs() < 2.0, "distance {distance:.3}");
}

#[test]
fn result_does_not_depend_on_the_worker() {
    let image = rectangle_image(160, 120, 30, 25, 130, 100);
    let params = HoughParams {
        extract_finite_lines: true,
        threshold: ThresholdMode::Fixed {
            accumulator_threshold: 40,
        },
        ..Default::default()
    };
    let detector = LineDetector::new(params).unwrap();

    let single = detector.detect_lines(&image, None).unwrap();
    for threads in [2, 3, 8] {
        let worker = Worker::new(threads).unwrap();
        let parallel = detector.detect_lines(&image, Some(&worker)).unwrap();
        assert_eq!(single, parallel, "{threads} threads");
    }
    assert!(!single.infinite_lines.is_empty());
}

#[test]
fn rectangle_sides_become_segments() {
    // every side lies on an odd/even pixel pair, so its two response rows share one
    // distance bin
    let image = rectangle_image(200, 200, 29, 39, 170, 160);
    let params = HoughParams {
        extract_finite_lines: true,
        threshold: ThresholdMode::Fixed {
            accumulator_threshold: 50,
        },
        ..params()
    };
    let detection = detect_lines(&image, &params, None).unwrap();

    // edges half way between the last dark and the first bright pixel, image center origin
    for (angle, expected) in [(90.0, -61.5), (90.0, 59.5), (0.0, -71.5), (0.0, 69.5)] {
        let found = detection.infinite_lines.iter().any(|line| {
            let (angle_error, distance) = compare(line, angle);
            angle_error < 2.0 && (distance - expected).abs() < 2.0
        });
        assert!(
            found,
            "no line at {angle} deg, distance {expected} in {:?}",
            detection.infinite_lines
        );
    }

    let segments = detection.finite_lines.expect("segments requested");
    let top = segments.iter().find(|segment| {
        (segment.start.y - 38.5).abs() <= 2.0 && (segment.end.y - 38.5).abs() <= 2.0 && segment.length() >= 100.0
    });
    let top = top.unwrap_or_else(|| panic!("no segment along the top side in {segments:?}"));
    let (left, right) = (top.start.x.min(top.end.x), top.start.x.max(top.end.x));
    assert!(left >= 24.0 && right <= 175.0, "segment from {left} to {right}");

    for segment in &segments {
        for point in [segment.start, segment.end] {
            assert!(point.x >= 0.0 && point.x < 200.0 && point.y >= 0.0 && point.y < 200.0);
        }
    }
}

#[test]
fn color_images_match_gray() {
    let gray = edge_image(120, 100, 75.0, -10.0);
    let color: RgbImage = gray.convert();
    let detector = LineDetector::new(params()).unwrap();
    assert_eq!(
        detector.detect_lines(&gray, None).unwrap(),
        detector.detect_lines(&color, None).unwrap()
    );
}

#[test]
fn configuration_errors_surface_from_entry_points() {
    let image = edge_image(64, 64, 0.0, 0.0);

    let even_window = detect_lines_with_adaptive_threshold(&image, &params(), 8.0, 10, None);
    assert!(matches!(even_window, Err(HoughError::InvalidParameter(_))));

    let no_distance_bins = HoughParams {
        distance_precision: Some(0),
        ..params()
    };
    assert!(matches!(
        detect_lines(&image, &no_distance_bins, None),
        Err(HoughError::InvalidParameter(_))
    ));

    let tiny = flat_image(2, 5);
    assert!(matches!(
        detect_lines(&tiny, &params(), None),
        Err(HoughError::InvalidImageSize { width: 2, height: 5 })
    ));
}
