use std::time::Instant;

use env_logger::Builder;
use image::open;
use log::info;
use hough_lines::{parallel_lines, sort_lines_by_strength, visualize_lines, HoughParams, LineDetector, Worker};

fn main() {
    Builder::from_default_env().format_timestamp_nanos().init();

    let img = open("test_image/lines.png").unwrap().to_rgb8();

    let worker = Worker::new(0).unwrap();
    let params = HoughParams {
        extract_finite_lines: true,
        ..Default::default()
    };
    let detector = LineDetector::new(params).unwrap();

    info!("start detection");

    let instance = Instant::now();
    let detection = detector.detect_lines(&img, Some(&worker)).unwrap();
    let elapsed = instance.elapsed();
    info!("detection took {elapsed:?}");

    let mut lines = detection.infinite_lines;
    sort_lines_by_strength(&mut lines);
    for line in lines.iter().take(10) {
        info!(
            "angle {:7.2} deg, distance {:8.2} px, strength {}",
            line.angle().to_degrees(),
            line.distance(),
            line.strength()
        );
    }

    let groups = parallel_lines(&lines, 2f64.to_radians(), 3, true);
    info!("{} groups of at least 3 parallel lines", groups.len());

    let segments = detection.finite_lines.unwrap_or_default();
    let result = visualize_lines(&img, &lines, &segments);
    result.save("test_image/lines_detected.png").unwrap();

    info!("found {} lines and {} segments", lines.len(), segments.len());
}
