// tests/batch.rs — end-to-end runs of the batch driver on scratch directories.

use std::path::Path;
use std::time::Duration;

use image::{GrayImage, Luma, Rgb, RgbImage};
use jfeature_extraction::{run_batch, BatchConfig, DescriptorKind, ExtractError};
use tempfile::TempDir;

fn write_rgb(dir: &Path, name: &str, size: u32, seed: u8) {
    let img = RgbImage::from_fn(size, size, |x, y| {
        Rgb([seed.wrapping_add(x as u8), seed.wrapping_mul(3).wrapping_add(y as u8), seed])
    });
    img.save(dir.join(name)).unwrap();
}

fn write_gray(dir: &Path, name: &str, img: &GrayImage) {
    img.save(dir.join(name)).unwrap();
}

fn scratch_with_images(count: u8) -> TempDir {
    let scratch = tempfile::tempdir().unwrap();
    std::fs::create_dir(scratch.path().join("images")).unwrap();
    for i in 0..count {
        write_rgb(&scratch.path().join("images"), &format!("img_{}.png", i), 12, i * 20 + 1);
    }
    scratch
}

fn config(scratch: &TempDir, descriptor: DescriptorKind) -> BatchConfig {
    BatchConfig::builder(descriptor)
        .directory(scratch.path().join("images"))
        .output(scratch.path().join("out.csv"))
        .threads(Some(3))
        .build()
}

fn lines(scratch: &TempDir) -> Vec<String> {
    std::fs::read_to_string(scratch.path().join("out.csv"))
        .unwrap()
        .lines()
        .map(|l| l.to_string())
        .collect()
}

#[test]
fn writes_one_header_and_one_row_per_image() {
    let scratch = scratch_with_images(5);
    let summary = run_batch(&config(&scratch, DescriptorKind::Moments)).unwrap();

    assert_eq!(summary.files, 5);
    assert_eq!(summary.processed, 5);
    assert_eq!(summary.rows, 5);

    let lines = lines(&scratch);
    assert_eq!(lines.len(), 6);
    assert_eq!(lines[0], "filename, 0, 1, 2, 3");
    for row in &lines[1..] {
        let cells = row.split(", ").collect::<Vec<_>>();
        assert_eq!(cells.len(), 5);
        assert!(cells[0].starts_with("img_") && cells[0].ends_with(".png"));
    }
}

#[test]
fn histogram_rows_have_fixed_width() {
    let scratch = scratch_with_images(3);
    let mut config = config(&scratch, DescriptorKind::RgbHistogram);
    config.descriptor_args = vec![8.0];
    run_batch(&config).unwrap();

    let lines = lines(&scratch);
    assert_eq!(lines.len(), 4);
    for row in &lines[1..] {
        let values = row.split(", ").skip(1).map(|v| v.parse::<f64>().unwrap()).collect::<Vec<_>>();
        assert_eq!(values.len(), 24);
        for channel in values.chunks(8) {
            assert_eq!(channel.iter().sum::<f64>(), 144.0);
        }
    }
}

#[test]
fn append_inserts_one_blank_line_and_no_header() {
    let scratch = scratch_with_images(2);
    run_batch(&config(&scratch, DescriptorKind::Moments)).unwrap();

    let mut append = config(&scratch, DescriptorKind::Moments);
    append.append = true;
    run_batch(&append).unwrap();

    let lines = lines(&scratch);
    assert_eq!(lines.len(), 3 + 1 + 2);
    assert_eq!(lines[3], "");
    assert_eq!(lines.iter().filter(|l| l.starts_with("filename")).count(), 1);
    assert_eq!(lines.iter().filter(|l| l.is_empty()).count(), 1);
}

#[test]
fn overwrite_replaces_previous_content() {
    let scratch = scratch_with_images(2);
    std::fs::write(scratch.path().join("out.csv"), "old, content\n").unwrap();
    run_batch(&config(&scratch, DescriptorKind::Moments)).unwrap();

    let lines = lines(&scratch);
    assert_eq!(lines.len(), 3);
    assert!(!lines.iter().any(|l| l.starts_with("old")));
}

#[test]
fn corrupt_file_is_skipped() {
    let scratch = scratch_with_images(4);
    std::fs::write(scratch.path().join("images/broken.png"), b"definitely not a png").unwrap();

    let summary = run_batch(&config(&scratch, DescriptorKind::Moments)).unwrap();
    assert_eq!(summary.files, 5);
    assert_eq!(summary.processed, 4);
    assert_eq!(summary.skipped, 1);

    let lines = lines(&scratch);
    assert_eq!(lines.len(), 1 + 4);
    assert!(!lines.iter().any(|l| l.contains("broken.png")));
}

#[test]
fn class_label_and_omitted_header() {
    let scratch = scratch_with_images(2);
    let mut config = config(&scratch, DescriptorKind::Moments);
    config.class_label = Some("flowers".to_string());
    config.omit_header = true;
    run_batch(&config).unwrap();

    let lines = lines(&scratch);
    assert_eq!(lines.len(), 2);
    assert!(lines.iter().all(|l| l.starts_with("flowers, img_")));
}

#[test]
fn labelled_header() {
    let scratch = scratch_with_images(1);
    let mut config = config(&scratch, DescriptorKind::Moments);
    config.labels = true;
    config.class_label = Some("c1".to_string());
    run_batch(&config).unwrap();

    assert_eq!(lines(&scratch)[0], "class, filename, mean, std_dev, skewness, kurtosis");
}

#[test]
fn degenerate_centroid_is_skipped() {
    let scratch = tempfile::tempdir().unwrap();
    let images = scratch.path().join("images");
    std::fs::create_dir(&images).unwrap();
    write_gray(&images, "empty.png", &GrayImage::new(10, 10));
    let mut dot = GrayImage::new(10, 10);
    dot.put_pixel(3, 6, Luma([200]));
    write_gray(&images, "dot.png", &dot);

    let summary = run_batch(&config(&scratch, DescriptorKind::Centroid)).unwrap();
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(lines(&scratch), vec!["filename, 0, 1", "dot.png, 3, 6"]);
}

#[test]
fn corner_detector_writes_one_row_per_point() {
    let scratch = tempfile::tempdir().unwrap();
    let images = scratch.path().join("images");
    std::fs::create_dir(&images).unwrap();
    let quadrant = GrayImage::from_fn(16, 16, |x, y| Luma([if x >= 8 && y >= 8 { 255 } else { 0 }]));
    write_gray(&images, "corner.png", &quadrant);
    write_gray(&images, "flat.png", &GrayImage::from_pixel(16, 16, Luma([90])));

    let mut config = config(&scratch, DescriptorKind::TrajkovicHedley);
    config.descriptor_args = vec![1.0, 500.0, 500.0, 1.0];
    let summary = run_batch(&config).unwrap();

    assert_eq!(summary.rows, 1);
    assert_eq!(lines(&scratch), vec!["filename, 0, 1", "corner.png, 8, 8"]);
}

#[test]
fn recursive_descent() {
    let scratch = scratch_with_images(1);
    let nested = scratch.path().join("images/nested");
    std::fs::create_dir(&nested).unwrap();
    write_rgb(&nested, "deep.png", 8, 7);

    let flat = run_batch(&config(&scratch, DescriptorKind::Moments)).unwrap();
    assert_eq!(flat.files, 1);

    let mut deep = config(&scratch, DescriptorKind::Moments);
    deep.recursive = true;
    let deep = run_batch(&deep).unwrap();
    assert_eq!(deep.files, 2);
    assert_eq!(deep.rows, 2);
}

#[test]
fn invalid_configuration_fails_before_work() {
    let scratch = scratch_with_images(1);
    let mut config = config(&scratch, DescriptorKind::Moments);
    config.directory = scratch.path().join("missing");
    assert!(matches!(run_batch(&config), Err(ExtractError::Configuration(_))));

    let mut config = self::config(&scratch, DescriptorKind::Moments);
    config.class_label = Some("bad label".to_string());
    assert!(matches!(run_batch(&config), Err(ExtractError::Configuration(_))));
}

#[test]
fn shutdown_timeout_is_fatal() {
    let scratch = tempfile::tempdir().unwrap();
    let images = scratch.path().join("images");
    std::fs::create_dir(&images).unwrap();
    for i in 0..4 {
        write_rgb(&images, &format!("big_{}.png", i), 512, i);
    }

    let mut config = config(&scratch, DescriptorKind::RgbHistogram);
    config.threads = Some(1);
    config.shutdown_timeout = Duration::ZERO;
    assert!(matches!(run_batch(&config), Err(ExtractError::Shutdown(_))));
}
