//! Integration tests: label a directory of mixed images on disk.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::Path;

use fissure_io::{BatchConfig, IoError, run_batch};
use fissure_pipeline::{DetectionConfig, ImageFormat, RgbImage, codec};
use tempfile::tempdir;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Light surface with a dark crack wandering across it.
fn cracked_surface() -> RgbImage {
    RgbImage::from_fn(200, 140, |x, y| {
        let centre = 70.0 + 20.0 * (f64::from(x) / 25.0).sin();
        if (f64::from(y) - centre).abs() <= 2.0 && (15..185).contains(&x) {
            image::Rgb([40, 40, 40])
        } else {
            let grain = u8::try_from((x * 5 + y * 11) % 7).unwrap();
            image::Rgb([160 + grain, 160 + grain, 160 + grain])
        }
    })
}

/// Three decodable images, one corrupt file, and some noise the batch
/// must ignore.
fn populate(dir: &Path) {
    let surface = cracked_surface();
    for (name, format) in [
        ("a_wall.png", ImageFormat::Png),
        ("b_floor.JPG", ImageFormat::Jpeg),
        ("c_beam.bmp", ImageFormat::Bmp),
    ] {
        std::fs::write(dir.join(name), codec::encode(&surface, format).unwrap()).unwrap();
    }
    std::fs::write(dir.join("d_broken.tif"), b"corrupted image bytes").unwrap();
    std::fs::write(dir.join("notes.txt"), b"inspection notes").unwrap();
    std::fs::create_dir(dir.join("archive")).unwrap();
}

#[test]
fn three_valid_and_one_corrupt_gives_three_outputs_and_one_skip() {
    init_logging();
    let dir = tempdir().unwrap();
    populate(dir.path());

    let config = BatchConfig::new(dir.path());
    let report = run_batch(&config).unwrap();

    let out = config.output_dir();
    assert_eq!(
        report.written,
        [
            out.join("a_wall.png"),
            out.join("b_floor.JPG"),
            out.join("c_beam.bmp")
        ]
    );
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].path, dir.path().join("d_broken.tif"));
    assert!(report.skipped[0].reason.contains("d_broken.tif"));
    assert!(!out.join("d_broken.tif").exists());

    for path in &report.written {
        let labeled = codec::decode_color(&std::fs::read(path).unwrap()).unwrap();
        assert_eq!(labeled.dimensions(), (200, 140));
    }
}

#[test]
fn lossless_outputs_match_in_memory_processing() {
    init_logging();
    let dir = tempdir().unwrap();
    populate(dir.path());

    let report = run_batch(&BatchConfig::new(dir.path())).unwrap();
    let expected = fissure_pipeline::process(cracked_surface(), &DetectionConfig::default())
        .unwrap()
        .image;

    for name in ["a_wall.png", "c_beam.bmp"] {
        let path = report
            .written
            .iter()
            .find(|p| p.ends_with(name))
            .expect("output written");
        let labeled = codec::decode_color(&std::fs::read(path).unwrap()).unwrap();
        assert_eq!(labeled, expected, "{name}");
        assert!(labeled.pixels().any(|p| p.0 == [255, 0, 0]));
    }
}

#[test]
fn worker_pool_produces_the_same_report() {
    init_logging();
    let sequential_dir = tempdir().unwrap();
    let pooled_dir = tempdir().unwrap();
    populate(sequential_dir.path());
    populate(pooled_dir.path());

    let sequential = run_batch(&BatchConfig::new(sequential_dir.path())).unwrap();
    let pooled = run_batch(&BatchConfig {
        jobs: Some(2),
        ..BatchConfig::new(pooled_dir.path())
    })
    .unwrap();

    let names = |paths: &[std::path::PathBuf]| -> Vec<String> {
        paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    };
    assert_eq!(names(&sequential.written), names(&pooled.written));
    assert_eq!(sequential.skipped.len(), pooled.skipped.len());

    let a = std::fs::read(&sequential.written[0]).unwrap();
    let b = std::fs::read(&pooled.written[0]).unwrap();
    assert_eq!(a, b);
}

#[test]
fn rerun_overwrites_previous_outputs() {
    init_logging();
    let dir = tempdir().unwrap();
    populate(dir.path());
    let config = BatchConfig::new(dir.path());

    let first = run_batch(&config).unwrap();
    let second = run_batch(&config).unwrap();
    assert_eq!(first, second);
}

#[test]
fn custom_output_name_and_invalid_config() {
    init_logging();
    let dir = tempdir().unwrap();
    populate(dir.path());

    let mut config = BatchConfig::new(dir.path());
    config.output_dir_name = "highlighted".to_string();
    let report = run_batch(&config).unwrap();
    assert!(report.written.iter().all(|p| p.starts_with(dir.path().join("highlighted"))));

    config.detection.stroke_width = -1.0;
    assert!(matches!(run_batch(&config), Err(IoError::Pipeline(_))));
}
