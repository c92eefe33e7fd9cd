mod common;

use common::*;
use opencv::core::Vector;
use opencv::imgcodecs;
use panel_recognition::config::{AlignmentConfig, Config, Region};
use panel_recognition::error::AlignError;
use panel_recognition::image::Image;
use panel_recognition::reader::{FrameReader, UrlReader};
use panel_recognition::{PanelAligner, ReferenceLayout};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn test_reference_loaded_from_file_builds_aligner() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("reference.png");
    let written =
        imgcodecs::imwrite(path.to_str().unwrap(), reference().mat(), &Vector::<i32>::new())
            .unwrap();
    assert!(written);

    let mut reader = UrlReader::new(format!("file://{}", path.display()), Duration::from_secs(1));
    let loaded = reader.read().unwrap();
    assert_eq!((loaded.cols(), loaded.rows()), (WIDTH, HEIGHT));

    let aligner = PanelAligner::from_reference_image(loaded, &AlignmentConfig::default()).unwrap();
    assert!(aligner.reference().keypoint_count() > 100);
    assert_eq!(aligner.canonical_size(), (WIDTH, HEIGHT));
}

#[test]
fn test_moved_frame_maps_back_onto_reference() {
    let aligner =
        PanelAligner::from_reference_image(reference(), &AlignmentConfig::default()).unwrap();
    let frame = moved(reference(), 3.0, 12.0, -8.0);

    let transform = aligner.estimate(&frame).unwrap();
    assert!(transform.confidence > 0.0 && transform.confidence <= 1.0);
    assert!(transform.inliers <= transform.matches);

    // The rotation is about the center, so the center only moves by the shift.
    let (x, y) = transform.homography.map_point(332.0, 232.0).unwrap();
    assert!((x - 320.0).abs() < 2.0, "x = {x}");
    assert!((y - 240.0).abs() < 2.0, "y = {y}");
}

#[test]
fn test_each_call_estimates_its_own_transform() {
    let aligner =
        PanelAligner::from_reference_image(reference(), &AlignmentConfig::default()).unwrap();

    let straight = aligner.estimate(&reference()).unwrap();
    let skewed = aligner.estimate(&moved(reference(), 3.0, 12.0, -8.0)).unwrap();
    let again = aligner.estimate(&reference()).unwrap();

    assert_ne!(straight.homography, skewed.homography);
    let (x, y) = again.homography.map_point(200.0, 150.0).unwrap();
    assert!((x - 200.0).abs() < 1.0 && (y - 150.0).abs() < 1.0);
}

#[test]
fn test_reference_is_shared_read_only() {
    let config = AlignmentConfig::default();
    let layout = Arc::new(ReferenceLayout::new(reference(), &config).unwrap());
    let first = PanelAligner::new(Arc::clone(&layout), &config).unwrap();
    let second = PanelAligner::new(Arc::clone(&layout), &config).unwrap();

    let handles: Vec<_> = [first, second]
        .into_iter()
        .map(|aligner| std::thread::spawn(move || aligner.align(reference()).map(|p| p.cols())))
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap().unwrap(), WIDTH);
    }
    assert_eq!(Arc::strong_count(&layout), 1);
}

#[test]
fn test_unrelated_scene_is_rejected() {
    let aligner =
        PanelAligner::from_reference_image(reference(), &AlignmentConfig::default()).unwrap();

    let err = aligner.align(uniform_frame(200.0)).unwrap_err();
    assert!(matches!(err, AlignError::NoMatch { .. }));
}

#[test]
fn test_textured_unrelated_scene_is_rejected() {
    let aligner =
        PanelAligner::from_reference_image(reference(), &AlignmentConfig::default()).unwrap();

    let err = aligner.estimate(&unrelated_scene(11)).unwrap_err();
    assert!(
        matches!(err, AlignError::NoMatch { .. } | AlignError::LowConfidence { .. }),
        "{err}"
    );
}

#[test]
fn test_panel_box_defines_canonical_frame() {
    let config = AlignmentConfig {
        panel_box: Some(Region::new(380, 200, 620, 370)),
        ..AlignmentConfig::default()
    };
    let aligner = PanelAligner::from_reference_image(reference(), &config).unwrap();

    let panel = aligner.align(moved(reference(), -2.0, -6.0, 4.0)).unwrap();
    assert_eq!((panel.cols(), panel.rows()), (240, 170));
}

#[test]
fn test_config_file_drives_pipeline() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("panel.toml");
    std::fs::write(
        &path,
        r#"
[alignment]
min_inliers = 20
panel_box = { p1 = [380, 200], p2 = [620, 370] }

[regions]
temperature = { p1 = [90, 40], p2 = [165, 130] }
display = { p1 = [20, 20], p2 = [220, 150] }
"#,
    )
    .unwrap();

    let config = Config::load_from_file(&path).unwrap();
    assert!(config.validate().is_ok());
    assert_eq!(config.alignment.min_inliers, 20);

    let ocr = ScriptedOcr::answering("24");
    let camera = camera_with(vec![reference()], ocr.clone(), &config);
    assert_eq!(camera.get_temperature().unwrap(), 24);
    assert_eq!(ocr.calls(), vec![(75, 90)]);
}
