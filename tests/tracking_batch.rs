use std::fs;

use camino::Utf8Path;

use spotmsd::{
    config::TrackingConfig,
    constants::TrackId,
    display::FileStatus,
    progress::NoProgress,
    spots::{spot_reader::read_spot_table, Spot},
    tracking::{batch::run_tracking_batch, DisplaySettings},
    MsdError,
};

mod common;
use common::{scratch_dir, MockTracker};

fn spot(id: u64, track: TrackId, frame: u32, quality: f64, contrast: f64) -> Spot {
    let mut spot = Spot::new(id, track, frame, 0.5 * f64::from(frame), 1.0);
    spot.features.quality = Some(quality);
    spot.features.contrast_ch1 = Some(contrast);
    spot
}

/// Two good spots on track 0 (given out of frame order), one dim spot, one low-contrast spot.
fn backend_spots() -> Vec<Spot> {
    vec![
        spot(2, TrackId::Assigned(0), 1, 8.0, 0.05),
        spot(1, TrackId::Assigned(0), 0, 8.0, 0.05),
        spot(3, TrackId::Assigned(1), 0, 0.5, 0.05),
        spot(4, TrackId::Unassigned, 1, 8.0, 0.01),
    ]
}

fn config(root: &Utf8Path) -> TrackingConfig {
    TrackingConfig {
        input_dir: root.join("images"),
        output_dir: root.join("csv"),
        ..TrackingConfig::default()
    }
}

fn touch_images(root: &Utf8Path, names: &[&str]) {
    let dir = root.join("images");
    fs::create_dir_all(&dir).unwrap();
    for name in names {
        fs::write(dir.join(name), b"").unwrap();
    }
}

#[test]
fn test_batch_exports_filtered_spots() {
    let (_tmp, root) = scratch_dir();
    touch_images(&root, &["cell1.tif", "cell2.TIFF", "notes.txt"]);
    let mut backend = MockTracker::new(backend_spots());

    let report = run_tracking_batch(&config(&root), &mut backend, &mut NoProgress).unwrap();

    assert_eq!(report.n_done(), 2);
    assert_eq!(backend.opened.len(), 2);
    assert_eq!(backend.overlays, 2);

    let exported = root.join("csv").join("cell1_allspots.csv");
    let table = read_spot_table(&exported, 3).unwrap();
    let ids: Vec<u64> = table.spots.iter().map(|s| s.spot_id).collect();
    assert_eq!(ids, vec![1, 2]);
    assert!(root.join("csv").join("cell2_allspots.csv").is_file());

    match &report.outcomes[0].status {
        FileStatus::Done(summary) => {
            assert_eq!(summary.output, exported);
            assert_eq!(summary.spots, 2);
            assert_eq!(summary.tracks, 1);
        }
        other => panic!("unexpected status {other:?}"),
    }
}

#[test]
fn test_batch_reshapes_z_stacks() {
    let (_tmp, root) = scratch_dir();
    touch_images(&root, &["a_zstack.tif", "b_movie.tif"]);
    let mut backend = MockTracker::new(backend_spots());

    run_tracking_batch(&config(&root), &mut backend, &mut NoProgress).unwrap();

    assert_eq!(backend.detected, vec![(1, 5), (1, 4)]);
}

#[test]
fn test_batch_skips_unopenable_images() {
    let (_tmp, root) = scratch_dir();
    touch_images(&root, &["a_broken.tif", "b_cell.tif"]);
    let mut backend = MockTracker::new(backend_spots());

    let report = run_tracking_batch(&config(&root), &mut backend, &mut NoProgress).unwrap();

    assert_eq!(report.n_skipped(), 1);
    assert_eq!(report.n_done(), 1);
    assert_eq!(backend.detected.len(), 1);
    assert!(!root.join("csv").join("a_broken_allspots.csv").exists());
    assert!(root.join("csv").join("b_cell_allspots.csv").is_file());
}

#[test]
fn test_batch_stops_on_backend_failure() {
    let (_tmp, root) = scratch_dir();
    touch_images(&root, &["a_cell.tif", "b_crash.tif", "c_cell.tif"]);
    let mut backend = MockTracker::new(backend_spots());

    let err = run_tracking_batch(&config(&root), &mut backend, &mut NoProgress).unwrap_err();

    assert_eq!(err, MsdError::TrackerFailure("linker diverged".into()));
    assert_eq!(backend.opened.len(), 2);
    assert!(root.join("csv").join("a_cell_allspots.csv").is_file());
    assert!(!root.join("csv").join("c_cell_allspots.csv").exists());
}

#[test]
fn test_batch_rejects_unknown_detector_first() {
    let (_tmp, root) = scratch_dir();
    touch_images(&root, &["cell.tif"]);
    let mut backend = MockTracker::new(backend_spots());
    let config = TrackingConfig {
        detector: "Hessian".into(),
        ..config(&root)
    };

    let err = run_tracking_batch(&config, &mut backend, &mut NoProgress).unwrap_err();

    assert_eq!(err, MsdError::UnsupportedDetector("Hessian".into()));
    assert!(backend.opened.is_empty());
    assert!(!root.join("csv").exists());
}

#[test]
fn test_batch_overlay_is_optional() {
    let (_tmp, root) = scratch_dir();
    touch_images(&root, &["cell.tif"]);

    let mut backend = MockTracker::new(backend_spots());
    backend.fail_overlay = true;
    let report = run_tracking_batch(&config(&root), &mut backend, &mut NoProgress).unwrap();
    assert_eq!(report.n_done(), 1);
    assert_eq!(backend.overlays, 1);

    let mut backend = MockTracker::new(backend_spots());
    let quiet = TrackingConfig {
        display: DisplaySettings {
            show_spots: false,
            show_tracks: false,
        },
        ..config(&root)
    };
    run_tracking_batch(&quiet, &mut backend, &mut NoProgress).unwrap();
    assert_eq!(backend.overlays, 0);
}

#[test]
fn test_batch_without_images() {
    let (_tmp, root) = scratch_dir();
    touch_images(&root, &["readme.md"]);
    let mut backend = MockTracker::new(backend_spots());

    let report = run_tracking_batch(&config(&root), &mut backend, &mut NoProgress).unwrap();

    assert!(report.outcomes.is_empty());
    assert!(backend.opened.is_empty());
}
