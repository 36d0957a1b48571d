#![allow(dead_code)]

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;

use spotmsd::{
    constants::TrackId,
    msd::msd_table::TrackCurve,
    spots::Spot,
    tracking::{DisplaySettings, ImageStack, ParticleTracker, TrackingSettings},
    MsdError,
};

/// Path of a file shipped in `tests/data`.
pub fn data_path(name: &str) -> Utf8PathBuf {
    Utf8PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Fresh scratch folder; keep the `TempDir` alive for as long as the path is used.
pub fn scratch_dir() -> (TempDir, Utf8PathBuf) {
    let tmp = tempfile::tempdir().expect("failed to create a temporary folder");
    let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf())
        .expect("temporary folder path is not UTF-8");
    (tmp, root)
}

/// Copy a fixture from `tests/data` into `dest_dir`, creating the folder if needed.
pub fn copy_fixture(name: &str, dest_dir: &Utf8Path) -> Utf8PathBuf {
    fs::create_dir_all(dest_dir).expect("failed to create the fixture folder");
    let dest = dest_dir.join(name);
    fs::copy(data_path(name), &dest).expect("failed to copy the fixture");
    dest
}

/// Curve of one track, panicking when the track is absent.
pub fn curve_of(curves: &[TrackCurve], track: u64) -> &TrackCurve {
    curves
        .iter()
        .find(|c| c.track_id == TrackId::Assigned(track))
        .unwrap_or_else(|| panic!("track {track} not found"))
}

/// Scripted tracking engine.
///
/// * images whose name contains `broken` cannot be opened,
/// * images whose name contains `zstack` are opened as 1 channel × 5 slices × 1 frame,
/// * images whose name contains `crash` make detection fail,
/// * every other image yields the spots of [`MockTracker::spots`].
#[derive(Debug, Default)]
pub struct MockTracker {
    pub spots: Vec<Spot>,
    pub opened: Vec<Utf8PathBuf>,
    /// Image geometry seen by `detect_and_link`, as `(slices, frames)`.
    pub detected: Vec<(usize, usize)>,
    pub overlays: usize,
    pub fail_overlay: bool,
}

impl MockTracker {
    pub fn new(spots: Vec<Spot>) -> Self {
        MockTracker {
            spots,
            ..Default::default()
        }
    }
}

impl ParticleTracker for MockTracker {
    fn open_image(&mut self, path: &Utf8Path) -> Result<ImageStack, MsdError> {
        self.opened.push(path.to_path_buf());
        let name = path.file_name().unwrap_or_default();
        if name.contains("broken") {
            return Err(MsdError::ImageOpenError(path.to_string()));
        }
        if name.contains("zstack") {
            return Ok(ImageStack::new(path, 1, 5, 1));
        }
        Ok(ImageStack::new(path, 1, 1, 4))
    }

    fn detect_and_link(
        &mut self,
        image: &ImageStack,
        _settings: &TrackingSettings,
    ) -> Result<Vec<Spot>, MsdError> {
        self.detected.push((image.slices, image.frames));
        if image.path.file_name().is_some_and(|n| n.contains("crash")) {
            return Err(MsdError::TrackerFailure("linker diverged".into()));
        }
        Ok(self.spots.clone())
    }

    fn render_overlay(
        &mut self,
        _image: &ImageStack,
        _spots: &[Spot],
        _display: &DisplaySettings,
    ) -> Result<(), MsdError> {
        self.overlays += 1;
        if self.fail_overlay {
            return Err(MsdError::TrackerFailure("no display".into()));
        }
        Ok(())
    }
}
