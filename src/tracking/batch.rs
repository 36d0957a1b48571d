//! Batch tracking over a folder of images.
//!
//! Every `.tif` / `.tiff` file directly inside the input folder (extension compared
//! case-insensitively, files taken in name order) goes through the same steps:
//!
//! 1. open the image with the backend; a file that cannot be opened is skipped,
//! 2. reinterpret a Z-stack with a single time point as a time series,
//! 3. detect, filter and link spots,
//! 4. draw the overlay when the display settings ask for one,
//! 5. export every kept spot to `<output_dir>/<stem>_allspots.csv`.
//!
//! An unsupported detector name stops the batch before the first file, and a
//! detection or linking failure stops it at the failing file.
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use log::{info, warn};

use crate::{
    config::TrackingConfig,
    constants::{ALL_SPOTS_SUFFIX, IMAGE_EXTENSIONS},
    display::{BatchReport, FileSummary},
    msd_errors::MsdError,
    progress::ProgressHook,
    spots::{spot_writer::write_all_spots, Spot},
    tracking::{ParticleTracker, TrackingSettings},
    trajectories::{track_set::TrackSetExt, TrackSet},
};

fn is_image(path: &Utf8Path) -> bool {
    path.extension().is_some_and(|ext| {
        IMAGE_EXTENSIONS
            .iter()
            .any(|known| ext.eq_ignore_ascii_case(known))
    })
}

/// Image files directly inside `dir`, sorted by path.
pub fn list_images(dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>, MsdError> {
    let mut images = Vec::new();
    for entry in dir.read_dir_utf8()? {
        let entry = entry?;
        if entry.file_type()?.is_file() && is_image(entry.path()) {
            images.push(entry.path().to_path_buf());
        }
    }
    images.sort();
    Ok(images)
}

/// Name of the spot table exported for an image: `<stem>_allspots.csv`.
pub fn all_spots_name(image: &Utf8Path) -> String {
    let stem = image.file_stem().unwrap_or("image");
    format!("{stem}{ALL_SPOTS_SUFFIX}")
}

/// Run detection and linking on every image of `config.input_dir`.
///
/// Arguments
/// -----------------
/// * `config` – Folders, detector name and engine parameters.
/// * `backend` – The tracking engine.
/// * `progress` – Receives one step per image.
///
/// Return
/// ----------
/// * A [`BatchReport`] with one entry per image: exported or skipped.
///
/// Errors
/// ----------
/// * [`MsdError::UnsupportedDetector`] before any file is touched.
/// * [`MsdError::TrackerFailure`] when the engine fails on an image.
/// * I/O errors on the folders or while writing a spot table.
pub fn run_tracking_batch(
    config: &TrackingConfig,
    backend: &mut dyn ParticleTracker,
    progress: &mut dyn ProgressHook,
) -> Result<BatchReport, MsdError> {
    let settings = config.settings()?;
    fs::create_dir_all(&config.output_dir)?;

    let images = list_images(&config.input_dir)?;
    let mut report = BatchReport::new("tracking");
    if images.is_empty() {
        warn!("No .tif/.tiff image found in {}", config.input_dir);
        return Ok(report);
    }

    progress.start("tracking", images.len());
    for image_path in &images {
        info!("Processing: {image_path}");
        if let Err(err) = track_one(config, &settings, backend, image_path, &mut report) {
            progress.finish();
            return Err(err);
        }
        progress.step();
    }
    progress.finish();
    Ok(report)
}

fn track_one(
    config: &TrackingConfig,
    settings: &TrackingSettings,
    backend: &mut dyn ParticleTracker,
    image_path: &Utf8Path,
    report: &mut BatchReport,
) -> Result<(), MsdError> {
    let mut image = match backend.open_image(image_path) {
        Ok(image) => image,
        Err(err) => {
            warn!("Failed to open: {image_path} ({err})");
            report.skipped(image_path, format!("failed to open: {err}"));
            return Ok(());
        }
    };

    if image.z_stack_as_time_series() {
        info!("Z>1 and T=1 detected. Converting Z-stack to time series ({} frames)", image.frames);
    }

    let spots: Vec<Spot> = backend
        .detect_and_link(&image, settings)
        .map_err(|err| match err {
            MsdError::TrackerFailure(_) => err,
            other => MsdError::TrackerFailure(other.to_string()),
        })?
        .into_iter()
        .filter(|spot| settings.accepts(spot))
        .collect();
    info!("Total spots after filtering: {}", spots.len());

    if config.display.any() {
        if let Err(err) = backend.render_overlay(&image, &spots, &config.display) {
            warn!("Overlay rendering failed for {image_path}: {err}");
        }
    }

    let output = config.output_dir.join(all_spots_name(image_path));
    let rows = write_all_spots(&output, &spots)?;
    info!("Spots exported: {output}");

    let tracks = TrackSet::from_spots(spots, false);
    report.done(
        image_path,
        FileSummary {
            output,
            tracks: tracks.number_of_tracks(),
            spots: rows,
            curves: 0,
            rows,
            length_stats: tracks.length_stats(),
        },
    );
    Ok(())
}

#[cfg(test)]
mod batch_test {
    use super::*;

    #[test]
    fn test_is_image() {
        assert!(is_image(Utf8Path::new("a/cell.tif")));
        assert!(is_image(Utf8Path::new("a/cell.TIFF")));
        assert!(!is_image(Utf8Path::new("a/cell.png")));
        assert!(!is_image(Utf8Path::new("a/tif")));
    }

    #[test]
    fn test_all_spots_name() {
        assert_eq!(all_spots_name(Utf8Path::new("in/cell 1.tif")), "cell 1_allspots.csv");
    }
}
