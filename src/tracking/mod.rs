//! # Detection and tracking driver
//!
//! Spot detection and LAP linking are delegated to an external engine behind the
//! [`ParticleTracker`] trait. This module only describes *what* to ask for: which
//! detector, with which settings, which spot filters, which linking tolerances, and
//! how to display the result. The batch loop over a folder of images lives in
//! [`batch`].
//!
//! Overview
//! -----------------
//! * [`DetectorKind`] – Laplacian of Gaussian or Difference of Gaussian.
//! * [`DetectorSettings`] – sub-pixel localization, radius, channel, threshold, median filter.
//! * [`SpotFilter`] – one feature threshold; a spot is kept if it passes all filters.
//! * [`TrackerSettings`] – sparse LAP linking parameters.
//! * [`DisplaySettings`] – optional overlay of spots and tracks on the image.
//! * [`ImageStack`] – an opened image with its channel/slice/frame dimensions.
//! * [`TrackingSettings`] – everything above that is sent to the engine for one image.
//!
//! Units
//! -----------------
//! Distances and the detector radius are in the calibrated units of the image
//! (microns for the default values).
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;

use crate::{msd_errors::MsdError, spots::Spot};

pub mod batch;

/// Spot detector of the tracking engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorKind {
    /// Laplacian of Gaussian.
    Log,
    /// Difference of Gaussian.
    DoG,
}

impl FromStr for DetectorKind {
    type Err = MsdError;

    /// Parse `"Log"` or `"DoG"` (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "log" => Ok(DetectorKind::Log),
            "dog" => Ok(DetectorKind::DoG),
            _ => Err(MsdError::UnsupportedDetector(s.to_string())),
        }
    }
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectorKind::Log => write!(f, "Log"),
            DetectorKind::DoG => write!(f, "DoG"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DetectorSettings {
    pub subpixel_localization: bool,
    pub radius: f64,
    pub target_channel: u32,
    pub threshold: f64,
    pub median_filtering: bool,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        DetectorSettings {
            subpixel_localization: true,
            radius: 0.15,
            target_channel: 1,
            threshold: 1.0,
            median_filtering: true,
        }
    }
}

/// Threshold on one spot feature.
///
/// `feature` is a TrackMate key (`QUALITY`, `CONTRAST_CH1`, `POSITION_X`, …).
/// With `is_above` the spot passes when its value is strictly greater than `value`,
/// otherwise when it is strictly lower.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpotFilter {
    pub feature: String,
    pub value: f64,
    #[serde(default = "default_is_above")]
    pub is_above: bool,
}

fn default_is_above() -> bool {
    true
}

impl SpotFilter {
    pub fn new(feature: impl Into<String>, value: f64, is_above: bool) -> Self {
        SpotFilter {
            feature: feature.into(),
            value,
            is_above,
        }
    }

    /// The filters applied when none are configured: `QUALITY > 1.0` and `CONTRAST_CH1 > 0.020`.
    pub fn defaults() -> Vec<SpotFilter> {
        vec![
            SpotFilter::new("QUALITY", 1.0, true),
            SpotFilter::new("CONTRAST_CH1", 0.020, true),
        ]
    }

    /// Whether `spot` passes this filter. A spot lacking the feature does not pass.
    pub fn accepts(&self, spot: &Spot) -> bool {
        match spot.feature(&self.feature) {
            Some(v) if self.is_above => v > self.value,
            Some(v) => v < self.value,
            None => false,
        }
    }
}

/// Sparse LAP tracker parameters.
///
/// The four `*_feature_penalties` maps associate a feature key with a penalty weight
/// added to the corresponding cost matrix; they are empty by default.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrackerSettings {
    pub linking_max_distance: f64,
    pub gap_closing_max_distance: f64,
    pub splitting_max_distance: f64,
    pub merging_max_distance: f64,
    pub allow_gap_closing: bool,
    pub allow_track_splitting: bool,
    pub allow_track_merging: bool,
    pub max_frame_gap: u32,
    pub alternative_linking_cost_factor: f64,
    pub blocking_value: f64,
    pub cutoff_percentile: f64,
    pub linking_feature_penalties: BTreeMap<String, f64>,
    pub gap_closing_feature_penalties: BTreeMap<String, f64>,
    pub splitting_feature_penalties: BTreeMap<String, f64>,
    pub merging_feature_penalties: BTreeMap<String, f64>,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        TrackerSettings {
            linking_max_distance: 0.1,
            gap_closing_max_distance: 0.4,
            splitting_max_distance: 15.0,
            merging_max_distance: 0.2,
            allow_gap_closing: false,
            allow_track_splitting: false,
            allow_track_merging: false,
            max_frame_gap: 3,
            alternative_linking_cost_factor: 1.05,
            blocking_value: f64::INFINITY,
            cutoff_percentile: 0.9,
            linking_feature_penalties: BTreeMap::new(),
            gap_closing_feature_penalties: BTreeMap::new(),
            splitting_feature_penalties: BTreeMap::new(),
            merging_feature_penalties: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    pub show_spots: bool,
    pub show_tracks: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        DisplaySettings {
            show_spots: true,
            show_tracks: false,
        }
    }
}

impl DisplaySettings {
    /// Whether an overlay has anything to draw.
    pub fn any(&self) -> bool {
        self.show_spots || self.show_tracks
    }
}

/// An opened multi-dimensional image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageStack {
    pub path: Utf8PathBuf,
    pub channels: usize,
    pub slices: usize,
    pub frames: usize,
}

impl ImageStack {
    pub fn new(
        path: impl Into<Utf8PathBuf>,
        channels: usize,
        slices: usize,
        frames: usize,
    ) -> Self {
        ImageStack {
            path: path.into(),
            channels,
            slices,
            frames,
        }
    }

    /// Reinterpret a Z-stack with a single time point as a time series.
    ///
    /// When `slices > 1` and `frames == 1` the slices become frames and `true` is
    /// returned; any other shape is left untouched.
    pub fn z_stack_as_time_series(&mut self) -> bool {
        if self.slices > 1 && self.frames == 1 {
            self.frames = self.slices;
            self.slices = 1;
            true
        } else {
            false
        }
    }
}

/// Complete set of parameters sent to the engine for one image.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingSettings {
    pub detector: DetectorKind,
    pub detector_settings: DetectorSettings,
    pub spot_filters: Vec<SpotFilter>,
    pub tracker: TrackerSettings,
}

impl TrackingSettings {
    /// Whether `spot` passes every configured filter.
    pub fn accepts(&self, spot: &Spot) -> bool {
        self.spot_filters.iter().all(|f| f.accepts(spot))
    }
}

/// Detection and linking capability.
///
/// Implementations wrap an actual tracking engine. [`batch::run_tracking_batch`] calls
/// `open_image` once per file, then `detect_and_link` on the (possibly reshaped) stack,
/// then `render_overlay` when a display is requested.
pub trait ParticleTracker {
    /// Open an image file; an error means the file is skipped.
    fn open_image(&mut self, path: &Utf8Path) -> Result<ImageStack, MsdError>;

    /// Detect spots, filter them and link them into tracks.
    ///
    /// Returned spots carry their [`TrackId`](crate::constants::TrackId), or
    /// `Unassigned` when the linker left them alone. A failure aborts the batch,
    /// so the error should carry the engine's own message.
    fn detect_and_link(
        &mut self,
        image: &ImageStack,
        settings: &TrackingSettings,
    ) -> Result<Vec<Spot>, MsdError>;

    /// Draw the detected spots and tracks on top of the image.
    fn render_overlay(
        &mut self,
        _image: &ImageStack,
        _spots: &[Spot],
        _display: &DisplaySettings,
    ) -> Result<(), MsdError> {
        Ok(())
    }
}
