//! # Configuration
//!
//! Two layers of configuration are exposed:
//!
//! * [`MsdParams`] – validated numerical parameters of the MSD computation, built with
//!   [`MsdParamsBuilder`].
//! * [`PipelineConfig`] – every knob of the three batch jobs, read from a TOML file.
//!   Every field has a default, so an empty file (or no file at all) reproduces the
//!   stock batch behaviour.
//!
//! File layout
//! -----------------
//! ```toml
//! [tracking]
//! input_dir = "images"
//! output_dir = "csv"
//! detector = "Log"
//!
//! [[tracking.spot_filters]]
//! feature = "QUALITY"
//! value = 1.0
//! is_above = true
//!
//! [tracking.tracker]
//! linking_max_distance = 0.1
//!
//! [msd]
//! working_dir = "csv"
//! time_interval = 0.2
//! non_finite = "reject"
//!
//! [merge]
//! base_dir = "."
//! x_limit = [0.0, 6.0]
//! y_limit = [0.0, 0.5]
//!
//! [plot]
//! width = 1200
//! height = 800
//! ```
use std::cmp::Ordering::Greater;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;

use crate::{
    constants::{
        DEFAULT_MSD_FILE_PATTERN, DEFAULT_TIME_INTERVAL, OVERVIEW_LAG_POINTS,
        TRACKMATE_DESCRIPTOR_ROWS,
    },
    msd_errors::MsdError,
    tracking::{
        DetectorKind, DetectorSettings, DisplaySettings, SpotFilter, TrackerSettings,
        TrackingSettings,
    },
};

/// Treatment of a missing or non-finite X/Y coordinate inside a track.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NonFinitePolicy {
    /// The whole file fails with [`MsdError::NonFinitePosition`].
    #[default]
    Reject,
    /// The offending track is left out of the output, with a warning.
    SkipTrack,
    /// The value flows through the arithmetic; affected lags become `NaN`.
    Propagate,
}

/// Parameters of the MSD computation.
///
/// Fields
/// -----------------
/// * `time_interval` – Time between two consecutive samples of a track, in seconds.
/// * `non_finite` – See [`NonFinitePolicy`].
/// * `include_unassigned` – Treat spots outside of any track (`Track_ID = -1`) as one
///   extra track. Off by default: they are not a trajectory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MsdParams {
    pub time_interval: f64,
    pub non_finite: NonFinitePolicy,
    pub include_unassigned: bool,
}

impl Default for MsdParams {
    fn default() -> Self {
        MsdParams {
            time_interval: DEFAULT_TIME_INTERVAL,
            non_finite: NonFinitePolicy::Reject,
            include_unassigned: false,
        }
    }
}

impl MsdParams {
    pub fn builder() -> MsdParamsBuilder {
        MsdParamsBuilder::new()
    }
}

/// Builder for [`MsdParams`].
#[derive(Debug, Clone)]
pub struct MsdParamsBuilder {
    params: MsdParams,
}

impl Default for MsdParamsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MsdParamsBuilder {
    /// Create a new builder initialized with default values.
    pub fn new() -> Self {
        Self {
            params: MsdParams::default(),
        }
    }

    pub fn time_interval(mut self, v: f64) -> Self {
        self.params.time_interval = v;
        self
    }

    pub fn non_finite(mut self, v: NonFinitePolicy) -> Self {
        self.params.non_finite = v;
        self
    }

    pub fn include_unassigned(mut self, v: bool) -> Self {
        self.params.include_unassigned = v;
        self
    }

    /// Return true iff x > 0.0 and comparable (i.e., not NaN).
    #[inline]
    fn gt0(x: f64) -> bool {
        x.partial_cmp(&0.0) == Some(Greater)
    }

    /// Finalize the builder.
    ///
    /// Errors
    /// -----------------
    /// * [`MsdError::InvalidParameter`] if `time_interval` is not a finite, strictly
    ///   positive number.
    pub fn build(self) -> Result<MsdParams, MsdError> {
        let p = self.params;
        if !Self::gt0(p.time_interval) || !p.time_interval.is_finite() {
            return Err(MsdError::InvalidParameter(format!(
                "time_interval must be finite and > 0, got {}",
                p.time_interval
            )));
        }
        Ok(p)
    }
}

// -------------------------------------------------------------------------------------------------
// Pipeline configuration file
// -------------------------------------------------------------------------------------------------

/// Inputs and engine parameters of the tracking job.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub input_dir: Utf8PathBuf,
    pub output_dir: Utf8PathBuf,
    pub detector: String,
    pub detector_settings: DetectorSettings,
    pub spot_filters: Vec<SpotFilter>,
    pub tracker: TrackerSettings,
    pub display: DisplaySettings,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        TrackingConfig {
            input_dir: Utf8PathBuf::from("images"),
            output_dir: Utf8PathBuf::from("csv"),
            detector: DetectorKind::Log.to_string(),
            detector_settings: DetectorSettings::default(),
            spot_filters: SpotFilter::defaults(),
            tracker: TrackerSettings::default(),
            display: DisplaySettings::default(),
        }
    }
}

impl TrackingConfig {
    /// Resolve the detector name and assemble the per-image engine settings.
    ///
    /// Fails with [`MsdError::UnsupportedDetector`] for an unknown detector name.
    pub fn settings(&self) -> Result<TrackingSettings, MsdError> {
        Ok(TrackingSettings {
            detector: self.detector.parse()?,
            detector_settings: self.detector_settings.clone(),
            spot_filters: self.spot_filters.clone(),
            tracker: self.tracker.clone(),
        })
    }
}

/// Inputs and parameters of the MSD job.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MsdJobConfig {
    pub working_dir: Utf8PathBuf,
    pub time_interval: f64,
    pub non_finite: NonFinitePolicy,
    pub include_unassigned: bool,
    pub trackmate_descriptor_rows: usize,
    pub render_plots: bool,
}

impl Default for MsdJobConfig {
    fn default() -> Self {
        MsdJobConfig {
            working_dir: Utf8PathBuf::from("."),
            time_interval: DEFAULT_TIME_INTERVAL,
            non_finite: NonFinitePolicy::default(),
            include_unassigned: false,
            trackmate_descriptor_rows: TRACKMATE_DESCRIPTOR_ROWS,
            render_plots: true,
        }
    }
}

impl MsdJobConfig {
    /// Validated MSD parameters of this job.
    pub fn msd_params(&self) -> Result<MsdParams, MsdError> {
        MsdParams::builder()
            .time_interval(self.time_interval)
            .non_finite(self.non_finite)
            .include_unassigned(self.include_unassigned)
            .build()
    }
}

/// Inputs and parameters of the merge job.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MergeJobConfig {
    pub base_dir: Utf8PathBuf,
    pub file_pattern: String,
    pub x_limit: Option<(f64, f64)>,
    pub y_limit: Option<(f64, f64)>,
    pub overview_points: usize,
    pub render_plots: bool,
}

impl Default for MergeJobConfig {
    fn default() -> Self {
        MergeJobConfig {
            base_dir: Utf8PathBuf::from("."),
            file_pattern: DEFAULT_MSD_FILE_PATTERN.to_string(),
            x_limit: None,
            y_limit: None,
            overview_points: OVERVIEW_LAG_POINTS,
            render_plots: true,
        }
    }
}

/// Canvas size of the rendered plots, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PlotConfig {
    pub width: u32,
    pub height: u32,
    pub overview_width: u32,
    pub overview_height: u32,
}

impl Default for PlotConfig {
    fn default() -> Self {
        PlotConfig {
            width: 1000,
            height: 600,
            overview_width: 1800,
            overview_height: 1200,
        }
    }
}

/// Full configuration of the three batch jobs.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub tracking: TrackingConfig,
    pub msd: MsdJobConfig,
    pub merge: MergeJobConfig,
    pub plot: PlotConfig,
}

impl PipelineConfig {
    /// Parse a configuration from TOML text and validate it.
    pub fn from_toml_str(text: &str) -> Result<Self, MsdError> {
        let config: PipelineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a TOML configuration file.
    pub fn from_toml_file(path: &Utf8Path) -> Result<Self, MsdError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Check the values that cannot be expressed by the types alone.
    pub fn validate(&self) -> Result<(), MsdError> {
        self.msd.msd_params()?;
        if self.merge.overview_points == 0 {
            return Err(MsdError::InvalidParameter(
                "merge.overview_points must be at least 1".into(),
            ));
        }
        let limits = [("x_limit", self.merge.x_limit), ("y_limit", self.merge.y_limit)];
        for (name, limit) in limits {
            if let Some((lo, hi)) = limit {
                if !(lo.is_finite() && hi.is_finite() && lo < hi) {
                    return Err(MsdError::InvalidParameter(format!(
                        "merge.{name} must be finite and increasing, got ({lo}, {hi})"
                    )));
                }
            }
        }
        if self.plot.width == 0
            || self.plot.height == 0
            || self.plot.overview_width == 0
            || self.plot.overview_height == 0
        {
            return Err(MsdError::InvalidParameter(
                "plot sizes must be non-zero".into(),
            ));
        }
        Ok(())
    }
}
