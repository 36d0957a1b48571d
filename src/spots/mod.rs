//! # Spots: detected particle positions
//!
//! A [`Spot`] is a single detected particle at one frame, as produced by the tracking
//! backend and stored in a raw spot table. Spots are immutable once exported; the
//! MSD job only reads them back, groups them per track and re-sorts them by time.
//!
//! Modules
//! -----------------
//! * [`spot_reader`] – Reads raw spot tables in either the "all spots" layout written by
//!   this crate or the native TrackMate spot export.
//! * [`spot_writer`] – Writes the "all spots" table from a tracking result.
//!
//! Missing values
//! -----------------
//! Every numeric attribute except the spot identifier is optional: the backend may not
//! compute a feature, and on disk an absent value is an empty cell. Positions are kept
//! optional as well so that the MSD caller can decide how to treat them
//! (see [`NonFinitePolicy`](crate::config::NonFinitePolicy)).
use nalgebra::Vector2;

use crate::constants::{SpotId, TrackId};

pub mod spot_reader;
pub mod spot_writer;

/// Optional scalar features attached to a spot.
///
/// The names follow the TrackMate feature keys (`RADIUS`, `QUALITY`,
/// `MEAN_INTENSITY_CH1`, …); channel-dependent features are for channel 1.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpotFeatures {
    pub radius: Option<f64>,
    pub quality: Option<f64>,
    pub mean_intensity_ch1: Option<f64>,
    pub max_intensity_ch1: Option<f64>,
    pub median_intensity_ch1: Option<f64>,
    pub snr_ch1: Option<f64>,
    pub contrast_ch1: Option<f64>,
}

impl SpotFeatures {
    /// Look a feature up by its TrackMate key (case-insensitive).
    ///
    /// Positions and the frame index are also reachable by key, so that spot filters
    /// can use any exported column. Unknown keys return `None`.
    pub fn by_key(&self, key: &str) -> Option<f64> {
        match key.to_ascii_uppercase().as_str() {
            "RADIUS" => self.radius,
            "QUALITY" => self.quality,
            "MEAN_INTENSITY_CH1" => self.mean_intensity_ch1,
            "MAX_INTENSITY_CH1" => self.max_intensity_ch1,
            "MEDIAN_INTENSITY_CH1" => self.median_intensity_ch1,
            "SNR_CH1" => self.snr_ch1,
            "CONTRAST_CH1" => self.contrast_ch1,
            _ => None,
        }
    }
}

/// A detected particle at one frame.
///
/// Fields
/// -----------------
/// * `spot_id` – Identifier assigned by the tracking backend.
/// * `track_id` – Owning track, or [`TrackId::Unassigned`].
/// * `frame` – Frame index, when known.
/// * `time` – Physical time (`POSITION_T`), only present in TrackMate exports.
/// * `x`, `y`, `z` – Position in calibrated units.
/// * `features` – Optional scalar features.
#[derive(Debug, Clone, PartialEq)]
pub struct Spot {
    pub spot_id: SpotId,
    pub track_id: TrackId,
    pub frame: Option<u32>,
    pub time: Option<f64>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
    pub features: SpotFeatures,
}

impl Spot {
    /// Create a spot with a position and no optional feature.
    pub fn new(spot_id: SpotId, track_id: TrackId, frame: u32, x: f64, y: f64) -> Self {
        Spot {
            spot_id,
            track_id,
            frame: Some(frame),
            time: None,
            x: Some(x),
            y: Some(y),
            z: Some(0.0),
            features: SpotFeatures::default(),
        }
    }

    /// Key used to order the spots of a track.
    ///
    /// The physical time is preferred when the table carries it, the frame index
    /// otherwise. `None` when neither is known.
    pub fn time_key(&self) -> Option<f64> {
        self.time.or(self.frame.map(f64::from))
    }

    /// Planar position used by the MSD estimator; missing coordinates become `NaN`.
    pub fn xy(&self) -> Vector2<f64> {
        Vector2::new(self.x.unwrap_or(f64::NAN), self.y.unwrap_or(f64::NAN))
    }

    /// Value of a filterable attribute by TrackMate key.
    pub fn feature(&self, key: &str) -> Option<f64> {
        match key.to_ascii_uppercase().as_str() {
            "POSITION_X" => self.x,
            "POSITION_Y" => self.y,
            "POSITION_Z" => self.z,
            "POSITION_T" => self.time,
            "FRAME" => self.frame.map(f64::from),
            other => self.features.by_key(other),
        }
    }
}
