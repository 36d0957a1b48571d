//! # Constants and type definitions for spotmsd
//!
//! This module centralizes the **file-layout constants**, **default analysis parameters**,
//! and **common type definitions** shared by the tracking export, the MSD job and the
//! merge job.
//!
//! ## Overview
//!
//! - Default batch parameters (sampling interval, overview length, tracker knobs)
//! - Directory and file naming conventions of the batch outputs
//! - Column names of the raw spot tables and of the derived MSD tables
//! - The [`TrackId`] identifier and its `-1` "unassigned" encoding
//!
//! These definitions are used by every job module, so that the on-disk conventions
//! live in exactly one place.

// -------------------------------------------------------------------------------------------------
// Default analysis parameters
// -------------------------------------------------------------------------------------------------

/// Default sampling interval between two consecutive frames, in seconds
pub const DEFAULT_TIME_INTERVAL: f64 = 0.2;

/// Number of rows per track drawn on the overview plot (lags 0..=30)
pub const OVERVIEW_LAG_POINTS: usize = 31;

/// Descriptor rows following the header line of a TrackMate spot export
pub const TRACKMATE_DESCRIPTOR_ROWS: usize = 3;

/// Decimal places used for every floating-point cell of an exported spot table
pub const SPOT_DECIMALS: usize = 3;

/// Default regex selecting derived MSD tables during a merge
pub const DEFAULT_MSD_FILE_PATTERN: &str = r"msd.*\.csv$";

// -------------------------------------------------------------------------------------------------
// Output layout
// -------------------------------------------------------------------------------------------------

/// Sub-folder receiving the derived MSD tables of a directory
pub const MSD_CSV_DIR: &str = "msd_csv";

/// Sub-folder receiving the per-track MSD plots of a directory
pub const MSD_PLOTS_DIR: &str = "msd_plots";

/// Sub-folder receiving the merged table and the overview plot
pub const MSD_MERGE_DIR: &str = "msd_merge";

/// File name of the merged MSD table inside [`MSD_MERGE_DIR`]
pub const MERGED_CSV_NAME: &str = "merged_msd_data.csv";

/// File name of the overview plot inside [`MSD_MERGE_DIR`]
pub const OVERVIEW_PNG_NAME: &str = "all_tracks_msd_first_30_intervals.png";

/// Suffix appended to the image stem for an exported spot table
pub const ALL_SPOTS_SUFFIX: &str = "_allspots.csv";

/// Suffix appended to the spot-table stem for a derived MSD table
pub const MSD_CSV_SUFFIX: &str = "_msd.csv";

/// Image extensions picked up by the tracking batch (compared case-insensitively)
pub const IMAGE_EXTENSIONS: [&str; 2] = ["tif", "tiff"];

// -------------------------------------------------------------------------------------------------
// Column names
// -------------------------------------------------------------------------------------------------

/// Header of the "all spots" table written by the tracking export
pub const ALL_SPOTS_HEADER: [&str; 13] = [
    "Track_ID",
    "Spot_ID",
    "Frame",
    "Position_X",
    "Position_Y",
    "Position_Z",
    "Radius",
    "Quality",
    "Mean_Intensity_Ch1",
    "Max_Intensity_Ch1",
    "Median_Intensity_Ch1",
    "SNR_Ch1",
    "Contrast_Ch1",
];

/// Track columns echoed into a derived MSD table built from an "all spots" table
pub const ALL_SPOTS_TRACK_COLUMNS: [&str; 4] = ["Track_ID", "Frame", "Position_X", "Position_Y"];

/// Track columns echoed into a derived MSD table built from a TrackMate export
pub const TRACKMATE_TRACK_COLUMNS: [&str; 4] =
    ["TRACK_ID", "POSITION_T", "POSITION_X", "POSITION_Y"];

/// Lag-time column of a derived MSD table (seconds)
pub const INTERVAL_COLUMN: &str = "interval";

/// MSD column of a derived MSD table (squared position units)
pub const MSD_COLUMN: &str = "msd";

/// Provenance column appended by the merge
pub const SOURCE_FILE_COLUMN: &str = "source_file";

/// Sentinel written in the track column for spots outside of any track
pub const UNASSIGNED_TRACK: i64 = -1;

// -------------------------------------------------------------------------------------------------
// Identifiers
// -------------------------------------------------------------------------------------------------

/// Identifier of a spot, as handed out by the tracking backend
pub type SpotId = u64;

/// Identifier of the track owning a spot.
///
/// On disk the identifier is a plain integer, with [`UNASSIGNED_TRACK`] (`-1`)
/// standing for spots that the linker did not attach to any track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TrackId {
    /// Spot belongs to the track with this index
    Assigned(u64),
    /// Spot was detected but not linked
    Unassigned,
}

impl TrackId {
    pub fn is_assigned(&self) -> bool {
        matches!(self, TrackId::Assigned(_))
    }
}

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackId::Assigned(id) => write!(f, "{id}"),
            TrackId::Unassigned => write!(f, "{UNASSIGNED_TRACK}"),
        }
    }
}

impl serde::Serialize for TrackId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TrackId::Assigned(id) => serializer.serialize_u64(*id),
            TrackId::Unassigned => serializer.serialize_i64(UNASSIGNED_TRACK),
        }
    }
}

impl From<u64> for TrackId {
    fn from(id: u64) -> Self {
        TrackId::Assigned(id)
    }
}

impl From<i64> for TrackId {
    /// Negative values are read as [`TrackId::Unassigned`].
    fn from(raw: i64) -> Self {
        u64::try_from(raw).map_or(TrackId::Unassigned, TrackId::Assigned)
    }
}

impl From<Option<i64>> for TrackId {
    fn from(raw: Option<i64>) -> Self {
        raw.map_or(TrackId::Unassigned, TrackId::from)
    }
}

impl std::str::FromStr for TrackId {
    type Err = std::num::ParseIntError;

    /// Parse the CSV encoding; an empty cell is an unassigned spot.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(TrackId::Unassigned);
        }
        s.parse::<i64>().map(TrackId::from)
    }
}
