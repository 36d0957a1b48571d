//! # Raw spot table reader
//!
//! Reads a per-image spot table into [`Spot`]s. Two on-disk layouts are understood and
//! told apart from the header line:
//!
//! * [`SpotTableLayout::AllSpots`] – the table written by
//!   [`write_all_spots`](crate::spots::spot_writer::write_all_spots)
//!   (`Track_ID, Spot_ID, Frame, Position_X, …`).
//! * [`SpotTableLayout::TrackMate`] – TrackMate's own spot export
//!   (`TRACK_ID, ID, FRAME, POSITION_T, POSITION_X, …`), whose header is followed by
//!   descriptor rows (feature long name, short name, unit) that carry no data.
//!
//! Columns not used by the crate are ignored. Empty cells are missing values.
//! In the TrackMate layout unparseable cells are read as missing as well, because the
//! export writes free text in some columns; the "all spots" layout is strict.
use std::fs::File;
use std::io::Read;

use camino::Utf8Path;
use csv::StringRecord;
use serde::Deserialize;

use crate::{
    constants::{SpotId, TrackId, ALL_SPOTS_TRACK_COLUMNS, TRACKMATE_TRACK_COLUMNS},
    msd_errors::MsdError,
    spots::{Spot, SpotFeatures},
};

/// On-disk layout of a raw spot table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpotTableLayout {
    AllSpots,
    TrackMate,
}

impl SpotTableLayout {
    /// Detect the layout from a header record, `None` if neither matches.
    pub fn detect(headers: &StringRecord) -> Option<Self> {
        let has = |name: &str| headers.iter().any(|h| h.trim() == name);

        if has("Track_ID") && has("Position_X") && has("Position_Y") {
            Some(SpotTableLayout::AllSpots)
        } else if has("TRACK_ID") && has("POSITION_X") && has("POSITION_Y") {
            Some(SpotTableLayout::TrackMate)
        } else {
            None
        }
    }

    /// Names of the track columns echoed into a derived MSD table.
    pub fn track_columns(&self) -> [&'static str; 4] {
        match self {
            SpotTableLayout::AllSpots => ALL_SPOTS_TRACK_COLUMNS,
            SpotTableLayout::TrackMate => TRACKMATE_TRACK_COLUMNS,
        }
    }
}

/// The spots of one table, with the layout they were read from.
#[derive(Debug, Clone)]
pub struct SpotTable {
    pub layout: SpotTableLayout,
    pub spots: Vec<Spot>,
}

#[derive(Debug, Deserialize)]
struct AllSpotsRecord {
    #[serde(rename = "Track_ID")]
    track_id: Option<i64>,
    #[serde(rename = "Spot_ID")]
    spot_id: SpotId,
    #[serde(rename = "Frame")]
    frame: Option<f64>,
    #[serde(rename = "Position_X")]
    x: Option<f64>,
    #[serde(rename = "Position_Y")]
    y: Option<f64>,
    #[serde(rename = "Position_Z", default)]
    z: Option<f64>,
    #[serde(rename = "Radius", default)]
    radius: Option<f64>,
    #[serde(rename = "Quality", default)]
    quality: Option<f64>,
    #[serde(rename = "Mean_Intensity_Ch1", default)]
    mean_intensity_ch1: Option<f64>,
    #[serde(rename = "Max_Intensity_Ch1", default)]
    max_intensity_ch1: Option<f64>,
    #[serde(rename = "Median_Intensity_Ch1", default)]
    median_intensity_ch1: Option<f64>,
    #[serde(rename = "SNR_Ch1", default)]
    snr_ch1: Option<f64>,
    #[serde(rename = "Contrast_Ch1", default)]
    contrast_ch1: Option<f64>,
}

impl From<AllSpotsRecord> for Spot {
    fn from(r: AllSpotsRecord) -> Self {
        Spot {
            spot_id: r.spot_id,
            track_id: TrackId::from(r.track_id),
            frame: r.frame.and_then(frame_from_raw),
            time: None,
            x: r.x,
            y: r.y,
            z: r.z,
            features: SpotFeatures {
                radius: r.radius,
                quality: r.quality,
                mean_intensity_ch1: r.mean_intensity_ch1,
                max_intensity_ch1: r.max_intensity_ch1,
                median_intensity_ch1: r.median_intensity_ch1,
                snr_ch1: r.snr_ch1,
                contrast_ch1: r.contrast_ch1,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct TrackMateRecord {
    #[serde(rename = "TRACK_ID", default, deserialize_with = "csv::invalid_option")]
    track_id: Option<i64>,
    #[serde(rename = "ID", default, deserialize_with = "csv::invalid_option")]
    spot_id: Option<SpotId>,
    #[serde(rename = "FRAME", default, deserialize_with = "csv::invalid_option")]
    frame: Option<f64>,
    #[serde(rename = "POSITION_T", default, deserialize_with = "csv::invalid_option")]
    time: Option<f64>,
    #[serde(rename = "POSITION_X", default, deserialize_with = "csv::invalid_option")]
    x: Option<f64>,
    #[serde(rename = "POSITION_Y", default, deserialize_with = "csv::invalid_option")]
    y: Option<f64>,
    #[serde(rename = "POSITION_Z", default, deserialize_with = "csv::invalid_option")]
    z: Option<f64>,
    #[serde(rename = "RADIUS", default, deserialize_with = "csv::invalid_option")]
    radius: Option<f64>,
    #[serde(rename = "QUALITY", default, deserialize_with = "csv::invalid_option")]
    quality: Option<f64>,
    #[serde(
        rename = "MEAN_INTENSITY_CH1",
        default,
        deserialize_with = "csv::invalid_option"
    )]
    mean_intensity_ch1: Option<f64>,
    #[serde(
        rename = "MAX_INTENSITY_CH1",
        default,
        deserialize_with = "csv::invalid_option"
    )]
    max_intensity_ch1: Option<f64>,
    #[serde(
        rename = "MEDIAN_INTENSITY_CH1",
        default,
        deserialize_with = "csv::invalid_option"
    )]
    median_intensity_ch1: Option<f64>,
    #[serde(rename = "SNR_CH1", default, deserialize_with = "csv::invalid_option")]
    snr_ch1: Option<f64>,
    #[serde(rename = "CONTRAST_CH1", default, deserialize_with = "csv::invalid_option")]
    contrast_ch1: Option<f64>,
}

impl TrackMateRecord {
    fn into_spot(self, row: usize) -> Spot {
        Spot {
            // TrackMate always exports the ID column; fall back to the row index otherwise.
            spot_id: self.spot_id.unwrap_or(row as SpotId),
            track_id: TrackId::from(self.track_id),
            frame: self.frame.and_then(frame_from_raw),
            time: self.time,
            x: self.x,
            y: self.y,
            z: self.z,
            features: SpotFeatures {
                radius: self.radius,
                quality: self.quality,
                mean_intensity_ch1: self.mean_intensity_ch1,
                max_intensity_ch1: self.max_intensity_ch1,
                median_intensity_ch1: self.median_intensity_ch1,
                snr_ch1: self.snr_ch1,
                contrast_ch1: self.contrast_ch1,
            },
        }
    }
}

/// Round a raw frame value to an index; negative or non-finite values are missing.
fn frame_from_raw(raw: f64) -> Option<u32> {
    let rounded = raw.round();
    if rounded.is_finite() && rounded >= 0.0 && rounded <= f64::from(u32::MAX) {
        Some(rounded as u32)
    } else {
        None
    }
}

/// Read a raw spot table from disk.
///
/// Arguments
/// -----------------
/// * `path` – CSV file in either supported layout.
/// * `descriptor_rows` – Number of rows following the header that are skipped in the
///   TrackMate layout (TrackMate writes three). Ignored for the "all spots" layout.
///
/// Return
/// ----------
/// * The parsed [`SpotTable`], or an [`MsdError`] on I/O failure, unknown header, or
///   an invalid cell in the "all spots" layout.
pub fn read_spot_table(path: &Utf8Path, descriptor_rows: usize) -> Result<SpotTable, MsdError> {
    let file = File::open(path)?;
    read_spot_table_from_reader(file, path.as_str(), descriptor_rows)
}

/// Read a raw spot table from any reader; `source` names it in error messages.
pub fn read_spot_table_from_reader<R: Read>(
    reader: R,
    source: &str,
    descriptor_rows: usize,
) -> Result<SpotTable, MsdError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let layout = SpotTableLayout::detect(&headers)
        .ok_or_else(|| MsdError::UnknownSpotTableLayout(source.to_string()))?;

    let mut spots = Vec::new();
    for (row, record) in csv_reader.records().enumerate() {
        let record = record?;
        let spot = match layout {
            SpotTableLayout::AllSpots => record
                .deserialize::<AllSpotsRecord>(Some(&headers))?
                .into(),
            SpotTableLayout::TrackMate => {
                if row < descriptor_rows {
                    continue;
                }
                record
                    .deserialize::<TrackMateRecord>(Some(&headers))?
                    .into_spot(row - descriptor_rows)
            }
        };
        spots.push(spot);
    }

    Ok(SpotTable { layout, spots })
}
