//! Writer for the "all spots" table exported after tracking.
//!
//! Every spot returned by the backend is written, assigned or not, in frame order.
//! Floating-point cells use a fixed three-decimal format, missing values are empty
//! cells, frames are written as integers and unassigned spots carry `-1` as track id.
use std::fs::File;
use std::io::Write;

use camino::Utf8Path;
use serde::Serialize;

use crate::{
    constants::{TrackId, SPOT_DECIMALS},
    msd_errors::MsdError,
    spots::Spot,
};

#[derive(Debug, Serialize)]
struct AllSpotsRow {
    #[serde(rename = "Track_ID")]
    track_id: TrackId,
    #[serde(rename = "Spot_ID")]
    spot_id: u64,
    #[serde(rename = "Frame")]
    frame: String,
    #[serde(rename = "Position_X")]
    x: String,
    #[serde(rename = "Position_Y")]
    y: String,
    #[serde(rename = "Position_Z")]
    z: String,
    #[serde(rename = "Radius")]
    radius: String,
    #[serde(rename = "Quality")]
    quality: String,
    #[serde(rename = "Mean_Intensity_Ch1")]
    mean_intensity_ch1: String,
    #[serde(rename = "Max_Intensity_Ch1")]
    max_intensity_ch1: String,
    #[serde(rename = "Median_Intensity_Ch1")]
    median_intensity_ch1: String,
    #[serde(rename = "SNR_Ch1")]
    snr_ch1: String,
    #[serde(rename = "Contrast_Ch1")]
    contrast_ch1: String,
}

/// Fixed-precision cell, empty when the value is absent.
fn cell(value: Option<f64>) -> String {
    value.map_or_else(String::new, |v| format!("{:.*}", SPOT_DECIMALS, v))
}

impl From<&Spot> for AllSpotsRow {
    fn from(spot: &Spot) -> Self {
        let f = &spot.features;
        AllSpotsRow {
            track_id: spot.track_id,
            spot_id: spot.spot_id,
            frame: spot.frame.map_or_else(String::new, |fr| fr.to_string()),
            x: cell(spot.x),
            y: cell(spot.y),
            z: cell(spot.z),
            radius: cell(f.radius),
            quality: cell(f.quality),
            mean_intensity_ch1: cell(f.mean_intensity_ch1),
            max_intensity_ch1: cell(f.max_intensity_ch1),
            median_intensity_ch1: cell(f.median_intensity_ch1),
            snr_ch1: cell(f.snr_ch1),
            contrast_ch1: cell(f.contrast_ch1),
        }
    }
}

/// Write spots to an "all spots" CSV file, returning the number of rows written.
pub fn write_all_spots(path: &Utf8Path, spots: &[Spot]) -> Result<usize, MsdError> {
    let file = File::create(path)?;
    write_all_spots_to_writer(file, spots)
}

/// Write spots in the "all spots" layout to any writer.
///
/// Spots are ordered by frame (stable, so backend order is kept within a frame);
/// spots without a frame come last.
pub fn write_all_spots_to_writer<W: Write>(writer: W, spots: &[Spot]) -> Result<usize, MsdError> {
    let mut ordered: Vec<&Spot> = spots.iter().collect();
    ordered.sort_by_key(|s| (s.frame.is_none(), s.frame));

    let mut csv_writer = csv::Writer::from_writer(writer);
    for spot in &ordered {
        csv_writer.serialize(AllSpotsRow::from(*spot))?;
    }
    if ordered.is_empty() {
        csv_writer.write_record(crate::constants::ALL_SPOTS_HEADER)?;
    }
    csv_writer.flush()?;
    Ok(ordered.len())
}
