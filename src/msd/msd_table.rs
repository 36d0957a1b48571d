//! # Derived MSD tables
//!
//! One derived table is written per raw spot table. For every track, the `k`-th spot of
//! the time-sorted track is written on the same row as the `k`-th point of the track's
//! MSD curve, so the table has exactly one row per spot of every kept track:
//!
//! ```text
//! Track_ID,Frame,Position_X,Position_Y,interval,msd
//! 0,0,1,2,0,0
//! 0,1,1.1,2.2,0.2,0.05
//! …
//! ```
//!
//! The four track columns echo the names of the input layout
//! ([`SpotTableLayout::track_columns`]); for a TrackMate export the time column is
//! `POSITION_T` instead of `Frame`. Numbers are written with the shortest representation
//! that reads back to the same `f64`, so reading a derived table recovers every curve
//! exactly. Tracks are written in ascending id order.
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{Read, Write};

use ahash::RandomState;
use camino::{Utf8Path, Utf8PathBuf};
use csv::StringRecord;
use log::{debug, info};

use crate::{
    config::MsdParams,
    constants::{TrackId, INTERVAL_COLUMN, MSD_COLUMN, MSD_CSV_SUFFIX, SOURCE_FILE_COLUMN},
    display::FileSummary,
    msd::{msd_for_track, MsdCurve, MsdPoint},
    msd_errors::MsdError,
    spots::spot_reader::{read_spot_table, SpotTableLayout},
    trajectories::{track_set::TrackSetExt, TrackSet},
};

/// One row of a derived MSD table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MsdRow {
    pub track_id: TrackId,
    /// Frame index ("all spots" layout) or `POSITION_T` (TrackMate layout).
    pub time: Option<f64>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub interval: f64,
    pub msd: f64,
}

/// The rows of one derived table, with the layout whose column names they use.
#[derive(Debug, Clone, PartialEq)]
pub struct MsdTable {
    pub layout: SpotTableLayout,
    pub rows: Vec<MsdRow>,
    /// Number of tracks that produced a curve.
    pub curves: usize,
}

/// MSD curve of one track, as read back from a derived table.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackCurve {
    pub track_id: TrackId,
    pub curve: MsdCurve,
}

/// Compute the MSD curve of every track and align it with the track's spots.
pub fn build_msd_rows(
    tracks: &TrackSet,
    layout: SpotTableLayout,
    params: &MsdParams,
) -> Result<MsdTable, MsdError> {
    let mut rows = Vec::with_capacity(tracks.total_spots());
    let mut curves = 0;

    for track_id in tracks.sorted_ids() {
        let track = &tracks[&track_id];
        let Some(curve) = msd_for_track(track_id, track, params)? else {
            continue;
        };
        curves += 1;

        rows.extend(track.iter().zip(&curve).map(|(spot, point)| MsdRow {
            track_id,
            time: match layout {
                SpotTableLayout::AllSpots => spot.frame.map(f64::from),
                SpotTableLayout::TrackMate => spot.time,
            },
            x: spot.x,
            y: spot.y,
            interval: point.lag_time,
            msd: point.msd,
        }));
    }

    Ok(MsdTable {
        layout,
        rows,
        curves,
    })
}

fn num_cell(value: Option<f64>) -> String {
    value.map_or_else(String::new, |v| v.to_string())
}

/// Write a derived table to any writer.
pub fn write_msd_table<W: Write>(writer: W, table: &MsdTable) -> Result<(), MsdError> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header: Vec<&str> = table.layout.track_columns().to_vec();
    header.extend([INTERVAL_COLUMN, MSD_COLUMN]);
    csv_writer.write_record(&header)?;

    for row in &table.rows {
        csv_writer.write_record([
            row.track_id.to_string(),
            num_cell(row.time),
            num_cell(row.x),
            num_cell(row.y),
            row.interval.to_string(),
            row.msd.to_string(),
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Name of the derived table for a raw spot table: `<stem>_msd.csv`.
pub fn msd_csv_name(spot_csv: &Utf8Path) -> String {
    let stem = spot_csv.file_stem().unwrap_or("spots");
    format!("{stem}{MSD_CSV_SUFFIX}")
}

/// Path of the derived table of `spot_csv` inside `out_dir`.
pub fn msd_csv_path(spot_csv: &Utf8Path, out_dir: &Utf8Path) -> Utf8PathBuf {
    out_dir.join(msd_csv_name(spot_csv))
}

/// Compute and write the derived MSD table of one raw spot table.
///
/// Arguments
/// -----------------
/// * `spot_csv` – Raw spot table in either supported layout.
/// * `out_dir` – Destination folder, created if needed.
/// * `params` – Validated MSD parameters.
/// * `descriptor_rows` – Rows skipped after the header of a TrackMate export.
///
/// Return
/// ----------
/// * A [`FileSummary`] pointing at `<out_dir>/<stem>_msd.csv`.
pub fn make_msd_csv(
    spot_csv: &Utf8Path,
    out_dir: &Utf8Path,
    params: &MsdParams,
    descriptor_rows: usize,
) -> Result<FileSummary, MsdError> {
    let spot_table = read_spot_table(spot_csv, descriptor_rows)?;
    let spots = spot_table.spots.len();
    let tracks = TrackSet::from_spots(spot_table.spots, params.include_unassigned);
    debug!(
        "{spot_csv}: {spots} spots, {} tracks ({:?} layout)",
        tracks.number_of_tracks(),
        spot_table.layout
    );

    let table = build_msd_rows(&tracks, spot_table.layout, params)?;

    fs::create_dir_all(out_dir)?;
    let output = msd_csv_path(spot_csv, out_dir);
    write_msd_table(File::create(&output)?, &table)?;
    info!("MSD data saved: {output}");

    Ok(FileSummary {
        output,
        tracks: tracks.number_of_tracks(),
        spots,
        curves: table.curves,
        rows: table.rows.len(),
        length_stats: tracks.length_stats(),
    })
}

// -------------------------------------------------------------------------------------------------
// Reading derived tables back
// -------------------------------------------------------------------------------------------------

/// Positions of the columns needed to rebuild curves from a derived (or merged) table.
struct CurveColumns {
    track: usize,
    interval: usize,
    msd: usize,
    source: Option<usize>,
}

impl CurveColumns {
    fn locate(headers: &StringRecord, file: &str, with_source: bool) -> Result<Self, MsdError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| MsdError::MissingColumn {
                    file: file.to_string(),
                    column: name.to_string(),
                })
        };
        Ok(CurveColumns {
            track: find("track_id")?,
            interval: find(INTERVAL_COLUMN)?,
            msd: find(MSD_COLUMN)?,
            source: if with_source {
                Some(find(SOURCE_FILE_COLUMN)?)
            } else {
                None
            },
        })
    }
}

/// A row of a derived table reduced to what the curves need.
pub(crate) struct CurveRecord {
    pub source: Option<String>,
    pub track_id: TrackId,
    pub point: MsdPoint,
}

fn cell<'r>(record: &'r StringRecord, index: usize) -> &'r str {
    record.get(index).unwrap_or("").trim()
}

fn parse_f64(
    record: &StringRecord,
    index: usize,
    file: &str,
    column: &str,
) -> Result<f64, MsdError> {
    let raw = cell(record, index);
    raw.parse::<f64>().map_err(|_| MsdError::InvalidCell {
        file: file.to_string(),
        column: column.to_string(),
        value: raw.to_string(),
    })
}

/// Read the `(source, track, interval, msd)` cells of a derived or merged table.
pub(crate) fn read_curve_records<R: Read>(
    reader: R,
    file: &str,
    with_source: bool,
) -> Result<Vec<CurveRecord>, MsdError> {
    let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let columns = CurveColumns::locate(&headers, file, with_source)?;

    let mut records = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let raw_track = cell(&record, columns.track);
        let track_id = raw_track
            .parse::<TrackId>()
            .map_err(|_| MsdError::InvalidCell {
                file: file.to_string(),
                column: headers.get(columns.track).unwrap_or("track_id").to_string(),
                value: raw_track.to_string(),
            })?;

        records.push(CurveRecord {
            source: columns.source.map(|i| cell(&record, i).to_string()),
            track_id,
            point: MsdPoint {
                lag_time: parse_f64(&record, columns.interval, file, INTERVAL_COLUMN)?,
                msd: parse_f64(&record, columns.msd, file, MSD_COLUMN)?,
            },
        });
    }
    Ok(records)
}

/// Group rows into per-track curves, keeping tracks in order of first appearance.
pub fn read_msd_table_from_reader<R: Read>(
    reader: R,
    file: &str,
) -> Result<Vec<TrackCurve>, MsdError> {
    let mut curves: Vec<TrackCurve> = Vec::new();
    let mut index: HashMap<TrackId, usize, RandomState> = HashMap::default();

    for record in read_curve_records(reader, file, false)? {
        let slot = *index.entry(record.track_id).or_insert_with(|| {
            curves.push(TrackCurve {
                track_id: record.track_id,
                curve: MsdCurve::new(),
            });
            curves.len() - 1
        });
        curves[slot].curve.push(record.point);
    }
    Ok(curves)
}

/// Read a derived MSD table back into per-track curves.
///
/// The track column is found case-insensitively (`Track_ID` or `TRACK_ID`); the
/// `interval` and `msd` columns are required.
pub fn read_msd_table(path: &Utf8Path) -> Result<Vec<TrackCurve>, MsdError> {
    let file = File::open(path)?;
    read_msd_table_from_reader(file, path.as_str())
}

#[cfg(test)]
mod msd_table_test {
    use super::*;
    use crate::spots::Spot;
    use approx::assert_relative_eq;

    fn tracks() -> TrackSet {
        let mut spots = Vec::new();
        // track 1 is written out of time order on purpose
        for (id, frame, x) in [(0, 2, 0.4), (1, 0, 0.0), (2, 1, 0.1)] {
            spots.push(Spot::new(id, TrackId::Assigned(1), frame, x, 0.0));
        }
        for (id, frame) in [(3, 0), (4, 1)] {
            spots.push(Spot::new(id, TrackId::Assigned(0), frame, 1.0, 1.0));
        }
        spots.push(Spot::new(5, TrackId::Unassigned, 0, 9.0, 9.0));
        TrackSet::from_spots(spots, false)
    }

    #[test]
    fn test_rows_align_sorted_samples_with_lags() {
        let table =
            build_msd_rows(&tracks(), SpotTableLayout::AllSpots, &MsdParams::default()).unwrap();

        assert_eq!(table.curves, 2);
        assert_eq!(table.rows.len(), 5);

        let ids: Vec<TrackId> = table.rows.iter().map(|r| r.track_id).collect();
        let (zero, one) = (TrackId::Assigned(0), TrackId::Assigned(1));
        assert_eq!(ids, vec![zero, zero, one, one, one]);

        let track1: Vec<&MsdRow> = table.rows.iter().filter(|r| r.track_id == one).collect();
        assert_eq!(track1[0].time, Some(0.0));
        assert_eq!(track1[2].time, Some(2.0));
        assert_eq!(track1[0].msd, 0.0);
        assert_relative_eq!(track1[1].interval, 0.2);
        // lag 1 pairs: 0.1², 0.3²
        assert_relative_eq!(track1[1].msd, (0.01 + 0.09) / 2.0, max_relative = 1e-12);
        assert_relative_eq!(track1[2].msd, 0.16, max_relative = 1e-12);
    }

    #[test]
    fn test_write_header_follows_layout() {
        let table =
            build_msd_rows(&tracks(), SpotTableLayout::TrackMate, &MsdParams::default()).unwrap();
        let mut out = Vec::new();
        write_msd_table(&mut out, &table).unwrap();

        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("TRACK_ID,POSITION_T,POSITION_X,POSITION_Y,interval,msd")
        );
        // no POSITION_T in spots built from frames
        assert_eq!(lines.next(), Some("0,,1,1,0,0"));
    }

    #[test]
    fn test_curves_survive_write_and_regroup() {
        let set = tracks();
        let params = MsdParams::default();
        let table = build_msd_rows(&set, SpotTableLayout::AllSpots, &params).unwrap();
        let mut out = Vec::new();
        write_msd_table(&mut out, &table).unwrap();

        let curves = read_msd_table_from_reader(out.as_slice(), "mem").unwrap();
        assert_eq!(curves.len(), 2);
        for tc in curves {
            let expected = msd_for_track(tc.track_id, &set[&tc.track_id], &params)
                .unwrap()
                .unwrap();
            assert_eq!(tc.curve, expected);
        }
    }

    #[test]
    fn test_missing_and_invalid_columns() {
        let err =
            read_msd_table_from_reader("Track_ID,interval\n0,0\n".as_bytes(), "a.csv").unwrap_err();
        assert_eq!(
            err,
            MsdError::MissingColumn {
                file: "a.csv".into(),
                column: "msd".into()
            }
        );

        let data = "TRACK_ID,interval,msd\n0,0,x\n";
        let err = read_msd_table_from_reader(data.as_bytes(), "b.csv").unwrap_err();
        assert_eq!(
            err,
            MsdError::InvalidCell {
                file: "b.csv".into(),
                column: "msd".into(),
                value: "x".into()
            }
        );
    }

    #[test]
    fn test_msd_csv_name() {
        assert_eq!(msd_csv_name(Utf8Path::new("/a/cell1_allspots.csv")), "cell1_allspots_msd.csv");
        assert_eq!(
            msd_csv_path(Utf8Path::new("x/spots.csv"), Utf8Path::new("x/msd_csv")),
            Utf8PathBuf::from("x/msd_csv/spots_msd.csv")
        );
    }
}
