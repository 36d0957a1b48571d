//! # Merging derived MSD tables
//!
//! All the derived tables of an experiment folder are concatenated into a single table
//! with one extra column, `source_file`, holding the base name of the table each row
//! came from.
//!
//! Overview
//! -----------------
//! * [`find_msd_csvs`] – recursive, sorted discovery of the tables to merge.
//! * [`merge_msd_csvs`] – row concatenation into one output table.
//! * [`read_merged`] – reads a merged table back, grouped per file and per track, for the
//!   overview plot.
//!
//! Reproducibility
//! -----------------
//! Input files are merged in lexicographic path order, and cells are copied verbatim
//! without re-parsing. Merging the same inputs twice therefore produces byte-identical
//! tables. All inputs must share exactly the same header; a different header is an
//! error rather than a silently misaligned table.
use std::collections::HashMap;
use std::fs::{self, File};

use ahash::RandomState;
use camino::{Utf8Path, Utf8PathBuf};
use csv::StringRecord;
use log::{debug, info, warn};
use regex::Regex;

use crate::{
    constants::{TrackId, SOURCE_FILE_COLUMN},
    msd::msd_table::{read_curve_records, TrackCurve},
    msd::MsdCurve,
    msd_errors::MsdError,
};

/// Outcome of a merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSummary {
    pub output: Utf8PathBuf,
    /// Merged tables, in merge order.
    pub inputs: Vec<Utf8PathBuf>,
    /// Data rows written.
    pub rows: usize,
}

/// Curves of one source table of a merged dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceCurves {
    pub source_file: String,
    pub tracks: Vec<TrackCurve>,
}

/// A merged table grouped per source table, then per track.
///
/// Both levels keep the order of first appearance in the merged table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedDataset {
    pub sources: Vec<SourceCurves>,
}

impl MergedDataset {
    /// Number of track curves across every source table.
    pub fn curve_count(&self) -> usize {
        self.sources.iter().map(|s| s.tracks.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

fn collect_matching(
    dir: &Utf8Path,
    pattern: &Regex,
    out: &mut Vec<Utf8PathBuf>,
) -> Result<(), MsdError> {
    for entry in dir.read_dir_utf8()? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            collect_matching(path, pattern, out)?;
        } else if pattern.is_match(entry.file_name()) {
            out.push(path.to_path_buf());
        }
    }
    Ok(())
}

/// Find every derived MSD table below `dir`.
///
/// Arguments
/// -----------------
/// * `dir` – Root of the recursive search.
/// * `pattern` – Regex matched against file names (not paths).
///
/// Return
/// ----------
/// * Matching files sorted by path. A missing `dir` is an I/O error.
pub fn find_msd_csvs(dir: &Utf8Path, pattern: &Regex) -> Result<Vec<Utf8PathBuf>, MsdError> {
    let mut found = Vec::new();
    collect_matching(dir, pattern, &mut found)?;
    found.sort();
    Ok(found)
}

/// Merge every derived MSD table below `dir` into `output`.
///
/// Arguments
/// -----------------
/// * `dir` – Folder searched recursively with [`find_msd_csvs`].
/// * `output` – Merged table to write; its parent folder is created if needed.
/// * `pattern` – Regex selecting the tables to merge by file name.
///
/// Return
/// ----------
/// * `Ok(None)` when no table matches (a warning is logged and nothing is written).
/// * `Ok(Some(summary))` otherwise.
///
/// Errors
/// ----------
/// * [`MsdError::PatternError`] for an invalid regex.
/// * [`MsdError::HeaderMismatch`] when a table's header differs from the first one.
pub fn merge_msd_csvs(
    dir: &Utf8Path,
    output: &Utf8Path,
    pattern: &str,
) -> Result<Option<MergeSummary>, MsdError> {
    let pattern = Regex::new(pattern)?;
    let inputs: Vec<Utf8PathBuf> = find_msd_csvs(dir, &pattern)?
        .into_iter()
        .filter(|p| p.as_path() != output)
        .collect();

    if inputs.is_empty() {
        warn!("No MSD CSV files found in {dir}");
        return Ok(None);
    }

    // first pass: headers only, one file open at a time
    let mut header: Option<StringRecord> = None;
    for input in &inputs {
        let headers = csv::Reader::from_path(input)?.headers()?.clone();
        match &header {
            Some(first) if *first != headers => {
                return Err(MsdError::HeaderMismatch {
                    file: input.to_string(),
                    expected: first.iter().map(str::to_string).collect(),
                    found: headers.iter().map(str::to_string).collect(),
                });
            }
            Some(_) => {}
            None => header = Some(headers),
        }
    }

    if let Some(parent) = output.parent() {
        if !parent.as_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut writer = csv::Writer::from_writer(File::create(output)?);
    if let Some(mut header) = header {
        header.push_field(SOURCE_FILE_COLUMN);
        writer.write_record(&header)?;
    }

    let mut rows = 0;
    for input in &inputs {
        let source = input.file_name().unwrap_or(input.as_str());
        let mut reader = csv::Reader::from_path(input)?;
        let mut file_rows = 0;
        for record in reader.records() {
            let mut record = record?;
            record.push_field(source);
            writer.write_record(&record)?;
            file_rows += 1;
        }
        debug!("{input}: {file_rows} rows merged");
        rows += file_rows;
    }
    writer.flush()?;

    info!("Merged {} files ({rows} rows) into {output}", inputs.len());
    Ok(Some(MergeSummary {
        output: output.to_path_buf(),
        inputs,
        rows,
    }))
}

/// Read a merged table, grouping rows per source file and per track.
pub fn read_merged(path: &Utf8Path) -> Result<MergedDataset, MsdError> {
    let records = read_curve_records(File::open(path)?, path.as_str(), true)?;

    type Key = (usize, TrackId);
    let mut dataset = MergedDataset::default();
    let mut source_index: HashMap<String, usize, RandomState> = HashMap::default();
    let mut track_index: HashMap<Key, usize, RandomState> = HashMap::default();

    for record in records {
        let source = record.source.unwrap_or_default();
        let s = match source_index.get(&source) {
            Some(&s) => s,
            None => {
                dataset.sources.push(SourceCurves {
                    source_file: source.clone(),
                    tracks: Vec::new(),
                });
                source_index.insert(source, dataset.sources.len() - 1);
                dataset.sources.len() - 1
            }
        };

        let tracks = &mut dataset.sources[s].tracks;
        let t = *track_index.entry((s, record.track_id)).or_insert_with(|| {
            tracks.push(TrackCurve {
                track_id: record.track_id,
                curve: MsdCurve::new(),
            });
            tracks.len() - 1
        });
        tracks[t].curve.push(record.point);
    }
    Ok(dataset)
}
