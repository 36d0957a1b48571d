//! # Batch reports
//!
//! Every job returns a [`BatchReport`]: one [`FileOutcome`] per input it looked at,
//! processed, skipped or failed. The report renders as a table through
//! [`comfy-table`] with `{}`; `{:#}` adds the track-length statistics column.
//!
//! ```text
//! ┌────────────────────┬────────┬────────┬───────┬────────┬──────┬──────────────────────┐
//! │ Input              ┆ Status ┆ Tracks ┆ Spots ┆ Curves ┆ Rows ┆ Output / reason      │
//! ╞════════════════════╪════════╪════════╪═══════╪════════╪══════╪══════════════════════╡
//! │ csv/a_allspots.csv ┆ done   ┆     12 ┆   480 ┆     12 ┆  471 ┆ csv/msd_csv/a_…      │
//! └────────────────────┴────────┴────────┴───────┴────────┴──────┴──────────────────────┘
//! ```
//!
//! [`comfy-table`]: https://crates.io/crates/comfy-table
use std::fmt;

use camino::Utf8PathBuf;
use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, ContentArrangement, Row, Table};

use crate::trajectories::track_set::TrackLengthStats;

/// Counts of one successfully processed input.
#[derive(Debug, Clone, PartialEq)]
pub struct FileSummary {
    /// Main file written for this input.
    pub output: Utf8PathBuf,
    pub tracks: usize,
    pub spots: usize,
    /// Curves (MSD job and merge job) or zero (tracking job).
    pub curves: usize,
    /// Data rows written to `output`.
    pub rows: usize,
    pub length_stats: Option<TrackLengthStats>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FileStatus {
    Done(FileSummary),
    /// The input was not processed; the reason is kept for the report.
    Skipped(String),
    /// Processing failed; the error message is kept for the report.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileOutcome {
    pub input: Utf8PathBuf,
    pub status: FileStatus,
}

/// Per-input outcomes of one job run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub job: String,
    pub outcomes: Vec<FileOutcome>,
}

impl BatchReport {
    pub fn new(job: impl Into<String>) -> Self {
        BatchReport {
            job: job.into(),
            outcomes: Vec::new(),
        }
    }

    pub fn done(&mut self, input: impl Into<Utf8PathBuf>, summary: FileSummary) {
        self.push(input, FileStatus::Done(summary));
    }

    pub fn skipped(&mut self, input: impl Into<Utf8PathBuf>, reason: impl Into<String>) {
        self.push(input, FileStatus::Skipped(reason.into()));
    }

    pub fn failed(&mut self, input: impl Into<Utf8PathBuf>, error: impl fmt::Display) {
        self.push(input, FileStatus::Failed(error.to_string()));
    }

    fn push(&mut self, input: impl Into<Utf8PathBuf>, status: FileStatus) {
        self.outcomes.push(FileOutcome {
            input: input.into(),
            status,
        });
    }

    pub fn n_done(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Done(_)))
    }

    pub fn n_skipped(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Skipped(_)))
    }

    pub fn n_failed(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&FileStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }

    fn table(&self, with_stats: bool) -> Table {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);

        let mut header = vec![
            Cell::new("Input"),
            Cell::new("Status"),
            Cell::new("Tracks"),
            Cell::new("Spots"),
            Cell::new("Curves"),
            Cell::new("Rows"),
            Cell::new("Output / reason"),
        ];
        if with_stats {
            header.push(Cell::new("Track length"));
        }
        table.set_header(header);

        let num = |n: usize| Cell::new(n).set_alignment(CellAlignment::Right);
        for outcome in &self.outcomes {
            let mut cells = vec![Cell::new(outcome.input.as_str())];
            match &outcome.status {
                FileStatus::Done(s) => {
                    cells.extend([
                        Cell::new("done"),
                        num(s.tracks),
                        num(s.spots),
                        num(s.curves),
                        num(s.rows),
                        Cell::new(s.output.as_str()),
                    ]);
                    if with_stats {
                        cells.push(Cell::new(
                            s.length_stats.map_or_else(|| "-".to_string(), |st| st.to_string()),
                        ));
                    }
                }
                FileStatus::Skipped(reason) | FileStatus::Failed(reason) => {
                    let label = if matches!(outcome.status, FileStatus::Skipped(_)) {
                        "skipped"
                    } else {
                        "FAILED"
                    };
                    cells.push(Cell::new(label));
                    cells.extend((0..4).map(|_| Cell::new("")));
                    cells.push(Cell::new(reason));
                    if with_stats {
                        cells.push(Cell::new(""));
                    }
                }
            }
            table.add_row(Row::from(cells));
        }
        table
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}: {} done, {} skipped, {} failed",
            self.job,
            self.n_done(),
            self.n_skipped(),
            self.n_failed()
        )?;
        if self.outcomes.is_empty() {
            return Ok(());
        }
        let table = self.table(f.alternate());
        write!(f, "{table}")
    }
}

#[cfg(test)]
mod display_test {
    use super::*;

    fn summary() -> FileSummary {
        FileSummary {
            output: Utf8PathBuf::from("out/a_msd.csv"),
            tracks: 3,
            spots: 40,
            curves: 3,
            rows: 38,
            length_stats: Some(TrackLengthStats {
                min: 2,
                p25: 2,
                median: 16,
                p95: 20,
                max: 20,
            }),
        }
    }

    #[test]
    fn test_counts() {
        let mut report = BatchReport::new("msd");
        report.done("a.csv", summary());
        report.skipped("empty_dir", "no CSV files");
        report.failed("b.csv", "CSV error: bad row");

        assert_eq!(report.n_done(), 1);
        assert_eq!(report.n_skipped(), 1);
        assert_eq!(report.n_failed(), 1);
        assert_eq!(report.outcomes[0].status, FileStatus::Done(summary()));
    }

    #[test]
    fn test_render() {
        let mut report = BatchReport::new("msd");
        report.done("a.csv", summary());
        report.failed("b.csv", "CSV error: bad row");

        assert!(format!("{report}").starts_with("msd: 1 done, 0 skipped, 1 failed\n"));

        let mut plain = report.table(false);
        let plain = plain.force_no_tty().to_string();
        assert!(plain.contains("out/a_msd.csv"));
        assert!(plain.contains("FAILED"));
        assert!(!plain.contains("median=16"));

        let mut detailed = report.table(true);
        let detailed = detailed.force_no_tty().to_string();
        assert!(detailed.contains("min=2, p25=2, median=16, p95=20, max=20"));
    }

    #[test]
    fn test_empty_report_is_one_line() {
        let report = BatchReport::new("merge");
        assert_eq!(format!("{report}"), "merge: 0 done, 0 skipped, 0 failed\n");
    }
}
