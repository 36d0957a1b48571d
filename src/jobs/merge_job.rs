//! Merge job: one merged table and one overview plot per experiment folder.
//!
//! Every sub-folder `S` of the base directory that owns an `msd_csv` folder gets:
//!
//! * `S/msd_merge/merged_msd_data.csv` – all derived tables of `S/msd_csv`, tagged with
//!   their file name,
//! * `S/msd_merge/all_tracks_msd_first_30_intervals.png` – the overview plot.
//!
//! Sub-folders without `msd_csv` are ignored.
use camino::Utf8Path;
use log::{debug, error, info};

use crate::{
    config::{MergeJobConfig, PlotConfig},
    constants::{MERGED_CSV_NAME, MSD_CSV_DIR, MSD_MERGE_DIR, OVERVIEW_PNG_NAME},
    display::{BatchReport, FileSummary},
    jobs::sub_dirs,
    merge::{merge_msd_csvs, read_merged},
    msd_errors::MsdError,
    plot::{plot_overview, AxisLimits, PlotStyle},
    progress::ProgressHook,
};

/// Merge and plot one experiment folder.
///
/// Return
/// ----------
/// * `Ok(None)` when `msd_csv` holds no derived table.
pub fn process_subfolder(
    subfolder: &Utf8Path,
    config: &MergeJobConfig,
    plot: &PlotConfig,
) -> Result<Option<FileSummary>, MsdError> {
    let merge_dir = subfolder.join(MSD_MERGE_DIR);
    let merged_csv = merge_dir.join(MERGED_CSV_NAME);

    let msd_dir = subfolder.join(MSD_CSV_DIR);
    let Some(summary) = merge_msd_csvs(&msd_dir, &merged_csv, &config.file_pattern)? else {
        return Ok(None);
    };

    let merged = read_merged(&merged_csv)?;
    let curves = merged.curve_count();

    if config.render_plots {
        if let Some(x) = config.x_limit {
            info!("X-axis limits set to: {x:?}");
        }
        if let Some(y) = config.y_limit {
            info!("Y-axis limits set to: {y:?}");
        }
        plot_overview(
            &merged,
            &merge_dir.join(OVERVIEW_PNG_NAME),
            AxisLimits {
                x: config.x_limit,
                y: config.y_limit,
            },
            config.overview_points,
            PlotStyle::overview(plot),
        )?;
    }

    Ok(Some(FileSummary {
        output: summary.output,
        tracks: curves,
        spots: 0,
        curves,
        rows: summary.rows,
        length_stats: None,
    }))
}

/// Run the merge job over the sub-folders of `config.base_dir`.
pub fn run_merge_job(
    config: &MergeJobConfig,
    plot: &PlotConfig,
    progress: &mut dyn ProgressHook,
) -> Result<BatchReport, MsdError> {
    let mut report = BatchReport::new("merge");

    let subfolders: Vec<_> = sub_dirs(&config.base_dir)?
        .into_iter()
        .filter(|dir| {
            let has_msd = dir.join(MSD_CSV_DIR).is_dir();
            if !has_msd {
                debug!("{dir}: no {MSD_CSV_DIR} folder, ignored");
            }
            has_msd
        })
        .collect();

    progress.start("merge", subfolders.len());
    for subfolder in &subfolders {
        info!("Processing subfolder: {subfolder}");
        match process_subfolder(subfolder, config, plot) {
            Ok(Some(summary)) => report.done(subfolder, summary),
            Ok(None) => report.skipped(subfolder, "no MSD CSV files"),
            Err(err) => {
                error!("{subfolder}: {err}");
                report.failed(subfolder, err);
            }
        }
        progress.step();
    }
    progress.finish();

    Ok(report)
}
