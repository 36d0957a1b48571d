//! MSD job: derived MSD tables and per-track plots for a whole directory tree.
//!
//! For every folder `D` below the working directory (job output folders excluded) and
//! every raw spot table `D/<stem>.csv`:
//!
//! * `D/msd_csv/<stem>_msd.csv` – derived MSD table,
//! * `D/msd_plots/<stem>/track_<id>_msd.png` – one figure per track, when plots are on.
//!
//! A folder without any CSV file is reported as skipped. A table that cannot be
//! processed is reported as failed and the job moves on to the next one.
use camino::{Utf8Path, Utf8PathBuf};
use log::{error, info, warn};

use crate::{
    config::{MsdJobConfig, MsdParams, PlotConfig},
    constants::{MSD_CSV_DIR, MSD_PLOTS_DIR},
    display::{BatchReport, FileSummary},
    jobs::{csv_files_in, walk_input_dirs},
    msd::msd_table::make_msd_csv,
    msd_errors::MsdError,
    plot::{plot_track_curves, PlotStyle},
    progress::ProgressHook,
};

/// Process one raw spot table: derived table, then plots.
pub fn process_spot_csv(
    spot_csv: &Utf8Path,
    params: &MsdParams,
    config: &MsdJobConfig,
    style: PlotStyle,
) -> Result<FileSummary, MsdError> {
    let dir = spot_csv.parent().unwrap_or(Utf8Path::new("."));
    let summary = make_msd_csv(
        spot_csv,
        &dir.join(MSD_CSV_DIR),
        params,
        config.trackmate_descriptor_rows,
    )?;

    if config.render_plots {
        let stem = spot_csv.file_stem().unwrap_or("spots");
        let plot_dir = dir.join(MSD_PLOTS_DIR).join(stem);
        plot_track_curves(&summary.output, &plot_dir, style)?;
    }
    Ok(summary)
}

/// Run the MSD job over `config.working_dir`.
///
/// Errors
/// -----------------
/// * [`MsdError::InvalidParameter`] for an invalid time interval, before any file.
/// * I/O errors while listing the directory tree.
pub fn run_msd_job(
    config: &MsdJobConfig,
    plot: &PlotConfig,
    progress: &mut dyn ProgressHook,
) -> Result<BatchReport, MsdError> {
    let params = config.msd_params()?;
    let style = PlotStyle::track(plot);
    let mut report = BatchReport::new("msd");

    let mut work: Vec<Utf8PathBuf> = Vec::new();
    for dir in walk_input_dirs(&config.working_dir)? {
        let files = csv_files_in(&dir)?;
        if files.is_empty() {
            warn!("There are no CSV files in {dir}");
            report.skipped(dir, "no CSV files");
        } else {
            work.extend(files);
        }
    }

    progress.start("msd", work.len());
    for spot_csv in &work {
        info!("Processing file: {spot_csv}");
        match process_spot_csv(spot_csv, &params, config, style) {
            Ok(summary) => report.done(spot_csv, summary),
            Err(err) => {
                error!("{spot_csv}: {err}");
                report.failed(spot_csv, err);
            }
        }
        progress.step();
    }
    progress.finish();

    info!(
        "Processing completed: {} files done, {} failed",
        report.n_done(),
        report.n_failed()
    );
    Ok(report)
}
