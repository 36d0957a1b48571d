//! Command-line front end of the MSD and merge jobs.
//!
//! ```text
//! spotmsd [--config pipeline.toml] [-v] msd   --dir csv --interval 0.2
//! spotmsd [--config pipeline.toml] [-v] merge --dir . --x-limit 0,6 --y-limit 0,0.5
//! spotmsd [--config pipeline.toml] [-v] run
//! ```
//!
//! Flags override the values of the configuration file. Logging goes to stderr through
//! `env_logger`; `RUST_LOG` takes precedence over `-v`.
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use log::error;

use spotmsd::{
    config::PipelineConfig,
    display::BatchReport,
    jobs::{merge_job::run_merge_job, msd_job::run_msd_job},
    progress::ProgressHook,
    MsdError,
};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "MSD curves, merges and plots for single-particle tracking",
    long_about = None
)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<Utf8PathBuf>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute MSD tables and per-track plots for a directory tree
    Msd(MsdArgs),
    /// Merge MSD tables per experiment folder and draw the overview plots
    Merge(MergeArgs),
    /// Run the MSD job, then the merge job, as configured
    Run,
}

#[derive(Args, Debug)]
struct MsdArgs {
    /// Root of the directory tree holding the spot tables
    #[arg(short, long)]
    dir: Option<Utf8PathBuf>,

    /// Time between two frames, in seconds
    #[arg(short, long)]
    interval: Option<f64>,

    /// Skip the per-track plots
    #[arg(long)]
    no_plots: bool,
}

#[derive(Args, Debug)]
struct MergeArgs {
    /// Folder whose sub-folders hold an msd_csv folder
    #[arg(short, long)]
    dir: Option<Utf8PathBuf>,

    /// Fixed x range of the overview plot, as MIN,MAX
    #[arg(long, value_parser = parse_limit)]
    x_limit: Option<(f64, f64)>,

    /// Fixed y range of the overview plot, as MIN,MAX
    #[arg(long, value_parser = parse_limit)]
    y_limit: Option<(f64, f64)>,

    /// Skip the overview plots
    #[arg(long)]
    no_plots: bool,
}

fn parse_limit(s: &str) -> Result<(f64, f64), String> {
    let (lo, hi) = s
        .split_once(',')
        .ok_or_else(|| format!("expected MIN,MAX, got {s:?}"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid number {v:?}: {e}"))
    };
    Ok((parse(lo)?, parse(hi)?))
}

#[cfg(feature = "progress")]
fn progress_hook() -> Box<dyn ProgressHook> {
    Box::new(spotmsd::progress_bar::IndicatifProgress::new())
}

#[cfg(not(feature = "progress"))]
fn progress_hook() -> Box<dyn ProgressHook> {
    Box::new(spotmsd::progress::NoProgress)
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn run(cli: Cli) -> Result<Vec<BatchReport>, MsdError> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_toml_file(path)?,
        None => PipelineConfig::default(),
    };
    let mut progress = progress_hook();

    let mut reports = Vec::new();
    match cli.command {
        Command::Msd(args) => {
            if let Some(dir) = args.dir {
                config.msd.working_dir = dir;
            }
            if let Some(interval) = args.interval {
                config.msd.time_interval = interval;
            }
            if args.no_plots {
                config.msd.render_plots = false;
            }
            config.validate()?;
            reports.push(run_msd_job(&config.msd, &config.plot, progress.as_mut())?);
        }
        Command::Merge(args) => {
            if let Some(dir) = args.dir {
                config.merge.base_dir = dir;
            }
            if args.x_limit.is_some() {
                config.merge.x_limit = args.x_limit;
            }
            if args.y_limit.is_some() {
                config.merge.y_limit = args.y_limit;
            }
            if args.no_plots {
                config.merge.render_plots = false;
            }
            config.validate()?;
            reports.push(run_merge_job(&config.merge, &config.plot, progress.as_mut())?);
        }
        Command::Run => {
            reports.push(run_msd_job(&config.msd, &config.plot, progress.as_mut())?);
            reports.push(run_merge_job(&config.merge, &config.plot, progress.as_mut())?);
        }
    }
    Ok(reports)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let detailed = cli.verbose > 0;

    match run(cli) {
        Ok(reports) => {
            for report in &reports {
                if detailed {
                    println!("{report:#}");
                } else {
                    println!("{report}");
                }
            }
            if reports.iter().any(|r| r.n_failed() > 0) {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
