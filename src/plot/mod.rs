//! # MSD plots
//!
//! PNG renderers built on [`plotters`]:
//!
//! * [`plot_track_curves`] – one figure per track of a derived MSD table,
//!   `track_<id>_msd.png`, titled `Mean Squared Displacement (MSD) for Track <id>`.
//! * [`plot_overview`] – the first lags of every track of a merged table on one figure,
//!   one palette colour per source file, with a legend entry `<file> (Curves: <n>)`.
//!
//! Data preparation is split from drawing: [`overview_series`] and [`auto_range`] are
//! plain functions, the renderers only turn their output into pixels. Non-finite MSD
//! values are left out of the drawn lines.
use std::fs;

use camino::Utf8Path;
use itertools::{Itertools, MinMaxResult};
use log::{info, warn};
use plotters::prelude::*;

use crate::{
    config::PlotConfig,
    merge::MergedDataset,
    msd::{msd_table::read_msd_table, MsdCurve},
    msd_errors::MsdError,
};

const FONT: &str = "sans-serif";

/// Canvas size of a figure, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
}

impl PlotStyle {
    /// Size of the per-track figures.
    pub fn track(config: &PlotConfig) -> Self {
        PlotStyle {
            width: config.width,
            height: config.height,
        }
    }

    /// Size of the overview figure.
    pub fn overview(config: &PlotConfig) -> Self {
        PlotStyle {
            width: config.overview_width,
            height: config.overview_height,
        }
    }
}

/// Optional fixed axis ranges; a missing range is fitted to the data.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AxisLimits {
    pub x: Option<(f64, f64)>,
    pub y: Option<(f64, f64)>,
}

/// Lines of one source file on the overview figure.
#[derive(Debug, Clone, PartialEq)]
pub struct OverviewSeries {
    pub label: String,
    /// Position of the source file in the dataset, used to pick its colour.
    pub color_index: usize,
    pub lines: Vec<Vec<(f64, f64)>>,
}

/// Finite `(lag_time, msd)` points of the first `max_points` entries of a curve.
pub fn curve_points(curve: &MsdCurve, max_points: usize) -> Vec<(f64, f64)> {
    curve
        .iter()
        .take(max_points)
        .filter(|p| p.lag_time.is_finite() && p.msd.is_finite())
        .map(|p| (p.lag_time, p.msd))
        .collect()
}

/// Group the curves of a merged dataset into one labelled series per source file.
///
/// Every track contributes its first `max_points` rows. Files without any track are
/// left out.
pub fn overview_series(merged: &MergedDataset, max_points: usize) -> Vec<OverviewSeries> {
    merged
        .sources
        .iter()
        .enumerate()
        .filter(|(_, source)| !source.tracks.is_empty())
        .map(|(i, source)| OverviewSeries {
            label: format!("{} (Curves: {})", source.source_file, source.tracks.len()),
            color_index: i,
            lines: source
                .tracks
                .iter()
                .map(|t| curve_points(&t.curve, max_points))
                .collect(),
        })
        .collect()
}

/// Axis range covering `values` with a 5% margin on both sides.
///
/// Non-finite values are ignored; `(0, 1)` is returned when nothing is left, and a
/// single value `v` gives `(v - 0.5, v + 0.5)`.
pub fn auto_range<I>(values: I) -> (f64, f64)
where
    I: IntoIterator<Item = f64>,
{
    let bounds = values
        .into_iter()
        .filter(|v| v.is_finite())
        .minmax_by(|a, b| a.total_cmp(b));

    match bounds {
        MinMaxResult::NoElements => (0.0, 1.0),
        MinMaxResult::OneElement(v) => (v - 0.5, v + 0.5),
        MinMaxResult::MinMax(lo, hi) if lo == hi => (lo - 0.5, hi + 0.5),
        MinMaxResult::MinMax(lo, hi) => {
            let margin = 0.05 * (hi - lo);
            (lo - margin, hi + margin)
        }
    }
}

fn resolve(limit: Option<(f64, f64)>, values: impl IntoIterator<Item = f64>) -> (f64, f64) {
    limit.unwrap_or_else(|| auto_range(values))
}

/// Render one figure per track of a derived MSD table.
///
/// Arguments
/// -----------------
/// * `msd_csv` – Derived MSD table.
/// * `out_dir` – Destination folder, created if needed.
/// * `style` – Canvas size.
///
/// Return
/// ----------
/// * The number of figures written.
pub fn plot_track_curves(
    msd_csv: &Utf8Path,
    out_dir: &Utf8Path,
    style: PlotStyle,
) -> Result<usize, MsdError> {
    let curves = read_msd_table(msd_csv)?;
    fs::create_dir_all(out_dir)?;

    for track in &curves {
        let points = curve_points(&track.curve, usize::MAX);
        let out_png = out_dir.join(format!("track_{}_msd.png", track.track_id));

        let x_range = auto_range(points.iter().map(|p| p.0));
        let y_range = auto_range(points.iter().map(|p| p.1));

        let root = BitMapBackend::new(out_png.as_std_path(), (style.width, style.height))
            .into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(
                format!("Mean Squared Displacement (MSD) for Track {}", track.track_id),
                (FONT, 24),
            )
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(70)
            .build_cartesian_2d(x_range.0..x_range.1, y_range.0..y_range.1)?;

        chart
            .configure_mesh()
            .x_desc("Time Interval")
            .y_desc("MSD")
            .draw()?;

        chart.draw_series(LineSeries::new(points.iter().copied(), &BLUE))?;
        chart.draw_series(points.iter().map(|&p| Circle::new(p, 3, BLUE.filled())))?;

        root.present()?;
    }

    info!("{}: {} track plots written to {out_dir}", msd_csv, curves.len());
    Ok(curves.len())
}

/// Render the overview figure of a merged dataset.
///
/// Arguments
/// -----------------
/// * `merged` – Merged dataset.
/// * `out_png` – Destination file.
/// * `limits` – Optional fixed axis ranges.
/// * `max_points` – Rows drawn per track (31 draws lags 0 to 30).
/// * `style` – Canvas size.
///
/// Return
/// ----------
/// * The total number of curves drawn; nothing is written when it is zero.
pub fn plot_overview(
    merged: &MergedDataset,
    out_png: &Utf8Path,
    limits: AxisLimits,
    max_points: usize,
    style: PlotStyle,
) -> Result<usize, MsdError> {
    let series = overview_series(merged, max_points);
    let total: usize = series.iter().map(|s| s.lines.len()).sum();
    if total == 0 {
        warn!("No curves to draw for {out_png}");
        return Ok(0);
    }

    let all_points = || series.iter().flat_map(|s| s.lines.iter().flatten());
    let x_range = resolve(limits.x, all_points().map(|p| p.0));
    let y_range = resolve(limits.y, all_points().map(|p| p.1));

    let root =
        BitMapBackend::new(out_png.as_std_path(), (style.width, style.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!(
                "Mean Squared Displacement (MSD) for All Tracks (First {} Intervals)",
                max_points.saturating_sub(1)
            ),
            (FONT, 32),
        )
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(90)
        .build_cartesian_2d(x_range.0..x_range.1, y_range.0..y_range.1)?;

    chart
        .configure_mesh()
        .x_desc("Time Interval (s)")
        .y_desc("MSD")
        .label_style((FONT, 20))
        .draw()?;

    for s in &series {
        let color = Palette99::pick(s.color_index).mix(0.7);
        for (i, line) in s.lines.iter().enumerate() {
            let drawn = chart.draw_series(LineSeries::new(line.iter().copied(), &color))?;
            // one legend entry per source file
            if i == 0 {
                drawn
                    .label(s.label.clone())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
            }
        }
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .label_font((FONT, 18))
        .draw()?;

    root.present()?;
    info!("Total number of MSD curves plotted: {total}");
    Ok(total)
}
