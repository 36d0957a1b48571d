use std::fs;

use camino::Utf8Path;

use spotmsd::{
    config::{MergeJobConfig, MsdJobConfig, PlotConfig},
    constants::{MSD_MERGE_DIR, MSD_PLOTS_DIR, OVERVIEW_PNG_NAME},
    jobs::{merge_job::run_merge_job, msd_job::run_msd_job},
    progress::NoProgress,
};

mod common;
use common::{copy_fixture, scratch_dir};

fn small_canvas() -> PlotConfig {
    PlotConfig {
        width: 320,
        height: 240,
        overview_width: 480,
        overview_height: 320,
    }
}

fn assert_png(path: &Utf8Path) {
    let bytes = fs::read(path).unwrap_or_else(|e| panic!("{path}: {e}"));
    assert!(bytes.len() > 8, "{path} is empty");
    assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n", "{path} is not a PNG");
}

#[test]
fn test_jobs_render_track_and_overview_plots() {
    let (_tmp, root) = scratch_dir();
    let exp = root.join("exp1");
    copy_fixture("cell_a_allspots.csv", &exp);
    copy_fixture("cell_b_trackmate.csv", &root.join("exp2"));

    let msd = MsdJobConfig {
        working_dir: root.clone(),
        ..MsdJobConfig::default()
    };
    let report = run_msd_job(&msd, &small_canvas(), &mut NoProgress).unwrap();
    assert_eq!(report.n_done(), 2);
    assert_eq!(report.n_failed(), 0);

    let track_plots = exp.join(MSD_PLOTS_DIR).join("cell_a_allspots");
    assert_png(&track_plots.join("track_0_msd.png"));
    assert_png(&track_plots.join("track_1_msd.png"));
    assert_eq!(fs::read_dir(&track_plots).unwrap().count(), 2);
    assert_png(
        &root
            .join("exp2")
            .join(MSD_PLOTS_DIR)
            .join("cell_b_trackmate")
            .join("track_3_msd.png"),
    );

    let merge = MergeJobConfig {
        base_dir: root.clone(),
        x_limit: Some((0.0, 6.0)),
        y_limit: Some((0.0, 0.5)),
        ..MergeJobConfig::default()
    };
    let report = run_merge_job(&merge, &small_canvas(), &mut NoProgress).unwrap();
    assert_eq!(report.n_done(), 2);
    assert_eq!(report.n_failed(), 0);

    assert_png(&exp.join(MSD_MERGE_DIR).join(OVERVIEW_PNG_NAME));
    assert_png(&root.join("exp2").join(MSD_MERGE_DIR).join(OVERVIEW_PNG_NAME));
}
