use std::fs;

use camino::Utf8Path;

use spotmsd::{
    config::{MergeJobConfig, MsdJobConfig, PlotConfig},
    constants::{DEFAULT_MSD_FILE_PATTERN, MERGED_CSV_NAME, MSD_CSV_DIR, MSD_MERGE_DIR},
    display::FileStatus,
    jobs::{merge_job::run_merge_job, msd_job::run_msd_job},
    merge::{merge_msd_csvs, read_merged},
    progress::NoProgress,
    MsdError,
};

mod common;
use common::{copy_fixture, scratch_dir};

/// Run the MSD job on `root` without plots.
fn derive_tables(root: &Utf8Path) {
    let config = MsdJobConfig {
        working_dir: root.to_path_buf(),
        render_plots: false,
        ..MsdJobConfig::default()
    };
    let report = run_msd_job(&config, &PlotConfig::default(), &mut NoProgress).unwrap();
    assert_eq!(report.n_failed(), 0);
}

fn merge_config(root: &Utf8Path) -> MergeJobConfig {
    MergeJobConfig {
        base_dir: root.to_path_buf(),
        render_plots: false,
        ..MergeJobConfig::default()
    }
}

#[test]
fn test_merge_tags_rows_with_source() {
    let (_tmp, root) = scratch_dir();
    copy_fixture("cell_a_allspots.csv", &root);
    derive_tables(&root);

    let msd_dir = root.join(MSD_CSV_DIR);
    // a second derived table with the same columns
    fs::copy(
        msd_dir.join("cell_a_allspots_msd.csv"),
        msd_dir.join("cell_c_allspots_msd.csv"),
    )
    .unwrap();
    fs::write(msd_dir.join("readme.txt"), "not a table").unwrap();

    let output = root.join("merged.csv");
    let summary = merge_msd_csvs(&msd_dir, &output, DEFAULT_MSD_FILE_PATTERN)
        .unwrap()
        .unwrap();

    assert_eq!(summary.inputs.len(), 2);
    assert_eq!(summary.rows, 14);

    let text = fs::read_to_string(&output).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 15);
    assert_eq!(
        lines[0],
        "Track_ID,Frame,Position_X,Position_Y,interval,msd,source_file"
    );
    assert_eq!(lines[1], "0,0,1,2,0,0,cell_a_allspots_msd.csv");
    assert!(lines[8].ends_with(",cell_c_allspots_msd.csv"));

    let merged = read_merged(&output).unwrap();
    assert_eq!(merged.sources.len(), 2);
    assert_eq!(merged.sources[0].source_file, "cell_a_allspots_msd.csv");
    assert_eq!(merged.curve_count(), 4);
    assert_eq!(merged.sources[1].tracks[0].curve.len(), 4);
}

#[test]
fn test_merge_is_deterministic() {
    let (_tmp, root) = scratch_dir();
    copy_fixture("cell_a_allspots.csv", &root);
    derive_tables(&root);

    let msd_dir = root.join(MSD_CSV_DIR);
    fs::copy(msd_dir.join("cell_a_allspots_msd.csv"), msd_dir.join("b_msd.csv")).unwrap();

    let first = root.join("first.csv");
    let second = root.join("second.csv");
    merge_msd_csvs(&msd_dir, &first, DEFAULT_MSD_FILE_PATTERN).unwrap();
    merge_msd_csvs(&msd_dir, &second, DEFAULT_MSD_FILE_PATTERN).unwrap();

    assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
    // inputs are taken in name order
    let text = fs::read_to_string(&first).unwrap();
    assert!(text.lines().nth(1).unwrap().ends_with(",b_msd.csv"));
}

#[test]
fn test_merge_rejects_mixed_layouts() {
    let (_tmp, root) = scratch_dir();
    copy_fixture("cell_a_allspots.csv", &root);
    copy_fixture("cell_b_trackmate.csv", &root);
    derive_tables(&root);

    let output = root.join(MSD_MERGE_DIR).join(MERGED_CSV_NAME);
    let err =
        merge_msd_csvs(&root.join(MSD_CSV_DIR), &output, DEFAULT_MSD_FILE_PATTERN).unwrap_err();

    assert!(matches!(err, MsdError::HeaderMismatch { .. }));
    assert!(!output.exists());
}

#[test]
fn test_merge_without_inputs() {
    let (_tmp, root) = scratch_dir();
    fs::create_dir_all(root.join(MSD_CSV_DIR)).unwrap();
    let output = root.join(MSD_MERGE_DIR).join(MERGED_CSV_NAME);

    let summary =
        merge_msd_csvs(&root.join(MSD_CSV_DIR), &output, DEFAULT_MSD_FILE_PATTERN).unwrap();

    assert!(summary.is_none());
    assert!(!output.exists());
    assert!(!root.join(MSD_MERGE_DIR).exists());
}

#[test]
fn test_merge_job_per_subfolder() {
    let (_tmp, root) = scratch_dir();
    copy_fixture("cell_a_allspots.csv", &root.join("exp1"));
    copy_fixture("cell_a_allspots.csv", &root.join("exp1").join("day2"));
    fs::create_dir_all(root.join("exp2")).unwrap();
    fs::create_dir_all(root.join("exp3").join(MSD_CSV_DIR)).unwrap();
    derive_tables(&root);

    let config = merge_config(&root);
    let report = run_merge_job(&config, &PlotConfig::default(), &mut NoProgress).unwrap();

    // exp2 has no msd_csv folder and is ignored, exp3 has an empty one
    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(report.n_done(), 1);
    assert_eq!(report.n_skipped(), 1);
    assert_eq!(report.outcomes[0].input, root.join("exp1"));
    assert_eq!(report.outcomes[1].input, root.join("exp3"));
    assert!(matches!(report.outcomes[1].status, FileStatus::Skipped(_)));

    let merged_csv = root.join("exp1").join(MSD_MERGE_DIR).join(MERGED_CSV_NAME);
    let merged = read_merged(&merged_csv).unwrap();
    // only exp1/msd_csv is merged, not the tables of exp1/day2
    assert_eq!(merged.sources.len(), 1);
    assert_eq!(merged.curve_count(), 2);
    assert!(!root.join("exp3").join(MSD_MERGE_DIR).exists());

    match &report.outcomes[0].status {
        FileStatus::Done(summary) => {
            assert_eq!(summary.output, merged_csv);
            assert_eq!(summary.curves, 2);
            assert_eq!(summary.rows, 7);
        }
        other => panic!("unexpected status {other:?}"),
    }
}

#[test]
fn test_merge_job_rerun_overwrites() {
    let (_tmp, root) = scratch_dir();
    copy_fixture("cell_a_allspots.csv", &root.join("exp1"));
    derive_tables(&root);

    let config = merge_config(&root);
    run_merge_job(&config, &PlotConfig::default(), &mut NoProgress).unwrap();
    let merged_csv = root.join("exp1").join(MSD_MERGE_DIR).join(MERGED_CSV_NAME);
    let bytes = fs::read(&merged_csv).unwrap();

    run_merge_job(&config, &PlotConfig::default(), &mut NoProgress).unwrap();
    assert_eq!(fs::read(&merged_csv).unwrap(), bytes);
}
