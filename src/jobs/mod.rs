//! # Batch jobs
//!
//! Folder-level drivers tying the library together:
//!
//! * [`msd_job`] – walk a directory tree and compute the MSD tables and per-track plots
//!   of every raw spot table found in it.
//! * [`merge_job`] – merge the MSD tables of every experiment folder and draw the
//!   overview plot.
//!
//! The tracking job lives in [`crate::tracking::batch`] since it needs a backend.
//!
//! Both jobs return a [`BatchReport`](crate::display::BatchReport). A failure on a
//! single input is logged and recorded in the report; only configuration errors and
//! failures to read the folders themselves abort a job.
use camino::{Utf8Path, Utf8PathBuf};

use crate::{
    constants::{MSD_CSV_DIR, MSD_MERGE_DIR, MSD_PLOTS_DIR},
    msd_errors::MsdError,
};

pub mod merge_job;
pub mod msd_job;

/// Folders written by the jobs, never walked as inputs.
pub const OUTPUT_DIRS: [&str; 3] = [MSD_CSV_DIR, MSD_PLOTS_DIR, MSD_MERGE_DIR];

/// Sub-folders directly inside `dir`, sorted by path.
pub(crate) fn sub_dirs(dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>, MsdError> {
    let mut dirs = Vec::new();
    for entry in dir.read_dir_utf8()? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path().to_path_buf());
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// `root` and every folder below it, depth-first in name order, without the job
/// output folders.
pub(crate) fn walk_input_dirs(root: &Utf8Path) -> Result<Vec<Utf8PathBuf>, MsdError> {
    let mut out = vec![root.to_path_buf()];
    let mut i = 0;
    while i < out.len() {
        let children: Vec<Utf8PathBuf> = sub_dirs(&out[i])?
            .into_iter()
            .filter(|d| d.file_name().map_or(true, |name| !OUTPUT_DIRS.contains(&name)))
            .collect();
        // keep depth-first order: children right after their parent
        out.splice(i + 1..i + 1, children);
        i += 1;
    }
    Ok(out)
}

/// `.csv` files directly inside `dir` (extension compared case-insensitively), sorted.
pub(crate) fn csv_files_in(dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>, MsdError> {
    let mut files = Vec::new();
    for entry in dir.read_dir_utf8()? {
        let entry = entry?;
        let is_csv = entry
            .path()
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if is_csv && entry.file_type()?.is_file() {
            files.push(entry.path().to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod jobs_test {
    use super::*;
    use std::fs;

    #[test]
    fn test_walk_skips_output_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).unwrap();
        for d in ["b", "a/inner", "a/msd_csv", "msd_plots/x", "c"] {
            fs::create_dir_all(root.join(d)).unwrap();
        }

        let dirs = walk_input_dirs(&root).unwrap();
        assert_eq!(
            dirs,
            vec![
                root.clone(),
                root.join("a"),
                root.join("a/inner"),
                root.join("b"),
                root.join("c"),
            ]
        );
    }

    #[test]
    fn test_csv_files_in() {
        let tmp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).unwrap();
        fs::write(root.join("b.csv"), "").unwrap();
        fs::write(root.join("a.CSV"), "").unwrap();
        fs::write(root.join("notes.txt"), "").unwrap();
        fs::create_dir_all(root.join("dir.csv")).unwrap();

        assert_eq!(csv_files_in(&root).unwrap(), vec![root.join("a.CSV"), root.join("b.csv")]);
    }
}
