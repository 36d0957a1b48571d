//! # Track set construction and statistics
//!
//! Build a [`TrackSet`] from a flat list of spots, iterate it in a deterministic order,
//! and summarize it.
//!
//! ## Overview
//! -----------------
//! This module implements the [`TrackSetExt`] trait on `TrackSet`, providing:
//!
//! * `from_spots` – group spots per track and sort each track by time,
//! * `sorted_ids` – track ids in ascending order, used for every written output,
//! * `total_spots` / `number_of_tracks` – quick set-level metrics,
//! * `length_stats` – summary statistics on track lengths.
//!
//! ## Ordering
//! -----------------
//! Spots inside a track are sorted by [`Spot::time_key`] with a stable sort, so that
//! spots sharing a time key keep their table order. Spots without a time key are
//! placed last.
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use crate::{
    constants::TrackId,
    spots::Spot,
    trajectories::{Track, TrackSet},
};

/// Summary statistics for per-track spot counts.
///
/// Percentiles are computed using the *nearest-rank* method:
/// the index is `round(q × (N-1))` for quantile `q ∈ [0,1]`, clamped to valid range.
///
/// Display
/// -----------------
/// * `format!("{}", stats)` – compact single-line summary, e.g.:
///   ```text
///   min=2, p25=4, median=8, p95=15, max=20
///   ```
///
/// * `format!("{:#}", stats)` – multi-line table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackLengthStats {
    pub min: usize,
    pub p25: usize,
    pub median: usize,
    pub p95: usize,
    pub max: usize,
}

impl fmt::Display for TrackLengthStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            writeln!(f, "Spot count per track - summary")?;
            writeln!(f, "------------------------------")?;
            writeln!(f, "min    : {}", self.min)?;
            writeln!(f, "p25    : {}", self.p25)?;
            writeln!(f, "median : {}", self.median)?;
            writeln!(f, "p95    : {}", self.p95)?;
            write!(f, "max    : {}", self.max)
        } else {
            write!(
                f,
                "min={}, p25={}, median={}, p95={}, max={}",
                self.min, self.p25, self.median, self.p95, self.max
            )
        }
    }
}

/// Total order on optional time keys: missing keys last, NaN after every number.
fn cmp_time_key(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub trait TrackSetExt {
    /// Group spots per track and sort every track by time.
    ///
    /// Arguments
    /// -----------------
    /// * `spots`: Spots of one table, in any order.
    /// * `include_unassigned`: Keep spots with [`TrackId::Unassigned`] as one extra bucket.
    ///
    /// Return
    /// ----------
    /// * A [`TrackSet`] whose tracks are sorted by [`Spot::time_key`].
    fn from_spots<I>(spots: I, include_unassigned: bool) -> Self
    where
        I: IntoIterator<Item = Spot>;

    /// Track ids in ascending order (`Assigned` ids first, then `Unassigned`).
    fn sorted_ids(&self) -> Vec<TrackId>;

    /// Count the spots across all tracks.
    fn total_spots(&self) -> usize;

    /// Number of distinct tracks in the set.
    fn number_of_tracks(&self) -> usize;

    /// Distribution statistics of the number of spots per track, `None` if the set is empty.
    fn length_stats(&self) -> Option<TrackLengthStats>;
}

impl TrackSetExt for TrackSet {
    fn from_spots<I>(spots: I, include_unassigned: bool) -> Self
    where
        I: IntoIterator<Item = Spot>,
    {
        let mut set: TrackSet = HashMap::default();
        for spot in spots {
            if !include_unassigned && !spot.track_id.is_assigned() {
                continue;
            }
            set.entry(spot.track_id).or_default().push(spot);
        }

        for track in set.values_mut() {
            track.sort_by(|a, b| cmp_time_key(a.time_key(), b.time_key()));
        }
        set
    }

    fn sorted_ids(&self) -> Vec<TrackId> {
        let mut ids: Vec<TrackId> = self.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    #[inline]
    fn total_spots(&self) -> usize {
        self.values().map(|track: &Track| track.len()).sum()
    }

    #[inline]
    fn number_of_tracks(&self) -> usize {
        self.len()
    }

    fn length_stats(&self) -> Option<TrackLengthStats> {
        let mut counts: Vec<usize> = self.values().map(|track| track.len()).collect();
        if counts.is_empty() {
            return None;
        }
        counts.sort_unstable();

        #[inline]
        fn q_index(n: usize, q: f64) -> usize {
            let pos = q * (n as f64 - 1.0);
            let idx = pos.round() as isize;
            idx.clamp(0, (n as isize) - 1) as usize
        }

        let n = counts.len();
        Some(TrackLengthStats {
            min: counts[0],
            p25: counts[q_index(n, 0.25)],
            median: counts[q_index(n, 0.50)],
            p95: counts[q_index(n, 0.95)],
            max: counts[n - 1],
        })
    }
}

#[cfg(test)]
mod track_set_test {
    use super::*;

    fn spot(id: u64, track: TrackId, frame: u32) -> Spot {
        Spot::new(id, track, frame, f64::from(frame), 0.0)
    }

    #[test]
    fn test_from_spots_groups_and_sorts() {
        let spots = vec![
            spot(0, TrackId::Assigned(1), 2),
            spot(1, TrackId::Assigned(0), 1),
            spot(2, TrackId::Assigned(1), 0),
            spot(3, TrackId::Unassigned, 0),
            spot(4, TrackId::Assigned(1), 1),
        ];

        let set = TrackSet::from_spots(spots, false);
        assert_eq!(set.number_of_tracks(), 2);
        assert_eq!(set.total_spots(), 4);

        let frames: Vec<Option<u32>> = set[&TrackId::Assigned(1)]
            .iter()
            .map(|s| s.frame)
            .collect();
        assert_eq!(frames, vec![Some(0), Some(1), Some(2)]);
        assert_eq!(
            set.sorted_ids(),
            vec![TrackId::Assigned(0), TrackId::Assigned(1)]
        );
    }

    #[test]
    fn test_unassigned_bucket_on_request() {
        let spots = vec![
            spot(0, TrackId::Unassigned, 0),
            spot(1, TrackId::Assigned(3), 0),
        ];
        let set = TrackSet::from_spots(spots, true);
        assert_eq!(
            set.sorted_ids(),
            vec![TrackId::Assigned(3), TrackId::Unassigned]
        );
    }

    #[test]
    fn test_missing_time_key_sorted_last() {
        let mut no_frame = spot(0, TrackId::Assigned(0), 0);
        no_frame.frame = None;
        let spots = vec![no_frame, spot(1, TrackId::Assigned(0), 5)];

        let set = TrackSet::from_spots(spots, false);
        let ids: Vec<u64> = set[&TrackId::Assigned(0)]
            .iter()
            .map(|s| s.spot_id)
            .collect();
        assert_eq!(ids, vec![1, 0]);
    }

    #[test]
    fn test_length_stats() {
        let mut spots = Vec::new();
        let mut next_id = 0;
        for (track, len) in [(0_u64, 2_u32), (1, 4), (2, 8), (3, 15), (4, 20)] {
            for frame in 0..len {
                spots.push(spot(next_id, TrackId::Assigned(track), frame));
                next_id += 1;
            }
        }
        let set = TrackSet::from_spots(spots, false);

        let stats = set.length_stats().unwrap();
        assert_eq!(
            stats,
            TrackLengthStats {
                min: 2,
                p25: 4,
                median: 8,
                p95: 20,
                max: 20
            }
        );
        assert_eq!(
            format!("{stats}"),
            "min=2, p25=4, median=8, p95=20, max=20"
        );
        assert!(TrackSet::default().length_stats().is_none());
    }
}
