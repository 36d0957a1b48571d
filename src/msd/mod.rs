//! # Mean Squared Displacement
//!
//! The MSD of a track at lag `k` is the mean, over every pair of samples `k` positions
//! apart, of the squared planar displacement:
//!
//! ```text
//! MSD(k) = 1/(n-k) · Σ_{i=0}^{n-k-1} |p_{i+k} − p_i|²,     k = 1 … n-1
//! MSD(0) = 0
//! ```
//!
//! with the lag time `k · Δt`. The estimator enumerates every pair directly
//! (`O(n²)` in the track length) in double precision, without smoothing or windowing.
//!
//! Modules
//! -----------------
//! * [`msd_table`] – Derived MSD tables: build rows from a spot table, write and read them.
//!
//! Non-finite positions
//! -----------------
//! [`compute_msd`] is plain arithmetic: a `NaN` coordinate makes every lag it
//! contributes to `NaN`. [`msd_for_track`] is the entry point used by the jobs; it checks
//! the positions first and applies the configured [`NonFinitePolicy`].
use log::warn;
use nalgebra::Vector2;

use crate::{
    config::{MsdParams, NonFinitePolicy},
    constants::TrackId,
    msd_errors::MsdError,
    spots::Spot,
};

pub mod msd_table;

/// One point of an MSD curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MsdPoint {
    /// Lag time `k · Δt`, in seconds.
    pub lag_time: f64,
    /// Mean squared displacement at this lag, in squared position units.
    pub msd: f64,
}

/// MSD values for lags `0 … n-1` of a track of `n` samples.
pub type MsdCurve = Vec<MsdPoint>;

/// Compute the MSD curve of a sequence of time-ordered positions.
///
/// Arguments
/// -----------------
/// * `positions` – Planar positions, one per sample, in time order.
/// * `time_interval` – Time between two consecutive samples.
///
/// Return
/// ----------
/// * A curve with one point per sample, the first being `(0, 0)`. An empty input gives
///   an empty curve.
pub fn compute_msd(positions: &[Vector2<f64>], time_interval: f64) -> MsdCurve {
    let n = positions.len();
    let mut curve = MsdCurve::with_capacity(n);

    if n == 0 {
        return curve;
    }
    curve.push(MsdPoint {
        lag_time: 0.0,
        msd: 0.0,
    });

    for lag in 1..n {
        let sum: f64 = positions
            .iter()
            .zip(&positions[lag..])
            .map(|(p0, p1)| (p1 - p0).norm_squared())
            .sum();
        curve.push(MsdPoint {
            lag_time: lag as f64 * time_interval,
            msd: sum / (n - lag) as f64,
        });
    }
    curve
}

/// Compute the MSD curve of one track under the configured policy.
///
/// The spots must already be sorted by time (see
/// [`TrackSetExt::from_spots`](crate::trajectories::track_set::TrackSetExt::from_spots)).
///
/// Return
/// ----------
/// * `Ok(Some(curve))` – the curve of the track.
/// * `Ok(None)` – the track contains a missing or non-finite position and the policy is
///   [`NonFinitePolicy::SkipTrack`].
/// * `Err(MsdError::NonFinitePosition)` – same situation under [`NonFinitePolicy::Reject`].
pub fn msd_for_track(
    track_id: TrackId,
    track: &[Spot],
    params: &MsdParams,
) -> Result<Option<MsdCurve>, MsdError> {
    let positions: Vec<Vector2<f64>> = track.iter().map(Spot::xy).collect();

    if params.non_finite != NonFinitePolicy::Propagate {
        if let Some(index) = positions.iter().position(|p| !(p.x.is_finite() && p.y.is_finite())) {
            if params.non_finite == NonFinitePolicy::SkipTrack {
                warn!("Track {track_id}: invalid position at sample {index}, track skipped");
                return Ok(None);
            }
            return Err(MsdError::NonFinitePosition {
                track: track_id,
                index,
            });
        }
    }

    Ok(Some(compute_msd(&positions, params.time_interval)))
}
