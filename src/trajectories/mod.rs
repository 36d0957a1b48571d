//! # Trajectories: grouping spots into time-ordered tracks
//!
//! The central type is [`TrackSet`], a fast hash map that buckets the spots of one table
//! per [`TrackId`]. The MSD job never trusts the on-disk row order: tracks are rebuilt
//! from the flat spot list and each bucket is re-sorted by time before any displacement
//! is computed.
//!
//! Modules
//! -----------------
//! * [`track_set`] – The [`TrackSetExt`](crate::trajectories::track_set::TrackSetExt) trait:
//!   construction from spots, deterministic iteration order, and per-set statistics.
//!
//! Data Model
//! -----------------
//! * **Key:** [`TrackId`] (track index assigned by the linker).
//! * **Value:** [`Track`] = `Vec<Spot>`, sorted by [`Spot::time_key`].
//! * **Set:** [`TrackSet`] = `HashMap<TrackId, Track, ahash::RandomState>`.
//!
//! Unassigned spots
//! -----------------
//! Spots with [`TrackId::Unassigned`] are not a trajectory. They are dropped while
//! grouping unless explicitly requested, in which case they form one bucket keyed by
//! `Unassigned`.
use std::collections::HashMap;

use ahash::RandomState;

use crate::{constants::TrackId, spots::Spot};

pub mod track_set;

/// Time-ordered spots of a single track.
pub type Track = Vec<Spot>;

/// A full set of tracks read from one spot table.
///
/// Uses [`ahash`](https://docs.rs/ahash) for fast hashing.
pub type TrackSet = HashMap<TrackId, Track, RandomState>;
