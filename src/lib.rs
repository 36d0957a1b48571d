pub mod config;
pub mod constants;
pub mod display;
pub mod jobs;
pub mod merge;
pub mod msd;
pub mod msd_errors;
pub mod plot;
pub mod progress;
#[cfg(feature = "progress")]
pub mod progress_bar;
pub mod spots;
pub mod tracking;
pub mod trajectories;

pub use msd_errors::MsdError;
