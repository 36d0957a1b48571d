//! Terminal progress bar for the batch jobs (feature `progress`).
//!
//! [`IndicatifProgress`] draws one `indicatif` bar per stage (images, spot tables,
//! experiment folders). Next to the bar it shows how long the last unit of work took
//! and a smoothed time per unit, so a stage over files of uneven size still gives a
//! readable estimate.
//!
//! Smoothing
//! -----------------
//! [`UnitClock`] keeps `mean ← w·last + (1 − w)·mean` with weight `w ∈ (0, 1]`; the
//! first unit of a stage seeds the mean.
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

use crate::progress::ProgressHook;

/// Weight of the latest unit in the smoothed time per unit.
const UNIT_WEIGHT: f64 = 0.2;

const BAR_TEMPLATE: &str =
    "{prefix} {bar:40.cyan/blue} {pos}/{len} ({percent:>3}%) | ETA {eta_precise} | {msg}";

/// Wall-clock time of each unit of work and its smoothed mean.
#[derive(Debug, Clone)]
pub struct UnitClock {
    started: Instant,
    mean: Option<Duration>,
    weight: f64,
}

impl UnitClock {
    pub fn new(weight: f64) -> Self {
        UnitClock {
            started: Instant::now(),
            mean: None,
            weight,
        }
    }

    /// Start a new stage: the clock restarts and the mean is forgotten.
    pub fn restart(&mut self) {
        self.started = Instant::now();
        self.mean = None;
    }

    /// Close the current unit, returning its duration.
    pub fn lap(&mut self) -> Duration {
        let now = Instant::now();
        let last = now.duration_since(self.started);
        self.started = now;
        self.mean = Some(match self.mean {
            None => last,
            Some(mean) => last.mul_f64(self.weight) + mean.mul_f64(1.0 - self.weight),
        });
        last
    }

    /// Smoothed time per unit, zero before the first lap.
    pub fn mean(&self) -> Duration {
        self.mean.unwrap_or_default()
    }
}

/// Compact duration: `"253µs"`, `"42ms"` or `"3.14s"`.
pub fn short_duration(d: Duration) -> String {
    match d.as_micros() {
        us if us < 1_000 => format!("{us}µs"),
        us if us < 1_000_000 => format!("{}ms", us / 1_000),
        _ => format!("{:.2}s", d.as_secs_f64()),
    }
}

/// Progress bar drawn on stderr, one bar per stage.
pub struct IndicatifProgress {
    bar: Option<ProgressBar>,
    clock: UnitClock,
}

impl Default for IndicatifProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl IndicatifProgress {
    pub fn new() -> Self {
        IndicatifProgress {
            bar: None,
            clock: UnitClock::new(UNIT_WEIGHT),
        }
    }
}

impl ProgressHook for IndicatifProgress {
    fn start(&mut self, label: &str, total: usize) {
        let pb = ProgressBar::new((total as u64).max(1));
        let style = ProgressStyle::with_template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        pb.set_prefix(label.to_string());
        pb.enable_steady_tick(Duration::from_millis(200));

        self.clock.restart();
        self.bar = Some(pb);
    }

    fn step(&mut self) {
        let last = self.clock.lap();
        if let Some(pb) = &self.bar {
            pb.set_message(format!(
                "last file: {}, per file: {}",
                short_duration(last),
                short_duration(self.clock.mean())
            ));
            pb.inc(1);
        }
    }

    fn finish(&mut self) {
        if let Some(pb) = self.bar.take() {
            pb.disable_steady_tick();
            pb.finish_and_clear();
        }
    }
}
