//! Progress reporting hook for the batch jobs.
//!
//! Every job takes a `&mut dyn ProgressHook` and reports one `step` per unit of work
//! (one image, one spot table, one merged file). Reporting is purely observational:
//! jobs behave identically whatever the hook does.
//!
//! Implementations
//! -----------------
//! * [`NoProgress`] – ignores every event.
//! * [`FnProgress`] – forwards `(label, done, total)` to a closure after every step.
//! * `IndicatifProgress` – terminal bar, available with the `progress` feature.

/// Observer of long-running loops.
pub trait ProgressHook {
    /// A stage with `total` units of work begins.
    fn start(&mut self, _label: &str, _total: usize) {}

    /// One unit of work completed.
    fn step(&mut self);

    /// The current stage ended, normally or not.
    fn finish(&mut self) {}
}

/// Hook that reports nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressHook for NoProgress {
    fn step(&mut self) {}
}

/// Adapter turning a closure into a [`ProgressHook`].
///
/// The closure receives the stage label, the number of completed units and the stage
/// total.
pub struct FnProgress<F>
where
    F: FnMut(&str, usize, usize),
{
    callback: F,
    label: String,
    done: usize,
    total: usize,
}

impl<F> FnProgress<F>
where
    F: FnMut(&str, usize, usize),
{
    pub fn new(callback: F) -> Self {
        FnProgress {
            callback,
            label: String::new(),
            done: 0,
            total: 0,
        }
    }
}

impl<F> ProgressHook for FnProgress<F>
where
    F: FnMut(&str, usize, usize),
{
    fn start(&mut self, label: &str, total: usize) {
        self.label = label.to_string();
        self.done = 0;
        self.total = total;
    }

    fn step(&mut self) {
        self.done += 1;
        (self.callback)(&self.label, self.done, self.total);
    }
}
