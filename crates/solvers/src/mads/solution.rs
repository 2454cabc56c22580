use std::time::Duration;

use super::{Record, Stats, StopReason};

/// A point reported in a [`Solution`].
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub x: Vec<f64>,

    /// Raw blackbox outputs at `x`.
    pub outputs: Vec<f64>,

    pub objective: f64,

    /// Aggregate constraint violation `h`, zero for feasible points.
    pub violation: f64,
}

impl From<&Record> for Point {
    fn from(record: &Record) -> Self {
        Self {
            x: record.x.clone(),
            outputs: record.outputs.clone(),
            objective: record.summary.f,
            violation: record.summary.h,
        }
    }
}

/// The result of a MADS run.
#[derive(Debug, Clone)]
pub struct Solution {
    /// Why the run stopped.
    pub status: StopReason,

    /// Best feasible point, if any was found.
    pub best_feasible: Option<Point>,

    /// Best infeasible point under the barrier, if any was retained.
    pub best_infeasible: Option<Point>,

    /// Evaluations counted toward the budget.
    pub bb_eval: usize,

    /// Blackbox calls, including uncounted and failed ones.
    pub blackbox_calls: usize,

    /// Trial points answered from the cache.
    pub cache_hits: usize,

    /// Completed iterations.
    pub iterations: usize,

    /// Largest mesh size at termination.
    pub mesh_size: f64,

    /// Largest poll size at termination.
    pub poll_size: f64,

    pub stats: Stats,

    pub elapsed: Duration,
}

impl Solution {
    /// Returns the best feasible point, or the best infeasible one if no
    /// feasible point was found.
    #[must_use]
    pub fn best(&self) -> Option<&Point> {
        self.best_feasible.as_ref().or(self.best_infeasible.as_ref())
    }
}
