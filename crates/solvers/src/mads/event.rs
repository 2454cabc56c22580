use std::time::Duration;

use super::{EvalError, Improvement, Phase, Record, Stats};

/// Events emitted by the MADS solver.
///
/// Records and points are borrowed from the run history and are only valid for
/// the duration of the observer call.
#[derive(Debug)]
pub enum Event<'a> {
    /// A blackbox evaluation succeeded.
    Evaluated {
        /// The new history record.
        record: &'a Record,

        /// Which incumbent, if any, the record replaced.
        improvement: Improvement,

        progress: Progress,
    },

    /// A blackbox evaluation failed and was discarded.
    Failed {
        /// The point that could not be evaluated.
        x: &'a [f64],

        /// Phase that produced the point.
        phase: Phase,

        error: &'a EvalError,

        progress: Progress,
    },

    /// An iteration finished its update step.
    Iteration {
        /// Whether the iteration improved an incumbent.
        success: bool,

        best_feasible: Option<&'a Record>,

        best_infeasible: Option<&'a Record>,

        progress: Progress,
    },
}

impl Event<'_> {
    /// Returns the run progress at the time of the event.
    #[must_use]
    pub fn progress(&self) -> &Progress {
        match self {
            Self::Evaluated { progress, .. }
            | Self::Failed { progress, .. }
            | Self::Iteration { progress, .. } => progress,
        }
    }
}

/// Counters and mesh state attached to every [`Event`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    /// Completed iterations.
    pub iteration: usize,

    /// Evaluations counted toward the budget.
    pub bb_eval: usize,

    /// Net number of mesh refinements.
    pub mesh_index: i32,

    pub mesh_size: f64,

    pub poll_size: f64,

    /// Wall-clock time since the run started.
    pub elapsed: Duration,

    pub stats: Stats,
}
