use std::{
    fmt,
    time::{Duration, Instant},
};

use super::{Config, mesh::Mesh};

/// Why a MADS run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The counted evaluation budget was exhausted.
    MaxBbEval,

    /// The wall-clock limit elapsed.
    MaxTime,

    /// The mesh was refined below its minimum size.
    MeshConverged,

    /// The iteration limit was reached.
    MaxIterations,

    /// A feasible objective at or below the target was found.
    TargetReached,

    /// An observer returned [`Action::StopEarly`](super::Action::StopEarly).
    StoppedByObserver,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::MaxBbEval => "max blackbox evaluations reached",
            Self::MaxTime => "max time reached",
            Self::MeshConverged => "mesh converged",
            Self::MaxIterations => "max iterations reached",
            Self::TargetReached => "objective target reached",
            Self::StoppedByObserver => "stopped by observer",
        };
        f.write_str(text)
    }
}

/// Checks the stopping criteria of one run.
#[derive(Debug, Clone)]
pub(super) struct StoppingController {
    max_bb_eval: Option<usize>,
    max_time: Option<Duration>,
    max_iterations: Option<usize>,
    f_target: Option<f64>,
    start: Instant,
}

impl StoppingController {
    /// Starts the wall clock.
    pub(super) fn start(config: &Config) -> Self {
        Self {
            max_bb_eval: config.max_bb_eval(),
            max_time: config.max_time(),
            max_iterations: config.max_iterations(),
            f_target: config.f_target(),
            start: Instant::now(),
        }
    }

    pub(super) fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Counted evaluations still allowed, or `None` when unlimited.
    pub(super) fn remaining(&self, counted: usize) -> Option<usize> {
        self.max_bb_eval.map(|max| max.saturating_sub(counted))
    }

    /// Checks the limits that may interrupt an iteration between evaluations.
    pub(super) fn check_evaluation(&self, counted: usize, best_f: Option<f64>) -> Option<StopReason> {
        if self.remaining(counted) == Some(0) {
            return Some(StopReason::MaxBbEval);
        }
        if self.max_time.is_some_and(|max| self.elapsed() >= max) {
            return Some(StopReason::MaxTime);
        }
        if let (Some(target), Some(f)) = (self.f_target, best_f) {
            if f <= target {
                return Some(StopReason::TargetReached);
            }
        }
        None
    }

    /// Checks every criterion at the end of an iteration.
    pub(super) fn check_iteration(
        &self,
        iteration: usize,
        counted: usize,
        best_f: Option<f64>,
        mesh: &Mesh,
    ) -> Option<StopReason> {
        if let Some(reason) = self.check_evaluation(counted, best_f) {
            return Some(reason);
        }
        if mesh.is_converged() {
            return Some(StopReason::MeshConverged);
        }
        if self.max_iterations.is_some_and(|max| iteration >= max) {
            return Some(StopReason::MaxIterations);
        }
        None
    }
}
