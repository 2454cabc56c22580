use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::trace;

use super::{
    Config, Phase, Point, Progress, Solution, StopReason,
    directions::Domain,
    history::History,
    incumbents::Incumbents,
    mesh::Mesh,
    stats::StatsAccumulator,
    stop::StoppingController,
};

/// Everything one run owns, created by the driver and passed explicitly.
pub(super) struct RunContext<'c> {
    pub(super) config: &'c Config,
    pub(super) phase: Phase,
    pub(super) mesh: Mesh,
    pub(super) history: History,
    pub(super) incumbents: Incumbents,
    pub(super) stats: StatsAccumulator,
    pub(super) stop: StoppingController,
    pub(super) rng: ChaCha8Rng,
    pub(super) iteration: usize,

    /// Displacement of the frame center in the last iteration, if it succeeded.
    pub(super) last_success: Option<Vec<f64>>,
}

impl<'c> RunContext<'c> {
    pub(super) fn new(config: &'c Config) -> Self {
        Self {
            config,
            phase: Phase::Init,
            mesh: config.initial_mesh(),
            history: History::default(),
            incumbents: Incumbents::new(config.barrier()),
            stats: StatsAccumulator::new(config.output_types()),
            stop: StoppingController::start(config),
            rng: ChaCha8Rng::seed_from_u64(config.seed()),
            iteration: 0,
            last_success: None,
        }
    }

    /// Moves the state machine to `phase`.
    pub(super) fn enter(&mut self, phase: Phase) {
        debug_assert_ne!(self.phase, Phase::Terminated, "terminated runs never resume");
        trace!(from = %self.phase, to = %phase, iteration = self.iteration, "phase change");
        self.phase = phase;
    }

    pub(super) fn domain(&self) -> Domain<'c> {
        Domain {
            lower: self.config.lower(),
            upper: self.config.upper(),
            input_types: self.config.input_types(),
        }
    }

    /// History index of the point polled around.
    ///
    /// The best feasible point, else the best infeasible point, else the
    /// initial point, which is always the first record.
    pub(super) fn frame_center(&self) -> usize {
        self.incumbents
            .feasible()
            .or(self.incumbents.infeasible())
            .unwrap_or(0)
    }

    pub(super) fn best_feasible_f(&self) -> Option<f64> {
        self.incumbents
            .feasible()
            .map(|i| self.history.get(i).summary.f)
    }

    pub(super) fn progress(&self) -> Progress {
        Progress {
            iteration: self.iteration,
            bb_eval: self.history.counted(),
            mesh_index: self.mesh.index(),
            mesh_size: self.mesh.mesh_size(),
            poll_size: self.mesh.poll_size(),
            elapsed: self.stop.elapsed(),
            stats: self.stats.snapshot(),
        }
    }

    /// Stops the state machine and builds the run result.
    pub(super) fn into_solution(mut self, status: StopReason) -> Solution {
        self.enter(Phase::Terminated);
        let point = |index: Option<usize>| index.map(|i| Point::from(self.history.get(i)));

        Solution {
            status,
            best_feasible: point(self.incumbents.feasible()),
            best_infeasible: point(self.incumbents.infeasible()),
            bb_eval: self.history.counted(),
            blackbox_calls: self.history.calls(),
            cache_hits: self.history.cache_hits(),
            iterations: self.iteration,
            mesh_size: self.mesh.mesh_size(),
            poll_size: self.mesh.poll_size(),
            stats: self.stats.snapshot(),
            elapsed: self.stop.elapsed(),
        }
    }
}
