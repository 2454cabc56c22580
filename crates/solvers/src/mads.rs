//! Mesh adaptive direct search (MADS) for constrained blackbox optimization.
//!
//! # Algorithm
//!
//! MADS minimizes an objective returned by an opaque [`Blackbox`] without
//! derivatives. Every trial point lies on a mesh whose size `δ` shrinks after
//! failures and grows after successes. Each iteration runs an optional search
//! step (any strategy that proposes mesh points) followed by a poll step that
//! evaluates a positive spanning set of directions scaled by the poll size `Δ`
//! around the current frame center. The run stops on an evaluation budget,
//! wall-clock limit, iteration limit, objective target, observer request, or
//! once the mesh has been refined below its minimum size.
//!
//! # Constraints
//!
//! Blackbox outputs are tagged with an [`OutputType`]. Constraints follow the
//! `c(x) <= 0` convention and are aggregated by a barrier:
//!
//! - `EB`: extreme barrier, infeasible points are rejected outright
//! - `PB`/`CSTR`: progressive barrier, infeasible points are kept as a
//!   secondary incumbent while the violation threshold tightens
//! - `F`: filter, infeasible points are kept when non-dominated in `(h, f)`
//! - `PEB`: hybrid, rejected above a fixed violation threshold
//!
//! # Observer Events
//!
//! The solver emits an [`Event`] for every blackbox evaluation (or failure) and
//! one at the end of each iteration. Observers can return
//! [`Action::StopEarly`] to halt and return the best points found so far.
//!
//! # Parallel polling
//!
//! [`minimize_parallel`] evaluates the trial points of a step concurrently,
//! in batches no larger than the remaining evaluation budget. Incumbent
//! updates are applied in ascending direction order once a batch is back, and
//! opportunistic polling is disabled, so results match a sequential run with
//! `opportunistic = false`.
//!
//! [`Blackbox`]: mads_core::Blackbox
//! [`OutputType`]: mads_core::OutputType

mod action;
mod barrier;
mod config;
mod context;
mod directions;
mod engine;
mod error;
mod evaluate;
mod event;
mod history;
mod incumbents;
mod mesh;
mod params;
mod phase;
mod search;
mod solution;
mod stats;
mod stop;

#[cfg(test)]
mod tests;

pub use action::Action;
pub use barrier::{BarrierKind, ConstraintSpecError, Summary};
pub use config::{Config, ConfigError, DisplayOptions};
pub use directions::DirectionType;
pub use error::Error;
pub use evaluate::EvalError;
pub use event::{Event, Progress};
pub use history::Record;
pub use incumbents::Improvement;
pub use params::{Parameters, ParamsError};
pub use phase::Phase;
pub use search::{
    LatinHypercube, NelderMeadSearch, NoSearch, RandomSearch, SearchContext, SearchStrategy,
    SearchType, SpeculativeSearch,
};
pub use solution::{Point, Solution};
pub use stats::Stats;
pub use stop::StopReason;

use mads_core::{Blackbox, Observer};

use evaluate::{Parallel, Sequential};

/// Minimizes the blackbox objective using mesh adaptive direct search.
///
/// The search step is built from [`Config::search`]. The observer receives an
/// [`Event`] for each evaluation and iteration.
///
/// # Errors
///
/// Returns an error if the initial point cannot be evaluated.
/// Failed evaluations after the first are reported to the observer and skipped.
pub fn minimize<B, Obs>(blackbox: &B, config: &Config, observer: Obs) -> Result<Solution, Error>
where
    B: Blackbox,
    Obs: for<'a> Observer<Event<'a>, Action>,
{
    let mut search = config.search().build();
    let executor = Sequential::new(blackbox, config.output_types().len());
    engine::run(&executor, config, search.as_mut(), observer)
}

/// Minimizes the blackbox objective without observer support.
///
/// This is a convenience wrapper around [`minimize`] that uses a no-op observer.
///
/// # Errors
///
/// Returns an error if the initial point cannot be evaluated.
pub fn minimize_unobserved<B>(blackbox: &B, config: &Config) -> Result<Solution, Error>
where
    B: Blackbox,
{
    minimize(blackbox, config, ())
}

/// Minimizes the blackbox objective with a caller-provided search strategy.
///
/// The strategy replaces the one configured by [`Config::search`].
///
/// # Errors
///
/// Returns an error if the initial point cannot be evaluated.
pub fn minimize_with_search<B, S, Obs>(
    blackbox: &B,
    config: &Config,
    search: &mut S,
    observer: Obs,
) -> Result<Solution, Error>
where
    B: Blackbox,
    S: SearchStrategy + ?Sized,
    Obs: for<'a> Observer<Event<'a>, Action>,
{
    let executor = Sequential::new(blackbox, config.output_types().len());
    engine::run(&executor, config, search, observer)
}

/// Minimizes the blackbox objective, evaluating each poll step in parallel.
///
/// Poll points are evaluated on the `rayon` thread pool, at most as many at
/// once as counted evaluations remain. Updates are applied in direction order
/// after each batch completes and polling is never opportunistic, so the
/// result is reproducible.
///
/// # Errors
///
/// Returns an error if the initial point cannot be evaluated.
pub fn minimize_parallel<B, Obs>(
    blackbox: &B,
    config: &Config,
    observer: Obs,
) -> Result<Solution, Error>
where
    B: Blackbox + Sync,
    Obs: for<'a> Observer<Event<'a>, Action>,
{
    let mut search = config.search().build();
    let executor = Parallel::new(blackbox, config.output_types().len());
    engine::run(&executor, config, search.as_mut(), observer)
}

/// Validates the parameters and runs an unobserved minimization.
///
/// # Errors
///
/// Returns [`Error::Config`] if the parameters are invalid, before any
/// evaluation, or an error if the initial point cannot be evaluated.
pub fn run<B>(blackbox: &B, parameters: &Parameters) -> Result<Solution, Error>
where
    B: Blackbox,
{
    let config = parameters.validate()?;
    minimize_unobserved(blackbox, &config)
}
