//! Capability traits for generic observers.
//!
//! These traits abstract over event and action types, so an observer can be
//! written once against the capabilities it needs.
//!
//! # Event traits
//!
//! - [`HasObjective`]: events that carry an objective value
//! - [`HasViolation`]: events that carry a constraint violation
//!
//! # Action traits
//!
//! - [`CanStopEarly`]: actions that can signal early termination
//!
//! # Example
//!
//! ```rust
//! use mads_core::Observer;
//! use mads_observers::traits::{CanStopEarly, HasObjective};
//!
//! struct GoodEnough {
//!     target: f64,
//! }
//!
//! impl<E: HasObjective, A: CanStopEarly> Observer<E, A> for GoodEnough {
//!     fn observe(&mut self, event: &E) -> Option<A> {
//!         (event.objective() <= self.target).then(A::stop_early)
//!     }
//! }
//! ```

use mads_solvers::mads;

/// An event that carries an objective value.
pub trait HasObjective {
    /// Returns the objective for this event.
    ///
    /// Returns `f64::NAN` when the event represents an error or no objective
    /// is available.
    fn objective(&self) -> f64;
}

/// An event that carries an aggregate constraint violation.
pub trait HasViolation {
    /// Returns the violation `h` for this event, zero when feasible.
    ///
    /// Returns `f64::NAN` when the event represents an error or no point is
    /// available.
    fn violation(&self) -> f64;
}

/// An action type that can signal early termination.
pub trait CanStopEarly {
    /// Returns the action that stops the solver early.
    fn stop_early() -> Self;
}

// --- HasObjective / HasViolation for mads::Event ---

/// Evaluations report their own values. Iterations report the best feasible
/// point, or the best infeasible point when no feasible one is known.
impl HasObjective for mads::Event<'_> {
    fn objective(&self) -> f64 {
        match self {
            mads::Event::Evaluated { record, .. } => record.summary.f,
            mads::Event::Iteration {
                best_feasible,
                best_infeasible,
                ..
            } => best_feasible
                .or(*best_infeasible)
                .map_or(f64::NAN, |r| r.summary.f),
            mads::Event::Failed { .. } => f64::NAN,
        }
    }
}

impl HasViolation for mads::Event<'_> {
    fn violation(&self) -> f64 {
        match self {
            mads::Event::Evaluated { record, .. } => record.summary.h,
            mads::Event::Iteration {
                best_feasible,
                best_infeasible,
                ..
            } => best_feasible
                .or(*best_infeasible)
                .map_or(f64::NAN, |r| r.summary.h),
            mads::Event::Failed { .. } => f64::NAN,
        }
    }
}

// --- CanStopEarly impls ---

impl CanStopEarly for mads::Action {
    fn stop_early() -> Self {
        Self::StopEarly
    }
}
