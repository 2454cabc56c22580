use std::cmp::Ordering;

use mads_core::OutputType;
use thiserror::Error;

/// Outputs at or above this magnitude are treated as infinite.
const INFINITY_THRESHOLD: f64 = 1e20;

/// How infeasible points are compared and retained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierKind {
    /// Infeasible points are rejected; only a feasible incumbent exists.
    Extreme,

    /// Infeasible points under a tightening threshold are kept and compared
    /// lexicographically on `(h, f)`.
    Progressive,

    /// Infeasible points are kept when non-dominated in `(h, f)`.
    Filter,

    /// Points above a fixed threshold are rejected, others compared as with
    /// the progressive barrier.
    Hybrid,
}

/// Errors raised by an incompatible combination of output types.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintSpecError {
    #[error("no output is declared as the objective (OBJ)")]
    MissingObjective,

    #[error("{count} outputs are declared as the objective, exactly one is allowed")]
    MultipleObjectives { count: usize },

    #[error("output type {kind} may appear at most once")]
    DuplicateStat { kind: OutputType },

    #[error("{first} constraints cannot be combined with {second} constraints")]
    Incompatible {
        first: OutputType,
        second: OutputType,
    },
}

/// Objective and feasibility derived from a record's raw outputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    /// Objective value (`+∞` if the blackbox reported an infinite value).
    pub f: f64,

    /// Aggregate constraint violation, `+∞` when an extreme barrier
    /// constraint is violated.
    pub h: f64,

    /// True when every constraint is satisfied.
    pub feasible: bool,
}

impl Summary {
    /// Returns `true` if `self` dominates `other` in the `(h, f)` sense.
    #[must_use]
    pub fn dominates(&self, other: &Summary) -> bool {
        self.h <= other.h && self.f <= other.f && (self.h < other.h || self.f < other.f)
    }
}

/// Constraint handler for one run.
#[derive(Debug, Clone)]
pub(super) struct Barrier {
    kind: BarrierKind,
    output_types: Vec<OutputType>,
    objective: usize,
    h_max_0: f64,
}

impl Barrier {
    /// Validates the output types and selects the barrier strategy.
    ///
    /// Selection order: any `F` constraint selects the filter, then any
    /// `PB`/`CSTR` the progressive barrier, then any `PEB` the hybrid barrier,
    /// and otherwise the extreme barrier. `EB` constraints reject points in
    /// every strategy.
    pub(super) fn new(output_types: &[OutputType], h_max_0: f64) -> Result<Self, ConstraintSpecError> {
        let count = |kind: OutputType| output_types.iter().filter(|&&t| t == kind).count();

        let objective = match count(OutputType::Objective) {
            0 => return Err(ConstraintSpecError::MissingObjective),
            1 => output_types
                .iter()
                .position(|&t| t == OutputType::Objective)
                .unwrap_or_default(),
            n => return Err(ConstraintSpecError::MultipleObjectives { count: n }),
        };

        for kind in [OutputType::StatAvg, OutputType::StatSum] {
            if count(kind) > 1 {
                return Err(ConstraintSpecError::DuplicateStat { kind });
            }
        }

        let has = |kind: OutputType| count(kind) > 0;
        let incompatible = [
            (OutputType::ExtremeBarrier, OutputType::Filter),
            (OutputType::ExtremeBarrier, OutputType::ProgressiveBarrier),
            (OutputType::Filter, OutputType::ProgressiveBarrier),
            (OutputType::Filter, OutputType::Hybrid),
        ];
        if let Some(&(first, second)) = incompatible
            .iter()
            .find(|(first, second)| has(*first) && has(*second))
        {
            return Err(ConstraintSpecError::Incompatible { first, second });
        }

        let kind = if has(OutputType::Filter) {
            BarrierKind::Filter
        } else if has(OutputType::ProgressiveBarrier) {
            BarrierKind::Progressive
        } else if has(OutputType::Hybrid) {
            BarrierKind::Hybrid
        } else {
            BarrierKind::Extreme
        };

        Ok(Self {
            kind,
            output_types: output_types.to_vec(),
            objective,
            h_max_0,
        })
    }

    pub(super) fn kind(&self) -> BarrierKind {
        self.kind
    }

    pub(super) fn h_max_0(&self) -> f64 {
        self.h_max_0
    }

    /// Computes objective, violation, and feasibility from raw outputs.
    ///
    /// The violation is `h = Σ max(0, c)²` over non-extreme constraints.
    /// A positive extreme barrier constraint sets `h = +∞`.
    pub(super) fn summarize(&self, outputs: &[f64]) -> Summary {
        let f = normalize(outputs[self.objective]);

        let mut h = 0.0;
        for (&kind, &value) in self.output_types.iter().zip(outputs) {
            let value = normalize(value);
            match kind {
                OutputType::ExtremeBarrier if value > 0.0 => h = f64::INFINITY,
                OutputType::ProgressiveBarrier | OutputType::Filter | OutputType::Hybrid
                    if value > 0.0 =>
                {
                    h += value * value;
                }
                _ => {}
            }
        }

        Summary {
            f,
            h,
            feasible: h == 0.0,
        }
    }

    /// Compares two summaries; `Less` means `a` is better than `b`.
    ///
    /// Feasible points always beat infeasible ones and are ordered by
    /// objective. Infeasible points are incomparable under the extreme
    /// barrier, ordered by `(h, f)` under the progressive and hybrid barriers,
    /// and ordered by dominance under the filter (`Equal` when neither
    /// dominates).
    pub(super) fn compare(&self, a: &Summary, b: &Summary) -> Ordering {
        match (a.feasible, b.feasible) {
            (true, true) => a.f.total_cmp(&b.f),
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => match self.kind {
                BarrierKind::Extreme => Ordering::Equal,
                BarrierKind::Progressive | BarrierKind::Hybrid => {
                    a.h.total_cmp(&b.h).then(a.f.total_cmp(&b.f))
                }
                BarrierKind::Filter => {
                    if a.dominates(b) {
                        Ordering::Less
                    } else if b.dominates(a) {
                        Ordering::Greater
                    } else {
                        Ordering::Equal
                    }
                }
            },
        }
    }
}

fn normalize(value: f64) -> f64 {
    if value >= INFINITY_THRESHOLD {
        f64::INFINITY
    } else if value <= -INFINITY_THRESHOLD {
        f64::NEG_INFINITY
    } else {
        value
    }
}
