use std::cmp::Ordering;

use super::{
    barrier::{Barrier, BarrierKind, Summary},
    history::History,
};

/// What an evaluation improved, if anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Improvement {
    /// No incumbent changed.
    None,

    /// The point became the new best feasible incumbent.
    Feasible,

    /// The point became the new best infeasible incumbent.
    Infeasible,
}

impl Improvement {
    /// Returns `true` if any incumbent changed.
    #[must_use]
    pub fn is_improvement(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Best feasible and infeasible points of a run, as indices into the history.
#[derive(Debug, Clone)]
pub(super) struct Incumbents {
    feasible: Option<usize>,
    infeasible: Option<usize>,
    filter: Vec<usize>,
    h_max: f64,
}

impl Incumbents {
    pub(super) fn new(barrier: &Barrier) -> Self {
        Self {
            feasible: None,
            infeasible: None,
            filter: Vec::new(),
            h_max: barrier.h_max_0(),
        }
    }

    pub(super) fn feasible(&self) -> Option<usize> {
        self.feasible
    }

    pub(super) fn infeasible(&self) -> Option<usize> {
        self.infeasible
    }

    /// Current violation threshold above which infeasible points are rejected.
    pub(super) fn h_max(&self) -> f64 {
        self.h_max
    }

    /// Offers a record to the incumbents.
    ///
    /// A record replaces an incumbent only if it is strictly better under the
    /// barrier's comparison. Records violating an extreme barrier constraint,
    /// or exceeding the current threshold `h_max`, never become incumbents.
    pub(super) fn offer(&mut self, index: usize, history: &History, barrier: &Barrier) -> Improvement {
        let candidate = history.get(index).summary;

        if candidate.feasible {
            let better = match self.feasible {
                None => true,
                Some(best) => {
                    barrier.compare(&candidate, &history.get(best).summary) == Ordering::Less
                }
            };
            if better {
                self.feasible = Some(index);
                return Improvement::Feasible;
            }
            return Improvement::None;
        }

        if !candidate.h.is_finite() || candidate.h > self.h_max {
            return Improvement::None;
        }

        match barrier.kind() {
            BarrierKind::Extreme => Improvement::None,
            BarrierKind::Progressive | BarrierKind::Hybrid => {
                let better = match self.infeasible {
                    None => true,
                    Some(best) => {
                        barrier.compare(&candidate, &history.get(best).summary) == Ordering::Less
                    }
                };
                if !better {
                    return Improvement::None;
                }
                self.infeasible = Some(index);
                if barrier.kind() == BarrierKind::Progressive {
                    self.h_max = candidate.h;
                }
                Improvement::Infeasible
            }
            BarrierKind::Filter => self.offer_to_filter(index, &candidate, history),
        }
    }

    fn offer_to_filter(&mut self, index: usize, candidate: &Summary, history: &History) -> Improvement {
        let rejected = self.filter.iter().any(|&i| {
            let member = history.get(i).summary;
            member.dominates(candidate) || (member.h == candidate.h && member.f == candidate.f)
        });
        if rejected {
            return Improvement::None;
        }

        self.filter
            .retain(|&i| !candidate.dominates(&history.get(i).summary));
        self.filter.push(index);

        let previous = self.infeasible;
        self.infeasible = self
            .filter
            .iter()
            .copied()
            .min_by(|&a, &b| {
                let (a, b) = (history.get(a).summary, history.get(b).summary);
                a.h.total_cmp(&b.h).then(a.f.total_cmp(&b.f))
            });

        if self.infeasible == previous {
            // Entered the filter without becoming the least-violating point.
            Improvement::None
        } else {
            Improvement::Infeasible
        }
    }
}
