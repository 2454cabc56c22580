//! Search step strategies.
//!
//! A search strategy proposes any number of trial points before each poll.
//! The engine projects every proposal onto the bounds and the current mesh,
//! skips points already in the cache, and evaluates the rest. The search step
//! never changes the mesh by itself; the iteration is a success if a search
//! point or a poll point improves an incumbent.

use std::cmp::Ordering;

use mads_core::InputType;
use rand::{Rng, RngCore, seq::SliceRandom};
use serde::{Deserialize, Serialize};

use super::{Record, Summary};

/// Read-only view of the run state offered to a [`SearchStrategy`].
#[derive(Debug, Clone, Copy)]
pub struct SearchContext<'a> {
    pub(super) center: &'a [f64],
    pub(super) lower: &'a [f64],
    pub(super) upper: &'a [f64],
    pub(super) input_types: &'a [InputType],
    pub(super) poll_sizes: &'a [f64],
    pub(super) iteration: usize,
    pub(super) last_success: Option<&'a [f64]>,
    pub(super) evaluated: &'a [Record],
}

impl<'a> SearchContext<'a> {
    /// The current frame center.
    #[must_use]
    pub fn center(&self) -> &'a [f64] {
        self.center
    }

    #[must_use]
    pub fn lower(&self) -> &'a [f64] {
        self.lower
    }

    #[must_use]
    pub fn upper(&self) -> &'a [f64] {
        self.upper
    }

    #[must_use]
    pub fn input_types(&self) -> &'a [InputType] {
        self.input_types
    }

    /// Per-variable poll sizes `Δ_i` of the current iteration.
    #[must_use]
    pub fn poll_sizes(&self) -> &'a [f64] {
        self.poll_sizes
    }

    /// Number of completed iterations; zero during the first search step.
    #[must_use]
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Displacement of the last successful iteration, if any.
    #[must_use]
    pub fn last_success(&self) -> Option<&'a [f64]> {
        self.last_success
    }

    /// Every successful evaluation of the run so far, oldest first.
    #[must_use]
    pub fn evaluated(&self) -> &'a [Record] {
        self.evaluated
    }

    /// Box of half-width `scale · Δ_i` around the center, clipped to the bounds.
    fn frame(&self, scale: f64) -> Vec<(f64, f64)> {
        self.center
            .iter()
            .zip(self.poll_sizes)
            .zip(self.lower.iter().zip(self.upper))
            .map(|((&c, &d), (&lo, &hi))| ((c - scale * d).max(lo), (c + scale * d).min(hi)))
            .collect()
    }
}

/// A pluggable search step.
pub trait SearchStrategy {
    /// Proposes trial points for the current iteration.
    fn suggest(&mut self, _ctx: &SearchContext<'_>, _rng: &mut dyn RngCore) -> Vec<Vec<f64>> {
        Vec::new()
    }

    /// Reports whether an evaluated proposal improved an incumbent.
    fn report(&mut self, _x: &[f64], _improved: bool) {}

    /// Human-readable strategy name.
    fn name(&self) -> &str;
}

/// Search step selection for [`Parameters`](super::Parameters).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SearchType {
    /// No search step; every iteration is a pure poll.
    None,

    /// Latin hypercube sampling.
    LatinHypercube { initial: usize, per_iteration: usize },

    /// Uniform sampling in the poll frame.
    Random { per_iteration: usize },

    /// One step further along the last successful displacement.
    #[default]
    Speculative,

    /// Nelder-Mead steps on a simplex taken from the evaluated points.
    NelderMead,
}

impl SearchType {
    /// Builds the configured strategy.
    #[must_use]
    pub fn build(self) -> Box<dyn SearchStrategy> {
        match self {
            Self::None => Box::new(NoSearch),
            Self::LatinHypercube {
                initial,
                per_iteration,
            } => Box::new(LatinHypercube::new(initial, per_iteration)),
            Self::Random { per_iteration } => Box::new(RandomSearch::new(per_iteration)),
            Self::Speculative => Box::new(SpeculativeSearch),
            Self::NelderMead => Box::new(NelderMeadSearch::default()),
        }
    }
}

/// A search step that proposes nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSearch;

impl SearchStrategy for NoSearch {
    fn name(&self) -> &str {
        "none"
    }
}

/// Latin hypercube sampling.
///
/// The first search step samples `initial` points over the bounds (or ten
/// poll sizes around the center where a bound is infinite). Later steps
/// sample `per_iteration` points in the current poll frame.
#[derive(Debug, Clone)]
pub struct LatinHypercube {
    initial: usize,
    per_iteration: usize,
}

impl LatinHypercube {
    #[must_use]
    pub fn new(initial: usize, per_iteration: usize) -> Self {
        Self {
            initial,
            per_iteration,
        }
    }
}

impl SearchStrategy for LatinHypercube {
    fn suggest(&mut self, ctx: &SearchContext<'_>, rng: &mut dyn RngCore) -> Vec<Vec<f64>> {
        if ctx.iteration() == 0 {
            let region: Vec<(f64, f64)> = ctx
                .frame(10.0)
                .into_iter()
                .zip(ctx.lower.iter().zip(ctx.upper))
                .map(|((lo, hi), (&lower, &upper))| {
                    (
                        if lower.is_finite() { lower } else { lo },
                        if upper.is_finite() { upper } else { hi },
                    )
                })
                .collect();
            latin_hypercube(&region, self.initial, rng)
        } else {
            latin_hypercube(&ctx.frame(1.0), self.per_iteration, rng)
        }
    }

    fn name(&self) -> &str {
        "latin_hypercube"
    }
}

/// Draws `count` points so each variable's range is split into `count` strata
/// and every stratum is sampled exactly once.
fn latin_hypercube(region: &[(f64, f64)], count: usize, rng: &mut dyn RngCore) -> Vec<Vec<f64>> {
    if count == 0 {
        return Vec::new();
    }

    let mut points = vec![Vec::with_capacity(region.len()); count];
    let mut strata: Vec<usize> = (0..count).collect();
    for &(lo, hi) in region {
        strata.shuffle(rng);
        for (point, &stratum) in points.iter_mut().zip(&strata) {
            let u = (stratum as f64 + rng.gen_range(0.0..1.0)) / count as f64;
            point.push(lo + u * (hi - lo));
        }
    }
    points
}

/// Uniform sampling in the poll frame.
#[derive(Debug, Clone)]
pub struct RandomSearch {
    per_iteration: usize,
}

impl RandomSearch {
    #[must_use]
    pub fn new(per_iteration: usize) -> Self {
        Self { per_iteration }
    }
}

impl SearchStrategy for RandomSearch {
    fn suggest(&mut self, ctx: &SearchContext<'_>, rng: &mut dyn RngCore) -> Vec<Vec<f64>> {
        let frame = ctx.frame(1.0);
        (0..self.per_iteration)
            .map(|_| {
                frame
                    .iter()
                    .map(|&(lo, hi)| if lo < hi { rng.gen_range(lo..=hi) } else { lo })
                    .collect()
            })
            .collect()
    }

    fn name(&self) -> &str {
        "random"
    }
}

/// Repeats the last successful displacement from the new center.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpeculativeSearch;

impl SearchStrategy for SpeculativeSearch {
    fn suggest(&mut self, ctx: &SearchContext<'_>, _rng: &mut dyn RngCore) -> Vec<Vec<f64>> {
        match ctx.last_success() {
            Some(step) => vec![ctx.center().iter().zip(step).map(|(c, s)| c + s).collect()],
            None => Vec::new(),
        }
    }

    fn name(&self) -> &str {
        "speculative"
    }
}

/// Nelder-Mead steps on a simplex rebuilt from the run history.
///
/// Every search step takes the best `n + 1` affinely independent evaluated
/// points within `include_factor · Δ_i` of the center as the simplex, ordered
/// feasible first, then by violation `h`, then by objective `f`. Points with an
/// infinite `h` or `f` never enter. One point is proposed per step:
///
/// - a reflection of the worst vertex through the centroid of the others,
/// - in the following step, an expansion if the reflected point dominated the
///   best vertex, or a contraction (outside, or inside when it is also worse
///   than the worst vertex) if it was dominated by the second worst vertex.
///
/// A reflected point that lands between these is already part of the next
/// simplex, so a new reflection follows. Proposals are projected onto the
/// mesh by the engine and no shrink step is taken.
#[derive(Debug, Clone)]
pub struct NelderMeadSearch {
    include_factor: f64,
    rank_tolerance: f64,
    expansion: f64,
    outside_contraction: f64,
    inside_contraction: f64,
    pending: Option<Reflection>,
}

/// A reflection waiting for its outcome.
#[derive(Debug, Clone)]
struct Reflection {
    centroid: Vec<f64>,
    worst: Vec<f64>,
    best_summary: Summary,
    second_worst_summary: Summary,
    worst_summary: Summary,

    /// The reflected point as evaluated, after projection.
    evaluated: Option<Vec<f64>>,
}

impl Default for NelderMeadSearch {
    fn default() -> Self {
        Self {
            include_factor: 8.0,
            rank_tolerance: 0.01,
            expansion: 2.0,
            outside_contraction: 0.5,
            inside_contraction: 0.5,
            pending: None,
        }
    }
}

impl NelderMeadSearch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how many poll sizes away from the center a point may lie and
    /// still enter the simplex.
    #[must_use]
    pub fn with_include_factor(mut self, include_factor: f64) -> Self {
        self.include_factor = include_factor;
        self
    }

    /// Sets the expansion and contraction coefficients.
    #[must_use]
    pub fn with_coefficients(mut self, expansion: f64, outside: f64, inside: f64) -> Self {
        self.expansion = expansion;
        self.outside_contraction = outside;
        self.inside_contraction = inside;
        self
    }

    /// Selects the simplex, best vertex first.
    fn simplex<'a>(&self, ctx: &SearchContext<'a>) -> Option<Vec<&'a Record>> {
        let free = ctx.poll_sizes.iter().filter(|&&d| d > 0.0).count();
        if free == 0 {
            return None;
        }

        let mut candidates: Vec<&Record> = ctx
            .evaluated
            .iter()
            .filter(|r| r.summary.f.is_finite() && r.summary.h.is_finite())
            .filter(|r| {
                r.x.iter()
                    .zip(ctx.center)
                    .zip(ctx.poll_sizes)
                    .all(|((x, c), d)| (x - c).abs() <= self.include_factor * d)
            })
            .collect();
        candidates.sort_by(|a, b| rank(&a.summary, &b.summary));

        let mut simplex: Vec<&Record> = Vec::with_capacity(free + 1);
        let mut basis: Vec<Vec<f64>> = Vec::with_capacity(free);
        for record in candidates {
            let Some(first) = simplex.first() else {
                simplex.push(record);
                continue;
            };

            // Edge from the best vertex, in poll size units.
            let mut edge: Vec<f64> = record
                .x
                .iter()
                .zip(&first.x)
                .zip(ctx.poll_sizes)
                .map(|((x, y), &d)| if d > 0.0 { (x - y) / d } else { 0.0 })
                .collect();
            let length = norm(&edge);
            if length == 0.0 {
                continue;
            }
            for direction in &basis {
                let along = dot(&edge, direction);
                for (e, u) in edge.iter_mut().zip(direction) {
                    *e -= along * u;
                }
            }
            let residual = norm(&edge);
            if residual <= self.rank_tolerance * length {
                continue;
            }

            basis.push(edge.iter().map(|e| e / residual).collect());
            simplex.push(record);
            if simplex.len() == free + 1 {
                return Some(simplex);
            }
        }
        None
    }

    /// Continues a reflection whose outcome is known.
    fn follow_up(&self, reflection: &Reflection, ctx: &SearchContext<'_>) -> Option<Vec<f64>> {
        let x = reflection.evaluated.as_ref()?;
        let reflected = ctx.evaluated.iter().rev().find(|r| &r.x == x)?.summary;

        if dominates(&reflected, &reflection.best_summary) {
            Some(through(&reflection.centroid, &reflection.worst, self.expansion))
        } else if dominates(&reflection.second_worst_summary, &reflected) {
            let coefficient = if dominates(&reflection.worst_summary, &reflected) {
                -self.inside_contraction
            } else {
                self.outside_contraction
            };
            Some(through(&reflection.centroid, &reflection.worst, coefficient))
        } else {
            None
        }
    }
}

impl SearchStrategy for NelderMeadSearch {
    fn suggest(&mut self, ctx: &SearchContext<'_>, _rng: &mut dyn RngCore) -> Vec<Vec<f64>> {
        if let Some(reflection) = self.pending.take() {
            if let Some(point) = self.follow_up(&reflection, ctx) {
                return vec![point];
            }
        }

        let Some(simplex) = self.simplex(ctx) else {
            return Vec::new();
        };
        let Some((worst, others)) = simplex.split_last() else {
            return Vec::new();
        };

        let mut centroid = vec![0.0; worst.x.len()];
        for vertex in others {
            for (c, x) in centroid.iter_mut().zip(&vertex.x) {
                *c += x;
            }
        }
        for c in &mut centroid {
            *c /= others.len() as f64;
        }

        let reflected = through(&centroid, &worst.x, 1.0);
        self.pending = Some(Reflection {
            centroid,
            worst: worst.x.clone(),
            best_summary: simplex[0].summary,
            second_worst_summary: others[others.len() - 1].summary,
            worst_summary: worst.summary,
            evaluated: None,
        });
        vec![reflected]
    }

    fn report(&mut self, x: &[f64], _improved: bool) {
        if let Some(reflection) = &mut self.pending {
            if reflection.evaluated.is_none() {
                reflection.evaluated = Some(x.to_vec());
            }
        }
    }

    fn name(&self) -> &str {
        "nelder_mead"
    }
}

/// Feasible first, then by `(h, f)`.
fn rank(a: &Summary, b: &Summary) -> Ordering {
    b.feasible
        .cmp(&a.feasible)
        .then(a.h.total_cmp(&b.h))
        .then(a.f.total_cmp(&b.f))
}

fn dominates(a: &Summary, b: &Summary) -> bool {
    (a.feasible && !b.feasible) || (a.feasible == b.feasible && a.dominates(b))
}

/// `centroid + coefficient · (centroid - worst)`.
fn through(centroid: &[f64], worst: &[f64], coefficient: f64) -> Vec<f64> {
    centroid
        .iter()
        .zip(worst)
        .map(|(c, w)| c + coefficient * (c - w))
        .collect()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn norm(v: &[f64]) -> f64 {
    dot(v, v).sqrt()
}
