use std::collections::HashMap;

use mads_core::Response;

use super::{barrier::Summary, phase::Phase};

/// An immutable record of one successful blackbox evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Position of this record in the run history.
    pub tag: usize,

    /// The evaluated point.
    pub x: Vec<f64>,

    /// Raw blackbox outputs.
    pub outputs: Vec<f64>,

    /// Whether the evaluation counted toward the budget.
    pub counted: bool,

    /// Objective and feasibility derived from the outputs.
    pub summary: Summary,

    /// Phase that produced the point.
    pub phase: Phase,
}

/// Run-scoped evaluation history and point cache.
#[derive(Debug, Default)]
pub(super) struct History {
    records: Vec<Record>,
    cache: HashMap<Vec<u64>, usize>,
    counted: usize,
    cache_hits: usize,
    failures: usize,
}

impl History {
    /// Appends a record and returns its index.
    pub(super) fn push(
        &mut self,
        x: Vec<f64>,
        response: Response,
        summary: Summary,
        phase: Phase,
    ) -> usize {
        let tag = self.records.len();
        if response.count {
            self.counted += 1;
        }
        self.cache.insert(key(&x), tag);
        self.records.push(Record {
            tag,
            x,
            outputs: response.outputs,
            counted: response.count,
            summary,
            phase,
        });
        tag
    }

    pub(super) fn get(&self, index: usize) -> &Record {
        &self.records[index]
    }

    /// Every successful evaluation, in evaluation order.
    pub(super) fn records(&self) -> &[Record] {
        &self.records
    }

    /// Returns the index of a previous evaluation at exactly `x`.
    pub(super) fn lookup(&self, x: &[f64]) -> Option<usize> {
        self.cache.get(&key(x)).copied()
    }

    pub(super) fn record_cache_hit(&mut self) {
        self.cache_hits += 1;
    }

    pub(super) fn record_failure(&mut self) {
        self.failures += 1;
    }

    /// Number of evaluations that counted toward the budget.
    pub(super) fn counted(&self) -> usize {
        self.counted
    }

    /// Number of blackbox calls, successful or not.
    pub(super) fn calls(&self) -> usize {
        self.records.len() + self.failures
    }

    pub(super) fn cache_hits(&self) -> usize {
        self.cache_hits
    }

    pub(super) fn len(&self) -> usize {
        self.records.len()
    }
}

/// Bitwise cache key; `-0.0` and `0.0` map to the same point.
fn key(x: &[f64]) -> Vec<u64> {
    x.iter().map(|&v| (v + 0.0).to_bits()).collect()
}
