use mads_core::OutputType;

/// Running values of the `STAT_SUM` and `STAT_AVG` outputs.
///
/// Only evaluations that count toward the budget contribute.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Stats {
    /// Sum of the `STAT_SUM` output, if one is declared.
    pub stat_sum: Option<f64>,

    /// Mean of the `STAT_AVG` output, if one is declared and at least one
    /// counted evaluation has completed.
    pub stat_avg: Option<f64>,
}

/// Accumulates [`Stats`] across a run.
#[derive(Debug, Clone)]
pub(super) struct StatsAccumulator {
    sum_index: Option<usize>,
    avg_index: Option<usize>,
    sum: f64,
    avg_total: f64,
    avg_count: usize,
}

impl StatsAccumulator {
    pub(super) fn new(output_types: &[OutputType]) -> Self {
        Self {
            sum_index: output_types.iter().position(|&t| t == OutputType::StatSum),
            avg_index: output_types.iter().position(|&t| t == OutputType::StatAvg),
            sum: 0.0,
            avg_total: 0.0,
            avg_count: 0,
        }
    }

    pub(super) fn record(&mut self, outputs: &[f64]) {
        if let Some(i) = self.sum_index {
            self.sum += outputs[i];
        }
        if let Some(i) = self.avg_index {
            self.avg_total += outputs[i];
            self.avg_count += 1;
        }
    }

    pub(super) fn snapshot(&self) -> Stats {
        Stats {
            stat_sum: self.sum_index.map(|_| self.sum),
            stat_avg: match (self.avg_index, self.avg_count) {
                (Some(_), n) if n > 0 => Some(self.avg_total / n as f64),
                _ => None,
            },
        }
    }
}
