//! Progress display for MADS runs.
//!
//! See [`DisplayObserver`].

use std::fmt::Write;

use mads_core::Observer;
use mads_solvers::mads::{self, DisplayOptions, Event, Improvement, Progress, Record};

/// Renders run progress as text lines and emits them with `tracing::info!`.
///
/// Which events produce a line depends on the display degree:
///
/// | degree | lines |
/// |---|---|
/// | 0 | none |
/// | 1 | new best feasible points |
/// | 2 | every improvement and every failed evaluation |
/// | 3 | every evaluation and every iteration |
///
/// With `all_eval`, every evaluation is shown from degree 1 upward.
///
/// A line follows the keyword template of the display options. Recognized
/// keywords are replaced by values and every other token is kept as written:
///
/// - `bbe`: counted evaluations
/// - `obj`: objective
/// - `sol`: the point, space separated
/// - `bbo`: raw blackbox outputs, space separated
/// - `cons_h`: constraint violation
/// - `mesh_index`, `mesh_size`, `poll_size`: mesh state
/// - `stat_avg`, `stat_sum`: statistics, `-` when not declared
/// - `time`: elapsed seconds
///
/// Rendered lines are also kept and can be read back with [`lines`].
///
/// [`lines`]: DisplayObserver::lines
#[derive(Debug, Clone)]
pub struct DisplayObserver {
    options: DisplayOptions,
    lines: Vec<String>,
}

impl DisplayObserver {
    /// Creates an observer using the display options of a run.
    #[must_use]
    pub fn new(options: &DisplayOptions) -> Self {
        Self {
            options: options.clone(),
            lines: Vec::new(),
        }
    }

    /// Lines rendered so far.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Renders the line for `event`, or `None` if the degree hides it.
    #[must_use]
    pub fn render(&self, event: &Event<'_>) -> Option<String> {
        let degree = self.options.degree;
        if degree == 0 {
            return None;
        }

        match event {
            Event::Evaluated {
                record,
                improvement,
                progress,
            } => {
                let shown = match improvement {
                    Improvement::Feasible => true,
                    Improvement::Infeasible => degree >= 2,
                    Improvement::None => degree >= 3 || self.options.all_eval,
                };
                shown.then(|| self.fill(Some(*record), progress))
            }
            Event::Iteration {
                best_feasible,
                best_infeasible,
                progress,
                success,
            } => (degree >= 3).then(|| {
                let status = if *success { "success" } else { "failure" };
                let line = self.fill(best_feasible.or(*best_infeasible), progress);
                format!("iteration {} {status}: {line}", progress.iteration)
            }),
            Event::Failed { x, error, .. } => {
                (degree >= 2).then(|| format!("failed evaluation at ( {} ): {error}", join(x)))
            }
        }
    }

    fn fill(&self, record: Option<&Record>, progress: &Progress) -> String {
        let mut line = String::new();
        for token in self.options.stats.split_whitespace() {
            if !line.is_empty() {
                line.push(' ');
            }
            let value = match (token, record) {
                ("bbe", _) => progress.bb_eval.to_string(),
                ("obj", Some(r)) => r.summary.f.to_string(),
                ("sol", Some(r)) => join(&r.x),
                ("bbo", Some(r)) => join(&r.outputs),
                ("cons_h", Some(r)) => r.summary.h.to_string(),
                ("obj" | "sol" | "bbo" | "cons_h", None) => String::from("-"),
                ("mesh_index", _) => progress.mesh_index.to_string(),
                ("mesh_size", _) => progress.mesh_size.to_string(),
                ("poll_size", _) => progress.poll_size.to_string(),
                ("stat_avg", _) => optional(progress.stats.stat_avg),
                ("stat_sum", _) => optional(progress.stats.stat_sum),
                ("time", _) => format!("{:.3}", progress.elapsed.as_secs_f64()),
                (literal, _) => literal.to_owned(),
            };
            line.push_str(&value);
        }
        line
    }
}

fn join(values: &[f64]) -> String {
    let mut text = String::new();
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            text.push(' ');
        }
        let _ = write!(text, "{v}");
    }
    text
}

fn optional(value: Option<f64>) -> String {
    value.map_or_else(|| String::from("-"), |v| v.to_string())
}

impl<'a> Observer<Event<'a>, mads::Action> for DisplayObserver {
    fn observe(&mut self, event: &Event<'a>) -> Option<mads::Action> {
        if let Some(line) = self.render(event) {
            tracing::info!(target: "mads::display", "{line}");
            self.lines.push(line);
        }
        None
    }
}

impl<'a> Observer<Event<'a>, mads::Action> for &mut DisplayObserver {
    fn observe(&mut self, event: &Event<'a>) -> Option<mads::Action> {
        (*self).observe(event)
    }
}
