use std::{cell::RefCell, thread, time::Duration};

use approx::{assert_abs_diff_eq, assert_relative_eq};
use mads_core::{Blackbox, InputType, OutputType, Response};
use rand::RngCore;
use thiserror::Error;

use super::{
    Action, BarrierKind, Config, ConfigError, DirectionType, Error, EvalError, Event, Improvement,
    Parameters, Phase, SearchContext, SearchStrategy, SearchType, StopReason, minimize,
    minimize_parallel, minimize_unobserved, minimize_with_search, run,
};

use OutputType::{
    ExtremeBarrier as Eb, Filter as F, Hybrid as Peb, Objective as Obj, ProgressiveBarrier as Pb,
    StatSum,
};

/// f = x1² + x2², with the extreme barrier constraint 1 - x1 <= 0.
fn constrained_sphere(x: &[f64]) -> (bool, Vec<f64>) {
    (true, vec![x[0] * x[0] + x[1] * x[1], 1.0 - x[0]])
}

fn rosenbrock(x: &[f64]) -> (bool, Vec<f64>) {
    let f = (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2);
    (true, vec![f])
}

/// Minimize x1 + x2 inside the unit disk; optimum -√2 at (-1/√2, -1/√2).
fn disk(x: &[f64]) -> (bool, Vec<f64>) {
    (true, vec![x[0] + x[1], x[0] * x[0] + x[1] * x[1] - 1.0])
}

fn sphere_config() -> Config {
    Config::builder(vec![3.0, 3.0], vec![Obj, Eb])
        .with_max_bb_eval(2000)
        .validate()
        .expect("valid parameters")
}

#[test]
fn finds_constrained_minimum() {
    let solution = minimize_unobserved(&constrained_sphere, &sphere_config()).unwrap();

    let best = solution.best_feasible.expect("a feasible point");
    assert_abs_diff_eq!(best.x[0], 1.0, epsilon = 1e-2);
    assert_abs_diff_eq!(best.x[1], 0.0, epsilon = 1e-2);
    assert_abs_diff_eq!(best.objective, 1.0, epsilon = 2e-2);
    assert!(best.outputs[1] <= 0.0);
    assert!(solution.best_infeasible.is_none());
}

#[test]
fn single_evaluation_budget_returns_initial_point() {
    let config = Config::builder(vec![3.0, 3.0], vec![Obj, Eb])
        .with_max_bb_eval(1)
        .validate()
        .unwrap();

    let solution = minimize_unobserved(&constrained_sphere, &config).unwrap();

    assert_eq!(solution.status, StopReason::MaxBbEval);
    assert_eq!(solution.bb_eval, 1);
    assert_eq!(solution.iterations, 0);
    let best = solution.best_feasible.unwrap();
    assert_eq!(best.x, vec![3.0, 3.0]);
    assert_relative_eq!(best.objective, 18.0);
}

#[test]
fn output_count_mismatch_on_initial_point_aborts() {
    let config = Config::builder(vec![3.0, 3.0], vec![Obj, Eb])
        .validate()
        .unwrap();
    let bb = |x: &[f64]| (true, vec![x[0]]);

    let mut failures = Vec::new();
    let observer = |event: &Event<'_>| {
        if let Event::Failed { phase, .. } = event {
            failures.push(*phase);
        }
        None::<Action>
    };

    let err = minimize(&bb, &config, observer).unwrap_err();

    assert!(matches!(
        err,
        Error::InitialEvaluation(EvalError::OutputCount {
            expected: 2,
            actual: 1
        })
    ));
    assert_eq!(failures, vec![Phase::Init]);
}

#[test]
fn never_exceeds_budget() {
    for max in [2, 3, 7, 20, 55] {
        let config = Config::builder(vec![-1.2, 1.0], vec![Obj])
            .with_max_bb_eval(max)
            .validate()
            .unwrap();

        let sequential = minimize_unobserved(&rosenbrock, &config).unwrap();
        assert!(sequential.bb_eval <= max);
        assert_eq!(sequential.status, StopReason::MaxBbEval);

        let parallel = minimize_parallel(&rosenbrock, &config, ()).unwrap();
        assert!(parallel.bb_eval <= max);
        assert_eq!(parallel.status, StopReason::MaxBbEval);
    }
}

#[test]
fn extreme_barrier_results_are_feasible() {
    let config = Config::builder(vec![2.0, 2.0], vec![Obj, Eb, Eb])
        .with_max_bb_eval(500)
        .validate()
        .unwrap();
    let bb = |x: &[f64]| (true, vec![x[0] + x[1], 0.5 - x[0], x[0] - x[1] - 1.0]);

    let mut incumbents = Vec::new();
    let observer = |event: &Event<'_>| {
        if let Event::Evaluated {
            record,
            improvement,
            ..
        } = event
        {
            if improvement.is_improvement() {
                incumbents.push(record.outputs.clone());
            }
        }
        None::<Action>
    };

    let solution = minimize(&bb, &config, observer).unwrap();

    let best = solution.best_feasible.unwrap();
    assert!(best.outputs[1] <= 0.0 && best.outputs[2] <= 0.0);
    assert!(!incumbents.is_empty());
    for outputs in incumbents {
        assert!(outputs[1] <= 0.0 && outputs[2] <= 0.0);
    }
}

#[test]
fn identical_runs_give_identical_results() {
    let config = Config::builder(vec![-1.2, 1.0], vec![Obj])
        .with_max_bb_eval(300)
        .with_seed(11)
        .with_search(SearchType::Random { per_iteration: 2 })
        .validate()
        .unwrap();

    let first = minimize_unobserved(&rosenbrock, &config).unwrap();
    let second = minimize_unobserved(&rosenbrock, &config).unwrap();

    assert_eq!(first.best_feasible, second.best_feasible);
    assert_eq!(first.bb_eval, second.bb_eval);
    assert_eq!(first.iterations, second.iterations);
    assert_eq!(first.status, second.status);
}

#[test]
fn mesh_shrinks_on_failed_iterations_until_converged() {
    let config = Config::builder(vec![0.0, 0.0], vec![Obj])
        .with_direction_type(DirectionType::Coordinate)
        .with_search(SearchType::None)
        .with_min_sizes(1e-6, 0.0)
        .validate()
        .unwrap();
    // Already optimal, so every poll fails.
    let bb = |x: &[f64]| (true, vec![x[0].abs() + x[1].abs()]);

    let mut sizes = Vec::new();
    let observer = |event: &Event<'_>| {
        if let Event::Iteration {
            success, progress, ..
        } = event
        {
            assert!(!success);
            sizes.push(progress.mesh_size);
        }
        None::<Action>
    };

    let solution = minimize(&bb, &config, observer).unwrap();

    assert_eq!(solution.status, StopReason::MeshConverged);
    assert!(sizes.len() > 1);
    assert!(sizes.windows(2).all(|w| w[1] < w[0]));
    assert!(solution.mesh_size < 1e-6);
}

#[test]
fn parallel_matches_non_opportunistic_sequential() {
    let params = Config::builder(vec![-1.2, 1.0], vec![Obj])
        .with_max_bb_eval(400)
        .with_opportunistic(false)
        .with_seed(3);
    let config = params.validate().unwrap();

    let sequential = minimize_unobserved(&rosenbrock, &config).unwrap();
    let parallel = minimize_parallel(&rosenbrock, &config, ()).unwrap();

    assert_eq!(sequential.best_feasible, parallel.best_feasible);
    assert_eq!(sequential.bb_eval, parallel.bb_eval);
    assert_eq!(sequential.iterations, parallel.iterations);
    assert_eq!(sequential.cache_hits, parallel.cache_hits);
    assert_eq!(sequential.status, parallel.status);
}

#[test]
fn parallel_batches_only_spend_counted_budget() {
    let config = Config::builder(vec![3.0, 3.0], vec![Obj])
        .with_max_bb_eval(3)
        .with_direction_type(DirectionType::Coordinate)
        .with_search(SearchType::None)
        .with_opportunistic(false)
        .validate()
        .unwrap();
    // Only the initial point counts.
    let x0 = [3.0, 3.0];
    let bb = move |x: &[f64]| (x == x0.as_slice(), vec![x[0] * x[0] + x[1] * x[1]]);

    let sequential = minimize_unobserved(&bb, &config).unwrap();
    let parallel = minimize_parallel(&bb, &config, ()).unwrap();

    assert_eq!(sequential.status, StopReason::MeshConverged);
    assert_eq!(parallel.status, StopReason::MeshConverged);
    assert_eq!(parallel.bb_eval, 1);
    assert_eq!(parallel.blackbox_calls, sequential.blackbox_calls);
    assert!(parallel.blackbox_calls > 3);
    assert_eq!(parallel.best_feasible, sequential.best_feasible);
}

#[test]
fn never_evaluates_a_point_twice() {
    let seen = RefCell::new(Vec::<Vec<f64>>::new());
    let bb = |x: &[f64]| {
        seen.borrow_mut().push(x.to_vec());
        (true, vec![(x[0] - 0.3).powi(2) + (x[1] + 0.1).powi(2)])
    };
    let config = Config::builder(vec![1.0, 1.0], vec![Obj])
        .with_max_bb_eval(300)
        .with_direction_type(DirectionType::Coordinate)
        .validate()
        .unwrap();

    let solution = minimize_unobserved(&bb, &config).unwrap();

    let seen = seen.into_inner();
    assert_eq!(seen.len(), solution.blackbox_calls);
    for (i, a) in seen.iter().enumerate() {
        assert!(seen[i + 1..].iter().all(|b| b != a));
    }
    assert!(solution.cache_hits > 0);
}

#[test]
fn progressive_barrier_reaches_feasible_region() {
    let config = Config::builder(vec![2.0, 2.0], vec![Obj, Pb])
        .with_max_bb_eval(3000)
        .validate()
        .unwrap();
    assert_eq!(config.barrier_kind(), BarrierKind::Progressive);

    let solution = minimize_unobserved(&disk, &config).unwrap();

    let best = solution.best_feasible.expect("a feasible point");
    assert!(best.outputs[1] <= 0.0);
    assert_relative_eq!(best.violation, 0.0);
    assert!(best.objective < -1.3);
}

#[test]
fn filter_reaches_feasible_region() {
    let config = Config::builder(vec![2.0, 2.0], vec![Obj, F])
        .with_max_bb_eval(3000)
        .validate()
        .unwrap();
    assert_eq!(config.barrier_kind(), BarrierKind::Filter);

    let solution = minimize_unobserved(&disk, &config).unwrap();

    let best = solution.best_feasible.expect("a feasible point");
    assert!(best.objective < -1.3);
}

#[test]
fn hybrid_rejects_far_infeasible_points() {
    let far = Config::builder(vec![2.0, 2.0], vec![Obj, Peb])
        .with_h_max_0(1.0)
        .with_max_bb_eval(1)
        .validate()
        .unwrap();
    let solution = minimize_unobserved(&disk, &far).unwrap();
    // h(x0) = 49 is above the threshold.
    assert!(solution.best_infeasible.is_none());

    let near = Config::builder(vec![2.0, 2.0], vec![Obj, Peb])
        .with_h_max_0(100.0)
        .with_max_bb_eval(3000)
        .validate()
        .unwrap();
    let solution = minimize_unobserved(&disk, &near).unwrap();
    assert!(solution.best_feasible.expect("a feasible point").objective < -1.3);
}

#[test]
fn infeasible_initial_point_under_extreme_barrier() {
    let config = Config::builder(vec![0.0, 0.0], vec![Obj, Eb])
        .with_max_bb_eval(1000)
        .validate()
        .unwrap();

    // x0 violates 1 - x1 <= 0 but remains the frame center.
    let solution = minimize_unobserved(&constrained_sphere, &config).unwrap();

    let best = solution.best_feasible.expect("a feasible point");
    assert!(best.x[0] >= 1.0);
}

#[test]
fn stops_after_max_iterations() {
    let config = Config::builder(vec![-1.2, 1.0], vec![Obj])
        .with_max_iterations(3)
        .validate()
        .unwrap();

    let solution = minimize_unobserved(&rosenbrock, &config).unwrap();

    assert_eq!(solution.status, StopReason::MaxIterations);
    assert_eq!(solution.iterations, 3);
}

#[test]
fn stops_at_objective_target() {
    let config = Config::builder(vec![3.0, 3.0], vec![Obj, Eb])
        .with_f_target(5.0)
        .validate()
        .unwrap();

    let solution = minimize_unobserved(&constrained_sphere, &config).unwrap();

    assert_eq!(solution.status, StopReason::TargetReached);
    assert!(solution.best_feasible.unwrap().objective <= 5.0);
}

#[test]
fn stops_when_time_runs_out() {
    let config = Config::builder(vec![-1.2, 1.0], vec![Obj])
        .with_max_time(0.05)
        .validate()
        .unwrap();
    let slow = |x: &[f64]| {
        thread::sleep(Duration::from_millis(5));
        rosenbrock(x)
    };

    let solution = minimize_unobserved(&slow, &config).unwrap();

    assert_eq!(solution.status, StopReason::MaxTime);
    assert!(solution.elapsed >= Duration::from_millis(50));
}

#[test]
fn observer_can_stop_early() {
    let config = sphere_config();

    let mut evaluations = 0;
    let observer = |event: &Event<'_>| {
        if matches!(event, Event::Evaluated { .. }) {
            evaluations += 1;
        }
        (evaluations >= 5).then_some(Action::StopEarly)
    };

    let solution = minimize(&constrained_sphere, &config, observer).unwrap();

    assert_eq!(solution.status, StopReason::StoppedByObserver);
    assert_eq!(solution.bb_eval, 5);
    assert!(solution.best_feasible.is_some());
}

#[derive(Debug, Error)]
#[error("solver crashed at x = {0}")]
struct Crashed(f64);

/// Sphere that fails for negative first coordinates.
struct Fragile;

impl Blackbox for Fragile {
    type Error = Crashed;

    fn evaluate(&self, x: &[f64]) -> Result<Response, Self::Error> {
        if x[0] < 0.0 {
            return Err(Crashed(x[0]));
        }
        Ok(Response::counted(vec![x[0] * x[0] + x[1] * x[1]]))
    }
}

#[test]
fn failed_evaluations_are_discarded() {
    let config = Config::builder(vec![2.0, 2.0], vec![Obj])
        .with_max_bb_eval(500)
        .validate()
        .unwrap();

    let mut failures = 0;
    let observer = |event: &Event<'_>| {
        if let Event::Failed { error, .. } = event {
            assert!(matches!(error, EvalError::Blackbox(_)));
            failures += 1;
        }
        None::<Action>
    };

    let solution = minimize(&Fragile, &config, observer).unwrap();

    assert!(failures > 0);
    assert_eq!(solution.blackbox_calls, solution.bb_eval + failures);
    let best = solution.best_feasible.unwrap();
    assert!(best.x[0] >= 0.0);
    assert!(best.objective < 1e-3);
}

#[test]
fn wrong_output_count_after_first_point_is_discarded() {
    let config = Config::builder(vec![2.0, 2.0], vec![Obj])
        .with_max_bb_eval(500)
        .validate()
        .unwrap();
    let short = RefCell::new(0);
    // Returns no outputs left of the origin.
    let bb = |x: &[f64]| {
        if x[0] < 0.0 {
            *short.borrow_mut() += 1;
            (true, Vec::new())
        } else {
            (true, vec![x[0] * x[0] + x[1] * x[1]])
        }
    };

    let mut failures = 0;
    let observer = |event: &Event<'_>| {
        if let Event::Failed { error, phase, .. } = event {
            assert!(matches!(
                error,
                EvalError::OutputCount {
                    expected: 1,
                    actual: 0
                }
            ));
            assert_ne!(*phase, Phase::Init);
            failures += 1;
        }
        None::<Action>
    };

    let solution = minimize(&bb, &config, observer).unwrap();

    let short = short.into_inner();
    assert!(short > 0);
    assert_eq!(failures, short);
    assert_eq!(solution.blackbox_calls, solution.bb_eval + short);
    assert!(matches!(
        solution.status,
        StopReason::MeshConverged | StopReason::MaxBbEval
    ));
    let best = solution.best_feasible.unwrap();
    assert!(best.x[0] >= 0.0);
    assert!(best.objective < 1e-3);
}

#[test]
fn uncounted_evaluations_do_not_use_budget() {
    let config = Config::builder(vec![3.0, 3.0], vec![Obj])
        .with_max_bb_eval(50)
        .validate()
        .unwrap();
    // Points with a large first coordinate are cheap and free.
    let bb = |x: &[f64]| (x[0] < 2.9, vec![x[0] * x[0] + x[1] * x[1]]);

    let solution = minimize_unobserved(&bb, &config).unwrap();

    assert_eq!(solution.bb_eval, 50);
    assert!(solution.blackbox_calls > solution.bb_eval);
}

#[test]
fn integer_variables_stay_integral() {
    let config = Config::builder(vec![10.0, 10.0], vec![Obj])
        .with_input_types(vec![InputType::Integer, InputType::Integer])
        .with_direction_type(DirectionType::Coordinate)
        .validate()
        .unwrap();
    let evaluated = RefCell::new(Vec::<Vec<f64>>::new());
    let bb = |x: &[f64]| {
        evaluated.borrow_mut().push(x.to_vec());
        (true, vec![(x[0] - 2.3).powi(2) + (x[1] + 1.7).powi(2)])
    };

    let solution = minimize_unobserved(&bb, &config).unwrap();

    assert_eq!(solution.status, StopReason::MeshConverged);
    assert_eq!(solution.best_feasible.unwrap().x, vec![2.0, -2.0]);
    for x in evaluated.into_inner() {
        assert!(x.iter().all(|v| v.fract() == 0.0));
    }
}

#[test]
fn respects_bounds() {
    let config = Config::builder(vec![0.5, 0.5], vec![Obj])
        .with_bounds(vec![0.0, 0.0], vec![1.0, 1.0])
        .with_search(SearchType::LatinHypercube {
            initial: 10,
            per_iteration: 2,
        })
        .with_max_bb_eval(300)
        .validate()
        .unwrap();
    let evaluated = RefCell::new(Vec::<Vec<f64>>::new());
    let bb = |x: &[f64]| {
        evaluated.borrow_mut().push(x.to_vec());
        (true, vec![-x[0] - 2.0 * x[1]])
    };

    let solution = minimize_unobserved(&bb, &config).unwrap();

    for x in evaluated.into_inner() {
        assert!(x.iter().all(|v| (0.0..=1.0).contains(v)));
    }
    let best = solution.best_feasible.unwrap();
    assert_abs_diff_eq!(best.x[0], 1.0, epsilon = 1e-6);
    assert_abs_diff_eq!(best.x[1], 1.0, epsilon = 1e-6);
}

#[test]
fn accumulates_statistics() {
    let config = Config::builder(vec![1.0], vec![Obj, StatSum])
        .with_max_bb_eval(20)
        .validate()
        .unwrap();
    let bb = |x: &[f64]| (true, vec![x[0] * x[0], 0.5]);

    let solution = minimize_unobserved(&bb, &config).unwrap();

    assert_relative_eq!(
        solution.stats.stat_sum.unwrap(),
        0.5 * solution.bb_eval as f64
    );
    assert_eq!(solution.stats.stat_avg, None);
}

/// Proposes the known optimum once.
struct Oracle {
    proposed: bool,
    reports: Vec<bool>,
}

impl SearchStrategy for Oracle {
    fn suggest(&mut self, _ctx: &SearchContext<'_>, _rng: &mut dyn RngCore) -> Vec<Vec<f64>> {
        if self.proposed {
            Vec::new()
        } else {
            self.proposed = true;
            vec![vec![1.0, 0.0]]
        }
    }

    fn report(&mut self, _x: &[f64], improved: bool) {
        self.reports.push(improved);
    }

    fn name(&self) -> &str {
        "oracle"
    }
}

#[test]
fn custom_search_strategy_is_used() {
    let config = Config::builder(vec![3.0, 3.0], vec![Obj, Eb])
        .with_initial_poll_size(vec![1.0])
        .with_max_bb_eval(100)
        .validate()
        .unwrap();
    let mut oracle = Oracle {
        proposed: false,
        reports: Vec::new(),
    };

    let mut first = None;
    let observer = |event: &Event<'_>| {
        if let Event::Evaluated {
            record,
            improvement,
            ..
        } = event
        {
            if record.phase == Phase::Search && first.is_none() {
                first = Some(*improvement);
            }
        }
        None::<Action>
    };

    let solution =
        minimize_with_search(&constrained_sphere, &config, &mut oracle, observer).unwrap();

    assert_eq!(first, Some(Improvement::Feasible));
    assert_eq!(oracle.reports, vec![true]);
    assert_eq!(solution.best_feasible.unwrap().x, vec![1.0, 0.0]);
}

#[test]
fn nelder_mead_search_beats_pure_polling_on_rosenbrock() {
    let params = Config::builder(vec![-1.2, 1.0], vec![Obj])
        .with_max_bb_eval(500)
        .with_seed(2);
    let polling = params.clone().with_search(SearchType::None).validate().unwrap();
    let nelder_mead = params.with_search(SearchType::NelderMead).validate().unwrap();

    let mut search_successes = 0;
    let observer = |event: &Event<'_>| {
        if let Event::Evaluated {
            record,
            improvement,
            ..
        } = event
        {
            if record.phase == Phase::Search && improvement.is_improvement() {
                search_successes += 1;
            }
        }
        None::<Action>
    };

    let with_search = minimize(&rosenbrock, &nelder_mead, observer).unwrap();
    let without_search = minimize_unobserved(&rosenbrock, &polling).unwrap();

    assert!(search_successes > 0);
    assert!(with_search.bb_eval <= 500);
    assert!(
        with_search.best_feasible.unwrap().objective
            <= without_search.best_feasible.unwrap().objective
    );
}

#[test]
fn runs_from_parameter_file() {
    let params = Parameters::from_toml_str(
        r#"
        dimension = 2
        x0 = [3.0, 3.0]
        output_types = ["OBJ", "EB"]
        max_bb_eval = 1500
        seed = 5
        display_degree = 0
        "#,
    )
    .unwrap();

    let solution = run(&constrained_sphere, &params).unwrap();

    assert!(solution.bb_eval <= 1500);
    assert_abs_diff_eq!(solution.best_feasible.unwrap().objective, 1.0, epsilon = 2e-2);
}

#[test]
fn invalid_parameters_fail_before_evaluation() {
    let calls = RefCell::new(0);
    let bb = |x: &[f64]| {
        *calls.borrow_mut() += 1;
        (true, vec![x[0]])
    };
    let params = Parameters::new(vec![0.0], vec![Eb]);

    let err = run(&bb, &params).unwrap_err();

    assert!(matches!(err, Error::Config(ConfigError::Constraints(_))));
    assert_eq!(calls.into_inner(), 0);
}
