use std::ops::ControlFlow;

use mads_core::{Observer, Response};
use tracing::{debug, info, trace, warn};

use super::{
    Action, Config, Error, EvalError, Event, Improvement, Phase, SearchContext, SearchStrategy,
    Solution, StopReason,
    context::RunContext,
    directions::{order_by_success, trial_points, unit_directions},
    evaluate::Executor,
};

/// Drives one run through `Init → (Search → Poll → Update)* → Terminated`.
pub(super) fn run<E, S, Obs>(
    executor: &E,
    config: &Config,
    search: &mut S,
    mut observer: Obs,
) -> Result<Solution, Error>
where
    E: Executor,
    S: SearchStrategy + ?Sized,
    Obs: for<'a> Observer<Event<'a>, Action>,
{
    let mut ctx = RunContext::new(config);
    info!(
        dimension = config.dimension(),
        barrier = ?config.barrier_kind(),
        search = search.name(),
        parallel = executor.is_parallel(),
        "starting MADS run"
    );

    let status = match init(executor, &mut ctx, &mut observer)? {
        ControlFlow::Break(reason) => reason,
        ControlFlow::Continue(()) => iterate(executor, &mut ctx, search, &mut observer),
    };

    let solution = ctx.into_solution(status);
    info!(
        %status,
        bb_eval = solution.bb_eval,
        iterations = solution.iterations,
        objective = ?solution.best().map(|p| p.objective),
        "MADS run finished"
    );
    Ok(solution)
}

/// Evaluates the initial point.
///
/// # Errors
///
/// Returns [`Error::InitialEvaluation`] if the evaluation fails, after the
/// observer has seen the failure.
fn init<E, Obs>(
    executor: &E,
    ctx: &mut RunContext<'_>,
    observer: &mut Obs,
) -> Result<ControlFlow<StopReason>, Error>
where
    E: Executor,
    Obs: for<'a> Observer<Event<'a>, Action>,
{
    let x0 = ctx.config.x0().to_vec();
    let response = match executor.call(&x0) {
        Ok(response) => response,
        Err(error) => {
            warn!(%error, "initial point could not be evaluated");
            let event = Event::Failed {
                x: &x0,
                phase: Phase::Init,
                error: &error,
                progress: ctx.progress(),
            };
            observer.observe(&event);
            return Err(Error::InitialEvaluation(error));
        }
    };

    if let ControlFlow::Break(reason) = record(ctx, x0, Ok(response), observer) {
        return Ok(ControlFlow::Break(reason));
    }
    if !ctx.history.get(0).summary.feasible && ctx.incumbents.infeasible().is_none() {
        debug!("initial point rejected by the barrier, keeping it as frame center");
    }

    Ok(match ctx.stop.check_evaluation(ctx.history.counted(), ctx.best_feasible_f()) {
        Some(reason) => ControlFlow::Break(reason),
        None => ControlFlow::Continue(()),
    })
}

/// Runs iterations until a stopping criterion is met.
fn iterate<E, S, Obs>(
    executor: &E,
    ctx: &mut RunContext<'_>,
    search: &mut S,
    observer: &mut Obs,
) -> StopReason
where
    E: Executor,
    S: SearchStrategy + ?Sized,
    Obs: for<'a> Observer<Event<'a>, Action>,
{
    loop {
        let center = ctx.history.get(ctx.frame_center()).x.clone();

        ctx.enter(Phase::Search);
        let search_success = match search_step(executor, ctx, search, &center, observer) {
            ControlFlow::Break(reason) => return reason,
            ControlFlow::Continue(success) => success,
        };

        ctx.enter(Phase::Poll);
        let poll_success = match poll_step(executor, ctx, observer) {
            ControlFlow::Break(reason) => return reason,
            ControlFlow::Continue(success) => success,
        };

        ctx.enter(Phase::Update);
        if let ControlFlow::Break(reason) = update(ctx, &center, search_success || poll_success, observer)
        {
            return reason;
        }
    }
}

fn search_step<E, S, Obs>(
    executor: &E,
    ctx: &mut RunContext<'_>,
    search: &mut S,
    center: &[f64],
    observer: &mut Obs,
) -> ControlFlow<StopReason, bool>
where
    E: Executor,
    S: SearchStrategy + ?Sized,
    Obs: for<'a> Observer<Event<'a>, Action>,
{
    let poll_sizes = ctx.mesh.poll_sizes();
    let proposals = {
        let search_ctx = SearchContext {
            center,
            lower: ctx.config.lower(),
            upper: ctx.config.upper(),
            input_types: ctx.config.input_types(),
            poll_sizes: &poll_sizes,
            iteration: ctx.iteration,
            last_success: ctx.last_success.as_deref(),
            evaluated: ctx.history.records(),
        };
        search.suggest(&search_ctx, &mut ctx.rng)
    };

    let n = center.len();
    let domain = ctx.domain();
    let mut candidates = Vec::with_capacity(proposals.len());
    for mut x in proposals {
        if x.len() != n || x.iter().any(|v| !v.is_finite()) {
            warn!(
                strategy = search.name(),
                len = x.len(),
                "ignoring malformed search proposal"
            );
            continue;
        }
        domain.snap(&mut x);
        ctx.mesh.project(center, &mut x);
        domain.snap(&mut x);
        if x.as_slice() != center {
            candidates.push(x);
        }
    }

    evaluate_candidates(executor, ctx, candidates, observer, |x, improvement| {
        search.report(x, improvement.is_improvement());
    })
}

fn poll_step<E, Obs>(
    executor: &E,
    ctx: &mut RunContext<'_>,
    observer: &mut Obs,
) -> ControlFlow<StopReason, bool>
where
    E: Executor,
    Obs: for<'a> Observer<Event<'a>, Action>,
{
    let center = ctx.history.get(ctx.frame_center()).x.clone();
    let directions = unit_directions(ctx.config.direction_type(), center.len(), &mut ctx.rng);
    let mut points = trial_points(&center, &directions, &ctx.mesh, &ctx.domain());
    order_by_success(&center, &mut points, ctx.last_success.as_deref());

    let candidates = points.into_iter().map(|(_, x)| x).collect();
    evaluate_candidates(executor, ctx, candidates, observer, |_, _| {})
}

/// Adjusts the mesh, reports the iteration, and checks every stopping criterion.
fn update<Obs>(
    ctx: &mut RunContext<'_>,
    previous_center: &[f64],
    success: bool,
    observer: &mut Obs,
) -> ControlFlow<StopReason>
where
    Obs: for<'a> Observer<Event<'a>, Action>,
{
    if success {
        ctx.mesh.coarsen();
        let center = &ctx.history.get(ctx.frame_center()).x;
        ctx.last_success = Some(
            center
                .iter()
                .zip(previous_center)
                .map(|(new, old)| new - old)
                .collect(),
        );
    } else {
        ctx.mesh.refine();
        ctx.last_success = None;
    }
    ctx.iteration += 1;

    let best_feasible = ctx.incumbents.feasible().map(|i| ctx.history.get(i));
    let best_infeasible = ctx.incumbents.infeasible().map(|i| ctx.history.get(i));
    debug!(
        iteration = ctx.iteration,
        success,
        mesh_size = ctx.mesh.mesh_size(),
        poll_size = ctx.mesh.poll_size(),
        f = ?best_feasible.map(|r| r.summary.f),
        h = ?best_infeasible.map(|r| r.summary.h),
        h_max = ctx.incumbents.h_max(),
        "iteration complete"
    );

    let event = Event::Iteration {
        success,
        best_feasible,
        best_infeasible,
        progress: ctx.progress(),
    };
    if let Some(Action::StopEarly) = observer.observe(&event) {
        return ControlFlow::Break(StopReason::StoppedByObserver);
    }

    match ctx.stop.check_iteration(
        ctx.iteration,
        ctx.history.counted(),
        ctx.best_feasible_f(),
        &ctx.mesh,
    ) {
        Some(reason) => ControlFlow::Break(reason),
        None => ControlFlow::Continue(()),
    }
}

/// Evaluates the candidates of one search or poll step.
///
/// Points already in the cache are skipped. A sequential executor checks the
/// budget and clock before each call and, when opportunistic, stops at the
/// first success. A parallel executor evaluates the candidates in batches no
/// larger than the remaining budget and applies each batch in candidate order,
/// checking the limits again between batches.
///
/// Continues with `true` if a point improved the feasible incumbent, or the
/// infeasible one while no feasible point is known.
fn evaluate_candidates<E, Obs, R>(
    executor: &E,
    ctx: &mut RunContext<'_>,
    candidates: Vec<Vec<f64>>,
    observer: &mut Obs,
    mut report: R,
) -> ControlFlow<StopReason, bool>
where
    E: Executor,
    Obs: for<'a> Observer<Event<'a>, Action>,
    R: FnMut(&[f64], Improvement),
{
    let had_feasible = ctx.incumbents.feasible().is_some();
    let is_success = |improvement: Improvement| match improvement {
        Improvement::Feasible => true,
        Improvement::Infeasible => !had_feasible,
        Improvement::None => false,
    };

    let mut fresh: Vec<Vec<f64>> = Vec::with_capacity(candidates.len());
    for x in candidates {
        if ctx.history.lookup(&x).is_some() || fresh.contains(&x) {
            trace!(?x, "cache hit");
            ctx.history.record_cache_hit();
        } else {
            fresh.push(x);
        }
    }

    if let Some(reason) = ctx
        .stop
        .check_evaluation(ctx.history.counted(), ctx.best_feasible_f())
    {
        return ControlFlow::Break(reason);
    }

    let mut success = false;

    if executor.is_parallel() {
        let mut start = 0;
        while start < fresh.len() {
            if start > 0 {
                if let Some(reason) = ctx
                    .stop
                    .check_evaluation(ctx.history.counted(), ctx.best_feasible_f())
                {
                    return ControlFlow::Break(reason);
                }
            }

            // Each call counts at most once, so a batch no larger than the
            // remaining budget can never overshoot it.
            let pending = fresh.len() - start;
            let size = ctx
                .stop
                .remaining(ctx.history.counted())
                .map_or(pending, |remaining| remaining.min(pending));
            let batch = &fresh[start..start + size];
            start += size;
            trace!(size, pending, "evaluating batch");

            let results = executor.call_batch(batch);
            for (x, result) in batch.iter().zip(results) {
                let improvement = match record(ctx, x.clone(), result, observer) {
                    ControlFlow::Break(reason) => return ControlFlow::Break(reason),
                    ControlFlow::Continue(improvement) => improvement,
                };
                report(x, improvement);
                success |= is_success(improvement);
            }
        }
    } else {
        for (i, x) in fresh.into_iter().enumerate() {
            if i > 0 {
                if let Some(reason) = ctx
                    .stop
                    .check_evaluation(ctx.history.counted(), ctx.best_feasible_f())
                {
                    return ControlFlow::Break(reason);
                }
            }

            let result = executor.call(&x);
            let improvement = match record(ctx, x.clone(), result, observer) {
                ControlFlow::Break(reason) => return ControlFlow::Break(reason),
                ControlFlow::Continue(improvement) => improvement,
            };
            report(&x, improvement);
            success |= is_success(improvement);

            if success && ctx.config.opportunistic() {
                break;
            }
        }
    }

    ControlFlow::Continue(success)
}

/// Stores an evaluation result, updates the incumbents, and notifies the
/// observer.
fn record<Obs>(
    ctx: &mut RunContext<'_>,
    x: Vec<f64>,
    result: Result<Response, EvalError>,
    observer: &mut Obs,
) -> ControlFlow<StopReason, Improvement>
where
    Obs: for<'a> Observer<Event<'a>, Action>,
{
    let phase = ctx.phase;

    let action = match result {
        Ok(response) => {
            let barrier = ctx.config.barrier();
            let summary = barrier.summarize(&response.outputs);
            if response.count {
                ctx.stats.record(&response.outputs);
            }
            let index = ctx.history.push(x, response, summary, phase);
            let improvement = ctx.incumbents.offer(index, &ctx.history, barrier);

            trace!(
                tag = index,
                %phase,
                f = summary.f,
                h = summary.h,
                ?improvement,
                "evaluated"
            );
            let event = Event::Evaluated {
                record: ctx.history.get(index),
                improvement,
                progress: ctx.progress(),
            };
            match observer.observe(&event) {
                Some(Action::StopEarly) => None,
                None => Some(improvement),
            }
        }
        Err(error) => {
            warn!(%phase, %error, "discarding failed evaluation");
            ctx.history.record_failure();
            let event = Event::Failed {
                x: &x,
                phase,
                error: &error,
                progress: ctx.progress(),
            };
            match observer.observe(&event) {
                Some(Action::StopEarly) => None,
                None => Some(Improvement::None),
            }
        }
    };

    match action {
        Some(improvement) => ControlFlow::Continue(improvement),
        None => ControlFlow::Break(StopReason::StoppedByObserver),
    }
}
