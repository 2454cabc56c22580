use mads_core::{Blackbox, Response};
use rayon::prelude::*;
use thiserror::Error;

/// Errors that discard a single evaluation.
///
/// Evaluation errors are reported to the observer and the run continues,
/// except for the initial point where no incumbent could be established.
#[derive(Debug, Error)]
pub enum EvalError {
    /// The blackbox returned a different number of outputs than declared.
    #[error("blackbox returned {actual} outputs, expected {expected}")]
    OutputCount { expected: usize, actual: usize },

    /// The blackbox returned a NaN output.
    #[error("blackbox output {index} is NaN")]
    NotANumber { index: usize },

    /// The blackbox itself failed.
    #[error("blackbox error: {0}")]
    Blackbox(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Calls the blackbox on one point or a batch of points.
pub(super) trait Executor {
    /// Returns `true` if batches are evaluated concurrently.
    fn is_parallel(&self) -> bool;

    fn call(&self, x: &[f64]) -> Result<Response, EvalError>;

    /// Evaluates a batch, returning results in the order of `points`.
    fn call_batch(&self, points: &[Vec<f64>]) -> Vec<Result<Response, EvalError>>;
}

/// Evaluates one point at a time on the calling thread.
pub(super) struct Sequential<'a, B> {
    blackbox: &'a B,
    n_outputs: usize,
}

impl<'a, B: Blackbox> Sequential<'a, B> {
    pub(super) fn new(blackbox: &'a B, n_outputs: usize) -> Self {
        Self {
            blackbox,
            n_outputs,
        }
    }
}

impl<B: Blackbox> Executor for Sequential<'_, B> {
    fn is_parallel(&self) -> bool {
        false
    }

    fn call(&self, x: &[f64]) -> Result<Response, EvalError> {
        evaluate(self.blackbox, x, self.n_outputs)
    }

    fn call_batch(&self, points: &[Vec<f64>]) -> Vec<Result<Response, EvalError>> {
        points.iter().map(|x| self.call(x)).collect()
    }
}

/// Evaluates batches on the `rayon` thread pool.
pub(super) struct Parallel<'a, B> {
    blackbox: &'a B,
    n_outputs: usize,
}

impl<'a, B: Blackbox + Sync> Parallel<'a, B> {
    pub(super) fn new(blackbox: &'a B, n_outputs: usize) -> Self {
        Self {
            blackbox,
            n_outputs,
        }
    }
}

impl<B: Blackbox + Sync> Executor for Parallel<'_, B> {
    fn is_parallel(&self) -> bool {
        true
    }

    fn call(&self, x: &[f64]) -> Result<Response, EvalError> {
        evaluate(self.blackbox, x, self.n_outputs)
    }

    fn call_batch(&self, points: &[Vec<f64>]) -> Vec<Result<Response, EvalError>> {
        points
            .par_iter()
            .map(|x| evaluate(self.blackbox, x, self.n_outputs))
            .collect()
    }
}

/// Calls the blackbox and checks the shape and values of its outputs.
///
/// # Errors
///
/// Returns an error if the blackbox fails, returns the wrong number of
/// outputs, or returns a NaN output.
fn evaluate<B: Blackbox>(blackbox: &B, x: &[f64], n_outputs: usize) -> Result<Response, EvalError> {
    let response = blackbox
        .evaluate(x)
        .map_err(|e| EvalError::Blackbox(Box::new(e)))?;

    if response.outputs.len() != n_outputs {
        return Err(EvalError::OutputCount {
            expected: n_outputs,
            actual: response.outputs.len(),
        });
    }

    if let Some(index) = response.outputs.iter().position(|v| v.is_nan()) {
        return Err(EvalError::NotANumber { index });
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    use thiserror::Error;

    #[test]
    fn rejects_wrong_output_count() {
        let bb = |x: &[f64]| (true, vec![x[0]]);
        let executor = Sequential::new(&bb, 2);

        let result = executor.call(&[1.0]);

        assert!(matches!(
            result,
            Err(EvalError::OutputCount {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn rejects_nan_outputs() {
        let bb = |_: &[f64]| (true, vec![1.0, f64::NAN]);
        let executor = Sequential::new(&bb, 2);

        assert!(matches!(
            executor.call(&[0.0]),
            Err(EvalError::NotANumber { index: 1 })
        ));
    }

    #[derive(Debug, Error)]
    #[error("simulation diverged")]
    struct Diverged;

    struct Diverges;

    impl Blackbox for Diverges {
        type Error = Diverged;

        fn evaluate(&self, _x: &[f64]) -> Result<Response, Self::Error> {
            Err(Diverged)
        }
    }

    #[test]
    fn wraps_blackbox_errors() {
        let executor = Sequential::new(&Diverges, 1);
        let err = executor.call(&[0.0]).unwrap_err();
        assert_eq!(err.to_string(), "blackbox error: simulation diverged");
    }

    #[test]
    fn parallel_batch_preserves_order() {
        let bb = |x: &[f64]| (true, vec![x[0] * 2.0]);
        let executor = Parallel::new(&bb, 1);
        let points: Vec<Vec<f64>> = (0..64).map(|i| vec![f64::from(i)]).collect();

        let results = executor.call_batch(&points);

        for (i, result) in results.into_iter().enumerate() {
            let response = result.unwrap();
            assert_eq!(response.outputs, vec![2.0 * i as f64]);
        }
        assert!(executor.is_parallel());
    }
}
