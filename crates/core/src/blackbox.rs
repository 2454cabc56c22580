use std::convert::Infallible;

/// The outputs of a single blackbox call.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Whether this call counts toward the evaluation budget.
    pub count: bool,

    /// Raw outputs, ordered like the declared output types.
    pub outputs: Vec<f64>,
}

impl Response {
    /// Creates a response that counts toward the evaluation budget.
    #[must_use]
    pub fn counted(outputs: Vec<f64>) -> Self {
        Self {
            count: true,
            outputs,
        }
    }

    /// Creates a response that does not count toward the evaluation budget.
    #[must_use]
    pub fn uncounted(outputs: Vec<f64>) -> Self {
        Self {
            count: false,
            outputs,
        }
    }
}

impl From<(bool, Vec<f64>)> for Response {
    fn from((count, outputs): (bool, Vec<f64>)) -> Self {
        Self { count, outputs }
    }
}

/// An opaque, possibly expensive function evaluated at a point.
///
/// A blackbox maps a point `x` (one value per variable) to an ordered vector of
/// outputs: the objective, constraints, and any statistics, in the order the
/// problem declares them. The solver never looks inside the function and never
/// needs a gradient.
///
/// Blackboxes should be deterministic. The solver caches evaluated points and
/// reproducible runs rely on the same point giving the same outputs.
///
/// Closures of the form `Fn(&[f64]) -> (bool, Vec<f64>)` implement this trait,
/// where the boolean says whether the call counts toward the budget.
pub trait Blackbox {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Evaluates the blackbox at `x`.
    ///
    /// # Errors
    ///
    /// Each blackbox defines its own `Error` type for failed evaluations.
    fn evaluate(&self, x: &[f64]) -> Result<Response, Self::Error>;
}

/// Blanket implementation for blackbox closures.
impl<F> Blackbox for F
where
    F: Fn(&[f64]) -> (bool, Vec<f64>),
{
    type Error = Infallible;

    fn evaluate(&self, x: &[f64]) -> Result<Response, Self::Error> {
        Ok(self(x).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use thiserror::Error;

    #[test]
    fn closure_is_a_blackbox() {
        let bb = |x: &[f64]| (true, vec![x[0] * x[0], 1.0 - x[0]]);

        let response = bb.evaluate(&[2.0]).unwrap();

        assert!(response.count);
        assert_eq!(response.outputs, vec![4.0, -1.0]);
    }

    #[derive(Debug, Error)]
    #[error("negative input")]
    struct NegativeInput;

    struct SqrtBox;

    impl Blackbox for SqrtBox {
        type Error = NegativeInput;

        fn evaluate(&self, x: &[f64]) -> Result<Response, Self::Error> {
            if x[0] < 0.0 {
                return Err(NegativeInput);
            }
            Ok(Response::uncounted(vec![x[0].sqrt()]))
        }
    }

    #[test]
    fn struct_blackbox_reports_errors() {
        assert!(SqrtBox.evaluate(&[-1.0]).is_err());

        let response = SqrtBox.evaluate(&[4.0]).unwrap();
        assert!(!response.count);
        assert_eq!(response.outputs, vec![2.0]);
    }
}
