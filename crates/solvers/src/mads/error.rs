use thiserror::Error;

use super::{ConfigError, EvalError};

/// Errors that abort a MADS run.
#[derive(Debug, Error)]
pub enum Error {
    /// The configuration was rejected before any evaluation.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The initial point could not be evaluated, so no frame center exists.
    #[error("initial point could not be evaluated: {0}")]
    InitialEvaluation(#[source] EvalError),
}
