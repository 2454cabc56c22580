use std::time::Duration;

use mads_core::{InputType, OutputType};
use thiserror::Error;

use super::{
    BarrierKind, ConstraintSpecError, DirectionType, Parameters, SearchType, barrier::Barrier,
    mesh::Mesh,
};

/// Largest supported number of variables.
pub const MAX_DIMENSION: usize = 1000;

/// A validated MADS configuration.
///
/// Built from [`Parameters`] with [`Parameters::validate`], or in code
/// starting from [`Config::builder`].
#[derive(Debug, Clone)]
pub struct Config {
    x0: Vec<f64>,
    output_types: Vec<OutputType>,
    input_types: Vec<InputType>,
    lower: Vec<f64>,
    upper: Vec<f64>,
    barrier: Barrier,
    base_sizes: Vec<f64>,
    max_bb_eval: Option<usize>,
    max_time: Option<Duration>,
    max_iterations: Option<usize>,
    f_target: Option<f64>,
    display: DisplayOptions,
    direction_type: DirectionType,
    seed: u64,
    min_mesh_size: f64,
    min_poll_size: f64,
    opportunistic: bool,
    search: SearchType,
    mesh_expansion: f64,
    mesh_contraction: f64,
}

/// Presentation options, honored only by observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayOptions {
    /// 0 is silent, 1 reports improvements, 2 adds iterations, 3 adds every
    /// evaluation.
    pub degree: u8,

    /// Report every evaluation, not only improvements.
    pub all_eval: bool,

    /// Keyword template of a displayed line, such as `"bbe ( sol ) obj"`.
    pub stats: String,
}

/// Errors that can occur when validating MADS parameters.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("dimension must be set and positive")]
    MissingDimension,

    #[error("dimension {dimension} exceeds the maximum of {}", MAX_DIMENSION)]
    DimensionTooLarge { dimension: usize },

    #[error("x0 has {actual} entries, expected {expected}")]
    X0Length { expected: usize, actual: usize },

    #[error("x0[{index}] is not finite")]
    NonFiniteX0 { index: usize },

    #[error("{which} has {actual} entries, expected {expected}")]
    BoundLength {
        which: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("bounds of variable {index} are NaN or inverted")]
    InvertedBounds { index: usize },

    #[error("x0[{index}] lies outside its bounds")]
    X0OutOfBounds { index: usize },

    #[error("input_types has {actual} entries, expected {expected}")]
    InputTypesLength { expected: usize, actual: usize },

    #[error("x0[{index}] must be integral for an integer or binary variable")]
    NonIntegralX0 { index: usize },

    #[error("bounds of discrete variable {index} contain no integer")]
    EmptyDiscreteRange { index: usize },

    #[error("invalid output types: {0}")]
    Constraints(#[from] ConstraintSpecError),

    #[error("initial_poll_size must have 1 or dimension entries, all finite and positive")]
    InitialPollSize,

    #[error("mesh_expansion must be finite and greater than 1")]
    MeshExpansion,

    #[error("mesh_contraction must be in (0, 1)")]
    MeshContraction,

    #[error("min_mesh_size must be finite and positive")]
    MinMeshSize,

    #[error("min_poll_size must be finite and non-negative")]
    MinPollSize,

    #[error("max_time must be finite and non-negative")]
    MaxTime,

    #[error("h_max_0 must be positive")]
    HMax0,

    #[error("f_target must be finite")]
    FTarget,

    #[error("display_degree must be between 0 and 3")]
    DisplayDegree,
}

impl Config {
    /// Starts a parameter set from an initial point and output types.
    ///
    /// The dimension is taken from `x0`. Every other option keeps its default
    /// until changed with the `with_*` methods of [`Parameters`].
    #[must_use]
    pub fn builder(x0: Vec<f64>, output_types: Vec<OutputType>) -> Parameters {
        Parameters::new(x0, output_types)
    }

    /// Validates parameters into a config.
    ///
    /// Integer and binary bounds are rounded inward, and binary variables are
    /// additionally bounded to `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns the first problem found with the parameters.
    pub fn from_parameters(params: &Parameters) -> Result<Self, ConfigError> {
        let n = params.dimension;
        if n == 0 {
            return Err(ConfigError::MissingDimension);
        }
        if n > MAX_DIMENSION {
            return Err(ConfigError::DimensionTooLarge { dimension: n });
        }

        if params.x0.len() != n {
            return Err(ConfigError::X0Length {
                expected: n,
                actual: params.x0.len(),
            });
        }
        if let Some(index) = params.x0.iter().position(|v| !v.is_finite()) {
            return Err(ConfigError::NonFiniteX0 { index });
        }

        let h_max_0 = params.h_max_0.unwrap_or(f64::INFINITY);
        if h_max_0.is_nan() || h_max_0 <= 0.0 {
            return Err(ConfigError::HMax0);
        }
        let barrier = Barrier::new(&params.output_types, h_max_0)?;

        let input_types = if params.input_types.is_empty() {
            vec![InputType::Real; n]
        } else if params.input_types.len() == n {
            params.input_types.clone()
        } else {
            return Err(ConfigError::InputTypesLength {
                expected: n,
                actual: params.input_types.len(),
            });
        };

        let mut lower = bound_or(&params.lower_bound, "lower_bound", n, f64::NEG_INFINITY)?;
        let mut upper = bound_or(&params.upper_bound, "upper_bound", n, f64::INFINITY)?;
        for index in 0..n {
            if lower[index].is_nan() || upper[index].is_nan() || lower[index] > upper[index] {
                return Err(ConfigError::InvertedBounds { index });
            }
            match input_types[index] {
                InputType::Real => {}
                kind => {
                    if kind == InputType::Binary {
                        lower[index] = lower[index].max(0.0);
                        upper[index] = upper[index].min(1.0);
                    }
                    lower[index] = lower[index].ceil();
                    upper[index] = upper[index].floor();
                    if lower[index] > upper[index] {
                        return Err(ConfigError::EmptyDiscreteRange { index });
                    }
                    if params.x0[index].fract() != 0.0 {
                        return Err(ConfigError::NonIntegralX0 { index });
                    }
                }
            }
            if !(lower[index]..=upper[index]).contains(&params.x0[index]) {
                return Err(ConfigError::X0OutOfBounds { index });
            }
        }

        let base_sizes = base_sizes(params, &input_types, &lower, &upper)?;

        if !params.mesh_expansion.is_finite() || params.mesh_expansion <= 1.0 {
            return Err(ConfigError::MeshExpansion);
        }
        if !(params.mesh_contraction > 0.0 && params.mesh_contraction < 1.0) {
            return Err(ConfigError::MeshContraction);
        }
        if !params.min_mesh_size.is_finite() || params.min_mesh_size <= 0.0 {
            return Err(ConfigError::MinMeshSize);
        }
        if !params.min_poll_size.is_finite() || params.min_poll_size < 0.0 {
            return Err(ConfigError::MinPollSize);
        }
        if !params.max_time.is_finite() || params.max_time < 0.0 {
            return Err(ConfigError::MaxTime);
        }
        if params.f_target.is_some_and(|f| !f.is_finite()) {
            return Err(ConfigError::FTarget);
        }
        if params.display_degree > 3 {
            return Err(ConfigError::DisplayDegree);
        }

        Ok(Self {
            x0: params.x0.clone(),
            output_types: params.output_types.clone(),
            input_types,
            lower,
            upper,
            barrier,
            base_sizes,
            max_bb_eval: (params.max_bb_eval > 0).then_some(params.max_bb_eval),
            // Limits too long for a `Duration` never trigger.
            max_time: (params.max_time > 0.0)
                .then(|| Duration::try_from_secs_f64(params.max_time).ok())
                .flatten(),
            max_iterations: (params.max_iterations > 0).then_some(params.max_iterations),
            f_target: params.f_target,
            display: DisplayOptions {
                degree: params.display_degree,
                all_eval: params.display_all_eval,
                stats: params.display_stats.clone(),
            },
            direction_type: params.direction_type,
            seed: params.seed,
            min_mesh_size: params.min_mesh_size,
            min_poll_size: params.min_poll_size,
            opportunistic: params.opportunistic,
            search: params.search,
            mesh_expansion: params.mesh_expansion,
            mesh_contraction: params.mesh_contraction,
        })
    }

    /// Returns the number of variables.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.x0.len()
    }

    /// Returns the initial point.
    #[must_use]
    pub fn x0(&self) -> &[f64] {
        &self.x0
    }

    /// Returns the output types, in blackbox output order.
    #[must_use]
    pub fn output_types(&self) -> &[OutputType] {
        &self.output_types
    }

    /// Returns the input type of every variable.
    #[must_use]
    pub fn input_types(&self) -> &[InputType] {
        &self.input_types
    }

    /// Returns the lower bounds (`-∞` where unbounded).
    #[must_use]
    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    /// Returns the upper bounds (`+∞` where unbounded).
    #[must_use]
    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    /// Returns the barrier strategy selected from the output types.
    #[must_use]
    pub fn barrier_kind(&self) -> BarrierKind {
        self.barrier.kind()
    }

    /// Returns the counted evaluation budget, if limited.
    #[must_use]
    pub fn max_bb_eval(&self) -> Option<usize> {
        self.max_bb_eval
    }

    /// Returns the wall-clock limit, if any.
    #[must_use]
    pub fn max_time(&self) -> Option<Duration> {
        self.max_time
    }

    /// Returns the iteration limit, if any.
    #[must_use]
    pub fn max_iterations(&self) -> Option<usize> {
        self.max_iterations
    }

    /// Returns the feasible objective value that stops the run, if any.
    #[must_use]
    pub fn f_target(&self) -> Option<f64> {
        self.f_target
    }

    #[must_use]
    pub fn display(&self) -> &DisplayOptions {
        &self.display
    }

    #[must_use]
    pub fn direction_type(&self) -> DirectionType {
        self.direction_type
    }

    /// Returns the seed of the run's random generator.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Returns whether a sequential poll stops at its first improvement.
    #[must_use]
    pub fn opportunistic(&self) -> bool {
        self.opportunistic
    }

    /// Returns the configured search step.
    #[must_use]
    pub fn search(&self) -> SearchType {
        self.search
    }

    pub(super) fn barrier(&self) -> &Barrier {
        &self.barrier
    }

    /// Builds the initial mesh of a run.
    pub(super) fn initial_mesh(&self) -> Mesh {
        Mesh::new(
            self.base_sizes.clone(),
            self.input_types.clone(),
            self.mesh_expansion,
            self.mesh_contraction,
            self.min_mesh_size,
            self.min_poll_size,
        )
    }
}

fn bound_or(
    values: &[f64],
    which: &'static str,
    n: usize,
    unbounded: f64,
) -> Result<Vec<f64>, ConfigError> {
    match values.len() {
        0 => Ok(vec![unbounded; n]),
        len if len == n => Ok(values.to_vec()),
        actual => Err(ConfigError::BoundLength {
            which,
            expected: n,
            actual,
        }),
    }
}

/// Per-variable base sizes that the mesh and poll fractions scale.
///
/// An explicit `initial_poll_size` wins. Otherwise a variable uses 10% of its
/// bound range when both bounds are finite, else a tenth of `|x0_i|`, else 1.
/// Discrete variables use at least 1 and fixed variables use 0.
fn base_sizes(
    params: &Parameters,
    input_types: &[InputType],
    lower: &[f64],
    upper: &[f64],
) -> Result<Vec<f64>, ConfigError> {
    let n = params.x0.len();
    let explicit = match params.initial_poll_size.len() {
        0 => None,
        1 => Some(vec![params.initial_poll_size[0]; n]),
        len if len == n => Some(params.initial_poll_size.clone()),
        _ => return Err(ConfigError::InitialPollSize),
    };
    if let Some(sizes) = &explicit {
        if sizes.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(ConfigError::InitialPollSize);
        }
    }

    Ok((0..n)
        .map(|i| {
            if lower[i] == upper[i] {
                return 0.0;
            }
            let size = match &explicit {
                Some(sizes) => sizes[i],
                None if lower[i].is_finite() && upper[i].is_finite() => {
                    0.1 * (upper[i] - lower[i])
                }
                None if params.x0[i] != 0.0 => params.x0[i].abs() / 10.0,
                None => 1.0,
            };
            if input_types[i].is_discrete() {
                size.round().max(1.0)
            } else {
                size
            }
        })
        .collect())
}
