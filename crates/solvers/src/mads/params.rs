use mads_core::{InputType, OutputType};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use super::{Config, ConfigError, DirectionType, SearchType};

/// Errors that can occur when decoding a parameter file.
#[derive(Debug, Error)]
pub enum ParamsError {
    #[error("invalid TOML parameters: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid JSON parameters: {0}")]
    Json(#[from] serde_json::Error),
}

/// Every recognized MADS option, as read from a parameter file.
///
/// All options except `dimension`, `x0` and `output_types` have defaults.
/// Empty bound lists mean unbounded; inside a list, an infinite entry (`inf`
/// in TOML, `null` in JSON) leaves that side of the variable unbounded.
/// Zero budgets (`max_bb_eval`, `max_time`, `max_iterations`) mean unlimited.
///
/// ```toml
/// dimension = 2
/// x0 = [3.0, 3.0]
/// output_types = ["OBJ", "EB"]
/// lower_bound = [-inf, 0.0]
/// max_bb_eval = 200
///
/// [search]
/// type = "latin_hypercube"
/// initial = 10
/// per_iteration = 2
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Parameters {
    pub dimension: usize,
    pub x0: Vec<f64>,
    pub output_types: Vec<OutputType>,
    pub input_types: Vec<InputType>,

    #[serde(deserialize_with = "lower_bound")]
    pub lower_bound: Vec<f64>,

    #[serde(deserialize_with = "upper_bound")]
    pub upper_bound: Vec<f64>,

    pub max_bb_eval: usize,

    /// Wall-clock limit in seconds.
    pub max_time: f64,

    pub max_iterations: usize,
    pub f_target: Option<f64>,
    pub display_all_eval: bool,
    pub display_degree: u8,
    pub display_stats: String,
    pub direction_type: DirectionType,
    pub seed: u64,

    /// One size for every variable, or one per variable. Empty derives the
    /// sizes from the bounds and `x0`.
    pub initial_poll_size: Vec<f64>,

    pub min_mesh_size: f64,
    pub min_poll_size: f64,

    /// Fixed violation threshold of `PEB` constraints and initial threshold
    /// of the progressive barrier. `None` is unlimited.
    pub h_max_0: Option<f64>,

    pub opportunistic: bool,
    pub search: SearchType,
    pub mesh_expansion: f64,
    pub mesh_contraction: f64,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            dimension: 0,
            x0: Vec::new(),
            output_types: Vec::new(),
            input_types: Vec::new(),
            lower_bound: Vec::new(),
            upper_bound: Vec::new(),
            max_bb_eval: 0,
            max_time: 0.0,
            max_iterations: 0,
            f_target: None,
            display_all_eval: false,
            display_degree: 2,
            display_stats: String::from("bbe ( sol ) obj"),
            direction_type: DirectionType::default(),
            seed: 0,
            initial_poll_size: Vec::new(),
            min_mesh_size: 1e-13,
            min_poll_size: 0.0,
            h_max_0: None,
            opportunistic: true,
            search: SearchType::default(),
            mesh_expansion: 2.0,
            mesh_contraction: 0.5,
        }
    }
}

impl Parameters {
    /// Creates parameters for `x0`, taking the dimension from its length.
    #[must_use]
    pub fn new(x0: Vec<f64>, output_types: Vec<OutputType>) -> Self {
        Self {
            dimension: x0.len(),
            x0,
            output_types,
            ..Self::default()
        }
    }

    /// Decodes parameters from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid TOML or contains an
    /// unknown or mistyped option.
    pub fn from_toml_str(text: &str) -> Result<Self, ParamsError> {
        Ok(toml::from_str(text)?)
    }

    /// Decodes parameters from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid JSON or contains an
    /// unknown or mistyped option.
    pub fn from_json_str(text: &str) -> Result<Self, ParamsError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Validates the parameters into a [`Config`].
    ///
    /// # Errors
    ///
    /// Returns the first problem found with the parameters.
    pub fn validate(&self) -> Result<Config, ConfigError> {
        Config::from_parameters(self)
    }

    #[must_use]
    pub fn with_input_types(mut self, input_types: Vec<InputType>) -> Self {
        self.input_types = input_types;
        self
    }

    #[must_use]
    pub fn with_bounds(mut self, lower: Vec<f64>, upper: Vec<f64>) -> Self {
        self.lower_bound = lower;
        self.upper_bound = upper;
        self
    }

    #[must_use]
    pub fn with_max_bb_eval(mut self, max_bb_eval: usize) -> Self {
        self.max_bb_eval = max_bb_eval;
        self
    }

    /// Sets the wall-clock limit in seconds.
    #[must_use]
    pub fn with_max_time(mut self, seconds: f64) -> Self {
        self.max_time = seconds;
        self
    }

    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    #[must_use]
    pub fn with_f_target(mut self, f_target: f64) -> Self {
        self.f_target = Some(f_target);
        self
    }

    #[must_use]
    pub fn with_display(mut self, degree: u8, all_eval: bool, stats: impl Into<String>) -> Self {
        self.display_degree = degree;
        self.display_all_eval = all_eval;
        self.display_stats = stats.into();
        self
    }

    #[must_use]
    pub fn with_direction_type(mut self, direction_type: DirectionType) -> Self {
        self.direction_type = direction_type;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_initial_poll_size(mut self, sizes: Vec<f64>) -> Self {
        self.initial_poll_size = sizes;
        self
    }

    #[must_use]
    pub fn with_min_sizes(mut self, min_mesh_size: f64, min_poll_size: f64) -> Self {
        self.min_mesh_size = min_mesh_size;
        self.min_poll_size = min_poll_size;
        self
    }

    #[must_use]
    pub fn with_h_max_0(mut self, h_max_0: f64) -> Self {
        self.h_max_0 = Some(h_max_0);
        self
    }

    #[must_use]
    pub fn with_opportunistic(mut self, opportunistic: bool) -> Self {
        self.opportunistic = opportunistic;
        self
    }

    #[must_use]
    pub fn with_search(mut self, search: SearchType) -> Self {
        self.search = search;
        self
    }

    #[must_use]
    pub fn with_mesh_factors(mut self, expansion: f64, contraction: f64) -> Self {
        self.mesh_expansion = expansion;
        self.mesh_contraction = contraction;
        self
    }
}

fn lower_bound<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
    bounds(deserializer, f64::NEG_INFINITY)
}

fn upper_bound<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
    bounds(deserializer, f64::INFINITY)
}

/// Reads a bound list where `null` entries mean unbounded.
fn bounds<'de, D: Deserializer<'de>>(deserializer: D, missing: f64) -> Result<Vec<f64>, D::Error> {
    let entries = Vec::<Option<f64>>::deserialize(deserializer)?;
    Ok(entries.into_iter().map(|v| v.unwrap_or(missing)).collect())
}
