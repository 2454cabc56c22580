use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The meaning of one blackbox output.
///
/// Output types are declared in the same order as the blackbox returns its
/// outputs. Constraints follow the `c(x) <= 0` convention: a positive value is
/// a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OutputType {
    /// Objective value to be minimized (`"OBJ"`).
    Objective,

    /// Progressive barrier constraint (`"PB"` or `"CSTR"`).
    ProgressiveBarrier,

    /// Extreme barrier constraint (`"EB"`).
    ExtremeBarrier,

    /// Filter approach constraint (`"F"`).
    Filter,

    /// Hybrid extreme/progressive barrier constraint (`"PEB"`).
    Hybrid,

    /// Value averaged over all counted evaluations (`"STAT_AVG"`).
    StatAvg,

    /// Value summed over all counted evaluations (`"STAT_SUM"`).
    StatSum,

    /// Ignored output (`"NOTHING"` or `"-"`).
    Nothing,
}

impl OutputType {
    /// Returns `true` for every constraint kind.
    #[must_use]
    pub fn is_constraint(self) -> bool {
        matches!(
            self,
            Self::ProgressiveBarrier | Self::ExtremeBarrier | Self::Filter | Self::Hybrid
        )
    }

    /// Returns the canonical tag for this output type.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::Objective => "OBJ",
            Self::ProgressiveBarrier => "PB",
            Self::ExtremeBarrier => "EB",
            Self::Filter => "F",
            Self::Hybrid => "PEB",
            Self::StatAvg => "STAT_AVG",
            Self::StatSum => "STAT_SUM",
            Self::Nothing => "NOTHING",
        }
    }
}

/// The kind of value a variable takes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum InputType {
    /// Continuous variable (`"R"`).
    #[default]
    Real,

    /// Integer variable (`"I"`).
    Integer,

    /// Binary variable taking values 0 or 1 (`"B"`).
    Binary,
}

impl InputType {
    /// Returns `true` if the variable only takes integral values.
    #[must_use]
    pub fn is_discrete(self) -> bool {
        !matches!(self, Self::Real)
    }

    /// Returns the canonical tag for this input type.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::Real => "R",
            Self::Integer => "I",
            Self::Binary => "B",
        }
    }
}

/// Error returned when a type tag is not recognized.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown {kind} type tag `{tag}`")]
pub struct ParseKindError {
    kind: &'static str,
    tag: String,
}

impl FromStr for OutputType {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OBJ" => Ok(Self::Objective),
            "PB" | "CSTR" => Ok(Self::ProgressiveBarrier),
            "EB" => Ok(Self::ExtremeBarrier),
            "F" => Ok(Self::Filter),
            "PEB" => Ok(Self::Hybrid),
            "STAT_AVG" => Ok(Self::StatAvg),
            "STAT_SUM" => Ok(Self::StatSum),
            "NOTHING" | "-" => Ok(Self::Nothing),
            _ => Err(ParseKindError {
                kind: "output",
                tag: s.to_string(),
            }),
        }
    }
}

impl FromStr for InputType {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "R" => Ok(Self::Real),
            "I" => Ok(Self::Integer),
            "B" => Ok(Self::Binary),
            _ => Err(ParseKindError {
                kind: "input",
                tag: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl TryFrom<String> for OutputType {
    type Error = ParseKindError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl TryFrom<String> for InputType {
    type Error = ParseKindError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OutputType> for String {
    fn from(value: OutputType) -> Self {
        value.tag().to_string()
    }
}

impl From<InputType> for String {
    fn from(value: InputType) -> Self {
        value.tag().to_string()
    }
}
