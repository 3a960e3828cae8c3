//! JSON description of an experiment.
//!
//! ```json
//! {
//!   "name": "Easy comparison",
//!   "selected_dynamics": ["cbo", "pso"],
//!   "config_dynamics": {
//!     "cbo": {
//!       "name_f": "all",
//!       "d": 2,
//!       "N": [20, 50],
//!       "sigma": {"range": [0.5, 1.5], "step": 0.5}
//!     }
//!   },
//!   "config_opt": {"sched": {"factor": 1.05, "maximum": 1e5}, "print_int": 100}
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use math_cbx::available_dynamics;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::error::Result;
use crate::result::result_file_name;

/// Keyword selecting every dynamic or every objective.
pub const ALL: &str = "all";

/// Complete experiment loaded from JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentFile {
    /// Experiment name; also names the result file
    pub name: String,
    /// Dynamics to run
    pub selected_dynamics: Selection,
    /// Option grid of every dynamic, keyed by dynamic name
    pub config_dynamics: BTreeMap<String, BTreeMap<String, OptionValue>>,
    /// Options of `optimize`
    #[serde(default)]
    pub config_opt: ConfigOpt,
}

/// Either the `"all"` keyword (or a single name) or an explicit list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Selection {
    /// `"all"` or a single name
    Keyword(String),
    /// Explicit list of names
    List(Vec<String>),
}

impl Selection {
    /// Names of the selected dynamics, in order.
    pub fn resolve_dynamics(&self) -> Vec<String> {
        match self {
            Selection::Keyword(k) if k == ALL => {
                available_dynamics().into_iter().map(String::from).collect()
            }
            Selection::Keyword(k) => vec![k.clone()],
            Selection::List(names) => names.clone(),
        }
    }
}

/// One entry of a dynamic's option grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    /// Inclusive grid `range[0], range[0] + step, ..., range[1]`
    Range {
        /// Start and end of the grid
        range: [Number; 2],
        /// Grid spacing; an integer step keeps the values integral
        step: Number,
    },
    /// Every listed value is tried
    List(Vec<Value>),
    /// A single value
    Scalar(Value),
}

/// Alpha scheduler settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SchedConfig {
    /// Multiplicative growth per step
    pub factor: f64,
    /// Upper bound of alpha
    pub maximum: f64,
}

impl Default for SchedConfig {
    fn default() -> Self {
        Self {
            factor: 1.05,
            maximum: 1e5,
        }
    }
}

/// Options passed to `optimize`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfigOpt {
    /// Alpha scheduler
    #[serde(default)]
    pub sched: SchedConfig,
    /// Progress logging interval; 0 disables it
    #[serde(default)]
    pub print_int: usize,
}

impl Default for ConfigOpt {
    fn default() -> Self {
        Self {
            sched: SchedConfig::default(),
            print_int: 0,
        }
    }
}

impl ExperimentFile {
    /// Load an experiment from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Parse an experiment from a JSON string
    pub fn from_json(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Save the experiment to a JSON file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Result file name: lower-cased, whitespace-separated words joined by `_`.
    pub fn result_file_name(&self) -> String {
        result_file_name(&self.name)
    }
}
