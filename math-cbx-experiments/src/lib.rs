//! Experiment orchestration for the consensus-based optimizers.
//!
//! An experiment is a JSON file selecting dynamics and, for each, a grid of
//! options. Every point of the Cartesian product of the grid is built,
//! optimized and timed; results are written to a CSV file.
//!
//! ```rust,no_run
//! use math_cbx_experiments::{ExperimentFile, Runner};
//!
//! let experiment = ExperimentFile::from_file("configs/easy.json").expect("valid experiment");
//! let result = Runner::new(experiment).run_experiment().expect("runs");
//! println!("{} runs", result.results_dynamic.len());
//! ```
#![warn(missing_docs)]

pub mod error;
pub use error::{ExperimentError, Result};

/// JSON experiment files.
pub mod config;
/// Expansion of option grids into runs.
pub mod generation;
/// Option maps to optimizer configurations.
pub mod options;
/// Experiment results and their CSV form.
pub mod result;
/// Timed execution of runs.
pub mod runner;

pub use config::{ConfigOpt, ExperimentFile, OptionValue, SchedConfig, Selection};
pub use generation::{RunPlan, cartesian_product, generate_runs, range_values};
pub use options::{KNOWN_OPTIONS, apply_option, to_dynamic_config};
pub use result::{ExperimentResult, ResultDynamicRun, result_file_name};
pub use runner::{Runner, run_single};
