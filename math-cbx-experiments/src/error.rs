//! Error types for experiment orchestration.

use std::path::PathBuf;

use math_cbx::CbxError;
use thiserror::Error;

/// Errors raised while loading, expanding or running an experiment.
#[derive(Debug, Error)]
pub enum ExperimentError {
    /// The optimizer rejected a configuration or failed during a run.
    #[error(transparent)]
    Cbx(#[from] CbxError),

    /// Reading or writing a file failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The experiment file is not valid JSON for [`ExperimentFile`](crate::ExperimentFile).
    #[error("invalid experiment file: {0}")]
    Json(#[from] serde_json::Error),

    /// A result file could not be read or written as CSV.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// A dynamic is selected but has no entry in `config_dynamics`.
    #[error("dynamic '{name}' is selected but not configured")]
    MissingDynamicConfig {
        /// Name of the dynamic
        name: String,
    },

    /// A configuration of a dynamic does not name its objective.
    #[error("configuration of dynamic '{name}' has no name_f entry")]
    MissingObjective {
        /// Name of the dynamic
        name: String,
    },

    /// An option key is not understood by the dynamics.
    #[error("unknown option '{key}'")]
    UnknownOption {
        /// Offending key
        key: String,
    },

    /// An option value has the wrong type or range.
    #[error("invalid value {value} for option '{key}': expected {expected}")]
    InvalidOption {
        /// Option key
        key: String,
        /// Offending value, as JSON
        value: String,
        /// Description of the accepted values
        expected: &'static str,
    },

    /// A `{range, step}` grid is empty or not numeric.
    #[error("invalid range for option '{key}': {reason}")]
    InvalidRange {
        /// Option key
        key: String,
        /// Human readable constraint
        reason: &'static str,
    },

    /// A CSV row does not have the expected layout.
    #[error("malformed result row {row} in {}: {reason}", path.display())]
    MalformedRow {
        /// File being read
        path: PathBuf,
        /// 1-based data row
        row: usize,
        /// What went wrong
        reason: String,
    },
}

/// Result type for experiment operations.
pub type Result<T> = std::result::Result<T, ExperimentError>;
