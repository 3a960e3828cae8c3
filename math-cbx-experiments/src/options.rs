//! Translation of JSON option maps into [`DynamicConfig`].
//!
//! Keys follow the names used in experiment files (`M`, `N`, `d`, `dt`, ...);
//! anything not listed in [`KNOWN_OPTIONS`] is rejected.

use std::collections::BTreeMap;

use math_cbx::{BatchConfig, DynamicConfig};
use serde_json::Value;

use crate::error::{ExperimentError, Result};

/// Every option key understood by [`to_dynamic_config`].
pub const KNOWN_OPTIONS: &[&str] = &[
    "M",
    "N",
    "d",
    "x_min",
    "x_max",
    "dt",
    "alpha",
    "lamda",
    "sigma",
    "noise",
    "correction",
    "correction_eps",
    "seed",
    "batch_size",
    "batch_partial",
    "max_it",
    "max_eval",
    "energy_tol",
    "diff_tol",
    "max_time",
    "max_thresh",
    "reshuffle",
    "verbosity",
    "lamda_memory",
    "sigma_memory",
    "inertia",
    "friction",
    "mode",
    "kernel",
    "kappa",
    "kernel_factor_mode",
];

fn invalid(key: &str, value: &Value, expected: &'static str) -> ExperimentError {
    ExperimentError::InvalidOption {
        key: key.to_string(),
        value: value.to_string(),
        expected,
    }
}

fn as_f64(key: &str, value: &Value) -> Result<f64> {
    value.as_f64().ok_or_else(|| invalid(key, value, "a number"))
}

fn as_usize(key: &str, value: &Value) -> Result<usize> {
    // 20.0 is accepted as well, range grids with float steps produce such values
    if let Some(v) = value.as_u64() {
        return Ok(v as usize);
    }
    match value.as_f64() {
        Some(v) if v >= 0.0 && v.fract() == 0.0 => Ok(v as usize),
        _ => Err(invalid(key, value, "a non-negative integer")),
    }
}

fn as_str<'a>(key: &str, value: &'a Value) -> Result<&'a str> {
    value.as_str().ok_or_else(|| invalid(key, value, "a string"))
}

fn as_bool(key: &str, value: &Value) -> Result<bool> {
    value.as_bool().ok_or_else(|| invalid(key, value, "a boolean"))
}

/// Applies one option to `config`.
///
/// # Errors
///
/// `UnknownOption` for keys outside [`KNOWN_OPTIONS`], `InvalidOption` for
/// mistyped values and the parse errors of the optimizer for unknown names.
pub fn apply_option(config: &mut DynamicConfig, key: &str, value: &Value) -> Result<()> {
    match key {
        "M" => config.m = as_usize(key, value)?,
        "N" => config.n = as_usize(key, value)?,
        "d" => config.d = Some(as_usize(key, value)?),
        "x_min" => config.x_min = as_f64(key, value)?,
        "x_max" => config.x_max = as_f64(key, value)?,
        "dt" => config.dt = as_f64(key, value)?,
        "alpha" => config.alpha = as_f64(key, value)?,
        "lamda" => config.lamda = as_f64(key, value)?,
        "sigma" => config.sigma = as_f64(key, value)?,
        "noise" => config.noise = Some(as_str(key, value)?.parse()?),
        "correction" => config.correction = Some(as_str(key, value)?.parse()?),
        "correction_eps" => config.correction_eps = as_f64(key, value)?,
        "seed" => config.seed = Some(as_usize(key, value)? as u64),
        "batch_size" => {
            let size = as_usize(key, value)?;
            let partial = config.batch.is_none_or(|b| b.partial);
            config.batch = Some(BatchConfig { size, partial });
        }
        "batch_partial" => {
            let partial = as_bool(key, value)?;
            let size = config.batch.map_or(config.n, |b| b.size);
            config.batch = Some(BatchConfig { size, partial });
        }
        "max_it" => config.max_it = Some(as_usize(key, value)?),
        "max_eval" => config.max_eval = Some(as_usize(key, value)?),
        "energy_tol" => config.energy_tol = Some(as_f64(key, value)?),
        "diff_tol" => config.diff_tol = Some(as_f64(key, value)?),
        "max_time" => config.max_time = Some(as_f64(key, value)?),
        "max_thresh" => config.post_process.max_thresh = as_f64(key, value)?,
        "reshuffle" => config.post_process.reshuffle_interval = Some(as_usize(key, value)?),
        "verbosity" => config.verbosity = as_usize(key, value)?,
        "lamda_memory" => config.lamda_memory = as_f64(key, value)?,
        "sigma_memory" => config.sigma_memory = Some(as_f64(key, value)?),
        "inertia" => config.inertia = as_f64(key, value)?,
        "friction" => config.friction = Some(as_f64(key, value)?),
        "mode" => config.cbs_mode = as_str(key, value)?.parse()?,
        "kernel" => config.kernel = as_str(key, value)?.parse()?,
        "kappa" => config.kappa = as_f64(key, value)?,
        "kernel_factor_mode" => config.kernel_factor_mode = as_str(key, value)?.parse()?,
        _ => {
            return Err(ExperimentError::UnknownOption {
                key: key.to_string(),
            });
        }
    }
    Ok(())
}

/// Builds and validates a configuration from an option map.
///
/// `batch_size` and `batch_partial` are order independent: the map is
/// visited in key order and each one keeps what the other already set.
pub fn to_dynamic_config(options: &BTreeMap<String, Value>) -> Result<DynamicConfig> {
    let mut config = DynamicConfig::default();
    for (key, value) in options {
        apply_option(&mut config, key, value)?;
    }
    config.validate()?;
    Ok(config)
}
