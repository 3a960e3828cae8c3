//! Expansion of an experiment file into individual runs.

use std::collections::BTreeMap;

use log::debug;
use math_cbx::{DynamicKind, available_objectives};
use serde_json::{Number, Value};

use crate::config::{ALL, ExperimentFile, OptionValue};
use crate::error::{ExperimentError, Result};

/// Key naming the objective in a dynamic's option grid.
pub const NAME_F: &str = "name_f";

/// One point of the grid of a dynamic
#[derive(Debug, Clone, PartialEq)]
pub struct RunPlan {
    /// Configuration name of the dynamic
    pub name_dynamic: String,
    /// Parsed dynamic
    pub kind: DynamicKind,
    /// Objective name
    pub name_f: String,
    /// Position of this configuration in the grid of its dynamic
    pub index_config: usize,
    /// Options of the dynamic, without `name_f`
    pub config_dynamic: BTreeMap<String, Value>,
}

/// Inclusive grid `start, start + step, ..., end`.
///
/// With an integer `step` values are rounded to integers; otherwise they are
/// rounded to 4 decimals.
///
/// # Errors
///
/// `InvalidRange` if `step` is not positive or `end < start`.
pub fn range_values(key: &str, start: &Number, end: &Number, step: &Number) -> Result<Vec<Value>> {
    let invalid = |reason| ExperimentError::InvalidRange {
        key: key.to_string(),
        reason,
    };
    let (Some(a), Some(b), Some(h)) = (start.as_f64(), end.as_f64(), step.as_f64()) else {
        return Err(invalid("bounds and step must be numbers"));
    };
    if h <= 0.0 {
        return Err(invalid("step must be positive"));
    }
    if b < a {
        return Err(invalid("end must not be smaller than start"));
    }
    let integral = step.is_i64() || step.is_u64();
    // the offset keeps `end` in the grid when (b - a) / h lands just below an integer
    let count = ((b - a) / h + 1e-9).floor() as usize + 1;

    Ok((0..count)
        .map(|i| {
            let x = a + h * i as f64;
            if integral {
                Value::from(x.round() as i64)
            } else {
                Value::from((x * 1e4).round() / 1e4)
            }
        })
        .collect())
}

/// Candidate values of every option, in key order.
fn expand_options(options: &BTreeMap<String, OptionValue>) -> Result<Vec<(String, Vec<Value>)>> {
    options
        .iter()
        .map(|(key, value)| {
            let values = match value {
                OptionValue::Range { range, step } => range_values(key, &range[0], &range[1], step)?,
                OptionValue::Scalar(Value::String(s)) if key == NAME_F && s == ALL => {
                    available_objectives().into_iter().map(Value::from).collect()
                }
                OptionValue::List(values) => values.clone(),
                OptionValue::Scalar(v) => vec![v.clone()],
            };
            Ok((key.clone(), values))
        })
        .collect()
}

/// Cartesian product of the candidate values; the last key varies fastest.
///
/// An option with no candidate yields an empty product.
pub fn cartesian_product(axes: &[(String, Vec<Value>)]) -> Vec<BTreeMap<String, Value>> {
    let mut combos = vec![BTreeMap::new()];
    for (key, values) in axes {
        let mut next = Vec::with_capacity(combos.len() * values.len());
        for combo in &combos {
            for value in values {
                let mut c = combo.clone();
                c.insert(key.clone(), value.clone());
                next.push(c);
            }
        }
        combos = next;
    }
    combos
}

/// Every run of the experiment, grouped by dynamic in selection order.
///
/// # Errors
///
/// Unknown dynamic names, dynamics without configuration, configurations
/// without an objective and malformed ranges.
pub fn generate_runs(file: &ExperimentFile) -> Result<Vec<RunPlan>> {
    let mut runs = Vec::new();
    for name_dynamic in file.selected_dynamics.resolve_dynamics() {
        let kind: DynamicKind = name_dynamic.parse()?;
        let options = file.config_dynamics.get(&name_dynamic).ok_or_else(|| {
            ExperimentError::MissingDynamicConfig {
                name: name_dynamic.clone(),
            }
        })?;
        if !options.contains_key(NAME_F) {
            return Err(ExperimentError::MissingObjective { name: name_dynamic });
        }

        let grid = cartesian_product(&expand_options(options)?);
        debug!("{}: {} configurations", name_dynamic, grid.len());
        for (index_config, mut config_dynamic) in grid.into_iter().enumerate() {
            let name_f = match config_dynamic.remove(NAME_F) {
                Some(Value::String(s)) => s,
                Some(other) => {
                    return Err(ExperimentError::InvalidOption {
                        key: NAME_F.to_string(),
                        value: other.to_string(),
                        expected: "an objective name",
                    });
                }
                None => return Err(ExperimentError::MissingObjective { name: name_dynamic }),
            };
            runs.push(RunPlan {
                name_dynamic: name_dynamic.clone(),
                kind,
                name_f,
                index_config,
                config_dynamic,
            });
        }
    }
    Ok(runs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn num(v: Value) -> Number {
        match v {
            Value::Number(n) => n,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_range_values_float_step() {
        let values = range_values("sigma", &num(json!(0.1)), &num(json!(1.0)), &num(json!(0.1))).unwrap();
        assert_eq!(values.len(), 10);
        assert_eq!(values[2], json!(0.3));
        assert_eq!(values[9], json!(1.0));
    }

    #[test]
    fn test_range_values_integer_step() {
        let values = range_values("N", &num(json!(10)), &num(json!(50)), &num(json!(20))).unwrap();
        assert_eq!(values, vec![json!(10), json!(30), json!(50)]);
        assert!(values.iter().all(Value::is_i64));
    }

    #[test]
    fn test_range_values_rejects_bad_grids() {
        let err = range_values("dt", &num(json!(1)), &num(json!(2)), &num(json!(0))).unwrap_err();
        assert!(matches!(err, ExperimentError::InvalidRange { .. }));
        let err = range_values("dt", &num(json!(2)), &num(json!(1)), &num(json!(1))).unwrap_err();
        assert!(matches!(err, ExperimentError::InvalidRange { .. }));
    }

    #[test]
    fn test_cartesian_product_order() {
        let axes = vec![
            ("a".to_string(), vec![json!(1), json!(2)]),
            ("b".to_string(), vec![json!("x"), json!("y"), json!("z")]),
        ];
        let combos = cartesian_product(&axes);
        assert_eq!(combos.len(), 6);
        assert_eq!(combos[0]["a"], json!(1));
        assert_eq!(combos[0]["b"], json!("x"));
        assert_eq!(combos[1]["b"], json!("y"));
        assert_eq!(combos[3]["a"], json!(2));
        assert_eq!(combos[3]["b"], json!("x"));
    }

    #[test]
    fn test_generate_runs_counts_and_indices() {
        let file = ExperimentFile::from_json(
            &json!({
                "name": "grid",
                "selected_dynamics": ["cbo", "pso"],
                "config_dynamics": {
                    "cbo": {"name_f": ["sphere", "ackley"], "d": 2, "sigma": {"range": [0.5, 1.0], "step": 0.25}},
                    "pso": {"name_f": "all", "d": 2}
                }
            })
            .to_string(),
        )
        .unwrap();
        let runs = generate_runs(&file).unwrap();
        let cbo: Vec<_> = runs.iter().filter(|r| r.name_dynamic == "cbo").collect();
        let pso: Vec<_> = runs.iter().filter(|r| r.name_dynamic == "pso").collect();
        assert_eq!(cbo.len(), 2 * 3);
        assert_eq!(pso.len(), available_objectives().len());
        assert_eq!(cbo.last().unwrap().index_config, 5);
        assert_eq!(pso[0].index_config, 0);
        assert_eq!(pso[0].kind, DynamicKind::Pso);
        assert!(runs.iter().all(|r| !r.config_dynamic.contains_key(NAME_F)));
    }

    #[test]
    fn test_generate_runs_errors() {
        let file = ExperimentFile::from_json(
            &json!({"name": "e", "selected_dynamics": ["cbo"], "config_dynamics": {}}).to_string(),
        )
        .unwrap();
        assert!(matches!(
            generate_runs(&file).unwrap_err(),
            ExperimentError::MissingDynamicConfig { .. }
        ));

        let file = ExperimentFile::from_json(
            &json!({"name": "e", "selected_dynamics": ["cbo"], "config_dynamics": {"cbo": {"d": 2}}})
                .to_string(),
        )
        .unwrap();
        assert!(matches!(
            generate_runs(&file).unwrap_err(),
            ExperimentError::MissingObjective { .. }
        ));

        let file = ExperimentFile::from_json(
            &json!({"name": "e", "selected_dynamics": "annealing", "config_dynamics": {}}).to_string(),
        )
        .unwrap();
        assert!(matches!(generate_runs(&file).unwrap_err(), ExperimentError::Cbx(_)));
    }
}
