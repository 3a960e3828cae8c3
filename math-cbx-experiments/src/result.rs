//! Results of an experiment and their CSV form.
//!
//! One row per run, with the header
//! `experiment_name,name_dynamic,name_f,index_config,time,best_f,best_x,config_dynamic`.
//! `time` is in milliseconds, `best_f` and `best_x` are bracketed lists and
//! `config_dynamic` is a JSON object.

use std::collections::BTreeMap;
use std::fs::create_dir_all;
use std::path::{Path, PathBuf};

use ndarray::{Array1, Array2};
use serde_json::Value;

use crate::config::ConfigOpt;
use crate::error::{ExperimentError, Result};

/// Column names of a result file.
pub const HEADER: [&str; 8] = [
    "experiment_name",
    "name_dynamic",
    "name_f",
    "index_config",
    "time",
    "best_f",
    "best_x",
    "config_dynamic",
];

/// Lower-cased experiment name with whitespace runs replaced by `_`, plus `.csv`.
pub fn result_file_name(experiment_name: &str) -> String {
    let stem = experiment_name
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");
    format!("{stem}.csv")
}

/// Outcome of one run
#[derive(Debug, Clone, PartialEq)]
pub struct ResultDynamicRun {
    /// Configuration name of the dynamic
    pub name_dynamic: String,
    /// Objective name
    pub name_f: String,
    /// Position of the configuration in the grid of its dynamic
    pub index_config: usize,
    /// Options the dynamic was built with
    pub config_dynamic: BTreeMap<String, Value>,
    /// Wall-clock time of `optimize`, in milliseconds
    pub time: u64,
    /// Objective value at `best_x`, per ensemble
    pub best_f: Array1<f64>,
    /// Best position, per ensemble
    pub best_x: Array2<f64>,
}

/// All runs of an experiment
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentResult {
    /// Experiment name
    pub experiment_name: String,
    /// Options of `optimize`; not persisted in the CSV file
    pub config_opt: ConfigOpt,
    /// One entry per run
    pub results_dynamic: Vec<ResultDynamicRun>,
}

fn format_vector(v: impl IntoIterator<Item = f64>) -> String {
    let items: Vec<String> = v.into_iter().map(|x| x.to_string()).collect();
    format!("[{}]", items.join(", "))
}

fn format_matrix(x: &Array2<f64>) -> String {
    let rows: Vec<String> = x
        .outer_iter()
        .map(|row| format_vector(row.iter().copied()))
        .collect();
    format!("[{}]", rows.join(", "))
}

fn parse_vector(s: &str) -> Option<Vec<f64>> {
    let inner = s.trim().strip_prefix('[')?.strip_suffix(']')?;
    if inner.trim().is_empty() {
        return Some(Vec::new());
    }
    inner.split(',').map(|t| t.trim().parse::<f64>().ok()).collect()
}

fn parse_matrix(s: &str) -> Option<Array2<f64>> {
    let mut rest = s.trim().strip_prefix('[')?.strip_suffix(']')?;
    let mut rows = Vec::new();
    loop {
        rest = rest.trim_start_matches([',', ' ']);
        if rest.is_empty() {
            break;
        }
        let end = rest.find(']')?;
        rows.push(parse_vector(&rest[..=end])?);
        rest = &rest[end + 1..];
    }
    let ncols = rows.first().map_or(0, Vec::len);
    if rows.iter().any(|r| r.len() != ncols) {
        return None;
    }
    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    Array2::from_shape_vec((rows.len(), ncols), flat).ok()
}

impl ResultDynamicRun {
    fn to_record(&self, experiment_name: &str) -> Result<Vec<String>> {
        Ok(vec![
            experiment_name.to_string(),
            self.name_dynamic.clone(),
            self.name_f.clone(),
            self.index_config.to_string(),
            self.time.to_string(),
            format_vector(self.best_f.iter().copied()),
            format_matrix(&self.best_x),
            serde_json::to_string(&self.config_dynamic)?,
        ])
    }

    fn from_record(record: &csv::StringRecord, path: &Path, row: usize) -> Result<Self> {
        let malformed = |reason: String| ExperimentError::MalformedRow {
            path: path.to_path_buf(),
            row,
            reason,
        };
        if record.len() != HEADER.len() {
            return Err(malformed(format!(
                "expected {} fields, got {}",
                HEADER.len(),
                record.len()
            )));
        }
        let index_config = record[3]
            .parse()
            .map_err(|_| malformed(format!("index_config '{}' is not an integer", &record[3])))?;
        let time = record[4]
            .parse()
            .map_err(|_| malformed(format!("time '{}' is not an integer", &record[4])))?;
        let best_f = parse_vector(&record[5])
            .ok_or_else(|| malformed(format!("best_f '{}' is not a list", &record[5])))?;
        let best_x = parse_matrix(&record[6])
            .ok_or_else(|| malformed(format!("best_x '{}' is not a matrix", &record[6])))?;
        let config_dynamic = serde_json::from_str(&record[7])
            .map_err(|e| malformed(format!("config_dynamic: {e}")))?;

        Ok(Self {
            name_dynamic: record[1].to_string(),
            name_f: record[2].to_string(),
            index_config,
            config_dynamic,
            time,
            best_f: Array1::from_vec(best_f),
            best_x,
        })
    }
}

impl ExperimentResult {
    /// Creates an empty result
    pub fn new(experiment_name: impl Into<String>, config_opt: ConfigOpt) -> Self {
        Self {
            experiment_name: experiment_name.into(),
            config_opt,
            results_dynamic: Vec::new(),
        }
    }

    /// Writes one row per run.
    pub fn to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(HEADER)?;
        for run in &self.results_dynamic {
            writer.write_record(run.to_record(&self.experiment_name)?)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Reads a file written by [`to_csv`](Self::to_csv).
    ///
    /// The experiment name is taken from the first row; `config_opt` is
    /// not persisted and comes back as the default.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = csv::Reader::from_path(path)?;
        let mut result = Self::new(String::new(), ConfigOpt::default());
        for (i, record) in reader.records().enumerate() {
            let record = record?;
            if i == 0 && !record.is_empty() {
                result.experiment_name = record[0].to_string();
            }
            result
                .results_dynamic
                .push(ResultDynamicRun::from_record(&record, path, i + 1)?);
        }
        Ok(result)
    }

    /// Writes the CSV file into `dir`, creating it if needed, and returns its path.
    pub fn save_in<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf> {
        let dir = dir.as_ref();
        create_dir_all(dir)?;
        let path = dir.join(result_file_name(&self.experiment_name));
        self.to_csv(&path)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use serde_json::json;

    fn sample() -> ExperimentResult {
        let mut result = ExperimentResult::new("Sweep Sigma", ConfigOpt::default());
        result.results_dynamic.push(ResultDynamicRun {
            name_dynamic: "cbo".into(),
            name_f: "ackley".into(),
            index_config: 3,
            config_dynamic: serde_json::from_value(json!({"d": 2, "sigma": 0.75, "noise": "anisotropic"}))
                .unwrap(),
            time: 42,
            best_f: array![1.5e-3, f64::INFINITY],
            best_x: array![[0.1, -0.25], [3.0, 1e-12]],
        });
        result
    }

    #[test]
    fn test_file_name() {
        assert_eq!(result_file_name("Sweep  Sigma\tRun"), "sweep_sigma_run.csv");
    }

    #[test]
    fn test_parse_matrix() {
        assert_eq!(parse_matrix("[[1, 2], [3, 4]]"), Some(array![[1.0, 2.0], [3.0, 4.0]]));
        assert_eq!(parse_matrix("[[1, 2], [3]]"), None);
        assert_eq!(parse_vector("[]"), Some(vec![]));
        assert_eq!(parse_vector("[1, x]"), None);
    }

    #[test]
    fn test_csv_header_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let result = sample();
        let path = result.save_in(dir.path().join("nested")).unwrap();
        assert!(path.ends_with("sweep_sigma.csv"));

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().next().unwrap(), HEADER.join(","));

        let loaded = ExperimentResult::from_csv(&path).unwrap();
        assert_eq!(loaded, result);
    }

    #[test]
    fn test_malformed_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(
            &path,
            format!("{}\nexp,cbo,sphere,zero,1,[1],[[1]],{{}}\n", HEADER.join(",")),
        )
        .unwrap();
        let err = ExperimentResult::from_csv(&path).unwrap_err();
        assert!(matches!(err, ExperimentError::MalformedRow { row: 1, .. }));
    }
}
