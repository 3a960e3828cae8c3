use ndarray::{Array1, Array3};
use std::fs::{File, create_dir_all};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Snapshot of the ensemble state after one step
#[derive(Debug, Clone)]
pub struct IterationRecord {
    /// Iteration number (index of the step that just ran)
    pub iteration: usize,
    /// Best energy found so far, per ensemble
    pub best_energy: Array1<f64>,
    /// Minimum energy of the consensus batch, per ensemble
    pub f_min: Array1<f64>,
    /// Consensus sharpness, per ensemble
    pub alpha: Array1<f64>,
    /// Normalised position change of the step, per ensemble
    pub update_diff: Array1<f64>,
    /// Consensus point, when tracked
    pub consensus: Option<Array3<f64>>,
}

/// Per-iteration history of a run
#[derive(Debug, Clone, Default)]
pub struct History {
    records: Vec<IterationRecord>,
}

impl History {
    /// Creates an empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record
    pub fn push(&mut self, record: IterationRecord) {
        self.records.push(record);
    }

    /// All records in iteration order
    pub fn records(&self) -> &[IterationRecord] {
        &self.records
    }

    /// Number of recorded iterations
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Best energy of ensemble `ensemble` at every recorded iteration
    pub fn best_energy_trace(&self, ensemble: usize) -> Vec<f64> {
        self.records
            .iter()
            .map(|r| r.best_energy[ensemble])
            .collect()
    }

    /// Writes one row per iteration and ensemble.
    ///
    /// Columns: `iteration,ensemble,best_energy,f_min,alpha,update_diff`.
    /// Parent directories are created if missing.
    pub fn to_csv<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            create_dir_all(parent)?;
        }
        let mut file = BufWriter::new(File::create(path)?);

        writeln!(file, "iteration,ensemble,best_energy,f_min,alpha,update_diff")?;
        for record in &self.records {
            for i in 0..record.best_energy.len() {
                writeln!(
                    file,
                    "{},{},{:.16},{:.16},{:.16},{:.16}",
                    record.iteration,
                    i,
                    record.best_energy[i],
                    record.f_min[i],
                    record.alpha[i],
                    record.update_diff[i]
                )?;
            }
        }

        file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn record(iteration: usize, best: f64) -> IterationRecord {
        IterationRecord {
            iteration,
            best_energy: array![best, best + 1.0],
            f_min: array![best, best + 1.0],
            alpha: array![1.0, 1.0],
            update_diff: array![0.5, 0.25],
            consensus: None,
        }
    }

    #[test]
    fn test_history_trace() {
        let mut history = History::new();
        history.push(record(0, 3.0));
        history.push(record(1, 2.0));
        assert_eq!(history.len(), 2);
        assert_eq!(history.best_energy_trace(1), vec![4.0, 3.0]);
    }

    #[test]
    fn test_history_csv() {
        let mut history = History::new();
        history.push(record(0, 3.0));
        let dir = std::env::temp_dir().join("math_cbx_history_test");
        let path = dir.join("history.csv");
        history.to_csv(&path).expect("write history");

        let content = std::fs::read_to_string(&path).expect("read history");
        let lines: Vec<&str> = content.trim().lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "iteration,ensemble,best_energy,f_min,alpha,update_diff");
        assert!(lines[2].starts_with("0,1,4.0"));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
