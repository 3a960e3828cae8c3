//! Execution of the runs of an experiment.

use std::path::PathBuf;
use std::time::Instant;

use log::info;
use math_cbx::{CbxError, Multiply, ParallelConfig, build_dynamic, get_objective_for_dim};
use ndarray::Axis;

use crate::config::{ConfigOpt, ExperimentFile};
use crate::error::Result;
use crate::generation::{RunPlan, generate_runs};
use crate::options::to_dynamic_config;
use crate::result::{ExperimentResult, ResultDynamicRun};

/// Default directory receiving result files.
pub const DEFAULT_RESULT_DIR: &str = "results";

/// Builds, times and evaluates every run of an experiment
#[derive(Debug, Clone)]
pub struct Runner {
    experiment: ExperimentFile,
    result_dir: Option<PathBuf>,
}

impl Runner {
    /// Runner writing to [`DEFAULT_RESULT_DIR`]
    pub fn new(experiment: ExperimentFile) -> Self {
        Self {
            experiment,
            result_dir: Some(PathBuf::from(DEFAULT_RESULT_DIR)),
        }
    }

    /// Sets the result directory; `None` keeps results in memory only.
    pub fn with_result_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.result_dir = dir;
        self
    }

    /// The experiment being run
    pub fn experiment(&self) -> &ExperimentFile {
        &self.experiment
    }

    /// Runs everything, writes the CSV file if a result directory is set
    /// and returns the collected results.
    pub fn run_experiment(&self) -> Result<ExperimentResult> {
        let mut result = ExperimentResult::new(&self.experiment.name, self.experiment.config_opt);
        result.results_dynamic = self.run_dynamic_configs()?;
        if let Some(dir) = &self.result_dir {
            let path = result.save_in(dir)?;
            info!("wrote {} runs to {}", result.results_dynamic.len(), path.display());
        }
        Ok(result)
    }

    /// Runs every configuration of the experiment, in grid order.
    pub fn run_dynamic_configs(&self) -> Result<Vec<ResultDynamicRun>> {
        let runs = generate_runs(&self.experiment)?;
        info!("experiment '{}': {} runs", self.experiment.name, runs.len());
        runs.iter()
            .map(|plan| run_single(plan, &self.experiment.config_opt))
            .collect()
    }
}

/// Builds the dynamic of `plan`, optimizes it and evaluates the objective
/// at the returned best positions.
pub fn run_single(plan: &RunPlan, config_opt: &ConfigOpt) -> Result<ResultDynamicRun> {
    let config = to_dynamic_config(&plan.config_dynamic)?;
    let parallel: ParallelConfig = config.parallel.clone();
    let d = config.effective_d().ok_or(CbxError::MissingDimension)?;
    let f = get_objective_for_dim(&plan.name_f, d)?;
    let mut dynamic = build_dynamic(plan.kind, f.clone(), config)?;
    let mut sched = Multiply::new(config_opt.sched.factor, config_opt.sched.maximum);
    let print_int = (config_opt.print_int > 0).then_some(config_opt.print_int);

    let start = Instant::now();
    let best_x = dynamic.optimize(&mut sched, print_int)?;
    let time = start.elapsed().as_millis() as u64;

    let best_f = f
        .evaluate(best_x.view().insert_axis(Axis(0)), &parallel)?
        .index_axis_move(Axis(0), 0);
    info!(
        "{} #{} on {}: {} ms, best_f = {:?}",
        plan.name_dynamic, plan.index_config, plan.name_f, time, best_f
    );

    Ok(ResultDynamicRun {
        name_dynamic: plan.name_dynamic.clone(),
        name_f: plan.name_f.clone(),
        index_config: plan.index_config,
        config_dynamic: plan.config_dynamic.clone(),
        time,
        best_f,
        best_x,
    })
}
