use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use math_cbx_experiments::{ExperimentFile, Runner};

#[derive(Parser, Debug)]
#[command(
    name = "run-experiments",
    about = "Run a grid of consensus-based optimizer configurations and store the results as CSV"
)]
struct Cli {
    /// Experiment description (JSON)
    #[arg(long)]
    config: PathBuf,

    /// Directory receiving the result file
    #[arg(long, default_value = "results")]
    result_dir: PathBuf,

    /// Only list the runs that would be executed
    #[arg(long)]
    dry_run: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Cli::parse();

    let experiment = ExperimentFile::from_file(&args.config)
        .with_context(|| format!("cannot load experiment {}", args.config.display()))?;

    if args.dry_run {
        let runs = math_cbx_experiments::generate_runs(&experiment)?;
        println!("Experiment '{}': {} runs", experiment.name, runs.len());
        for run in runs {
            println!(
                "{:>12} #{:<4} {:<16} {}",
                run.name_dynamic,
                run.index_config,
                run.name_f,
                serde_json::to_string(&run.config_dynamic)?
            );
        }
        return Ok(());
    }

    let runner = Runner::new(experiment).with_result_dir(Some(args.result_dir.clone()));
    let result = runner.run_experiment()?;

    println!(
        "Experiment '{}' finished: {} runs",
        result.experiment_name,
        result.results_dynamic.len()
    );
    for run in &result.results_dynamic {
        let best = run.best_f.iter().copied().fold(f64::INFINITY, f64::min);
        println!(
            "{:>12} #{:<4} {:<16} {:>8} ms  best_f = {:.6e}",
            run.name_dynamic, run.index_config, run.name_f, run.time, best
        );
    }
    println!(
        "Results written to {}",
        args.result_dir
            .join(runner.experiment().result_file_name())
            .display()
    );
    Ok(())
}
