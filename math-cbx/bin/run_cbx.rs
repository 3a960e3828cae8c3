use anyhow::{Context, bail};
use clap::Parser;
use math_cbx::{
    CallbackAction, CorrectionKind, DynamicConfigBuilder, DynamicKind, FunctionRegistry, Multiply,
    NoiseKind, available_dynamics, build_dynamic,
};
use std::fmt::Write as FmtWrite;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(
    name = "run-cbx",
    about = "Run a consensus-based optimizer on a selected benchmark function"
)]
struct Cli {
    /// Dynamic to run (use --list-dynamics to see available options)
    #[arg(long, default_value = "cbo")]
    dynamic: String,

    /// Name of the benchmark function to optimize (use --list-functions to see available options)
    #[arg(long)]
    function: Option<String>,

    /// Dimensionality of the problem (defaults to the function's fixed dimension, else 2)
    #[arg(long)]
    dim: Option<usize>,

    /// Number of independent ensembles
    #[arg(short = 'm', long, default_value_t = 1)]
    ensembles: usize,

    /// Particles per ensemble
    #[arg(short = 'n', long, default_value_t = 50)]
    particles: usize,

    /// Maximum number of iterations
    #[arg(long, default_value_t = 1000)]
    max_it: usize,

    /// Time step
    #[arg(long, default_value_t = 0.1)]
    dt: f64,

    /// Initial consensus sharpness
    #[arg(long, default_value_t = 1.0)]
    alpha: f64,

    /// Drift strength
    #[arg(long, default_value_t = 1.0)]
    lamda: f64,

    /// Noise scale
    #[arg(long, default_value_t = 1.0)]
    sigma: f64,

    /// Noise model (isotropic, anisotropic, covariance, exponential)
    #[arg(long)]
    noise: Option<String>,

    /// Drift correction (no_correction, heavi_side, heavi_side_reg, clip)
    #[arg(long)]
    correction: Option<String>,

    /// Optional random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Growth factor of the alpha scheduler
    #[arg(long, default_value_t = 1.05)]
    sched_factor: f64,

    /// Upper bound of the alpha scheduler
    #[arg(long, default_value_t = 1e5)]
    sched_maximum: f64,

    /// Print intermediate progress every N iterations (>= 1)
    #[arg(long, default_value_t = 50)]
    print_int: usize,

    /// Stop the optimization after this many seconds (optional)
    #[arg(long)]
    max_seconds: Option<f64>,

    /// List all available functions and exit
    #[arg(long)]
    list_functions: bool,

    /// List all available dynamics and exit
    #[arg(long)]
    list_dynamics: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Cli::parse();
    let registry = FunctionRegistry::new();

    if args.list_functions {
        let names = registry.list_functions();
        println!("Available test functions ({}):", names.len());
        for name in names {
            println!("- {name}");
        }
        return Ok(());
    }
    if args.list_dynamics {
        println!("Available dynamics:");
        for name in available_dynamics() {
            println!("- {name}");
        }
        return Ok(());
    }

    let Some(function_name) = args.function.as_deref().map(str::trim) else {
        bail!("--function must be provided unless --list-functions is used");
    };
    let info = registry.get(function_name).with_context(|| {
        format!("function '{function_name}' not found, use --list-functions to inspect available names")
    })?;
    if args.print_int == 0 {
        bail!("--print-int must be at least 1");
    }

    let kind: DynamicKind = args.dynamic.parse()?;
    let dimension = args.dim.or(info.dim).unwrap_or(2);
    let (x_min, x_max) = info.bounds;

    let mut builder = DynamicConfigBuilder::new()
        .m(args.ensembles)
        .n(args.particles)
        .d(dimension)
        .bounds(x_min, x_max)
        .dt(args.dt)
        .alpha(args.alpha)
        .lamda(args.lamda)
        .sigma(args.sigma)
        .max_it(args.max_it)
        .verbosity(1);
    if let Some(noise) = &args.noise {
        builder = builder.noise(noise.parse::<NoiseKind>()?);
    }
    if let Some(correction) = &args.correction {
        builder = builder.correction(correction.parse::<CorrectionKind>()?);
    }
    if let Some(seed) = args.seed {
        builder = builder.seed(seed);
    }
    if let Some(limit) = args.max_seconds {
        builder = builder.max_time(limit);
    }
    let config = builder.build()?;

    let objective = registry.get_objective_for_dim(function_name, dimension)?;
    let mut dynamic = build_dynamic(kind, objective, config)?;
    let mut sched = Multiply::new(args.sched_factor, args.sched_maximum);

    println!(
        "Running {} on '{}' ({}D, M = {}, N = {})...",
        kind, function_name, dimension, args.ensembles, args.particles
    );

    let start = Instant::now();
    let print_int = args.print_int;
    dynamic.optimize_with_callback(&mut sched, None, &mut |intermediate| {
        if intermediate.iter == 1 || intermediate.iter % print_int == 0 {
            println!(
                "iter {:>5} | best = {:>12.6e} | f_min = {:>12.6e} | alpha = {:>10.3e}",
                intermediate.iter,
                intermediate.best_energy[0],
                intermediate.f_min[0],
                intermediate.alpha[0]
            );
        }
        CallbackAction::Continue
    })?;

    let report = dynamic.report();
    println!("\nOptimization completed in {:.2?}", start.elapsed());
    if let Some(reason) = report.termination {
        println!("Status: {reason}");
    }
    println!(
        "Iterations: {} | Evaluations per ensemble: {}",
        report.nit, report.num_f_eval
    );
    println!("Known minimum: {:.6e}", info.minimum);
    for (i, (row, f)) in report
        .best_x
        .outer_iter()
        .zip(report.best_f.iter())
        .enumerate()
    {
        let mut best_vector = String::new();
        for (idx, value) in row.iter().enumerate() {
            if idx > 0 {
                best_vector.push_str(", ");
            }
            let _ = write!(&mut best_vector, "{value:.6}");
        }
        println!("Ensemble {i}: f = {f:.6e} at [{best_vector}]");
    }
    Ok(())
}
