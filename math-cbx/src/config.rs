//! Configuration of a particle dynamic.

use std::fmt;
use std::str::FromStr;

use ndarray::{Array, ArrayD, Dimension};

use crate::batch::BatchConfig;
use crate::correction::{Correction, CorrectionKind};
use crate::error::{CbxError, Result};
use crate::kernel::{KernelFactorMode, KernelKind};
use crate::noise::{Noise, NoiseKind};
use crate::objective::FDim;
use crate::parallel_eval::ParallelConfig;
use crate::post_process::{PostProcess, PostProcessConfig};

/// Initialization scheme for the particles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Init {
    /// Uniform random positions in `[x_min, x_max]`.
    #[default]
    Uniform,
    /// Latin Hypercube Sampling within every ensemble.
    LatinHypercube,
}

impl FromStr for Init {
    type Err = CbxError;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "uniform" | "random" => Ok(Init::Uniform),
            "latin_hypercube" | "latinhypercube" | "lhs" => Ok(Init::LatinHypercube),
            _ => Err(CbxError::UnknownStrategy {
                kind: "init",
                name: s.to_string(),
            }),
        }
    }
}

/// Purpose of a CBS run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CbsMode {
    /// Sample from the Gibbs measure: `lamda = 1 / (1 + alpha)`.
    #[default]
    Sampling,
    /// Concentrate at the minimizer: `lamda = 1`.
    Optimization,
}

impl FromStr for CbsMode {
    type Err = CbxError;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sampling" => Ok(CbsMode::Sampling),
            "optimization" => Ok(CbsMode::Optimization),
            _ => Err(CbxError::UnknownStrategy {
                kind: "cbs_mode",
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for CbsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CbsMode::Sampling => f.write_str("sampling"),
            CbsMode::Optimization => f.write_str("optimization"),
        }
    }
}

/// Configuration shared by every dynamic.
///
/// Variant options are ignored by the variants that do not use them.
pub struct DynamicConfig {
    /// Number of independent ensembles `M`.
    pub m: usize,
    /// Particles per ensemble `N`.
    pub n: usize,
    /// Dimension `d`; required unless `x` is given.
    pub d: Option<usize>,
    /// Lower bound of the initial sampling box.
    pub x_min: f64,
    /// Upper bound of the initial sampling box.
    pub x_max: f64,
    /// Explicit initial positions of rank 1, 2 or 3. Overrides `m`, `n`, `d`.
    pub x: Option<ArrayD<f64>>,
    /// Time step.
    pub dt: f64,
    /// Drift strength.
    pub lamda: f64,
    /// Noise scale.
    pub sigma: f64,
    /// Consensus sharpness.
    pub alpha: f64,
    /// Noise model; `None` selects the variant's default.
    pub noise: Option<NoiseKind>,
    /// Custom noise model, takes precedence over `noise`.
    pub noise_model: Option<Box<dyn Noise>>,
    /// Drift correction; `None` selects `no_correction`.
    pub correction: Option<CorrectionKind>,
    /// Custom correction, takes precedence over `correction`.
    pub correction_model: Option<Box<dyn Correction>>,
    /// Smoothing width of `heavi_side_reg` and norm bound of `clip`.
    pub correction_eps: f64,
    /// Arity expected from the objective.
    pub f_dim: FDim,
    /// Initialization scheme.
    pub init: Init,
    /// Optional random seed for reproducibility.
    pub seed: Option<u64>,
    /// Optional mini-batching.
    pub batch: Option<BatchConfig>,
    /// Iteration budget.
    pub max_it: Option<usize>,
    /// Objective evaluation budget per ensemble.
    pub max_eval: Option<usize>,
    /// Stop an ensemble once its batch minimum falls below this value.
    pub energy_tol: Option<f64>,
    /// Stop an ensemble once its update size falls below this value.
    pub diff_tol: Option<f64>,
    /// Wall-clock budget in seconds.
    pub max_time: Option<f64>,
    /// Sanitising and reshuffling after every step.
    pub post_process: PostProcessConfig,
    /// Custom pipeline, takes precedence over `post_process`.
    pub post_process_pipeline: Option<Box<dyn PostProcess>>,
    /// Parallel evaluation of point-wise objectives.
    pub parallel: ParallelConfig,
    /// Record per-iteration history.
    pub track_history: bool,
    /// Store the consensus in the history records.
    pub track_consensus: bool,
    /// 0 is silent, 1 logs progress, 2 also logs step details.
    pub verbosity: usize,
    /// Memory drift strength (CBO with memory, PSO).
    pub lamda_memory: f64,
    /// Memory noise scale; `None` means `lamda_memory * sigma`.
    pub sigma_memory: Option<f64>,
    /// PSO inertia `m`.
    pub inertia: f64,
    /// PSO friction `gamma`; `None` means `1 - inertia`.
    pub friction: Option<f64>,
    /// CBS mode.
    pub cbs_mode: CbsMode,
    /// Polar kernel family.
    pub kernel: KernelKind,
    /// Polar kernel width.
    pub kappa: f64,
    /// Scaling of the polar kernel term.
    pub kernel_factor_mode: KernelFactorMode,
}

impl Default for DynamicConfig {
    fn default() -> Self {
        Self {
            m: 1,
            n: 20,
            d: None,
            x_min: -1.0,
            x_max: 1.0,
            x: None,
            dt: 0.01,
            lamda: 1.0,
            sigma: 5.1,
            alpha: 1.0,
            noise: None,
            noise_model: None,
            correction: None,
            correction_model: None,
            correction_eps: 1e-3,
            f_dim: FDim::default(),
            init: Init::default(),
            seed: None,
            batch: None,
            max_it: Some(1000),
            max_eval: None,
            energy_tol: None,
            diff_tol: None,
            max_time: None,
            post_process: PostProcessConfig::default(),
            post_process_pipeline: None,
            parallel: ParallelConfig::default(),
            track_history: false,
            track_consensus: false,
            verbosity: 0,
            lamda_memory: 0.4,
            sigma_memory: None,
            inertia: 0.001,
            friction: None,
            cbs_mode: CbsMode::default(),
            kernel: KernelKind::default(),
            kappa: 1.0,
            kernel_factor_mode: KernelFactorMode::default(),
        }
    }
}

impl fmt::Debug for DynamicConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicConfig")
            .field("m", &self.m)
            .field("n", &self.n)
            .field("d", &self.d)
            .field("x_min", &self.x_min)
            .field("x_max", &self.x_max)
            .field("x", &self.x.as_ref().map(|x| x.shape().to_vec()))
            .field("dt", &self.dt)
            .field("lamda", &self.lamda)
            .field("sigma", &self.sigma)
            .field("alpha", &self.alpha)
            .field("noise", &self.noise)
            .field("correction", &self.correction)
            .field("f_dim", &self.f_dim)
            .field("init", &self.init)
            .field("seed", &self.seed)
            .field("batch", &self.batch)
            .field("max_it", &self.max_it)
            .field("max_eval", &self.max_eval)
            .field("energy_tol", &self.energy_tol)
            .field("diff_tol", &self.diff_tol)
            .field("max_time", &self.max_time)
            .finish_non_exhaustive()
    }
}

fn positive(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(CbxError::InvalidParameter {
            name,
            value,
            reason: "must be finite and positive",
        })
    }
}

fn non_negative(name: &'static str, value: f64) -> Result<()> {
    if value >= 0.0 {
        Ok(())
    } else {
        Err(CbxError::InvalidParameter {
            name,
            value,
            reason: "must be non-negative",
        })
    }
}

impl DynamicConfig {
    /// Particles per ensemble after taking `x` into account.
    pub(crate) fn effective_n(&self) -> usize {
        match &self.x {
            Some(x) if x.ndim() >= 2 => x.shape()[x.ndim() - 2],
            Some(_) => 1,
            None => self.n,
        }
    }

    /// Particle dimension after taking `x` into account.
    pub fn effective_d(&self) -> Option<usize> {
        match &self.x {
            Some(x) => x.shape().last().copied(),
            None => self.d,
        }
    }

    /// Checks every structural constraint.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint as a configuration error.
    pub fn validate(&self) -> Result<()> {
        match &self.x {
            Some(x) => {
                if !(1..=3).contains(&x.ndim()) {
                    return Err(CbxError::InvalidInitialShape { rank: x.ndim() });
                }
                if x.is_empty() {
                    let shape = x.shape();
                    let at = |k: usize| shape.len().checked_sub(k).map_or(1, |i| shape[i]);
                    return Err(CbxError::EmptyEnsemble {
                        m: if shape.len() == 3 { shape[0] } else { 1 },
                        n: at(2),
                        d: at(1),
                    });
                }
            }
            None => {
                let d = self.d.ok_or(CbxError::MissingDimension)?;
                if self.m == 0 || self.n == 0 || d == 0 {
                    return Err(CbxError::EmptyEnsemble {
                        m: self.m,
                        n: self.n,
                        d,
                    });
                }
                if self.x_min > self.x_max || self.x_min.is_nan() || self.x_max.is_nan() {
                    return Err(CbxError::InvalidBounds {
                        x_min: self.x_min,
                        x_max: self.x_max,
                    });
                }
            }
        }

        positive("dt", self.dt)?;
        non_negative("lamda", self.lamda)?;
        non_negative("sigma", self.sigma)?;
        non_negative("alpha", self.alpha)?;
        positive("correction_eps", self.correction_eps)?;
        positive("max_thresh", self.post_process.max_thresh)?;
        non_negative("lamda_memory", self.lamda_memory)?;
        if let Some(s) = self.sigma_memory {
            non_negative("sigma_memory", s)?;
        }
        non_negative("inertia", self.inertia)?;
        if let Some(g) = self.friction {
            non_negative("friction", g)?;
            positive("inertia + friction", self.inertia + g)?;
        }
        positive("kappa", self.kappa)?;

        if let Some(batch) = &self.batch {
            let n = self.effective_n();
            if batch.size == 0 || batch.size > n {
                return Err(CbxError::InvalidBatchSize {
                    size: batch.size,
                    n,
                });
            }
        }
        Ok(())
    }
}

/// Fluent builder for [`DynamicConfig`].
///
/// # Example
///
/// ```rust
/// use math_cbx::{DynamicConfigBuilder, NoiseKind};
///
/// let config = DynamicConfigBuilder::new()
///     .d(2)
///     .n(50)
///     .alpha(30.0)
///     .noise(NoiseKind::Anisotropic)
///     .seed(42)
///     .build()
///     .expect("valid config");
/// assert_eq!(config.n, 50);
/// ```
pub struct DynamicConfigBuilder {
    cfg: DynamicConfig,
}

impl Default for DynamicConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DynamicConfigBuilder {
    /// Creates a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            cfg: DynamicConfig::default(),
        }
    }
    /// Sets the number of ensembles.
    pub fn m(mut self, v: usize) -> Self {
        self.cfg.m = v;
        self
    }
    /// Sets the number of particles per ensemble.
    pub fn n(mut self, v: usize) -> Self {
        self.cfg.n = v;
        self
    }
    /// Sets the dimension.
    pub fn d(mut self, v: usize) -> Self {
        self.cfg.d = Some(v);
        self
    }
    /// Sets the initial sampling box.
    pub fn bounds(mut self, x_min: f64, x_max: f64) -> Self {
        self.cfg.x_min = x_min;
        self.cfg.x_max = x_max;
        self
    }
    /// Sets explicit initial positions of rank 1, 2 or 3.
    pub fn x<D: Dimension>(mut self, x: Array<f64, D>) -> Self {
        self.cfg.x = Some(x.into_dyn());
        self
    }
    /// Sets the time step.
    pub fn dt(mut self, v: f64) -> Self {
        self.cfg.dt = v;
        self
    }
    /// Sets the drift strength.
    pub fn lamda(mut self, v: f64) -> Self {
        self.cfg.lamda = v;
        self
    }
    /// Sets the noise scale.
    pub fn sigma(mut self, v: f64) -> Self {
        self.cfg.sigma = v;
        self
    }
    /// Sets the consensus sharpness.
    pub fn alpha(mut self, v: f64) -> Self {
        self.cfg.alpha = v;
        self
    }
    /// Selects a named noise model.
    pub fn noise(mut self, v: NoiseKind) -> Self {
        self.cfg.noise = Some(v);
        self
    }
    /// Injects a custom noise model.
    pub fn noise_model(mut self, v: Box<dyn Noise>) -> Self {
        self.cfg.noise_model = Some(v);
        self
    }
    /// Selects a named correction.
    pub fn correction(mut self, v: CorrectionKind) -> Self {
        self.cfg.correction = Some(v);
        self
    }
    /// Injects a custom correction.
    pub fn correction_model(mut self, v: Box<dyn Correction>) -> Self {
        self.cfg.correction_model = Some(v);
        self
    }
    /// Sets the correction width.
    pub fn correction_eps(mut self, v: f64) -> Self {
        self.cfg.correction_eps = v;
        self
    }
    /// Sets the expected objective arity.
    pub fn f_dim(mut self, v: FDim) -> Self {
        self.cfg.f_dim = v;
        self
    }
    /// Sets the initialization scheme.
    pub fn init(mut self, v: Init) -> Self {
        self.cfg.init = v;
        self
    }
    /// Sets the random seed for reproducibility.
    pub fn seed(mut self, v: u64) -> Self {
        self.cfg.seed = Some(v);
        self
    }
    /// Enables mini-batching.
    pub fn batch(mut self, size: usize, partial: bool) -> Self {
        self.cfg.batch = Some(BatchConfig { size, partial });
        self
    }
    /// Sets the iteration budget.
    pub fn max_it(mut self, v: usize) -> Self {
        self.cfg.max_it = Some(v);
        self
    }
    /// Sets the evaluation budget per ensemble.
    pub fn max_eval(mut self, v: usize) -> Self {
        self.cfg.max_eval = Some(v);
        self
    }
    /// Sets the energy tolerance.
    pub fn energy_tol(mut self, v: f64) -> Self {
        self.cfg.energy_tol = Some(v);
        self
    }
    /// Sets the update-size tolerance.
    pub fn diff_tol(mut self, v: f64) -> Self {
        self.cfg.diff_tol = Some(v);
        self
    }
    /// Sets the wall-clock budget in seconds.
    pub fn max_time(mut self, v: f64) -> Self {
        self.cfg.max_time = Some(v);
        self
    }
    /// Sets the clipping threshold.
    pub fn max_thresh(mut self, v: f64) -> Self {
        self.cfg.post_process.max_thresh = v;
        self
    }
    /// Enables reshuffling every `interval` iterations.
    pub fn reshuffle(mut self, interval: usize) -> Self {
        self.cfg.post_process.reshuffle_interval = Some(interval);
        self
    }
    /// Injects a custom post-processing pipeline.
    pub fn post_process_pipeline(mut self, v: Box<dyn PostProcess>) -> Self {
        self.cfg.post_process_pipeline = Some(v);
        self
    }
    /// Sets the parallel evaluation configuration.
    pub fn parallel(mut self, v: ParallelConfig) -> Self {
        self.cfg.parallel = v;
        self
    }
    /// Enables/disables parallel evaluation.
    pub fn enable_parallel(mut self, enable: bool) -> Self {
        self.cfg.parallel.enabled = enable;
        self
    }
    /// Enables history tracking.
    pub fn track_history(mut self, v: bool) -> Self {
        self.cfg.track_history = v;
        self
    }
    /// Stores the consensus in the history.
    pub fn track_consensus(mut self, v: bool) -> Self {
        self.cfg.track_consensus = v;
        self
    }
    /// Sets the verbosity level.
    pub fn verbosity(mut self, v: usize) -> Self {
        self.cfg.verbosity = v;
        self
    }
    /// Sets the memory drift strength.
    pub fn lamda_memory(mut self, v: f64) -> Self {
        self.cfg.lamda_memory = v;
        self
    }
    /// Sets the memory noise scale.
    pub fn sigma_memory(mut self, v: f64) -> Self {
        self.cfg.sigma_memory = Some(v);
        self
    }
    /// Sets the PSO inertia.
    pub fn inertia(mut self, v: f64) -> Self {
        self.cfg.inertia = v;
        self
    }
    /// Sets the PSO friction.
    pub fn friction(mut self, v: f64) -> Self {
        self.cfg.friction = Some(v);
        self
    }
    /// Sets the CBS mode.
    pub fn cbs_mode(mut self, v: CbsMode) -> Self {
        self.cfg.cbs_mode = v;
        self
    }
    /// Sets the polar kernel.
    pub fn kernel(mut self, kind: KernelKind, kappa: f64) -> Self {
        self.cfg.kernel = kind;
        self.cfg.kappa = kappa;
        self
    }
    /// Sets the polar kernel scaling.
    pub fn kernel_factor_mode(mut self, v: KernelFactorMode) -> Self {
        self.cfg.kernel_factor_mode = v;
        self
    }
    /// Builds and returns the configuration.
    ///
    /// # Errors
    ///
    /// See [`DynamicConfig::validate`].
    pub fn build(self) -> Result<DynamicConfig> {
        self.cfg.validate()?;
        Ok(self.cfg)
    }
}
