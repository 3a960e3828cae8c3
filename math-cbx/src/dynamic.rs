//! Shared iteration engine of every consensus-based dynamic.
//!
//! [`CbxDynamic`] owns the particle ensemble and all bookkeeping. Variants
//! wrap it and implement [`Dynamic::inner_step`]; the provided methods of the
//! trait run the common `pre_step -> inner_step -> post_step` cycle, the
//! scheduler and the termination checks.

use std::fmt;
use std::time::{Duration, Instant};

use log::{debug, info};
use ndarray::{Array1, Array2, Array3, ArrayView1, ArrayView2, ArrayView3, Axis, s};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::argmin::argmin;
use crate::batch::{BatchConfig, BatchIndices, gather, gather_energy, scatter, scatter_energy};
use crate::config::{DynamicConfig, Init};
use crate::consensus::Consensus;
use crate::correction::{Correction, CorrectionInput, NoCorrection};
use crate::covariance::covariance_sqrt;
use crate::error::{CbxError, Result};
use crate::history::{History, IterationRecord};
use crate::init_latin_hypercube::init_latin_hypercube;
use crate::init_uniform::{init_uniform, normalize_positions};
use crate::noise::{IsotropicNoise, Noise, NoiseInput};
use crate::objective::Objective;
use crate::parallel_eval::{ParallelConfig, configure_thread_pool};
use crate::post_process::{DefaultPostProcess, PostProcess};
use crate::scheduler::Scheduler;

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// The iteration budget was exhausted.
    MaxIterations,
    /// The wall-clock budget was exhausted.
    MaxTime,
    /// Every ensemble exhausted its evaluation budget.
    MaxEvaluations,
    /// Every ensemble reached the energy tolerance.
    EnergyTolerance,
    /// Every ensemble reached the update-size tolerance.
    DiffTolerance,
    /// Every ensemble met one of the tolerance or budget criteria.
    MixedCriteria,
    /// The callback asked to stop.
    Callback,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            TerminationReason::MaxIterations => "maximum number of iterations reached",
            TerminationReason::MaxTime => "maximum time reached",
            TerminationReason::MaxEvaluations => "maximum number of evaluations reached",
            TerminationReason::EnergyTolerance => "energy tolerance reached",
            TerminationReason::DiffTolerance => "update tolerance reached",
            TerminationReason::MixedCriteria => "all ensembles met a stopping criterion",
            TerminationReason::Callback => "stopped by callback",
        };
        f.write_str(msg)
    }
}

/// Stopping criteria; all are optional.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TerminationCriteria {
    /// Iteration budget
    pub max_it: Option<usize>,
    /// Evaluation budget per ensemble
    pub max_eval: Option<usize>,
    /// Energy tolerance on the batch minimum
    pub energy_tol: Option<f64>,
    /// Tolerance on the normalised update size
    pub diff_tol: Option<f64>,
    /// Wall-clock budget in seconds
    pub max_time: Option<f64>,
}

/// Information passed to the callback after each iteration.
pub struct Intermediate<'a> {
    /// Number of completed iterations.
    pub iter: usize,
    /// Best energy found so far, per ensemble.
    pub best_energy: ArrayView1<'a, f64>,
    /// Best position found so far, per ensemble.
    pub best_particle: ArrayView2<'a, f64>,
    /// Batch minimum of the last step, per ensemble.
    pub f_min: ArrayView1<'a, f64>,
    /// Current consensus sharpness, per ensemble.
    pub alpha: ArrayView1<'a, f64>,
}

/// Action returned by callback to control optimization flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    /// Continue optimization.
    Continue,
    /// Stop optimization early.
    Stop,
}

/// Result of a run, as plain arrays.
#[derive(Clone)]
pub struct OptimizationReport {
    /// Best position per ensemble, `(M, d)`.
    pub best_x: Array2<f64>,
    /// Objective value at `best_x`, `(M,)`.
    pub best_f: Array1<f64>,
    /// Number of iterations performed.
    pub nit: usize,
    /// Objective evaluations per ensemble.
    pub num_f_eval: Array1<usize>,
    /// Wall-clock time spent in `optimize`.
    pub elapsed: Duration,
    /// Why the run stopped, if it ran.
    pub termination: Option<TerminationReason>,
}

impl fmt::Debug for OptimizationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptimizationReport")
            .field(
                "best_x",
                &format!("{}x{}", self.best_x.nrows(), self.best_x.ncols()),
            )
            .field("best_f", &self.best_f)
            .field("nit", &self.nit)
            .field("num_f_eval", &self.num_f_eval)
            .field("elapsed", &self.elapsed)
            .field("termination", &self.termination)
            .finish()
    }
}

/// Multiplies every ensemble slab of `a` by the matching entry of `scale`.
pub(crate) fn scale_ensembles(a: &mut Array3<f64>, scale: ArrayView1<f64>) {
    for (mut slab, &c) in a.outer_iter_mut().zip(scale.iter()) {
        slab.mapv_inplace(|v| v * c);
    }
}

/// State and machinery shared by all dynamics.
pub struct CbxDynamic {
    pub(crate) objective: Objective,
    pub(crate) noise: Box<dyn Noise>,
    pub(crate) correction: Box<dyn Correction>,
    pub(crate) post_process: Box<dyn PostProcess>,
    pub(crate) sanitizer: DefaultPostProcess,
    pub(crate) parallel: ParallelConfig,
    pub(crate) batch: Option<BatchConfig>,
    pub(crate) criteria: TerminationCriteria,
    pub(crate) verbosity: usize,
    pub(crate) track_consensus: bool,

    pub(crate) m: usize,
    pub(crate) n: usize,
    pub(crate) d: usize,
    pub(crate) dt: f64,

    pub(crate) x: Array3<f64>,
    pub(crate) x_old: Array3<f64>,
    pub(crate) energy: Array2<f64>,
    pub(crate) f_min: Array1<f64>,
    pub(crate) best_energy: Array1<f64>,
    pub(crate) best_particle: Array2<f64>,
    pub(crate) alpha: Array1<f64>,
    pub(crate) lamda: Array1<f64>,
    pub(crate) sigma: Array1<f64>,
    pub(crate) consensus: Option<Array3<f64>>,
    pub(crate) cov_sqrt: Option<Array3<f64>>,

    pub(crate) it: usize,
    pub(crate) num_f_eval: Array1<usize>,
    pub(crate) update_diff: Array1<f64>,
    pub(crate) rng: StdRng,
    pub(crate) indices: BatchIndices,
    pub(crate) history: Option<History>,
    pub(crate) started: Option<Instant>,
    pub(crate) elapsed: Duration,
    pub(crate) termination: Option<TerminationReason>,
}

impl fmt::Debug for CbxDynamic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CbxDynamic")
            .field("shape", &(self.m, self.n, self.d))
            .field("objective", &self.objective)
            .field("noise", &self.noise.name())
            .field("correction", &self.correction.name())
            .field("it", &self.it)
            .field("best_energy", &self.best_energy)
            .field("alpha", &self.alpha)
            .finish_non_exhaustive()
    }
}

impl CbxDynamic {
    /// Builds the engine with isotropic noise as default.
    ///
    /// # Errors
    ///
    /// Any configuration error, see [`DynamicConfig::validate`], and
    /// `ObjectiveDimMismatch` when the objective arity differs from `f_dim`.
    pub fn new(objective: Objective, config: DynamicConfig) -> Result<Self> {
        Self::with_defaults(objective, config, Box::new(IsotropicNoise::default()), false)
    }

    /// Builds the engine with a variant-specific default noise.
    ///
    /// With `force_no_correction` any configured correction is replaced by
    /// the identity.
    pub(crate) fn with_defaults(
        objective: Objective,
        mut config: DynamicConfig,
        default_noise: Box<dyn Noise>,
        force_no_correction: bool,
    ) -> Result<Self> {
        config.validate()?;
        if objective.f_dim() != config.f_dim {
            return Err(CbxError::ObjectiveDimMismatch {
                objective: objective.f_dim().to_string(),
                configured: config.f_dim.to_string(),
            });
        }

        let mut rng: StdRng = match config.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => {
                let mut thread_rng = rand::rng();
                StdRng::from_rng(&mut thread_rng)
            }
        };

        let x = match config.x.take() {
            Some(x) => normalize_positions(x)?,
            None => {
                let d = config.d.ok_or(CbxError::MissingDimension)?;
                let shape = (config.m, config.n, d);
                match config.init {
                    Init::Uniform => init_uniform(shape, config.x_min, config.x_max, &mut rng),
                    Init::LatinHypercube => {
                        init_latin_hypercube(shape, config.x_min, config.x_max, &mut rng)
                    }
                }
            }
        };
        let (m, n, d) = x.dim();
        if m == 0 || n == 0 || d == 0 {
            return Err(CbxError::EmptyEnsemble { m, n, d });
        }

        let noise = match (config.noise_model.take(), config.noise) {
            (Some(model), _) => model,
            (None, Some(kind)) => kind.build(),
            (None, None) => default_noise,
        };
        let correction: Box<dyn Correction> = if force_no_correction {
            if config.correction.is_some() || config.correction_model.is_some() {
                debug!("correction ignored: this dynamic always uses no_correction");
            }
            Box::new(NoCorrection)
        } else {
            match (config.correction_model.take(), config.correction) {
                (Some(model), _) => model,
                (None, Some(kind)) => kind.build(config.correction_eps),
                (None, None) => Box::new(NoCorrection),
            }
        };
        let sanitizer = DefaultPostProcess {
            max_thresh: config.post_process.max_thresh,
        };
        let post_process = match config.post_process_pipeline.take() {
            Some(p) => p,
            None => Box::new(config.post_process.build()),
        };

        configure_thread_pool(&config.parallel);

        let best_particle = x.index_axis(Axis(1), 0).to_owned();
        Ok(Self {
            objective,
            noise,
            correction,
            post_process,
            sanitizer,
            parallel: config.parallel,
            batch: config.batch,
            criteria: TerminationCriteria {
                max_it: config.max_it,
                max_eval: config.max_eval,
                energy_tol: config.energy_tol,
                diff_tol: config.diff_tol,
                max_time: config.max_time,
            },
            verbosity: config.verbosity,
            track_consensus: config.track_consensus,
            m,
            n,
            d,
            dt: config.dt,
            x_old: x.clone(),
            x,
            energy: Array2::from_elem((m, n), f64::INFINITY),
            f_min: Array1::from_elem(m, f64::INFINITY),
            best_energy: Array1::from_elem(m, f64::INFINITY),
            best_particle,
            alpha: Array1::from_elem(m, config.alpha),
            lamda: Array1::from_elem(m, config.lamda),
            sigma: Array1::from_elem(m, config.sigma),
            consensus: None,
            cov_sqrt: None,
            it: 0,
            num_f_eval: Array1::zeros(m),
            update_diff: Array1::from_elem(m, f64::INFINITY),
            rng,
            indices: BatchIndices::default(),
            history: config.track_history.then(History::new),
            started: None,
            elapsed: Duration::ZERO,
            termination: None,
        })
    }

    /// Shape `(M, N, d)` of the ensemble.
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.m, self.n, self.d)
    }

    /// Current positions.
    pub fn x(&self) -> ArrayView3<'_, f64> {
        self.x.view()
    }

    /// Latest energies, `(M, N)`.
    pub fn energy(&self) -> ArrayView2<'_, f64> {
        self.energy.view()
    }

    /// Batch minimum of the last step, `(M,)`.
    pub fn f_min(&self) -> ArrayView1<'_, f64> {
        self.f_min.view()
    }

    /// Best energy found so far, `(M,)`.
    pub fn best_energy(&self) -> ArrayView1<'_, f64> {
        self.best_energy.view()
    }

    /// Position of the best energy, `(M, d)`.
    pub fn best_particle(&self) -> ArrayView2<'_, f64> {
        self.best_particle.view()
    }

    /// Last consensus point, if a step ran.
    pub fn consensus(&self) -> Option<ArrayView3<'_, f64>> {
        self.consensus.as_ref().map(|c| c.view())
    }

    /// Last covariance square root, if the noise model uses one.
    pub fn cov_sqrt(&self) -> Option<ArrayView3<'_, f64>> {
        self.cov_sqrt.as_ref().map(|c| c.view())
    }

    /// Consensus sharpness per ensemble.
    pub fn alpha(&self) -> ArrayView1<'_, f64> {
        self.alpha.view()
    }

    /// Mutable consensus sharpness, for schedulers.
    pub fn alpha_mut(&mut self) -> &mut Array1<f64> {
        &mut self.alpha
    }

    /// Drift strength per ensemble.
    pub fn lamda(&self) -> ArrayView1<'_, f64> {
        self.lamda.view()
    }

    /// Mutable drift strength, for schedulers.
    pub fn lamda_mut(&mut self) -> &mut Array1<f64> {
        &mut self.lamda
    }

    /// Noise scale per ensemble.
    pub fn sigma(&self) -> ArrayView1<'_, f64> {
        self.sigma.view()
    }

    /// Mutable noise scale, for schedulers.
    pub fn sigma_mut(&mut self) -> &mut Array1<f64> {
        &mut self.sigma
    }

    /// Number of completed iterations.
    pub fn it(&self) -> usize {
        self.it
    }

    /// Objective evaluations per ensemble.
    pub fn num_f_eval(&self) -> ArrayView1<'_, usize> {
        self.num_f_eval.view()
    }

    /// Normalised update size of the last step, `(M,)`.
    pub fn update_diff(&self) -> ArrayView1<'_, f64> {
        self.update_diff.view()
    }

    /// Recorded history, when enabled.
    pub fn history(&self) -> Option<&History> {
        self.history.as_ref()
    }

    /// Name of the active noise model.
    pub fn noise_name(&self) -> &'static str {
        self.noise.name()
    }

    /// Name of the active correction.
    pub fn correction_name(&self) -> &'static str {
        self.correction.name()
    }

    /// Time step.
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Evaluates the objective and updates counters and the best record.
    pub(crate) fn evaluate(&mut self, x: ArrayView3<f64>) -> Result<Array2<f64>> {
        let energy = self.objective.evaluate(x, &self.parallel)?;
        let evaluated = x.dim().1;
        self.num_f_eval.mapv_inplace(|c| c + evaluated);
        self.record_candidates(x, energy.view());
        Ok(energy)
    }

    /// Keeps the per-ensemble running minimum over evaluated pairs.
    pub(crate) fn record_candidates(&mut self, x: ArrayView3<f64>, energy: ArrayView2<f64>) {
        for i in 0..self.m {
            if energy.ncols() == 0 {
                continue;
            }
            let (j, e) = argmin(energy.row(i));
            if e < self.best_energy[i] {
                self.best_energy[i] = e;
                self.best_particle
                    .row_mut(i)
                    .assign(&x.slice(s![i, j, ..]));
            }
        }
    }

    pub(crate) fn consensus_idx(&self) -> Option<&[Vec<usize>]> {
        self.indices.consensus.as_deref()
    }

    pub(crate) fn particle_idx(&self) -> Option<&[Vec<usize>]> {
        self.indices.particles.as_deref()
    }

    /// Positions entering the consensus.
    pub(crate) fn consensus_batch(&self) -> Array3<f64> {
        gather(&self.x, self.consensus_idx())
    }

    /// Evaluates the consensus batch, stores its energies and `f_min`.
    pub(crate) fn evaluate_consensus_batch(&mut self) -> Result<(Array3<f64>, Array2<f64>)> {
        let x_batch = self.consensus_batch();
        let energy = self.evaluate(x_batch.view())?;
        let idx = self.indices.consensus.clone();
        scatter_energy(&mut self.energy, idx.as_deref(), &energy);
        for (i, row) in energy.outer_iter().enumerate() {
            self.f_min[i] = argmin(row).1;
        }
        Ok((x_batch, energy))
    }

    /// Positions being updated this step.
    pub(crate) fn active_positions(&self) -> Array3<f64> {
        gather(&self.x, self.particle_idx())
    }

    /// Energies of the particles being updated this step.
    pub(crate) fn active_energy(&self) -> Array2<f64> {
        gather_energy(&self.energy, self.particle_idx())
    }

    /// Writes updated positions back.
    pub(crate) fn set_active_positions(&mut self, values: &Array3<f64>) {
        let idx = self.indices.particles.clone();
        scatter(&mut self.x, idx.as_deref(), values);
    }

    /// Refreshes `cov_sqrt` when the noise model needs it.
    pub(crate) fn update_covariance(&mut self, x_batch: ArrayView3<f64>, consensus: &Consensus) {
        if self.noise.requires_covariance() {
            self.cov_sqrt = Some(covariance_sqrt(
                x_batch,
                consensus.point.view(),
                consensus.weights.view(),
            ));
        }
    }

    /// Unscaled `noise(drift)`.
    pub(crate) fn raw_noise(&mut self, drift: ArrayView3<f64>) -> Array3<f64> {
        let input = NoiseInput {
            drift: drift.reborrow(),
            cov_sqrt: self.cov_sqrt.as_ref().map(|c| c.view()),
            dt: self.dt,
            lamda: self.lamda.view(),
        };
        self.noise.sample(&input, &mut self.rng)
    }

    /// `sigma * noise(drift)` for every active particle.
    pub(crate) fn sample_noise(&mut self, drift: ArrayView3<f64>) -> Array3<f64> {
        let mut noise = self.raw_noise(drift);
        scale_ensembles(&mut noise, self.sigma.view());
        noise
    }

    /// Objective at the consensus points when the correction needs it.
    pub(crate) fn consensus_energy(&mut self, point: ArrayView3<f64>) -> Result<Option<Array2<f64>>> {
        if self.correction.requires_consensus_energy() {
            Ok(Some(self.evaluate(point)?))
        } else {
            Ok(None)
        }
    }

    /// `Correction(lamda * dt * drift)` for every active particle.
    pub(crate) fn corrected_drift(
        &self,
        drift: &Array3<f64>,
        consensus_energy: Option<&Array2<f64>>,
    ) -> Array3<f64> {
        let mut increment = drift.clone();
        let factor = self.lamda.mapv(|l| l * self.dt);
        scale_ensembles(&mut increment, factor.view());
        let energy = self.active_energy();
        let input = CorrectionInput {
            energy: energy.view(),
            consensus_energy: consensus_energy.map(|e| e.view()),
        };
        self.correction.apply(increment, &input)
    }

    /// Canonical update `x <- x - Correction(lamda dt (x - c)) + sigma noise`
    /// of the active particles towards `point`, `(M, 1, d)` or `(M, P, d)`.
    pub(crate) fn apply_consensus_update(&mut self, point: &Array3<f64>) -> Result<()> {
        let x_active = self.active_positions();
        let drift = &x_active - point;
        let noise = self.sample_noise(drift.view());
        let consensus_energy = self.consensus_energy(point.view())?;
        let increment = self.corrected_drift(&drift, consensus_energy.as_ref());
        let updated = x_active - increment + noise;
        self.set_active_positions(&updated);
        Ok(())
    }

    /// Saves the previous positions and draws batch indices.
    pub(crate) fn pre_step(&mut self) {
        if self.started.is_none() {
            self.started = Some(Instant::now());
        }
        self.x_old.assign(&self.x);
        self.indices = BatchIndices::draw(self.batch.as_ref(), self.m, self.n, &mut self.rng);
    }

    /// Update size, history, post-processing and the iteration counter.
    pub(crate) fn post_step(&mut self) {
        for i in 0..self.m {
            let diff = &self.x.index_axis(Axis(0), i) - &self.x_old.index_axis(Axis(0), i);
            self.update_diff[i] = diff.iter().map(|v| v * v).sum::<f64>().sqrt() / self.n as f64;
        }

        if let Some(history) = self.history.as_mut() {
            history.push(IterationRecord {
                iteration: self.it,
                best_energy: self.best_energy.clone(),
                f_min: self.f_min.clone(),
                alpha: self.alpha.clone(),
                update_diff: self.update_diff.clone(),
                consensus: if self.track_consensus {
                    self.consensus.clone()
                } else {
                    None
                },
            });
        }

        self.post_process.apply(&mut self.x, self.it, &mut self.rng);
        if self.verbosity > 1 {
            debug!(
                "it {}: f_min = {:?}, best = {:?}, update_diff = {:?}",
                self.it,
                self.f_min.to_vec(),
                self.best_energy.to_vec(),
                self.update_diff.to_vec()
            );
        }
        self.it += 1;
        if let Some(start) = self.started {
            self.elapsed = start.elapsed();
        }
    }

    /// Evaluates every stopping criterion, storing the reason.
    pub(crate) fn check_termination(&mut self) -> bool {
        let c = self.criteria;
        if let Some(max_it) = c.max_it
            && self.it >= max_it
        {
            self.termination = Some(TerminationReason::MaxIterations);
            return true;
        }
        if let (Some(max_time), Some(start)) = (c.max_time, self.started)
            && start.elapsed().as_secs_f64() >= max_time
        {
            self.termination = Some(TerminationReason::MaxTime);
            return true;
        }

        let mut reasons = Vec::with_capacity(self.m);
        for i in 0..self.m {
            let reason = if c.energy_tol.is_some_and(|tol| self.f_min[i] < tol) {
                TerminationReason::EnergyTolerance
            } else if c.diff_tol.is_some_and(|tol| self.update_diff[i] < tol) {
                TerminationReason::DiffTolerance
            } else if c.max_eval.is_some_and(|max| self.num_f_eval[i] >= max) {
                TerminationReason::MaxEvaluations
            } else {
                return false;
            };
            reasons.push(reason);
        }
        let first = reasons[0];
        self.termination = Some(if reasons.iter().all(|&r| r == first) {
            first
        } else {
            TerminationReason::MixedCriteria
        });
        true
    }

    /// Snapshot of the run.
    pub fn report(&self) -> OptimizationReport {
        OptimizationReport {
            best_x: self.best_particle.clone(),
            best_f: self.best_energy.clone(),
            nit: self.it,
            num_f_eval: self.num_f_eval.clone(),
            elapsed: self.elapsed,
            termination: self.termination,
        }
    }
}

/// A consensus-based particle dynamic.
///
/// Implementors provide access to the shared engine and one variant-specific
/// update; everything else is provided.
pub trait Dynamic {
    /// Shared engine.
    fn core(&self) -> &CbxDynamic;

    /// Mutable shared engine.
    fn core_mut(&mut self) -> &mut CbxDynamic;

    /// One variant-specific update of the active particles.
    fn inner_step(&mut self) -> Result<()>;

    /// Short name of the dynamic.
    fn name(&self) -> &'static str;

    /// One full iteration: `pre_step`, `inner_step`, `post_step`.
    fn step(&mut self) -> Result<()> {
        self.core_mut().pre_step();
        self.inner_step()?;
        self.core_mut().post_step();
        Ok(())
    }

    /// Whether a stopping criterion is met.
    fn terminated(&mut self) -> bool {
        self.core_mut().check_termination()
    }

    /// Runs until termination and returns the best position per ensemble.
    ///
    /// The scheduler runs after every step. With `print_int = Some(k)`,
    /// progress is logged every `k` iterations.
    fn optimize(&mut self, sched: &mut dyn Scheduler, print_int: Option<usize>) -> Result<Array2<f64>> {
        self.optimize_with_callback(sched, print_int, &mut |_| CallbackAction::Continue)
    }

    /// As [`optimize`](Self::optimize), with a per-iteration callback that
    /// may stop the run.
    fn optimize_with_callback(
        &mut self,
        sched: &mut dyn Scheduler,
        print_int: Option<usize>,
        callback: &mut dyn FnMut(&Intermediate<'_>) -> CallbackAction,
    ) -> Result<Array2<f64>> {
        let name = self.name();
        {
            let core = self.core_mut();
            core.termination = None;
            if core.started.is_none() {
                core.started = Some(Instant::now());
            }
            if core.verbosity > 0 {
                info!(
                    "{} start: M = {}, N = {}, d = {}, noise = {}, correction = {}",
                    name,
                    core.m,
                    core.n,
                    core.d,
                    core.noise.name(),
                    core.correction.name()
                );
            }
        }

        while !self.terminated() {
            self.step()?;
            sched.update(self.core_mut());

            let core = self.core();
            if let Some(k) = print_int
                && k > 0
                && core.it % k == 0
            {
                info!(
                    "{} it {}: best = {:?}, f_min = {:?}, alpha = {:?}",
                    name,
                    core.it,
                    core.best_energy.to_vec(),
                    core.f_min.to_vec(),
                    core.alpha.to_vec()
                );
            }

            let intermediate = Intermediate {
                iter: core.it,
                best_energy: core.best_energy.view(),
                best_particle: core.best_particle.view(),
                f_min: core.f_min.view(),
                alpha: core.alpha.view(),
            };
            if callback(&intermediate) == CallbackAction::Stop {
                self.core_mut().termination = Some(TerminationReason::Callback);
                break;
            }
        }

        let core = self.core_mut();
        if let Some(start) = core.started {
            core.elapsed = start.elapsed();
        }
        if core.verbosity > 0 {
            info!(
                "{} finished after {} iterations: {}, best = {:?}",
                name,
                core.it,
                core.termination
                    .map_or_else(|| "not run".to_string(), |r| r.to_string()),
                core.best_energy.to_vec()
            );
        }
        Ok(core.best_particle.clone())
    }

    /// Snapshot of the run.
    fn report(&self) -> OptimizationReport {
        self.core().report()
    }
}
