//! Consensus-based optimization with personal-best memory.

use ndarray::{Array3, ArrayView3, s};

use crate::argmin::argmin;
use crate::batch::{gather, gather_energy};
use crate::config::DynamicConfig;
use crate::consensus::{Consensus, compute_consensus};
use crate::dynamic::{CbxDynamic, Dynamic};
use crate::error::Result;
use crate::objective::Objective;

/// Personal-best memory shared by the memory dynamics.
///
/// `core.energy` holds the objective at `y`.
#[derive(Debug, Clone)]
pub(crate) struct Memory {
    pub(crate) y: Array3<f64>,
    pub(crate) lamda_memory: f64,
    pub(crate) sigma_memory: f64,
}

impl Memory {
    /// Evaluates the initial positions and stores them as personal bests.
    pub(crate) fn init(core: &mut CbxDynamic, lamda_memory: f64, sigma_memory: f64) -> Result<Self> {
        let y = core.x.clone();
        core.energy = core.evaluate(y.view())?;
        Ok(Self {
            y,
            lamda_memory,
            sigma_memory,
        })
    }

    /// Consensus over the personal bests of the consensus batch.
    pub(crate) fn consensus(&self, core: &mut CbxDynamic) -> (Array3<f64>, Consensus) {
        let y_batch = gather(&self.y, core.consensus_idx());
        let energy = gather_energy(&core.energy, core.consensus_idx());
        for (i, row) in energy.outer_iter().enumerate() {
            core.f_min[i] = argmin(row).1;
        }
        let consensus = compute_consensus(y_batch.view(), energy.view(), core.alpha.view());
        (y_batch, consensus)
    }

    /// `x - y` for the active particles.
    pub(crate) fn drift(&self, x_active: &Array3<f64>, core: &CbxDynamic) -> Array3<f64> {
        x_active - &gather(&self.y, core.particle_idx())
    }

    /// `sigma_memory * noise(x - y)`.
    pub(crate) fn noise(&self, core: &mut CbxDynamic, memory_drift: ArrayView3<f64>) -> Array3<f64> {
        core.raw_noise(memory_drift) * self.sigma_memory
    }

    /// Evaluates the moved particles and keeps improvements.
    ///
    /// Positions are sanitised first so an overflowing update never reaches
    /// the objective as NaN.
    pub(crate) fn update(&mut self, core: &mut CbxDynamic) -> Result<()> {
        let mut x_active = core.active_positions();
        if x_active.iter().any(|v| !v.is_finite()) {
            core.sanitizer.sanitize(&mut x_active);
            core.set_active_positions(&x_active);
        }
        let energy = core.evaluate(x_active.view())?;
        let idx = core.indices.particles.clone();
        for (i, row) in energy.outer_iter().enumerate() {
            for (j, &e) in row.iter().enumerate() {
                let p = idx.as_ref().map_or(j, |idx| idx[i][j]);
                if e < core.energy[[i, p]] {
                    core.energy[[i, p]] = e;
                    self.y
                        .slice_mut(s![i, p, ..])
                        .assign(&x_active.slice(s![i, j, ..]));
                }
            }
        }
        Ok(())
    }
}

/// Consensus-based optimization with memory.
///
/// The consensus is taken over the personal bests `y`, and particles are
/// additionally pulled towards their own best:
///
/// `x <- x - C(lamda dt (x - c)) + lamda_memory dt (y - x) + sigma xi(x - c) + sigma_memory xi(y - x)`
///
/// `y` is replaced wherever the new position improves on it.
#[derive(Debug)]
pub struct CboMemory {
    core: CbxDynamic,
    memory: Memory,
}

impl CboMemory {
    /// Creates the dynamic and evaluates the initial positions.
    ///
    /// # Errors
    ///
    /// Any configuration error, or an objective error on the initial positions.
    pub fn new(objective: Objective, config: DynamicConfig) -> Result<Self> {
        let lamda_memory = config.lamda_memory;
        let sigma_memory = config.sigma_memory.unwrap_or(lamda_memory * config.sigma);
        let mut core = CbxDynamic::new(objective, config)?;
        let memory = Memory::init(&mut core, lamda_memory, sigma_memory)?;
        Ok(Self { core, memory })
    }

    /// Personal best positions, `(M, N, d)`.
    pub fn y(&self) -> ArrayView3<'_, f64> {
        self.memory.y.view()
    }
}

impl Dynamic for CboMemory {
    fn core(&self) -> &CbxDynamic {
        &self.core
    }

    fn core_mut(&mut self) -> &mut CbxDynamic {
        &mut self.core
    }

    fn inner_step(&mut self) -> Result<()> {
        let core = &mut self.core;
        let (y_batch, consensus) = self.memory.consensus(core);
        core.update_covariance(y_batch.view(), &consensus);

        let x_active = core.active_positions();
        let drift = &x_active - &consensus.point;
        let memory_drift = self.memory.drift(&x_active, core);

        let noise = core.sample_noise(drift.view());
        let memory_noise = self.memory.noise(core, memory_drift.view());
        let consensus_energy = core.consensus_energy(consensus.point.view())?;
        let increment = core.corrected_drift(&drift, consensus_energy.as_ref());

        let pull = self.memory.lamda_memory * core.dt;
        let updated = x_active - increment - memory_drift * pull + noise + memory_noise;
        core.set_active_positions(&updated);

        self.memory.update(core)?;
        core.consensus = Some(consensus.point);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "cbo_memory"
    }
}
