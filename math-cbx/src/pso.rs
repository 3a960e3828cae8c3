//! Particle swarm optimization expressed as a consensus dynamic.

use ndarray::{Array3, ArrayView3};

use crate::batch::{gather, scatter};
use crate::cbo_memory::Memory;
use crate::config::DynamicConfig;
use crate::dynamic::{CbxDynamic, Dynamic};
use crate::error::Result;
use crate::objective::Objective;

/// Particle swarm optimization with a velocity and personal-best memory.
///
/// `v <- (m v - C(lamda dt (x - c)) + lamda_memory dt (y - x) + sigma xi + sigma_memory xi_memory) / (m + gamma)`
///
/// `x <- x + v`
///
/// Velocities start at zero. With the defaults `m = 0.001` and
/// `gamma = 1 - m` the denominator is one.
#[derive(Debug)]
pub struct Pso {
    core: CbxDynamic,
    memory: Memory,
    v: Array3<f64>,
    inertia: f64,
    friction: f64,
}

impl Pso {
    /// Creates the dynamic and evaluates the initial positions.
    ///
    /// # Errors
    ///
    /// Any configuration error, or an objective error on the initial positions.
    pub fn new(objective: Objective, config: DynamicConfig) -> Result<Self> {
        let lamda_memory = config.lamda_memory;
        let sigma_memory = config.sigma_memory.unwrap_or(lamda_memory * config.sigma);
        let inertia = config.inertia;
        let friction = config.friction.unwrap_or(1.0 - inertia);
        let mut core = CbxDynamic::new(objective, config)?;
        let memory = Memory::init(&mut core, lamda_memory, sigma_memory)?;
        let v = Array3::zeros(core.x.dim());
        Ok(Self {
            core,
            memory,
            v,
            inertia,
            friction,
        })
    }

    /// Current velocities, `(M, N, d)`.
    pub fn v(&self) -> ArrayView3<'_, f64> {
        self.v.view()
    }

    /// Personal best positions, `(M, N, d)`.
    pub fn y(&self) -> ArrayView3<'_, f64> {
        self.memory.y.view()
    }
}

impl Dynamic for Pso {
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
        let v_active = gather(&self.v, core.particle_idx());
        let drift = &x_active - &consensus.point;
        let memory_drift = self.memory.drift(&x_active, core);

        let noise = core.sample_noise(drift.view());
        let memory_noise = self.memory.noise(core, memory_drift.view());
        let consensus_energy = core.consensus_energy(consensus.point.view())?;
        let increment = core.corrected_drift(&drift, consensus_energy.as_ref());

        let pull = self.memory.lamda_memory * core.dt;
        let mut v_new = (v_active * self.inertia - increment - memory_drift * pull + noise + memory_noise)
            / (self.inertia + self.friction);
        if v_new.iter().any(|v| !v.is_finite()) {
            core.sanitizer.sanitize(&mut v_new);
        }
        let updated = x_active + &v_new;

        let idx = core.indices.particles.clone();
        scatter(&mut self.v, idx.as_deref(), &v_new);
        core.set_active_positions(&updated);

        self.memory.update(core)?;
        core.consensus = Some(consensus.point);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "pso"
    }
}
