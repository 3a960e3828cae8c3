//! Consensus-based optimization.

use crate::config::DynamicConfig;
use crate::consensus::compute_consensus;
use crate::dynamic::{CbxDynamic, Dynamic};
use crate::error::Result;
use crate::objective::Objective;

/// One canonical CBO update of `core`:
/// evaluate the batch, compute the consensus, move the active particles.
pub(crate) fn cbo_step(core: &mut CbxDynamic) -> Result<()> {
    let (x_batch, energy) = core.evaluate_consensus_batch()?;
    let consensus = compute_consensus(x_batch.view(), energy.view(), core.alpha.view());
    core.update_covariance(x_batch.view(), &consensus);
    core.apply_consensus_update(&consensus.point)?;
    core.consensus = Some(consensus.point);
    Ok(())
}

/// Canonical consensus-based optimization.
///
/// Every particle drifts towards the Gibbs-weighted mean of its ensemble
/// and explores with noise proportional to its distance from it:
///
/// `x <- x - Correction(lamda dt (x - c)) + sigma noise(x - c)`
///
/// Defaults: isotropic noise, no correction.
///
/// # Example
///
/// ```rust
/// use math_cbx::{Cbo, Dynamic, DynamicConfigBuilder, Multiply, Objective};
///
/// let f = Objective::point(|x| x.iter().map(|v| v * v).sum());
/// let config = DynamicConfigBuilder::new()
///     .d(2)
///     .n(30)
///     .bounds(-3.0, 3.0)
///     .dt(0.1)
///     .sigma(0.5)
///     .max_it(200)
///     .seed(7)
///     .build()
///     .expect("valid config");
/// let mut cbo = Cbo::new(f, config).expect("valid dynamic");
/// let best = cbo.optimize(&mut Multiply::default(), None).expect("run");
/// assert_eq!(best.dim(), (1, 2));
/// assert!(cbo.report().best_f[0] < 1e-2);
/// ```
#[derive(Debug)]
pub struct Cbo {
    core: CbxDynamic,
}

impl Cbo {
    /// Creates the dynamic.
    ///
    /// # Errors
    ///
    /// Any configuration error.
    pub fn new(objective: Objective, config: DynamicConfig) -> Result<Self> {
        Ok(Self {
            core: CbxDynamic::new(objective, config)?,
        })
    }
}

impl Dynamic for Cbo {
    fn core(&self) -> &CbxDynamic {
        &self.core
    }

    fn core_mut(&mut self) -> &mut CbxDynamic {
        &mut self.core
    }

    fn inner_step(&mut self) -> Result<()> {
        cbo_step(&mut self.core)
    }

    fn name(&self) -> &'static str {
        "cbo"
    }
}
