//! Consensus-based sampling.

use crate::config::{CbsMode, DynamicConfig};
use crate::consensus::compute_consensus;
use crate::dynamic::{CbxDynamic, Dynamic};
use crate::error::{CbxError, Result};
use crate::noise::CovarianceNoise;
use crate::objective::Objective;

/// Consensus-based sampling.
///
/// Particles relax exponentially towards the consensus and are redrawn
/// around it with the weighted covariance of the ensemble:
///
/// `x <- c + exp(-dt) (x - c) + sqrt((1 / lamda)(1 - exp(-2 dt))) C^{1/2} z`
///
/// In [`CbsMode::Sampling`] `lamda = 1 / (1 + alpha)` so that the ensemble
/// approximates the Gibbs measure `exp(-alpha f)`; in
/// [`CbsMode::Optimization`] `lamda = 1` and the ensemble concentrates as
/// alpha grows. The noise is not scaled by `sigma`, and corrections do not
/// apply. Mini-batching is not supported.
#[derive(Debug)]
pub struct Cbs {
    core: CbxDynamic,
    mode: CbsMode,
}

impl Cbs {
    /// Creates the dynamic with covariance noise unless another one is set.
    ///
    /// # Errors
    ///
    /// Any configuration error, and `BatchingUnsupported` when a batch is set.
    pub fn new(objective: Objective, config: DynamicConfig) -> Result<Self> {
        if config.batch.is_some() {
            return Err(CbxError::BatchingUnsupported { dynamic: "cbs" });
        }
        let mode = config.cbs_mode;
        let mut core =
            CbxDynamic::with_defaults(objective, config, Box::new(CovarianceNoise::default()), true)?;
        if mode == CbsMode::Sampling {
            core.lamda = core.alpha.mapv(|a| 1.0 / (1.0 + a));
        } else {
            core.lamda.fill(1.0);
        }
        Ok(Self { core, mode })
    }

    /// Sampling or optimization.
    pub fn mode(&self) -> CbsMode {
        self.mode
    }
}

impl Dynamic for Cbs {
    fn core(&self) -> &CbxDynamic {
        &self.core
    }

    fn core_mut(&mut self) -> &mut CbxDynamic {
        &mut self.core
    }

    fn inner_step(&mut self) -> Result<()> {
        let core = &mut self.core;
        let (x_batch, energy) = core.evaluate_consensus_batch()?;
        let consensus = compute_consensus(x_batch.view(), energy.view(), core.alpha.view());
        core.update_covariance(x_batch.view(), &consensus);

        let drift = &core.x - &consensus.point;
        let noise = core.raw_noise(drift.view());
        let decay = (-core.dt).exp();
        core.x = drift * decay + &consensus.point + noise;

        core.consensus = Some(consensus.point);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "cbs"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DynamicConfigBuilder;
    use approx::assert_relative_eq;
    use ndarray::Array3;

    fn sphere() -> Objective {
        Objective::point(|x| x.dot(&x))
    }

    #[test]
    fn test_defaults() {
        let config = DynamicConfigBuilder::new()
            .d(2)
            .alpha(3.0)
            .seed(0)
            .build()
            .unwrap();
        let cbs = Cbs::new(sphere(), config).unwrap();
        assert_eq!(cbs.mode(), CbsMode::Sampling);
        assert_eq!(cbs.core().noise_name(), "covariance");
        assert_eq!(cbs.core().correction_name(), "no_correction");
        assert_relative_eq!(cbs.core().lamda()[0], 0.25);

        let config = DynamicConfigBuilder::new()
            .d(2)
            .alpha(3.0)
            .cbs_mode(CbsMode::Optimization)
            .build()
            .unwrap();
        let cbs = Cbs::new(sphere(), config).unwrap();
        assert_eq!(cbs.core().lamda()[0], 1.0);
    }

    #[test]
    fn test_batching_is_rejected() {
        let config = DynamicConfigBuilder::new()
            .d(2)
            .n(10)
            .batch(5, false)
            .build()
            .unwrap();
        let err = Cbs::new(sphere(), config).unwrap_err();
        assert!(matches!(err, CbxError::BatchingUnsupported { dynamic: "cbs" }));
        assert!(err.is_config_error());
    }

    #[test]
    fn test_collapsed_ensemble_stays_put() {
        let x = Array3::from_elem((1, 5, 2), 0.7);
        let config = DynamicConfigBuilder::new().x(x).seed(2).build().unwrap();
        let mut cbs = Cbs::new(sphere(), config).unwrap();
        cbs.step().unwrap();
        for v in cbs.core().x().iter() {
            assert_relative_eq!(*v, 0.7, epsilon = 1e-12);
        }
        assert!(cbs.core().cov_sqrt().is_some());
    }

    #[test]
    fn test_sampling_stays_finite() {
        let config = DynamicConfigBuilder::new()
            .m(2)
            .n(30)
            .d(3)
            .bounds(-2.0, 2.0)
            .dt(0.1)
            .seed(9)
            .build()
            .unwrap();
        let mut cbs = Cbs::new(sphere(), config).unwrap();
        for _ in 0..30 {
            cbs.step().unwrap();
        }
        assert!(cbs.core().x().iter().all(|v| v.is_finite()));
        assert!(cbs.core().best_energy().iter().all(|&e| e < 1.0));
    }
}
