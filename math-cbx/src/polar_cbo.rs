//! Polarized consensus-based optimization.

use crate::config::DynamicConfig;
use crate::consensus::{compute_consensus, compute_polar_consensus};
use crate::dynamic::{CbxDynamic, Dynamic};
use crate::error::Result;
use crate::kernel::{Kernel, KernelFactorMode};
use crate::objective::Objective;

/// Consensus-based optimization with one consensus point per particle.
///
/// Each particle `x_p` is attracted by a kernel-localised consensus
///
/// `c_p = sum_j w_pj x_j / sum_j w_pj`, `w_pj = exp(-kf k(x_p, x_j) - alpha (f_j - min f))`
///
/// so that well-separated groups of particles can settle in different
/// minima. `kf` is set by the [`KernelFactorMode`].
#[derive(Debug)]
pub struct PolarCbo {
    core: CbxDynamic,
    kernel: Kernel,
    kernel_factor_mode: KernelFactorMode,
}

impl PolarCbo {
    /// Creates the dynamic.
    ///
    /// # Errors
    ///
    /// Any configuration error.
    pub fn new(objective: Objective, config: DynamicConfig) -> Result<Self> {
        let kernel = Kernel {
            kind: config.kernel,
            kappa: config.kappa,
        };
        let kernel_factor_mode = config.kernel_factor_mode;
        Ok(Self {
            core: CbxDynamic::new(objective, config)?,
            kernel,
            kernel_factor_mode,
        })
    }

    /// Kernel used to localise the consensus.
    pub fn kernel(&self) -> Kernel {
        self.kernel
    }
}

impl Dynamic for PolarCbo {
    fn core(&self) -> &CbxDynamic {
        &self.core
    }

    fn core_mut(&mut self) -> &mut CbxDynamic {
        &mut self.core
    }

    fn inner_step(&mut self) -> Result<()> {
        let core = &mut self.core;
        let (x_batch, energy) = core.evaluate_consensus_batch()?;
        if core.noise.requires_covariance() {
            let global = compute_consensus(x_batch.view(), energy.view(), core.alpha.view());
            core.update_covariance(x_batch.view(), &global);
        }

        let targets = core.active_positions();
        let point = compute_polar_consensus(
            targets.view(),
            x_batch.view(),
            energy.view(),
            core.alpha.view(),
            &self.kernel,
            self.kernel_factor_mode,
        );
        core.apply_consensus_update(&point)?;
        core.consensus = Some(point);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "polar_cbo"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DynamicConfigBuilder;
    use crate::kernel::KernelKind;
    use ndarray::Array3;

    #[test]
    fn test_consensus_has_one_point_per_particle() {
        let config = DynamicConfigBuilder::new()
            .m(2)
            .n(12)
            .d(3)
            .seed(5)
            .build()
            .unwrap();
        let mut polar = PolarCbo::new(Objective::point(|x| x.dot(&x)), config).unwrap();
        polar.step().unwrap();
        assert_eq!(polar.core().consensus().unwrap().dim(), (2, 12, 3));
        assert_eq!(polar.core().x().dim(), (2, 12, 3));
    }

    #[test]
    fn test_separated_clusters_keep_their_minima() {
        // two symmetric wells at -2 and 2, a cluster near each
        let x = Array3::from_shape_fn((1, 8, 1), |(_, j, _)| {
            let offset = (j % 4) as f64 * 0.05;
            if j < 4 { -2.1 + offset } else { 1.95 + offset }
        });
        let config = DynamicConfigBuilder::new()
            .x(x)
            .sigma(0.0)
            .alpha(1.0)
            .dt(0.5)
            .kernel(KernelKind::Gaussian, 0.2)
            .build()
            .unwrap();
        let f = Objective::point(|x| {
            let v = x[0];
            (v * v - 4.0) * (v * v - 4.0)
        });
        let mut polar = PolarCbo::new(f, config).unwrap();
        for _ in 0..40 {
            polar.step().unwrap();
        }
        let x = polar.core().x();
        for j in 0..4 {
            assert!((x[[0, j, 0]] + 2.0).abs() < 0.2, "left: {}", x[[0, j, 0]]);
            assert!((x[[0, j + 4, 0]] - 2.0).abs() < 0.2, "right: {}", x[[0, j + 4, 0]]);
        }
    }
}
