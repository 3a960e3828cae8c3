//! Consensus-based optimization with exponential noise.

use crate::cbo::cbo_step;
use crate::config::DynamicConfig;
use crate::dynamic::{CbxDynamic, Dynamic};
use crate::error::Result;
use crate::noise::{IsotropicNoise, unit_exponential_sampler};
use crate::objective::Objective;

/// CBO driven by exponential noise.
///
/// The update is the canonical CBO one. The default noise is isotropic
/// with exponential draws of mean one, and the correction is always
/// `no_correction`. Positions are initialised uniformly.
#[derive(Debug)]
pub struct Qcbo {
    core: CbxDynamic,
}

impl Qcbo {
    /// Creates the dynamic; a configured noise model replaces the default.
    ///
    /// # Errors
    ///
    /// Any configuration error.
    pub fn new(objective: Objective, config: DynamicConfig) -> Result<Self> {
        let default_noise = IsotropicNoise::default().with_sampler(unit_exponential_sampler());
        Ok(Self {
            core: CbxDynamic::with_defaults(objective, config, Box::new(default_noise), true)?,
        })
    }
}

impl Dynamic for Qcbo {
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
        "q_cbo"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DynamicConfigBuilder;
    use crate::correction::CorrectionKind;
    use crate::noise::NoiseKind;

    #[test]
    fn test_correction_is_forced_off() {
        let config = DynamicConfigBuilder::new()
            .d(2)
            .correction(CorrectionKind::Heaviside)
            .build()
            .unwrap();
        let qcbo = Qcbo::new(Objective::point(|x| x.sum()), config).unwrap();
        assert_eq!(qcbo.core().correction_name(), "no_correction");
        assert_eq!(qcbo.core().noise_name(), "isotropic");
    }

    #[test]
    fn test_configured_noise_wins() {
        let config = DynamicConfigBuilder::new()
            .d(2)
            .noise(NoiseKind::Anisotropic)
            .build()
            .unwrap();
        let qcbo = Qcbo::new(Objective::point(|x| x.sum()), config).unwrap();
        assert_eq!(qcbo.core().noise_name(), "anisotropic");
    }

    #[test]
    fn test_steps_stay_finite() {
        let config = DynamicConfigBuilder::new()
            .m(2)
            .n(15)
            .d(2)
            .dt(0.05)
            .sigma(1.0)
            .seed(8)
            .build()
            .unwrap();
        let mut qcbo = Qcbo::new(Objective::point(|x| x.dot(&x)), config).unwrap();
        for _ in 0..20 {
            qcbo.step().unwrap();
        }
        assert!(qcbo.core().x().iter().all(|v| v.is_finite()));
    }
}
