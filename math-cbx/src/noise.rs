//! Stochastic exploration terms.
//!
//! Every model draws a standard sample `z` of the drift's shape from an
//! injectable [`SamplerFn`] and scales it. The dynamic multiplies the result
//! by `sigma`.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use log::warn;
use ndarray::{Array3, ArrayView1, ArrayView3, Axis, s};
use rand::Rng;
use rand::rngs::StdRng;
use rand_distr::{Exp, Exp1, StandardNormal};

use crate::error::{CbxError, Result};

/// Sampler of an `(M, P, d)` array of independent draws.
pub type SamplerFn = Arc<dyn Fn(&mut StdRng, (usize, usize, usize)) -> Array3<f64> + Send + Sync>;
/// Vector norm used by isotropic noise.
pub type NormFn = Arc<dyn Fn(ArrayView1<f64>) -> f64 + Send + Sync>;

/// Standard normal draws.
pub fn standard_normal_sampler() -> SamplerFn {
    Arc::new(|rng: &mut StdRng, shape: (usize, usize, usize)| {
        Array3::from_shape_simple_fn(shape, || rng.sample::<f64, _>(StandardNormal))
    })
}

/// Exponential draws with mean `scale`.
///
/// # Errors
///
/// `InvalidParameter` unless `scale` is finite and positive.
pub fn exponential_sampler(scale: f64) -> Result<SamplerFn> {
    if !(scale.is_finite() && scale > 0.0) {
        return Err(CbxError::InvalidParameter {
            name: "scale",
            value: scale,
            reason: "must be finite and positive",
        });
    }
    let dist = Exp::new(1.0 / scale).map_err(|_| CbxError::InvalidParameter {
        name: "scale",
        value: scale,
        reason: "must be finite and positive",
    })?;
    Ok(Arc::new(move |rng: &mut StdRng, shape: (usize, usize, usize)| {
        Array3::from_shape_simple_fn(shape, || rng.sample(dist))
    }))
}

/// Euclidean norm.
pub fn euclidean_norm() -> NormFn {
    Arc::new(|v: ArrayView1<f64>| v.dot(&v).sqrt())
}

/// Inputs available to a noise model at one step.
#[derive(Debug, Clone, Copy)]
pub struct NoiseInput<'a> {
    /// `x_active - consensus`, shape `(M, P, d)`
    pub drift: ArrayView3<'a, f64>,
    /// Covariance square root per ensemble, `(M, d, d)`
    pub cov_sqrt: Option<ArrayView3<'a, f64>>,
    /// Time step
    pub dt: f64,
    /// Drift strength per ensemble, `(M,)`
    pub lamda: ArrayView1<'a, f64>,
}

/// A noise model.
pub trait Noise: Send + Sync {
    /// Draws a noise array with the drift's shape.
    fn sample(&self, input: &NoiseInput<'_>, rng: &mut StdRng) -> Array3<f64>;

    /// Whether the dynamic must provide `cov_sqrt`.
    fn requires_covariance(&self) -> bool {
        false
    }

    /// Configuration name of the model.
    fn name(&self) -> &'static str;
}

/// `sqrt(dt) * z * |drift_p|` with one norm per particle.
#[derive(Clone)]
pub struct IsotropicNoise {
    sampler: SamplerFn,
    norm: NormFn,
}

impl Default for IsotropicNoise {
    fn default() -> Self {
        Self {
            sampler: standard_normal_sampler(),
            norm: euclidean_norm(),
        }
    }
}

impl IsotropicNoise {
    /// Replaces the standard normal sampler.
    pub fn with_sampler(mut self, sampler: SamplerFn) -> Self {
        self.sampler = sampler;
        self
    }

    /// Replaces the Euclidean norm.
    pub fn with_norm(mut self, norm: NormFn) -> Self {
        self.norm = norm;
        self
    }
}

impl Noise for IsotropicNoise {
    fn sample(&self, input: &NoiseInput<'_>, rng: &mut StdRng) -> Array3<f64> {
        let mut z = (self.sampler)(rng, input.drift.dim());
        let sqrt_dt = input.dt.sqrt();
        for (mut zp, dp) in z
            .lanes_mut(Axis(2))
            .into_iter()
            .zip(input.drift.lanes(Axis(2)))
        {
            let scale = sqrt_dt * (self.norm)(dp);
            zp.mapv_inplace(|v| v * scale);
        }
        z
    }

    fn name(&self) -> &'static str {
        "isotropic"
    }
}

/// `sqrt(dt) * z ⊙ drift`, component-wise.
#[derive(Clone)]
pub struct AnisotropicNoise {
    sampler: SamplerFn,
}

impl Default for AnisotropicNoise {
    fn default() -> Self {
        Self {
            sampler: standard_normal_sampler(),
        }
    }
}

impl AnisotropicNoise {
    /// Replaces the standard normal sampler.
    pub fn with_sampler(mut self, sampler: SamplerFn) -> Self {
        self.sampler = sampler;
        self
    }
}

impl Noise for AnisotropicNoise {
    fn sample(&self, input: &NoiseInput<'_>, rng: &mut StdRng) -> Array3<f64> {
        let z = (self.sampler)(rng, input.drift.dim());
        z * &input.drift * input.dt.sqrt()
    }

    fn name(&self) -> &'static str {
        "anisotropic"
    }
}

/// Scaling of [`CovarianceNoise`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CovarianceScaling {
    /// `sqrt((1 / lamda) (1 - exp(-dt)^2))`, the CBS discretisation.
    #[default]
    Cbs,
    /// `sqrt(2 dt)`
    Langevin,
}

/// `factor * cov_sqrt · z` per particle.
#[derive(Clone)]
pub struct CovarianceNoise {
    sampler: SamplerFn,
    scaling: CovarianceScaling,
    label: &'static str,
}

impl Default for CovarianceNoise {
    fn default() -> Self {
        Self {
            sampler: standard_normal_sampler(),
            scaling: CovarianceScaling::Cbs,
            label: "covariance",
        }
    }
}

impl CovarianceNoise {
    /// Replaces the standard normal sampler.
    pub fn with_sampler(mut self, sampler: SamplerFn) -> Self {
        self.sampler = sampler;
        self
    }

    /// Selects the factor.
    pub fn with_scaling(mut self, scaling: CovarianceScaling) -> Self {
        self.scaling = scaling;
        self
    }

    fn factor(&self, dt: f64, lamda: f64) -> f64 {
        match self.scaling {
            CovarianceScaling::Cbs => {
                let decay = (-dt).exp();
                ((1.0 / lamda) * (1.0 - decay * decay)).sqrt()
            }
            CovarianceScaling::Langevin => (2.0 * dt).sqrt(),
        }
    }
}

impl Noise for CovarianceNoise {
    fn sample(&self, input: &NoiseInput<'_>, rng: &mut StdRng) -> Array3<f64> {
        let (m, p, d) = input.drift.dim();
        let z = (self.sampler)(rng, (m, p, d));
        let Some(cov_sqrt) = input.cov_sqrt else {
            warn!("{} noise without covariance, using identity", self.label);
            let mut out = z;
            for (i, mut ens) in out.outer_iter_mut().enumerate() {
                let f = self.factor(input.dt, input.lamda[i]);
                ens.mapv_inplace(|v| v * f);
            }
            return out;
        };

        let mut out = Array3::<f64>::zeros((m, p, d));
        for i in 0..m {
            let f = self.factor(input.dt, input.lamda[i]);
            let root = cov_sqrt.index_axis(Axis(0), i);
            for j in 0..p {
                let v = root.dot(&z.slice(s![i, j, ..]));
                out.slice_mut(s![i, j, ..]).assign(&(v * f));
            }
        }
        out
    }

    fn requires_covariance(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        self.label
    }
}

/// Exponential draws with mean one.
pub fn unit_exponential_sampler() -> SamplerFn {
    Arc::new(|rng: &mut StdRng, shape: (usize, usize, usize)| {
        Array3::from_shape_simple_fn(shape, || rng.sample::<f64, _>(Exp1))
    })
}

/// Covariance-shaped noise with exponential draws of mean one.
pub fn exponential_noise() -> CovarianceNoise {
    CovarianceNoise {
        sampler: unit_exponential_sampler(),
        scaling: CovarianceScaling::Cbs,
        label: "exponential",
    }
}

/// Named noise models for configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoiseKind {
    /// [`IsotropicNoise`]
    #[default]
    Isotropic,
    /// [`AnisotropicNoise`]
    Anisotropic,
    /// [`CovarianceNoise`]
    Covariance,
    /// [`exponential_noise`]
    Exponential,
}

impl NoiseKind {
    /// Instantiates the model with its default sampler.
    pub fn build(self) -> Box<dyn Noise> {
        match self {
            NoiseKind::Isotropic => Box::new(IsotropicNoise::default()),
            NoiseKind::Anisotropic => Box::new(AnisotropicNoise::default()),
            NoiseKind::Covariance => Box::new(CovarianceNoise::default()),
            NoiseKind::Exponential => Box::new(exponential_noise()),
        }
    }
}

impl FromStr for NoiseKind {
    type Err = CbxError;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "isotropic" => Ok(NoiseKind::Isotropic),
            "anisotropic" => Ok(NoiseKind::Anisotropic),
            "covariance" | "sampling" => Ok(NoiseKind::Covariance),
            "exponential" => Ok(NoiseKind::Exponential),
            _ => Err(CbxError::UnknownStrategy {
                kind: "noise",
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for NoiseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NoiseKind::Isotropic => "isotropic",
            NoiseKind::Anisotropic => "anisotropic",
            NoiseKind::Covariance => "covariance",
            NoiseKind::Exponential => "exponential",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{Array1, array};
    use rand::SeedableRng;

    fn ones_sampler() -> SamplerFn {
        Arc::new(|_: &mut StdRng, shape: (usize, usize, usize)| Array3::ones(shape))
    }

    #[test]
    fn test_noise_keeps_drift_shape() {
        let mut rng = StdRng::seed_from_u64(5);
        let drift = Array3::from_elem((2, 7, 3), 0.5);
        let lamda = Array1::ones(2);
        let cov = Array3::from_shape_fn((2, 3, 3), |(_, r, q)| if r == q { 1.0 } else { 0.0 });
        let input = NoiseInput {
            drift: drift.view(),
            cov_sqrt: Some(cov.view()),
            dt: 0.1,
            lamda: lamda.view(),
        };
        for kind in [
            NoiseKind::Isotropic,
            NoiseKind::Anisotropic,
            NoiseKind::Covariance,
            NoiseKind::Exponential,
        ] {
            let noise = kind.build();
            let z = noise.sample(&input, &mut rng);
            assert_eq!(z.dim(), (2, 7, 3), "{}", noise.name());
            assert!(z.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn test_isotropic_scaling() {
        let mut rng = StdRng::seed_from_u64(0);
        let drift = array![[[3.0, 4.0]]];
        let lamda = Array1::ones(1);
        let input = NoiseInput {
            drift: drift.view(),
            cov_sqrt: None,
            dt: 0.25,
            lamda: lamda.view(),
        };
        let z = IsotropicNoise::default()
            .with_sampler(ones_sampler())
            .sample(&input, &mut rng);
        assert_relative_eq!(z[[0, 0, 0]], 2.5);
        assert_relative_eq!(z[[0, 0, 1]], 2.5);

        let z = AnisotropicNoise::default()
            .with_sampler(ones_sampler())
            .sample(&input, &mut rng);
        assert_relative_eq!(z[[0, 0, 0]], 1.5);
        assert_relative_eq!(z[[0, 0, 1]], 2.0);
    }

    #[test]
    fn test_covariance_factor() {
        let mut rng = StdRng::seed_from_u64(0);
        let drift = Array3::zeros((1, 1, 2));
        let lamda = array![0.5];
        let cov = array![[[2.0, 0.0], [0.0, 1.0]]];
        let input = NoiseInput {
            drift: drift.view(),
            cov_sqrt: Some(cov.view()),
            dt: 0.1,
            lamda: lamda.view(),
        };
        let z = CovarianceNoise::default()
            .with_sampler(ones_sampler())
            .sample(&input, &mut rng);
        let decay = (-0.1f64).exp();
        let f = (2.0 * (1.0 - decay * decay)).sqrt();
        assert_relative_eq!(z[[0, 0, 0]], 2.0 * f, epsilon = 1e-12);
        assert_relative_eq!(z[[0, 0, 1]], f, epsilon = 1e-12);

        let z = CovarianceNoise::default()
            .with_sampler(ones_sampler())
            .with_scaling(CovarianceScaling::Langevin)
            .sample(&input, &mut rng);
        assert_relative_eq!(z[[0, 0, 1]], 0.2f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_exponential_sampler_is_positive() {
        let mut rng = StdRng::seed_from_u64(9);
        let sampler = exponential_sampler(2.0).unwrap();
        let z = sampler(&mut rng, (1, 2000, 1));
        assert!(z.iter().all(|&v| v >= 0.0));
        let mean = z.mean().unwrap();
        assert!((mean - 2.0).abs() < 0.2, "mean = {}", mean);
        assert!(exponential_sampler(0.0).is_err());
    }

    #[test]
    fn test_parse_noise() {
        assert_eq!("Isotropic".parse::<NoiseKind>().unwrap(), NoiseKind::Isotropic);
        assert_eq!(NoiseKind::Exponential.to_string(), "exponential");
        let err = "pink".parse::<NoiseKind>().unwrap_err();
        assert!(err.is_lookup_error());
    }
}
