//! Similarity kernels for the polarized consensus.

use std::fmt;
use std::str::FromStr;

use ndarray::ArrayView1;

use crate::error::CbxError;

/// Kernel family used to localise the consensus around each particle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KernelKind {
    /// `exp(-|x - y|^2 / (2 kappa^2))`
    #[default]
    Gaussian,
    /// `exp(-|x - y| / kappa)`
    Laplace,
    /// Indicator of `|x - y| <= kappa`.
    Constant,
    /// `1 / (1 + |x - y|^2 / kappa^2)`
    InverseQuadratic,
}

impl FromStr for KernelKind {
    type Err = CbxError;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gaussian" => Ok(KernelKind::Gaussian),
            "laplace" => Ok(KernelKind::Laplace),
            "constant" => Ok(KernelKind::Constant),
            "inverse_quadratic" | "inversequadratic" => Ok(KernelKind::InverseQuadratic),
            _ => Err(CbxError::UnknownStrategy {
                kind: "kernel",
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for KernelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KernelKind::Gaussian => "gaussian",
            KernelKind::Laplace => "laplace",
            KernelKind::Constant => "constant",
            KernelKind::InverseQuadratic => "inverse_quadratic",
        };
        f.write_str(name)
    }
}

/// How the kernel term is scaled relative to the energy term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KernelFactorMode {
    /// Factor 1.
    #[default]
    Const,
    /// Factor `alpha`.
    Alpha,
    /// Factor `sqrt(alpha)`.
    SqrtAlpha,
}

impl KernelFactorMode {
    /// Factor multiplying the kernel's negative log for a given `alpha`.
    pub fn factor(self, alpha: f64) -> f64 {
        match self {
            KernelFactorMode::Const => 1.0,
            KernelFactorMode::Alpha => alpha,
            KernelFactorMode::SqrtAlpha => alpha.sqrt(),
        }
    }
}

impl FromStr for KernelFactorMode {
    type Err = CbxError;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "const" => Ok(KernelFactorMode::Const),
            "alpha" => Ok(KernelFactorMode::Alpha),
            "sqrt_alpha" => Ok(KernelFactorMode::SqrtAlpha),
            _ => Err(CbxError::UnknownStrategy {
                kind: "kernel_factor_mode",
                name: s.to_string(),
            }),
        }
    }
}

/// A kernel with its width `kappa`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kernel {
    /// Kernel family
    pub kind: KernelKind,
    /// Width parameter, must be positive
    pub kappa: f64,
}

impl Default for Kernel {
    fn default() -> Self {
        Self {
            kind: KernelKind::Gaussian,
            kappa: 1.0,
        }
    }
}

impl Kernel {
    /// Negative logarithm of `k(x, y)`; `+inf` where the kernel vanishes.
    pub fn neg_log(&self, x: ArrayView1<f64>, y: ArrayView1<f64>) -> f64 {
        let sq: f64 = x.iter().zip(y.iter()).map(|(a, b)| (a - b) * (a - b)).sum();
        match self.kind {
            KernelKind::Gaussian => sq / (2.0 * self.kappa * self.kappa),
            KernelKind::Laplace => sq.sqrt() / self.kappa,
            KernelKind::Constant => {
                if sq.sqrt() <= self.kappa {
                    0.0
                } else {
                    f64::INFINITY
                }
            }
            KernelKind::InverseQuadratic => (1.0 + sq / (self.kappa * self.kappa)).ln(),
        }
    }

    /// Kernel value `k(x, y)`.
    pub fn eval(&self, x: ArrayView1<f64>, y: ArrayView1<f64>) -> f64 {
        (-self.neg_log(x, y)).exp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_kernels_are_one_on_the_diagonal() {
        let x = array![0.3, -1.2];
        for kind in [
            KernelKind::Gaussian,
            KernelKind::Laplace,
            KernelKind::Constant,
            KernelKind::InverseQuadratic,
        ] {
            let k = Kernel { kind, kappa: 0.5 };
            assert_relative_eq!(k.eval(x.view(), x.view()), 1.0);
        }
    }

    #[test]
    fn test_kernel_values() {
        let x = array![0.0, 0.0];
        let y = array![3.0, 4.0];
        let g = Kernel {
            kind: KernelKind::Gaussian,
            kappa: 5.0,
        };
        assert_relative_eq!(g.eval(x.view(), y.view()), (-0.5f64).exp(), epsilon = 1e-12);

        let l = Kernel {
            kind: KernelKind::Laplace,
            kappa: 5.0,
        };
        assert_relative_eq!(l.eval(x.view(), y.view()), (-1.0f64).exp(), epsilon = 1e-12);

        let c = Kernel {
            kind: KernelKind::Constant,
            kappa: 4.0,
        };
        assert_eq!(c.eval(x.view(), y.view()), 0.0);

        let q = Kernel {
            kind: KernelKind::InverseQuadratic,
            kappa: 5.0,
        };
        assert_relative_eq!(q.eval(x.view(), y.view()), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_parse_kernel_names() {
        assert_eq!("Gaussian".parse::<KernelKind>().unwrap(), KernelKind::Gaussian);
        assert_eq!(
            "inverse_quadratic".parse::<KernelKind>().unwrap(),
            KernelKind::InverseQuadratic
        );
        assert!("cosine".parse::<KernelKind>().is_err());
        assert_eq!(
            "sqrt_alpha".parse::<KernelFactorMode>().unwrap(),
            KernelFactorMode::SqrtAlpha
        );
        assert_eq!(KernelFactorMode::SqrtAlpha.factor(4.0), 2.0);
    }
}
