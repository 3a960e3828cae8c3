//! Operators applied to the deterministic drift increment `lamda * dt * drift`.

use std::fmt;
use std::str::FromStr;

use ndarray::{Array3, ArrayView2, Axis};

use crate::error::CbxError;

/// Energies needed by energy-gated corrections.
#[derive(Debug, Clone, Copy)]
pub struct CorrectionInput<'a> {
    /// Energies of the updated particles, `(M, P)`
    pub energy: ArrayView2<'a, f64>,
    /// Objective at the consensus, `(M, 1)` or `(M, P)` for polar dynamics
    pub consensus_energy: Option<ArrayView2<'a, f64>>,
}

impl CorrectionInput<'_> {
    fn gap(&self, i: usize, j: usize) -> Option<f64> {
        let ce = self.consensus_energy?;
        let col = if ce.ncols() == 1 { 0 } else { j };
        Some(self.energy[[i, j]] - ce[[i, col]])
    }
}

/// A correction of the drift increment.
pub trait Correction: Send + Sync {
    /// Returns the corrected increment, same shape as `increment`.
    fn apply(&self, increment: Array3<f64>, input: &CorrectionInput<'_>) -> Array3<f64>;

    /// Whether the dynamic must evaluate the objective at the consensus.
    fn requires_consensus_energy(&self) -> bool {
        false
    }

    /// Configuration name.
    fn name(&self) -> &'static str;
}

/// Identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCorrection;

impl Correction for NoCorrection {
    fn apply(&self, increment: Array3<f64>, _input: &CorrectionInput<'_>) -> Array3<f64> {
        increment
    }

    fn name(&self) -> &'static str {
        "no_correction"
    }
}

/// Keeps the increment only where `f(x) > f(c)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeavisideCorrection;

impl Correction for HeavisideCorrection {
    fn apply(&self, mut increment: Array3<f64>, input: &CorrectionInput<'_>) -> Array3<f64> {
        for (i, mut ens) in increment.outer_iter_mut().enumerate() {
            for (j, mut p) in ens.outer_iter_mut().enumerate() {
                let above = input.gap(i, j).is_none_or(|gap| gap > 0.0);
                if !above {
                    p.fill(0.0);
                }
            }
        }
        increment
    }

    fn requires_consensus_energy(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "heavi_side"
    }
}

/// Smooth gate `0.5 + 0.5 tanh((f(x) - f(c)) / eps)`.
#[derive(Debug, Clone, Copy)]
pub struct HeavisideRegCorrection {
    /// Width of the transition
    pub eps: f64,
}

impl Default for HeavisideRegCorrection {
    fn default() -> Self {
        Self { eps: 1e-3 }
    }
}

impl Correction for HeavisideRegCorrection {
    fn apply(&self, mut increment: Array3<f64>, input: &CorrectionInput<'_>) -> Array3<f64> {
        for (i, mut ens) in increment.outer_iter_mut().enumerate() {
            for (j, mut p) in ens.outer_iter_mut().enumerate() {
                if let Some(gap) = input.gap(i, j) {
                    let gate = if gap.is_nan() {
                        0.0
                    } else {
                        0.5 + 0.5 * (gap / self.eps).tanh()
                    };
                    p.mapv_inplace(|v| v * gate);
                }
            }
        }
        increment
    }

    fn requires_consensus_energy(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "heavi_side_reg"
    }
}

/// Rescales every particle's increment to a Euclidean norm of at most `max_norm`.
#[derive(Debug, Clone, Copy)]
pub struct ClipCorrection {
    /// Largest admissible norm
    pub max_norm: f64,
}

impl Correction for ClipCorrection {
    fn apply(&self, mut increment: Array3<f64>, _input: &CorrectionInput<'_>) -> Array3<f64> {
        for mut p in increment.lanes_mut(Axis(2)) {
            let norm = p.dot(&p).sqrt();
            if norm > self.max_norm {
                let scale = self.max_norm / norm;
                p.mapv_inplace(|v| v * scale);
            }
        }
        increment
    }

    fn name(&self) -> &'static str {
        "clip"
    }
}

/// Named corrections for configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CorrectionKind {
    /// [`NoCorrection`]
    #[default]
    None,
    /// [`HeavisideCorrection`]
    Heaviside,
    /// [`HeavisideRegCorrection`]
    HeavisideReg,
    /// [`ClipCorrection`]
    Clip,
}

impl CorrectionKind {
    /// Instantiates the operator; `eps` is the smoothing width or the clip norm.
    pub fn build(self, eps: f64) -> Box<dyn Correction> {
        match self {
            CorrectionKind::None => Box::new(NoCorrection),
            CorrectionKind::Heaviside => Box::new(HeavisideCorrection),
            CorrectionKind::HeavisideReg => Box::new(HeavisideRegCorrection { eps }),
            CorrectionKind::Clip => Box::new(ClipCorrection { max_norm: eps }),
        }
    }
}

impl FromStr for CorrectionKind {
    type Err = CbxError;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "no_correction" | "none" => Ok(CorrectionKind::None),
            "heavi_side" | "heaviside" => Ok(CorrectionKind::Heaviside),
            "heavi_side_reg" | "heaviside_reg" => Ok(CorrectionKind::HeavisideReg),
            "clip" => Ok(CorrectionKind::Clip),
            _ => Err(CbxError::UnknownStrategy {
                kind: "correction",
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for CorrectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CorrectionKind::None => "no_correction",
            CorrectionKind::Heaviside => "heavi_side",
            CorrectionKind::HeavisideReg => "heavi_side_reg",
            CorrectionKind::Clip => "clip",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_heaviside_zeroes_better_particles() {
        let inc = Array3::from_elem((1, 3, 2), 1.0);
        let energy = array![[0.5, 2.0, 1.0]];
        let ce = array![[1.0]];
        let input = CorrectionInput {
            energy: energy.view(),
            consensus_energy: Some(ce.view()),
        };
        let out = HeavisideCorrection.apply(inc, &input);
        assert_eq!(out.row_sum(0), 0.0);
        assert_eq!(out.row_sum(1), 2.0);
        assert_eq!(out.row_sum(2), 0.0);
    }

    #[test]
    fn test_heaviside_reg_is_half_at_the_consensus() {
        let inc = Array3::from_elem((1, 2, 1), 2.0);
        let energy = array![[1.0, 100.0]];
        let ce = array![[1.0]];
        let input = CorrectionInput {
            energy: energy.view(),
            consensus_energy: Some(ce.view()),
        };
        let out = HeavisideRegCorrection { eps: 0.1 }.apply(inc, &input);
        assert_relative_eq!(out[[0, 0, 0]], 1.0);
        assert_relative_eq!(out[[0, 1, 0]], 2.0);
    }

    #[test]
    fn test_clip_limits_norm() {
        let inc = array![[[3.0, 4.0], [0.3, 0.4]]];
        let energy = array![[0.0, 0.0]];
        let input = CorrectionInput {
            energy: energy.view(),
            consensus_energy: None,
        };
        let out = ClipCorrection { max_norm: 1.0 }.apply(inc, &input);
        assert_relative_eq!(out[[0, 0, 0]], 0.6);
        assert_relative_eq!(out[[0, 0, 1]], 0.8);
        assert_relative_eq!(out[[0, 1, 0]], 0.3);
    }

    #[test]
    fn test_parse_correction() {
        assert_eq!(
            "no_correction".parse::<CorrectionKind>().unwrap(),
            CorrectionKind::None
        );
        assert_eq!(
            "heavi_side_reg".parse::<CorrectionKind>().unwrap(),
            CorrectionKind::HeavisideReg
        );
        assert!("bounce".parse::<CorrectionKind>().is_err());
        assert!(CorrectionKind::Heaviside.build(0.0).requires_consensus_energy());
        assert!(!CorrectionKind::None.build(0.0).requires_consensus_energy());
    }

    trait RowSum {
        fn row_sum(&self, j: usize) -> f64;
    }

    impl RowSum for Array3<f64> {
        fn row_sum(&self, j: usize) -> f64 {
            self.index_axis(Axis(1), j).sum()
        }
    }
}
