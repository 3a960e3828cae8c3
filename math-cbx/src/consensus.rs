//! Weighted consensus points.
//!
//! The consensus of an ensemble is the Gibbs-weighted mean
//! `c = sum_i w_i x_i / sum_i w_i` with `w_i = exp(-alpha (f_i - min f))`.
//! Energies are shifted by their minimum before exponentiation, so the best
//! particle always carries the unnormalised weight 1 and large `alpha` cannot
//! underflow the normalisation.
//!
//! Degenerate inputs resolve deterministically:
//!
//! - minimum `-inf`: the consensus is the best particle;
//! - all energies `+inf`: the consensus is the unweighted mean;
//! - non-finite normalisation (e.g. `alpha` is NaN): the best particle.

use log::warn;
use ndarray::{Array1, Array2, Array3, ArrayView1, ArrayView2, ArrayView3, Axis, s};

use crate::argmin::argmin;
use crate::kernel::{Kernel, KernelFactorMode};

/// Result of a global consensus computation.
#[derive(Debug, Clone)]
pub struct Consensus {
    /// Consensus point per ensemble, shape `(M, 1, d)`
    pub point: Array3<f64>,
    /// Minimum energy of the batch per ensemble, shape `(M,)`
    pub energy: Array1<f64>,
    /// Normalised weights, shape `(M, B)`
    pub weights: Array2<f64>,
}

/// Log-weight of one particle relative to the ensemble minimum.
fn log_weight(e: f64, min: f64, alpha: f64) -> f64 {
    if min == f64::INFINITY || e == min {
        0.0
    } else if e.is_infinite() {
        f64::NEG_INFINITY
    } else {
        -alpha * (e - min)
    }
}

fn one_hot(len: usize, index: usize) -> Array1<f64> {
    let mut w = Array1::zeros(len);
    w[index] = 1.0;
    w
}

/// Normalised consensus weights of one ensemble.
///
/// Always sums to one when at least one energy is finite.
pub fn consensus_weights(energy: ArrayView1<f64>, alpha: f64) -> Array1<f64> {
    let n = energy.len();
    if n == 0 {
        return Array1::zeros(0);
    }
    let (best, min) = argmin(energy);
    if min == f64::NEG_INFINITY {
        return one_hot(n, best);
    }

    let w = energy.mapv(|e| log_weight(e, min, alpha).exp());
    let total = w.sum();
    if !total.is_finite() || total <= 0.0 {
        warn!(
            "consensus weights degenerate (sum = {}, alpha = {}), using best particle",
            total, alpha
        );
        return one_hot(n, best);
    }
    w / total
}

/// Computes the global consensus of every ensemble.
///
/// `x` has shape `(M, B, d)`, `energy` `(M, B)` and `alpha` `(M,)`.
pub fn compute_consensus(
    x: ArrayView3<f64>,
    energy: ArrayView2<f64>,
    alpha: ArrayView1<f64>,
) -> Consensus {
    let (m, b, d) = x.dim();
    let mut point = Array3::<f64>::zeros((m, 1, d));
    let mut weights = Array2::<f64>::zeros((m, b));
    let mut min_energy = Array1::<f64>::zeros(m);

    for i in 0..m {
        let e = energy.row(i);
        let w = consensus_weights(e, alpha[i]);
        min_energy[i] = argmin(e).1;
        let xi = x.index_axis(Axis(0), i);
        point.slice_mut(s![i, 0, ..]).assign(&w.dot(&xi));
        weights.row_mut(i).assign(&w);
    }

    Consensus {
        point,
        energy: min_energy,
        weights,
    }
}

/// Computes one consensus point per target particle, localised by a kernel.
///
/// The weight of batch particle `j` for target `p` is
/// `exp(-kf k(t_p, x_j) - alpha (f_j - min f))` where `kf` follows `mode`.
/// When all weights of a target vanish, the best particle of the batch is used.
pub fn compute_polar_consensus(
    targets: ArrayView3<f64>,
    x: ArrayView3<f64>,
    energy: ArrayView2<f64>,
    alpha: ArrayView1<f64>,
    kernel: &Kernel,
    mode: KernelFactorMode,
) -> Array3<f64> {
    let (m, p, d) = targets.dim();
    let b = x.dim().1;
    let mut out = Array3::<f64>::zeros((m, p, d));

    for i in 0..m {
        let e = energy.row(i);
        let xi = x.index_axis(Axis(0), i);
        let (best, min) = argmin(e);
        let kf = mode.factor(alpha[i]);
        let mut fallbacks = 0usize;

        for t in 0..p {
            let target = targets.slice(s![i, t, ..]);
            let logw = if min == f64::NEG_INFINITY {
                None
            } else {
                Some(Array1::from_shape_fn(b, |j| {
                    let k = kernel.neg_log(target, xi.row(j));
                    let k_term = if k == 0.0 { 0.0 } else { -kf * k };
                    k_term + log_weight(e[j], min, alpha[i])
                }))
            };

            let point = logw.and_then(|lw| {
                let lse = logsumexp(lw.view());
                if !lse.is_finite() {
                    return None;
                }
                let w = lw.mapv(|v| (v - lse).exp());
                let c = w.dot(&xi);
                c.iter().all(|v| v.is_finite()).then_some(c)
            });

            match point {
                Some(c) => out.slice_mut(s![i, t, ..]).assign(&c),
                None => {
                    fallbacks += 1;
                    out.slice_mut(s![i, t, ..]).assign(&xi.row(best));
                }
            }
        }

        if fallbacks > 0 {
            warn!(
                "polar consensus: {} of {} targets in ensemble {} fell back to the best particle",
                fallbacks, p, i
            );
        }
    }
    out
}

/// Numerically stable `log(sum(exp(v)))`.
///
/// Returns `-inf` for an empty input or when every entry is `-inf`.
pub fn logsumexp(v: ArrayView1<f64>) -> f64 {
    let max = v.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    if max == f64::INFINITY {
        return f64::INFINITY;
    }
    max + v.iter().map(|&x| (x - max).exp()).sum::<f64>().ln()
}
