//! Weighted ensemble covariance and its symmetric square root.

use log::warn;
use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis, s};

const EIGEN_MAX_ITER: usize = 1000;

/// Weighted covariance `sum_i w_i (x_i - c)(x_i - c)^T` of each ensemble.
///
/// `x` is `(M, B, d)`, `consensus` `(M, 1, d)` and `weights` `(M, B)` with
/// rows summing to one. Returns `(M, d, d)`.
pub fn weighted_covariance(
    x: ArrayView3<f64>,
    consensus: ArrayView3<f64>,
    weights: ArrayView2<f64>,
) -> Array3<f64> {
    let (m, b, d) = x.dim();
    let mut cov = Array3::<f64>::zeros((m, d, d));
    for i in 0..m {
        let c = consensus.slice(s![i, 0, ..]);
        let mut ci = cov.index_axis_mut(Axis(0), i);
        for j in 0..b {
            let w = weights[[i, j]];
            if w == 0.0 {
                continue;
            }
            let diff = &x.slice(s![i, j, ..]) - &c;
            for r in 0..d {
                for q in 0..d {
                    ci[[r, q]] += w * diff[r] * diff[q];
                }
            }
        }
    }
    cov
}

/// Symmetric positive semi-definite square root `V diag(sqrt(max(l, 0))) V^T`.
///
/// Non-finite input or a failed eigen decomposition yields the square root
/// of the diagonal.
pub fn symmetric_sqrt(c: ArrayView2<f64>) -> Array2<f64> {
    let d = c.nrows();
    let diagonal_sqrt = || {
        let mut out = Array2::<f64>::zeros((d, d));
        for k in 0..d {
            let v = c[[k, k]];
            out[[k, k]] = if v.is_finite() { v.max(0.0).sqrt() } else { 0.0 };
        }
        out
    };

    if c.iter().any(|v| !v.is_finite()) {
        warn!("covariance has non-finite entries, using diagonal square root");
        return diagonal_sqrt();
    }

    let m = DMatrix::from_fn(d, d, |r, q| 0.5 * (c[[r, q]] + c[[q, r]]));
    let Some(eigen) = SymmetricEigen::try_new(m, f64::EPSILON, EIGEN_MAX_ITER) else {
        warn!("eigen decomposition did not converge, using diagonal square root");
        return diagonal_sqrt();
    };

    let sqrt_eigenvalues = eigen.eigenvalues.map(|v| v.max(0.0).sqrt());
    let sqrt_d = DMatrix::from_diagonal(&sqrt_eigenvalues);
    let root = &eigen.eigenvectors * sqrt_d * eigen.eigenvectors.transpose();
    Array2::from_shape_fn((d, d), |(r, q)| root[(r, q)])
}

/// Square root of the weighted covariance of every ensemble, `(M, d, d)`.
pub fn covariance_sqrt(
    x: ArrayView3<f64>,
    consensus: ArrayView3<f64>,
    weights: ArrayView2<f64>,
) -> Array3<f64> {
    let mut cov = weighted_covariance(x, consensus, weights);
    for mut c in cov.outer_iter_mut() {
        let root = symmetric_sqrt(c.view());
        c.assign(&root);
    }
    cov
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_sqrt_reproduces_matrix() {
        let c = array![[4.0, 1.0, 0.5], [1.0, 3.0, 0.2], [0.5, 0.2, 2.0]];
        let r = symmetric_sqrt(c.view());
        let back = r.dot(&r);
        for (a, b) in back.iter().zip(c.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_covariance_of_two_points() {
        let x = array![[[1.0, 0.0], [-1.0, 0.0]]];
        let c = array![[[0.0, 0.0]]];
        let w = array![[0.5, 0.5]];
        let cov = weighted_covariance(x.view(), c.view(), w.view());
        assert_abs_diff_eq!(cov[[0, 0, 0]], 1.0);
        assert_abs_diff_eq!(cov[[0, 1, 1]], 0.0);

        let root = covariance_sqrt(x.view(), c.view(), w.view());
        assert_abs_diff_eq!(root[[0, 0, 0]], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(root[[0, 1, 1]], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_non_finite_falls_back_to_diagonal() {
        let c = array![[4.0, f64::NAN], [f64::NAN, 9.0]];
        let r = symmetric_sqrt(c.view());
        assert_eq!(r, array![[2.0, 0.0], [0.0, 3.0]]);
    }
}
