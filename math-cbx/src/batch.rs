//! Mini-batch selection of the active particle subset.

use ndarray::{Array2, Array3, s};
use rand::Rng;

use crate::distinct_indices::distinct_indices;

/// Mini-batching policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchConfig {
    /// Number of particles per ensemble entering the consensus.
    pub size: usize,
    /// Update only the batch (`true`) or every particle (`false`).
    pub partial: bool,
}

/// Particle indices used during one step, one list per ensemble.
///
/// `None` selects every particle.
#[derive(Debug, Clone, Default)]
pub struct BatchIndices {
    /// Particles entering the consensus computation.
    pub consensus: Option<Vec<Vec<usize>>>,
    /// Particles whose positions are updated.
    pub particles: Option<Vec<Vec<usize>>>,
}

impl BatchIndices {
    /// Draws fresh indices for an `(m, n)` ensemble.
    pub(crate) fn draw<R: Rng + ?Sized>(
        config: Option<&BatchConfig>,
        m: usize,
        n: usize,
        rng: &mut R,
    ) -> Self {
        match config {
            Some(cfg) if cfg.size < n => {
                let consensus: Vec<Vec<usize>> =
                    (0..m).map(|_| distinct_indices(cfg.size, n, rng)).collect();
                let particles = if cfg.partial {
                    Some(consensus.clone())
                } else {
                    None
                };
                Self {
                    consensus: Some(consensus),
                    particles,
                }
            }
            _ => Self::default(),
        }
    }
}

pub(crate) fn gather(x: &Array3<f64>, idx: Option<&[Vec<usize>]>) -> Array3<f64> {
    match idx {
        None => x.clone(),
        Some(idx) => {
            let (m, _, d) = x.dim();
            let b = idx.first().map_or(0, |row| row.len());
            Array3::from_shape_fn((m, b, d), |(i, j, k)| x[[i, idx[i][j], k]])
        }
    }
}

pub(crate) fn gather_energy(energy: &Array2<f64>, idx: Option<&[Vec<usize>]>) -> Array2<f64> {
    match idx {
        None => energy.clone(),
        Some(idx) => {
            let m = energy.nrows();
            let b = idx.first().map_or(0, |row| row.len());
            Array2::from_shape_fn((m, b), |(i, j)| energy[[i, idx[i][j]]])
        }
    }
}

pub(crate) fn scatter(x: &mut Array3<f64>, idx: Option<&[Vec<usize>]>, values: &Array3<f64>) {
    match idx {
        None => x.assign(values),
        Some(idx) => {
            for (i, row) in idx.iter().enumerate() {
                for (j, &p) in row.iter().enumerate() {
                    x.slice_mut(s![i, p, ..]).assign(&values.slice(s![i, j, ..]));
                }
            }
        }
    }
}

pub(crate) fn scatter_energy(
    energy: &mut Array2<f64>,
    idx: Option<&[Vec<usize>]>,
    values: &Array2<f64>,
) {
    match idx {
        None => energy.assign(values),
        Some(idx) => {
            for (i, row) in idx.iter().enumerate() {
                for (j, &p) in row.iter().enumerate() {
                    energy[[i, p]] = values[[i, j]];
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_full_batch_selects_everything() {
        let mut rng = StdRng::seed_from_u64(0);
        let cfg = BatchConfig {
            size: 10,
            partial: true,
        };
        let idx = BatchIndices::draw(Some(&cfg), 2, 10, &mut rng);
        assert!(idx.consensus.is_none());
        assert!(idx.particles.is_none());
    }

    #[test]
    fn test_partial_batch_shares_indices() {
        let mut rng = StdRng::seed_from_u64(1);
        let cfg = BatchConfig {
            size: 4,
            partial: true,
        };
        let idx = BatchIndices::draw(Some(&cfg), 3, 10, &mut rng);
        let consensus = idx.consensus.unwrap();
        assert_eq!(consensus.len(), 3);
        assert!(consensus.iter().all(|row| row.len() == 4));
        assert_eq!(idx.particles.unwrap(), consensus);

        let cfg = BatchConfig {
            size: 4,
            partial: false,
        };
        let idx = BatchIndices::draw(Some(&cfg), 3, 10, &mut rng);
        assert!(idx.consensus.is_some());
        assert!(idx.particles.is_none());
    }

    #[test]
    fn test_gather_then_scatter_roundtrip() {
        let x = Array3::from_shape_fn((2, 5, 2), |(i, j, k)| (100 * i + 10 * j + k) as f64);
        let idx = vec![vec![4, 1], vec![0, 3]];
        let sub = gather(&x, Some(&idx));
        assert_eq!(sub.dim(), (2, 2, 2));
        assert_eq!(sub[[0, 0, 1]], 41.0);
        assert_eq!(sub[[1, 1, 0]], 130.0);

        let mut y = Array3::<f64>::zeros((2, 5, 2));
        scatter(&mut y, Some(&idx), &sub);
        assert_eq!(y[[0, 4, 1]], 41.0);
        assert_eq!(y[[0, 0, 0]], 0.0);

        let e = Array2::from_shape_fn((2, 5), |(i, j)| (10 * i + j) as f64);
        let sub_e = gather_energy(&e, Some(&idx));
        let mut f = Array2::<f64>::zeros((2, 5));
        scatter_energy(&mut f, Some(&idx), &sub_e);
        assert_eq!(f[[1, 3]], 13.0);
        assert_eq!(f[[1, 2]], 0.0);
    }
}
