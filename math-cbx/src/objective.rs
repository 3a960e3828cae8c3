//! Objective capability: a vectorised callable evaluated on whole ensembles.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayView3, Axis};

use crate::error::{CbxError, Result};
use crate::parallel_eval::{ParallelConfig, evaluate_ensembles_parallel, evaluate_particles_parallel};

/// Point-wise objective `R^d -> R`.
pub type PointFn = Arc<dyn Fn(ArrayView1<f64>) -> f64 + Send + Sync>;
/// Ensemble-wise objective `(N, d) -> (N,)`.
pub type EnsembleFn = Arc<dyn Fn(ArrayView2<f64>) -> Array1<f64> + Send + Sync>;
/// Batch objective `(M, N, d) -> (M, N)`.
pub type BatchFn = Arc<dyn Fn(ArrayView3<f64>) -> Array2<f64> + Send + Sync>;

/// Arity of the callable wrapped by an [`Objective`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FDim {
    /// One position at a time.
    #[default]
    OneD,
    /// One ensemble `(N, d)` at a time.
    TwoD,
    /// The whole batch `(M, N, d)` at once.
    ThreeD,
}

impl FromStr for FDim {
    type Err = CbxError;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1d" => Ok(FDim::OneD),
            "2d" => Ok(FDim::TwoD),
            "3d" => Ok(FDim::ThreeD),
            _ => Err(CbxError::UnknownStrategy {
                kind: "f_dim",
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for FDim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FDim::OneD => write!(f, "1D"),
            FDim::TwoD => write!(f, "2D"),
            FDim::ThreeD => write!(f, "3D"),
        }
    }
}

/// Objective function seen by the dynamics.
///
/// Evaluation is deterministic for a fixed input; the best-found record
/// relies on it.
#[derive(Clone)]
pub enum Objective {
    /// Evaluated particle by particle (optionally in parallel).
    Point(PointFn),
    /// Evaluated ensemble by ensemble.
    Ensemble(EnsembleFn),
    /// Evaluated on the full `(M, N, d)` array.
    Batch(BatchFn),
}

impl fmt::Debug for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Objective").field(&self.f_dim()).finish()
    }
}

impl Objective {
    /// Wraps a point-wise function.
    pub fn point<F>(f: F) -> Self
    where
        F: Fn(ArrayView1<f64>) -> f64 + Send + Sync + 'static,
    {
        Objective::Point(Arc::new(f))
    }

    /// Wraps an ensemble-wise function.
    pub fn ensemble<F>(f: F) -> Self
    where
        F: Fn(ArrayView2<f64>) -> Array1<f64> + Send + Sync + 'static,
    {
        Objective::Ensemble(Arc::new(f))
    }

    /// Wraps a batch function.
    pub fn batch<F>(f: F) -> Self
    where
        F: Fn(ArrayView3<f64>) -> Array2<f64> + Send + Sync + 'static,
    {
        Objective::Batch(Arc::new(f))
    }

    /// Arity of the wrapped callable.
    pub fn f_dim(&self) -> FDim {
        match self {
            Objective::Point(_) => FDim::OneD,
            Objective::Ensemble(_) => FDim::TwoD,
            Objective::Batch(_) => FDim::ThreeD,
        }
    }

    /// Evaluates every particle of `x`, returning shape `(M, N)`.
    ///
    /// # Errors
    ///
    /// `ObjectiveShape` if the callable returns the wrong shape and
    /// `NonFiniteObjective` if any value is NaN. Infinite values pass through.
    pub fn evaluate(&self, x: ArrayView3<f64>, parallel: &ParallelConfig) -> Result<Array2<f64>> {
        let (m, n, _) = x.dim();
        let energy = match self {
            Objective::Point(f) => evaluate_particles_parallel(x, f.as_ref(), parallel),
            Objective::Ensemble(f) => {
                let rows = evaluate_ensembles_parallel(x, f.as_ref(), parallel);
                let mut energy = Array2::<f64>::zeros((m, n));
                for (i, row) in rows.into_iter().enumerate() {
                    if row.len() != n {
                        return Err(CbxError::ObjectiveShape {
                            expected: vec![n],
                            got: vec![row.len()],
                        });
                    }
                    energy.row_mut(i).assign(&row);
                }
                energy
            }
            Objective::Batch(f) => f(x),
        };

        if energy.dim() != (m, n) {
            return Err(CbxError::ObjectiveShape {
                expected: vec![m, n],
                got: energy.shape().to_vec(),
            });
        }
        if let Some(((ensemble, particle), _)) = energy.indexed_iter().find(|(_, v)| v.is_nan()) {
            return Err(CbxError::NonFiniteObjective { ensemble, particle });
        }
        Ok(energy)
    }

    /// Evaluates a single position.
    pub fn evaluate_point(&self, x: ArrayView1<f64>) -> Result<f64> {
        let batch = x.insert_axis(Axis(0)).insert_axis(Axis(0));
        let energy = self.evaluate(batch, &ParallelConfig::default())?;
        Ok(energy[[0, 0]])
    }
}
