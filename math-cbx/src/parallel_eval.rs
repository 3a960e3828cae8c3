use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayView3, Axis, s};
use rayon::prelude::*;

/// Parallel evaluation configuration
#[derive(Debug, Clone)]
pub struct ParallelConfig {
    /// Enable parallel evaluation
    pub enabled: bool,
    /// Number of threads to use (None = use rayon default)
    pub num_threads: Option<usize>,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            num_threads: None, // Use rayon's default (typically num_cpus)
        }
    }
}

/// Configure the global rayon pool once; later calls are ignored.
pub(crate) fn configure_thread_pool(config: &ParallelConfig) {
    if let Some(n) = config.num_threads {
        // Ignore error if global pool already set
        let _ = rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global();
    }
}

/// Evaluate a point-wise objective on every particle of an `(M, N, d)` batch.
///
/// # Arguments
/// * `x` - particle positions
/// * `eval_fn` - function evaluating a single position
/// * `config` - Parallel configuration
///
/// # Returns
/// Array of shape `(M, N)` with one value per particle
pub fn evaluate_particles_parallel<F>(
    x: ArrayView3<f64>,
    eval_fn: &F,
    config: &ParallelConfig,
) -> Array2<f64>
where
    F: Fn(ArrayView1<f64>) -> f64 + Sync + ?Sized,
{
    let (m, n, _) = x.dim();
    let total = m * n;

    if !config.enabled || total < 4 {
        // Sequential evaluation for small batches or when disabled
        return Array2::from_shape_fn((m, n), |(i, j)| eval_fn(x.slice(s![i, j, ..])));
    }

    // Always use global thread pool (configured once at construction)
    let values: Vec<f64> = (0..total)
        .into_par_iter()
        .map(|k| eval_fn(x.slice(s![k / n, k % n, ..])))
        .collect();

    Array2::from_shape_fn((m, n), |(i, j)| values[i * n + j])
}

/// Evaluate an ensemble-wise objective on each `(N, d)` slab of an `(M, N, d)` batch.
///
/// Returns one vector per ensemble, in ensemble order. Lengths are not
/// checked here.
pub fn evaluate_ensembles_parallel<F>(
    x: ArrayView3<f64>,
    eval_fn: &F,
    config: &ParallelConfig,
) -> Vec<Array1<f64>>
where
    F: Fn(ArrayView2<f64>) -> Array1<f64> + Sync + ?Sized,
{
    let m = x.len_of(Axis(0));

    if !config.enabled || m < 2 {
        return x.outer_iter().map(|ensemble| eval_fn(ensemble)).collect();
    }

    (0..m)
        .into_par_iter()
        .map(|i| eval_fn(x.index_axis(Axis(0), i)))
        .collect()
}
