use ndarray::{Array3, ArrayD, Axis, Ix3};
use rand::Rng;

use crate::error::{CbxError, Result};

/// Uniform samples in `[x_min, x_max]` for an `(M, N, d)` ensemble.
pub(crate) fn init_uniform<R: Rng + ?Sized>(
    shape: (usize, usize, usize),
    x_min: f64,
    x_max: f64,
    rng: &mut R,
) -> Array3<f64> {
    let mut x = Array3::<f64>::zeros(shape);
    for v in x.iter_mut() {
        let u: f64 = rng.random::<f64>();
        *v = x_min + u * (x_max - x_min);
    }
    x
}

/// Pads user-supplied positions to rank 3.
///
/// | rank | result |
/// |---|---|
/// | 1 `(d)` | `(1, 1, d)` |
/// | 2 `(N, d)` | `(1, N, d)` |
/// | 3 `(M, N, d)` | unchanged |
pub(crate) fn normalize_positions(x: ArrayD<f64>) -> Result<Array3<f64>> {
    let rank = x.ndim();
    let padded = match rank {
        1 => x.insert_axis(Axis(0)).insert_axis(Axis(0)),
        2 => x.insert_axis(Axis(0)),
        3 => x,
        _ => return Err(CbxError::InvalidInitialShape { rank }),
    };
    padded
        .into_dimensionality::<Ix3>()
        .map_err(|_| CbxError::InvalidInitialShape { rank })
}
