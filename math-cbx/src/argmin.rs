use ndarray::ArrayView1;

/// Index and value of the smallest entry; the first one wins on ties.
///
/// NaN entries never compare smaller and are skipped unless the slice starts
/// with one.
pub(crate) fn argmin(v: ArrayView1<f64>) -> (usize, f64) {
    let mut best_i = 0usize;
    let mut best_v = v[0];
    for (i, &val) in v.iter().enumerate() {
        if val < best_v || (best_v.is_nan() && !val.is_nan()) {
            best_v = val;
            best_i = i;
        }
    }
    (best_i, best_v)
}
