use ndarray::Array3;
use rand::Rng;
use rand::seq::SliceRandom;

/// Latin hypercube samples in `[x_min, x_max]`, stratified independently
/// within every ensemble.
pub(crate) fn init_latin_hypercube<R: Rng + ?Sized>(
    shape: (usize, usize, usize),
    x_min: f64,
    x_max: f64,
    rng: &mut R,
) -> Array3<f64> {
    let (m, n, d) = shape;
    let mut samples = Array3::<f64>::zeros(shape);
    let mut strata = Vec::with_capacity(n);
    for run in 0..m {
        // For each dimension, create stratified samples and permute
        for j in 0..d {
            strata.clear();
            for k in 0..n {
                let u: f64 = rng.random::<f64>();
                strata.push(((k as f64) + u) / (n as f64));
            }
            strata.shuffle(rng);
            for (i, &s) in strata.iter().enumerate() {
                samples[(run, i, j)] = x_min + s * (x_max - x_min);
            }
        }
    }
    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_one_sample_per_stratum() {
        let mut rng = StdRng::seed_from_u64(11);
        let n = 10;
        let x = init_latin_hypercube((2, n, 3), 0.0, 1.0, &mut rng);
        for run in 0..2 {
            for j in 0..3 {
                let mut bins = vec![0usize; n];
                for i in 0..n {
                    let b = ((x[(run, i, j)] * n as f64) as usize).min(n - 1);
                    bins[b] += 1;
                }
                assert!(bins.iter().all(|&c| c == 1), "bins = {:?}", bins);
            }
        }
    }
}
