//! Post-processing of positions after every step.

use ndarray::{Array3, s};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Default clipping threshold.
pub const DEFAULT_MAX_THRESH: f64 = 1e8;
/// Default number of iterations between reshuffles.
pub const DEFAULT_RESHUFFLE_INTERVAL: usize = 50;

/// A transformation of the particle positions, applied in place.
pub trait PostProcess: Send + Sync {
    /// `it` is the index of the step that just ran.
    fn apply(&mut self, x: &mut Array3<f64>, it: usize, rng: &mut StdRng);
}

/// Replaces NaN by `max_thresh` and clips to `[-max_thresh, max_thresh]`.
#[derive(Debug, Clone, Copy)]
pub struct DefaultPostProcess {
    /// Clipping threshold
    pub max_thresh: f64,
}

impl Default for DefaultPostProcess {
    fn default() -> Self {
        Self {
            max_thresh: DEFAULT_MAX_THRESH,
        }
    }
}

impl DefaultPostProcess {
    /// Replaces NaN by `max_thresh` and clips, without needing a step context.
    pub fn sanitize(&self, x: &mut Array3<f64>) {
        let t = self.max_thresh;
        x.mapv_inplace(|v| if v.is_nan() { t } else { v.clamp(-t, t) });
    }
}

impl PostProcess for DefaultPostProcess {
    fn apply(&mut self, x: &mut Array3<f64>, _it: usize, _rng: &mut StdRng) {
        self.sanitize(x);
    }
}

/// Periodically permutes particles across all ensembles.
#[derive(Debug, Clone, Copy)]
pub struct ReshuffleAgentBatches {
    /// Iterations between two reshuffles
    pub reshuffle_interval: usize,
}

impl Default for ReshuffleAgentBatches {
    fn default() -> Self {
        Self {
            reshuffle_interval: DEFAULT_RESHUFFLE_INTERVAL,
        }
    }
}

impl PostProcess for ReshuffleAgentBatches {
    fn apply(&mut self, x: &mut Array3<f64>, it: usize, rng: &mut StdRng) {
        if self.reshuffle_interval == 0 || (it + 1) % self.reshuffle_interval != 0 {
            return;
        }
        let (m, n, _) = x.dim();
        let mut order: Vec<usize> = (0..m * n).collect();
        order.shuffle(rng);

        let source = x.clone();
        for (k, &src) in order.iter().enumerate() {
            x.slice_mut(s![k / n, k % n, ..])
                .assign(&source.slice(s![src / n, src % n, ..]));
        }
        log::debug!("reshuffled {} particles at iteration {}", m * n, it);
    }
}

/// Runs several post-processors in order.
#[derive(Default)]
pub struct CompositePostProcess {
    ops: Vec<Box<dyn PostProcess>>,
}

impl CompositePostProcess {
    /// Pipeline from an ordered list of operations.
    pub fn new(ops: Vec<Box<dyn PostProcess>>) -> Self {
        Self { ops }
    }

    /// Appends an operation.
    pub fn push(mut self, op: Box<dyn PostProcess>) -> Self {
        self.ops.push(op);
        self
    }

    /// Number of operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether the pipeline is empty.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl PostProcess for CompositePostProcess {
    fn apply(&mut self, x: &mut Array3<f64>, it: usize, rng: &mut StdRng) {
        for op in &mut self.ops {
            op.apply(x, it, rng);
        }
    }
}

/// Post-processing configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostProcessConfig {
    /// Clipping threshold
    pub max_thresh: f64,
    /// Reshuffle interval; `None` disables reshuffling
    pub reshuffle_interval: Option<usize>,
}

impl Default for PostProcessConfig {
    fn default() -> Self {
        Self {
            max_thresh: DEFAULT_MAX_THRESH,
            reshuffle_interval: None,
        }
    }
}

impl PostProcessConfig {
    /// Builds the sanitise-then-reshuffle pipeline.
    pub fn build(&self) -> CompositePostProcess {
        let mut pipeline = CompositePostProcess::new(vec![Box::new(DefaultPostProcess {
            max_thresh: self.max_thresh,
        })]);
        if let Some(interval) = self.reshuffle_interval {
            pipeline = pipeline.push(Box::new(ReshuffleAgentBatches {
                reshuffle_interval: interval,
            }));
        }
        pipeline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;

    #[test]
    fn test_sanitise_and_clip() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut x = array![[[f64::NAN, f64::INFINITY, f64::NEG_INFINITY, 5.0, -20.0]]];
        DefaultPostProcess { max_thresh: 10.0 }.apply(&mut x, 0, &mut rng);
        assert_eq!(x, array![[[10.0, 10.0, -10.0, 5.0, -10.0]]]);
    }

    #[test]
    fn test_reshuffle_preserves_multiset() {
        let mut rng = StdRng::seed_from_u64(3);
        let original = Array3::from_shape_fn((4, 10, 2), |(i, j, k)| (100 * i + 10 * j + k) as f64);
        let mut x = original.clone();
        let mut op = ReshuffleAgentBatches::default();

        op.apply(&mut x, 48, &mut rng);
        assert_eq!(x, original);

        op.apply(&mut x, 49, &mut rng);
        assert_ne!(x, original);
        let key = |a: &Array3<f64>| {
            let mut rows: Vec<(i64, i64)> = a
                .to_shape((40, 2))
                .unwrap()
                .outer_iter()
                .map(|r| (r[0] as i64, r[1] as i64))
                .collect();
            rows.sort_unstable();
            rows
        };
        assert_eq!(key(&x), key(&original));
    }

    #[test]
    fn test_composite_runs_in_order() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut pipeline = PostProcessConfig {
            max_thresh: 1.0,
            reshuffle_interval: Some(1),
        }
        .build();
        assert_eq!(pipeline.len(), 2);
        let mut x = array![[[f64::NAN], [3.0]], [[-3.0], [0.5]]];
        pipeline.apply(&mut x, 0, &mut rng);
        let mut values: Vec<f64> = x.iter().copied().collect();
        values.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(values, vec![-1.0, 0.5, 1.0, 1.0]);
    }
}
