//! Schedulers adapting the exploration parameters between iterations.

use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, ArrayView1};

use crate::consensus::consensus_weights;
use crate::dynamic::CbxDynamic;
use crate::error::CbxError;

/// Updates parameters of a dynamic once per iteration, after the step.
pub trait Scheduler {
    /// Adjusts the parameters of `dynamic`.
    fn update(&mut self, dynamic: &mut CbxDynamic);
}

/// Parameter targeted by a [`Multiply`] scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulerParam {
    /// Consensus sharpness.
    #[default]
    Alpha,
    /// Drift strength.
    Lamda,
    /// Noise scale.
    Sigma,
}

impl FromStr for SchedulerParam {
    type Err = CbxError;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "alpha" => Ok(SchedulerParam::Alpha),
            "lamda" | "lambda" => Ok(SchedulerParam::Lamda),
            "sigma" => Ok(SchedulerParam::Sigma),
            _ => Err(CbxError::UnknownStrategy {
                kind: "scheduler parameter",
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for SchedulerParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerParam::Alpha => f.write_str("alpha"),
            SchedulerParam::Lamda => f.write_str("lamda"),
            SchedulerParam::Sigma => f.write_str("sigma"),
        }
    }
}

fn param_mut(dynamic: &mut CbxDynamic, param: SchedulerParam) -> &mut Array1<f64> {
    match param {
        SchedulerParam::Alpha => dynamic.alpha_mut(),
        SchedulerParam::Lamda => dynamic.lamda_mut(),
        SchedulerParam::Sigma => dynamic.sigma_mut(),
    }
}

/// Keeps every parameter constant.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoScheduler;

impl Scheduler for NoScheduler {
    fn update(&mut self, _dynamic: &mut CbxDynamic) {}
}

/// Geometric growth `p <- min(p * factor, maximum)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Multiply {
    /// Targeted parameter
    pub param: SchedulerParam,
    /// Growth factor
    pub factor: f64,
    /// Upper cap
    pub maximum: f64,
}

impl Default for Multiply {
    fn default() -> Self {
        Self {
            param: SchedulerParam::Alpha,
            factor: 1.05,
            maximum: 1e5,
        }
    }
}

impl Multiply {
    /// Scheduler on `alpha`.
    pub fn new(factor: f64, maximum: f64) -> Self {
        Self {
            param: SchedulerParam::Alpha,
            factor,
            maximum,
        }
    }

    /// Applies one update to a parameter vector.
    pub fn apply(&self, p: &mut Array1<f64>) {
        let (factor, maximum) = (self.factor, self.maximum);
        p.mapv_inplace(|v| (v * factor).min(maximum));
    }
}

impl Scheduler for Multiply {
    fn update(&mut self, dynamic: &mut CbxDynamic) {
        let p = param_mut(dynamic, self.param);
        self.apply(p);
    }
}

/// Chooses `alpha` so that the effective sample size `(sum w)^2 / sum w^2`
/// of the consensus weights is close to `eta * N`.
///
/// The root is found by bisection on `log(alpha)` in `[minimum, maximum]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectiveSampleSize {
    /// Target fraction of the ensemble
    pub eta: f64,
    /// Lower bound for alpha, must be positive
    pub minimum: f64,
    /// Upper bound for alpha
    pub maximum: f64,
    /// Number of bisection steps
    pub solve_max_it: usize,
}

impl Default for EffectiveSampleSize {
    fn default() -> Self {
        Self {
            eta: 0.5,
            minimum: 1e-5,
            maximum: 1e5,
            solve_max_it: 30,
        }
    }
}

/// Effective sample size of the consensus weights.
pub fn effective_sample_size(energy: ArrayView1<f64>, alpha: f64) -> f64 {
    let w = consensus_weights(energy, alpha);
    let sq: f64 = w.iter().map(|v| v * v).sum();
    if sq > 0.0 { 1.0 / sq } else { 0.0 }
}

impl EffectiveSampleSize {
    /// Solves for alpha on one ensemble.
    pub fn solve(&self, energy: ArrayView1<f64>) -> f64 {
        let target = self.eta * energy.len() as f64;
        let excess = |alpha: f64| effective_sample_size(energy, alpha) - target;

        let mut lo = self.minimum.max(f64::MIN_POSITIVE).ln();
        let mut hi = self.maximum.max(self.minimum).ln();
        if excess(hi.exp()) >= 0.0 {
            return hi.exp();
        }
        if excess(lo.exp()) <= 0.0 {
            return lo.exp();
        }
        for _ in 0..self.solve_max_it {
            let mid = 0.5 * (lo + hi);
            if excess(mid.exp()) > 0.0 {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        (0.5 * (lo + hi)).exp()
    }
}

impl Scheduler for EffectiveSampleSize {
    fn update(&mut self, dynamic: &mut CbxDynamic) {
        let energy = dynamic.energy().to_owned();
        let alpha = dynamic.alpha_mut();
        for (i, row) in energy.outer_iter().enumerate() {
            alpha[i] = self.solve(row);
        }
    }
}

/// Runs several schedulers in order.
#[derive(Default)]
pub struct SchedulerList {
    schedulers: Vec<Box<dyn Scheduler>>,
}

impl SchedulerList {
    /// List from an ordered set of schedulers.
    pub fn new(schedulers: Vec<Box<dyn Scheduler>>) -> Self {
        Self { schedulers }
    }

    /// Appends a scheduler.
    pub fn push(mut self, scheduler: Box<dyn Scheduler>) -> Self {
        self.schedulers.push(scheduler);
        self
    }
}

impl Scheduler for SchedulerList {
    fn update(&mut self, dynamic: &mut CbxDynamic) {
        for s in &mut self.schedulers {
            s.update(dynamic);
        }
    }
}
