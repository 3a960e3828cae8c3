//! Named benchmark objectives for the binaries and the experiment runner.

use std::collections::HashMap;
use std::f64::consts::{E, PI};

use ndarray::ArrayView1;

use crate::error::{CbxError, Result};
use crate::objective::Objective;

/// Point-wise benchmark function.
pub type TestFunction = fn(ArrayView1<f64>) -> f64;

/// A benchmark with its usual search box and known minimum.
#[derive(Clone, Copy, Debug)]
pub struct FunctionInfo {
    /// The function itself.
    pub f: TestFunction,
    /// Usual search box `[lower, upper]` in every coordinate.
    pub bounds: (f64, f64),
    /// Value of the global minimum.
    pub minimum: f64,
    /// Fixed dimension, if the function is not defined for every `d`.
    pub dim: Option<usize>,
}

/// Sphere: `sum x_i^2`, minimum 0 at the origin.
pub fn sphere(x: ArrayView1<f64>) -> f64 {
    x.iter().map(|v| v * v).sum()
}

/// Weighted sum of squares `sum i x_i^2`, minimum 0 at the origin.
pub fn sum_squares(x: ArrayView1<f64>) -> f64 {
    x.iter().enumerate().map(|(i, v)| (i + 1) as f64 * v * v).sum()
}

/// Shifted quadratic `sum (x_i - 1)^2`, minimum 0 at `(1, ..., 1)`.
pub fn quadratic(x: ArrayView1<f64>) -> f64 {
    x.iter().map(|v| (v - 1.0) * (v - 1.0)).sum()
}

/// Rastrigin, minimum 0 at the origin.
pub fn rastrigin(x: ArrayView1<f64>) -> f64 {
    10.0 * x.len() as f64
        + x.iter()
            .map(|v| v * v - 10.0 * (2.0 * PI * v).cos())
            .sum::<f64>()
}

/// Ackley, minimum 0 at the origin.
pub fn ackley(x: ArrayView1<f64>) -> f64 {
    let n = x.len() as f64;
    let sum_sq: f64 = x.iter().map(|v| v * v).sum();
    let sum_cos: f64 = x.iter().map(|v| (2.0 * PI * v).cos()).sum();
    -20.0 * (-0.2 * (sum_sq / n).sqrt()).exp() - (sum_cos / n).exp() + 20.0 + E
}

/// Rosenbrock, minimum 0 at `(1, ..., 1)`.
pub fn rosenbrock(x: ArrayView1<f64>) -> f64 {
    x.windows(2)
        .into_iter()
        .map(|w| 100.0 * (w[1] - w[0] * w[0]).powi(2) + (1.0 - w[0]).powi(2))
        .sum()
}

/// Griewank, minimum 0 at the origin.
pub fn griewank(x: ArrayView1<f64>) -> f64 {
    let sum: f64 = x.iter().map(|v| v * v).sum::<f64>() / 4000.0;
    let prod: f64 = x
        .iter()
        .enumerate()
        .map(|(i, v)| (v / ((i + 1) as f64).sqrt()).cos())
        .product();
    sum - prod + 1.0
}

/// Himmelblau on the first two coordinates, four minima of value 0.
pub fn himmelblau(x: ArrayView1<f64>) -> f64 {
    let (a, b) = (x[0], x[1]);
    (a * a + b - 11.0).powi(2) + (a + b * b - 7.0).powi(2)
}

/// Levy, minimum 0 at `(1, ..., 1)`.
pub fn levy(x: ArrayView1<f64>) -> f64 {
    let w: Vec<f64> = x.iter().map(|v| 1.0 + (v - 1.0) / 4.0).collect();
    let n = w.len();
    let head = (PI * w[0]).sin().powi(2);
    let body: f64 = w[..n - 1]
        .iter()
        .map(|wi| (wi - 1.0).powi(2) * (1.0 + 10.0 * (PI * wi + 1.0).sin().powi(2)))
        .sum();
    let wn = w[n - 1];
    let tail = (wn - 1.0).powi(2) * (1.0 + (2.0 * PI * wn).sin().powi(2));
    head + body + tail
}

/// Zakharov, minimum 0 at the origin.
pub fn zakharov(x: ArrayView1<f64>) -> f64 {
    let sq: f64 = x.iter().map(|v| v * v).sum();
    let lin: f64 = x
        .iter()
        .enumerate()
        .map(|(i, v)| 0.5 * (i + 1) as f64 * v)
        .sum();
    sq + lin.powi(2) + lin.powi(4)
}

/// Styblinski-Tang scaled by `1/d`, minimum about -39.1662 at `x_i = -2.9035`.
pub fn styblinski_tang(x: ArrayView1<f64>) -> f64 {
    let n = x.len() as f64;
    x.iter()
        .map(|v| v.powi(4) - 16.0 * v * v + 5.0 * v)
        .sum::<f64>()
        / (2.0 * n)
}

/// Salomon, minimum 0 at the origin.
pub fn salomon(x: ArrayView1<f64>) -> f64 {
    let r = x.iter().map(|v| v * v).sum::<f64>().sqrt();
    1.0 - (2.0 * PI * r).cos() + 0.1 * r
}

/// Drop-wave on the first two coordinates, minimum -1 at the origin.
pub fn drop_wave(x: ArrayView1<f64>) -> f64 {
    let r2 = x[0] * x[0] + x[1] * x[1];
    -(1.0 + (12.0 * r2.sqrt()).cos()) / (0.5 * r2 + 2.0)
}

/// Three-hump camel on the first two coordinates, minimum 0 at the origin.
pub fn three_hump_camel(x: ArrayView1<f64>) -> f64 {
    let (a, b) = (x[0], x[1]);
    2.0 * a * a - 1.05 * a.powi(4) + a.powi(6) / 6.0 + a * b + b * b
}

/// Registry mapping names to benchmark functions.
pub struct FunctionRegistry {
    functions: HashMap<String, FunctionInfo>,
}

impl FunctionRegistry {
    /// Creates a new registry with all bundled benchmarks.
    pub fn new() -> Self {
        let mut functions = HashMap::new();
        let mut add = |name: &str,
                       f: TestFunction,
                       bounds: (f64, f64),
                       minimum: f64,
                       dim: Option<usize>| {
            functions.insert(
                name.to_string(),
                FunctionInfo {
                    f,
                    bounds,
                    minimum,
                    dim,
                },
            );
        };

        // Unimodal
        add("sphere", sphere, (-5.12, 5.12), 0.0, None);
        add("sum_squares", sum_squares, (-10.0, 10.0), 0.0, None);
        add("quadratic", quadratic, (-5.0, 5.0), 0.0, None);
        add("rosenbrock", rosenbrock, (-2.048, 2.048), 0.0, None);
        add("zakharov", zakharov, (-5.0, 10.0), 0.0, None);

        // Multimodal
        add("rastrigin", rastrigin, (-5.12, 5.12), 0.0, None);
        add("ackley", ackley, (-32.768, 32.768), 0.0, None);
        add("griewank", griewank, (-600.0, 600.0), 0.0, None);
        add("levy", levy, (-10.0, 10.0), 0.0, None);
        add("styblinski_tang", styblinski_tang, (-5.0, 5.0), -39.16617, None);
        add("salomon", salomon, (-100.0, 100.0), 0.0, None);

        // Two-dimensional
        add("himmelblau", himmelblau, (-5.0, 5.0), 0.0, Some(2));
        add("drop_wave", drop_wave, (-5.12, 5.12), -1.0, Some(2));
        add("three_hump_camel", three_hump_camel, (-5.0, 5.0), 0.0, Some(2));

        Self { functions }
    }

    /// Gets a benchmark by name.
    pub fn get(&self, name: &str) -> Option<&FunctionInfo> {
        self.functions.get(name)
    }

    /// Wraps a benchmark as a point-wise [`Objective`].
    ///
    /// # Errors
    ///
    /// `UnknownObjective` if the name is not registered.
    pub fn get_objective(&self, name: &str) -> Result<Objective> {
        let info = self.get(name).ok_or_else(|| CbxError::UnknownObjective {
            name: name.to_string(),
        })?;
        Ok(Objective::point(info.f))
    }

    /// Wraps a benchmark for particles of dimension `d`.
    ///
    /// # Errors
    ///
    /// `UnknownObjective` if the name is not registered, `ObjectiveDimension`
    /// if the benchmark has a fixed dimension other than `d`.
    pub fn get_objective_for_dim(&self, name: &str, d: usize) -> Result<Objective> {
        let info = self.get(name).ok_or_else(|| CbxError::UnknownObjective {
            name: name.to_string(),
        })?;
        if let Some(required) = info.dim
            && required != d
        {
            return Err(CbxError::ObjectiveDimension {
                name: name.to_string(),
                required,
                d,
            });
        }
        Ok(Objective::point(info.f))
    }

    /// Lists all available function names, sorted alphabetically.
    pub fn list_functions(&self) -> Vec<String> {
        let mut names: Vec<_> = self.functions.keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns an iterator over all (name, info) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &FunctionInfo)> {
        self.functions.iter()
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Looks a benchmark up in the default registry.
///
/// # Errors
///
/// `UnknownObjective` if the name is not registered.
pub fn get_objective(name: &str) -> Result<Objective> {
    FunctionRegistry::new().get_objective(name)
}

/// Looks a benchmark up in the default registry, checking its dimension.
///
/// # Errors
///
/// `UnknownObjective` or `ObjectiveDimension`.
pub fn get_objective_for_dim(name: &str, d: usize) -> Result<Objective> {
    FunctionRegistry::new().get_objective_for_dim(name, d)
}

/// Names of every bundled benchmark, sorted.
pub fn available_objectives() -> Vec<String> {
    FunctionRegistry::new().list_functions()
}
