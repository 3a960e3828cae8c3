//! Consensus-based optimization library.
//!
//! This crate provides a family of consensus-based particle methods for
//! global optimization of continuous objectives: canonical CBO, CBO with
//! personal-best memory, a particle swarm variant, consensus-based sampling,
//! polarized CBO and CBO with exponential noise. All of them share one
//! iteration engine:
//!
//! consensus -> drift -> noise -> correction -> update -> post-process
//!
//! followed by a scheduler adapting the exploration parameters.
//!
//! # Features
//!
//! - `M` independent ensembles of `N` particles evolved in lock-step
//! - Isotropic, anisotropic, covariance and exponential noise models
//! - Heaviside and clipping drift corrections
//! - Geometric and effective-sample-size schedulers
//! - Mini-batching, history recording and parallel objective evaluation
//!
//! # Example
//!
//! ```rust
//! use math_cbx::{DynamicConfigBuilder, DynamicKind, Multiply, build_dynamic, get_objective};
//!
//! let config = DynamicConfigBuilder::new()
//!     .d(2)
//!     .n(40)
//!     .bounds(-3.0, 3.0)
//!     .dt(0.1)
//!     .sigma(0.5)
//!     .max_it(200)
//!     .seed(42)
//!     .build()
//!     .expect("invalid config");
//! let f = get_objective("sphere").expect("registered objective");
//! let mut dynamic = build_dynamic(DynamicKind::Cbo, f, config).expect("valid dynamic");
//! let best = dynamic.optimize(&mut Multiply::default(), None).expect("run");
//! assert_eq!(best.dim(), (1, 2));
//! assert!(dynamic.report().best_f[0] < 1e-2);
//! ```
#![doc = include_str!("../README.md")]
#![doc = include_str!("../REFERENCES.md")]
#![warn(missing_docs)]

pub mod error;
pub use error::{CbxError, Result};

mod argmin;
/// Mini-batch selection of the active particles.
pub mod batch;
/// Utilities for selecting distinct random indices.
mod distinct_indices;
/// Latin Hypercube Sampling initialization.
mod init_latin_hypercube;
/// Uniform initialization and rank normalisation of user positions.
mod init_uniform;

/// Dynamic configuration and its builder.
pub mod config;
/// Weighted consensus points.
pub mod consensus;
/// Drift corrections.
pub mod correction;
/// Weighted covariance and its square root.
pub mod covariance;
/// Kernels localising the polar consensus.
pub mod kernel;
/// Noise models.
pub mod noise;
/// Objective functions seen by the dynamics.
pub mod objective;
/// Parallel objective evaluation support.
pub mod parallel_eval;
/// Post-processing of the particle positions after every step.
pub mod post_process;
/// Parameter schedulers.
pub mod scheduler;

/// Shared iteration engine and the [`Dynamic`] trait.
pub mod dynamic;
/// Per-iteration history recording.
pub mod history;

/// Canonical consensus-based optimization.
pub mod cbo;
/// CBO with personal-best memory.
pub mod cbo_memory;
/// Consensus-based sampling.
pub mod cbs;
/// Polarized CBO.
pub mod polar_cbo;
/// Particle swarm optimization.
pub mod pso;
/// CBO with exponential noise.
pub mod qcbo;

/// Construction of dynamics by name.
pub mod dispatch;
/// Registry of benchmark objectives.
pub mod function_registry;

/// Cross-dynamic tests of the engine.
#[cfg(test)]
mod dynamics_tests;

pub use batch::BatchConfig;
pub use cbo::Cbo;
pub use cbo_memory::CboMemory;
pub use cbs::Cbs;
pub use config::{CbsMode, DynamicConfig, DynamicConfigBuilder, Init};
pub use consensus::{Consensus, compute_consensus, compute_polar_consensus, consensus_weights};
pub use correction::{Correction, CorrectionKind};
pub use dispatch::{DynamicKind, available_dynamics, build_dynamic, build_dynamic_by_name};
pub use dynamic::{
    CallbackAction, CbxDynamic, Dynamic, Intermediate, OptimizationReport, TerminationReason,
};
pub use function_registry::{
    FunctionRegistry, available_objectives, get_objective, get_objective_for_dim,
};
pub use history::{History, IterationRecord};
pub use kernel::{Kernel, KernelFactorMode, KernelKind};
pub use noise::{Noise, NoiseKind};
pub use objective::{FDim, Objective};
pub use parallel_eval::ParallelConfig;
pub use polar_cbo::PolarCbo;
pub use post_process::{PostProcess, PostProcessConfig};
pub use pso::Pso;
pub use qcbo::Qcbo;
pub use scheduler::{
    EffectiveSampleSize, Multiply, NoScheduler, Scheduler, SchedulerList, SchedulerParam,
};
