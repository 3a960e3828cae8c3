//! Error types for the consensus-based optimizers.
//!
//! Structural misconfiguration and unknown names are reported eagerly through
//! [`CbxError`]. Numerical blow-up during an update is not an error: it is
//! healed by the post-processing pipeline.

use thiserror::Error;

/// Errors that can occur while building or running a particle dynamic.
#[derive(Debug, Error)]
pub enum CbxError {
    /// No initial positions were given and the dimension `d` is unknown.
    #[error("the dimension d must be specified when no initial particle system is given")]
    MissingDimension,

    /// Initial positions have an unsupported rank.
    #[error("initial positions must have rank 1, 2 or 3, got rank {rank}")]
    InvalidInitialShape {
        /// Rank of the supplied array
        rank: usize,
    },

    /// Lower bound exceeds the upper bound for uniform initialization.
    #[error("invalid bounds: x_min ({x_min}) > x_max ({x_max})")]
    InvalidBounds {
        /// Lower sampling bound
        x_min: f64,
        /// Upper sampling bound
        x_max: f64,
    },

    /// A hyperparameter is outside of its admissible range.
    #[error("invalid parameter {name} = {value}: {reason}")]
    InvalidParameter {
        /// Name of the parameter
        name: &'static str,
        /// Offending value
        value: f64,
        /// Human readable constraint
        reason: &'static str,
    },

    /// The ensemble would contain no particles.
    #[error("ensemble must be non-empty, got M = {m}, N = {n}, d = {d}")]
    EmptyEnsemble {
        /// Number of ensembles
        m: usize,
        /// Particles per ensemble
        n: usize,
        /// Dimension
        d: usize,
    },

    /// Mini-batch size is zero or larger than the number of particles.
    #[error("batch size {size} must lie in [1, {n}]")]
    InvalidBatchSize {
        /// Requested batch size
        size: usize,
        /// Particles per ensemble
        n: usize,
    },

    /// The dynamic does not support mini-batching.
    #[error("{dynamic} does not support mini-batching")]
    BatchingUnsupported {
        /// Name of the dynamic
        dynamic: &'static str,
    },

    /// The objective arity does not match the configured `f_dim`.
    #[error("objective evaluates {objective} inputs but f_dim is {configured}")]
    ObjectiveDimMismatch {
        /// Arity of the objective
        objective: String,
        /// Configured arity
        configured: String,
    },

    /// A benchmark defined for a fixed dimension was asked for another one.
    #[error("objective {name} is defined for d = {required}, got d = {d}")]
    ObjectiveDimension {
        /// Benchmark name
        name: String,
        /// Dimension the benchmark requires
        required: usize,
        /// Configured dimension
        d: usize,
    },

    /// Unknown dynamic name in a dispatch lookup.
    #[error("unknown dynamic: {name}")]
    UnknownVariant {
        /// Requested name
        name: String,
    },

    /// Unknown objective name in a registry lookup.
    #[error("unknown objective function: {name}")]
    UnknownObjective {
        /// Requested name
        name: String,
    },

    /// Unknown noise, correction, kernel or scheduler name.
    #[error("unknown {kind}: {name}")]
    UnknownStrategy {
        /// Kind of strategy ("noise", "correction", ...)
        kind: &'static str,
        /// Requested name
        name: String,
    },

    /// The objective returned NaN.
    #[error("objective returned NaN for ensemble {ensemble}, particle {particle}")]
    NonFiniteObjective {
        /// Ensemble index
        ensemble: usize,
        /// Particle index within the evaluated batch
        particle: usize,
    },

    /// The objective returned an array with the wrong shape.
    #[error("objective returned shape {got:?}, expected {expected:?}")]
    ObjectiveShape {
        /// Expected output shape
        expected: Vec<usize>,
        /// Returned output shape
        got: Vec<usize>,
    },
}

/// A specialized `Result` type for consensus-based optimization.
pub type Result<T> = std::result::Result<T, CbxError>;

impl CbxError {
    /// Returns `true` if the error stems from a structural misconfiguration.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            CbxError::MissingDimension
                | CbxError::InvalidInitialShape { .. }
                | CbxError::InvalidBounds { .. }
                | CbxError::InvalidParameter { .. }
                | CbxError::EmptyEnsemble { .. }
                | CbxError::InvalidBatchSize { .. }
                | CbxError::BatchingUnsupported { .. }
                | CbxError::ObjectiveDimMismatch { .. }
                | CbxError::ObjectiveDimension { .. }
        )
    }

    /// Returns `true` if a name lookup failed.
    pub fn is_lookup_error(&self) -> bool {
        matches!(
            self,
            CbxError::UnknownVariant { .. }
                | CbxError::UnknownObjective { .. }
                | CbxError::UnknownStrategy { .. }
        )
    }

    /// Returns `true` if the objective misbehaved.
    pub fn is_objective_error(&self) -> bool {
        matches!(
            self,
            CbxError::NonFiniteObjective { .. } | CbxError::ObjectiveShape { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CbxError::InvalidBatchSize { size: 30, n: 20 };
        assert_eq!(err.to_string(), "batch size 30 must lie in [1, 20]");

        let err = CbxError::UnknownVariant {
            name: "cbo2".to_string(),
        };
        assert_eq!(err.to_string(), "unknown dynamic: cbo2");
    }

    #[test]
    fn test_is_config_error() {
        assert!(CbxError::MissingDimension.is_config_error());
        assert!(CbxError::InvalidInitialShape { rank: 4 }.is_config_error());
        assert!(
            !CbxError::UnknownObjective {
                name: "foo".into()
            }
            .is_config_error()
        );
    }

    #[test]
    fn test_objective_dimension_display() {
        let err = CbxError::ObjectiveDimension {
            name: "himmelblau".into(),
            required: 2,
            d: 1,
        };
        assert_eq!(
            err.to_string(),
            "objective himmelblau is defined for d = 2, got d = 1"
        );
        assert!(err.is_config_error());
    }

    #[test]
    fn test_is_lookup_error() {
        let err = CbxError::UnknownStrategy {
            kind: "noise",
            name: "pink".into(),
        };
        assert!(err.is_lookup_error());
        assert!(!CbxError::MissingDimension.is_lookup_error());
    }

    #[test]
    fn test_is_objective_error() {
        let err = CbxError::NonFiniteObjective {
            ensemble: 0,
            particle: 3,
        };
        assert!(err.is_objective_error());
        assert!(
            CbxError::ObjectiveShape {
                expected: vec![1, 20],
                got: vec![20],
            }
            .is_objective_error()
        );
        assert!(!err.is_config_error());
    }
}
