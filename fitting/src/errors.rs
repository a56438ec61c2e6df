use lin_reg::LinRegError;
use thiserror::Error;

/// Convenience type alias for results of the fitting routines
pub type Result<T> = std::result::Result<T, FitError>;

/// Errors raised while fitting. None of them are recovered from inside this crate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    /// Shapes, hyperparameters or values that can't be fit. Always raised before
    /// any numerical work happens.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The non-negative solver did not reach its tolerance
    #[error(
        "Non-negative ridge did not converge for target {target} with hyperparameter {hyperparameter} within {iterations} iterations"
    )]
    NonConvergence {
        /// The penalty that was being fit
        hyperparameter: f64,
        /// Column index of the offending target
        target: usize,
        /// Iteration budget that was exhausted
        iterations: usize,
    },

    /// A numerically degenerate system, such as a near-zero scale when mapping
    /// coefficients back into the original space
    #[error("Numerical degeneracy: {0}")]
    NumericalDegeneracy(String),
}

impl From<LinRegError> for FitError {
    fn from(err: LinRegError) -> Self {
        match err {
            LinRegError::DimensionMismatch(msg) | LinRegError::InvalidHyperparameter(msg) => {
                FitError::InvalidInput(msg)
            }
            LinRegError::NonConvergence {
                penalty,
                target,
                iterations,
            } => FitError::NonConvergence {
                hyperparameter: penalty,
                target,
                iterations,
            },
            LinRegError::SvdFailed | LinRegError::SingularSystem => {
                FitError::NumericalDegeneracy(err.to_string())
            }
        }
    }
}
