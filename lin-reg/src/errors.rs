use thiserror::Error;

/// Convenience type alias for results of the solvers
pub type Result<T> = std::result::Result<T, LinRegError>;

/// Everything that can go wrong while fitting a readout
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LinRegError {
    /// The shapes of design, targets or penalties don't line up
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// A fraction or penalty outside of its admissible range
    #[error("Invalid hyperparameter: {0}")]
    InvalidHyperparameter(String),

    /// The iterative solver ran out of steps before reaching its tolerance
    #[error("No convergence for target {target} with penalty {penalty} after {iterations} iterations")]
    NonConvergence {
        /// The penalty being fit
        penalty: f64,
        /// Column index of the target that did not converge
        target: usize,
        /// Number of steps spent
        iterations: usize,
    },

    /// The singular value decomposition of the design did not converge
    #[error("Singular value decomposition of the design matrix failed")]
    SvdFailed,

    /// The normal equations could not be inverted
    #[error("The regularized normal equations are singular")]
    SingularSystem,
}
