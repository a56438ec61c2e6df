/// The parameters shared by all fitting routines
#[derive(Debug, Clone)]
pub struct FitParams {
    /// Constrain all coefficients to be non-negative. Hyperparameters are then
    /// ridge penalties instead of fractions.
    pub non_negative: bool,
    /// Seed of the caller's cross-validation run. The non-negative solver is
    /// deterministic, so results are identical with any seed or none.
    pub seed: Option<u64>,
    /// Tolerance of the penalty search of fractional ridge regression
    pub frac_tol: f64,
    /// Convergence tolerance of the non-negative solver
    pub nnls_tol: f64,
    /// Active set step budget of the non-negative solver, per target
    pub max_iter: usize,
}

impl Default for FitParams {
    fn default() -> Self {
        Self {
            non_negative: false,
            seed: None,
            frac_tol: 1e-10,
            nnls_tol: 1e-10,
            max_iter: 10_000,
        }
    }
}
