use lin_reg::{FractionalRidge, LinReg, NonNegativeRidge};
use nalgebra::{DMatrix, DVector};

use crate::{FitParams, Result};

/// The two ways of fitting standardized data. Chosen once per call, both share
/// the same standardization and unstandardization.
#[derive(Debug, Clone)]
pub enum Regularization {
    /// Ridge regression parameterized by the retained fraction of the OLS norm
    FractionalRidge(FractionalRidge),
    /// Ridge regression with non-negative coefficients, parameterized by the penalty
    NonNegativeRidge(NonNegativeRidge),
}

impl Regularization {
    /// Select the solver described by `params`
    pub fn from_params(params: &FitParams) -> Self {
        if params.non_negative {
            Regularization::NonNegativeRidge(NonNegativeRidge {
                tol: params.nnls_tol,
                max_iter: params.max_iter,
            })
        } else {
            Regularization::FractionalRidge(FractionalRidge {
                tol: params.frac_tol,
            })
        }
    }

    /// Whether hyperparameters are penalties with non-negative coefficients
    #[inline(always)]
    pub fn is_non_negative(&self) -> bool {
        matches!(self, Regularization::NonNegativeRidge(_))
    }

    /// Fit standardized coefficients with a single hyperparameter for all targets
    /// or one per target.
    ///
    /// # Returns
    /// The coefficients (predictors x targets) and the ridge penalty realized for
    /// each target
    pub fn fit(
        &self,
        x: &DMatrix<f64>,
        y: &DMatrix<f64>,
        hyperparams: &[f64],
    ) -> Result<(DMatrix<f64>, DVector<f64>)> {
        match self {
            Regularization::FractionalRidge(solver) => {
                Ok(solver.fit_with_penalties(x, y, hyperparams)?)
            }
            Regularization::NonNegativeRidge(solver) => {
                let readout = solver.fit_readout(x, y, hyperparams)?;
                let penalties = match hyperparams {
                    [penalty] => DVector::from_element(y.ncols(), *penalty),
                    _ => DVector::from_column_slice(hyperparams),
                };
                Ok((readout, penalties))
            }
        }
    }

    /// Fit standardized coefficients for every candidate hyperparameter, each one
    /// applied to all targets
    pub fn fit_path(
        &self,
        x: &DMatrix<f64>,
        y: &DMatrix<f64>,
        candidates: &[f64],
    ) -> Result<Vec<DMatrix<f64>>> {
        match self {
            // one decomposition serves the whole grid
            Regularization::FractionalRidge(solver) => Ok(solver.fit_path(x, y, candidates)?.coefficients),
            Regularization::NonNegativeRidge(solver) => candidates
                .iter()
                .map(|penalty| -> Result<DMatrix<f64>> {
                    trace!("non-negative sweep with penalty {}", penalty);
                    Ok(solver.fit_readout(x, y, std::slice::from_ref(penalty))?)
                })
                .collect(),
        }
    }
}
