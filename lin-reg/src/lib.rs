//! Linear regression solvers used to fit readouts from standardized data

#![deny(unused_imports)]
#![warn(missing_docs)]

#[macro_use]
extern crate log;

use nalgebra::DMatrix;

mod errors;
mod fractional_ridge;
mod non_negative_ridge;
mod tikhonov_regularization;

pub use errors::{LinRegError, Result};
pub use fractional_ridge::{FracRidgePath, FractionalRidge};
pub use non_negative_ridge::NonNegativeRidge;
pub use tikhonov_regularization::TikhonovRegularization;

/// Generic way of performing linear regression and fitting the readout matrix
pub trait LinReg: Clone {
    /// Fit a readout matrix, mapping inputs to targets
    ///
    /// # Parameters
    /// design: Input data with N rows, one column per predictor
    /// targets: Target data with N rows, one column per target
    /// penalties: The regularization hyperparameter, either a single value used
    /// for every target or exactly one value per target column
    ///
    /// # Returns
    /// The coefficients with one row per design column and one column per target
    fn fit_readout(
        &self,
        design: &DMatrix<f64>,
        targets: &DMatrix<f64>,
        penalties: &[f64],
    ) -> Result<DMatrix<f64>>;
}

/// Apply a fitted readout to `design`.
/// Each target column is computed on its own so the result for a column does not
/// depend on how many other columns are predicted alongside it.
pub fn predict_readout(design: &DMatrix<f64>, readout: &DMatrix<f64>) -> DMatrix<f64> {
    let mut predictions = DMatrix::zeros(design.nrows(), readout.ncols());
    for k in 0..readout.ncols() {
        predictions.set_column(k, &(design * readout.column(k)));
    }
    predictions
}

/// Resolve the penalty belonging to target `k`, broadcasting a single value
pub(crate) fn penalty_for(penalties: &[f64], k: usize) -> f64 {
    if penalties.len() == 1 {
        penalties[0]
    } else {
        penalties[k]
    }
}

/// Check the shapes shared by every solver
pub(crate) fn check_dims(
    design: &DMatrix<f64>,
    targets: &DMatrix<f64>,
    penalties: &[f64],
) -> Result<()> {
    if design.nrows() != targets.nrows() {
        return Err(LinRegError::DimensionMismatch(format!(
            "design has {} rows but targets have {}",
            design.nrows(),
            targets.nrows()
        )));
    }
    if penalties.is_empty() {
        return Err(LinRegError::InvalidHyperparameter("no penalty given".to_string()));
    }
    if penalties.len() != 1 && penalties.len() != targets.ncols() {
        return Err(LinRegError::DimensionMismatch(format!(
            "{} penalties given for {} targets",
            penalties.len(),
            targets.ncols()
        )));
    }
    Ok(())
}
