//! Fail-fast input checks, run before any numerical work

use nalgebra::DMatrix;

use crate::{FitError, Result};

/// Validation of data and hyperparameters handed to the fitting routines
pub(crate) struct Validator;

impl Validator {
    /// Check a training block and an optional block to predict
    pub(crate) fn validate_data(
        x_train: &DMatrix<f64>,
        x_test: Option<&DMatrix<f64>>,
        y_train: &DMatrix<f64>,
    ) -> Result<()> {
        if x_train.nrows() == 0 {
            return Err(FitError::InvalidInput("no training samples".to_string()));
        }
        if x_train.ncols() == 0 {
            return Err(FitError::InvalidInput("no predictors".to_string()));
        }
        if y_train.ncols() == 0 {
            return Err(FitError::InvalidInput("no targets".to_string()));
        }
        if x_train.nrows() != y_train.nrows() {
            return Err(FitError::InvalidInput(format!(
                "x_train has {} rows but y_train has {}",
                x_train.nrows(),
                y_train.nrows()
            )));
        }
        if let Some(x_test) = x_test {
            if x_test.nrows() == 0 {
                return Err(FitError::InvalidInput("no test samples".to_string()));
            }
            if x_test.ncols() != x_train.ncols() {
                return Err(FitError::InvalidInput(format!(
                    "x_test has {} predictors but x_train has {}",
                    x_test.ncols(),
                    x_train.ncols()
                )));
            }
            Self::validate_finite(x_test, "x_test")?;
        }
        Self::validate_finite(x_train, "x_train")?;
        Self::validate_finite(y_train, "y_train")?;

        Ok(())
    }

    fn validate_finite(m: &DMatrix<f64>, name: &str) -> Result<()> {
        match m.iter().position(|v| !v.is_finite()) {
            Some(pos) => Err(FitError::InvalidInput(format!(
                "{}[({}, {})] = {} is not finite",
                name,
                pos % m.nrows(),
                pos / m.nrows(),
                m[pos]
            ))),
            None => Ok(()),
        }
    }

    /// Check hyperparameters; fractions must lie in (0, 1], penalties must be
    /// finite and non-negative
    pub(crate) fn validate_hyperparams(hyperparams: &[f64], non_negative: bool) -> Result<()> {
        if hyperparams.is_empty() {
            return Err(FitError::InvalidInput("no hyperparameters given".to_string()));
        }
        for h in hyperparams {
            let valid = if non_negative {
                h.is_finite() && *h >= 0.0
            } else {
                *h > 0.0 && *h <= 1.0
            };
            if !valid {
                return Err(FitError::InvalidInput(format!(
                    "hyperparameter {} out of range for {} ridge regression",
                    h,
                    if non_negative { "non-negative" } else { "fractional" }
                )));
            }
        }

        Ok(())
    }

    /// Check that there is exactly one hyperparameter per target
    pub(crate) fn validate_per_target(hyperparams: &[f64], n_targets: usize, non_negative: bool) -> Result<()> {
        if hyperparams.len() != n_targets {
            return Err(FitError::InvalidInput(format!(
                "{} hyperparameters given for {} targets",
                hyperparams.len(),
                n_targets
            )));
        }
        Self::validate_hyperparams(hyperparams, non_negative)
    }
}
