use lin_reg::predict_readout;
use nalgebra::DMatrix;

use crate::{validator::Validator, FitParams, Regularization, Result, Standardization};

/// Test set predictions for every candidate hyperparameter.
///
/// Conceptually a tensor of shape `(n_test, n_candidates, n_targets)`, stored as one
/// `n_test x n_targets` matrix per candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepPredictions {
    candidates: Vec<DMatrix<f64>>,
}

impl SweepPredictions {
    /// `(n_test, n_candidates, n_targets)`
    pub fn shape(&self) -> (usize, usize, usize) {
        match self.candidates.first() {
            Some(m) => (m.nrows(), self.candidates.len(), m.ncols()),
            None => (0, 0, 0),
        }
    }

    /// Prediction of `sample` for `target` under hyperparameter `candidate`
    #[inline(always)]
    pub fn get(&self, sample: usize, candidate: usize, target: usize) -> f64 {
        self.candidates[candidate][(sample, target)]
    }

    /// All predictions made with one candidate, `n_test x n_targets`
    #[inline(always)]
    pub fn candidate(&self, candidate: usize) -> &DMatrix<f64> {
        &self.candidates[candidate]
    }

    /// All predictions for one target, `n_test x n_candidates`
    pub fn target(&self, target: usize) -> DMatrix<f64> {
        let (n_test, n_candidates, _) = self.shape();
        DMatrix::from_fn(n_test, n_candidates, |i, h| self.candidates[h][(i, target)])
    }

    /// Consume into the per-candidate matrices
    pub fn into_inner(self) -> Vec<DMatrix<f64>> {
        self.candidates
    }
}

/// Predict the test set with every candidate hyperparameter.
///
/// # Arguments
/// x_train, x_test: Raw predictors, standardized with the training parameters
/// y_train: Raw targets, one column per target
/// hyperparams: The candidate grid, fractions in (0, 1] or, with `params.non_negative`,
/// non-negative penalties
///
/// # Returns
/// Predictions in the original target scale
pub fn find_hyperparameters(
    x_train: &DMatrix<f64>,
    x_test: &DMatrix<f64>,
    y_train: &DMatrix<f64>,
    hyperparams: &[f64],
    params: &FitParams,
) -> Result<SweepPredictions> {
    Validator::validate_hyperparams(hyperparams, params.non_negative)?;
    Validator::validate_data(x_train, Some(x_test), y_train)?;
    let scaling = Standardization::fit(x_train, y_train)?;
    let x_train_z = scaling.transform_predictors(x_train)?;
    let x_test_z = scaling.transform_predictors(x_test)?;
    let y_train_c = scaling.center_targets(y_train)?;

    let regularization = Regularization::from_params(params);
    debug!(
        "sweeping {} candidates over {} targets, non-negative: {}",
        hyperparams.len(),
        y_train.ncols(),
        regularization.is_non_negative()
    );

    let candidates = regularization
        .fit_path(&x_train_z, &y_train_c, hyperparams)?
        .iter()
        .map(|readout| {
            let mut predictions = predict_readout(&x_test_z, readout);
            scaling.uncenter_targets(&mut predictions);
            predictions
        })
        .collect();

    Ok(SweepPredictions { candidates })
}
