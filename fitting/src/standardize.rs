use nalgebra::{DMatrix, DVector};

use crate::{validator::Validator, FitError, Result};

/// The parameters of a standardization, always taken from training data only.
/// A fresh value is built for every fit, it is never shared between calls.
#[derive(Debug, Clone, PartialEq)]
pub struct Standardization {
    /// Column means of the training predictors
    pub x_means: DVector<f64>,
    /// Column population standard deviations of the training predictors
    pub x_scales: DVector<f64>,
    /// Column means of the training targets
    pub y_means: DVector<f64>,
}

/// Standardized training data alongside the parameters that produced it
#[derive(Debug, Clone)]
pub struct Standardized {
    /// z-scored training predictors
    pub x_train: DMatrix<f64>,
    /// Test predictors, scaled with the training parameters
    pub x_test: Option<DMatrix<f64>>,
    /// Centered training targets
    pub y_train: DMatrix<f64>,
    /// The parameters needed for the inverse transform
    pub params: Standardization,
}

impl Standardization {
    /// Learn the parameters from training predictors and targets.
    /// Uses the population standard deviation, a constant predictor column is an error.
    pub fn fit(x_train: &DMatrix<f64>, y_train: &DMatrix<f64>) -> Result<Self> {
        let n = x_train.nrows() as f64;
        let x_means = x_train.row_mean().transpose();
        let x_scales = DVector::from_iterator(
            x_train.ncols(),
            x_train
                .column_iter()
                .zip(x_means.iter())
                .map(|(col, mean)| (col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()),
        );
        // a constant column can still pick up a tiny scale from rounding in the mean
        let constant = x_train
            .column_iter()
            .zip(x_scales.iter())
            .position(|(col, s)| *s == 0.0 || !s.is_finite() || col.iter().all(|v| *v == col[0]));
        if let Some(j) = constant {
            return Err(FitError::InvalidInput(format!(
                "predictor column {} has zero variance",
                j
            )));
        }
        let y_means = y_train.row_mean().transpose();

        Ok(Self {
            x_means,
            x_scales,
            y_means,
        })
    }

    /// Number of predictors the parameters were learned from
    #[inline(always)]
    pub fn n_predictors(&self) -> usize {
        self.x_means.len()
    }

    /// Number of targets the parameters were learned from
    #[inline(always)]
    pub fn n_targets(&self) -> usize {
        self.y_means.len()
    }

    /// z-score any block of predictors with the training parameters
    pub fn transform_predictors(&self, x: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        if x.ncols() != self.n_predictors() {
            return Err(FitError::InvalidInput(format!(
                "got {} predictor columns, standardization was fit on {}",
                x.ncols(),
                self.n_predictors()
            )));
        }
        Ok(DMatrix::from_fn(x.nrows(), x.ncols(), |i, j| {
            (x[(i, j)] - self.x_means[j]) / self.x_scales[j]
        }))
    }

    /// Subtract the training target means
    pub fn center_targets(&self, y: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        if y.ncols() != self.n_targets() {
            return Err(FitError::InvalidInput(format!(
                "got {} target columns, standardization was fit on {}",
                y.ncols(),
                self.n_targets()
            )));
        }
        Ok(DMatrix::from_fn(y.nrows(), y.ncols(), |i, k| y[(i, k)] - self.y_means[k]))
    }

    /// Add the training target means back onto centered predictions
    pub fn uncenter_targets(&self, y: &mut DMatrix<f64>) {
        for (mut col, mean) in y.column_iter_mut().zip(self.y_means.iter()) {
            col.add_scalar_mut(*mean);
        }
    }
}

/// Standardize training predictors, center training targets and scale the test
/// predictors with the training parameters.
pub fn standardize(
    x_train: &DMatrix<f64>,
    x_test: Option<&DMatrix<f64>>,
    y_train: &DMatrix<f64>,
) -> Result<Standardized> {
    Validator::validate_data(x_train, x_test, y_train)?;

    let params = Standardization::fit(x_train, y_train)?;
    debug!(
        "standardized {} samples of {} predictors and {} targets",
        x_train.nrows(),
        params.n_predictors(),
        params.n_targets()
    );

    Ok(Standardized {
        x_train: params.transform_predictors(x_train)?,
        x_test: x_test.map(|x| params.transform_predictors(x)).transpose()?,
        y_train: params.center_targets(y_train)?,
        params,
    })
}
