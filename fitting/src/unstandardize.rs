use nalgebra::{DMatrix, DVector};

use crate::{FitError, Result, Standardization};

/// Regression coefficients in the original scale of the data.
///
/// Stored as one matrix with `n_predictors + 1` rows and one column per target,
/// where row 0 holds the intercepts and the remaining rows the slopes.
#[derive(Debug, Clone, PartialEq)]
pub struct Coefficients {
    matrix: DMatrix<f64>,
}

impl Coefficients {
    /// Intercepts on row 0, slopes below
    #[inline(always)]
    pub fn as_matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    /// Consume into the underlying matrix
    pub fn into_matrix(self) -> DMatrix<f64> {
        self.matrix
    }

    /// Number of predictors, excluding the intercept
    #[inline(always)]
    pub fn n_predictors(&self) -> usize {
        self.matrix.nrows() - 1
    }

    /// Number of targets
    #[inline(always)]
    pub fn n_targets(&self) -> usize {
        self.matrix.ncols()
    }

    /// One intercept per target
    pub fn intercepts(&self) -> DVector<f64> {
        self.matrix.row(0).transpose()
    }

    /// The slopes, one row per predictor and one column per target
    pub fn slopes(&self) -> DMatrix<f64> {
        self.matrix.rows(1, self.n_predictors()).into_owned()
    }

    /// Apply the affine model to unstandardized predictors
    pub fn predict(&self, x: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        if x.ncols() != self.n_predictors() {
            return Err(FitError::InvalidInput(format!(
                "model has {} predictors but x has {} columns",
                self.n_predictors(),
                x.ncols()
            )));
        }

        let slopes = self.matrix.rows(1, self.n_predictors());
        let mut predictions = DMatrix::zeros(x.nrows(), self.n_targets());
        for k in 0..self.n_targets() {
            let mut col = x * slopes.column(k);
            col.add_scalar_mut(self.matrix[(0, k)]);
            predictions.set_column(k, &col);
        }

        Ok(predictions)
    }
}

/// Map standardized coefficients back into the original scale.
///
/// The slope of predictor `j` for target `k` is `beta[j, k] / scale[j]` and the
/// intercept is `y_mean[k] - sum_j slope[j, k] * x_mean[j]`.
pub fn unstandardize(beta: &DMatrix<f64>, params: &Standardization) -> Result<Coefficients> {
    if beta.nrows() != params.n_predictors() || beta.ncols() != params.n_targets() {
        return Err(FitError::InvalidInput(format!(
            "coefficients of shape {:?} don't match {} predictors and {} targets",
            beta.shape(),
            params.n_predictors(),
            params.n_targets()
        )));
    }
    if let Some(j) = params.x_scales.iter().position(|s| !s.is_finite() || *s <= f64::EPSILON) {
        return Err(FitError::NumericalDegeneracy(format!(
            "scale {} of predictor {} is too small to unstandardize",
            params.x_scales[j], j
        )));
    }

    let p = params.n_predictors();
    let mut matrix = DMatrix::zeros(p + 1, params.n_targets());
    for k in 0..params.n_targets() {
        let mut intercept = params.y_means[k];
        for j in 0..p {
            let slope = beta[(j, k)] / params.x_scales[j];
            matrix[(j + 1, k)] = slope;
            intercept -= slope * params.x_means[j];
        }
        matrix[(0, k)] = intercept;
    }

    Ok(Coefficients { matrix })
}
