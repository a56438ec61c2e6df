use lin_reg::{predict_readout, LinReg, TikhonovRegularization};
use nalgebra::{DMatrix, DVector};

use crate::{
    group_targets, standardize, unstandardize, validator::Validator, Coefficients, FitError,
    FitParams, Regularization, Result, Standardization, Standardized,
};

/// A model fit on a whole dataset
#[derive(Debug, Clone)]
pub struct FittedModel {
    /// Intercepts and slopes in the original scale of the data
    pub coefficients: Coefficients,
    /// The ridge penalty realized for each target. For fractional ridge regression
    /// this is the penalty the requested fraction translated into.
    pub penalties: DVector<f64>,
}

impl FittedModel {
    /// Predict raw predictors
    #[inline(always)]
    pub fn predict(&self, x: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        self.coefficients.predict(x)
    }
}

/// Fit standardized coefficients with one hyperparameter per target.
///
/// Fractional ridge regression is called once per distinct hyperparameter with all
/// targets sharing it, and the results are scattered back to their original columns.
/// The solvers treat every target independently, so the grouping doesn't change the
/// outcome. The non-negative solver takes the whole penalty vector at once.
fn fit_per_target(
    regularization: &Regularization,
    x: &DMatrix<f64>,
    y: &DMatrix<f64>,
    hyperparams: &[f64],
) -> Result<(DMatrix<f64>, DVector<f64>)> {
    if regularization.is_non_negative() {
        return regularization.fit(x, y, hyperparams);
    }

    let groups = group_targets(hyperparams);
    debug!("fitting {} targets in {} groups", y.ncols(), groups.len());

    let mut readout = DMatrix::zeros(x.ncols(), y.ncols());
    let mut penalties = DVector::zeros(y.ncols());
    for group in groups.iter() {
        let y_group = y.select_columns(group.columns.iter());
        let (group_readout, group_penalties) = regularization.fit(x, &y_group, &[group.value])?;
        for (i, k) in group.columns.iter().enumerate() {
            readout.set_column(*k, &group_readout.column(i));
            penalties[*k] = group_penalties[i];
        }
    }

    Ok((readout, penalties))
}

/// Predict a test set with one final hyperparameter per target, as chosen by
/// [`find_hyperparameters`](crate::find_hyperparameters).
///
/// # Arguments
/// x_train, x_test: Raw predictors
/// y_train: Raw training targets
/// y_test: Raw test targets, only used to check the shape of the output
/// hyperparams: One fraction (or penalty with `params.non_negative`) per target
///
/// # Returns
/// The test predictions in the original target scale, `n_test x n_targets`
pub fn regularized_model(
    x_train: &DMatrix<f64>,
    x_test: &DMatrix<f64>,
    y_train: &DMatrix<f64>,
    y_test: &DMatrix<f64>,
    hyperparams: &[f64],
    params: &FitParams,
) -> Result<DMatrix<f64>> {
    if y_test.shape() != (x_test.nrows(), y_train.ncols()) {
        return Err(FitError::InvalidInput(format!(
            "y_test has shape {:?}, expected {:?}",
            y_test.shape(),
            (x_test.nrows(), y_train.ncols())
        )));
    }
    Validator::validate_per_target(hyperparams, y_train.ncols(), params.non_negative)?;
    Validator::validate_data(x_train, Some(x_test), y_train)?;
    let scaling = Standardization::fit(x_train, y_train)?;
    let x_train_z = scaling.transform_predictors(x_train)?;
    let x_test_z = scaling.transform_predictors(x_test)?;
    let y_train_c = scaling.center_targets(y_train)?;

    let regularization = Regularization::from_params(params);
    let (readout, _) = fit_per_target(&regularization, &x_train_z, &y_train_c, hyperparams)?;

    let mut predictions = predict_readout(&x_test_z, &readout);
    scaling.uncenter_targets(&mut predictions);

    Ok(predictions)
}

/// Fit the whole dataset with one final hyperparameter per target.
///
/// # Returns
/// The model with unstandardized coefficients, intercepts on row 0
pub fn final_model(
    x: &DMatrix<f64>,
    y: &DMatrix<f64>,
    hyperparams: &[f64],
    params: &FitParams,
) -> Result<FittedModel> {
    Validator::validate_per_target(hyperparams, y.ncols(), params.non_negative)?;
    let Standardized {
        x_train: x_z,
        y_train: y_c,
        params: scaling,
        ..
    } = standardize(x, None, y)?;

    let regularization = Regularization::from_params(params);
    let (readout, penalties) = fit_per_target(&regularization, &x_z, &y_c, hyperparams)?;
    trace!("realized penalties: {}", penalties);

    Ok(FittedModel {
        coefficients: unstandardize(&readout, &scaling)?,
        penalties,
    })
}

/// Ordinary least squares with an intercept on the raw data, as an unregularized
/// point of comparison.
///
/// # Returns
/// The test predictions, `n_test x n_targets`
pub fn baseline_model(
    x_train: &DMatrix<f64>,
    x_test: &DMatrix<f64>,
    y_train: &DMatrix<f64>,
) -> Result<DMatrix<f64>> {
    Validator::validate_data(x_train, Some(x_test), y_train)?;

    // Note the first column being just ones
    let with_intercept = |x: &DMatrix<f64>| x.clone().insert_column(0, 1.0);
    let regressor = TikhonovRegularization {
        regularization_coeff: 0.0,
    };
    let readout =
        regressor.fit_readout(&with_intercept(x_train), y_train, &[regressor.regularization_coeff])?;

    Ok(predict_readout(&with_intercept(x_test), &readout))
}

#[cfg(test)]
mod tests {
    use nanorand::{Rng, WyRand};

    use super::*;

    fn random_matrix(rng: &mut WyRand, rows: usize, cols: usize) -> DMatrix<f64> {
        DMatrix::from_fn(rows, cols, |_, _| rng.generate::<f64>() * 4.0 - 1.0)
    }

    #[test]
    fn regularized_model_shapes() {
        if let Err(_) = pretty_env_logger::try_init() {}

        let mut rng = WyRand::new_seed(0);
        let x_train = random_matrix(&mut rng, 25, 3);
        let x_test = random_matrix(&mut rng, 5, 3);
        let y_train = random_matrix(&mut rng, 25, 4);
        let y_test = DMatrix::zeros(5, 4);

        let predictions = regularized_model(
            &x_train,
            &x_test,
            &y_train,
            &y_test,
            &[0.3, 0.9, 0.3, 1.0],
            &FitParams::default(),
        )
        .unwrap();

        assert_eq!(predictions.shape(), (5, 4));
    }

    #[test]
    fn regularized_model_checks_y_test() {
        let mut rng = WyRand::new_seed(1);
        let x_train = random_matrix(&mut rng, 10, 2);
        let y_train = random_matrix(&mut rng, 10, 2);

        let res = regularized_model(
            &x_train,
            &x_train,
            &y_train,
            &DMatrix::zeros(10, 3),
            &[0.5, 0.5],
            &FitParams::default(),
        );

        assert!(matches!(res, Err(FitError::InvalidInput(_))));
    }

    #[test]
    fn one_hyperparameter_per_target() {
        let mut rng = WyRand::new_seed(2);
        let x = random_matrix(&mut rng, 10, 2);
        let y = random_matrix(&mut rng, 10, 3);

        assert!(matches!(
            final_model(&x, &y, &[0.5, 0.5], &FitParams::default()),
            Err(FitError::InvalidInput(_))
        ));
    }

    #[test]
    fn final_model_penalties() {
        let mut rng = WyRand::new_seed(3);
        let x = random_matrix(&mut rng, 30, 3);
        let column = random_matrix(&mut rng, 30, 1);
        let y = DMatrix::from_fn(30, 3, |i, _| column[(i, 0)]);

        let model = final_model(&x, &y, &[1.0, 0.5, 0.2], &FitParams::default()).unwrap();

        assert_eq!(model.coefficients.as_matrix().shape(), (4, 3));
        assert_eq!(model.penalties[0], 0.0);
        assert!(model.penalties[1] > 0.0);
        assert!(model.penalties[2] > model.penalties[1]);

        let params = FitParams {
            non_negative: true,
            seed: Some(3),
            ..Default::default()
        };
        let model = final_model(&x, &y, &[0.0, 2.0, 5.0], &params).unwrap();
        assert_eq!(model.penalties, DVector::from_vec(vec![0.0, 2.0, 5.0]));
        assert!(model.coefficients.slopes().iter().all(|v| *v >= 0.0));
    }

    #[test]
    fn non_convergence_is_surfaced() {
        let mut rng = WyRand::new_seed(4);
        let x = random_matrix(&mut rng, 20, 3);
        let y = DMatrix::from_fn(20, 2, |i, k| x[(i, 0)] * (k + 1) as f64 + x[(i, 1)]);
        let params = FitParams {
            non_negative: true,
            seed: Some(4),
            nnls_tol: 0.0,
            max_iter: 1,
            ..Default::default()
        };

        assert_eq!(
            final_model(&x, &y, &[0.5, 0.5], &params).unwrap_err(),
            FitError::NonConvergence {
                hyperparameter: 0.5,
                target: 0,
                iterations: 1,
            }
        );
    }

    #[test]
    fn baseline_recovers_affine_relation() {
        let mut rng = WyRand::new_seed(5);
        let x_train = random_matrix(&mut rng, 20, 2);
        let x_test = random_matrix(&mut rng, 4, 2);
        let affine = |x: &DMatrix<f64>| DMatrix::from_fn(x.nrows(), 1, |i, _| 3.0 - x[(i, 0)] + 0.5 * x[(i, 1)]);

        let predictions = baseline_model(&x_train, &x_test, &affine(&x_train)).unwrap();

        assert!((predictions - affine(&x_test)).abs().max() < 1e-9);
    }
}
