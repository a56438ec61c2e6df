use nalgebra::{DMatrix, Dim, Matrix};

use super::{check_dims, LinReg, LinRegError, Result};

/// Tikhonov regularization aka ridge regression
/// It is particularly useful to mitigate the problem of multicollinearity in
/// linear regression. With a coefficient of zero this is ordinary least squares.
#[derive(Debug, Clone)]
pub struct TikhonovRegularization {
    /// Ridge parameter
    pub regularization_coeff: f64,
}

impl TikhonovRegularization {
    fn solve(&self, design: &DMatrix<f64>, targets: &DMatrix<f64>, coeff: f64) -> Result<DMatrix<f64>> {
        let reg_m: DMatrix<f64> = Matrix::from_diagonal_element_generic(
            Dim::from_usize(design.ncols()),
            Dim::from_usize(design.ncols()),
            coeff,
        );

        let p0 = design.transpose() * design;
        let p1 = (p0 + reg_m).try_inverse().ok_or(LinRegError::SingularSystem)?;
        let p2 = design.transpose() * targets;

        Ok(p1 * p2)
    }
}

impl LinReg for TikhonovRegularization {
    /// The penalties are the ridge coefficients, `regularization_coeff` is not
    /// consulted here. One per target fits each target column with its own coefficient.
    fn fit_readout(
        &self,
        design: &DMatrix<f64>,
        targets: &DMatrix<f64>,
        penalties: &[f64],
    ) -> Result<DMatrix<f64>> {
        check_dims(design, targets, penalties)?;
        if let Some(p) = penalties.iter().find(|p| !p.is_finite() || **p < 0.0) {
            return Err(LinRegError::InvalidHyperparameter(format!(
                "ridge coefficient must be finite and non-negative, got {}",
                p
            )));
        }

        if penalties.len() == 1 {
            return self.solve(design, targets, penalties[0]);
        }
        let mut readout = DMatrix::zeros(design.ncols(), targets.ncols());
        for (k, coeff) in penalties.iter().enumerate() {
            let column = self.solve(design, &targets.columns(k, 1).into_owned(), *coeff)?;
            readout.set_column(k, &column.column(0));
        }

        Ok(readout)
    }
}
