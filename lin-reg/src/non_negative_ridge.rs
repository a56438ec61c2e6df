use nalgebra::{DMatrix, DVector, SVD};

use super::{check_dims, penalty_for, LinReg, LinRegError, Result};

/// Ridge regression where all coefficients are constrained to be non-negative.
///
/// Minimizes `||y - X b||^2 + penalty * ||b||^2` subject to `b >= 0` for every
/// target column. The ridge term is folded into the augmented least squares
/// problem `[X; sqrt(penalty) I] b = [y; 0]`, which is then solved with the
/// Lawson-Hanson active set method. It terminates after finitely many steps and
/// is deterministic, so identical inputs always give identical coefficients.
#[derive(Debug, Clone)]
pub struct NonNegativeRidge {
    /// Optimality tolerance, relative to the largest entry of `X^T y`
    pub tol: f64,
    /// Maximum number of active set steps per target
    pub max_iter: usize,
}

impl Default for NonNegativeRidge {
    fn default() -> Self {
        Self {
            tol: 1e-10,
            max_iter: 10_000,
        }
    }
}

/// Stack `sqrt(penalty) I` below the design
fn augment(design: &DMatrix<f64>, penalty: f64) -> DMatrix<f64> {
    let (n, p) = design.shape();
    let mut augmented = DMatrix::zeros(n + p, p);
    augmented.rows_mut(0, n).copy_from(design);
    let root = penalty.sqrt();
    for j in 0..p {
        augmented[(n + j, j)] = root;
    }
    augmented
}

/// Unconstrained least squares on the passive columns only, zero everywhere else.
/// Goes through the SVD so a rank deficient passive set yields the minimum norm
/// solution instead of an error.
fn solve_passive(a: &DMatrix<f64>, c: &DVector<f64>, passive: &[bool]) -> Result<DVector<f64>> {
    let indices: Vec<usize> = (0..passive.len()).filter(|j| passive[*j]).collect();
    let mut solution = DVector::zeros(passive.len());
    if indices.is_empty() {
        return Ok(solution);
    }

    let a_p = a.select_columns(indices.iter());
    let svd = SVD::try_new(a_p, true, true, f64::EPSILON, 0).ok_or(LinRegError::SvdFailed)?;
    let s_max = svd.singular_values.iter().cloned().fold(0.0, f64::max);
    let cutoff = s_max * (a.nrows().max(indices.len()) as f64) * f64::EPSILON;
    let b_p = svd.solve(c, cutoff).map_err(|_| LinRegError::SvdFailed)?;

    for (i, j) in indices.iter().enumerate() {
        solution[*j] = b_p[i];
    }
    Ok(solution)
}

impl NonNegativeRidge {
    /// Take one more active set step, failing once the budget is used up
    fn count_step(&self, steps: &mut usize, k: usize, penalty: f64) -> Result<()> {
        if *steps == self.max_iter {
            return Err(LinRegError::NonConvergence {
                penalty,
                target: k,
                iterations: self.max_iter,
            });
        }
        *steps += 1;
        Ok(())
    }

    /// Fit a single target column
    fn fit_target(
        &self,
        design: &DMatrix<f64>,
        targets: &DMatrix<f64>,
        k: usize,
        penalty: f64,
    ) -> Result<DVector<f64>> {
        let p = design.ncols();
        let a = augment(design, penalty);
        let mut c = DVector::zeros(a.nrows());
        c.rows_mut(0, design.nrows()).copy_from(&targets.column(k));

        let threshold = self.tol * a.tr_mul(&c).amax();
        let mut coefs = DVector::<f64>::zeros(p);
        let mut passive = vec![false; p];
        let mut steps = 0;

        loop {
            // negative gradient of the squared residual
            let mut w = a.tr_mul(&(&c - &a * &coefs));

            // move the most promising variable into the passive set
            let mut solution = loop {
                let entering = (0..p)
                    .filter(|j| !passive[*j] && w[*j] > threshold)
                    .max_by(|i, j| w[*i].total_cmp(&w[*j]));
                let j = match entering {
                    Some(j) => j,
                    None => {
                        trace!(
                            "target {} with penalty {} solved in {} active set steps",
                            k,
                            penalty,
                            steps
                        );
                        return Ok(coefs);
                    }
                };
                self.count_step(&mut steps, k, penalty)?;

                passive[j] = true;
                let solution = solve_passive(&a, &c, &passive)?;
                if solution[j] > 0.0 {
                    break solution;
                }
                // the gradient was rounding noise, this variable can't move off zero
                passive[j] = false;
                w[j] = 0.0;
            };

            // walk back towards the feasible region until the passive solution is positive
            loop {
                let blocking = (0..p)
                    .filter(|j| passive[*j] && solution[*j] <= 0.0)
                    .map(|j| {
                        let gap = coefs[j] - solution[j];
                        (j, if gap > 0.0 { coefs[j] / gap } else { 0.0 })
                    })
                    .min_by(|l, r| l.1.total_cmp(&r.1));
                let (blocking, alpha) = match blocking {
                    Some(b) => b,
                    None => break,
                };
                self.count_step(&mut steps, k, penalty)?;

                let direction = &solution - &coefs;
                coefs.axpy(alpha, &direction, 1.0);
                coefs[blocking] = 0.0;
                for j in 0..p {
                    if passive[j] && coefs[j] <= 0.0 {
                        passive[j] = false;
                        coefs[j] = 0.0;
                    }
                }
                solution = solve_passive(&a, &c, &passive)?;
            }
            coefs = solution;
        }
    }
}

impl LinReg for NonNegativeRidge {
    /// Here the penalties are non-negative ridge weights
    fn fit_readout(
        &self,
        design: &DMatrix<f64>,
        targets: &DMatrix<f64>,
        penalties: &[f64],
    ) -> Result<DMatrix<f64>> {
        check_dims(design, targets, penalties)?;
        if let Some(p) = penalties.iter().find(|p| !p.is_finite() || **p < 0.0) {
            return Err(LinRegError::InvalidHyperparameter(format!(
                "penalties must be finite and non-negative, got {}",
                p
            )));
        }

        let mut readout = DMatrix::zeros(design.ncols(), targets.ncols());
        for k in 0..targets.ncols() {
            let coefs = self.fit_target(design, targets, k, penalty_for(penalties, k))?;
            readout.set_column(k, &coefs);
        }

        Ok(readout)
    }
}

#[cfg(test)]
mod tests {
    use nanorand::{Rng, WyRand};

    use super::*;

    fn random_matrix(rng: &mut WyRand, rows: usize, cols: usize) -> DMatrix<f64> {
        DMatrix::from_fn(rows, cols, |_, _| rng.generate::<f64>() * 2.0 - 1.0)
    }

    #[test]
    fn recovers_positive_weights() {
        if let Err(_) = pretty_env_logger::try_init() {}

        let mut rng = WyRand::new_seed(0);
        let design = random_matrix(&mut rng, 50, 3);
        let truth = DMatrix::from_column_slice(3, 1, &[0.5, 2.0, 1.0]);
        let targets = &design * &truth;

        let readout = NonNegativeRidge::default().fit_readout(&design, &targets, &[0.0]).unwrap();
        info!("readout: {}", readout);

        assert!((readout - truth).abs().max() < 1e-9);
    }

    #[test]
    fn nearly_collinear_predictors() {
        if let Err(_) = pretty_env_logger::try_init() {}

        // three predictors sharing one signal, pairwise correlation above 0.999
        let mut rng = WyRand::new_seed(11);
        let base = random_matrix(&mut rng, 100, 1);
        let design = DMatrix::from_fn(100, 3, |i, _| base[(i, 0)] + 0.01 * (rng.generate::<f64>() - 0.5));
        let truth = DMatrix::from_column_slice(3, 1, &[1.0, 2.0, 0.5]);
        let targets = &design * &truth;

        let readout = NonNegativeRidge::default().fit_readout(&design, &targets, &[0.0]).unwrap();
        info!("readout: {}", readout);

        assert!((readout - truth).abs().max() < 1e-6);
    }

    #[test]
    fn clips_negative_weights() {
        if let Err(_) = pretty_env_logger::try_init() {}

        let mut rng = WyRand::new_seed(1);
        let design = random_matrix(&mut rng, 40, 3);
        let truth = DMatrix::from_column_slice(3, 1, &[1.0, -2.0, 0.5]);
        let targets = &design * &truth;

        let readout = NonNegativeRidge::default().fit_readout(&design, &targets, &[0.1]).unwrap();

        assert!(readout.iter().all(|v| *v >= 0.0));
        assert_eq!(readout[(1, 0)], 0.0);
        assert!(readout[(0, 0)] > 0.0);
    }

    #[test]
    fn matches_ridge_when_unconstrained() {
        let mut rng = WyRand::new_seed(5);
        let design = random_matrix(&mut rng, 30, 3);
        let truth = DMatrix::from_column_slice(3, 1, &[1.0, 1.5, 2.0]);
        let targets = &design * &truth;
        let penalty = 2.0;

        let readout = NonNegativeRidge::default().fit_readout(&design, &targets, &[penalty]).unwrap();
        let ridge = (design.transpose() * &design + DMatrix::identity(3, 3) * penalty)
            .try_inverse()
            .unwrap()
            * design.transpose()
            * &targets;

        assert!(ridge.iter().all(|v| *v > 0.0));
        assert!((readout - ridge).abs().max() < 1e-9);
    }

    #[test]
    fn penalty_per_target() {
        let mut rng = WyRand::new_seed(2);
        let design = random_matrix(&mut rng, 30, 2);
        let truth = DMatrix::from_column_slice(2, 1, &[1.0, 1.0]);
        let column = &design * &truth;
        let targets = DMatrix::from_fn(30, 2, |i, _| column[(i, 0)]);

        let solver = NonNegativeRidge::default();
        let mixed = solver.fit_readout(&design, &targets, &[0.0, 10.0]).unwrap();
        let strong = solver.fit_readout(&design, &targets.columns(1, 1).into_owned(), &[10.0]).unwrap();

        assert_eq!(mixed.column(1), strong.column(0));
        assert!(mixed.column(1).norm() < mixed.column(0).norm());
    }

    #[test]
    fn deterministic() {
        let mut rng = WyRand::new_seed(3);
        let design = random_matrix(&mut rng, 20, 4);
        let targets = random_matrix(&mut rng, 20, 2);
        let solver = NonNegativeRidge::default();

        let a = solver.fit_readout(&design, &targets, &[0.5]).unwrap();
        let b = solver.fit_readout(&design, &targets, &[0.5]).unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn zero_target() {
        let mut rng = WyRand::new_seed(6);
        let design = random_matrix(&mut rng, 10, 3);
        let targets = DMatrix::zeros(10, 1);

        let readout = NonNegativeRidge::default().fit_readout(&design, &targets, &[1.0]).unwrap();

        assert_eq!(readout, DMatrix::zeros(3, 1));
    }

    #[test]
    fn reports_non_convergence() {
        let mut rng = WyRand::new_seed(4);
        let design = random_matrix(&mut rng, 20, 4);
        // two positive weights need at least two active set steps
        let targets = DMatrix::from_fn(20, 1, |i, _| 3.0 * design[(i, 0)] + 0.5 * design[(i, 1)]);
        let solver = NonNegativeRidge {
            max_iter: 1,
            ..Default::default()
        };

        assert_eq!(
            solver.fit_readout(&design, &targets, &[0.5]),
            Err(LinRegError::NonConvergence {
                penalty: 0.5,
                target: 0,
                iterations: 1,
            })
        );
    }

    #[test]
    fn rejects_negative_penalty() {
        let design = DMatrix::from_element(3, 1, 1.0);
        let targets = DMatrix::from_element(3, 1, 1.0);

        assert!(matches!(
            NonNegativeRidge::default().fit_readout(&design, &targets, &[-1.0]),
            Err(LinRegError::InvalidHyperparameter(_))
        ));
    }
}
