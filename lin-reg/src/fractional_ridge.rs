use nalgebra::{DMatrix, DVector, SVD};

use super::{check_dims, penalty_for, LinReg, LinRegError, Result};

/// Initial upper bracket for the penalty, relative to the largest squared singular value
const BIG_BIAS: f64 = 1e4;
/// Upper limit on how often the bracket gets doubled
const MAX_DOUBLINGS: usize = 200;
/// Upper limit on the number of bisection steps
const MAX_HALVINGS: usize = 200;

/// Fractional ridge regression.
///
/// Instead of a raw penalty weight, the regularization is expressed as the fraction
/// of the ordinary least squares coefficient norm that should be retained. A fraction
/// of 1 yields the OLS solution, smaller fractions shrink the coefficients further.
/// This makes regularization strength comparable across targets of different scale.
///
/// The design is expected to be standardized and the targets centered, there is no
/// intercept column.
#[derive(Debug, Clone)]
pub struct FractionalRidge {
    /// Width of the bracket on `ln(1 + penalty)` at which the penalty search stops
    pub tol: f64,
}

impl Default for FractionalRidge {
    fn default() -> Self {
        Self { tol: 1e-10 }
    }
}

/// The coefficients for a whole grid of fractions
#[derive(Debug, Clone)]
pub struct FracRidgePath {
    /// One coefficient matrix per fraction, each with one row per predictor and
    /// one column per target
    pub coefficients: Vec<DMatrix<f64>>,
    /// The penalty realized for each fraction (rows) and target (columns)
    pub penalties: DMatrix<f64>,
}

impl FracRidgePath {
    /// Predict `design` for every fraction of the path
    pub fn predict(&self, design: &DMatrix<f64>) -> Vec<DMatrix<f64>> {
        self.coefficients.iter().map(|c| crate::predict_readout(design, c)).collect()
    }
}

/// The part of the SVD that is not numerically zero
struct Decomposition {
    singular_values: Vec<f64>,
    u: DMatrix<f64>,
    v_t: DMatrix<f64>,
}

impl Decomposition {
    fn new(design: &DMatrix<f64>) -> Result<Self> {
        let svd = SVD::try_new(design.clone(), true, true, f64::EPSILON, 0)
            .ok_or(LinRegError::SvdFailed)?;
        let u = svd.u.ok_or(LinRegError::SvdFailed)?;
        let v_t = svd.v_t.ok_or(LinRegError::SvdFailed)?;

        let s_max = svd.singular_values.iter().cloned().fold(0.0, f64::max);
        let cutoff = s_max * design.nrows().max(design.ncols()) as f64 * f64::EPSILON;
        let kept: Vec<usize> =
            (0..svd.singular_values.len()).filter(|i| svd.singular_values[*i] > cutoff).collect();
        if kept.len() < svd.singular_values.len() {
            debug!(
                "dropping {} of {} singular values below {}",
                svd.singular_values.len() - kept.len(),
                svd.singular_values.len(),
                cutoff
            );
        }

        Ok(Self {
            singular_values: kept.iter().map(|i| svd.singular_values[*i]).collect(),
            u: u.select_columns(kept.iter()),
            v_t: v_t.select_rows(kept.iter()),
        })
    }

    /// OLS coefficients of target column `k` in the rotated basis
    fn rotated_ols(&self, targets: &DMatrix<f64>, k: usize) -> Vec<f64> {
        let y = targets.column(k);
        self.singular_values
            .iter()
            .enumerate()
            .map(|(i, s)| self.u.column(i).dot(&y) / s)
            .collect()
    }

    /// Rotate shrunken coefficients back into predictor space
    fn coefficients(&self, rotated: &[f64], penalty: f64) -> DVector<f64> {
        let mut beta = DVector::zeros(self.v_t.ncols());
        for (i, (s, c)) in self.singular_values.iter().zip(rotated.iter()).enumerate() {
            let s_sq = s * s;
            let shrunk = s_sq / (s_sq + penalty) * c;
            for j in 0..beta.len() {
                beta[j] += self.v_t[(i, j)] * shrunk;
            }
        }
        beta
    }
}

impl FractionalRidge {
    /// Fit every fraction in `fractions` for all targets, sharing one decomposition
    pub fn fit_path(
        &self,
        design: &DMatrix<f64>,
        targets: &DMatrix<f64>,
        fractions: &[f64],
    ) -> Result<FracRidgePath> {
        validate_fractions(fractions)?;
        // the grid is shared by all targets, so only the rows need to agree
        check_dims(design, targets, &fractions[..1])?;

        let dec = Decomposition::new(design)?;
        let mut coefficients = vec![DMatrix::zeros(design.ncols(), targets.ncols()); fractions.len()];
        let mut penalties = DMatrix::zeros(fractions.len(), targets.ncols());
        for k in 0..targets.ncols() {
            let rotated = dec.rotated_ols(targets, k);
            for (h, frac) in fractions.iter().enumerate() {
                let penalty = self.find_penalty(&dec.singular_values, &rotated, *frac);
                trace!("target {}: fraction {} realized with penalty {}", k, frac, penalty);
                coefficients[h].set_column(k, &dec.coefficients(&rotated, penalty));
                penalties[(h, k)] = penalty;
            }
        }

        Ok(FracRidgePath {
            coefficients,
            penalties,
        })
    }

    /// Fit one fraction per target (or a single fraction for all of them), also
    /// returning the realized penalty of each target
    pub fn fit_with_penalties(
        &self,
        design: &DMatrix<f64>,
        targets: &DMatrix<f64>,
        fractions: &[f64],
    ) -> Result<(DMatrix<f64>, DVector<f64>)> {
        check_dims(design, targets, fractions)?;
        validate_fractions(fractions)?;

        let dec = Decomposition::new(design)?;
        let mut readout = DMatrix::zeros(design.ncols(), targets.ncols());
        let mut penalties = DVector::zeros(targets.ncols());
        for k in 0..targets.ncols() {
            let rotated = dec.rotated_ols(targets, k);
            let penalty = self.find_penalty(&dec.singular_values, &rotated, penalty_for(fractions, k));
            readout.set_column(k, &dec.coefficients(&rotated, penalty));
            penalties[k] = penalty;
        }

        Ok((readout, penalties))
    }

    /// Search the penalty whose coefficient norm is `frac` times the OLS norm.
    /// The norm ratio decreases monotonically in the penalty, so it is bracketed
    /// and then bisected on `ln(1 + penalty)`.
    fn find_penalty(&self, singular_values: &[f64], rotated: &[f64], frac: f64) -> f64 {
        let ols_sq: f64 = rotated.iter().map(|c| c * c).sum();
        if frac >= 1.0 || ols_sq == 0.0 {
            return 0.0;
        }
        let ratio = |penalty: f64| -> f64 {
            let len_sq: f64 = singular_values
                .iter()
                .zip(rotated.iter())
                .map(|(s, c)| {
                    let shrink = s * s / (s * s + penalty);
                    shrink * shrink * c * c
                })
                .sum();
            (len_sq / ols_sq).sqrt()
        };

        let s_max = singular_values.iter().cloned().fold(0.0, f64::max);
        let mut upper = BIG_BIAS * s_max * s_max;
        for _ in 0..MAX_DOUBLINGS {
            if ratio(upper) <= frac {
                break;
            }
            upper *= 2.0;
        }

        let (mut lo, mut hi) = (0.0_f64, upper.ln_1p());
        for _ in 0..MAX_HALVINGS {
            if hi - lo <= self.tol {
                break;
            }
            let mid = 0.5 * (lo + hi);
            if ratio(mid.exp_m1()) > frac {
                lo = mid;
            } else {
                hi = mid;
            }
        }

        (0.5 * (lo + hi)).exp_m1()
    }
}

impl LinReg for FractionalRidge {
    /// Here the penalties are fractions in (0, 1]
    fn fit_readout(
        &self,
        design: &DMatrix<f64>,
        targets: &DMatrix<f64>,
        penalties: &[f64],
    ) -> Result<DMatrix<f64>> {
        self.fit_with_penalties(design, targets, penalties).map(|(readout, _)| readout)
    }
}

fn validate_fractions(fractions: &[f64]) -> Result<()> {
    if fractions.is_empty() {
        return Err(LinRegError::InvalidHyperparameter("no fraction given".to_string()));
    }
    match fractions.iter().find(|f| !(**f > 0.0 && **f <= 1.0)) {
        Some(f) => Err(LinRegError::InvalidHyperparameter(format!(
            "fractions must lie in (0, 1], got {}",
            f
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use nanorand::{Rng, WyRand};

    use super::*;

    fn random_matrix(rng: &mut WyRand, rows: usize, cols: usize) -> DMatrix<f64> {
        DMatrix::from_fn(rows, cols, |_, _| rng.generate::<f64>() * 2.0 - 1.0)
    }

    fn centered(mut m: DMatrix<f64>) -> DMatrix<f64> {
        for mut col in m.column_iter_mut() {
            let mean = col.mean();
            col.add_scalar_mut(-mean);
        }
        m
    }

    #[test]
    fn full_fraction_is_ols() {
        if let Err(_) = pretty_env_logger::try_init() {}

        let mut rng = WyRand::new_seed(0);
        let design = centered(random_matrix(&mut rng, 30, 4));
        let targets = centered(random_matrix(&mut rng, 30, 2));

        let (readout, penalties) =
            FractionalRidge::default().fit_with_penalties(&design, &targets, &[1.0]).unwrap();
        let ols = (design.transpose() * &design).try_inverse().unwrap() * design.transpose() * &targets;

        assert!((readout - ols).abs().max() < 1e-10);
        assert_eq!(penalties, DVector::zeros(2));
    }

    #[test]
    fn norm_ratio_matches_fraction() {
        if let Err(_) = pretty_env_logger::try_init() {}

        let mut rng = WyRand::new_seed(1);
        let design = centered(random_matrix(&mut rng, 40, 5));
        let targets = centered(random_matrix(&mut rng, 40, 3));
        let fractions = [0.1, 0.3, 0.5, 0.9, 1.0];

        let path = FractionalRidge::default().fit_path(&design, &targets, &fractions).unwrap();
        assert_eq!(path.coefficients.len(), fractions.len());
        assert_eq!(path.penalties.shape(), (fractions.len(), 3));

        let ols = &path.coefficients[fractions.len() - 1];
        for (h, frac) in fractions.iter().enumerate() {
            for k in 0..3 {
                let ratio = path.coefficients[h].column(k).norm() / ols.column(k).norm();
                assert!((ratio - frac).abs() < 1e-6, "fraction {} got ratio {}", frac, ratio);
            }
        }
        // stronger shrinkage needs a larger penalty
        for k in 0..3 {
            for h in 1..fractions.len() {
                assert!(path.penalties[(h, k)] < path.penalties[(h - 1, k)]);
            }
        }
    }

    #[test]
    fn path_agrees_with_single_fits() {
        let mut rng = WyRand::new_seed(2);
        let design = centered(random_matrix(&mut rng, 25, 3));
        let targets = centered(random_matrix(&mut rng, 25, 2));
        let solver = FractionalRidge::default();

        let path = solver.fit_path(&design, &targets, &[0.4, 0.7]).unwrap();
        let single = solver.fit_readout(&design, &targets, &[0.7]).unwrap();

        assert_eq!(path.coefficients[1], single);
    }

    #[test]
    fn zero_target_stays_zero() {
        let mut rng = WyRand::new_seed(3);
        let design = centered(random_matrix(&mut rng, 10, 2));
        let targets = DMatrix::zeros(10, 1);

        let (readout, penalties) =
            FractionalRidge::default().fit_with_penalties(&design, &targets, &[0.5]).unwrap();

        assert_eq!(readout, DMatrix::zeros(2, 1));
        assert_eq!(penalties[0], 0.0);
    }

    #[test]
    fn rank_deficient_design() {
        let mut rng = WyRand::new_seed(4);
        let base = centered(random_matrix(&mut rng, 20, 2));
        let design = DMatrix::from_fn(20, 3, |i, j| if j < 2 { base[(i, j)] } else { base[(i, 0)] });
        let targets = centered(random_matrix(&mut rng, 20, 1));

        let readout = FractionalRidge::default().fit_readout(&design, &targets, &[0.5]).unwrap();

        assert!(readout.iter().all(|v| v.is_finite()));
        // duplicated columns share their weight
        assert!((readout[(0, 0)] - readout[(2, 0)]).abs() < 1e-8);
    }

    #[test]
    fn invalid_fractions() {
        let design = DMatrix::from_element(4, 1, 1.0);
        let targets = DMatrix::from_element(4, 1, 1.0);
        let solver = FractionalRidge::default();

        for frac in [0.0, -0.5, 1.5, f64::NAN] {
            assert!(matches!(
                solver.fit_path(&design, &targets, &[frac]),
                Err(LinRegError::InvalidHyperparameter(_))
            ));
        }
        assert!(matches!(
            solver.fit_path(&design, &targets, &[]),
            Err(LinRegError::InvalidHyperparameter(_))
        ));
    }
}
