#[macro_use]
extern crate log;

use std::time::Instant;

use fitting::{final_model, find_hyperparameters, regularized_model, FitParams};
use nalgebra::DMatrix;
use nanorand::{Rng, WyRand};

const N_SAMPLES: usize = 200;
const N_PREDICTORS: usize = 20;
const N_TARGETS: usize = 3;
const NOISE: f64 = 2.0;
const SEED: Option<u64> = Some(0);

/// Synthetic predictors and targets with a known linear relation plus noise
fn generate(rng: &mut WyRand) -> (DMatrix<f64>, DMatrix<f64>) {
    let x = DMatrix::from_fn(N_SAMPLES, N_PREDICTORS, |_, j| {
        (rng.generate::<f64>() * 2.0 - 1.0) * (j + 1) as f64 + j as f64
    });
    let weights =
        DMatrix::from_fn(N_PREDICTORS, N_TARGETS, |_, _| rng.generate::<f64>() * 2.0 - 0.5);
    let noise = DMatrix::from_fn(N_SAMPLES, N_TARGETS, |_, _| (rng.generate::<f64>() - 0.5) * NOISE);
    let y = &x * weights + noise;

    (x, y)
}

fn mse(a: &DMatrix<f64>, b: &DMatrix<f64>) -> f64 {
    (a - b).norm_squared() / a.len() as f64
}

pub(crate) fn main() -> fitting::Result<()> {
    pretty_env_logger::init();

    let mut rng = match SEED {
        Some(seed) => WyRand::new_seed(seed),
        None => WyRand::new(),
    };
    let (x, y) = generate(&mut rng);
    info!("got {} samples of {} predictors and {} targets", x.nrows(), x.ncols(), y.ncols());

    let fracs: Vec<f64> = (1..=20).map(|i| i as f64 / 20.0).collect();
    let params = FitParams {
        seed: SEED,
        ..Default::default()
    };

    // two folds, even and odd rows
    let even: Vec<usize> = (0..N_SAMPLES).step_by(2).collect();
    let odd: Vec<usize> = (1..N_SAMPLES).step_by(2).collect();
    let folds = [(&even, &odd), (&odd, &even)];

    let t0 = Instant::now();
    let mut errors: DMatrix<f64> = DMatrix::zeros(fracs.len(), N_TARGETS);
    for (train, test) in folds.iter() {
        let x_train = x.select_rows(train.iter());
        let x_test = x.select_rows(test.iter());
        let y_train = y.select_rows(train.iter());
        let y_test = y.select_rows(test.iter());

        let sweep = find_hyperparameters(&x_train, &x_test, &y_train, &fracs, &params)?;
        for k in 0..N_TARGETS {
            let predictions = sweep.target(k);
            for h in 0..fracs.len() {
                errors[(h, k)] += mse(&predictions.columns(h, 1).into_owned(), &y_test.columns(k, 1).into_owned());
            }
        }
    }
    info!("sweep done in: {}ms", t0.elapsed().as_millis());

    let best: Vec<f64> = (0..N_TARGETS).map(|k| fracs[errors.column(k).imin()]).collect();
    info!("best fractions per target: {:?}", best);

    for (i, (train, test)) in folds.iter().enumerate() {
        let y_test = y.select_rows(test.iter());
        let predictions = regularized_model(
            &x.select_rows(train.iter()),
            &x.select_rows(test.iter()),
            &y.select_rows(train.iter()),
            &y_test,
            &best,
            &params,
        )?;
        info!("fold {}: mse with best fractions: {:.4}", i, mse(&predictions, &y_test));
    }

    let model = final_model(&x, &y, &best, &params)?;
    info!("intercepts: {}", model.coefficients.intercepts().transpose());
    info!("realized penalties: {}", model.penalties.transpose());
    info!("in-sample mse: {:.4}", mse(&model.predict(&x)?, &y));

    let non_negative = FitParams {
        non_negative: true,
        ..params
    };
    let model = final_model(&x, &y, &vec![1.0; N_TARGETS], &non_negative)?;
    info!("non-negative in-sample mse: {:.4}", mse(&model.predict(&x)?, &y));

    Ok(())
}
