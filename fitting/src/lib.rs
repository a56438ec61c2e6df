//! Multi-target regularized linear regression.
//!
//! Predictors are standardized and targets centered with parameters taken from
//! the training data only, then every target is fit with fractional ridge
//! regression (or non-negative ridge regression) and the coefficients are mapped
//! back into the original scale of the data.
//!
//! Three entry points cover the usual cross-validation workflow:
//! - [`find_hyperparameters`] sweeps a grid of candidates and predicts a test set
//!   for each of them,
//! - [`regularized_model`] predicts a test set with one chosen hyperparameter per target,
//! - [`final_model`] fits the whole dataset and returns unstandardized coefficients.

#![deny(unused_imports, unused_crate_dependencies)]
#![warn(missing_docs)]

#[macro_use]
extern crate log;

mod errors;
mod grouping;
mod model;
mod params;
mod regularization;
mod search;
mod standardize;
mod unstandardize;
mod validator;

pub use errors::{FitError, Result};
pub use grouping::{group_targets, TargetGroup};
pub use model::{baseline_model, final_model, regularized_model, FittedModel};
pub use params::FitParams;
pub use regularization::Regularization;
pub use search::{find_hyperparameters, SweepPredictions};
pub use standardize::{standardize, Standardization, Standardized};
pub use unstandardize::{unstandardize, Coefficients};
