//! Supervised regressors over deterministic design matrices.
//!
//! The two-stage forecaster composes a trend regressor and a seasonal
//! regressor through the [`Regressor`] trait; [`LinearRegression`] and
//! [`RandomForestRegressor`] are the defaults.

mod forest;
mod linear;
mod tree;

pub use forest::{ForestConfig, RandomForestRegressor};
pub use linear::LinearRegression;
pub use tree::{Criterion, RegressionTree, TreeConfig};

use crate::deterministic::DesignMatrix;
use crate::error::{ForecastError, Result};

/// A regressor mapping design-matrix rows to scalar targets.
///
/// `fit` may be called repeatedly; each call discards the previous fit.
pub trait Regressor {
    /// Fit to the rows of `x` and the matching targets `y`.
    fn fit(&mut self, x: &DesignMatrix, y: &[f64]) -> Result<()>;

    /// Predict one value per row of `x`.
    ///
    /// `x` must carry the same columns, in the same order, as the training
    /// matrix.
    fn predict(&self, x: &DesignMatrix) -> Result<Vec<f64>>;

    fn is_fitted(&self) -> bool;

    fn name(&self) -> &str;
}

/// Shape and value checks shared by every `fit`.
pub(crate) fn validate_training(x: &DesignMatrix, y: &[f64]) -> Result<()> {
    if x.is_empty() {
        return Err(ForecastError::InsufficientData { needed: 1, got: 0 });
    }
    if x.n_rows() != y.len() {
        return Err(ForecastError::DimensionMismatch {
            expected: x.n_rows(),
            got: y.len(),
        });
    }
    if y.iter().any(|v| !v.is_finite()) {
        return Err(ForecastError::malformed("regression target has non-finite values"));
    }
    Ok(())
}
