//! Ordinary least squares.

use super::{validate_training, Regressor};
use crate::deterministic::DesignMatrix;
use crate::error::{ForecastError, Result};
use crate::utils::linalg::least_squares;
use tracing::debug;

/// Ordinary least-squares regression.
///
/// By default no implicit intercept is fitted: deterministic trend designs
/// carry an explicit `const` column instead.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearRegression {
    fit_intercept: bool,
    fitted: Option<LinearFit>,
}

#[derive(Debug, Clone, PartialEq)]
struct LinearFit {
    columns: Vec<String>,
    coefficients: Vec<f64>,
    intercept: f64,
    rank: usize,
}

impl LinearRegression {
    /// Regression without an implicit intercept.
    pub fn new() -> Self {
        Self::default()
    }

    /// Regression that also fits an intercept term.
    pub fn with_intercept() -> Self {
        Self {
            fit_intercept: true,
            fitted: None,
        }
    }

    pub fn fit_intercept(&self) -> bool {
        self.fit_intercept
    }

    /// Coefficients in training-column order.
    pub fn coefficients(&self) -> Option<&[f64]> {
        self.fitted.as_ref().map(|f| f.coefficients.as_slice())
    }

    /// Fitted intercept; always 0 when `fit_intercept` is off.
    pub fn intercept(&self) -> Option<f64> {
        self.fitted.as_ref().map(|f| f.intercept)
    }

    /// Coefficient for a named training column.
    pub fn coefficient(&self, column: &str) -> Option<f64> {
        let fit = self.fitted.as_ref()?;
        let j = fit.columns.iter().position(|c| c == column)?;
        Some(fit.coefficients[j])
    }

    /// Numerical rank of the training design.
    pub fn rank(&self) -> Option<usize> {
        self.fitted.as_ref().map(|f| f.rank)
    }
}

impl Regressor for LinearRegression {
    fn fit(&mut self, x: &DesignMatrix, y: &[f64]) -> Result<()> {
        validate_training(x, y)?;

        let solution = if self.fit_intercept {
            let augmented: Vec<Vec<f64>> = x
                .rows()
                .iter()
                .map(|r| {
                    let mut row = Vec::with_capacity(r.len() + 1);
                    row.push(1.0);
                    row.extend_from_slice(r);
                    row
                })
                .collect();
            least_squares(&augmented, y)?
        } else if x.n_cols() == 0 {
            return Err(ForecastError::InvalidParameter(
                "design matrix has no columns and no intercept is fitted".into(),
            ));
        } else {
            least_squares(x.rows(), y)?
        };

        let (intercept, coefficients) = if self.fit_intercept {
            (solution.coefficients[0], solution.coefficients[1..].to_vec())
        } else {
            (0.0, solution.coefficients)
        };

        debug!(
            rows = x.n_rows(),
            columns = x.n_cols(),
            rank = solution.rank,
            rss = solution.residual_ss,
            "fitted linear regression"
        );

        self.fitted = Some(LinearFit {
            columns: x.columns().to_vec(),
            coefficients,
            intercept,
            rank: solution.rank,
        });
        Ok(())
    }

    fn predict(&self, x: &DesignMatrix) -> Result<Vec<f64>> {
        let fit = self.fitted.as_ref().ok_or(ForecastError::UnfittedModel)?;
        x.ensure_columns(&fit.columns)?;
        Ok(x
            .rows()
            .iter()
            .map(|row| {
                fit.intercept
                    + row
                        .iter()
                        .zip(&fit.coefficients)
                        .map(|(v, c)| v * c)
                        .sum::<f64>()
            })
            .collect())
    }

    fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    fn name(&self) -> &str {
        "LinearRegression"
    }
}
