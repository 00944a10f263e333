//! Augmented Dickey-Fuller unit-root test.

use crate::error::{ForecastError, Result};
use crate::utils::linalg::least_squares;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use tracing::debug;

/// Lagged differences used when none are given.
pub const DEFAULT_MAX_LAG: usize = 4;

/// MacKinnon (2010) response surface for the constant-only case:
/// `tau_inf + b1/n + b2/n^2 + b3/n^3` at 1%, 5% and 10%.
const CRITICAL_SURFACE: [[f64; 4]; 3] = [
    [-3.43035, -6.5393, -16.786, -79.433],
    [-2.86154, -2.8903, -4.234, -40.040],
    [-2.56677, -1.5384, -2.809, 0.0],
];

/// MacKinnon (1994) approximate p-value polynomials, constant-only case.
const SMALL_P: [f64; 3] = [2.1659, 1.4412, 0.038269];
const LARGE_P: [f64; 4] = [1.7339, 0.93202, -0.12745, -0.010368];
const TAU_STAR: f64 = -1.61;
const TAU_MIN: f64 = -18.83;
const TAU_MAX: f64 = 2.74;

/// Critical values of the test statistic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriticalValues {
    pub one_percent: f64,
    pub five_percent: f64,
    pub ten_percent: f64,
}

impl CriticalValues {
    /// Finite-sample critical values for `nobs` regression observations.
    pub fn for_nobs(nobs: usize) -> Self {
        let inv = 1.0 / nobs as f64;
        let eval = |c: &[f64; 4]| c[0] + inv * (c[1] + inv * (c[2] + inv * c[3]));
        Self {
            one_percent: eval(&CRITICAL_SURFACE[0]),
            five_percent: eval(&CRITICAL_SURFACE[1]),
            ten_percent: eval(&CRITICAL_SURFACE[2]),
        }
    }
}

/// Outcome of [`adf_test`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdfResult {
    /// t-statistic of the lagged level.
    pub statistic: f64,
    /// Approximate p-value of the unit-root null.
    pub p_value: f64,
    /// Lagged differences in the regression.
    pub lags: usize,
    /// Observations in the regression.
    pub nobs: usize,
    pub critical_values: CriticalValues,
}

impl AdfResult {
    /// Whether the unit-root null is rejected at 5%.
    pub fn is_stationary(&self) -> bool {
        self.statistic < self.critical_values.five_percent
    }
}

/// Augmented Dickey-Fuller test with a constant and exactly `max_lag`
/// lagged differences:
///
/// `Δy_t = γ y_{t-1} + Σ_{i=1..lag} δ_i Δy_{t-i} + c + ε_t`
///
/// The statistic is the t-value of `γ`. A strongly negative statistic
/// rejects the unit root.
pub fn adf_test(series: &[f64], max_lag: usize) -> Result<AdfResult> {
    let n = series.len();
    // lag + 2 regressors and at least one residual degree of freedom
    let needed = 2 * max_lag + 5;
    if n < needed {
        return Err(ForecastError::InsufficientData { needed, got: n });
    }
    if series.iter().any(|v| !v.is_finite()) {
        return Err(ForecastError::malformed("series has non-finite values"));
    }

    let delta = |t: usize| series[t] - series[t - 1];
    let first = max_lag + 1;
    let rows: Vec<Vec<f64>> = (first..n)
        .map(|t| {
            let mut row = Vec::with_capacity(max_lag + 2);
            row.push(series[t - 1]);
            row.extend((1..=max_lag).map(|i| delta(t - i)));
            row.push(1.0);
            row
        })
        .collect();
    let target: Vec<f64> = (first..n).map(delta).collect();
    let nobs = target.len();

    let fit = least_squares(&rows, &target)?;
    let se = fit
        .standard_errors(nobs)
        .and_then(|se| se.first().copied())
        .filter(|se| *se > 0.0 && se.is_finite())
        .ok_or_else(|| {
            ForecastError::ComputationError(
                "ADF regression is singular or fits exactly".to_string(),
            )
        })?;
    let statistic = fit.coefficients[0] / se;
    let p_value = mackinnon_p_value(statistic);

    debug!(statistic, p_value, lags = max_lag, nobs, "adf test");

    Ok(AdfResult {
        statistic,
        p_value,
        lags: max_lag,
        nobs,
        critical_values: CriticalValues::for_nobs(nobs),
    })
}

/// Approximate asymptotic p-value of an ADF statistic (constant, one series).
pub fn mackinnon_p_value(statistic: f64) -> f64 {
    if statistic.is_nan() {
        return f64::NAN;
    }
    if statistic > TAU_MAX {
        return 1.0;
    }
    if statistic < TAU_MIN {
        return 0.0;
    }
    let coefficients: &[f64] = if statistic <= TAU_STAR { &SMALL_P } else { &LARGE_P };
    let z = coefficients
        .iter()
        .rev()
        .fold(0.0, |acc, c| acc * statistic + c);
    standard_normal_cdf(z)
}

fn standard_normal_cdf(z: f64) -> f64 {
    match Normal::new(0.0, 1.0) {
        Ok(normal) => normal.cdf(z),
        Err(_) => f64::NAN,
    }
}
