//! ARIMA (Autoregressive Integrated Moving Average) model.

use crate::core::{Forecast, Frequency, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::arima::diff::{difference, integrate};
use crate::models::Forecaster;
use crate::utils::optimization::{nelder_mead, NelderMeadConfig};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Residual variance used in the likelihood when a fit is exact.
const SIGMA2_FLOOR: f64 = 1e-10;

/// ARIMA order `(p, d, q)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ARIMASpec {
    /// AR order
    pub p: usize,
    /// Differencing order
    pub d: usize,
    /// MA order
    pub q: usize,
}

impl ARIMASpec {
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }

    /// Estimated parameters: AR + MA + intercept.
    pub fn num_params(&self) -> usize {
        self.p + self.q + 1
    }

    /// Shortest series the order can be fitted to.
    pub fn min_observations(&self) -> usize {
        self.d + self.p.max(self.q) + 2
    }
}

impl Default for ARIMASpec {
    fn default() -> Self {
        Self::new(1, 1, 1)
    }
}

impl fmt::Display for ARIMASpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ARIMA({},{},{})", self.p, self.d, self.q)
    }
}

/// ARIMA(p, d, q) fitted by conditional sum of squares.
///
/// The series is differenced `d` times, then an ARMA(p, q) with intercept
/// is fitted to the differenced values by minimising the conditional sum of
/// squares with Nelder-Mead. Coefficients are bounded to (-0.99, 0.99).
#[derive(Debug, Clone, Default)]
pub struct ARIMA {
    spec: ARIMASpec,
    fit: Option<ArimaFit>,
}

#[derive(Debug, Clone)]
struct ArimaFit {
    ar: Vec<f64>,
    ma: Vec<f64>,
    intercept: f64,
    history: Vec<f64>,
    differenced: Vec<f64>,
    fitted: Vec<f64>,
    residuals: Vec<f64>,
    sigma2: f64,
    aic: f64,
    bic: f64,
    end: Option<(DateTime<Utc>, Frequency)>,
}

impl ARIMA {
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self::from_spec(ARIMASpec::new(p, d, q))
    }

    pub fn from_spec(spec: ARIMASpec) -> Self {
        Self { spec, fit: None }
    }

    pub fn spec(&self) -> ARIMASpec {
        self.spec
    }

    pub fn ar_coefficients(&self) -> &[f64] {
        self.fit.as_ref().map(|f| f.ar.as_slice()).unwrap_or(&[])
    }

    pub fn ma_coefficients(&self) -> &[f64] {
        self.fit.as_ref().map(|f| f.ma.as_slice()).unwrap_or(&[])
    }

    /// Mean of the differenced series.
    pub fn intercept(&self) -> Option<f64> {
        self.fit.as_ref().map(|f| f.intercept)
    }

    /// Residual variance.
    pub fn sigma2(&self) -> Option<f64> {
        self.fit.as_ref().map(|f| f.sigma2)
    }

    pub fn aic(&self) -> Option<f64> {
        self.fit.as_ref().map(|f| f.aic)
    }

    pub fn bic(&self) -> Option<f64> {
        self.fit.as_ref().map(|f| f.bic)
    }

    /// Fit to raw values without a time index.
    pub fn fit_values(&mut self, values: &[f64]) -> Result<()> {
        self.fit = Some(self.estimate(values, None)?);
        Ok(())
    }

    fn estimate(
        &self,
        values: &[f64],
        end: Option<(DateTime<Utc>, Frequency)>,
    ) -> Result<ArimaFit> {
        let ARIMASpec { p, d, q } = self.spec;
        let needed = self.spec.min_observations();
        if values.len() < needed {
            return Err(ForecastError::InsufficientData {
                needed,
                got: values.len(),
            });
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::malformed("series has non-finite values"));
        }

        let differenced = difference(values, d);
        let mean = differenced.iter().sum::<f64>() / differenced.len() as f64;

        let (intercept, ar, ma) = if p == 0 && q == 0 {
            (mean, Vec::new(), Vec::new())
        } else {
            let mut initial = vec![mean];
            initial.extend((0..p).map(|i| 0.1 / (i + 1) as f64));
            initial.extend((0..q).map(|i| 0.1 / (i + 1) as f64));

            let mut bounds = vec![(f64::NEG_INFINITY, f64::INFINITY)];
            bounds.extend(std::iter::repeat((-0.99, 0.99)).take(p + q));

            let result = nelder_mead(
                |params| {
                    conditional_sum_of_squares(
                        &differenced,
                        &params[1..1 + p],
                        &params[1 + p..],
                        params[0],
                    )
                },
                &initial,
                Some(&bounds),
                NelderMeadConfig {
                    max_iter: 1000,
                    tolerance: 1e-8,
                    ..Default::default()
                },
            );
            let point = result.optimal_point;
            (point[0], point[1..1 + p].to_vec(), point[1 + p..].to_vec())
        };

        let (fitted, residuals) = one_step_fit(&differenced, &ar, &ma, intercept);
        let start = p.max(q);
        let valid = &residuals[start..];
        let n_eff = valid.len() as f64;
        let sigma2 = valid.iter().map(|r| r * r).sum::<f64>() / n_eff;
        if !sigma2.is_finite() {
            return Err(ForecastError::ComputationError(format!(
                "{} produced a non-finite residual variance",
                self.spec
            )));
        }

        let k = self.spec.num_params() as f64;
        // exact fits tie at the floor and are ranked by parameter count
        let log_likelihood = -0.5
            * n_eff
            * (1.0 + sigma2.max(SIGMA2_FLOOR).ln() + (2.0 * std::f64::consts::PI).ln());
        let aic = -2.0 * log_likelihood + 2.0 * k;
        let bic = -2.0 * log_likelihood + k * n_eff.ln();

        debug!(order = %self.spec, sigma2, aic, bic, "fitted arima");

        Ok(ArimaFit {
            ar,
            ma,
            intercept,
            history: values.to_vec(),
            differenced,
            fitted,
            residuals,
            sigma2,
            aic,
            bic,
            end,
        })
    }
}

fn conditional_sum_of_squares(series: &[f64], ar: &[f64], ma: &[f64], intercept: f64) -> f64 {
    let (_, residuals) = one_step_fit(series, ar, ma, intercept);
    let css: f64 = residuals.iter().map(|r| r * r).sum();
    if css.is_finite() {
        css
    } else {
        f64::MAX
    }
}

/// One-step-ahead predictions and residuals on the differenced scale.
/// Values before `max(p, q)` have no prediction (NaN) and zero residual.
fn one_step_fit(series: &[f64], ar: &[f64], ma: &[f64], intercept: f64) -> (Vec<f64>, Vec<f64>) {
    let n = series.len();
    let start = ar.len().max(ma.len());
    let mut fitted = vec![f64::NAN; n];
    let mut residuals = vec![0.0; n];
    for t in start..n {
        let mut pred = intercept;
        for (i, phi) in ar.iter().enumerate() {
            pred += phi * (series[t - 1 - i] - intercept);
        }
        for (i, theta) in ma.iter().enumerate() {
            pred += theta * residuals[t - 1 - i];
        }
        fitted[t] = pred;
        residuals[t] = series[t] - pred;
    }
    (fitted, residuals)
}

impl Forecaster for ARIMA {
    fn fit(&mut self, series: &TimeSeries) -> Result<()> {
        let end = match (series.end(), series.regular_frequency()) {
            (Some(last), Ok(freq)) => Some((last, freq)),
            _ => None,
        };
        self.fit = Some(self.estimate(series.primary_values(), end)?);
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        let fit = self.fit.as_ref().ok_or(ForecastError::UnfittedModel)?;
        if horizon == 0 {
            return Err(ForecastError::InvalidHorizon(0));
        }
        let timestamps = fit
            .end
            .map(|(last, freq)| freq.future_grid(last, horizon))
            .transpose()?;

        let mut series = fit.differenced.clone();
        let mut residuals = fit.residuals.clone();
        for _ in 0..horizon {
            let t = series.len();
            let mut pred = fit.intercept;
            for (i, phi) in fit.ar.iter().enumerate().filter(|(i, _)| *i < t) {
                pred += phi * (series[t - 1 - i] - fit.intercept);
            }
            for (i, theta) in fit.ma.iter().enumerate().filter(|(i, _)| *i < t) {
                pred += theta * residuals[t - 1 - i];
            }
            series.push(pred);
            residuals.push(0.0);
        }

        let ahead = &series[fit.differenced.len()..];
        let values = integrate(ahead, &fit.history, self.spec.d);
        Ok(match timestamps {
            Some(timestamps) => Forecast::from_parts(timestamps, values),
            None => Forecast::from_values(values),
        })
    }

    /// One-step-ahead fits on the differenced scale.
    fn fitted_values(&self) -> Option<&[f64]> {
        self.fit.as_ref().map(|f| f.fitted.as_slice())
    }

    fn residuals(&self) -> Option<&[f64]> {
        self.fit.as_ref().map(|f| f.residuals.as_slice())
    }

    fn name(&self) -> &str {
        "ARIMA"
    }
}
