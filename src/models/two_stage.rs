//! Two-stage trend + seasonal forecaster.
//!
//! The forecaster separates a slow trend from a calendar-driven seasonal
//! signal:
//!
//! 1. A trend regressor is fitted on a polynomial-in-time design
//!    (`const`, `trend`, `trend_squared`, ...).
//! 2. A seasonal regressor is fitted on the detrended residual using
//!    calendar Fourier terms (and optionally seasonal dummies).
//! 3. Forecasts sum the out-of-sample predictions of both stages.

use crate::core::{Forecast, Horizon, TimeSeries};
use crate::deterministic::{DeterministicProcess, DeterministicTerms};
use crate::error::{ForecastError, Result};
use crate::models::Forecaster;
use crate::regression::{ForestConfig, LinearRegression, RandomForestRegressor, Regressor};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Settings for [`TwoStageForecaster`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecasterConfig {
    /// Highest power of time in the trend design.
    pub trend_order: usize,
    /// Harmonics over the calendar month.
    pub monthly_fourier_order: usize,
    /// Harmonics over the calendar year.
    pub yearly_fourier_order: usize,
    /// Horizon used by [`TwoStageForecaster::forecast`].
    pub horizon: Horizon,
    /// Add one indicator per position in a cycle of this many buckets to the
    /// seasonal design.
    pub seasonal_dummies: Option<usize>,
    /// Drop deterministic columns that are collinear over the training range.
    pub drop_collinear: bool,
    /// Seasonal-stage forest used by [`TwoStageForecaster::new`].
    pub forest: ForestConfig,
}

impl Default for ForecasterConfig {
    fn default() -> Self {
        Self {
            trend_order: 2,
            monthly_fourier_order: 4,
            yearly_fourier_order: 4,
            horizon: Horizon::default(),
            seasonal_dummies: None,
            drop_collinear: true,
            forest: ForestConfig::default(),
        }
    }
}

impl ForecasterConfig {
    pub fn with_trend_order(mut self, order: usize) -> Self {
        self.trend_order = order;
        self
    }

    /// Set the monthly and yearly Fourier orders.
    pub fn with_fourier_orders(mut self, monthly: usize, yearly: usize) -> Self {
        self.monthly_fourier_order = monthly;
        self.yearly_fourier_order = yearly;
        self
    }

    pub fn with_horizon(mut self, horizon: Horizon) -> Self {
        self.horizon = horizon;
        self
    }

    pub fn with_seasonal_dummies(mut self, period: Option<usize>) -> Self {
        self.seasonal_dummies = period;
        self
    }

    pub fn with_drop_collinear(mut self, drop: bool) -> Self {
        self.drop_collinear = drop;
        self
    }

    pub fn with_forest(mut self, forest: ForestConfig) -> Self {
        self.forest = forest;
        self
    }

    /// Deterministic terms of the trend stage.
    pub fn trend_terms(&self) -> DeterministicTerms {
        DeterministicTerms::trend(self.trend_order)
    }

    /// Deterministic terms of the seasonal stage.
    pub fn seasonal_terms(&self) -> DeterministicTerms {
        DeterministicTerms::calendar_seasonal(self.monthly_fourier_order, self.yearly_fourier_order)
            .with_seasonal_dummies(self.seasonal_dummies)
    }
}

/// Trend and seasonal stage outputs over a run of timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct Components {
    pub timestamps: Vec<DateTime<Utc>>,
    pub trend: Vec<f64>,
    pub seasonal: Vec<f64>,
}

impl Components {
    /// Element-wise `trend + seasonal`.
    pub fn combined(&self) -> Vec<f64> {
        self.trend
            .iter()
            .zip(&self.seasonal)
            .map(|(t, s)| t + s)
            .collect()
    }
}

#[derive(Debug, Clone)]
struct FittedState<T, S> {
    trend_process: DeterministicProcess,
    seasonal_process: DeterministicProcess,
    trend_model: T,
    seasonal_model: S,
    in_sample: Components,
    fitted: Vec<f64>,
    residuals: Vec<f64>,
}

/// Forecaster combining a trend regressor and a seasonal regressor.
///
/// Generic over both stages; the defaults are [`LinearRegression`] without
/// an implicit intercept (the trend design carries `const`) and an
/// absolute-error [`RandomForestRegressor`].
///
/// Refitting replaces both stages at once: if any step of `fit` fails, the
/// previously fitted state is kept.
///
/// # Example
/// ```
/// use scrobble_forecast::core::{Frequency, TimeSeries};
/// use scrobble_forecast::models::{Forecaster, TwoStageForecaster};
/// use chrono::{TimeZone, Utc};
///
/// let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
/// let series = TimeSeries::regular(start, Frequency::daily(), vec![10.0, 12.0, 9.0, 11.0]).unwrap();
///
/// let mut model = TwoStageForecaster::default();
/// model.fit(&series).unwrap();
/// let forecast = model.predict(2).unwrap();
///
/// assert_eq!(forecast.horizon(), 2);
/// assert_eq!(forecast.timestamps()[0], Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap());
/// ```
#[derive(Debug, Clone)]
pub struct TwoStageForecaster<T = LinearRegression, S = RandomForestRegressor> {
    config: ForecasterConfig,
    trend_template: T,
    seasonal_template: S,
    state: Option<FittedState<T, S>>,
}

impl TwoStageForecaster {
    /// Forecaster with the default regressors; the seasonal forest follows
    /// `config.forest`.
    pub fn new(config: ForecasterConfig) -> Self {
        let seasonal = RandomForestRegressor::new(config.forest.clone());
        Self::with_regressors(config, LinearRegression::new(), seasonal)
    }
}

impl Default for TwoStageForecaster {
    fn default() -> Self {
        Self::new(ForecasterConfig::default())
    }
}

impl<T, S> TwoStageForecaster<T, S>
where
    T: Regressor + Clone,
    S: Regressor + Clone,
{
    /// Forecaster with custom stage regressors. `config.forest` is not used.
    pub fn with_regressors(config: ForecasterConfig, trend: T, seasonal: S) -> Self {
        Self {
            config,
            trend_template: trend,
            seasonal_template: seasonal,
            state: None,
        }
    }

    pub fn config(&self) -> &ForecasterConfig {
        &self.config
    }

    pub fn trend_process(&self) -> Option<&DeterministicProcess> {
        self.state.as_ref().map(|s| &s.trend_process)
    }

    pub fn seasonal_process(&self) -> Option<&DeterministicProcess> {
        self.state.as_ref().map(|s| &s.seasonal_process)
    }

    pub fn trend_model(&self) -> Option<&T> {
        self.state.as_ref().map(|s| &s.trend_model)
    }

    pub fn seasonal_model(&self) -> Option<&S> {
        self.state.as_ref().map(|s| &s.seasonal_model)
    }

    /// In-sample trend and seasonal fits.
    pub fn decompose(&self) -> Result<&Components> {
        self.state
            .as_ref()
            .map(|s| &s.in_sample)
            .ok_or(ForecastError::UnfittedModel)
    }

    /// Out-of-sample trend and seasonal forecasts for `horizon` buckets.
    pub fn predict_components(&self, horizon: usize) -> Result<Components> {
        let state = self.state.as_ref().ok_or(ForecastError::UnfittedModel)?;
        if horizon == 0 {
            return Err(ForecastError::InvalidHorizon(0));
        }

        let trend_x = state.trend_process.out_of_sample(horizon)?;
        let seasonal_x = state.seasonal_process.out_of_sample(horizon)?;
        let trend = state.trend_model.predict(&trend_x)?;
        let seasonal = state.seasonal_model.predict(&seasonal_x)?;

        debug!(horizon, model = self.name(), "predicted two-stage components");

        Ok(Components {
            timestamps: trend_x.index().to_vec(),
            trend,
            seasonal,
        })
    }

    /// Forecast a validated horizon.
    pub fn predict_horizon(&self, horizon: Horizon) -> Result<Forecast> {
        self.predict(horizon.get())
    }

    /// Forecast the configured horizon.
    pub fn forecast(&self) -> Result<Forecast> {
        self.predict_horizon(self.config.horizon)
    }

    fn fit_state(&self, series: &TimeSeries) -> Result<FittedState<T, S>> {
        if series.is_empty() {
            return Err(ForecastError::malformed("cannot fit an empty series"));
        }
        let target = series.primary_values();
        if let Some(i) = target.iter().position(|v| !v.is_finite()) {
            return Err(ForecastError::malformed(format!(
                "target value at {} is not finite",
                series.timestamps()[i]
            )));
        }

        let trend_process =
            DeterministicProcess::from_series(series, self.config.trend_terms(), self.config.drop_collinear)?;
        let trend_x = trend_process.in_sample()?;
        let mut trend_model = self.trend_template.clone();
        trend_model.fit(&trend_x, target)?;
        let trend = trend_model.predict(&trend_x)?;

        let detrended: Vec<f64> = target.iter().zip(&trend).map(|(y, t)| y - t).collect();

        let seasonal_process = DeterministicProcess::from_series(
            series,
            self.config.seasonal_terms(),
            self.config.drop_collinear,
        )?;
        let seasonal_x = seasonal_process.in_sample()?;
        let mut seasonal_model = self.seasonal_template.clone();
        seasonal_model.fit(&seasonal_x, &detrended)?;
        let seasonal = seasonal_model.predict(&seasonal_x)?;

        let in_sample = Components {
            timestamps: series.timestamps().to_vec(),
            trend,
            seasonal,
        };
        let fitted = in_sample.combined();
        let residuals = target.iter().zip(&fitted).map(|(y, f)| y - f).collect();

        debug!(
            rows = series.len(),
            trend_columns = trend_x.n_cols(),
            seasonal_columns = seasonal_x.n_cols(),
            trend_model = trend_model.name(),
            seasonal_model = seasonal_model.name(),
            "fitted two-stage forecaster"
        );

        Ok(FittedState {
            trend_process,
            seasonal_process,
            trend_model,
            seasonal_model,
            in_sample,
            fitted,
            residuals,
        })
    }
}

impl<T, S> Forecaster for TwoStageForecaster<T, S>
where
    T: Regressor + Clone,
    S: Regressor + Clone,
{
    fn fit(&mut self, series: &TimeSeries) -> Result<()> {
        let state = self.fit_state(series)?;
        self.state = Some(state);
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        let components = self.predict_components(horizon)?;
        let point = components.combined();
        Ok(Forecast::from_parts(components.timestamps, point))
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.state.as_ref().map(|s| s.fitted.as_slice())
    }

    fn residuals(&self) -> Option<&[f64]> {
        self.state.as_ref().map(|s| s.residuals.as_slice())
    }

    fn name(&self) -> &str {
        "TwoStage"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Frequency;
    use crate::regression::Criterion;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap()
    }

    fn daily(values: Vec<f64>) -> TimeSeries {
        TimeSeries::regular(start(), Frequency::daily(), values).unwrap()
    }

    fn quick_config() -> ForecasterConfig {
        ForecasterConfig::default().with_forest(ForestConfig::default().with_n_estimators(10))
    }

    #[test]
    fn default_config_values() {
        let config = ForecasterConfig::default();
        assert_eq!(config.trend_order, 2);
        assert_eq!(config.monthly_fourier_order, 4);
        assert_eq!(config.yearly_fourier_order, 4);
        assert_eq!(config.horizon.get(), 4);
        assert_eq!(config.seasonal_dummies, None);
        assert!(config.drop_collinear);
        assert_eq!(config.forest.n_estimators, 50);
    }

    #[test]
    fn pure_trend_is_recovered_by_the_first_stage() {
        let values: Vec<f64> = (1..=200).map(|t| 5.0 + 0.3 * t as f64).collect();
        let mut model = TwoStageForecaster::new(quick_config());
        model.fit(&daily(values)).unwrap();

        let trend = model.trend_model().unwrap();
        assert_relative_eq!(trend.coefficient("const").unwrap(), 5.0, epsilon = 1e-7);
        assert_relative_eq!(trend.coefficient("trend").unwrap(), 0.3, epsilon = 1e-9);

        let parts = model.predict_components(3).unwrap();
        assert_relative_eq!(parts.trend[0], 5.0 + 0.3 * 201.0, epsilon = 1e-6);
        for s in &parts.seasonal {
            assert!(s.abs() < 1e-6);
        }
    }

    #[test]
    fn fitted_values_sum_the_stages() {
        let values: Vec<f64> = (0..120)
            .map(|i| 100.0 + 0.1 * i as f64 + 8.0 * (i as f64 / 5.0).sin())
            .collect();
        let series = daily(values.clone());
        let mut model = TwoStageForecaster::new(quick_config());
        model.fit(&series).unwrap();

        let parts = model.decompose().unwrap();
        let fitted = model.fitted_values().unwrap();
        let residuals = model.residuals().unwrap();
        assert_eq!(parts.timestamps, series.timestamps());
        for i in 0..values.len() {
            assert_relative_eq!(fitted[i], parts.trend[i] + parts.seasonal[i], epsilon = 1e-12);
            assert_relative_eq!(residuals[i], values[i] - fitted[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn stage_designs_have_expected_columns() {
        let mut model = TwoStageForecaster::new(quick_config().with_seasonal_dummies(Some(7)));
        model.fit(&daily((0..400).map(|i| (i % 7) as f64).collect())).unwrap();

        assert_eq!(
            model.trend_process().unwrap().columns(),
            &["const", "trend", "trend_squared"]
        );
        let seasonal = model.seasonal_process().unwrap().columns();
        assert_eq!(seasonal.len(), 7 + 16);
        assert_eq!(seasonal[0], "s(1,7)");
    }

    #[test]
    fn predict_guards() {
        let model = TwoStageForecaster::default();
        assert_eq!(model.predict(1), Err(ForecastError::UnfittedModel));
        assert_eq!(model.forecast(), Err(ForecastError::UnfittedModel));
        assert!(matches!(model.decompose(), Err(ForecastError::UnfittedModel)));

        let mut model = TwoStageForecaster::new(quick_config());
        model.fit(&daily(vec![1.0, 2.0, 3.0, 4.0, 5.0])).unwrap();
        assert_eq!(model.predict(0), Err(ForecastError::InvalidHorizon(0)));
        assert_eq!(model.forecast().unwrap().horizon(), 4);
    }

    #[test]
    fn horizons_past_the_time_range_are_errors() {
        let mut model = TwoStageForecaster::new(quick_config());
        model.fit(&daily(vec![10.0, 12.0, 9.0, 11.0])).unwrap();
        assert_eq!(
            model.predict(usize::MAX),
            Err(ForecastError::InvalidHorizon(i64::MAX))
        );
        assert_eq!(
            model.predict(100_000_000),
            Err(ForecastError::InvalidHorizon(100_000_000))
        );
        assert_eq!(model.predict(3).unwrap().horizon(), 3);
    }

    #[test]
    fn failed_refit_keeps_previous_state() {
        let mut model = TwoStageForecaster::new(quick_config());
        model.fit(&daily(vec![10.0, 12.0, 9.0, 11.0])).unwrap();
        let before = model.predict(2).unwrap();

        let err = model.fit(&daily(vec![1.0, f64::NAN, 3.0])).unwrap_err();
        assert!(matches!(err, ForecastError::MalformedSeries(_)));
        assert_eq!(model.predict(2).unwrap(), before);
    }

    #[test]
    fn builders_shape_both_stages() {
        let config = quick_config()
            .with_trend_order(1)
            .with_fourier_orders(2, 0)
            .with_drop_collinear(false)
            .with_horizon(Horizon::new(9).unwrap());
        let mut model = TwoStageForecaster::new(config);
        model.fit(&daily((0..45).map(|i| (i % 5) as f64).collect())).unwrap();

        assert_eq!(model.trend_process().unwrap().columns(), &["const", "trend"]);
        assert_eq!(
            model.seasonal_process().unwrap().columns(),
            &["sin(1,freq=ME)", "cos(1,freq=ME)", "sin(2,freq=ME)", "cos(2,freq=ME)"]
        );
        assert_eq!(model.forecast().unwrap().horizon(), 9);
    }

    #[test]
    fn custom_regressors_are_used() {
        let config = quick_config().with_fourier_orders(1, 0);
        let mut model = TwoStageForecaster::with_regressors(
            config,
            LinearRegression::new(),
            LinearRegression::with_intercept(),
        );
        let values: Vec<f64> = (0..90).map(|i| i as f64).collect();
        model.fit(&daily(values)).unwrap();
        assert_eq!(model.seasonal_model().unwrap().name(), "LinearRegression");
        assert_eq!(model.predict(3).unwrap().horizon(), 3);
    }

    #[test]
    fn squared_error_forest_is_supported() {
        let forest = ForestConfig::default()
            .with_n_estimators(5)
            .with_criterion(Criterion::SquaredError);
        let mut model = TwoStageForecaster::new(ForecasterConfig::default().with_forest(forest));
        model.fit(&daily((0..60).map(|i| (i as f64).sqrt()).collect())).unwrap();
        assert!(model.predict(7).unwrap().values().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn config_loads_from_partial_json() {
        let config: ForecasterConfig =
            serde_json::from_str(r#"{"trend_order": 1, "horizon": 7, "forest": {"seed": 3}}"#)
                .unwrap();
        assert_eq!(config.trend_order, 1);
        assert_eq!(config.horizon.get(), 7);
        assert_eq!(config.forest.seed, 3);
        assert_eq!(config.forest.n_estimators, 50);
        assert_eq!(config.yearly_fourier_order, 4);

        let bad = serde_json::from_str::<ForecasterConfig>(r#"{"horizon": 0}"#);
        assert!(bad.is_err());
    }
}
