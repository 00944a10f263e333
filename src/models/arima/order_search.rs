//! Exhaustive ARIMA order selection by AIC.

use crate::core::{Forecast, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::arima::model::{ARIMASpec, ARIMA};
use crate::models::Forecaster;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use tracing::{debug, warn};

/// Inclusive order ranges searched by [`OrderSearch`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderSearchConfig {
    pub p: RangeInclusive<usize>,
    pub d: RangeInclusive<usize>,
    pub q: RangeInclusive<usize>,
}

impl Default for OrderSearchConfig {
    fn default() -> Self {
        Self {
            p: 0..=4,
            d: 0..=4,
            q: 1..=5,
        }
    }
}

impl OrderSearchConfig {
    /// Set all three order ranges.
    pub fn with_ranges(
        mut self,
        p: RangeInclusive<usize>,
        d: RangeInclusive<usize>,
        q: RangeInclusive<usize>,
    ) -> Self {
        self.p = p;
        self.d = d;
        self.q = q;
        self
    }

    /// Candidate orders in search order: AR outermost, then MA, then
    /// differencing.
    pub fn candidates(&self) -> Vec<ARIMASpec> {
        let mut orders = Vec::new();
        for p in self.p.clone() {
            for q in self.q.clone() {
                for d in self.d.clone() {
                    orders.push(ARIMASpec::new(p, d, q));
                }
            }
        }
        orders
    }
}

/// Fits every candidate order and keeps the one with the lowest finite AIC.
///
/// Candidates that fail to fit are recorded and skipped. Ties keep the
/// earlier candidate.
///
/// # Example
/// ```
/// use scrobble_forecast::models::arima::{OrderSearch, OrderSearchConfig};
///
/// let values: Vec<f64> = (0..60).map(|i| 20.0 + (i as f64 * 0.4).sin() * 3.0).collect();
/// let mut search = OrderSearch::new(OrderSearchConfig::default().with_ranges(0..=1, 0..=1, 1..=2));
/// search.search(&values).unwrap();
///
/// assert_eq!(search.scores().len() + search.failures().len(), 8);
/// assert!(search.best_aic().unwrap().is_finite());
/// ```
#[derive(Debug, Clone, Default)]
pub struct OrderSearch {
    config: OrderSearchConfig,
    selected: Option<ARIMA>,
    scores: Vec<(ARIMASpec, f64)>,
    failures: Vec<(ARIMASpec, ForecastError)>,
}

impl OrderSearch {
    pub fn new(config: OrderSearchConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &OrderSearchConfig {
        &self.config
    }

    /// Search over raw values.
    pub fn search(&mut self, values: &[f64]) -> Result<&ARIMA> {
        self.run(|model| model.fit_values(values))
    }

    /// Search over the primary column of `series`; forecasts of the selected
    /// model carry timestamps when the index is regular.
    pub fn search_series(&mut self, series: &TimeSeries) -> Result<&ARIMA> {
        self.run(|model| model.fit(series))
    }

    fn run<F>(&mut self, mut fit: F) -> Result<&ARIMA>
    where
        F: FnMut(&mut ARIMA) -> Result<()>,
    {
        let mut best: Option<(ARIMA, f64)> = None;
        let mut scores = Vec::new();
        let mut failures = Vec::new();

        for order in self.config.candidates() {
            let mut model = ARIMA::from_spec(order);
            let aic = match fit(&mut model) {
                Ok(()) => model.aic().unwrap_or(f64::NAN),
                Err(err) => {
                    warn!(%order, error = %err, "skipping arima candidate");
                    failures.push((order, err));
                    continue;
                }
            };
            if !aic.is_finite() {
                warn!(%order, aic, "skipping arima candidate with non-finite aic");
                failures.push((
                    order,
                    ForecastError::ComputationError(format!("non-finite AIC {aic}")),
                ));
                continue;
            }
            scores.push((order, aic));
            if best.as_ref().map_or(true, |(_, best_aic)| aic < *best_aic) {
                best = Some((model, aic));
            }
        }

        let (model, aic) = best.ok_or_else(|| {
            ForecastError::ComputationError(format!(
                "none of {} candidate orders could be fitted",
                failures.len()
            ))
        })?;
        debug!(
            order = %model.spec(),
            aic,
            evaluated = scores.len(),
            failed = failures.len(),
            "selected arima order"
        );

        self.scores = scores;
        self.failures = failures;
        Ok(&*self.selected.insert(model))
    }

    pub fn selected_model(&self) -> Option<&ARIMA> {
        self.selected.as_ref()
    }

    pub fn selected_order(&self) -> Option<ARIMASpec> {
        self.selected.as_ref().map(|m| m.spec())
    }

    pub fn best_aic(&self) -> Option<f64> {
        self.selected.as_ref().and_then(|m| m.aic())
    }

    /// AIC of every candidate that fitted, in search order.
    pub fn scores(&self) -> &[(ARIMASpec, f64)] {
        &self.scores
    }

    /// Candidates that failed, with the reason.
    pub fn failures(&self) -> &[(ARIMASpec, ForecastError)] {
        &self.failures
    }
}

impl Forecaster for OrderSearch {
    fn fit(&mut self, series: &TimeSeries) -> Result<()> {
        self.search_series(series).map(|_| ())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        self.selected
            .as_ref()
            .ok_or(ForecastError::UnfittedModel)?
            .predict(horizon)
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.selected.as_ref().and_then(|m| m.fitted_values())
    }

    fn residuals(&self) -> Option<&[f64]> {
        self.selected.as_ref().and_then(|m| m.residuals())
    }

    fn name(&self) -> &str {
        "OrderSearch"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Frequency;
    use chrono::{TimeZone, Utc};

    fn seasonal_values(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 50.0 + 0.2 * i as f64 + 5.0 * (i as f64 * 0.9).sin())
            .collect()
    }

    #[test]
    fn default_grid_covers_every_order() {
        let config = OrderSearchConfig::default();
        let candidates = config.candidates();
        assert_eq!(candidates.len(), 5 * 5 * 5);
        assert_eq!(candidates[0], ARIMASpec::new(0, 0, 1));
        assert_eq!(candidates[1], ARIMASpec::new(0, 1, 1));
        assert_eq!(candidates[5], ARIMASpec::new(0, 0, 2));
        assert_eq!(candidates[124], ARIMASpec::new(4, 4, 5));
    }

    #[test]
    fn selects_lowest_aic() {
        let mut search = OrderSearch::new(
            OrderSearchConfig::default().with_ranges(0..=2, 0..=1, 1..=2),
        );
        let selected = search.search(&seasonal_values(80)).unwrap().spec();

        let min_aic = search
            .scores()
            .iter()
            .map(|(_, aic)| *aic)
            .fold(f64::INFINITY, f64::min);
        assert_eq!(search.best_aic(), Some(min_aic));
        assert_eq!(search.selected_order(), Some(selected));
    }

    #[test]
    fn skips_candidates_that_cannot_fit() {
        // (2, 2, 3) needs 7 observations; (0, 0, 1) needs 3.
        let mut search = OrderSearch::new(
            OrderSearchConfig::default().with_ranges(0..=2, 0..=2, 1..=3),
        );
        search.search(&[3.0, 1.0, 4.0, 1.0, 5.0, 9.0]).unwrap();
        assert!(search
            .failures()
            .iter()
            .any(|(order, e)| *order == ARIMASpec::new(2, 2, 3)
                && matches!(e, ForecastError::InsufficientData { needed: 7, got: 6 })));
        assert!(search.selected_model().is_some());
    }

    #[test]
    fn constant_series_still_selects_a_model() {
        let mut search = OrderSearch::new(
            OrderSearchConfig::default().with_ranges(0..=1, 0..=1, 1..=1),
        );
        search.search(&[5.0; 40]).unwrap();
        assert!(search.failures().is_empty());
        assert_eq!(search.scores().len(), 4);
        assert!(search.best_aic().unwrap().is_finite());
    }

    #[test]
    fn fails_when_no_candidate_fits() {
        let mut search = OrderSearch::new(OrderSearchConfig::default());
        let err = search.search(&[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, ForecastError::ComputationError(_)));
        assert!(search.selected_model().is_none());
    }

    #[test]
    fn forecasts_through_the_selected_model() {
        let start = Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap();
        let series = TimeSeries::regular(start, Frequency::daily(), seasonal_values(60)).unwrap();
        let mut search = OrderSearch::new(
            OrderSearchConfig::default().with_ranges(0..=1, 0..=1, 1..=1),
        );
        assert!(matches!(search.predict(2), Err(ForecastError::UnfittedModel)));

        search.fit(&series).unwrap();
        let forecast = search.predict(2).unwrap();
        assert_eq!(forecast.horizon(), 2);
        assert_eq!(
            forecast.timestamps()[0],
            Utc.with_ymd_and_hms(2023, 7, 31, 0, 0, 0).unwrap()
        );
        assert!(search.is_fitted());
    }

    #[test]
    fn config_deserializes_ranges() {
        let config: OrderSearchConfig =
            serde_json::from_str(r#"{"p": {"start": 0, "end": 2}}"#).unwrap();
        assert_eq!(config.p, 0..=2);
        assert_eq!(config.q, 1..=5);
    }
}
