//! Forecaster trait defining the common interface for all models.

use crate::core::{Forecast, TimeSeries};
use crate::error::Result;

/// Common interface for forecasting models.
///
/// This trait is object-safe and can be used with `Box<dyn Forecaster>`.
pub trait Forecaster {
    /// Fit the model to the primary value column of `series`.
    fn fit(&mut self, series: &TimeSeries) -> Result<()>;

    /// Forecast the `horizon` buckets following the training range.
    fn predict(&self, horizon: usize) -> Result<Forecast>;

    /// In-sample predictions.
    fn fitted_values(&self) -> Option<&[f64]>;

    /// Residuals (actual - fitted).
    fn residuals(&self) -> Option<&[f64]>;

    fn name(&self) -> &str;

    fn is_fitted(&self) -> bool {
        self.fitted_values().is_some()
    }
}

/// Type alias for boxed forecaster trait objects.
///
/// # Example
///
/// ```
/// use scrobble_forecast::models::{BoxedForecaster, Forecaster, TwoStageForecaster};
/// use scrobble_forecast::models::arima::ARIMA;
///
/// let models: Vec<BoxedForecaster> = vec![
///     Box::new(TwoStageForecaster::default()),
///     Box::new(ARIMA::new(1, 1, 1)),
/// ];
/// assert!(models.iter().all(|m| !m.is_fitted()));
/// ```
pub type BoxedForecaster = Box<dyn Forecaster>;
