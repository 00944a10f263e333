//! Forecasting models.

mod traits;

pub mod arima;
pub mod two_stage;

pub use traits::{BoxedForecaster, Forecaster};
pub use two_stage::{Components, ForecasterConfig, TwoStageForecaster};
