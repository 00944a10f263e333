//! # scrobble-forecast
//!
//! Listening-history forecasting: play events are resampled into a
//! fixed-frequency series of distinct artists, distinct albums and plays,
//! then forecast with a two-stage model that fits a polynomial trend by
//! least squares and a calendar-seasonal residual with a random forest.
//!
//! ```
//! use scrobble_forecast::prelude::*;
//! use chrono::{TimeZone, Utc};
//!
//! let day = |d, h| Utc.with_ymd_and_hms(2024, 5, d, h, 0, 0).unwrap();
//! let events = vec![
//!     Event::new("Low", "Double Negative", "Quorum", day(1, 9)),
//!     Event::new("Low", "Double Negative", "Dancing and Blood", day(1, 10)),
//!     Event::new("Nina Simone", "Pastel Blues", "Sinnerman", day(2, 21)),
//!     Event::new("Low", "HEY WHAT", "White Horses", day(4, 8)),
//! ];
//!
//! let listening = resample(&events, Frequency::daily()).unwrap();
//! let plays = ListeningMetric::Track.select(&listening).unwrap();
//! assert_eq!(plays.primary_values(), &[2.0, 1.0, 0.0, 1.0]);
//!
//! let mut model = TwoStageForecaster::default();
//! model.fit(&plays).unwrap();
//! let forecast = model.predict(2).unwrap();
//! assert_eq!(forecast.timestamps(), &[day(5, 0), day(6, 0)]);
//! ```

#![allow(clippy::upper_case_acronyms)]
#![allow(clippy::needless_range_loop)]

pub mod analysis;
pub mod core;
pub mod deterministic;
pub mod error;
pub mod models;
pub mod regression;
pub mod resample;
pub mod utils;

pub use error::{ForecastError, Result};

pub mod prelude {
    pub use crate::core::{Forecast, Frequency, Horizon, TimeSeries};
    pub use crate::deterministic::{DeterministicProcess, DeterministicTerms};
    pub use crate::error::{ForecastError, Result};
    pub use crate::models::{Forecaster, ForecasterConfig, TwoStageForecaster};
    pub use crate::regression::{ForestConfig, Regressor};
    pub use crate::resample::{resample, Event, ListeningMetric, ResampleConfig};
}
