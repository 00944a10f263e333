//! Forecast result structure for holding predictions.

use chrono::{DateTime, Utc};

/// Point forecasts aligned to the buckets following the training range.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Forecast {
    timestamps: Vec<DateTime<Utc>>,
    point: Vec<f64>,
}

impl Forecast {
    /// Create an empty forecast.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a forecast from timestamps and point predictions of equal
    /// length.
    pub fn from_parts(timestamps: Vec<DateTime<Utc>>, point: Vec<f64>) -> Self {
        debug_assert_eq!(timestamps.len(), point.len());
        Self { timestamps, point }
    }

    /// Create a forecast without a time axis.
    pub fn from_values(point: Vec<f64>) -> Self {
        Self {
            timestamps: Vec::new(),
            point,
        }
    }

    /// Get the forecast horizon (number of steps).
    pub fn horizon(&self) -> usize {
        self.point.len()
    }

    /// Check if forecast is empty.
    pub fn is_empty(&self) -> bool {
        self.point.is_empty()
    }

    /// Point predictions in chronological order.
    pub fn values(&self) -> &[f64] {
        &self.point
    }

    /// Timestamps of the forecasted buckets; empty for models without a
    /// time axis.
    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    /// Iterate `(timestamp, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (DateTime<Utc>, f64)> + '_ {
        self.timestamps.iter().copied().zip(self.point.iter().copied())
    }

    /// Consume the forecast, returning the point predictions.
    pub fn into_values(self) -> Vec<f64> {
        self.point
    }
}
