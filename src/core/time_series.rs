//! TimeSeries data structure for representing bucketed listening data.

use crate::core::Frequency;
use crate::error::{ForecastError, Result};
use chrono::{DateTime, Utc};

/// A time series with strictly increasing timestamps and one or more value
/// columns.
///
/// The first column is the *primary* column; single-target models such as
/// [`TwoStageForecaster`](crate::models::TwoStageForecaster) read only that
/// one. Use [`TimeSeries::column`] to project a labelled column into a
/// univariate series.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    timestamps: Vec<DateTime<Utc>>,
    /// Values stored in column-major format: values[column][observation]
    values: Vec<Vec<f64>>,
    labels: Vec<String>,
    frequency: Option<Frequency>,
}

/// Builder for constructing TimeSeries.
#[derive(Debug, Clone, Default)]
pub struct TimeSeriesBuilder {
    timestamps: Vec<DateTime<Utc>>,
    values: Vec<Vec<f64>>,
    labels: Vec<String>,
    frequency: Option<Frequency>,
}

impl TimeSeriesBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timestamps(mut self, timestamps: Vec<DateTime<Utc>>) -> Self {
        self.timestamps = timestamps;
        self
    }

    /// Set univariate values.
    pub fn values(mut self, values: Vec<f64>) -> Self {
        self.values = vec![values];
        self
    }

    /// Append a labelled column.
    pub fn column(mut self, label: impl Into<String>, values: Vec<f64>) -> Self {
        self.labels.push(label.into());
        self.values.push(values);
        self
    }

    pub fn frequency(mut self, freq: Frequency) -> Self {
        self.frequency = Some(freq);
        self
    }

    pub fn build(self) -> Result<TimeSeries> {
        TimeSeries::new(self.timestamps, self.values, self.labels, self.frequency)
    }
}

impl TimeSeries {
    /// Create a new TimeSeries from column-major values.
    ///
    /// Timestamps must be strictly increasing, every column must have one
    /// value per timestamp and, when labels are given, one label per column.
    /// A declared frequency must match every gap in the index.
    pub fn new(
        timestamps: Vec<DateTime<Utc>>,
        values: Vec<Vec<f64>>,
        labels: Vec<String>,
        frequency: Option<Frequency>,
    ) -> Result<Self> {
        for i in 1..timestamps.len() {
            if timestamps[i] <= timestamps[i - 1] {
                return Err(ForecastError::malformed(
                    "timestamps must be strictly increasing",
                ));
            }
        }

        for column in &values {
            if column.len() != timestamps.len() {
                return Err(ForecastError::DimensionMismatch {
                    expected: timestamps.len(),
                    got: column.len(),
                });
            }
        }

        if !labels.is_empty() && labels.len() != values.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: values.len(),
                got: labels.len(),
            });
        }

        if let Some(freq) = frequency {
            let width = freq.to_duration();
            if timestamps.windows(2).any(|w| w[1] - w[0] != width) {
                return Err(ForecastError::malformed(format!(
                    "index is not regular at declared frequency {freq}"
                )));
            }
        }

        Ok(Self {
            timestamps,
            values,
            labels,
            frequency,
        })
    }

    /// Create a simple univariate time series.
    pub fn univariate(timestamps: Vec<DateTime<Utc>>, values: Vec<f64>) -> Result<Self> {
        Self::new(timestamps, vec![values], vec![], None)
    }

    /// Create a univariate series on a regular grid starting at `start`.
    pub fn regular(start: DateTime<Utc>, frequency: Frequency, values: Vec<f64>) -> Result<Self> {
        let timestamps = (0..values.len() as i64)
            .map(|i| frequency.advance(start, i))
            .collect::<Result<Vec<_>>>()?;
        Self::new(timestamps, vec![values], vec![], Some(frequency))
    }

    /// Get the number of observations.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Check if the series is empty.
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Get the number of value columns.
    pub fn dimensions(&self) -> usize {
        self.values.len()
    }

    /// Get timestamps.
    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    /// First timestamp of the index.
    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.timestamps.first().copied()
    }

    /// Last timestamp of the index.
    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.timestamps.last().copied()
    }

    /// Get values for a specific column.
    pub fn values(&self, dimension: usize) -> Result<&[f64]> {
        self.values
            .get(dimension)
            .map(|v| v.as_slice())
            .ok_or(ForecastError::InvalidParameter(format!(
                "column index {dimension} out of bounds ({} columns)",
                self.values.len()
            )))
    }

    /// Get primary (first column) values.
    pub fn primary_values(&self) -> &[f64] {
        self.values.first().map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Get column labels.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Values of the column carrying `label`.
    pub fn values_by_label(&self, label: &str) -> Option<&[f64]> {
        self.labels
            .iter()
            .position(|l| l == label)
            .map(|i| self.values[i].as_slice())
    }

    /// Project one labelled column into a univariate series sharing this
    /// index and frequency.
    pub fn column(&self, label: &str) -> Result<TimeSeries> {
        let values = self.values_by_label(label).ok_or_else(|| {
            ForecastError::InvalidParameter(format!(
                "no column '{label}' (available: {:?})",
                self.labels
            ))
        })?;

        Ok(TimeSeries {
            timestamps: self.timestamps.clone(),
            values: vec![values.to_vec()],
            labels: vec![label.to_string()],
            frequency: self.frequency,
        })
    }

    /// Get the declared frequency.
    pub fn frequency(&self) -> Option<Frequency> {
        self.frequency
    }

    /// Declare a frequency; fails if the index does not follow it.
    pub fn set_frequency(&mut self, freq: Frequency) -> Result<()> {
        let width = freq.to_duration();
        if self.timestamps.windows(2).any(|w| w[1] - w[0] != width) {
            return Err(ForecastError::malformed(format!(
                "index is not regular at frequency {freq}"
            )));
        }
        self.frequency = Some(freq);
        Ok(())
    }

    /// Frequency of a gap-free index.
    ///
    /// Returns the declared frequency, or the spacing shared by every
    /// consecutive pair of timestamps. A single-observation series without a
    /// declared frequency has no spacing to infer from.
    pub fn regular_frequency(&self) -> Result<Frequency> {
        if let Some(freq) = self.frequency {
            return Ok(freq);
        }
        if self.len() < 2 {
            return Err(ForecastError::malformed(
                "cannot infer frequency of a series with fewer than 2 observations",
            ));
        }

        let width = self.timestamps[1] - self.timestamps[0];
        if self.timestamps.windows(2).any(|w| w[1] - w[0] != width) {
            return Err(ForecastError::malformed(
                "index has gaps or irregular spacing",
            ));
        }
        Frequency::from_duration(width)
    }

    /// The `horizon` timestamps following the end of the index.
    pub fn future_timestamps(&self, horizon: usize) -> Result<Vec<DateTime<Utc>>> {
        let freq = self.regular_frequency()?;
        let last = self
            .end()
            .ok_or_else(|| ForecastError::malformed("empty series has no end"))?;
        freq.future_grid(last, horizon)
    }

    /// Extract a slice of the time series.
    pub fn slice(&self, start: usize, end: usize) -> Result<TimeSeries> {
        if start > end || end > self.len() {
            return Err(ForecastError::InvalidParameter(format!(
                "invalid slice {start}..{end} of series with {} observations",
                self.len()
            )));
        }

        Ok(TimeSeries {
            timestamps: self.timestamps[start..end].to_vec(),
            values: self
                .values
                .iter()
                .map(|col| col[start..end].to_vec())
                .collect(),
            labels: self.labels.clone(),
            frequency: self.frequency,
        })
    }

}
