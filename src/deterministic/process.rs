//! Deterministic processes: design matrices that depend only on time.

use crate::core::{Frequency, TimeSeries};
use crate::deterministic::{CalendarFourier, DesignMatrix};
use crate::error::{ForecastError, Result};
use crate::utils::linalg::independent_columns;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Which deterministic regressors a process emits.
///
/// Column order is fixed: constant, trend powers `t^1..t^order`, seasonal
/// dummies, then each calendar Fourier block in the order given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeterministicTerms {
    /// Emit an explicit `const` column of ones.
    pub constant: bool,
    /// Highest power of the time index.
    pub order: usize,
    /// Emit one indicator per position in a cycle of this many buckets.
    pub seasonal_period: Option<usize>,
    /// Calendar Fourier blocks.
    pub fourier: Vec<CalendarFourier>,
}

impl Default for DeterministicTerms {
    fn default() -> Self {
        Self {
            constant: true,
            order: 0,
            seasonal_period: None,
            fourier: Vec::new(),
        }
    }
}

impl DeterministicTerms {
    /// Constant plus polynomial trend up to `order`.
    pub fn trend(order: usize) -> Self {
        Self {
            constant: true,
            order,
            ..Self::default()
        }
    }

    /// Monthly and yearly Fourier blocks, no constant and no trend.
    pub fn calendar_seasonal(monthly_order: usize, yearly_order: usize) -> Self {
        let fourier = [
            CalendarFourier::monthly(monthly_order),
            CalendarFourier::yearly(yearly_order),
        ]
        .into_iter()
        .filter(|f| f.order > 0)
        .collect();
        Self {
            constant: false,
            order: 0,
            seasonal_period: None,
            fourier,
        }
    }

    pub fn with_seasonal_dummies(mut self, period: Option<usize>) -> Self {
        self.seasonal_period = period.filter(|&p| p > 1);
        self
    }

    /// Names of every column before any are dropped.
    pub fn column_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        if self.constant {
            names.push("const".to_string());
        }
        for power in 1..=self.order {
            names.push(match power {
                1 => "trend".to_string(),
                2 => "trend_squared".to_string(),
                p => format!("trend**{p}"),
            });
        }
        if let Some(period) = self.seasonal_period {
            names.extend((1..=period).map(|s| format!("s({s},{period})")));
        }
        for block in &self.fourier {
            names.extend(block.column_names());
        }
        names
    }

    /// Full feature row for the bucket at zero-based `position` whose
    /// timestamp is `timestamp`.
    fn row(&self, position: i64, timestamp: DateTime<Utc>) -> Vec<f64> {
        let mut row = Vec::new();
        if self.constant {
            row.push(1.0);
        }
        let t = (position + 1) as f64;
        for power in 1..=self.order {
            row.push(t.powi(power as i32));
        }
        if let Some(period) = self.seasonal_period {
            let slot = position.rem_euclid(period as i64) as usize;
            row.extend((0..period).map(|s| if s == slot { 1.0 } else { 0.0 }));
        }
        for block in &self.fourier {
            block.extend_row(timestamp, &mut row);
        }
        row
    }
}

/// A deterministic process anchored to a training index.
///
/// The anchor (first timestamp, bucket width and training length) plus the
/// terms and the retained column set fully determine every row, so
/// [`in_sample`](Self::in_sample), [`out_of_sample`](Self::out_of_sample) and
/// [`row_at`](Self::row_at) all apply the same rule.
///
/// # Example
/// ```
/// use scrobble_forecast::core::{Frequency, TimeSeries};
/// use scrobble_forecast::deterministic::{DeterministicProcess, DeterministicTerms};
/// use chrono::{TimeZone, Utc};
///
/// let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
/// let series = TimeSeries::regular(start, Frequency::daily(), vec![10.0, 12.0, 9.0, 11.0]).unwrap();
/// let dp = DeterministicProcess::from_series(&series, DeterministicTerms::trend(2), true).unwrap();
///
/// let future = dp.out_of_sample(2).unwrap();
/// assert_eq!(future.columns(), &["const", "trend", "trend_squared"]);
/// assert_eq!(future.row(0).unwrap(), &[1.0, 5.0, 25.0]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DeterministicProcess {
    start: DateTime<Utc>,
    frequency: Frequency,
    n_in_sample: usize,
    terms: DeterministicTerms,
    /// Indices into `terms.column_names()` that survive collinearity checks.
    retained: Vec<usize>,
    columns: Vec<String>,
}

impl DeterministicProcess {
    /// Anchor a process to a regular index.
    ///
    /// With `drop_collinear`, columns that are linear combinations of
    /// earlier columns over the in-sample range are removed, and stay
    /// removed out of sample.
    pub fn new(
        start: DateTime<Utc>,
        frequency: Frequency,
        n_in_sample: usize,
        terms: DeterministicTerms,
        drop_collinear: bool,
    ) -> Result<Self> {
        if n_in_sample == 0 {
            return Err(ForecastError::malformed(
                "deterministic process needs a non-empty index",
            ));
        }

        let last = i64::try_from(n_in_sample - 1)
            .map_err(|_| ForecastError::malformed("deterministic index is too long"))?;
        frequency.advance(start, last)?;

        let all_columns = terms.column_names();
        let mut process = Self {
            start,
            frequency,
            n_in_sample,
            retained: (0..all_columns.len()).collect(),
            columns: all_columns.clone(),
            terms,
        };

        if drop_collinear && !all_columns.is_empty() {
            let full = (0..=last)
                .map(|p| process.full_row(p))
                .collect::<Result<Vec<_>>>()?;
            let retained = independent_columns(&full);
            if retained.len() < all_columns.len() {
                let dropped: Vec<&str> = (0..all_columns.len())
                    .filter(|j| !retained.contains(j))
                    .map(|j| all_columns[j].as_str())
                    .collect();
                warn!(?dropped, n_in_sample, "dropping collinear deterministic columns");
            }
            process.columns = retained.iter().map(|&j| all_columns[j].clone()).collect();
            process.retained = retained;
        }

        debug!(
            columns = process.columns.len(),
            n_in_sample,
            frequency = %frequency,
            "built deterministic process"
        );
        Ok(process)
    }

    /// Anchor a process to the index of `series`, which must be regular.
    pub fn from_series(
        series: &TimeSeries,
        terms: DeterministicTerms,
        drop_collinear: bool,
    ) -> Result<Self> {
        let start = series
            .start()
            .ok_or_else(|| ForecastError::malformed("series is empty"))?;
        let frequency = series.regular_frequency()?;
        Self::new(start, frequency, series.len(), terms, drop_collinear)
    }

    pub fn terms(&self) -> &DeterministicTerms {
        &self.terms
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Number of in-sample buckets.
    pub fn n_in_sample(&self) -> usize {
        self.n_in_sample
    }

    /// Names of the retained columns.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Timestamp of the bucket at zero-based `position` (negative positions
    /// precede the training range).
    pub fn timestamp_at(&self, position: i64) -> Result<DateTime<Utc>> {
        self.frequency.advance(self.start, position)
    }

    /// Zero-based position of `timestamp`, which must lie on the grid.
    pub fn position_of(&self, timestamp: DateTime<Utc>) -> Result<i64> {
        let offset = (timestamp - self.start).num_seconds();
        let width = self.frequency.num_seconds();
        if offset % width != 0 || self.timestamp_at(offset / width).ok() != Some(timestamp) {
            return Err(ForecastError::malformed(format!(
                "{timestamp} is not on the {} grid anchored at {}",
                self.frequency, self.start
            )));
        }
        Ok(offset / width)
    }

    /// Feature row for the bucket at zero-based `position`.
    pub fn row_at(&self, position: i64) -> Result<Vec<f64>> {
        let full = self.full_row(position)?;
        Ok(self.retained.iter().map(|&j| full[j]).collect())
    }

    /// Feature row for a grid timestamp anywhere on the grid.
    pub fn row_for(&self, timestamp: DateTime<Utc>) -> Result<Vec<f64>> {
        self.row_at(self.position_of(timestamp)?)
    }

    /// Design matrix over the training range.
    pub fn in_sample(&self) -> Result<DesignMatrix> {
        self.range(0, self.n_in_sample as i64)
    }

    /// Design matrix for the `steps` buckets right after the training range.
    pub fn out_of_sample(&self, steps: usize) -> Result<DesignMatrix> {
        let (first, end) = self.future_positions(steps)?;
        self.range(first, end)
    }

    /// The `steps` timestamps following the training range.
    pub fn future_index(&self, steps: usize) -> Result<Vec<DateTime<Utc>>> {
        let (first, end) = self.future_positions(steps)?;
        (first..end).map(|p| self.timestamp_at(p)).collect()
    }

    /// Half-open positions of the `steps` buckets after the training range.
    /// The last bucket must have a representable timestamp.
    fn future_positions(&self, steps: usize) -> Result<(i64, i64)> {
        if steps == 0 {
            return Err(ForecastError::InvalidHorizon(0));
        }
        let horizon = i64::try_from(steps).map_err(|_| ForecastError::InvalidHorizon(i64::MAX))?;
        // n_in_sample fits in i64, checked by `new`
        let first = self.n_in_sample as i64;
        let end = first
            .checked_add(horizon)
            .ok_or(ForecastError::InvalidHorizon(horizon))?;
        self.timestamp_at(end - 1)
            .map_err(|_| ForecastError::InvalidHorizon(horizon))?;
        Ok((first, end))
    }

    fn full_row(&self, position: i64) -> Result<Vec<f64>> {
        Ok(self.terms.row(position, self.timestamp_at(position)?))
    }

    fn range(&self, from: i64, to: i64) -> Result<DesignMatrix> {
        let index = (from..to)
            .map(|p| self.timestamp_at(p))
            .collect::<Result<Vec<_>>>()?;
        let rows = (from..to)
            .map(|p| self.row_at(p))
            .collect::<Result<Vec<_>>>()?;
        Ok(DesignMatrix::from_parts_unchecked(self.columns.clone(), index, rows))
    }
}
