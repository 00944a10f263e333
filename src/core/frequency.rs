//! Fixed-width bucket frequency.

use crate::error::{ForecastError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Width of one time bucket.
///
/// Only fixed-width frequencies are representable (seconds up to weeks);
/// calendar frequencies such as month-end have no constant width and are
/// rejected by the parser.
///
/// # Example
/// ```
/// use scrobble_forecast::core::Frequency;
///
/// let daily: Frequency = "1D".parse().unwrap();
/// assert_eq!(daily, Frequency::daily());
/// assert_eq!("1 day".parse::<Frequency>().unwrap(), daily);
/// assert_eq!(daily.to_string(), "1D");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Frequency {
    seconds: i64,
}

impl Frequency {
    /// Build a frequency from a positive duration.
    pub fn from_duration(width: Duration) -> Result<Self> {
        let seconds = width.num_seconds();
        if seconds <= 0 || Duration::try_seconds(seconds) != Some(width) {
            return Err(ForecastError::InvalidParameter(format!(
                "frequency must be a positive whole number of seconds, got {width}"
            )));
        }
        Ok(Self { seconds })
    }

    pub fn seconds(n: i64) -> Result<Self> {
        let width = Duration::try_seconds(n).ok_or_else(|| {
            ForecastError::InvalidParameter(format!("frequency of {n} seconds is out of range"))
        })?;
        Self::from_duration(width)
    }

    pub fn minutes(n: i64) -> Result<Self> {
        Self::seconds(n.saturating_mul(60))
    }

    pub fn hours(n: i64) -> Result<Self> {
        Self::seconds(n.saturating_mul(3_600))
    }

    pub fn days(n: i64) -> Result<Self> {
        Self::seconds(n.saturating_mul(86_400))
    }

    pub fn hourly() -> Self {
        Self { seconds: 3_600 }
    }

    pub fn daily() -> Self {
        Self { seconds: 86_400 }
    }

    pub fn weekly() -> Self {
        Self { seconds: 7 * 86_400 }
    }

    /// Bucket width as a duration.
    pub fn to_duration(&self) -> Duration {
        Duration::seconds(self.seconds)
    }

    /// Bucket width in seconds.
    pub fn num_seconds(&self) -> i64 {
        self.seconds
    }

    /// Timestamp `steps` buckets after `from`.
    ///
    /// Fails with `ComputationError` when the result is outside the range
    /// chrono can represent.
    pub fn advance(&self, from: DateTime<Utc>, steps: i64) -> Result<DateTime<Utc>> {
        self.seconds
            .checked_mul(steps)
            .and_then(Duration::try_seconds)
            .and_then(|offset| from.checked_add_signed(offset))
            .ok_or_else(|| {
                ForecastError::ComputationError(format!(
                    "{steps} buckets of {self} from {from} leave the representable time range"
                ))
            })
    }

    /// The `steps` timestamps following `last`, one bucket apart.
    ///
    /// The last timestamp is checked first, so a horizon running past the
    /// representable range fails with `InvalidHorizon` before anything is
    /// allocated.
    pub fn future_grid(&self, last: DateTime<Utc>, steps: usize) -> Result<Vec<DateTime<Utc>>> {
        let n = i64::try_from(steps).map_err(|_| ForecastError::InvalidHorizon(i64::MAX))?;
        self.advance(last, n)
            .map_err(|_| ForecastError::InvalidHorizon(n))?;
        (1..=n).map(|h| self.advance(last, h)).collect()
    }

    /// Start of the bucket containing `timestamp`, for buckets laid out
    /// from `origin` in steps of this width.
    pub fn bucket_start(
        &self,
        origin: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    ) -> Result<DateTime<Utc>> {
        self.advance(origin, self.bucket_index(origin, timestamp))
    }

    /// Index of the bucket containing `timestamp`; negative before `origin`.
    pub fn bucket_index(&self, origin: DateTime<Utc>, timestamp: DateTime<Utc>) -> i64 {
        (timestamp - origin).num_seconds().div_euclid(self.seconds)
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.seconds;
        if s % 86_400 == 0 {
            write!(f, "{}D", s / 86_400)
        } else if s % 3_600 == 0 {
            write!(f, "{}H", s / 3_600)
        } else if s % 60 == 0 {
            write!(f, "{}min", s / 60)
        } else {
            write!(f, "{}s", s)
        }
    }
}

impl FromStr for Frequency {
    type Err = ForecastError;

    /// Parse pandas-style aliases (`"D"`, `"7D"`, `"H"`, `"30min"`, `"W"`)
    /// and spelled-out widths (`"1 day"`, `"2 hours"`).
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let split = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        let (num, unit) = trimmed.split_at(split);

        let count: i64 = if num.is_empty() {
            1
        } else {
            num.parse()
                .map_err(|_| ForecastError::InvalidParameter(format!("bad frequency '{s}'")))?
        };

        let unit_seconds = match unit.trim().to_lowercase().as_str() {
            "s" | "sec" | "secs" | "second" | "seconds" => 1,
            "t" | "min" | "mins" | "minute" | "minutes" => 60,
            "h" | "hr" | "hour" | "hours" | "hourly" => 3_600,
            "d" | "day" | "days" | "daily" => 86_400,
            "w" | "week" | "weeks" | "weekly" => 7 * 86_400,
            other => {
                return Err(ForecastError::InvalidParameter(format!(
                    "unsupported frequency unit '{other}' in '{s}' (fixed-width units only)"
                )))
            }
        };

        Self::seconds(count.saturating_mul(unit_seconds))
    }
}

impl TryFrom<String> for Frequency {
    type Error = ForecastError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Frequency> for String {
    fn from(freq: Frequency) -> Self {
        freq.to_string()
    }
}

impl Default for Frequency {
    fn default() -> Self {
        Self::daily()
    }
}
