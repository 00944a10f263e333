//! Validated forecast horizon.

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};

/// Number of future buckets to forecast; always at least 1.
///
/// ```
/// use scrobble_forecast::core::Horizon;
/// use scrobble_forecast::ForecastError;
///
/// assert_eq!(Horizon::try_from(4i64).unwrap().get(), 4);
/// assert_eq!(Horizon::try_from(-3i64), Err(ForecastError::InvalidHorizon(-3)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Horizon(usize);

impl Horizon {
    /// Validate an unsigned step count.
    pub fn new(steps: usize) -> Result<Self> {
        if steps == 0 {
            return Err(ForecastError::InvalidHorizon(0));
        }
        Ok(Self(steps))
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for Horizon {
    fn default() -> Self {
        Self(4)
    }
}

impl TryFrom<i64> for Horizon {
    type Error = ForecastError;

    fn try_from(steps: i64) -> Result<Self> {
        if steps < 1 {
            return Err(ForecastError::InvalidHorizon(steps));
        }
        usize::try_from(steps)
            .map(Self)
            .map_err(|_| ForecastError::InvalidHorizon(steps))
    }
}

impl TryFrom<usize> for Horizon {
    type Error = ForecastError;

    fn try_from(steps: usize) -> Result<Self> {
        Self::new(steps)
    }
}

impl From<Horizon> for i64 {
    fn from(h: Horizon) -> Self {
        h.0 as i64
    }
}

impl From<Horizon> for usize {
    fn from(h: Horizon) -> Self {
        h.0
    }
}
