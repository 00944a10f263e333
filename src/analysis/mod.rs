//! Diagnostics for listening series: stationarity and spectral content.

mod adf;
mod periodogram;

pub use adf::{adf_test, mackinnon_p_value, AdfResult, CriticalValues, DEFAULT_MAX_LAG};
pub use periodogram::{Detrend, Periodogram, ANNUAL_CYCLES};
