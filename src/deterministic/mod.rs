//! Deterministic feature builders.
//!
//! A [`DeterministicProcess`] turns a regular time index into a design
//! matrix of polynomial trend, seasonal dummy and calendar Fourier columns.
//! Features depend only on the timestamp and its position relative to the
//! training start, so the same process extends to future buckets without
//! any knowledge of the observed values.

mod calendar;
mod design;
mod process;

pub use calendar::{CalendarFourier, CalendarPeriod};
pub use design::DesignMatrix;
pub use process::{DeterministicProcess, DeterministicTerms};
