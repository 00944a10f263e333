//! Calendar-anchored Fourier terms.

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// A calendar cycle whose elapsed fraction drives Fourier features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CalendarPeriod {
    /// Calendar month.
    Month,
    /// Calendar year.
    Year,
}

impl CalendarPeriod {
    /// Pandas-style alias used in feature names.
    pub fn alias(self) -> &'static str {
        match self {
            CalendarPeriod::Month => "ME",
            CalendarPeriod::Year => "YE",
        }
    }

    /// Fraction in `[0, 1)` of this period elapsed at `timestamp`.
    pub fn fraction_elapsed(self, timestamp: DateTime<Utc>) -> f64 {
        let day_fraction = timestamp.num_seconds_from_midnight() as f64 / 86_400.0;
        let year = timestamp.year();
        let (elapsed_days, length_days) = match self {
            CalendarPeriod::Month => (timestamp.day0(), days_in_month(year, timestamp.month())),
            CalendarPeriod::Year => (timestamp.ordinal0(), if is_leap(year) { 366 } else { 365 }),
        };
        (elapsed_days as f64 + day_fraction) / length_days as f64
    }
}

fn is_leap(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        4 | 6 | 9 | 11 => 30,
        2 if is_leap(year) => 29,
        2 => 28,
        _ => 31,
    }
}

/// `order` sine/cosine pairs over one calendar period.
///
/// For harmonic `k` the features are `sin(2πk·r)` and `cos(2πk·r)` where `r`
/// is the fraction of the period elapsed, emitted as sin then cos for
/// k = 1..=order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarFourier {
    pub period: CalendarPeriod,
    pub order: usize,
}

impl CalendarFourier {
    pub fn new(period: CalendarPeriod, order: usize) -> Self {
        Self { period, order }
    }

    pub fn monthly(order: usize) -> Self {
        Self::new(CalendarPeriod::Month, order)
    }

    pub fn yearly(order: usize) -> Self {
        Self::new(CalendarPeriod::Year, order)
    }

    pub fn column_names(&self) -> Vec<String> {
        let alias = self.period.alias();
        (1..=self.order)
            .flat_map(|k| [format!("sin({k},freq={alias})"), format!("cos({k},freq={alias})")])
            .collect()
    }

    /// Append this block's features for `timestamp` to `row`.
    pub fn extend_row(&self, timestamp: DateTime<Utc>, row: &mut Vec<f64>) {
        let r = self.period.fraction_elapsed(timestamp);
        for k in 1..=self.order {
            let angle = 2.0 * PI * k as f64 * r;
            row.push(angle.sin());
            row.push(angle.cos());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn period_starts_have_zero_fraction() {
        assert_relative_eq!(CalendarPeriod::Month.fraction_elapsed(at(2024, 3, 1, 0)), 0.0);
        assert_relative_eq!(CalendarPeriod::Year.fraction_elapsed(at(2023, 1, 1, 0)), 0.0);
    }

    #[test]
    fn fractions_account_for_month_and_leap_lengths() {
        assert_relative_eq!(
            CalendarPeriod::Month.fraction_elapsed(at(2024, 2, 15, 12)),
            14.5 / 29.0,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            CalendarPeriod::Month.fraction_elapsed(at(2023, 2, 15, 12)),
            14.5 / 28.0,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            CalendarPeriod::Year.fraction_elapsed(at(2024, 12, 31, 0)),
            365.0 / 366.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn fourier_block_layout_and_names() {
        let block = CalendarFourier::monthly(2);
        assert_eq!(
            block.column_names(),
            vec!["sin(1,freq=ME)", "cos(1,freq=ME)", "sin(2,freq=ME)", "cos(2,freq=ME)"]
        );

        let mut row = Vec::new();
        block.extend_row(at(2024, 3, 1, 0), &mut row);
        assert_eq!(row.len(), 4);
        assert_relative_eq!(row[0], 0.0);
        assert_relative_eq!(row[1], 1.0);
        assert_relative_eq!(row[2], 0.0);
        assert_relative_eq!(row[3], 1.0);
    }
}
