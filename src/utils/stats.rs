//! Small descriptive statistics helpers.

/// Arithmetic mean; NaN for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Median of an already sorted slice.
pub fn median_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        0.5 * (sorted[n / 2 - 1] + sorted[n / 2])
    }
}

/// Sum of absolute deviations from the median of a sorted slice.
pub fn abs_deviation_sorted(sorted: &[f64]) -> f64 {
    let m = median_sorted(sorted);
    sorted.iter().map(|v| (v - m).abs()).sum()
}
