//! Power spectrum of a regularly sampled series.

use crate::error::{ForecastError, Result};
use crate::utils::linalg::least_squares;
use crate::utils::stats::mean;
use rustfft::{num_complex::Complex64, FftPlanner};
use serde::{Deserialize, Serialize};

/// Trend removed before the transform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Detrend {
    None,
    /// Subtract the mean.
    Constant,
    /// Subtract a least-squares line.
    #[default]
    Linear,
}

/// Named cycles on a per-year frequency axis, as `(label, cycles per year)`.
pub const ANNUAL_CYCLES: [(&str, f64); 8] = [
    ("Annual", 1.0),
    ("Semiannual", 2.0),
    ("Quarterly", 4.0),
    ("Bimonthly", 6.0),
    ("Monthly", 12.0),
    ("Biweekly", 26.0),
    ("Weekly", 52.0),
    ("Semiweekly", 104.0),
];

/// One-sided power spectrum.
#[derive(Debug, Clone, PartialEq)]
pub struct Periodogram {
    /// Frequencies `k * fs / n` for `k = 0..=n/2`.
    pub frequencies: Vec<f64>,
    /// Power at each frequency, scaled as a power spectrum (units of x²).
    pub power: Vec<f64>,
}

impl Periodogram {
    /// Compute the spectrum of `signal` sampled `fs` times per unit.
    ///
    /// A boxcar window is used. Power is `|X_k|² / n²`, doubled for every
    /// bin except DC and (for even `n`) Nyquist, so a sinusoid of amplitude
    /// `a` at a bin frequency shows power `a² / 2`.
    pub fn compute(signal: &[f64], fs: f64, detrend: Detrend) -> Result<Self> {
        let n = signal.len();
        if n < 2 {
            return Err(ForecastError::InsufficientData { needed: 2, got: n });
        }
        if !(fs > 0.0 && fs.is_finite()) {
            return Err(ForecastError::InvalidParameter(format!(
                "sampling frequency must be positive, got {fs}"
            )));
        }
        if signal.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::malformed("signal has non-finite values"));
        }

        let detrended = detrend_signal(signal, detrend)?;
        let mut buffer: Vec<Complex64> = detrended.iter().map(|&x| Complex64::new(x, 0.0)).collect();
        FftPlanner::new().plan_fft_forward(n).process(&mut buffer);

        let scale = 1.0 / (n as f64 * n as f64);
        let last = n / 2;
        let (frequencies, power) = buffer[..=last]
            .iter()
            .enumerate()
            .map(|(k, x)| {
                let mut p = x.norm_sqr() * scale;
                if k != 0 && !(n % 2 == 0 && k == last) {
                    p *= 2.0;
                }
                (k as f64 * fs / n as f64, p)
            })
            .unzip();

        Ok(Self { frequencies, power })
    }

    /// Spectrum of a daily series on a cycles-per-year axis.
    pub fn annual(daily: &[f64], detrend: Detrend) -> Result<Self> {
        Self::compute(daily, 365.0, detrend)
    }

    pub fn len(&self) -> usize {
        self.power.len()
    }

    pub fn is_empty(&self) -> bool {
        self.power.is_empty()
    }

    /// The `k` strongest non-DC bins as `(frequency, power)`, strongest first.
    pub fn peaks(&self, k: usize) -> Vec<(f64, f64)> {
        let mut bins: Vec<(f64, f64)> = self
            .frequencies
            .iter()
            .copied()
            .zip(self.power.iter().copied())
            .skip(1)
            .collect();
        bins.sort_by(|a, b| b.1.total_cmp(&a.1));
        bins.truncate(k);
        bins
    }

    /// Power of the bin nearest to `frequency`.
    pub fn power_at(&self, frequency: f64) -> Option<f64> {
        self.frequencies
            .iter()
            .zip(&self.power)
            .min_by(|a, b| (a.0 - frequency).abs().total_cmp(&(b.0 - frequency).abs()))
            .map(|(_, p)| *p)
    }
}

fn detrend_signal(signal: &[f64], detrend: Detrend) -> Result<Vec<f64>> {
    match detrend {
        Detrend::None => Ok(signal.to_vec()),
        Detrend::Constant => {
            let m = mean(signal);
            Ok(signal.iter().map(|x| x - m).collect())
        }
        Detrend::Linear => {
            let rows: Vec<Vec<f64>> = (0..signal.len()).map(|i| vec![1.0, i as f64]).collect();
            let fit = least_squares(&rows, signal)?;
            let (a, b) = (fit.coefficients[0], fit.coefficients[1]);
            Ok(signal
                .iter()
                .enumerate()
                .map(|(i, x)| x - (a + b * i as f64))
                .collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn sinusoid_power_is_half_amplitude_squared() {
        let n = 365;
        let signal: Vec<f64> = (0..n)
            .map(|i| 3.0 * (2.0 * PI * 12.0 * i as f64 / n as f64).sin())
            .collect();
        let pg = Periodogram::annual(&signal, Detrend::Constant).unwrap();

        assert_eq!(pg.len(), n / 2 + 1);
        assert_relative_eq!(pg.frequencies[12], 12.0, epsilon = 1e-12);
        assert_relative_eq!(pg.power_at(12.0).unwrap(), 4.5, epsilon = 1e-9);

        let peaks = pg.peaks(1);
        assert_relative_eq!(peaks[0].0, 12.0, epsilon = 1e-12);
    }

    #[test]
    fn linear_detrend_removes_ramp() {
        let signal: Vec<f64> = (0..100).map(|i| 2.0 + 0.5 * i as f64).collect();
        let pg = Periodogram::compute(&signal, 1.0, Detrend::Linear).unwrap();
        assert!(pg.power.iter().all(|p| *p < 1e-18));

        let raw = Periodogram::compute(&signal, 1.0, Detrend::None).unwrap();
        assert!(raw.power[0] > 100.0);
    }

    #[test]
    fn even_length_keeps_nyquist_unscaled() {
        // Alternating signal sits entirely at Nyquist.
        let signal: Vec<f64> = (0..8).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let pg = Periodogram::compute(&signal, 1.0, Detrend::None).unwrap();
        assert_relative_eq!(pg.frequencies[4], 0.5);
        assert_relative_eq!(pg.power[4], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn named_cycles_fall_on_the_annual_axis() {
        let pg = Periodogram::annual(&vec![0.0; 730], Detrend::None).unwrap();
        let top = pg.frequencies[pg.len() - 1];
        for (label, cycles) in ANNUAL_CYCLES {
            assert!(cycles > 0.0 && cycles <= top, "{label} outside the axis");
        }
    }

    #[test]
    fn rejects_bad_input() {
        assert!(Periodogram::compute(&[1.0], 1.0, Detrend::None).is_err());
        assert!(Periodogram::compute(&[1.0, 2.0], 0.0, Detrend::None).is_err());
        assert!(Periodogram::compute(&[1.0, f64::NAN], 1.0, Detrend::None).is_err());
    }
}
