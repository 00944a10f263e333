//! Dense least squares via Householder QR.
//!
//! Polynomial trend columns grow like `t^k`, which makes the normal
//! equations badly conditioned for long daily series; factoring the design
//! matrix directly keeps the trend fit accurate.

use crate::error::{ForecastError, Result};

/// Relative residual norm below which a column counts as dependent.
const RANK_TOLERANCE: f64 = 1e-8;

/// Solution of `min ||X b - y||`.
#[derive(Debug, Clone)]
pub struct LeastSquares {
    /// One coefficient per column; columns found linearly dependent get 0.
    pub coefficients: Vec<f64>,
    /// Sum of squared residuals.
    pub residual_ss: f64,
    /// Numerical rank of the design matrix.
    pub rank: usize,
    /// Diagonal of `(X'X)^-1`, present when X has full column rank.
    pub unscaled_variances: Option<Vec<f64>>,
}

impl LeastSquares {
    /// Standard errors of the coefficients, scaling `(X'X)^-1` by the
    /// residual variance with `n - k` degrees of freedom.
    pub fn standard_errors(&self, n_obs: usize) -> Option<Vec<f64>> {
        let k = self.coefficients.len();
        if n_obs <= k {
            return None;
        }
        let sigma2 = self.residual_ss / (n_obs - k) as f64;
        self.unscaled_variances
            .as_ref()
            .map(|v| v.iter().map(|d| (d * sigma2).sqrt()).collect())
    }
}

/// Solve the least-squares problem for a row-major design matrix.
pub fn least_squares(rows: &[Vec<f64>], y: &[f64]) -> Result<LeastSquares> {
    let n = rows.len();
    if n == 0 {
        return Err(ForecastError::InsufficientData { needed: 1, got: 0 });
    }
    if y.len() != n {
        return Err(ForecastError::DimensionMismatch {
            expected: n,
            got: y.len(),
        });
    }
    let k = rows[0].len();
    if let Some(bad) = rows.iter().find(|r| r.len() != k) {
        return Err(ForecastError::DimensionMismatch {
            expected: k,
            got: bad.len(),
        });
    }

    let keep = independent_columns(rows);
    let rank = keep.len();
    let mut cols: Vec<Vec<f64>> = keep
        .iter()
        .map(|&j| rows.iter().map(|r| r[j]).collect())
        .collect();
    let mut b = y.to_vec();
    householder_in_place(&mut cols, &mut b);

    let mut solved = vec![0.0; rank];
    for i in (0..rank).rev() {
        let mut acc = b[i];
        for j in (i + 1)..rank {
            acc -= cols[j][i] * solved[j];
        }
        solved[i] = acc / cols[i][i];
    }

    let mut coefficients = vec![0.0; k];
    for (&j, &c) in keep.iter().zip(&solved) {
        coefficients[j] = c;
    }

    let residual_ss = rows
        .iter()
        .zip(y)
        .map(|(row, &yi)| {
            let fit: f64 = row.iter().zip(&coefficients).map(|(x, c)| x * c).sum();
            (yi - fit).powi(2)
        })
        .sum();

    let unscaled_variances = (rank == k).then(|| r_inverse_row_norms(&cols, k));

    Ok(LeastSquares {
        coefficients,
        residual_ss,
        rank,
        unscaled_variances,
    })
}

/// Indices of columns that are not (numerically) linear combinations of
/// the columns before them.
pub fn independent_columns(rows: &[Vec<f64>]) -> Vec<usize> {
    let k = rows.first().map_or(0, |r| r.len());
    let mut kept: Vec<Vec<f64>> = Vec::new();
    let mut indices = Vec::new();

    for j in 0..k {
        let mut col: Vec<f64> = rows.iter().map(|r| r[j]).collect();
        let norm = dot(&col, &col).sqrt();
        if norm == 0.0 {
            continue;
        }
        // Two passes of modified Gram-Schmidt keep the residual honest.
        for _ in 0..2 {
            for q in &kept {
                let proj = dot(q, &col);
                for (c, qi) in col.iter_mut().zip(q) {
                    *c -= proj * qi;
                }
            }
        }
        let residual = dot(&col, &col).sqrt();
        if residual > norm * RANK_TOLERANCE {
            col.iter_mut().for_each(|c| *c /= residual);
            kept.push(col);
            indices.push(j);
        }
    }
    indices
}

/// Reduce full-column-rank `cols` to upper-triangular R (stored
/// column-wise), applying the same reflections to `rhs`.
fn householder_in_place(cols: &mut [Vec<f64>], rhs: &mut [f64]) {
    for j in 0..cols.len() {
        let norm = cols[j][j..].iter().map(|v| v * v).sum::<f64>().sqrt();
        let alpha = if cols[j][j] > 0.0 { -norm } else { norm };
        let mut v = cols[j][j..].to_vec();
        v[0] -= alpha;
        let vv = dot(&v, &v);
        if vv == 0.0 {
            continue;
        }

        for col in cols.iter_mut().skip(j) {
            reflect(&mut col[j..], &v, vv);
        }
        reflect(&mut rhs[j..], &v, vv);
    }
}

fn reflect(x: &mut [f64], v: &[f64], vv: f64) {
    let scale = 2.0 * dot(v, x) / vv;
    for (xi, vi) in x.iter_mut().zip(v) {
        *xi -= scale * vi;
    }
}

/// Diagonal of `(R'R)^-1`, i.e. squared row norms of `R^-1`.
fn r_inverse_row_norms(cols: &[Vec<f64>], k: usize) -> Vec<f64> {
    // Solve R X = I column by column; R^-1 is upper triangular.
    let mut inv = vec![vec![0.0; k]; k];
    for c in 0..k {
        for i in (0..=c).rev() {
            let mut acc = if i == c { 1.0 } else { 0.0 };
            for j in (i + 1)..=c {
                acc -= cols[j][i] * inv[j][c];
            }
            inv[i][c] = acc / cols[i][i];
        }
    }
    inv.iter().map(|row| row.iter().map(|v| v * v).sum()).collect()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
