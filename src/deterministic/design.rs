//! Named, row-major design matrices.

use crate::error::{ForecastError, Result};
use chrono::{DateTime, Utc};

/// Feature matrix with one row per timestamp and named columns.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignMatrix {
    columns: Vec<String>,
    index: Vec<DateTime<Utc>>,
    rows: Vec<Vec<f64>>,
}

impl DesignMatrix {
    /// Assemble a matrix, checking every row has one value per column.
    pub fn new(
        columns: Vec<String>,
        index: Vec<DateTime<Utc>>,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self> {
        if index.len() != rows.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: index.len(),
                got: rows.len(),
            });
        }
        if let Some(bad) = rows.iter().find(|r| r.len() != columns.len()) {
            return Err(ForecastError::DimensionMismatch {
                expected: columns.len(),
                got: bad.len(),
            });
        }
        Ok(Self {
            columns,
            index,
            rows,
        })
    }

    /// Build a matrix from raw rows with generated column names `x0, x1, ...`
    /// and no time index; mostly useful for exercising regressors directly.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let width = rows.first().map_or(0, |r| r.len());
        if let Some(bad) = rows.iter().find(|r| r.len() != width) {
            return Err(ForecastError::DimensionMismatch {
                expected: width,
                got: bad.len(),
            });
        }
        Ok(Self {
            columns: (0..width).map(|j| format!("x{j}")).collect(),
            index: Vec::new(),
            rows,
        })
    }

    /// Caller guarantees the shape invariants checked by [`new`](Self::new).
    pub(crate) fn from_parts_unchecked(
        columns: Vec<String>,
        index: Vec<DateTime<Utc>>,
        rows: Vec<Vec<f64>>,
    ) -> Self {
        debug_assert_eq!(index.len(), rows.len());
        Self {
            columns,
            index,
            rows,
        }
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Timestamps of the rows; empty for matrices built with [`from_rows`](Self::from_rows).
    pub fn index(&self) -> &[DateTime<Utc>] {
        &self.index
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn row(&self, i: usize) -> Option<&[f64]> {
        self.rows.get(i).map(|r| r.as_slice())
    }

    /// Copy out a column by name.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let j = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|r| r[j]).collect())
    }

    /// Fail unless this matrix has exactly the given columns, in order.
    pub fn ensure_columns(&self, expected: &[String]) -> Result<()> {
        if self.columns.len() != expected.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: expected.len(),
                got: self.columns.len(),
            });
        }
        if self.columns != expected {
            return Err(ForecastError::InvalidParameter(format!(
                "design columns {:?} do not match training columns {:?}",
                self.columns, expected
            )));
        }
        Ok(())
    }
}
