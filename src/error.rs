//! Error types for the scrobble-forecast library.

use thiserror::Error;

/// Result type alias for forecast operations.
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Errors that can occur while resampling, fitting or forecasting.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    /// Input series or events fail structural requirements.
    #[error("malformed series: {0}")]
    MalformedSeries(String),

    /// `predict` was called before a successful `fit`.
    #[error("model must be fitted before prediction")]
    UnfittedModel,

    /// Forecast horizon below one bucket.
    #[error("invalid horizon {0}: must be at least 1")]
    InvalidHorizon(i64),

    /// Insufficient data points for the operation.
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Dimension mismatch between data structures.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Computation error (e.g., numerical issues).
    #[error("computation error: {0}")]
    ComputationError(String),
}

impl ForecastError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedSeries(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_descriptive() {
        let err = ForecastError::MalformedSeries("NaN in target".to_string());
        assert_eq!(err.to_string(), "malformed series: NaN in target");

        let err = ForecastError::UnfittedModel;
        assert_eq!(err.to_string(), "model must be fitted before prediction");

        let err = ForecastError::InvalidHorizon(-3);
        assert_eq!(err.to_string(), "invalid horizon -3: must be at least 1");

        let err = ForecastError::InsufficientData { needed: 10, got: 5 };
        assert_eq!(
            err.to_string(),
            "insufficient data: need at least 10, got 5"
        );

        let err = ForecastError::DimensionMismatch {
            expected: 3,
            got: 2,
        };
        assert_eq!(err.to_string(), "dimension mismatch: expected 3, got 2");
    }

    #[test]
    fn errors_are_clonable_and_comparable() {
        let err1 = ForecastError::UnfittedModel;
        let err2 = err1.clone();
        assert_eq!(err1, err2);
        assert_ne!(err1, ForecastError::InvalidHorizon(0));
    }
}
