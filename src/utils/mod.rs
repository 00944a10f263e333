//! Numerical helpers shared by the models.

pub mod linalg;
pub mod optimization;
pub mod stats;

pub use linalg::{least_squares, LeastSquares};
pub use optimization::{nelder_mead, NelderMeadConfig, NelderMeadResult};
