//! ARIMA models and order selection.
//!
//! This module provides:
//! - ARIMA(p, d, q) fitted by conditional sum of squares
//! - [`OrderSearch`], an exhaustive AIC-driven search over (p, d, q)

mod diff;
mod model;
mod order_search;

pub use diff::{difference, integrate};
pub use model::{ARIMASpec, ARIMA};
pub use order_search::{OrderSearch, OrderSearchConfig};
