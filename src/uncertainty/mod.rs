//! # Uncertainty of fitted parameters
//!
//! Covariance, correlation and standard errors derived from the Jacobian of
//! the weighted residuals at the best fit.

pub mod covariance;

pub use covariance::{calculate_correlation, calculate_covariance, standard_errors_from_covariance};
