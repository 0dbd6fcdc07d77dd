//! Levenberg-Marquardt algorithm implementation.
//!
//! This module provides the damped Gauss-Newton solver used for every
//! starting point of a multi-start fit.

pub mod algorithm;
pub mod config;

pub use algorithm::{LevenbergMarquardt, LmResult, Termination};
pub use config::LmConfig;
