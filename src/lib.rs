//! # mre-rs
//!
//! `mre-rs` estimates the intrinsic timescale of a stochastic point process,
//! such as neural spiking activity, with the multistep regression estimator.
//!
//! The estimation runs in two stages:
//! - [`coefficients`] regresses the activity at time `t + k` on the activity
//!   at time `t` for every lag `k`, per trial or pooled over trials
//! - [`fit`] fits a decay model from the [`models`] library to those
//!   coefficients from a grid of starting points and keeps the best fit
//!
//! The fitted timescale `tau` gives the branching parameter
//! `mre = exp(-1/tau)`.
//!
//! ## Basic Usage
//!
//! ```
//! use mre_rs::{correlation_coefficients, correlation_fit, CoefficientConfig, FitConfig};
//! use ndarray::Array2;
//!
//! // Four trials of an AR(1)-like activity with m = 0.9
//! let mut activity = Array2::zeros((4, 4000));
//! for (i, mut trial) in activity.outer_iter_mut().enumerate() {
//!     let mut state = 1.0 + i as f64;
//!     let mut noise: u64 = 12345 + i as u64;
//!     for value in trial.iter_mut() {
//!         noise = noise.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
//!         let kick = (noise >> 33) as f64 / (1u64 << 31) as f64 - 0.5;
//!         state = 0.9 * state + kick;
//!         *value = state;
//!     }
//! }
//!
//! let config = CoefficientConfig::default().with_steps(1, 40);
//! let coefficients = correlation_coefficients(&activity, &config).unwrap();
//! let result = correlation_fit(&coefficients, &FitConfig::default()).unwrap();
//!
//! assert!(result.mre > 0.8 && result.mre < 0.97);
//! ```

pub mod error;

pub mod parameters;

pub mod utils;

pub mod problem;

pub mod lm;

pub mod uncertainty;

pub mod coefficients;

pub mod models;

pub mod fit;

// Re-exports for convenience
pub use coefficients::{
    correlation_coefficients, CoefficientConfig, CoefficientMethod, CoefficientResult,
    CoefficientSamples,
};
pub use error::{MreError, Result};
pub use fit::{correlation_fit, CorrelationResult, FitConfig, FitInput};
pub use lm::{LevenbergMarquardt, LmConfig};
pub use models::{CustomFunction, DecayModel, FitFunction};
pub use parameters::FitBounds;
pub use problem::Problem;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
