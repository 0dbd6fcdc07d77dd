//! # Fitting decay models to lag coefficients
//!
//! [`correlation_fit`] runs a weighted Levenberg-Marquardt fit from every
//! starting point of a grid and keeps the one with the smallest residual sum
//! of squares. Bounded parameters are handled with a Minuit-style transform,
//! so the solver itself stays unconstrained.

use ndarray::Array2;

use crate::lm::LmConfig;
use crate::models::FitFunction;
use crate::parameters::FitBounds;

mod input;
mod multistart;
mod problem;
mod result;

pub use input::{FitInput, LagData};
pub use multistart::correlation_fit;
pub use problem::{BoundedProblem, WeightedDecayProblem};
pub use result::CorrelationResult;

/// Iteration cap of the solver for every starting point.
pub const DEFAULT_MAX_ITERATIONS: usize = 5000;

/// Configuration for [`correlation_fit`].
#[derive(Debug, Clone)]
pub struct FitConfig {
    /// Model to fit.
    pub fitfunc: FitFunction,

    /// Starting points, one row each. `None` uses the model defaults.
    pub fitpars: Option<Array2<f64>>,

    /// Parameter bounds. `None` uses the model defaults, if any.
    pub fitbnds: Option<FitBounds>,

    /// Solver settings shared by all starting points.
    pub lm: LmConfig,

    /// Fit starting points on the rayon thread pool.
    pub parallel: bool,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            fitfunc: FitFunction::default(),
            fitpars: None,
            fitbnds: None,
            lm: LmConfig::default().with_max_iterations(DEFAULT_MAX_ITERATIONS),
            parallel: false,
        }
    }
}

impl FitConfig {
    /// Default configuration for the given model.
    pub fn new(fitfunc: FitFunction) -> Self {
        Self {
            fitfunc,
            ..Self::default()
        }
    }

    pub fn with_fitfunc(mut self, fitfunc: FitFunction) -> Self {
        self.fitfunc = fitfunc;
        self
    }

    pub fn with_fitpars(mut self, fitpars: Array2<f64>) -> Self {
        self.fitpars = Some(fitpars);
        self
    }

    pub fn with_fitbnds(mut self, fitbnds: FitBounds) -> Self {
        self.fitbnds = Some(fitbnds);
        self
    }

    pub fn with_lm_config(mut self, lm: LmConfig) -> Self {
        self.lm = lm;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}
