//! Decay models for fitting lag coefficients.
//!
//! Three built-in families are available through [`FitFunction`]; each one
//! carries a default grid of starting points and, for the complex model,
//! default parameter bounds. Any other function of `(k, params)` can be
//! wrapped in a [`CustomFunction`]; it then has no defaults and the caller
//! supplies starting points (and optionally bounds).
//!
//! By convention the first parameter of every model is the timescale `tau`.

use ndarray::{Array1, Array2, ArrayView1};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::MreError;
use crate::parameters::FitBounds;

mod complex;
mod exponential;

pub use complex::Complex;
pub use exponential::{Exponential, ExponentialOffset};

use complex::{COMPLEX_FITBNDS, COMPLEX_FITPARS};

/// A parametric model of the lag coefficients `r_k`.
pub trait DecayModel: Send + Sync {
    /// Short identifier.
    fn name(&self) -> &str;

    /// Human-readable formula, reported as the `fitfunc` of a fit.
    fn description(&self) -> &str;

    /// Parameter names in the order the parameter vector uses.
    fn parameter_names(&self) -> Vec<String>;

    /// Number of parameters.
    fn parameter_count(&self) -> usize {
        self.parameter_names().len()
    }

    /// Evaluate the model at lag `k`.
    ///
    /// `params` must hold `parameter_count()` values.
    fn eval(&self, k: f64, params: ArrayView1<f64>) -> f64;

    /// Evaluate the model at every lag in `steps`.
    fn eval_steps(&self, steps: &Array1<f64>, params: ArrayView1<f64>) -> Array1<f64> {
        steps.mapv(|k| self.eval(k, params))
    }

    /// Analytic Jacobian `∂f(k_i)/∂p_j`, if the model provides one.
    ///
    /// Returning `None` makes the fitter fall back to finite differences.
    fn jacobian(&self, _steps: &Array1<f64>, _params: ArrayView1<f64>) -> Option<Array2<f64>> {
        None
    }
}

type CustomFn = dyn Fn(f64, ArrayView1<f64>) -> f64 + Send + Sync;

/// A caller-supplied model function.
#[derive(Clone)]
pub struct CustomFunction {
    name: String,
    description: String,
    parameter_names: Vec<String>,
    func: Arc<CustomFn>,
}

impl CustomFunction {
    /// Wrap `func(k, params)`; the first entry of `parameter_names` should be
    /// the timescale.
    pub fn new<F>(name: &str, parameter_names: &[&str], func: F) -> Self
    where
        F: Fn(f64, ArrayView1<f64>) -> f64 + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            description: name.to_string(),
            parameter_names: parameter_names.iter().map(|s| s.to_string()).collect(),
            func: Arc::new(func),
        }
    }

    /// Set the formula reported as `fitfunc`.
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }
}

impl fmt::Debug for CustomFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomFunction")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameter_names", &self.parameter_names)
            .finish()
    }
}

impl DecayModel for CustomFunction {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameter_names(&self) -> Vec<String> {
        self.parameter_names.clone()
    }

    fn eval(&self, k: f64, params: ArrayView1<f64>) -> f64 {
        (self.func)(k, params)
    }
}

/// Model selection for a fit: one of the built-in families or a custom function.
#[derive(Debug, Clone, Default)]
pub enum FitFunction {
    /// `A·exp(−k/tau)`
    #[default]
    Exponential,
    /// `A·exp(−k/tau) + O`
    ExponentialOffset,
    /// Exponential plus damped oscillation, Gaussian term and offset.
    Complex,
    /// Anything else.
    Custom(CustomFunction),
}

static EXPONENTIAL: Exponential = Exponential;
static EXPONENTIAL_OFFSET: ExponentialOffset = ExponentialOffset;
static COMPLEX: Complex = Complex;

impl FitFunction {
    /// The model behind this selection.
    pub fn model(&self) -> &dyn DecayModel {
        match self {
            FitFunction::Exponential => &EXPONENTIAL,
            FitFunction::ExponentialOffset => &EXPONENTIAL_OFFSET,
            FitFunction::Complex => &COMPLEX,
            FitFunction::Custom(custom) => custom,
        }
    }

    /// Whether this is one of the built-in families.
    pub fn is_builtin(&self) -> bool {
        !matches!(self, FitFunction::Custom(_))
    }

    /// Default grid of starting points, one row per attempt.
    ///
    /// `None` for custom functions.
    pub fn default_fitpars(&self) -> Option<Array2<f64>> {
        match self {
            FitFunction::Exponential => Array2::from_shape_vec((1, 2), vec![20.0, 1.0]).ok(),
            FitFunction::ExponentialOffset => {
                Array2::from_shape_vec((1, 3), vec![20.0, 1.0, 0.0]).ok()
            }
            FitFunction::Complex => {
                let flat: Vec<f64> = COMPLEX_FITPARS.iter().flatten().copied().collect();
                Array2::from_shape_vec((COMPLEX_FITPARS.len(), 9), flat).ok()
            }
            FitFunction::Custom(_) => None,
        }
    }

    /// Default parameter bounds; only the complex model is bounded.
    pub fn default_fitbnds(&self) -> Option<FitBounds> {
        match self {
            FitFunction::Complex => FitBounds::from_pairs(&COMPLEX_FITBNDS).ok(),
            _ => None,
        }
    }
}

impl DecayModel for FitFunction {
    fn name(&self) -> &str {
        self.model().name()
    }

    fn description(&self) -> &str {
        self.model().description()
    }

    fn parameter_names(&self) -> Vec<String> {
        self.model().parameter_names()
    }

    fn eval(&self, k: f64, params: ArrayView1<f64>) -> f64 {
        self.model().eval(k, params)
    }

    fn eval_steps(&self, steps: &Array1<f64>, params: ArrayView1<f64>) -> Array1<f64> {
        self.model().eval_steps(steps, params)
    }

    fn jacobian(&self, steps: &Array1<f64>, params: ArrayView1<f64>) -> Option<Array2<f64>> {
        self.model().jacobian(steps, params)
    }
}

impl FromStr for FitFunction {
    type Err = MreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exponential" | "f_exponential" | "exp" => Ok(FitFunction::Exponential),
            "exponentialoffset" | "exponential_offset" | "f_exponential_offset" | "offset" => {
                Ok(FitFunction::ExponentialOffset)
            }
            "complex" | "f_complex" => Ok(FitFunction::Complex),
            _ => Err(MreError::UnknownModel(s.to_string())),
        }
    }
}

impl fmt::Display for FitFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.description())
    }
}
