//! Result of a multi-start fit.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;
use crate::uncertainty::{calculate_correlation, standard_errors_from_covariance};

/// Best fit of a decay model to lag coefficients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationResult {
    /// Fitted timescale, the first entry of `popt`.
    pub tau: f64,

    /// Branching parameter `exp(−1/tau)` for a unit time step.
    pub mre: f64,

    /// Formula of the fitted model.
    pub fitfunc: String,

    /// Short name of the fitted model.
    pub model: String,

    /// Winning parameter vector.
    pub popt: Array1<f64>,

    /// Parameter covariance of the winning fit; `+∞` where undetermined.
    pub pcov: Array2<f64>,

    /// Unweighted residual sum of squares of the winning fit.
    pub ssres: f64,

    /// First coefficient when the first lag is 1.
    pub mnaive: Option<f64>,

    /// Number of starting points tried.
    pub attempts: usize,

    /// Number of starting points whose fit succeeded.
    pub successes: usize,
}

impl CorrelationResult {
    /// Standard errors of `popt`.
    pub fn parameter_errors(&self) -> Array1<f64> {
        standard_errors_from_covariance(&self.pcov)
    }

    /// Correlation between fitted parameters.
    pub fn correlation_matrix(&self) -> Array2<f64> {
        calculate_correlation(&self.pcov)
    }

    /// Pretty-printed JSON. Non-finite covariance entries become `null`.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for CorrelationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Correlation Fit ({}):", self.model)?;
        writeln!(f, "  Function: {}", self.fitfunc)?;
        writeln!(f, "  tau: {:.6}", self.tau)?;
        writeln!(f, "  mre: {:.8}", self.mre)?;
        if let Some(mnaive) = self.mnaive {
            writeln!(f, "  mnaive: {:.8}", mnaive)?;
        }
        writeln!(f, "  ssres: {:.6e}", self.ssres)?;
        writeln!(f, "  Successful starts: {}/{}", self.successes, self.attempts)?;

        let errors = self.parameter_errors();
        writeln!(f, "  Parameters:")?;
        for (i, value) in self.popt.iter().enumerate() {
            writeln!(f, "    p[{}] = {:.6e} +/- {:.3e}", i, value, errors[i])?;
        }
        Ok(())
    }
}
