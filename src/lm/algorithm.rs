//! Implementation of the Levenberg-Marquardt algorithm.
//!
//! Each iteration solves the damped normal equations
//! `(JᵀJ + λ·diag(JᵀJ)) δ = −Jᵀr` and accepts the step only if it lowers the
//! sum of squared residuals. Rejected steps raise λ, accepted steps lower it.

use nalgebra::{DMatrix, DVector};
use ndarray::Array1;
use std::fmt;

use crate::error::{MreError, Result};
use crate::problem::Problem;
use crate::utils::matrix_convert::{
    nalgebra_vec_to_ndarray, ndarray_to_nalgebra, ndarray_vec_to_nalgebra,
};

use super::config::LmConfig;

/// Smallest diagonal entry used for Marquardt scaling.
const MIN_DIAGONAL: f64 = 1e-12;

/// Why the iteration stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Gradient max-norm fell below `gtol`.
    Gradient,

    /// Relative cost reduction fell below `ftol`.
    CostTolerance,

    /// Relative step length fell below `xtol`.
    StepTolerance,

    /// No step reduces the cost even at maximal damping: the current point is
    /// a stationary point to machine precision.
    Stalled,

    /// Iteration cap reached before any convergence criterion was met.
    MaxIterations,
}

impl Termination {
    /// Whether the parameters can be trusted as a local minimum.
    pub fn is_converged(&self) -> bool {
        !matches!(self, Termination::MaxIterations)
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Termination::Gradient => "gradient convergence",
            Termination::CostTolerance => "cost convergence",
            Termination::StepTolerance => "parameter convergence",
            Termination::Stalled => "no further reduction possible",
            Termination::MaxIterations => "maximum iterations reached",
        };
        f.write_str(message)
    }
}

/// Result of the Levenberg-Marquardt optimization.
#[derive(Debug, Clone)]
pub struct LmResult {
    /// Optimized parameter values
    pub params: Array1<f64>,

    /// Residuals at the solution
    pub residuals: Array1<f64>,

    /// Sum of squared residuals
    pub cost: f64,

    /// Number of accepted iterations
    pub iterations: usize,

    /// Number of residual evaluations, including those spent on finite differences
    pub func_evals: usize,

    /// Whether the optimization converged
    pub success: bool,

    /// Why the optimization stopped
    pub termination: Termination,
}

impl fmt::Display for LmResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Optimization Result:")?;
        writeln!(f, "  Success: {}", self.success)?;
        writeln!(f, "  Termination: {}", self.termination)?;
        writeln!(f, "  Cost: {:.6e}", self.cost)?;
        writeln!(f, "  Iterations: {}", self.iterations)?;
        writeln!(f, "  Function evaluations: {}", self.func_evals)?;
        writeln!(f, "  Parameters: {}", self.params)?;
        Ok(())
    }
}

/// Outcome of the inner damping loop of one iteration.
enum StepOutcome {
    Accepted {
        params: Array1<f64>,
        residuals: Array1<f64>,
        cost: f64,
        step_norm: f64,
    },
    Stalled,
}

/// The Levenberg-Marquardt optimizer.
#[derive(Debug, Clone, Default)]
pub struct LevenbergMarquardt {
    config: LmConfig,
}

impl LevenbergMarquardt {
    /// Create a new Levenberg-Marquardt optimizer with the given configuration.
    pub fn with_config(config: LmConfig) -> Self {
        Self { config }
    }

    /// Create a new Levenberg-Marquardt optimizer with default configuration.
    pub fn with_default_config() -> Self {
        Self::default()
    }

    /// The configuration in use.
    pub fn config(&self) -> &LmConfig {
        &self.config
    }

    /// Minimize the sum of squared residuals for the given problem.
    ///
    /// Reaching the iteration cap is reported through `success == false`
    /// rather than an error; non-finite residuals at the starting point or in
    /// the Jacobian are errors.
    pub fn minimize<P: Problem>(
        &self,
        problem: &P,
        initial_params: Array1<f64>,
    ) -> Result<LmResult> {
        let n_params = problem.parameter_count();
        if initial_params.len() != n_params {
            return Err(MreError::DimensionMismatch(format!(
                "Expected {} parameters, got {}",
                n_params,
                initial_params.len()
            )));
        }

        let mut params = initial_params;
        let mut residuals = problem.eval(&params)?;
        if residuals.len() != problem.residual_count() {
            return Err(MreError::DimensionMismatch(format!(
                "Expected {} residuals, got {}",
                problem.residual_count(),
                residuals.len()
            )));
        }
        let mut cost = sum_of_squares(&residuals);
        let mut func_evals = 1;
        if !cost.is_finite() {
            return Err(MreError::FunctionEvaluation(
                "non-finite residuals at the starting point".to_string(),
            ));
        }

        let mut lambda = self.config.initial_lambda;
        let mut iterations = 0;

        let termination = loop {
            if iterations >= self.config.max_iterations {
                break Termination::MaxIterations;
            }

            let jacobian = problem.jacobian(&params)?;
            func_evals += n_params;
            if jacobian.iter().any(|v| !v.is_finite()) {
                return Err(MreError::FunctionEvaluation(
                    "non-finite entries in the Jacobian".to_string(),
                ));
            }

            let j = ndarray_to_nalgebra(&jacobian);
            let r = ndarray_vec_to_nalgebra(&residuals);
            let jt = j.transpose();
            let gradient = &jt * &r;
            if gradient.amax() <= self.config.gtol {
                break Termination::Gradient;
            }
            let jtj = &jt * &j;

            let outcome = loop {
                let step = match solve_damped(&jtj, &gradient, lambda) {
                    Ok(step) => step,
                    Err(err) => {
                        lambda *= self.config.lambda_up_factor;
                        if lambda > self.config.max_lambda {
                            return Err(err);
                        }
                        continue;
                    }
                };

                let new_params = &params + &nalgebra_vec_to_ndarray(&step);
                let new_residuals = problem.eval(&new_params)?;
                func_evals += 1;
                let new_cost = sum_of_squares(&new_residuals);

                if new_cost.is_finite() && new_cost < cost {
                    break StepOutcome::Accepted {
                        params: new_params,
                        residuals: new_residuals,
                        cost: new_cost,
                        step_norm: step.norm(),
                    };
                }

                lambda *= self.config.lambda_up_factor;
                if lambda > self.config.max_lambda {
                    break StepOutcome::Stalled;
                }
            };

            match outcome {
                StepOutcome::Stalled => break Termination::Stalled,
                StepOutcome::Accepted {
                    params: new_params,
                    residuals: new_residuals,
                    cost: new_cost,
                    step_norm,
                } => {
                    let cost_change = (cost - new_cost) / cost;
                    let param_norm = params.iter().map(|p| p * p).sum::<f64>().sqrt();

                    params = new_params;
                    residuals = new_residuals;
                    cost = new_cost;
                    iterations += 1;
                    lambda = (lambda * self.config.lambda_down_factor).max(self.config.min_lambda);

                    if cost == 0.0 || cost_change <= self.config.ftol {
                        break Termination::CostTolerance;
                    }
                    if step_norm <= self.config.xtol * (param_norm + self.config.xtol) {
                        break Termination::StepTolerance;
                    }
                }
            }
        };

        Ok(LmResult {
            params,
            residuals,
            cost,
            iterations,
            func_evals,
            success: termination.is_converged(),
            termination,
        })
    }
}

fn sum_of_squares(residuals: &Array1<f64>) -> f64 {
    residuals.iter().map(|r| r * r).sum()
}

/// Solve `(JᵀJ + λ·D) δ = −g` with `D` the clamped diagonal of `JᵀJ`.
///
/// Cholesky first; SVD when the damped matrix is not numerically positive
/// definite.
///
/// # Errors
///
/// `LinearAlgebra` if neither factorization yields a finite step.
fn solve_damped(
    jtj: &DMatrix<f64>,
    gradient: &DVector<f64>,
    lambda: f64,
) -> Result<DVector<f64>> {
    let mut damped = jtj.clone();
    for i in 0..damped.nrows() {
        damped[(i, i)] += lambda * jtj[(i, i)].max(MIN_DIAGONAL);
    }
    let rhs = -gradient;

    let step = match damped.clone().cholesky() {
        Some(cholesky) => cholesky.solve(&rhs),
        None => damped
            .svd(true, true)
            .solve(&rhs, 1e-14)
            .map_err(|e| MreError::LinearAlgebra(format!("SVD solve failed: {}", e)))?,
    };

    if step.iter().all(|v| v.is_finite()) {
        Ok(step)
    } else {
        Err(MreError::LinearAlgebra(format!(
            "damped normal equations gave a non-finite step at lambda {:e}",
            lambda
        )))
    }
}
