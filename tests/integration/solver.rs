//! Integration tests for the Levenberg-Marquardt solver and the bounds
//! transform, used directly on hand-written problems.

use approx::assert_relative_eq;
use mre_rs::fit::{BoundedProblem, WeightedDecayProblem};
use mre_rs::lm::{LevenbergMarquardt, LmConfig, Termination};
use mre_rs::parameters::{Bounds, BoundsTransform};
use mre_rs::uncertainty::calculate_covariance;
use mre_rs::{FitFunction, FitInput, MreError, Problem, Result};
use ndarray::{array, Array1, Array2};

/// Test Problem: Rosenbrock function as residuals `(1 - x, 10 (y - x²))`
struct RosenbrockProblem;

impl Problem for RosenbrockProblem {
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        if params.len() != 2 {
            return Err(MreError::DimensionMismatch(format!(
                "Expected 2 parameters, got {}",
                params.len()
            )));
        }
        let (x, y) = (params[0], params[1]);
        Ok(array![1.0 - x, 10.0 * (y - x * x)])
    }

    fn parameter_count(&self) -> usize {
        2
    }

    fn residual_count(&self) -> usize {
        2
    }

    fn jacobian(&self, params: &Array1<f64>) -> Result<Array2<f64>> {
        Ok(array![[-1.0, 0.0], [-20.0 * params[0], 10.0]])
    }
}

#[test]
fn test_rosenbrock_converges() {
    let solver = LevenbergMarquardt::with_config(LmConfig::default().with_max_iterations(500));
    let result = solver.minimize(&RosenbrockProblem, array![-1.2, 1.0]).unwrap();

    assert!(result.success, "{}", result);
    assert_relative_eq!(result.params[0], 1.0, epsilon = 1e-4);
    assert_relative_eq!(result.params[1], 1.0, epsilon = 1e-4);
    assert!(result.cost < 1e-10);
}

#[test]
fn test_iteration_cap_is_reported() {
    let solver = LevenbergMarquardt::with_config(LmConfig::default().with_max_iterations(1));
    let result = solver.minimize(&RosenbrockProblem, array![-1.2, 1.0]).unwrap();

    assert!(!result.success);
    assert_eq!(result.termination, Termination::MaxIterations);
    assert_eq!(result.iterations, 1);
}

#[test]
fn test_bounded_decay_fit_by_hand() {
    let data = FitInput::from(vec![0.5, 0.25, 0.125, 0.0625, 0.03125]).resolve().unwrap();
    let model = FitFunction::Exponential;
    let problem = WeightedDecayProblem::new(&model, &data);
    let bounded = BoundedProblem::new(
        &problem,
        vec![
            BoundsTransform::new(Bounds::new(0.1, 10.0).unwrap()),
            BoundsTransform::new(Bounds::new(0.0, 5.0).unwrap()),
        ],
    )
    .unwrap();

    let start = bounded.to_internal(&array![5.0, 2.0]).unwrap();
    let result = LevenbergMarquardt::with_default_config()
        .minimize(&bounded, start)
        .unwrap();
    let popt = bounded.to_external(&result.params);

    // r_k = 2^-k  =>  tau = 1/ln 2, A = 1
    assert_relative_eq!(popt[0], 1.0 / 2f64.ln(), epsilon = 1e-5);
    assert_relative_eq!(popt[1], 1.0, epsilon = 1e-5);

    let covariance = calculate_covariance(
        &problem.jacobian(&popt).unwrap(),
        &problem.eval(&popt).unwrap(),
    );
    assert_eq!(covariance.dim(), (2, 2));
    assert!(covariance.iter().all(|v| v.is_finite()));
}
