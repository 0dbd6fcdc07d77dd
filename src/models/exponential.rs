//! Exponential decay models for lag coefficients.
//!
//! Both models share the leading pair `(tau, A)`; the offset variant adds a
//! constant baseline `O` for coefficients that do not decay to zero.

use ndarray::{Array1, Array2, ArrayView1};

use super::DecayModel;

/// `A·exp(−k/tau)`, parameters `(tau, A)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Exponential;

/// `A·exp(−k/tau) + O`, parameters `(tau, A, O)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExponentialOffset;

impl DecayModel for Exponential {
    fn name(&self) -> &str {
        "exponential"
    }

    fn description(&self) -> &str {
        "A e^(-k/tau)"
    }

    fn parameter_names(&self) -> Vec<String> {
        vec!["tau".to_string(), "A".to_string()]
    }

    fn eval(&self, k: f64, params: ArrayView1<f64>) -> f64 {
        params[1] * (-k / params[0]).exp()
    }

    fn jacobian(&self, steps: &Array1<f64>, params: ArrayView1<f64>) -> Option<Array2<f64>> {
        let (tau, amplitude) = (params[0], params[1]);
        let mut jac = Array2::zeros((steps.len(), 2));

        for (i, &k) in steps.iter().enumerate() {
            let exp_term = (-k / tau).exp();
            jac[[i, 0]] = amplitude * exp_term * k / (tau * tau);
            jac[[i, 1]] = exp_term;
        }

        Some(jac)
    }
}

impl DecayModel for ExponentialOffset {
    fn name(&self) -> &str {
        "exponential_offset"
    }

    fn description(&self) -> &str {
        "A e^(-k/tau) + O"
    }

    fn parameter_names(&self) -> Vec<String> {
        vec!["tau".to_string(), "A".to_string(), "O".to_string()]
    }

    fn eval(&self, k: f64, params: ArrayView1<f64>) -> f64 {
        params[1] * (-k / params[0]).exp() + params[2]
    }

    fn jacobian(&self, steps: &Array1<f64>, params: ArrayView1<f64>) -> Option<Array2<f64>> {
        let (tau, amplitude) = (params[0], params[1]);
        let mut jac = Array2::zeros((steps.len(), 3));

        for (i, &k) in steps.iter().enumerate() {
            let exp_term = (-k / tau).exp();
            jac[[i, 0]] = amplitude * exp_term * k / (tau * tau);
            jac[[i, 1]] = exp_term;
            jac[[i, 2]] = 1.0;
        }

        Some(jac)
    }
}
