//! Least-squares problems solved for every starting point of a fit.

use ndarray::{Array1, Array2};

use crate::error::{MreError, Result};
use crate::models::DecayModel;
use crate::parameters::BoundsTransform;
use crate::problem::Problem;
use crate::utils::finite_difference;

use super::input::LagData;

/// Residuals `(f(k_i) − r_i) / σ_i` of a decay model against lag data.
pub struct WeightedDecayProblem<'a> {
    model: &'a dyn DecayModel,
    data: &'a LagData,
}

impl<'a> WeightedDecayProblem<'a> {
    pub fn new(model: &'a dyn DecayModel, data: &'a LagData) -> Self {
        Self { model, data }
    }

    /// Model prediction at every lag.
    pub fn predict(&self, params: &Array1<f64>) -> Array1<f64> {
        self.model.eval_steps(&self.data.steps, params.view())
    }

    /// Unweighted sum of squared differences between data and prediction.
    pub fn ssres(&self, params: &Array1<f64>) -> f64 {
        (&self.data.coefficients - &self.predict(params))
            .mapv(|r| r * r)
            .sum()
    }
}

impl Problem for WeightedDecayProblem<'_> {
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        Ok((self.predict(params) - &self.data.coefficients) / &self.data.stderrs)
    }

    fn parameter_count(&self) -> usize {
        self.model.parameter_count()
    }

    fn residual_count(&self) -> usize {
        self.data.len()
    }

    fn jacobian(&self, params: &Array1<f64>) -> Result<Array2<f64>> {
        match self.model.jacobian(&self.data.steps, params.view()) {
            Some(mut jac) => {
                for (mut row, &sigma) in jac.outer_iter_mut().zip(self.data.stderrs.iter()) {
                    row /= sigma;
                }
                Ok(jac)
            }
            None => finite_difference::jacobian(self, params, None),
        }
    }
}

/// Wraps a problem so the solver works on unbounded internal parameters that
/// map into the bounds of the external ones.
pub struct BoundedProblem<'a, P: Problem> {
    inner: &'a P,
    transforms: Vec<BoundsTransform>,
}

impl<'a, P: Problem> BoundedProblem<'a, P> {
    /// One transform per parameter of `inner`.
    pub fn new(inner: &'a P, transforms: Vec<BoundsTransform>) -> Result<Self> {
        if transforms.len() != inner.parameter_count() {
            return Err(MreError::DimensionMismatch(format!(
                "{} bounds for {} parameters",
                transforms.len(),
                inner.parameter_count()
            )));
        }
        Ok(Self { inner, transforms })
    }

    pub fn to_external(&self, internal: &Array1<f64>) -> Array1<f64> {
        internal
            .iter()
            .zip(self.transforms.iter())
            .map(|(&value, transform)| transform.to_external(value))
            .collect()
    }

    /// Fails for values that are not finite or outside their bounds.
    pub fn to_internal(&self, external: &Array1<f64>) -> Result<Array1<f64>> {
        external
            .iter()
            .zip(self.transforms.iter())
            .map(|(&value, transform)| transform.to_internal(value).map_err(MreError::from))
            .collect()
    }
}

impl<P: Problem> Problem for BoundedProblem<'_, P> {
    fn eval(&self, internal: &Array1<f64>) -> Result<Array1<f64>> {
        self.inner.eval(&self.to_external(internal))
    }

    fn parameter_count(&self) -> usize {
        self.inner.parameter_count()
    }

    fn residual_count(&self) -> usize {
        self.inner.residual_count()
    }

    fn jacobian(&self, internal: &Array1<f64>) -> Result<Array2<f64>> {
        // chain rule: ∂r/∂p_int = ∂r/∂p_ext · dp_ext/dp_int
        let mut jac = self.inner.jacobian(&self.to_external(internal))?;
        for (mut column, (&value, transform)) in jac
            .columns_mut()
            .into_iter()
            .zip(internal.iter().zip(self.transforms.iter()))
        {
            column *= transform.derivative(value);
        }
        Ok(jac)
    }
}
