//! Parameter bounds implementation
//!
//! Bounds are enforced with the Minuit-style parameter transformation: the
//! optimizer works on unbounded internal values while the model only ever sees
//! external values inside the bounds.

use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::f64::{INFINITY, NEG_INFINITY};
use thiserror::Error;

/// Errors that can occur when working with parameter bounds
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BoundsError {
    #[error("Invalid bounds: min ({min}) must be less than max ({max})")]
    InvalidBounds { min: f64, max: f64 },

    #[error("Parameter value {value} is outside bounds: [{min}, {max}]")]
    ValueOutsideBounds { value: f64, min: f64, max: f64 },

    #[error("Infinite parameter value is not allowed")]
    InfiniteValue,

    #[error("Expected a 2 x n bounds array (lower row, upper row), got shape {rows} x {cols}")]
    InvalidLayout { rows: usize, cols: usize },

    #[error("Lower and upper bound vectors differ in length ({lower} vs {upper})")]
    LengthMismatch { lower: usize, upper: usize },
}

/// Represents the bounds constraints on a single parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Minimum allowed value for the parameter
    pub min: f64,

    /// Maximum allowed value for the parameter
    pub max: f64,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            min: NEG_INFINITY,
            max: INFINITY,
        }
    }
}

impl Bounds {
    /// Create a new bounds constraint, failing if `min > max` or either is NaN.
    ///
    /// # Examples
    ///
    /// ```
    /// use mre_rs::parameters::bounds::Bounds;
    ///
    /// let bounds = Bounds::new(5.0, 5000.0).unwrap();
    /// assert!(bounds.is_within_bounds(20.0));
    /// assert!(Bounds::new(1.0, 0.0).is_err());
    /// ```
    pub fn new(min: f64, max: f64) -> Result<Self, BoundsError> {
        if min.is_nan() || max.is_nan() || min > max {
            return Err(BoundsError::InvalidBounds { min, max });
        }

        Ok(Self { min, max })
    }

    /// Create an unbounded constraint (negative infinity to positive infinity)
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Check if a value is within the bounds (inclusive)
    pub fn is_within_bounds(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Check if the parameter is bounded from below
    pub fn has_lower_bound(&self) -> bool {
        self.min.is_finite()
    }

    /// Check if the parameter is bounded from above
    pub fn has_upper_bound(&self) -> bool {
        self.max.is_finite()
    }

    /// Clamp a value to be within the bounds
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

/// Minuit-style transformation between internal (unbounded) and external
/// (bounded) parameter values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundsTransform {
    bounds: Bounds,
}

impl BoundsTransform {
    /// Create a new bounds transform
    pub fn new(bounds: Bounds) -> Self {
        Self { bounds }
    }

    /// The bounds this transform enforces.
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Transform an internal parameter value to an external value inside the bounds.
    pub fn to_external(&self, internal_value: f64) -> f64 {
        match (self.bounds.has_lower_bound(), self.bounds.has_upper_bound()) {
            (false, false) => internal_value,
            (true, false) => self.bounds.min - 1.0 + (internal_value * internal_value + 1.0).sqrt(),
            (false, true) => self.bounds.max + 1.0 - (internal_value * internal_value + 1.0).sqrt(),
            (true, true) => {
                let bound_range = self.bounds.max - self.bounds.min;
                self.bounds.min + (internal_value.sin() + 1.0) * bound_range / 2.0
            }
        }
    }

    /// Transform an external parameter value to an internal value.
    ///
    /// Fails if the external value is not finite or lies outside the bounds.
    pub fn to_internal(&self, external_value: f64) -> Result<f64, BoundsError> {
        if !external_value.is_finite() {
            return Err(BoundsError::InfiniteValue);
        }

        if !self.bounds.is_within_bounds(external_value) {
            return Err(BoundsError::ValueOutsideBounds {
                value: external_value,
                min: self.bounds.min,
                max: self.bounds.max,
            });
        }

        let internal = match (self.bounds.has_lower_bound(), self.bounds.has_upper_bound()) {
            (false, false) => external_value,
            (true, false) => ((external_value - self.bounds.min + 1.0).powi(2) - 1.0).sqrt(),
            (false, true) => ((self.bounds.max - external_value + 1.0).powi(2) - 1.0).sqrt(),
            (true, true) => {
                let bound_range = self.bounds.max - self.bounds.min;
                if bound_range == 0.0 {
                    0.0
                } else {
                    let scaled = 2.0 * (external_value - self.bounds.min) / bound_range - 1.0;
                    scaled.clamp(-1.0, 1.0).asin()
                }
            }
        };

        Ok(internal)
    }

    /// Derivative of the external value with respect to the internal value,
    /// used to carry an external-space Jacobian into internal space.
    pub fn derivative(&self, internal_value: f64) -> f64 {
        match (self.bounds.has_lower_bound(), self.bounds.has_upper_bound()) {
            (false, false) => 1.0,
            (true, false) => internal_value / (internal_value * internal_value + 1.0).sqrt(),
            (false, true) => -internal_value / (internal_value * internal_value + 1.0).sqrt(),
            (true, true) => (self.bounds.max - self.bounds.min) * internal_value.cos() / 2.0,
        }
    }
}

/// Bounds for a whole parameter vector: one lower and one upper vector,
/// applied uniformly to every starting point of a fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitBounds {
    lower: Array1<f64>,
    upper: Array1<f64>,
}

impl FitBounds {
    /// Create bounds from lower and upper vectors.
    pub fn new(lower: Array1<f64>, upper: Array1<f64>) -> Result<Self, BoundsError> {
        if lower.len() != upper.len() {
            return Err(BoundsError::LengthMismatch {
                lower: lower.len(),
                upper: upper.len(),
            });
        }
        for (&min, &max) in lower.iter().zip(upper.iter()) {
            Bounds::new(min, max)?;
        }

        Ok(Self { lower, upper })
    }

    /// Create bounds from a `2 x n` array: lower-bound row stacked on the
    /// upper-bound row.
    pub fn from_rows(rows: &Array2<f64>) -> Result<Self, BoundsError> {
        if rows.nrows() != 2 {
            return Err(BoundsError::InvalidLayout {
                rows: rows.nrows(),
                cols: rows.ncols(),
            });
        }
        Self::new(rows.row(0).to_owned(), rows.row(1).to_owned())
    }

    /// Create bounds from `(min, max)` pairs, one per parameter.
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Result<Self, BoundsError> {
        let lower = pairs.iter().map(|&(min, _)| min).collect();
        let upper = pairs.iter().map(|&(_, max)| max).collect();
        Self::new(lower, upper)
    }

    /// Number of parameters covered.
    pub fn len(&self) -> usize {
        self.lower.len()
    }

    /// Whether no parameter is covered.
    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    pub fn lower(&self) -> &Array1<f64> {
        &self.lower
    }

    pub fn upper(&self) -> &Array1<f64> {
        &self.upper
    }

    /// Bounds of the parameter at `index`.
    pub fn get(&self, index: usize) -> Option<Bounds> {
        Some(Bounds {
            min: *self.lower.get(index)?,
            max: *self.upper.get(index)?,
        })
    }

    /// One transform per parameter.
    pub fn transforms(&self) -> Vec<BoundsTransform> {
        self.lower
            .iter()
            .zip(self.upper.iter())
            .map(|(&min, &max)| BoundsTransform::new(Bounds { min, max }))
            .collect()
    }

    /// Check that every entry of `params` lies inside its bounds.
    pub fn check(&self, params: ArrayView1<f64>) -> Result<(), BoundsError> {
        for (i, &value) in params.iter().enumerate() {
            let bounds = self.get(i).unwrap_or_default();
            if !bounds.is_within_bounds(value) {
                return Err(BoundsError::ValueOutsideBounds {
                    value,
                    min: bounds.min,
                    max: bounds.max,
                });
            }
        }
        Ok(())
    }
}
