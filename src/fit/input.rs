//! Accepted shapes of fitting input, resolved once before any fit runs.

use ndarray::{Array1, Array2, ArrayBase, ArrayD, Axis, Data, Dimension, Ix1, Ix2};
use tracing::warn;

use crate::coefficients::CoefficientResult;
use crate::error::{MreError, Result};

/// Lag coefficients to fit, in one of the accepted layouts.
#[derive(Debug, Clone, PartialEq)]
pub enum FitInput {
    /// Coefficients for the lags `1..=N`, unit errors.
    Coefficients(Array1<f64>),
    /// Explicit lags, unit errors.
    StepsCoefficients {
        steps: Array1<f64>,
        coefficients: Array1<f64>,
    },
    /// Explicit lags with a standard error per coefficient.
    Full {
        steps: Array1<f64>,
        coefficients: Array1<f64>,
        stderrs: Array1<f64>,
    },
}

/// Validated fitting data.
#[derive(Debug, Clone, PartialEq)]
pub struct LagData {
    pub steps: Array1<f64>,
    pub coefficients: Array1<f64>,
    pub stderrs: Array1<f64>,
    /// First coefficient when the first lag is 1.
    pub mnaive: Option<f64>,
}

impl LagData {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl FitInput {
    /// Interpret an array by its dimensionality.
    ///
    /// A 1-D array holds coefficients. A 2-D array is transposed when it has
    /// more rows than columns; its rows are then read as coefficients,
    /// `(steps, coefficients)` or `(steps, coefficients, stderrs)` depending
    /// on how many there are. Rows beyond the third are ignored.
    pub fn from_array<S, D>(data: &ArrayBase<S, D>) -> Result<Self>
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        let view = data.view().into_dyn();
        match view.ndim() {
            1 => Ok(FitInput::Coefficients(view.into_dimensionality::<Ix1>()?.to_owned())),
            2 => {
                let table = view.into_dimensionality::<Ix2>()?;
                let table = if table.nrows() > table.ncols() {
                    table.reversed_axes()
                } else {
                    table
                };

                match table.nrows() {
                    0 => Err(MreError::Shape("fitting input has no rows".to_string())),
                    1 => Ok(FitInput::Coefficients(table.row(0).to_owned())),
                    2 => Ok(FitInput::StepsCoefficients {
                        steps: table.row(0).to_owned(),
                        coefficients: table.row(1).to_owned(),
                    }),
                    rows => {
                        if rows > 3 {
                            warn!(
                                rows,
                                "Fitting input has more than 3 rows, ignoring the extra rows"
                            );
                        }
                        Ok(FitInput::Full {
                            steps: table.row(0).to_owned(),
                            coefficients: table.row(1).to_owned(),
                            stderrs: table.row(2).to_owned(),
                        })
                    }
                }
            }
            n => Err(MreError::Shape(format!(
                "fitting input must be one- or two-dimensional, got {} dimensions",
                n
            ))),
        }
    }

    /// Validate and bring the input into the `(steps, coefficients, stderrs)`
    /// layout.
    ///
    /// Lags whose coefficient or standard error is NaN have no defined
    /// regression and are dropped. Zero standard errors, as produced by a
    /// regression through exactly two points, are replaced by the smallest
    /// positive standard error of the input, or by 1 if there is none.
    ///
    /// # Errors
    ///
    /// * `InvalidInput` for empty data, no defined lag, non-finite steps,
    ///   infinite values or negative errors
    /// * `DimensionMismatch` if the rows differ in length
    pub fn resolve(self) -> Result<LagData> {
        let (steps, coefficients, stderrs) = match self {
            FitInput::Coefficients(coefficients) => {
                let steps = Array1::from_iter((1..=coefficients.len()).map(|k| k as f64));
                let stderrs = Array1::ones(coefficients.len());
                (steps, coefficients, stderrs)
            }
            FitInput::StepsCoefficients {
                steps,
                coefficients,
            } => {
                let stderrs = Array1::ones(coefficients.len());
                (steps, coefficients, stderrs)
            }
            FitInput::Full {
                steps,
                coefficients,
                stderrs,
            } => (steps, coefficients, stderrs),
        };

        if steps.len() != coefficients.len() || stderrs.len() != coefficients.len() {
            return Err(MreError::DimensionMismatch(format!(
                "steps ({}), coefficients ({}) and stderrs ({}) must have equal length",
                steps.len(),
                coefficients.len(),
                stderrs.len()
            )));
        }
        if coefficients.is_empty() {
            return Err(MreError::InvalidInput("no coefficients to fit".to_string()));
        }
        if steps.iter().any(|v| !v.is_finite()) {
            return Err(MreError::InvalidInput("steps must be finite".to_string()));
        }
        if let Some(bad) = coefficients.iter().chain(stderrs.iter()).find(|v| v.is_infinite()) {
            return Err(MreError::InvalidInput(format!(
                "coefficients and standard errors must not be infinite, found {}",
                bad
            )));
        }
        if let Some(bad) = stderrs.iter().find(|&&e| e < 0.0) {
            return Err(MreError::InvalidInput(format!(
                "standard errors must not be negative, found {}",
                bad
            )));
        }

        let defined: Vec<usize> = (0..coefficients.len())
            .filter(|&i| !coefficients[i].is_nan() && !stderrs[i].is_nan())
            .collect();
        if defined.is_empty() {
            return Err(MreError::InvalidInput(
                "no lag has a defined coefficient".to_string(),
            ));
        }
        if defined.len() < coefficients.len() {
            warn!(
                dropped = coefficients.len() - defined.len(),
                kept = defined.len(),
                "Dropping lags with undefined coefficients"
            );
        }
        let steps = steps.select(Axis(0), &defined);
        let coefficients = coefficients.select(Axis(0), &defined);
        let mut stderrs = stderrs.select(Axis(0), &defined);

        let zeros = stderrs.iter().filter(|&&e| e == 0.0).count();
        if zeros > 0 {
            let smallest = stderrs
                .iter()
                .copied()
                .filter(|&e| e > 0.0)
                .fold(f64::INFINITY, f64::min);
            let floor = if smallest.is_finite() { smallest } else { 1.0 };
            warn!(zeros, floor, "Replacing zero standard errors");
            stderrs.mapv_inplace(|e| if e == 0.0 { floor } else { e });
        }

        let mnaive = (steps[0] == 1.0).then(|| coefficients[0]);

        Ok(LagData {
            steps,
            coefficients,
            stderrs,
            mnaive,
        })
    }
}

impl From<&CoefficientResult> for FitInput {
    fn from(result: &CoefficientResult) -> Self {
        FitInput::Full {
            steps: result.steps_f64(),
            coefficients: result.coefficients.clone(),
            stderrs: result.stderrs.clone(),
        }
    }
}

impl From<CoefficientResult> for FitInput {
    fn from(result: CoefficientResult) -> Self {
        FitInput::Full {
            steps: result.steps_f64(),
            coefficients: result.coefficients,
            stderrs: result.stderrs,
        }
    }
}

impl From<Array1<f64>> for FitInput {
    fn from(coefficients: Array1<f64>) -> Self {
        FitInput::Coefficients(coefficients)
    }
}

impl From<Vec<f64>> for FitInput {
    fn from(coefficients: Vec<f64>) -> Self {
        FitInput::Coefficients(Array1::from(coefficients))
    }
}

impl From<(Array1<f64>, Array1<f64>)> for FitInput {
    fn from((steps, coefficients): (Array1<f64>, Array1<f64>)) -> Self {
        FitInput::StepsCoefficients {
            steps,
            coefficients,
        }
    }
}

impl From<(Array1<f64>, Array1<f64>, Array1<f64>)> for FitInput {
    fn from((steps, coefficients, stderrs): (Array1<f64>, Array1<f64>, Array1<f64>)) -> Self {
        FitInput::Full {
            steps,
            coefficients,
            stderrs,
        }
    }
}

impl TryFrom<Array2<f64>> for FitInput {
    type Error = MreError;

    fn try_from(data: Array2<f64>) -> Result<Self> {
        FitInput::from_array(&data)
    }
}

impl TryFrom<ArrayD<f64>> for FitInput {
    type Error = MreError;

    fn try_from(data: ArrayD<f64>) -> Result<Self> {
        FitInput::from_array(&data)
    }
}
